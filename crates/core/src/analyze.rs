//! Parallel summary statistics over a generated log file.
//!
//! The file is mapped once and cut into byte ranges, one per thread. Range
//! boundaries are moved forward to the next line start, so every line is
//! counted by exactly one thread.

use crate::{
    err::{Error, Result},
    record::{split_fields, Level, Method, ParseError},
};
use std::{collections::BTreeMap, fs::File, ops::Range, path::Path, thread};

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Analytics {
    pub total_lines: u64,
    pub error_count: u64,
    pub warning_count: u64,
    pub total_response_ms: u64,
    pub status_counts: BTreeMap<u16, u64>,
    pub method_counts: BTreeMap<Method, u64>,
    /// Non-empty lines that did not parse. These are skipped, not fatal.
    pub malformed_lines: u64,
}

impl Analytics {
    pub fn merge(&mut self, other: Analytics) {
        self.total_lines += other.total_lines;
        self.error_count += other.error_count;
        self.warning_count += other.warning_count;
        self.total_response_ms += other.total_response_ms;
        self.malformed_lines += other.malformed_lines;
        for (status, count) in other.status_counts {
            *self.status_counts.entry(status).or_default() += count;
        }
        for (method, count) in other.method_counts {
            *self.method_counts.entry(method).or_default() += count;
        }
    }

    /// Percentage of lines logged at `ERROR`.
    pub fn error_rate(&self) -> Option<f64> {
        (self.total_lines > 0).then(|| self.error_count as f64 / self.total_lines as f64 * 100.0)
    }

    pub fn avg_response_ms(&self) -> Option<f64> {
        (self.total_lines > 0).then(|| self.total_response_ms as f64 / self.total_lines as f64)
    }

    fn record_line(&mut self, line: &[u8]) {
        let line = line.strip_suffix(b"\r").unwrap_or(line);
        if line.is_empty() {
            return;
        }
        match std::str::from_utf8(line) {
            Ok(line) if self.try_record(line).is_ok() => {}
            _ => self.malformed_lines += 1,
        }
    }

    fn try_record(&mut self, line: &str) -> Result<(), ParseError> {
        let [_, level, _, _, method, _, status, response, _] = split_fields(line)?;

        let level: Level = level.parse()?;
        let method: Method = method.parse()?;
        let status: u16 = status
            .parse()
            .map_err(|_| ParseError::Integer("status_code"))?;
        let response: u64 = response
            .parse()
            .map_err(|_| ParseError::Integer("response_time_ms"))?;

        self.total_lines += 1;
        self.total_response_ms += response;
        match level {
            Level::Error => self.error_count += 1,
            Level::Warn => self.warning_count += 1,
            Level::Info | Level::Debug => {}
        }
        *self.status_counts.entry(status).or_default() += 1;
        *self.method_counts.entry(method).or_default() += 1;
        Ok(())
    }

    fn scan(data: &[u8]) -> Self {
        let mut analytics = Self::default();
        let mut start = 0;
        for end in memchr::memchr_iter(b'\n', data) {
            analytics.record_line(&data[start..end]);
            start = end + 1;
        }
        if start < data.len() {
            analytics.record_line(&data[start..]);
        }
        analytics
    }
}

/// Moves `pos` forward to the start of the line it falls in, unless it
/// already is a line start.
fn align_to_line(data: &[u8], pos: usize) -> usize {
    if pos == 0 || pos >= data.len() {
        return pos.min(data.len());
    }
    if data[pos - 1] == b'\n' {
        return pos;
    }
    match memchr::memchr(b'\n', &data[pos..]) {
        Some(i) => pos + i + 1,
        None => data.len(),
    }
}

fn chunk_ranges(data: &[u8], parts: usize) -> Vec<Range<usize>> {
    let len = data.len();
    let bounds = (0..=parts)
        .map(|i| align_to_line(data, len * i / parts))
        .collect::<Vec<_>>();
    bounds.windows(2).map(|w| w[0]..w[1]).collect()
}

/// Analyzes `data` with up to `threads` threads.
pub fn analyze_bytes(data: &[u8], threads: usize) -> Result<Analytics> {
    if threads == 0 {
        return Err(Error::InvalidConfig("threads must be at least 1"));
    }

    let ranges = chunk_ranges(data, threads);
    thread::scope(|s| {
        let handles = ranges
            .into_iter()
            .filter(|range| !range.is_empty())
            .map(|range| s.spawn(move || Analytics::scan(&data[range])))
            .collect::<Vec<_>>();

        let mut total = Analytics::default();
        for handle in handles {
            let part = handle
                .join()
                .map_err(|_| Error::WorkerPanicked("analyzer"))?;
            total.merge(part);
        }
        Ok(total)
    })
}

/// Maps the file at `path` and analyzes it with up to `threads` threads.
pub fn analyze_file(path: impl AsRef<Path>, threads: usize) -> Result<Analytics> {
    let file = File::open(path.as_ref())?;
    if file.metadata()?.len() == 0 {
        return Ok(Analytics::default());
    }

    // Safety: the file is only read; concurrent truncation by another
    // process is undefined behaviour we accept, like any mmap reader.
    let data = unsafe { memmap2::Mmap::map(&file)? };
    #[cfg(unix)]
    data.advise(memmap2::Advice::Sequential)?;

    tracing::debug!(path = %path.as_ref().display(), bytes = data.len(), threads, "analyzing");
    analyze_bytes(&data, threads)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{config::Config, pipeline::Pipeline, NoProgress};
    use anyhow::Result;
    use std::io::Write;

    const SAMPLE: &str = "\
2024-03-01T12:00:00Z|INFO|00000000-0000-4000-8000-000000000001|10.0.0.1|GET|/api/users/5|200|40|Request processed successfully
2024-03-01T12:00:01Z|ERROR|00000000-0000-4000-8000-000000000002|10.0.0.2|POST|/api/login|500|900|Database connection timeout

2024-03-01T12:00:02Z|WARN|00000000-0000-4000-8000-000000000003|10.0.0.3|GET|/api/orders/9|404|60|Resource not found
this line is garbage
2024-03-01T12:00:03Z|DEBUG|00000000-0000-4000-8000-000000000004|10.0.0.4|PATCH|/api/products|200|100|Request processed successfully";

    #[test]
    fn test_scan_sample() -> Result<()> {
        let analytics = analyze_bytes(SAMPLE.as_bytes(), 1)?;
        assert_eq!(analytics.total_lines, 4);
        assert_eq!(analytics.error_count, 1);
        assert_eq!(analytics.warning_count, 1);
        assert_eq!(analytics.malformed_lines, 1);
        assert_eq!(analytics.total_response_ms, 1100);
        assert_eq!(analytics.status_counts.get(&200), Some(&2));
        assert_eq!(analytics.method_counts.get(&Method::Get), Some(&2));
        assert_eq!(analytics.error_rate(), Some(25.0));
        assert_eq!(analytics.avg_response_ms(), Some(275.0));
        Ok(())
    }

    #[test]
    fn test_thread_count_does_not_change_result() -> Result<()> {
        let single = analyze_bytes(SAMPLE.as_bytes(), 1)?;
        for threads in 2..=32 {
            assert_eq!(analyze_bytes(SAMPLE.as_bytes(), threads)?, single);
        }
        Ok(())
    }

    #[test]
    fn test_chunks_cover_every_byte_once() {
        let data = SAMPLE.as_bytes();
        for parts in 1..=16 {
            let ranges = chunk_ranges(data, parts);
            assert_eq!(ranges.first().unwrap().start, 0);
            assert_eq!(ranges.last().unwrap().end, data.len());
            for pair in ranges.windows(2) {
                assert_eq!(pair[0].end, pair[1].start);
            }
            for range in ranges.iter().filter(|r| !r.is_empty()) {
                assert!(range.start == 0 || data[range.start - 1] == b'\n');
            }
        }
    }

    #[test]
    fn test_empty_input() -> Result<()> {
        let analytics = analyze_bytes(b"", 4)?;
        assert_eq!(analytics, Analytics::default());
        assert_eq!(analytics.error_rate(), None);

        let file = tempfile::NamedTempFile::new()?;
        assert_eq!(analyze_file(file.path(), 4)?, Analytics::default());
        Ok(())
    }

    #[test]
    fn test_zero_threads_rejected() {
        assert!(matches!(
            analyze_bytes(SAMPLE.as_bytes(), 0),
            Err(Error::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_merge() {
        let mut a = analyze_bytes(SAMPLE.as_bytes(), 1).unwrap();
        let b = a.clone();
        a.merge(b);
        assert_eq!(a.total_lines, 8);
        assert_eq!(a.status_counts.get(&500), Some(&2));
        assert_eq!(a.malformed_lines, 2);
    }

    #[test]
    fn test_analyze_generated_file() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("generated.log");
        let pipeline = Pipeline::new(Config {
            output: path.clone(),
            line_count: Some(3000),
            producers: 3,
            batch_size: 100,
            queue_capacity: 4,
            poll_interval_ms: 5,
            ..Config::default()
        })?;
        let report = pipeline.generate_file(NoProgress)?;

        let analytics = analyze_file(&path, 7)?;
        assert_eq!(analytics.total_lines, report.written_lines);
        assert_eq!(analytics.malformed_lines, 0);
        assert_eq!(analytics.method_counts.values().sum::<u64>(), 3000);
        let errors = analytics
            .status_counts
            .range(500..)
            .map(|(_, count)| count)
            .sum::<u64>();
        // server errors always log at ERROR; some successes do too
        assert!(analytics.error_count >= errors);
        Ok(())
    }

    #[test]
    fn test_crlf_and_missing_trailing_newline() -> Result<()> {
        let mut file = tempfile::NamedTempFile::new()?;
        let crlf = SAMPLE.replace('\n', "\r\n");
        file.write_all(crlf.as_bytes())?;
        file.flush()?;
        assert_eq!(
            analyze_file(file.path(), 3)?,
            analyze_bytes(SAMPLE.as_bytes(), 1)?
        );
        Ok(())
    }
}
