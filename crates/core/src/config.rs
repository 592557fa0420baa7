//! Run configuration.

use crate::err::{Error, Result};
use serde::{Deserialize, Serialize};
use std::{path::PathBuf, time::Duration};

const BYTES_PER_MB: u64 = 1024 * 1024;

/// Every tunable of a generation run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Approximate size of the output file.
    pub target_size_mb: u64,
    /// Assumed average line length used to turn the size into a line count.
    pub avg_line_bytes: u64,
    /// Exact number of lines to request, overriding the size estimate.
    pub line_count: Option<u64>,
    pub output: PathBuf,
    pub producers: usize,
    pub batch_size: usize,
    pub queue_capacity: usize,
    /// How long the writer waits for a batch before re-checking for shutdown.
    pub poll_interval_ms: u64,
    /// Seeds producer `i` with `seed + i` for reproducible field values.
    pub seed: Option<u64>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            target_size_mb: 1024,
            avg_line_bytes: 200,
            line_count: None,
            output: PathBuf::from("server_1gb.log"),
            producers: default_parallelism(),
            batch_size: 2000,
            queue_capacity: 100,
            poll_interval_ms: 1000,
            seed: None,
        }
    }
}

/// Host parallelism, or 4 if it cannot be determined.
pub fn default_parallelism() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(4)
}

impl Config {
    pub fn validate(&self) -> Result<()> {
        if self.producers == 0 {
            return Err(Error::InvalidConfig("producers must be at least 1"));
        }
        if self.batch_size == 0 {
            return Err(Error::InvalidConfig("batch size must be at least 1"));
        }
        if self.queue_capacity == 0 {
            return Err(Error::InvalidConfig("queue capacity must be at least 1"));
        }
        if self.avg_line_bytes == 0 {
            return Err(Error::InvalidConfig(
                "average line length must be at least 1",
            ));
        }
        if self.poll_interval_ms == 0 {
            return Err(Error::InvalidConfig("poll interval must be at least 1ms"));
        }
        Ok(())
    }

    /// Total lines requested for the run.
    pub fn total_lines(&self) -> u64 {
        self.line_count.unwrap_or_else(|| {
            self.target_size_mb.saturating_mul(BYTES_PER_MB) / self.avg_line_bytes.max(1)
        })
    }

    #[inline]
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.batch_size, 2000);
        assert_eq!(config.queue_capacity, 100);
        assert!(config.producers >= 1);
        assert_eq!(config.total_lines(), 1024 * 1024 * 1024 / 200);
        config.validate().unwrap();
    }

    #[test]
    fn test_line_count_overrides_size() {
        let config = Config {
            line_count: Some(3),
            ..Config::default()
        };
        assert_eq!(config.total_lines(), 3);
    }

    #[test]
    fn test_validate_rejects_zeroes() {
        for config in [
            Config {
                producers: 0,
                ..Config::default()
            },
            Config {
                batch_size: 0,
                ..Config::default()
            },
            Config {
                queue_capacity: 0,
                ..Config::default()
            },
            Config {
                avg_line_bytes: 0,
                ..Config::default()
            },
            Config {
                poll_interval_ms: 0,
                ..Config::default()
            },
        ] {
            assert!(matches!(config.validate(), Err(Error::InvalidConfig(_))));
        }
    }

    #[test]
    fn test_partial_json() {
        let config: Config =
            serde_json::from_str(r#"{ "target_size_mb": 8, "batch_size": 500 }"#).unwrap();
        assert_eq!(config.target_size_mb, 8);
        assert_eq!(config.batch_size, 500);
        assert_eq!(config.queue_capacity, 100);
        assert_eq!(config.total_lines(), 8 * 1024 * 1024 / 200);
    }
}
