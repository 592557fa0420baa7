//! Splitting the requested line count across producers.

/// Per-producer line shares for one run.
///
/// Shares are nearly equal; the remainder of the division goes to the last
/// producer. Each producer only emits whole batches, so up to
/// `batch_size - 1` lines of every share are never generated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Workload {
    shares: Vec<u64>,
    batch_size: u64,
}

impl Workload {
    pub fn new(total_lines: u64, producers: usize, batch_size: usize) -> Self {
        debug_assert!(producers > 0 && batch_size > 0);
        let n = producers as u64;
        let per_producer = total_lines / n;
        let remainder = total_lines % n;

        let mut shares = vec![per_producer; producers];
        if let Some(last) = shares.last_mut() {
            *last += remainder;
        }

        Self {
            shares,
            batch_size: batch_size as u64,
        }
    }

    #[inline]
    pub fn shares(&self) -> &[u64] {
        &self.shares
    }

    #[inline]
    pub fn producers(&self) -> usize {
        self.shares.len()
    }

    /// Whole batches producer `i` generates.
    #[inline]
    pub fn batches_of(&self, i: usize) -> u64 {
        self.shares[i] / self.batch_size
    }

    pub fn total_batches(&self) -> u64 {
        (0..self.producers()).map(|i| self.batches_of(i)).sum()
    }

    pub fn requested_lines(&self) -> u64 {
        self.shares.iter().sum()
    }

    /// Lines that end up in the output.
    pub fn written_lines(&self) -> u64 {
        self.total_batches() * self.batch_size
    }

    /// Lines requested but lost to per-producer truncation.
    pub fn dropped_lines(&self) -> u64 {
        self.requested_lines() - self.written_lines()
    }
}

#[cfg(test)]
mod tests {
    use super::Workload;

    #[test]
    fn test_shares_sum_to_total() {
        for total in [0, 1, 7, 100, 12_345, 5_368_709] {
            for producers in 1..=16 {
                let workload = Workload::new(total, producers, 2000);
                assert_eq!(workload.requested_lines(), total);
                assert_eq!(workload.producers(), producers);
            }
        }
    }

    #[test]
    fn test_remainder_goes_to_last() {
        let workload = Workload::new(10, 3, 1);
        assert_eq!(workload.shares(), &[3, 3, 4]);
    }

    #[test]
    fn test_truncates_to_whole_batches() {
        let workload = Workload::new(3, 1, 2);
        assert_eq!(workload.total_batches(), 1);
        assert_eq!(workload.written_lines(), 2);
        assert_eq!(workload.dropped_lines(), 1);

        let workload = Workload::new(25, 2, 5);
        // shares 12 and 13, two batches each
        assert_eq!(workload.batches_of(0), 2);
        assert_eq!(workload.batches_of(1), 2);
        assert_eq!(workload.written_lines(), 20);
    }

    #[test]
    fn test_written_lines_formula() {
        for (total, producers, batch) in [(1000, 3, 7), (99, 4, 10), (5_368_709, 8, 2000)] {
            let workload = Workload::new(total, producers, batch);
            let per = total / producers as u64;
            let last = per + total % producers as u64;
            let batch = batch as u64;
            let expected = ((producers as u64 - 1) * (per / batch) + last / batch) * batch;
            assert_eq!(workload.written_lines(), expected);
            assert!(workload.written_lines() <= total);
        }
    }

    #[test]
    fn test_underflow_is_zero_batches() {
        let workload = Workload::new(5, 3, 2000);
        assert_eq!(workload.total_batches(), 0);
        assert_eq!(workload.written_lines(), 0);
        assert_eq!(workload.dropped_lines(), 5);
    }
}
