use loggen_core::Progress;
use std::io::{self, Write};

/// Rewrites a single status line on stdout as batches land on disk.
pub struct ProgressLine {
    out: io::Stdout,
    updates: u64,
}

impl ProgressLine {
    /// Only every `EVERY`th batch redraws the line.
    const EVERY: u64 = 50;

    pub fn render(written: u64, total: u64) -> String {
        let percent = if total == 0 {
            100.0
        } else {
            written as f64 / total as f64 * 100.0
        };
        format!("\rWriting logs: {written}/{total} lines ({percent:.1}%)")
    }

    /// Draws the final state and ends the line.
    pub fn finish(written: u64, total: u64) {
        let mut out = io::stdout().lock();
        // Progress output is best effort.
        let _ = writeln!(out, "{}", Self::render(written, total));
    }
}

impl Default for ProgressLine {
    fn default() -> Self {
        Self {
            out: io::stdout(),
            updates: 0,
        }
    }
}

impl Progress for ProgressLine {
    fn advance(&mut self, written: u64, total: u64) {
        self.updates += 1;
        if !self.updates.is_multiple_of(Self::EVERY) {
            return;
        }
        let mut out = self.out.lock();
        let _ = write!(out, "{}", Self::render(written, total));
        let _ = out.flush();
    }
}
