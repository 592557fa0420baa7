use crate::{
    err::Result,
    generator::LineGenerator,
    queue::{Batch, Item, QueueSender},
};
use std::sync::atomic::{AtomicBool, Ordering};

/// Generates a fixed number of whole batches and pushes them onto the queue.
///
/// The producer never enqueues its own shutdown marker; the orchestrator does
/// that once every producer has been joined.
pub struct Producer<'a> {
    id: usize,
    generator: LineGenerator<'a>,
    sx: QueueSender,
    batches: u64,
    batch_size: usize,
    /// Raised when any worker has failed; remaining batches are skipped.
    abort: &'a AtomicBool,
}

impl<'a> Producer<'a> {
    pub fn new(
        id: usize,
        generator: LineGenerator<'a>,
        sx: QueueSender,
        batches: u64,
        batch_size: usize,
        abort: &'a AtomicBool,
    ) -> Self {
        Self {
            id,
            generator,
            sx,
            batches,
            batch_size,
            abort,
        }
    }

    fn send_batch(&mut self, seq: usize) -> Result<()> {
        let mut records = Vec::new();
        self.generator.fill(&mut records, self.batch_size)?;
        self.sx.enqueue(Item::Batch(Batch {
            producer: self.id,
            seq,
            records,
        }))
    }

    /// Runs to completion, returning the number of batches enqueued.
    pub fn run(mut self) -> Result<u64> {
        tracing::debug!(
            producer = self.id,
            batches = self.batches,
            "producer started"
        );

        let mut sent = 0;
        while sent < self.batches {
            if self.abort.load(Ordering::Relaxed) {
                tracing::debug!(producer = self.id, sent, "producer aborted");
                return Ok(sent);
            }

            let produced = self.send_batch(sent as usize);
            if let Err(err) = produced {
                self.abort.store(true, Ordering::Relaxed);
                return Err(err);
            }
            sent += 1;
        }

        tracing::debug!(producer = self.id, sent, "producer finished");
        Ok(sent)
    }
}
