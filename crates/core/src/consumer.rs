use crate::{
    err::{Error, Result},
    queue::{Dequeued, Item, QueueReceiver},
};
use std::{
    io::{BufWriter, Write},
    time::Duration,
};

/// Observer notified after every batch the writer appends.
pub trait Progress: Send {
    /// `written` lines are on the sink so far, out of `total` requested.
    fn advance(&mut self, written: u64, total: u64);
}

impl<F> Progress for F
where
    F: FnMut(u64, u64) + Send,
{
    fn advance(&mut self, written: u64, total: u64) {
        self(written, total)
    }
}

/// A [Progress] that ignores every update.
pub struct NoProgress;

impl Progress for NoProgress {
    fn advance(&mut self, _: u64, _: u64) {}
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ConsumerStats {
    pub lines: u64,
    pub batches: u64,
    pub shutdowns: usize,
}

/// The single writer. Appends batches to the sink in dequeue order until
/// every producer has signalled shutdown and the queue has gone quiet.
pub struct Consumer<W: Write, P> {
    rx: QueueReceiver,
    sink: BufWriter<W>,
    producers: usize,
    expected_lines: u64,
    poll_interval: Duration,
    progress: P,
}

impl<W, P> Consumer<W, P>
where
    W: Write,
    P: Progress,
{
    const SINK_BUFFER: usize = 1 << 20;

    pub fn new(
        rx: QueueReceiver,
        sink: W,
        producers: usize,
        expected_lines: u64,
        poll_interval: Duration,
        progress: P,
    ) -> Self {
        Self {
            rx,
            sink: BufWriter::with_capacity(Self::SINK_BUFFER, sink),
            producers,
            expected_lines,
            poll_interval,
            progress,
        }
    }

    /// Runs until shutdown. The sink is flushed and released once the loop
    /// exits; on error it is still dropped before the error propagates.
    pub fn run(mut self) -> Result<ConsumerStats> {
        let stats = self.drain()?;
        self.sink
            .into_inner()
            .map_err(|err| Error::Io(err.into_error()))?;
        tracing::debug!(
            lines = stats.lines,
            batches = stats.batches,
            "writer finished"
        );
        Ok(stats)
    }

    fn drain(&mut self) -> Result<ConsumerStats> {
        let mut stats = ConsumerStats::default();

        loop {
            match self.rx.dequeue(self.poll_interval) {
                Dequeued::Item(Item::Batch(batch)) => {
                    for record in &batch.records {
                        record.write_line(&mut self.sink)?;
                    }
                    stats.lines += batch.len() as u64;
                    stats.batches += 1;
                    self.progress.advance(stats.lines, self.expected_lines);
                }
                Dequeued::Item(Item::Shutdown) => {
                    stats.shutdowns += 1;
                    tracing::trace!(shutdowns = stats.shutdowns, "producer shutdown received");
                }
                Dequeued::Timeout => {
                    tracing::trace!(shutdowns = stats.shutdowns, "writer poll timed out");
                    if stats.shutdowns >= self.producers {
                        return Ok(stats);
                    }
                }
                Dequeued::Disconnected => {
                    if stats.shutdowns >= self.producers {
                        return Ok(stats);
                    }
                    return Err(Error::Disconnected);
                }
            }
        }
    }
}
