//! The bounded batch queue between producers and the writer.
//!
//! Built on [std::sync::mpsc::sync_channel]: senders block while the queue
//! holds `capacity` items, and the single receiver waits with a timeout.

use crate::{
    err::{Error, Result},
    record::LogRecord,
};
use std::{
    sync::mpsc::{self, Receiver, RecvTimeoutError, SyncSender},
    time::Duration,
};

/// A group of records generated by one producer, transferred as one item.
#[derive(Debug)]
pub struct Batch {
    /// Index of the producer that generated this batch.
    pub producer: usize,
    /// Position of this batch in its producer's output.
    pub seq: usize,
    pub records: Vec<LogRecord>,
}

impl Batch {
    #[inline]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[derive(Debug)]
pub enum Item {
    Batch(Batch),
    /// One producer has finished. Carries no payload.
    Shutdown,
}

/// Outcome of [QueueReceiver::dequeue].
#[derive(Debug)]
pub enum Dequeued {
    Item(Item),
    /// Nothing arrived in time. Not an error.
    Timeout,
    /// Every sender is gone and the queue is drained.
    Disconnected,
}

/// Creates a queue holding at most `capacity` items.
pub fn bounded(capacity: usize) -> Result<(QueueSender, QueueReceiver)> {
    if capacity == 0 {
        return Err(Error::InvalidConfig("queue capacity must be at least 1"));
    }
    let (sx, rx) = mpsc::sync_channel(capacity);
    Ok((QueueSender(sx), QueueReceiver(rx)))
}

/// The writing half. Cloned once per producer.
#[derive(Clone)]
pub struct QueueSender(SyncSender<Item>);

impl QueueSender {
    /// Pushes an item, blocking while the queue is full.
    pub fn enqueue(&self, item: Item) -> Result<()> {
        self.0.send(item).map_err(|_| Error::Disconnected)
    }
}

/// The reading half. Not [Clone], so there is exactly one dequeuer.
pub struct QueueReceiver(Receiver<Item>);

impl QueueReceiver {
    /// Pops the next item, waiting at most `timeout` for one to arrive.
    pub fn dequeue(&self, timeout: Duration) -> Dequeued {
        match self.0.recv_timeout(timeout) {
            Ok(item) => Dequeued::Item(item),
            Err(RecvTimeoutError::Timeout) => Dequeued::Timeout,
            Err(RecvTimeoutError::Disconnected) => Dequeued::Disconnected,
        }
    }
}
