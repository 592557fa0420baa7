//! The orchestrator: sizes the run, starts the writer and the producers, and
//! drives the shutdown handshake.
//!
//! Ordering matters here. The writer starts first, then every producer. Only
//! after all producers are joined does the orchestrator enqueue one
//! [Item::Shutdown] per producer, so the writer cannot see its last shutdown
//! before every batch is already ahead of it in the queue.

use crate::{
    config::Config,
    consumer::{Consumer, ConsumerStats, Progress},
    err::{Error, Result},
    generator::{LineGenerator, Vocabulary},
    partition::Workload,
    producer::Producer,
    queue::{self, Item},
};
use rand::{rngs::SmallRng, SeedableRng};
use std::{
    fs::OpenOptions,
    io::Write,
    sync::atomic::AtomicBool,
    thread,
    time::{Duration, Instant},
};

/// Summary of a finished run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Report {
    pub requested_lines: u64,
    pub written_lines: u64,
    pub batches: u64,
    pub producers: usize,
    /// Lines lost to per-producer truncation to whole batches.
    pub dropped_lines: u64,
    pub elapsed: Duration,
}

pub struct Pipeline {
    config: Config,
    vocab: Vocabulary,
}

impl Pipeline {
    pub fn new(config: Config) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            vocab: Vocabulary::default(),
        })
    }

    pub fn with_vocabulary(mut self, vocab: Vocabulary) -> Self {
        self.vocab = vocab;
        self
    }

    #[inline]
    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn workload(&self) -> Workload {
        Workload::new(
            self.config.total_lines(),
            self.config.producers,
            self.config.batch_size,
        )
    }

    fn rng_for(&self, producer: usize) -> SmallRng {
        match self.config.seed {
            Some(seed) => SmallRng::seed_from_u64(seed.wrapping_add(producer as u64)),
            None => SmallRng::from_os_rng(),
        }
    }

    /// Creates (or truncates) the configured output file and fills it.
    pub fn generate_file<P: Progress>(&self, progress: P) -> Result<Report> {
        let file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(&self.config.output)?;
        tracing::info!(path = %self.config.output.display(), "writing logs");
        self.run(file, progress)
    }

    /// Runs the whole pipeline into `sink`, blocking until every worker is done.
    pub fn run<W, P>(&self, sink: W, progress: P) -> Result<Report>
    where
        W: Write + Send,
        P: Progress,
    {
        let workload = self.workload();
        let producers = workload.producers();
        let requested = workload.requested_lines();

        if workload.dropped_lines() > 0 {
            tracing::warn!(
                requested,
                written = workload.written_lines(),
                dropped = workload.dropped_lines(),
                "line count is not a multiple of the batch size per producer; remainder is not generated"
            );
        }
        tracing::info!(
            lines = workload.written_lines(),
            producers,
            batch_size = self.config.batch_size,
            queue_capacity = self.config.queue_capacity,
            "starting generation"
        );

        let generators = (0..producers)
            .map(|i| LineGenerator::new(&self.vocab, self.rng_for(i)))
            .collect::<Result<Vec<_>>>()?;

        let (sx, rx) = queue::bounded(self.config.queue_capacity)?;
        let abort = AtomicBool::new(false);
        let start = Instant::now();

        let stats = thread::scope(|s| -> Result<ConsumerStats> {
            let consumer = Consumer::new(
                rx,
                sink,
                producers,
                requested,
                self.config.poll_interval(),
                progress,
            );
            let writer = thread::Builder::new()
                .name("loggen-writer".into())
                .spawn_scoped(s, move || consumer.run())?;

            let mut handles = Vec::with_capacity(producers);
            for (i, generator) in generators.into_iter().enumerate() {
                let producer = Producer::new(
                    i,
                    generator,
                    sx.clone(),
                    workload.batches_of(i),
                    self.config.batch_size,
                    &abort,
                );
                let handle = thread::Builder::new()
                    .name(format!("loggen-producer-{i}"))
                    .spawn_scoped(s, move || producer.run())?;
                handles.push(handle);
            }

            let mut first_failure = None;
            for (i, handle) in handles.into_iter().enumerate() {
                let result = handle
                    .join()
                    .map_err(|_| Error::WorkerPanicked("producer"))
                    .and_then(|r| r);
                if let Err(err) = result {
                    tracing::error!(producer = i, %err, "producer failed");
                    first_failure.get_or_insert(err);
                }
            }

            for _ in 0..producers {
                // The writer is gone; its own error is reported below.
                if sx.enqueue(Item::Shutdown).is_err() {
                    break;
                }
            }
            drop(sx);

            let written = writer
                .join()
                .map_err(|_| Error::WorkerPanicked("writer"))
                .and_then(|r| r);
            if let Err(err) = &written {
                tracing::error!(%err, "writer failed");
            }

            match (written, first_failure) {
                (Err(err), _) => Err(err),
                (Ok(_), Some(err)) => Err(err),
                (Ok(stats), None) => Ok(stats),
            }
        })?;

        let report = Report {
            requested_lines: requested,
            written_lines: stats.lines,
            batches: stats.batches,
            producers,
            dropped_lines: requested - stats.lines,
            elapsed: start.elapsed(),
        };
        tracing::info!(
            lines = report.written_lines,
            batches = report.batches,
            elapsed_ms = report.elapsed.as_millis() as u64,
            "generation finished"
        );
        Ok(report)
    }
}
