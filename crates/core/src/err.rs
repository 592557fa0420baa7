//! Error types and utilities.

use crate::record::ParseError;

#[derive(thiserror::Error, Debug)]
/// Represents an error that can occur while generating or analyzing logs.
pub enum Error {
    /// An I/O error occurred, usually while writing to the output sink.
    #[error("i/o error {0}")]
    Io(#[from] std::io::Error),

    /// A record could not be generated from the vocabulary.
    #[error("generation error: {0}")]
    Generation(String),

    /// The other end of the batch queue hung up.
    #[error("batch queue disconnected")]
    Disconnected,

    /// A worker thread panicked before it could report a result.
    #[error("{0} worker panicked")]
    WorkerPanicked(&'static str),

    /// The configuration cannot drive a run.
    #[error("invalid configuration: {0}")]
    InvalidConfig(&'static str),

    /// A log line could not be parsed.
    #[error("parse error: {0}")]
    Parse(#[from] ParseError),
}

/// A specialized [Result] type for this crate's operations.
pub type Result<T, E = Error> = std::result::Result<T, E>;
