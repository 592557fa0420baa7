pub mod analyze;
pub mod config;
pub mod consumer;
pub mod generator;
pub mod partition;
pub mod pipeline;
pub mod producer;
pub mod queue;
pub mod record;

pub mod err;

pub use analyze::{analyze_file, Analytics};
pub use config::Config;
pub use consumer::{NoProgress, Progress};
pub use err::Result;
pub use generator::{LineGenerator, Vocabulary};
pub use pipeline::{Pipeline, Report};
pub use record::{Level, LogRecord, Method};
