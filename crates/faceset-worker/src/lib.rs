//! Batch extraction runner.
//!
//! Scans a directory of videos, runs the per-video extraction pipeline with
//! bounded concurrency, and accounts for every video in a run summary.

pub mod config;
pub mod error;
pub mod executor;
pub mod logging;

pub use config::WorkerConfig;
pub use error::{WorkerError, WorkerResult};
pub use executor::BatchExecutor;
pub use logging::VideoLogger;
