//! A load generator and latency meter for key-value store clients.
//!
//! Work items flow through a producer pool and a consumer pool connected by
//! work queues.  Each pool applies an [`Operation`] to every item against a
//! [`Store`] handle and records how long it took; the [`Benchmark`] collects
//! the finished items and reports per-stage latency.

pub mod benchmark;
pub mod config;
pub mod db;
mod error;
pub mod generators;
pub mod operation;
pub mod queue;
pub mod stats;
pub mod work;
pub mod worker;

pub use benchmark::{Benchmark, Report};
pub use config::BenchmarkConfig;
pub use db::Store;
pub use error::Error;
pub use operation::Operation;
