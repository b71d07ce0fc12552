//! Core engine for process-parallel min/max computation.
//!
//! This crate provides:
//! - Deterministic array generation
//! - Partitioning of an array into contiguous worker chunks
//! - Pipe and file result channels between workers and the supervisor
//! - The supervisor that spawns, times out, kills and reaps worker processes
//! - Aggregation of per-chunk results
//! - A thread-based parallel sum utility

pub mod aggregate;
pub mod channel;
pub mod config;
pub mod error;
pub mod generate;
pub mod ipc;
pub mod partition;
pub mod sum;
pub mod supervisor;
pub mod worker;

pub use aggregate::{MinMax, aggregate};
pub use channel::{ChannelKind, ResultReceiver, ResultSender};
pub use config::{RunConfig, SumConfig};
pub use error::{Error, Result};
pub use generate::generate_array;
pub use partition::{ChunkRange, partition};
pub use sum::{SumReport, parallel_sum};
pub use supervisor::{RunReport, Supervisor, Termination, WorkerLauncher, WorkerOutcome};
pub use worker::run_assignment;
