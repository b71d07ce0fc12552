//! Inter-process communication with worker processes.
//!
//! The supervisor hands each worker its assignment over the worker's stdin.
//! Results travel back through a [`crate::channel`] instead.

pub mod protocol;

pub use protocol::{Delivery, MAX_CHUNK_LEN, WorkerAssignment, read_message, write_message};
