//! Result channels between worker processes and the supervisor.
//!
//! A channel carries at most one complete [`MinMax`] from one worker to the
//! supervisor. Two interchangeable strategies exist:
//!
//! - **Pipe** - an anonymous OS pipe per worker. The write end becomes the
//!   worker's stdout, the read end stays with the supervisor.
//! - **File** - a text file per worker inside a per-run directory, named from
//!   the worker's ordinal index.
//!
//! ```text
//! Supervisor                                   Worker process
//!     │                                             │
//!     ├── open_channel() ──► ResultReceiver         │
//!     │                      WorkerEnd ────────────►├── sender_for(delivery)
//!     │                                             │       └── ResultSender::send()
//!     ├── (reap)                                    │
//!     └── ResultReceiver::receive() ◄── pipe / file ┘
//! ```

mod file;
mod pipe;

use std::io::PipeWriter;
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::aggregate::MinMax;
use crate::error::Result;
use crate::ipc::Delivery;

pub use file::{FileReceiver, FileSender, RunDirectory, parse_pair, result_file_name};
pub use pipe::{PAIR_LEN, PipeReceiver, PipeSender, decode_pair, encode_pair};

/// Result delivery strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ChannelKind {
    Pipe,
    File,
}

impl std::fmt::Display for ChannelKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ChannelKind::Pipe => write!(f, "pipe"),
            ChannelKind::File => write!(f, "file"),
        }
    }
}

/// Supervisor side of a channel.
pub trait ResultReceiver: Send {
    /// Ordinal of the worker this channel belongs to.
    fn ordinal(&self) -> usize;

    fn kind(&self) -> ChannelKind;

    /// Read the worker's result.
    ///
    /// Must only be called once the worker has been reaped. Returns `None`
    /// when no complete result was delivered.
    fn receive(&mut self) -> Option<MinMax>;

    /// Release every resource the channel still holds.
    fn cleanup(&mut self) -> Result<()>;
}

/// Worker side of a channel.
pub trait ResultSender {
    /// Deliver the result. All-or-nothing from the receiver's point of view.
    fn send(&mut self, result: MinMax) -> Result<()>;
}

/// The end of a channel handed to the worker at spawn time.
#[derive(Debug)]
pub enum WorkerEnd {
    /// Becomes the worker's stdout.
    Pipe(PipeWriter),
    /// Path the worker writes its result to.
    File(PathBuf),
}

impl WorkerEnd {
    /// Delivery instructions to embed in the worker's assignment.
    pub fn delivery(&self) -> Delivery {
        match self {
            WorkerEnd::Pipe(_) => Delivery::Pipe,
            WorkerEnd::File(path) => Delivery::File {
                path: path.to_string_lossy().into_owned(),
            },
        }
    }
}

/// Both ends of a freshly opened channel.
pub struct OpenChannel {
    pub receiver: Box<dyn ResultReceiver>,
    pub worker_end: WorkerEnd,
}

/// Open the channel for worker `ordinal`.
///
/// `run_dir` is only consulted for file channels.
pub fn open_channel(kind: ChannelKind, ordinal: usize, run_dir: &Path) -> Result<OpenChannel> {
    match kind {
        ChannelKind::Pipe => {
            let (receiver, writer) = PipeReceiver::open(ordinal)?;
            Ok(OpenChannel {
                receiver: Box::new(receiver),
                worker_end: WorkerEnd::Pipe(writer),
            })
        }
        ChannelKind::File => {
            let receiver = FileReceiver::open(run_dir, ordinal)?;
            let path = receiver.path().to_path_buf();
            Ok(OpenChannel {
                receiver: Box::new(receiver),
                worker_end: WorkerEnd::File(path),
            })
        }
    }
}

/// Build the worker-side sender for a delivery.
pub fn sender_for(delivery: &Delivery) -> Box<dyn ResultSender> {
    match delivery {
        Delivery::Pipe => Box::new(PipeSender::new(std::io::stdout())),
        Delivery::File { path } => Box::new(FileSender::new(path)),
    }
}
