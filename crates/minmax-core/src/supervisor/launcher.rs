//! Locating and spawning the worker binary.

use std::ffi::OsString;
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::time::Instant;

use super::handle::WorkerHandle;
use crate::channel::WorkerEnd;
use crate::error::{Error, Result};
use crate::ipc::{WorkerAssignment, write_message};

/// Environment variable overriding worker binary discovery.
pub const WORKER_PATH_ENV: &str = "MINMAX_WORKER_PATH";

const WORKER_NAME: &str = if cfg!(windows) {
    "minmax-worker.exe"
} else {
    "minmax-worker"
};

/// Program (and leading arguments) started for every worker.
#[derive(Debug, Clone)]
pub struct WorkerLauncher {
    program: PathBuf,
    args: Vec<OsString>,
}

impl WorkerLauncher {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    /// Append an argument passed to every worker.
    pub fn arg(mut self, arg: impl Into<OsString>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Find the `minmax-worker` binary.
    ///
    /// Looks in the following order:
    /// 1. `MINMAX_WORKER_PATH` environment variable
    /// 2. Same directory as the current executable
    /// 3. System PATH
    /// 4. The workspace `target/{debug,release}` directories
    pub fn locate() -> Result<Self> {
        Self::find_worker_binary().map(Self::new)
    }

    pub fn program(&self) -> &Path {
        &self.program
    }

    fn find_worker_binary() -> Result<PathBuf> {
        if let Ok(path) = std::env::var(WORKER_PATH_ENV) {
            let path = PathBuf::from(path);
            if path.exists() {
                return Ok(path);
            }
            tracing::warn!(
                "{} points at {}, which does not exist",
                WORKER_PATH_ENV,
                path.display()
            );
        }

        if let Ok(exe_path) = std::env::current_exe()
            && let Some(exe_dir) = exe_path.parent()
        {
            let worker_path = exe_dir.join(WORKER_NAME);
            if worker_path.exists() {
                return Ok(worker_path);
            }
            // Test binaries live one level down, in target/<profile>/deps.
            if let Some(profile_dir) = exe_dir.parent() {
                let worker_path = profile_dir.join(WORKER_NAME);
                if worker_path.exists() {
                    return Ok(worker_path);
                }
            }
        }

        if let Ok(path) = which::which(WORKER_NAME) {
            return Ok(path);
        }

        if let Ok(manifest_dir) = std::env::var("CARGO_MANIFEST_DIR") {
            for profile in &["debug", "release"] {
                let path = PathBuf::from(&manifest_dir)
                    .join("..")
                    .join("..")
                    .join("target")
                    .join(profile)
                    .join(WORKER_NAME);
                if path.exists() {
                    return Ok(path.canonicalize().unwrap_or(path));
                }
            }
        }

        Err(Error::WorkerNotFound(format!(
            "could not find {}. Set {} or ensure it's in PATH.",
            WORKER_NAME, WORKER_PATH_ENV
        )))
    }

    /// Spawn one worker and hand it its assignment.
    ///
    /// The pipe write end (if any) is moved into the child's stdout and the
    /// supervisor's copy is closed before this returns, so the pipe reports
    /// EOF as soon as the worker dies. If the assignment cannot be handed
    /// over, the returned error drops the handle, which kills the worker.
    ///
    /// Handing over blocks until the worker has drained its stdin. With a
    /// `deadline`, a worker still blocking the hand-over when it passes is
    /// killed and returned as-is, so the caller's deadline handling sees an
    /// already killed worker instead of a stalled spawn.
    pub fn spawn(
        &self,
        assignment: &WorkerAssignment,
        worker_end: WorkerEnd,
        deadline: Option<Instant>,
    ) -> Result<WorkerHandle> {
        let ordinal = assignment.ordinal as usize;
        let stdout = match worker_end {
            WorkerEnd::Pipe(writer) => Stdio::from(writer),
            WorkerEnd::File(_) => Stdio::null(),
        };

        let child = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(stdout)
            .stderr(Stdio::inherit()) // Let worker stderr pass through for debugging
            .spawn()
            .map_err(|e| Error::Spawn {
                ordinal,
                message: format!("'{}': {}", self.program.display(), e),
            })?;

        let mut handle = WorkerHandle::new(ordinal, child);
        tracing::debug!(ordinal, pid = handle.pid(), "worker spawned");

        let stdin = handle.take_stdin().ok_or_else(|| Error::Spawn {
            ordinal,
            message: "worker stdin not captured".to_string(),
        })?;
        let mut stdin = BufWriter::new(stdin);
        let (written, expired) = match deadline {
            None => (write_message(&mut stdin, assignment), false),
            Some(deadline) => {
                write_before(&mut handle, deadline, || write_message(&mut stdin, assignment))
            }
        };
        // Closing stdin tells the worker the assignment is complete.
        drop(stdin);

        match written {
            Ok(()) => Ok(handle),
            Err(e) if expired => {
                tracing::debug!(ordinal, "hand-over cut short by the deadline: {}", e);
                Ok(handle)
            }
            Err(e) => Err(Error::Spawn {
                ordinal,
                message: format!("failed to hand over assignment: {}", e),
            }),
        }
    }
}

/// Run `write` while a watchdog kills the worker once `deadline` passes.
///
/// Returns the write result and whether the watchdog fired. The watchdog is
/// joined before returning, so the handle is never signalled afterwards.
fn write_before<F>(handle: &mut WorkerHandle, deadline: Instant, write: F) -> (Result<()>, bool)
where
    F: FnOnce() -> Result<()>,
{
    let (done_tx, done_rx) = mpsc::channel::<()>();
    std::thread::scope(|scope| {
        let target = &mut *handle;
        let watchdog = scope.spawn(move || {
            let remaining = deadline.saturating_duration_since(Instant::now());
            match done_rx.recv_timeout(remaining) {
                Err(RecvTimeoutError::Timeout) => {
                    tracing::warn!(
                        ordinal = target.ordinal(),
                        pid = target.pid(),
                        "deadline passed during hand-over; killing worker"
                    );
                    if let Err(e) = target.kill() {
                        tracing::warn!("Failed to kill worker {}: {}", target.pid(), e);
                    }
                    true
                }
                _ => false,
            }
        });

        let written = write();
        drop(done_tx);
        (written, watchdog.join().unwrap_or(false))
    })
}
