//! Handles to spawned worker processes.

use std::io;
use std::process::{Child, ChildStdin, ExitStatus};

use serde::Serialize;

/// How a worker process ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum Termination {
    /// Exited on its own with this status code.
    Exited(i32),
    /// Killed by a signal the supervisor did not send.
    Signaled(i32),
    /// Killed by the supervisor's deadline broadcast.
    Killed,
    /// Never confirmed terminated by a successful reap.
    Unreaped,
}

impl Termination {
    fn from_status(status: ExitStatus, killed_by_supervisor: bool) -> Self {
        if let Some(code) = status.code() {
            return Termination::Exited(code);
        }

        #[cfg(unix)]
        {
            use std::os::unix::process::ExitStatusExt;
            if let Some(signal) = status.signal() {
                if killed_by_supervisor && signal == libc::SIGKILL {
                    return Termination::Killed;
                }
                return Termination::Signaled(signal);
            }
        }

        if killed_by_supervisor {
            Termination::Killed
        } else {
            Termination::Exited(-1)
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Termination::Exited(0))
    }
}

impl std::fmt::Display for Termination {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Termination::Exited(code) => write!(f, "exited with code {}", code),
            Termination::Signaled(signal) => write!(f, "killed by signal {}", signal),
            Termination::Killed => write!(f, "killed at deadline"),
            Termination::Unreaped => write!(f, "not reaped"),
        }
    }
}

/// Supervisor-owned handle to one worker process.
///
/// Dropping a handle whose process has not been reaped kills and reaps it,
/// so no exit path of the supervisor leaves orphaned workers behind.
pub struct WorkerHandle {
    ordinal: usize,
    pid: u32,
    child: Child,
    /// False once the process has been reaped.
    alive: bool,
    /// Whether the supervisor sent SIGKILL.
    killed: bool,
    termination: Termination,
}

impl WorkerHandle {
    pub fn new(ordinal: usize, child: Child) -> Self {
        Self {
            ordinal,
            pid: child.id(),
            child,
            alive: true,
            killed: false,
            termination: Termination::Unreaped,
        }
    }

    pub fn ordinal(&self) -> usize {
        self.ordinal
    }

    pub fn pid(&self) -> u32 {
        self.pid
    }

    /// True until the process has been reaped.
    pub fn is_alive(&self) -> bool {
        self.alive
    }

    pub fn termination(&self) -> Termination {
        self.termination
    }

    pub(crate) fn take_stdin(&mut self) -> Option<ChildStdin> {
        self.child.stdin.take()
    }

    /// Reap the process if it has terminated (non-blocking).
    ///
    /// Returns `true` once the process is reaped.
    pub fn try_reap(&mut self) -> io::Result<bool> {
        if !self.alive {
            return Ok(true);
        }
        match self.child.try_wait()? {
            Some(status) => {
                self.record(status);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Block until the process terminates and reap it.
    pub fn reap(&mut self) -> io::Result<()> {
        if !self.alive {
            return Ok(());
        }
        let status = self.child.wait()?;
        self.record(status);
        Ok(())
    }

    /// Send SIGKILL without waiting.
    pub fn kill(&mut self) -> io::Result<()> {
        if !self.alive {
            return Ok(());
        }
        self.killed = true;

        // The pid cannot have been recycled: it is only released by our own reap.
        #[cfg(unix)]
        let result = {
            let rc = unsafe { libc::kill(self.pid as libc::pid_t, libc::SIGKILL) };
            if rc == 0 {
                Ok(())
            } else {
                Err(io::Error::last_os_error())
            }
        };

        #[cfg(not(unix))]
        let result = self.child.kill();

        result
    }

    fn record(&mut self, status: ExitStatus) {
        self.alive = false;
        self.termination = Termination::from_status(status, self.killed);
        tracing::debug!(
            ordinal = self.ordinal,
            pid = self.pid,
            "worker reaped: {}",
            self.termination
        );
    }
}

impl Drop for WorkerHandle {
    fn drop(&mut self) {
        if !self.alive {
            return;
        }
        tracing::debug!(ordinal = self.ordinal, pid = self.pid, "killing unreaped worker");
        if let Err(e) = self.kill() {
            tracing::warn!("Failed to kill worker {}: {}", self.pid, e);
        }
        if let Err(e) = self.reap() {
            tracing::warn!("Failed to reap worker {}: {}", self.pid, e);
        }
    }
}

/// Kill every live worker back-to-back.
///
/// Targets are selected first and then signalled in a tight loop, with no
/// reaping in between. Already reaped workers are left alone. Returns how
/// many signals were delivered.
pub fn broadcast_kill(handles: &mut [WorkerHandle]) -> usize {
    let targets: Vec<&mut WorkerHandle> = handles.iter_mut().filter(|h| h.alive).collect();

    let mut delivered = 0;
    let mut failures = Vec::new();
    for handle in targets {
        match handle.kill() {
            Ok(()) => delivered += 1,
            Err(e) => failures.push((handle.pid, e)),
        }
    }

    for (pid, e) in failures {
        tracing::warn!("Failed to kill worker {}: {}", pid, e);
    }
    delivered
}
