//! The supervisor: fan-out of worker processes and fan-in of their results.
//!
//! # Run lifecycle
//!
//! ```text
//! Idle ──► Spawning ──► Running ──┬──► Draining ──┬──► Reaping ──► Done
//!                                 └──► TimedOut ──┘
//! ```
//!
//! - **Spawning** - every channel is opened before the first spawn, then one
//!   worker per chunk is started in ordinal order. A failed spawn aborts the
//!   run: already-started workers are killed and reaped.
//! - **Draining** - no deadline: block until every worker is reaped.
//! - **TimedOut** - deadline armed: poll without blocking, sleeping the poll
//!   interval between empty passes. When the deadline expires every live
//!   worker receives SIGKILL back-to-back, then all are reaped.
//! - **Reaping** - every reaped worker's channel is read once; missing
//!   results fall back to the reduction identity.

mod handle;
mod launcher;

use std::path::PathBuf;
use std::time::{Duration, Instant};

use serde::Serialize;

use crate::aggregate::{MinMax, aggregate};
use crate::channel::{ChannelKind, ResultReceiver, RunDirectory, WorkerEnd, open_channel};
use crate::config::RunConfig;
use crate::error::{Error, Result};
use crate::generate::generate_array;
use crate::ipc::WorkerAssignment;
use crate::partition::{ChunkRange, partition};

pub use handle::{Termination, WorkerHandle, broadcast_kill};
pub use launcher::{WORKER_PATH_ENV, WorkerLauncher};

/// Phases of a supervised run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SupervisorState {
    Idle,
    Spawning,
    Running,
    Draining,
    TimedOut,
    Reaping,
    Done,
}

/// What happened to one worker.
#[derive(Debug, Clone, Serialize)]
pub struct WorkerOutcome {
    pub ordinal: usize,
    pub pid: u32,
    pub range: ChunkRange,
    pub termination: Termination,
    /// The delivered result, or `None` if nothing complete arrived.
    pub result: Option<MinMax>,
}

/// Result of a supervised run.
#[derive(Debug, Clone)]
pub struct RunReport {
    /// Aggregate over all chunks; missing chunks contribute the identity.
    pub result: MinMax,
    /// From the first spawn attempt until every worker was reaped.
    pub elapsed: Duration,
    /// Whether the deadline fired and workers were killed.
    pub timed_out: bool,
    pub channel: ChannelKind,
    pub outcomes: Vec<WorkerOutcome>,
    /// States visited, in order.
    pub trail: Vec<SupervisorState>,
}

impl RunReport {
    pub fn workers(&self) -> usize {
        self.outcomes.len()
    }

    /// Number of workers that delivered a complete result.
    pub fn reported(&self) -> usize {
        self.outcomes.iter().filter(|o| o.result.is_some()).count()
    }

    /// True when at least one chunk is missing from the aggregate.
    pub fn is_degraded(&self) -> bool {
        self.reported() < self.workers()
    }

    pub fn elapsed_ms(&self) -> f64 {
        self.elapsed.as_secs_f64() * 1000.0
    }
}

/// Channel receivers of a run; cleaned up however the run ends.
struct Channels {
    receivers: Vec<Box<dyn ResultReceiver>>,
}

impl Drop for Channels {
    fn drop(&mut self) {
        for receiver in self.receivers.iter_mut() {
            if let Err(e) = receiver.cleanup() {
                tracing::warn!(
                    "Failed to clean up {} channel {}: {}",
                    receiver.kind(),
                    receiver.ordinal(),
                    e
                );
            }
        }
    }
}

/// Spawns, supervises and reaps worker processes for one configuration.
pub struct Supervisor {
    config: RunConfig,
    launcher: WorkerLauncher,
}

impl Supervisor {
    /// Create a supervisor. Fails if the configuration is invalid.
    pub fn new(config: RunConfig, launcher: WorkerLauncher) -> Result<Self> {
        config.validate()?;
        Ok(Self { config, launcher })
    }

    /// Generate the configured array and run over it.
    pub fn run(&self) -> Result<RunReport> {
        let array = generate_array(self.config.seed, self.config.array_size);
        self.run_on(&array)
    }

    /// Run over a caller-supplied array.
    ///
    /// The array length takes the place of the configured array size.
    pub fn run_on(&self, array: &[i32]) -> Result<RunReport> {
        let mut trail = vec![SupervisorState::Idle];
        let ranges = partition(array.len(), self.config.workers)?;
        let kind = self.config.channel;

        advance(&mut trail, SupervisorState::Spawning);
        let run_dir = match kind {
            ChannelKind::File => Some(RunDirectory::create(&self.config.results_dir)?),
            ChannelKind::Pipe => None,
        };
        let dir = run_dir
            .as_ref()
            .map(|d| d.path().to_path_buf())
            .unwrap_or_else(PathBuf::new);

        // All channels exist before the first worker does.
        let mut channels = Channels {
            receivers: Vec::with_capacity(ranges.len()),
        };
        let mut worker_ends = Vec::with_capacity(ranges.len());
        for range in &ranges {
            let opened = open_channel(kind, range.ordinal, &dir)?;
            channels.receivers.push(opened.receiver);
            worker_ends.push(opened.worker_end);
        }

        let linger_ms = self
            .config
            .linger
            .map(|d| d.as_millis() as u64)
            .unwrap_or(0);
        let spawn_start = Instant::now();
        let deadline = self.config.timeout.map(|t| spawn_start + t);

        let mut handles: Vec<WorkerHandle> = Vec::with_capacity(ranges.len());
        for (range, worker_end) in ranges.iter().zip(worker_ends) {
            match self.spawn_worker(array, range, worker_end, linger_ms, deadline) {
                Ok(handle) => handles.push(handle),
                Err(e) => {
                    tracing::error!(
                        "Aborting run: {}; terminating {} spawned workers",
                        e,
                        handles.len()
                    );
                    broadcast_kill(&mut handles);
                    for handle in handles.iter_mut() {
                        if let Err(reap_err) = handle.reap() {
                            tracing::warn!("Failed to reap worker {}: {}", handle.pid(), reap_err);
                        }
                    }
                    return Err(e);
                }
            }
        }

        advance(&mut trail, SupervisorState::Running);
        let timed_out = match deadline {
            None => {
                advance(&mut trail, SupervisorState::Draining);
                drain(&mut handles);
                false
            }
            Some(deadline) => {
                // Workers killed during hand-over count as a fired deadline too.
                let fired = wait_until(&mut handles, deadline, self.config.poll_interval)
                    || handles.iter().any(|h| h.termination() == Termination::Killed);
                advance(
                    &mut trail,
                    if fired {
                        SupervisorState::TimedOut
                    } else {
                        SupervisorState::Draining
                    },
                );
                fired
            }
        };
        let elapsed = spawn_start.elapsed();

        advance(&mut trail, SupervisorState::Reaping);
        let outcomes: Vec<WorkerOutcome> = handles
            .iter()
            .zip(channels.receivers.iter_mut())
            .zip(&ranges)
            .map(|((handle, receiver), range)| {
                // Never read the channel of a worker that may still be running.
                let result = if handle.is_alive() {
                    tracing::warn!(ordinal = handle.ordinal(), "worker not reaped; result discarded");
                    None
                } else {
                    receiver.receive()
                };
                WorkerOutcome {
                    ordinal: handle.ordinal(),
                    pid: handle.pid(),
                    range: *range,
                    termination: handle.termination(),
                    result,
                }
            })
            .collect();

        let result = aggregate(outcomes.iter().map(|o| o.result));

        // Unreaped workers are killed here, before their channels go away.
        drop(handles);
        drop(channels);
        drop(run_dir);
        advance(&mut trail, SupervisorState::Done);

        let report = RunReport {
            result,
            elapsed,
            timed_out,
            channel: kind,
            outcomes,
            trail,
        };

        if report.is_degraded() {
            tracing::warn!(
                reported = report.reported(),
                workers = report.workers(),
                "run degraded: missing chunks contribute the identity"
            );
        }
        tracing::info!(
            min = report.result.min,
            max = report.result.max,
            elapsed_ms = report.elapsed_ms(),
            timed_out,
            "run complete"
        );

        Ok(report)
    }

    fn spawn_worker(
        &self,
        array: &[i32],
        range: &ChunkRange,
        worker_end: WorkerEnd,
        linger_ms: u64,
        deadline: Option<Instant>,
    ) -> Result<WorkerHandle> {
        let assignment = WorkerAssignment {
            ordinal: range.ordinal as u64,
            start: range.start as u64,
            end: range.end as u64,
            values: array
                .get(range.as_range())
                .ok_or_else(|| {
                    Error::InvalidConfiguration(format!(
                        "chunk [{}, {}] outside array of {}",
                        range.start,
                        range.end,
                        array.len()
                    ))
                })?
                .to_vec(),
            delivery: worker_end.delivery(),
            linger_ms,
        };
        self.launcher.spawn(&assignment, worker_end, deadline)
    }
}

fn advance(trail: &mut Vec<SupervisorState>, next: SupervisorState) {
    if let Some(current) = trail.last() {
        tracing::debug!("supervisor {:?} -> {:?}", current, next);
    }
    trail.push(next);
}

/// Block until every worker is reaped, in spawn order.
///
/// A failing wait stops the loop; remaining workers stay unreaped.
fn drain(handles: &mut [WorkerHandle]) {
    let mut outstanding = handles.iter().filter(|h| h.is_alive()).count();
    for handle in handles.iter_mut().filter(|h| h.is_alive()) {
        if let Err(e) = handle.reap() {
            tracing::error!(
                "waiting for worker {} failed: {}; {} workers left unreaped",
                handle.pid(),
                e,
                outstanding
            );
            return;
        }
        outstanding -= 1;
    }
}

/// Reap workers until all are done or `deadline` passes.
///
/// Returns `true` if the deadline fired and live workers were killed.
fn wait_until(handles: &mut [WorkerHandle], deadline: Instant, poll_interval: Duration) -> bool {
    let mut outstanding = handles.iter().filter(|h| h.is_alive()).count();

    while outstanding > 0 {
        let mut reaped_any = false;
        for handle in handles.iter_mut().filter(|h| h.is_alive()) {
            match handle.try_reap() {
                Ok(true) => {
                    outstanding -= 1;
                    reaped_any = true;
                }
                Ok(false) => {}
                Err(e) => {
                    tracing::error!(
                        "polling worker {} failed: {}; {} workers left unreaped",
                        handle.pid(),
                        e,
                        outstanding
                    );
                    return false;
                }
            }
        }
        if reaped_any {
            continue;
        }

        let now = Instant::now();
        if now >= deadline {
            let killed = broadcast_kill(handles);
            tracing::info!(killed, "deadline expired");
            // Termination is certain now, so blocking is fine.
            drain(handles);
            return true;
        }
        std::thread::sleep(poll_interval.min(deadline - now));
    }

    false
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use tempfile::TempDir;

    /// A stand-in worker that consumes its assignment and reports nothing.
    fn silent_launcher() -> WorkerLauncher {
        WorkerLauncher::new("sh").arg("-c").arg("cat >/dev/null")
    }

    /// A stand-in worker that never finishes on its own.
    fn hanging_launcher() -> WorkerLauncher {
        WorkerLauncher::new("sh").arg("-c").arg("exec sleep 30")
    }

    #[test]
    fn test_new_rejects_invalid_config() {
        let result = Supervisor::new(RunConfig::new(1, 2, 3), silent_launcher());
        assert!(matches!(result, Err(Error::InvalidConfiguration(_))));
    }

    #[test]
    fn test_silent_workers_degrade_to_identity() {
        let temp = TempDir::new().unwrap();
        let config = RunConfig::new(5, 100, 4)
            .with_channel(ChannelKind::File)
            .with_results_dir(temp.path());
        let supervisor = Supervisor::new(config, silent_launcher()).unwrap();

        let report = supervisor.run().unwrap();
        assert!(report.result.is_identity());
        assert_eq!(report.workers(), 4);
        assert_eq!(report.reported(), 0);
        assert!(report.is_degraded());
        assert!(!report.timed_out);
        assert!(report.outcomes.iter().all(|o| o.termination.is_success()));
        assert_eq!(
            report.trail,
            vec![
                SupervisorState::Idle,
                SupervisorState::Spawning,
                SupervisorState::Running,
                SupervisorState::Draining,
                SupervisorState::Reaping,
                SupervisorState::Done,
            ]
        );
        assert_eq!(std::fs::read_dir(temp.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_deadline_kills_hanging_workers() {
        let config = RunConfig::new(5, 64, 4).with_timeout(Some(Duration::from_millis(100)));
        let supervisor = Supervisor::new(config, hanging_launcher()).unwrap();

        let report = supervisor.run().unwrap();
        assert!(report.timed_out);
        assert!(report.elapsed >= Duration::from_millis(100));
        assert!(report.elapsed < Duration::from_secs(5));
        assert!(report.result.is_identity());
        assert!(
            report
                .outcomes
                .iter()
                .all(|o| o.termination == Termination::Killed)
        );
        assert!(report.trail.contains(&SupervisorState::TimedOut));
    }

    #[test]
    fn test_silent_pipe_workers() {
        let supervisor = Supervisor::new(RunConfig::new(5, 100, 3), silent_launcher()).unwrap();
        let report = supervisor.run().unwrap();
        assert_eq!(report.channel, ChannelKind::Pipe);
        assert_eq!(report.reported(), 0);
        assert_eq!(report.result.clamped(), (0, 0));
    }

    #[test]
    fn test_deadline_not_reached() {
        let config = RunConfig::new(5, 64, 2).with_timeout(Some(Duration::from_secs(10)));
        let supervisor = Supervisor::new(config, silent_launcher()).unwrap();

        let report = supervisor.run().unwrap();
        assert!(!report.timed_out);
        assert!(report.elapsed < Duration::from_secs(10));
        assert!(!report.trail.contains(&SupervisorState::TimedOut));
    }

    #[test]
    fn test_spawn_failure_aborts_and_cleans_up() {
        let temp = TempDir::new().unwrap();
        let config = RunConfig::new(5, 100, 3)
            .with_channel(ChannelKind::File)
            .with_results_dir(temp.path());
        let supervisor =
            Supervisor::new(config, WorkerLauncher::new("/nonexistent/minmax-worker")).unwrap();

        let err = supervisor.run().unwrap_err();
        assert!(matches!(err, Error::Spawn { ordinal: 0, .. }));
        assert_eq!(std::fs::read_dir(temp.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_spawn_failure_kills_earlier_workers() {
        // The first worker drains its assignment, records its pid and hangs;
        // every later one exits without reading, breaking the hand-over.
        let markers = TempDir::new().unwrap();
        let script = r#"if mkdir "$1/first" 2>/dev/null; then
    echo $$ > "$1/first/pid"
    cat >/dev/null
    exec sleep 30
fi
exit 0"#;
        let launcher = WorkerLauncher::new("sh")
            .arg("-c")
            .arg(script)
            .arg("sh")
            .arg(markers.path());
        let supervisor = Supervisor::new(RunConfig::new(1, 400_000, 3), launcher).unwrap();

        let start = Instant::now();
        let err = supervisor.run().unwrap_err();
        assert!(matches!(err, Error::Spawn { ordinal: 1, .. }), "{err}");
        assert!(start.elapsed() < Duration::from_secs(10));

        let pid: libc::pid_t = std::fs::read_to_string(markers.path().join("first/pid"))
            .unwrap()
            .trim()
            .parse()
            .unwrap();
        let rc = unsafe { libc::kill(pid, 0) };
        assert_eq!(rc, -1, "worker 0 (pid {pid}) outlived the aborted run");
    }

    #[test]
    fn test_deadline_bounds_stalled_hand_over() {
        // Workers never read stdin, and each chunk exceeds the pipe buffer.
        let config =
            RunConfig::new(1, 400_000, 2).with_timeout(Some(Duration::from_millis(200)));
        let supervisor = Supervisor::new(config, hanging_launcher()).unwrap();

        let report = supervisor.run().unwrap();
        assert!(report.timed_out);
        assert!(report.elapsed < Duration::from_secs(5));
        assert_eq!(report.reported(), 0);
        assert!(
            report
                .outcomes
                .iter()
                .all(|o| o.termination == Termination::Killed)
        );
        assert!(report.trail.contains(&SupervisorState::TimedOut));
    }
}
