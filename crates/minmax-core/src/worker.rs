//! Worker-side logic, run inside each `minmax-worker` process.
//!
//! A worker reads its assignment, scans its chunk once, delivers the result
//! through its channel and exits. It never retries and never reports
//! partial progress.

use std::io::Read;
use std::time::Duration;

use crate::aggregate::MinMax;
use crate::channel::{ResultSender, sender_for};
use crate::error::{Error, Result};
use crate::ipc::{WorkerAssignment, read_message};

/// Read an assignment from `input`, compute and deliver the result.
pub fn run_assignment<R: Read>(input: &mut R) -> Result<MinMax> {
    let assignment: WorkerAssignment = read_message(input)?;
    let mut sender = sender_for(&assignment.delivery);
    execute(&assignment, sender.as_mut())
}

/// Compute the assignment's result and send it.
pub fn execute(assignment: &WorkerAssignment, sender: &mut dyn ResultSender) -> Result<MinMax> {
    let expected = assignment
        .end
        .checked_sub(assignment.start)
        .map(|span| span + 1)
        .ok_or_else(|| {
            Error::Worker(format!(
                "invalid range [{}, {}]",
                assignment.start, assignment.end
            ))
        })?;
    if assignment.values.len() as u64 != expected {
        return Err(Error::Worker(format!(
            "chunk {} holds {} values, expected {}",
            assignment.ordinal,
            assignment.values.len(),
            expected
        )));
    }

    let result = MinMax::of(&assignment.values);
    tracing::debug!(
        ordinal = assignment.ordinal,
        start = assignment.start,
        end = assignment.end,
        min = result.min,
        max = result.max,
        "chunk scanned"
    );

    if assignment.linger_ms > 0 {
        tracing::debug!(ordinal = assignment.ordinal, linger_ms = assignment.linger_ms, "lingering");
        std::thread::sleep(Duration::from_millis(assignment.linger_ms));
    }

    sender.send(result)?;
    Ok(result)
}
