//! minmax-worker - computes the min/max of one chunk for the minmax supervisor.
//!
//! Reads its assignment from stdin and delivers the result through the
//! channel named in the assignment: stdout (pipe) or a result file.
//! Logs go to stderr; stdout carries nothing but the result.

use anyhow::Context;

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::WARN.into()),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let stdin = std::io::stdin();
    let mut input = stdin.lock();
    let result = minmax_core::run_assignment(&mut input).context("worker failed")?;

    tracing::debug!(min = result.min, max = result.max, "result delivered");
    Ok(())
}
