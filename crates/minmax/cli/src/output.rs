//! Report formatting for the minmax CLI.
//!
//! Text output keeps the classic three-line layout; reduction identities are
//! printed as `0`. JSON output carries the raw values and degradation details.

use minmax_core::{ChannelKind, RunReport, SumReport, WorkerOutcome};
use serde::Serialize;

#[derive(Serialize)]
struct RunSummary<'a> {
    min: i32,
    max: i32,
    elapsed_ms: f64,
    channel: ChannelKind,
    timed_out: bool,
    workers: usize,
    reported: usize,
    degraded: bool,
    outcomes: &'a [WorkerOutcome],
}

#[derive(Serialize)]
struct SumSummary<'a> {
    #[serde(flatten)]
    report: &'a SumReport,
    elapsed_seconds: f64,
}

pub fn print_run(report: &RunReport, json: bool) -> anyhow::Result<()> {
    if json {
        let summary = RunSummary {
            min: report.result.min,
            max: report.result.max,
            elapsed_ms: report.elapsed_ms(),
            channel: report.channel,
            timed_out: report.timed_out,
            workers: report.workers(),
            reported: report.reported(),
            degraded: report.is_degraded(),
            outcomes: &report.outcomes,
        };
        println!("{}", serde_json::to_string_pretty(&summary)?);
        return Ok(());
    }

    let (min, max) = report.result.clamped();
    println!("Min: {}", min);
    println!("Max: {}", max);
    println!("Elapsed time: {:.6}ms", report.elapsed_ms());
    Ok(())
}

pub fn print_sum(report: &SumReport, json: bool) -> anyhow::Result<()> {
    if json {
        let summary = SumSummary {
            report,
            elapsed_seconds: report.elapsed.as_secs_f64(),
        };
        println!("{}", serde_json::to_string_pretty(&summary)?);
        return Ok(());
    }

    println!("Total sum: {}", report.total);
    println!("Elapsed time: {:.6} seconds", report.elapsed.as_secs_f64());
    println!("Array size: {}", report.array_size);
    println!("Threads number: {}", report.threads);
    println!("Seed: {}", report.seed);
    Ok(())
}
