//! Thread-based parallel sum.
//!
//! A plain reduction over threads: no cancellation and no result channels.

use std::time::{Duration, Instant};

use rayon::prelude::*;
use serde::Serialize;

use crate::config::SumConfig;
use crate::error::{Error, Result};
use crate::generate::generate_array;
use crate::partition::balanced_segments;

/// Result of a parallel sum.
#[derive(Debug, Clone, Serialize)]
pub struct SumReport {
    pub total: i64,
    /// Time spent summing; array generation is excluded.
    #[serde(skip)]
    pub elapsed: Duration,
    pub threads: usize,
    pub array_size: usize,
    pub seed: u32,
}

/// Sum `values` on `threads` threads, one balanced segment each.
pub fn sum_segments(values: &[i32], threads: usize) -> Result<i64> {
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(threads)
        .thread_name(|i| format!("sum-{}", i))
        .build()
        .map_err(|e| Error::InvalidConfiguration(format!("cannot build thread pool: {}", e)))?;

    let segments = balanced_segments(values.len(), threads);
    let total = pool.install(|| {
        segments
            .par_iter()
            .map(|segment| values[segment.clone()].iter().map(|&v| i64::from(v)).sum::<i64>())
            .sum()
    });
    Ok(total)
}

/// Generate the configured array and sum it in parallel.
pub fn parallel_sum(config: &SumConfig) -> Result<SumReport> {
    config.validate()?;
    let values = generate_array(config.seed, config.array_size);

    let start = Instant::now();
    let total = sum_segments(&values, config.threads)?;
    let elapsed = start.elapsed();

    tracing::info!(total, threads = config.threads, "parallel sum complete");
    Ok(SumReport {
        total,
        elapsed,
        threads: config.threads,
        array_size: config.array_size,
        seed: config.seed,
    })
}
