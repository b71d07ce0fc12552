//! Run configuration for the supervisor and the parallel sum utility.

use std::path::PathBuf;
use std::time::Duration;

use crate::channel::ChannelKind;
use crate::error::{Error, Result};
use crate::ipc::MAX_CHUNK_LEN;

/// How often the supervisor polls for terminated workers while a deadline is armed.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(5);

/// Configuration for one min/max run.
#[derive(Debug, Clone)]
pub struct RunConfig {
    /// Seed for the array generator.
    pub seed: u32,
    /// Number of elements in the array.
    pub array_size: usize,
    /// Number of worker processes (one chunk each).
    pub workers: usize,
    /// Result delivery strategy.
    pub channel: ChannelKind,
    /// Optional deadline, measured from the first spawn attempt.
    pub timeout: Option<Duration>,
    /// Test hook: workers sleep this long before delivering their result.
    pub linger: Option<Duration>,
    /// Parent directory for file channel run directories.
    pub results_dir: PathBuf,
    /// Sleep between non-blocking reap passes while a deadline is armed.
    pub poll_interval: Duration,
}

impl RunConfig {
    /// Create a configuration with pipe channels and no deadline.
    pub fn new(seed: u32, array_size: usize, workers: usize) -> Self {
        Self {
            seed,
            array_size,
            workers,
            channel: ChannelKind::Pipe,
            timeout: None,
            linger: None,
            results_dir: std::env::temp_dir(),
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }

    pub fn with_channel(mut self, channel: ChannelKind) -> Self {
        self.channel = channel;
        self
    }

    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_linger(mut self, linger: Option<Duration>) -> Self {
        self.linger = linger;
        self
    }

    pub fn with_results_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.results_dir = dir.into();
        self
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Check that every parameter is in range.
    pub fn validate(&self) -> Result<()> {
        if self.seed == 0 {
            return Err(Error::InvalidConfiguration(
                "seed must be a positive number".to_string(),
            ));
        }
        if self.array_size == 0 {
            return Err(Error::InvalidConfiguration(
                "array_size must be a positive number".to_string(),
            ));
        }
        if self.workers == 0 {
            return Err(Error::InvalidConfiguration(
                "pnum must be a positive number".to_string(),
            ));
        }
        if self.workers > self.array_size {
            return Err(Error::InvalidConfiguration(format!(
                "pnum ({}) must not exceed array_size ({})",
                self.workers, self.array_size
            )));
        }
        // The last chunk absorbs the remainder, so it is the largest.
        let largest_chunk = self.array_size / self.workers + self.array_size % self.workers;
        if largest_chunk > MAX_CHUNK_LEN {
            return Err(Error::InvalidConfiguration(format!(
                "chunks of {} elements exceed the per-worker limit of {}; raise pnum",
                largest_chunk, MAX_CHUNK_LEN
            )));
        }
        if self.timeout.is_some_and(|t| t.is_zero()) {
            return Err(Error::InvalidConfiguration(
                "timeout must be a positive number of milliseconds".to_string(),
            ));
        }
        if self.poll_interval.is_zero() {
            return Err(Error::InvalidConfiguration(
                "poll interval must be non-zero".to_string(),
            ));
        }
        Ok(())
    }
}

/// Configuration for the parallel sum utility.
#[derive(Debug, Clone, Copy)]
pub struct SumConfig {
    pub seed: u32,
    pub array_size: usize,
    pub threads: usize,
}

impl SumConfig {
    pub fn new(seed: u32, array_size: usize, threads: usize) -> Self {
        Self {
            seed,
            array_size,
            threads,
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.threads == 0 || self.array_size == 0 {
            return Err(Error::InvalidConfiguration(
                "all parameters must be positive integers".to_string(),
            ));
        }
        Ok(())
    }
}
