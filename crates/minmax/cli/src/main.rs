//! minmax CLI - parallel min/max over worker processes.

mod output;

use std::path::PathBuf;
use std::time::Duration;

use clap::error::ErrorKind;
use clap::{Parser, Subcommand};
use minmax_core::{ChannelKind, RunConfig, SumConfig, Supervisor, WorkerLauncher};

#[derive(Parser)]
#[command(name = "minmax")]
#[command(about = "Find the minimum and maximum of a generated array with worker processes")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Split the array across worker processes and aggregate their results
    Run {
        /// Seed for the array generator
        #[arg(long, value_parser = clap::value_parser!(u32).range(1..))]
        seed: u32,

        /// Number of array elements
        #[arg(long, visible_alias = "array_size", value_parser = positive_usize)]
        array_size: usize,

        /// Number of worker processes
        #[arg(long, value_parser = positive_usize)]
        pnum: usize,

        /// Deliver results through files instead of pipes
        #[arg(short = 'f', long = "by-files", visible_alias = "by_files", alias = "with-files")]
        by_files: bool,

        /// Kill workers still running after this many milliseconds
        #[arg(long, value_parser = clap::value_parser!(u64).range(1..))]
        timeout: Option<u64>,

        /// Parent directory for result files (default: system temp directory)
        #[arg(long)]
        results_dir: Option<PathBuf>,

        /// Print the report as JSON
        #[arg(long)]
        json: bool,

        /// Workers sleep this many milliseconds before reporting (test instrumentation)
        #[arg(long, hide = true)]
        linger_ms: Option<u64>,
    },

    /// Sum the array on a pool of threads
    Sum {
        /// Number of threads
        #[arg(long, visible_alias = "threads_num", value_parser = positive_usize)]
        threads_num: usize,

        /// Seed for the array generator
        #[arg(long)]
        seed: u32,

        /// Number of array elements
        #[arg(long, visible_alias = "array_size", value_parser = positive_usize)]
        array_size: usize,

        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },
}

fn positive_usize(value: &str) -> Result<usize, String> {
    match value.parse::<usize>() {
        Ok(0) => Err("must be a positive number".to_string()),
        Ok(n) => Ok(n),
        Err(e) => Err(e.to_string()),
    }
}

fn main() -> anyhow::Result<()> {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            if matches!(e.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) {
                e.exit();
            }
            // Usage errors exit with 1, like every other failure.
            let _ = e.print();
            std::process::exit(1);
        }
    };

    // Initialize logging
    let filter = if cli.verbose {
        tracing_subscriber::EnvFilter::from_default_env()
            .add_directive(tracing::Level::DEBUG.into())
    } else {
        tracing_subscriber::EnvFilter::from_default_env().add_directive(tracing::Level::WARN.into())
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    // Helper to format minmax-core errors with recovery hints
    let format_error = |err: anyhow::Error| -> anyhow::Error {
        if let Some(core_err) = err.downcast_ref::<minmax_core::Error>() {
            anyhow::anyhow!("{}", core_err.with_hint())
        } else {
            err
        }
    };

    match cli.command {
        Commands::Run {
            seed,
            array_size,
            pnum,
            by_files,
            timeout,
            results_dir,
            json,
            linger_ms,
        } => {
            let mut config = RunConfig::new(seed, array_size, pnum)
                .with_channel(if by_files {
                    ChannelKind::File
                } else {
                    ChannelKind::Pipe
                })
                .with_timeout(timeout.map(Duration::from_millis))
                .with_linger(linger_ms.map(Duration::from_millis));
            if let Some(dir) = results_dir {
                config = config.with_results_dir(dir);
            }
            run(config, json).map_err(format_error)?;
        }

        Commands::Sum {
            threads_num,
            seed,
            array_size,
            json,
        } => {
            let config = SumConfig::new(seed, array_size, threads_num);
            let report = minmax_core::parallel_sum(&config)
                .map_err(anyhow::Error::from)
                .map_err(format_error)?;
            output::print_sum(&report, json)?;
        }
    }

    Ok(())
}

/// Validate, locate the worker binary, run and print.
fn run(config: RunConfig, json: bool) -> anyhow::Result<()> {
    config.validate()?;
    let launcher = WorkerLauncher::locate()?;
    tracing::debug!(worker = %launcher.program().display(), "using worker binary");

    let supervisor = Supervisor::new(config, launcher)?;
    let report = supervisor.run()?;
    output::print_run(&report, json)
}
