use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use tracing::{error, info};

use ising_lattice::dynamics::AlgorithmKind;
use ising_lattice::job::{Job, DEFAULT_CONFIG_PATH};
use ising_lattice::logging::init_logging;

/// Monte Carlo simulation of the 2D Ising model.
#[derive(Parser, Debug)]
#[command(name = "ising", version, about)]
struct Cli {
    /// JSON job description
    #[arg(default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    /// Override the job's seed
    #[arg(long)]
    seed: Option<u64>,

    /// Override the rayon pool size (0 = one per core)
    #[arg(long)]
    threads: Option<usize>,

    /// Override the update algorithm
    #[arg(long, value_parser = parse_algorithm)]
    algorithm: Option<AlgorithmKind>,

    /// Override where the results table is written
    #[arg(long)]
    output: Option<PathBuf>,

    /// Log level used when RUST_LOG is unset
    #[arg(long, default_value = "info")]
    log_level: String,
}

fn parse_algorithm(name: &str) -> Result<AlgorithmKind, String> {
    serde_json::from_value(serde_json::Value::String(name.to_string()))
        .map_err(|_| format!("unknown algorithm {name:?} (metropolis, swendsen_wang)"))
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(&cli.log_level);

    let mut job = match Job::load(&cli.config) {
        Ok(job) => job,
        Err(err) => {
            error!("Could not load job {}: {}", cli.config.display(), err);
            return ExitCode::FAILURE;
        }
    };
    if cli.seed.is_some() {
        job.seed = cli.seed;
    }
    if let Some(threads) = cli.threads {
        job.threads = threads;
    }
    if let Some(algorithm) = cli.algorithm {
        job.algorithm = algorithm;
    }
    if let Some(output) = cli.output {
        job.physics.path = output;
    }

    match job.run_and_write() {
        Ok(results) => {
            info!("Done: {} temperature point(s)", results.len());
            ExitCode::SUCCESS
        }
        Err(err) => {
            error!("Simulation failed: {}", err);
            ExitCode::FAILURE
        }
    }
}
