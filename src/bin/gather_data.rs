use clap::Parser;
use log::{error, info};
use raid_benchmark_rs::benchmark_utils::{print_benchmark_results, read_results};
use raid_benchmark_rs::engine::ProcessEngine;
use raid_benchmark_rs::error::Result;
use raid_benchmark_rs::sweep::{run_sweep, HarnessConfig};
use std::path::PathBuf;

/// Sweeps the RAID engine over a grid of array configurations and records
/// its throughput in a CSV file.
#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
    /// JSON harness configuration; built-in defaults are used otherwise
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Engine executable
    #[arg(short, long)]
    executable: Option<PathBuf>,

    /// Results file
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Seed for choosing offline disks
    #[arg(short, long)]
    seed: Option<u64>,

    /// Benchmark duration of each trial in seconds
    #[arg(short, long)]
    duration: Option<u64>,

    /// Skip the summary tables at the end
    #[arg(long)]
    no_summary: bool,
}

fn load_harness(args: &Args) -> Result<HarnessConfig> {
    // Start from the JSON configuration if one was given
    let mut harness = match &args.config {
        Some(path) => HarnessConfig::load(path)?,
        None => HarnessConfig::default(),
    };

    // Command-line flags take precedence over the file
    if let Some(executable) = &args.executable {
        harness.executable = executable.clone();
    }
    if let Some(output) = &args.output {
        harness.output_file = Some(output.clone());
    }
    if let Some(seed) = args.seed {
        harness.seed = seed;
    }
    if let Some(duration) = args.duration {
        harness.engine.benchmark_seconds = duration;
    }

    Ok(harness)
}

fn run(args: &Args) -> Result<()> {
    let harness = load_harness(args)?;
    info!(
        "Running {} trials of {} with {}",
        harness.grid.len(),
        harness.engine.raid_type,
        harness.executable.display()
    );

    // Run every trial of the grid against the engine executable
    run_sweep(&harness, ProcessEngine)?;

    // Print the benchmark results
    if !args.no_summary {
        let results = read_results(&harness.output_path())?;
        print_benchmark_results(&results);
    }
    Ok(())
}

fn main() {
    colog::init();

    // Parse the command-line arguments
    let args = Args::parse();

    // Abort with a non-zero status on the first failure
    if let Err(e) = run(&args) {
        error!("{}", e);
        std::process::exit(1);
    }
}
