use clap::Parser;
use log::error;
use raid_benchmark_rs::benchmark_utils::{print_benchmark_results, read_results};
use std::path::PathBuf;

/// Prints summary tables of a results file written by `gather_data`.
#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
    /// Results file
    #[arg(default_value = "RTP.csv")]
    results: PathBuf,
}

fn main() {
    colog::init();

    // Parse the command-line arguments
    let args = Args::parse();

    // Load the results file and print the summary tables
    match read_results(&args.results) {
        Ok(results) => print_benchmark_results(&results),
        Err(e) => {
            error!("Error reading {}: {}", args.results.display(), e);
            std::process::exit(1);
        }
    }
}
