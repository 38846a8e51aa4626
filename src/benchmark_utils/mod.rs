use prettytable::{row, Table};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs::{File, OpenOptions};
use std::path::Path;

use crate::config::{format_ratio, Config};
use crate::error::Result;
use crate::throughput::BenchResult;

pub const RESULT_HEADER: [&str; 11] = [
    "dimension",
    "block_size",
    "failures",
    "mode",
    "rw_ratio",
    "read_user",
    "read_proc",
    "read_wall",
    "write_user",
    "write_proc",
    "write_wall",
];

/// One row of the results file.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ResultRow {
    pub dimension: usize,
    pub block_size: u64,
    pub failures: usize,
    pub mode: String,
    pub rw_ratio: f64,
    pub read_user: String,
    pub read_proc: String,
    pub read_wall: String,
    pub write_user: String,
    pub write_proc: String,
    pub write_wall: String,
}

impl ResultRow {
    pub fn new(config: &Config, result: &BenchResult) -> Self {
        ResultRow {
            dimension: config.dimension(),
            block_size: config.block_size(),
            failures: config.failures(),
            mode: config.mode().token().to_string(),
            rw_ratio: config.rw_ratio(),
            read_user: result.read.user.clone(),
            read_proc: result.read.proc.clone(),
            read_wall: result.read.wall.clone(),
            write_user: result.write.user.clone(),
            write_proc: result.write.proc.clone(),
            write_wall: result.write.wall.clone(),
        }
    }
}

/// Truncates the results file and writes the header line.
pub fn write_header(file_path: &Path) -> Result<()> {
    // Creating the file discards results of any previous sweep
    let mut wtr = csv::Writer::from_writer(File::create(file_path)?);
    wtr.write_record(RESULT_HEADER)?;
    wtr.flush()?;
    Ok(())
}

/// Appends a single row; the file is closed again before returning.
pub fn append_result(row: &ResultRow, file_path: &Path) -> Result<()> {
    // Open in append mode so earlier rows survive a crash mid-sweep
    let file = OpenOptions::new().append(true).create(true).open(file_path)?;
    let mut wtr = csv::WriterBuilder::new().has_headers(false).from_writer(file);
    wtr.serialize(row)?;
    wtr.flush()?;
    Ok(())
}

pub fn read_results(file_path: &Path) -> Result<Vec<ResultRow>> {
    let mut rdr = csv::Reader::from_path(file_path)?;
    let mut results = Vec::new();
    for row in rdr.deserialize() {
        results.push(row?);
    }
    Ok(results)
}

/// Mean of the values that parse as numbers, if any do.
fn mean(values: impl Iterator<Item = Option<f64>>) -> Option<f64> {
    let parsed: Vec<f64> = values.flatten().collect();
    if parsed.is_empty() {
        None
    } else {
        Some(parsed.iter().sum::<f64>() / parsed.len() as f64)
    }
}

fn format_mean(value: Option<f64>) -> String {
    value.map(|v| format!("{:.0}", v)).unwrap_or_else(|| "-".to_string())
}

pub fn print_benchmark_results(results: &[ResultRow]) {
    // Group results by dimension
    let mut grouped_results: BTreeMap<usize, Vec<&ResultRow>> = BTreeMap::new();
    for result in results {
        grouped_results.entry(result.dimension).or_default().push(result);
    }

    // Print one table per dimension, smallest array first
    for (dimension, group) in grouped_results {
        // Create a new table for each dimension
        let mut table = Table::new();
        table.add_row(row![
            "Block Size",
            "Failures",
            "Mode",
            "RW Ratio",
            "Read Wall (B/s)",
            "Write Wall (B/s)"
        ]);

        // Add rows for each trial, in sweep order
        for result in &group {
            table.add_row(row![
                result.block_size,
                result.failures,
                &result.mode,
                format_ratio(result.rw_ratio),
                &result.read_wall,
                &result.write_wall,
            ]);
        }

        // Average the wall-clock throughputs the engine reported as numbers
        let avg_read_wall = mean(group.iter().map(|r| r.read_wall.parse::<f64>().ok()));
        let avg_write_wall = mean(group.iter().map(|r| r.write_wall.parse::<f64>().ok()));
        // Add overall averages row
        table.add_row(row![
            "AVERAGE",
            "",
            "",
            "",
            format_mean(avg_read_wall),
            format_mean(avg_write_wall),
        ]);

        // Print the table for this dimension
        let disks = dimension.saturating_add(crate::config::REDUNDANCY_DISKS);
        println!("\nResults for Dimension: {} ({} disks)", dimension, disks);
        table.printstd();
    }
}
