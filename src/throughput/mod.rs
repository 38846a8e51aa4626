use indexmap::IndexMap;
use regex::Regex;
use std::sync::OnceLock;

use crate::error::{Error, Result};

/// One engine-reported throughput, kept as the engine's own text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Throughput {
    pub user: String,
    pub proc: String,
    pub wall: String,
}

impl Throughput {
    pub fn new(user: &str, proc: &str, wall: &str) -> Self {
        Throughput {
            user: user.to_string(),
            proc: proc.to_string(),
            wall: wall.to_string(),
        }
    }
}

/// Read and write throughput of a single benchmark invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BenchResult {
    pub read: Throughput,
    pub write: Throughput,
}

fn throughput_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    // The wall field must be followed by non-tab whitespace or end of line,
    // so a line carrying a fourth tab-separated field is rejected outright.
    RE.get_or_init(|| {
        Regex::new(r"(?m)(\S+) throughput \(bytes/s\): (\S+)\t(\S+)\t(\S+)(?:[^\S\t]|$)")
            .expect("throughput pattern is valid")
    })
}

/// Collects every `<NAME> throughput (bytes/s): <user>\t<proc>\t<wall>` entry
/// found in `output`, keyed by the name as printed.
///
/// Entries keep their order of first appearance; a repeated name takes the
/// value of its last occurrence.
pub fn parse_throughput(output: &str) -> IndexMap<String, Throughput> {
    let mut entries = IndexMap::new();
    for caps in throughput_regex().captures_iter(output) {
        entries.insert(
            caps[1].to_string(),
            Throughput::new(&caps[2], &caps[3], &caps[4]),
        );
    }
    entries
}

/// Builds a [`BenchResult`] from the benchmark phase's stdout.
///
/// Names are matched case-insensitively against `read` and `write`; any
/// other entry is an auxiliary diagnostic and is skipped.
pub fn parse_bench_result(output: &str) -> Result<BenchResult> {
    let mut read = None;
    let mut write = None;
    for (name, throughput) in parse_throughput(output) {
        match name.to_lowercase().as_str() {
            "read" => read = Some(throughput),
            "write" => write = Some(throughput),
            _ => {}
        }
    }

    Ok(BenchResult {
        read: read.ok_or(Error::MissingThroughput("read"))?,
        write: write.ok_or(Error::MissingThroughput("write"))?,
    })
}
