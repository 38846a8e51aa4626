use raid_benchmark_rs::sweep::{HarnessConfig, SweepGrid};
use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};

/// Stand-in for the engine: logs its arguments, creates the configured disk
/// images on initialize and reports throughput on benchmark. The benchmark's
/// write user time echoes the rw ratio it was given.
const ENGINE_SCRIPT: &str = r#"#!/bin/sh
echo "$*" >> "@LOG@"
case "$2" in
  i)
    @INIT@
    grep 'file = ' "$1" | sed 's/.*"\(.*\)".*/\1/' | while read -r f; do : > "$f"; done
    ;;
  b)
    printf 'Benchmark finished\n'
    printf 'READ throughput (bytes/s): 1.5e+09\t1.4e+09\t9e+08\n'
    printf 'WRITE throughput (bytes/s): %s\t2\t3\n' "$5"
    ;;
esac
"#;

pub fn calls_log(dir: &Path) -> PathBuf {
    dir.join("calls.log")
}

/// Writes an executable engine script whose initialize phase first runs
/// `init` (pass an empty string for a well-behaved engine).
pub fn write_engine(dir: &Path, init: &str) -> PathBuf {
    let path = dir.join("testbed");
    let script = ENGINE_SCRIPT
        .replace("@LOG@", &calls_log(dir).to_string_lossy())
        .replace("@INIT@", init);
    fs::write(&path, script).unwrap();
    fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
    path
}

pub fn harness(dir: &Path, executable: PathBuf) -> HarnessConfig {
    let mut harness = HarnessConfig {
        executable,
        output_file: Some(dir.join("RTP.csv")),
        config_path: dir.join("raid.conf"),
        disks_dir: dir.join("disks"),
        grid: SweepGrid {
            dimensions: vec![2, 4],
            block_sizes: vec![32],
            failures: vec![1],
            modes: vec!["l".to_string(), "r".to_string()],
            rw_ratios: vec![0.5],
        },
        ..HarnessConfig::default()
    };
    harness.engine.benchmark_seconds = 0;
    harness
}
