#![cfg(unix)]

mod common;

use raid_benchmark_rs::benchmark_utils::read_results;
use raid_benchmark_rs::engine::ProcessEngine;
use raid_benchmark_rs::sweep::run_sweep;
use std::fs;

#[test]
fn sweep_drives_engine_process() {
    let dir = tempfile::tempdir().unwrap();
    let executable = common::write_engine(dir.path(), "");
    let harness = common::harness(dir.path(), executable);

    assert_eq!(run_sweep(&harness, ProcessEngine).unwrap(), 4);

    let conf = harness.config_path.display().to_string();
    let calls = fs::read_to_string(common::calls_log(dir.path())).unwrap();
    let calls: Vec<_> = calls.lines().collect();
    assert_eq!(calls.len(), 8);
    assert_eq!(calls[0], format!("{} i", conf));
    assert_eq!(calls[1], format!("{} b l a 0.5 32 1 0", conf));
    assert_eq!(calls[3], format!("{} b r a 0.5 32 1 0", conf));
    assert_eq!(calls[6], format!("{} i", conf));

    let rows = read_results(&harness.output_path()).unwrap();
    assert_eq!(rows.len(), 4);
    let grid: Vec<_> = rows.iter().map(|r| (r.dimension, r.mode.as_str())).collect();
    assert_eq!(grid, [(2, "l"), (2, "r"), (4, "l"), (4, "r")]);
    for row in &rows {
        assert_eq!(row.failures, 1);
        assert_eq!(row.read_user, "1.5e+09");
        assert_eq!(row.read_wall, "9e+08");
        assert_eq!(row.write_user, "0.5");
        assert_eq!(row.write_wall, "3");
    }

    // The last trial's config file names 7 disks, one of them offline.
    let config = fs::read_to_string(&harness.config_path).unwrap();
    assert_eq!(config.matches("online = true").count(), 6);
    assert_eq!(config.matches("online = false").count(), 1);

    // Disk images created by the engine are cleaned up after the sweep.
    assert_eq!(fs::read_dir(&harness.disks_dir).unwrap().count(), 0);
}
