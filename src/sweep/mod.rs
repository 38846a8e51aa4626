use log::info;
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

use crate::benchmark_utils::{append_result, write_header, ResultRow};
use crate::config::{format_ratio, Config, ConfigError, EngineSettings};
use crate::disks::DiskSet;
use crate::engine::{Engine, TrialRunner};
use crate::error::{Error, Result};

/// The parameter axes swept, in nesting order from outermost to innermost.
#[derive(Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct SweepGrid {
    pub dimensions: Vec<usize>,
    pub block_sizes: Vec<u64>,
    pub failures: Vec<usize>,
    pub modes: Vec<String>,
    pub rw_ratios: Vec<f64>,
}

impl Default for SweepGrid {
    fn default() -> Self {
        SweepGrid {
            dimensions: vec![4, 6, 12, 22, 100],
            block_sizes: vec![32, 512, 1024, 2048, 4096],
            failures: vec![0, 1, 2, 3],
            modes: vec!["l".to_string(), "r".to_string()],
            rw_ratios: vec![0.1, 0.5, 0.9],
        }
    }
}

impl SweepGrid {
    pub fn len(&self) -> usize {
        self.dimensions.len()
            * self.block_sizes.len()
            * self.failures.len()
            * self.modes.len()
            * self.rw_ratios.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Builds the configuration of every grid point, in sweep order.
    pub fn configs(&self) -> Result<Vec<Config>, ConfigError> {
        let mut configs = Vec::with_capacity(self.len());
        for &dimension in &self.dimensions {
            for &block_size in &self.block_sizes {
                for &failures in &self.failures {
                    for mode in &self.modes {
                        for &rw_ratio in &self.rw_ratios {
                            configs.push(Config::new(dimension, block_size, failures, mode, rw_ratio)?);
                        }
                    }
                }
            }
        }
        Ok(configs)
    }
}

/// Everything a sweep needs besides the engine itself.
#[derive(Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct HarnessConfig {
    pub executable: PathBuf,
    /// Defaults to `<raid_type>.csv`.
    pub output_file: Option<PathBuf>,
    pub config_path: PathBuf,
    pub disks_dir: PathBuf,
    pub disk_suffix: String,
    pub seed: u64,
    pub engine: EngineSettings,
    pub grid: SweepGrid,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        HarnessConfig {
            executable: Path::new(".").join("cmake-build-release-llvm").join("testbed"),
            output_file: None,
            config_path: PathBuf::from("/tmp/raid.conf"),
            disks_dir: PathBuf::from("/tmp/disks"),
            disk_suffix: "bin".to_string(),
            seed: 4,
            engine: EngineSettings::default(),
            grid: SweepGrid::default(),
        }
    }
}

impl HarnessConfig {
    /// Loads a harness configuration from a JSON file. Missing fields keep
    /// their defaults.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }

    pub fn output_path(&self) -> PathBuf {
        self.output_file
            .clone()
            .unwrap_or_else(|| PathBuf::from(format!("{}.csv", self.engine.raid_type)))
    }

    pub fn disk_set(&self) -> DiskSet {
        DiskSet::new(&self.disks_dir, &self.disk_suffix)
    }
}

/// Runs every trial of the grid in order, appending one CSV row per trial.
///
/// The whole grid is validated before anything touches the disk. The first
/// failing trial aborts the sweep; rows of earlier trials stay in the file.
/// Returns the number of trials run.
pub fn run_sweep<E: Engine>(harness: &HarnessConfig, engine: E) -> Result<usize> {
    let configs = harness.grid.configs()?;
    for config in &configs {
        config.disk_capacity(&harness.engine)?;
    }

    if !harness.executable.is_file() {
        return Err(Error::MissingExecutable(harness.executable.clone()));
    }

    let disks = harness.disk_set();
    disks.create()?;
    if let Some(parent) = harness.config_path.parent() {
        fs::create_dir_all(parent)?;
    }

    let output = harness.output_path();
    write_header(&output)?;

    let mut rng = StdRng::seed_from_u64(harness.seed);
    let mut runner = TrialRunner::new(
        engine,
        &harness.executable,
        &harness.config_path,
        disks.clone(),
        harness.engine.clone(),
    );

    let total = configs.len();
    for (i, config) in configs.iter().enumerate() {
        info!(
            "Trial {}/{}: dimension={} block_size={} failures={} mode={} rw_ratio={}",
            i + 1,
            total,
            config.dimension(),
            config.block_size(),
            config.failures(),
            config.mode(),
            format_ratio(config.rw_ratio()),
        );
        let result = runner.run(config, &mut rng)?;
        append_result(&ResultRow::new(config, &result), &output)?;
    }

    disks.reset()?;
    info!("Sweep finished: {} trials written to {}", total, output.display());
    Ok(total)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::benchmark_utils::read_results;
    use crate::config::{Invocation, Phase};

    #[test]
    fn default_grid_matches_sweep_size() {
        let grid = SweepGrid::default();
        let configs = grid.configs().unwrap();
        assert_eq!(configs.len(), 5 * 5 * 4 * 2 * 3);
        assert_eq!(grid.len(), configs.len());

        let first = &configs[0];
        assert_eq!((first.dimension(), first.block_size(), first.failures()), (4, 32, 0));
        assert_eq!(first.mode().token(), "l");
        assert_eq!(first.rw_ratio(), 0.1);

        // Innermost axis varies fastest.
        assert_eq!(configs[1].rw_ratio(), 0.5);
        assert_eq!(configs[3].mode().token(), "r");

        let last = configs.last().unwrap();
        assert_eq!((last.dimension(), last.block_size(), last.failures()), (100, 4096, 3));
    }

    #[test]
    fn invalid_grid_point_rejects_whole_grid() {
        let grid = SweepGrid {
            dimensions: vec![4, 3],
            ..SweepGrid::default()
        };
        assert_eq!(grid.configs().unwrap_err(), ConfigError::InvalidDimension(3));

        let grid = SweepGrid {
            modes: vec!["l".to_string(), "x".to_string()],
            ..SweepGrid::default()
        };
        assert_eq!(grid.configs().unwrap_err(), ConfigError::InvalidMode("x".to_string()));
    }

    #[test]
    fn harness_config_from_partial_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("harness.json");
        fs::write(
            &path,
            r#"{
                "seed": 7,
                "engine": { "benchmark_seconds": 1 },
                "grid": { "dimensions": [2], "rw_ratios": [1.0] }
            }"#,
        )
        .unwrap();

        let harness = HarnessConfig::load(&path).unwrap();
        assert_eq!(harness.seed, 7);
        assert_eq!(harness.engine.benchmark_seconds, 1);
        assert_eq!(harness.engine.raid_type, "RTP");
        assert_eq!(harness.grid.dimensions, [2]);
        assert_eq!(harness.grid.block_sizes, SweepGrid::default().block_sizes);
        assert_eq!(harness.output_path(), PathBuf::from("RTP.csv"));
        assert_eq!(harness.disk_set().disk_path(1), PathBuf::from("/tmp/disks/1.bin"));
    }

    #[test]
    fn malformed_json_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("harness.json");
        fs::write(&path, r#"{ "seed": "four" }"#).unwrap();
        assert!(matches!(HarnessConfig::load(&path), Err(Error::Json(_))));
    }

    /// Answers every benchmark with fixed throughput and can fail on a
    /// chosen initialize call.
    struct ScriptedEngine {
        calls: Vec<Phase>,
        fail_init_at: Option<usize>,
        inits: usize,
    }

    impl Engine for ScriptedEngine {
        fn execute(&mut self, phase: Phase, _invocation: &Invocation) -> Result<()> {
            self.calls.push(phase);
            self.inits += 1;
            if self.fail_init_at == Some(self.inits) {
                return Err(Error::EngineFailed { phase, code: Some(2) });
            }
            Ok(())
        }

        fn execute_captured(&mut self, phase: Phase, _invocation: &Invocation) -> Result<String> {
            self.calls.push(phase);
            Ok(format!(
                "READ throughput (bytes/s): {0}\t{0}\t{0}\nWRITE throughput (bytes/s): 1\t1\t1\n",
                self.inits
            ))
        }
    }

    fn small_harness(dir: &Path) -> HarnessConfig {
        let executable = dir.join("testbed");
        fs::write(&executable, b"").unwrap();
        HarnessConfig {
            executable,
            output_file: Some(dir.join("out.csv")),
            config_path: dir.join("raid.conf"),
            disks_dir: dir.join("disks"),
            grid: SweepGrid {
                dimensions: vec![2, 4],
                block_sizes: vec![32],
                failures: vec![0, 1],
                modes: vec!["l".to_string()],
                rw_ratios: vec![0.5],
            },
            ..HarnessConfig::default()
        }
    }

    #[test]
    fn sweep_appends_one_row_per_trial() {
        let dir = tempfile::tempdir().unwrap();
        let harness = small_harness(dir.path());
        let mut engine = ScriptedEngine { calls: Vec::new(), fail_init_at: None, inits: 0 };

        assert_eq!(run_sweep(&harness, &mut engine).unwrap(), 4);
        assert_eq!(engine.calls.len(), 8);

        let rows = read_results(&harness.output_path()).unwrap();
        let summary: Vec<_> = rows
            .iter()
            .map(|r| (r.dimension, r.failures, r.read_wall.as_str()))
            .collect();
        assert_eq!(summary, [(2, 0, "1"), (2, 1, "2"), (4, 0, "3"), (4, 1, "4")]);
    }

    #[test]
    fn failing_trial_stops_the_sweep() {
        let dir = tempfile::tempdir().unwrap();
        let harness = small_harness(dir.path());
        let mut engine = ScriptedEngine { calls: Vec::new(), fail_init_at: Some(3), inits: 0 };

        let err = run_sweep(&harness, &mut engine).unwrap_err();
        assert!(matches!(err, Error::EngineFailed { phase: Phase::Initialize, code: Some(2) }));

        // Two complete trials, then the failed initialize without a benchmark.
        assert_eq!(
            engine.calls,
            [Phase::Initialize, Phase::Benchmark, Phase::Initialize, Phase::Benchmark, Phase::Initialize]
        );
        assert_eq!(read_results(&harness.output_path()).unwrap().len(), 2);
    }

    #[test]
    fn capacity_overflow_is_reported_before_any_io() {
        let dir = tempfile::tempdir().unwrap();
        let mut harness = small_harness(dir.path());
        harness.grid.block_sizes = vec![32, u64::MAX / 2];
        let mut engine = ScriptedEngine { calls: Vec::new(), fail_init_at: None, inits: 0 };

        let err = run_sweep(&harness, &mut engine).unwrap_err();
        assert!(matches!(err, Error::Config(ConfigError::CapacityOverflow { .. })));
        assert!(engine.calls.is_empty());
        assert!(!harness.output_path().exists());
        assert!(!harness.config_path.exists());
    }

    #[test]
    fn missing_executable_is_reported_before_any_io() {
        let dir = tempfile::tempdir().unwrap();
        let harness = HarnessConfig {
            executable: dir.path().join("nope"),
            ..small_harness(dir.path())
        };
        let mut engine = ScriptedEngine { calls: Vec::new(), fail_init_at: None, inits: 0 };

        assert!(matches!(run_sweep(&harness, &mut engine), Err(Error::MissingExecutable(_))));
        assert!(engine.calls.is_empty());
        assert!(!harness.output_path().exists());
        assert!(!harness.disks_dir.exists());
    }
}
