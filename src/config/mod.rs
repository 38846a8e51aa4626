use rand::seq::index;
use rand::Rng;
use serde::Deserialize;
use std::ffi::OsString;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::str::FromStr;

use crate::disks::DiskSet;
use crate::error::Result as HarnessResult;
use crate::primes::is_prime;

/// Disks every array carries on top of its data disks.
pub const REDUNDANCY_DISKS: usize = 3;

#[derive(Debug, Clone, thiserror::Error, PartialEq)]
pub enum ConfigError {
    #[error("dimension + 1 should be prime, got dimension {0}")]
    InvalidDimension(usize),
    #[error("mode should be either l or r, got {0:?}")]
    InvalidMode(String),
    #[error("cannot fail {failures} of {code_length} disks")]
    TooManyFailures { failures: usize, code_length: usize },
    #[error("block size must be positive")]
    InvalidBlockSize,
    #[error("rw ratio should lie in [0, 1], got {0}")]
    InvalidRwRatio(f64),
    #[error("disk capacity of {n_blocks} blocks of {block_size} bytes does not fit in 64 bits")]
    CapacityOverflow { block_size: u64, n_blocks: u64 },
}

/// Access pattern of the benchmark.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Mode {
    Local,
    Remote,
}

impl Mode {
    /// Token passed to the engine and written to the results file.
    pub fn token(&self) -> &'static str {
        match self {
            Mode::Local => "l",
            Mode::Remote => "r",
        }
    }
}

impl FromStr for Mode {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "l" => Ok(Mode::Local),
            "r" => Ok(Mode::Remote),
            _ => Err(ConfigError::InvalidMode(s.to_string())),
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.token())
    }
}

/// The two engine invocations of a trial, in the order they must run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Initialize,
    Benchmark,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Phase::Initialize => f.write_str("initialize"),
            Phase::Benchmark => f.write_str("benchmark"),
        }
    }
}

/// Engine-wide knobs that stay fixed across a sweep.
#[derive(Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct EngineSettings {
    pub raid_type: String,
    pub max_concurrent_threads: u32,
    /// Blocks per disk; disk capacity is this times the block size.
    pub n_blocks: u64,
    pub benchmark_seconds: u64,
}

impl Default for EngineSettings {
    fn default() -> Self {
        EngineSettings {
            raid_type: "RTP".to_string(),
            max_concurrent_threads: 1,
            n_blocks: 10_000,
            benchmark_seconds: 10,
        }
    }
}

/// A program and its arguments, ready to be spawned.
#[derive(Debug, Clone, PartialEq)]
pub struct Invocation {
    pub program: PathBuf,
    pub args: Vec<OsString>,
}

impl Invocation {
    pub fn command(&self) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args);
        cmd
    }
}

impl fmt::Display for Invocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program.display())?;
        for arg in &self.args {
            write!(f, " {}", arg.to_string_lossy())?;
        }
        Ok(())
    }
}

/// Parameters of one planned trial.
///
/// Always valid once built: `dimension + 1` is prime, the failures fit in
/// the array and the rw ratio is a fraction.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    dimension: usize,
    block_size: u64,
    failures: usize,
    mode: Mode,
    rw_ratio: f64,
}

impl Config {
    pub fn new(
        dimension: usize,
        block_size: u64,
        failures: usize,
        mode: &str,
        rw_ratio: f64,
    ) -> Result<Self, ConfigError> {
        let modulus = (dimension as u64).checked_add(1);
        if !modulus.map(is_prime).unwrap_or(false) {
            return Err(ConfigError::InvalidDimension(dimension));
        }
        let mode = mode.parse::<Mode>()?;
        if block_size == 0 {
            return Err(ConfigError::InvalidBlockSize);
        }
        if !(0.0..=1.0).contains(&rw_ratio) {
            return Err(ConfigError::InvalidRwRatio(rw_ratio));
        }
        let code_length = dimension
            .checked_add(REDUNDANCY_DISKS)
            .ok_or(ConfigError::InvalidDimension(dimension))?;
        if failures > code_length {
            return Err(ConfigError::TooManyFailures { failures, code_length });
        }

        Ok(Config {
            dimension,
            block_size,
            failures,
            mode,
            rw_ratio,
        })
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    pub fn block_size(&self) -> u64 {
        self.block_size
    }

    pub fn failures(&self) -> usize {
        self.failures
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn rw_ratio(&self) -> f64 {
        self.rw_ratio
    }

    /// Total number of disks in the array.
    pub fn code_length(&self) -> usize {
        self.dimension + REDUNDANCY_DISKS
    }

    /// Draws `failures` distinct disk indices to mark offline.
    pub fn sample_offline<R: Rng + ?Sized>(&self, rng: &mut R) -> Vec<usize> {
        let mut offline = index::sample(rng, self.code_length(), self.failures).into_vec();
        offline.sort_unstable();
        offline
    }

    /// Size in bytes of each backing disk.
    pub fn disk_capacity(&self, engine: &EngineSettings) -> Result<u64, ConfigError> {
        self.block_size
            .checked_mul(engine.n_blocks)
            .ok_or(ConfigError::CapacityOverflow {
                block_size: self.block_size,
                n_blocks: engine.n_blocks,
            })
    }

    /// Renders the engine configuration file with the given disks offline.
    pub fn render(
        &self,
        engine: &EngineSettings,
        disks: &DiskSet,
        offline: &[usize],
    ) -> Result<String, ConfigError> {
        let raid = &engine.raid_type;
        let mut out = format!(
            "DiskCapacity = {}\nMaxConcurrentThreads = {}\nRAIDType = {}\n\n{} {{\n    Dimension = {}\n    StripeUnitSize = {}\n}}\n",
            self.disk_capacity(engine)?,
            engine.max_concurrent_threads,
            raid,
            raid,
            self.dimension,
            self.block_size,
        );
        for i in 0..self.code_length() {
            out.push_str(&format!(
                "\ndisk {{\n    file = \"{}\"\n    online = {}\n}}\n",
                disks.disk_path(i).display(),
                !offline.contains(&i),
            ));
        }

        Ok(out)
    }

    /// Writes the configuration file to `path` with a freshly sampled set of
    /// offline disks, which is returned.
    ///
    /// Every call draws a new sample from `rng`.
    pub fn write<R: Rng + ?Sized>(
        &self,
        path: &Path,
        engine: &EngineSettings,
        disks: &DiskSet,
        rng: &mut R,
    ) -> HarnessResult<Vec<usize>> {
        let offline = self.sample_offline(rng);
        let contents = self.render(engine, disks, &offline)?;
        fs::write(path, contents)?;
        Ok(offline)
    }

    /// Builds the engine command line for `phase`.
    pub fn invocation(
        &self,
        executable: &Path,
        config_path: &Path,
        phase: Phase,
        engine: &EngineSettings,
    ) -> Invocation {
        let mut args: Vec<OsString> = vec![config_path.into()];
        match phase {
            Phase::Initialize => args.push("i".into()),
            Phase::Benchmark => {
                args.push("b".into());
                args.push(self.mode.token().into());
                args.push("a".into());
                args.push(format_ratio(self.rw_ratio).into());
                args.push(self.block_size.to_string().into());
                args.push(engine.max_concurrent_threads.to_string().into());
                args.push(engine.benchmark_seconds.to_string().into());
            }
        }

        Invocation {
            program: executable.to_path_buf(),
            args,
        }
    }
}

/// Shortest round-trip rendering of a ratio, always with a decimal point.
pub fn format_ratio(ratio: f64) -> String {
    format!("{:?}", ratio)
}
