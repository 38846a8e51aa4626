use log::{debug, info};
use rand::Rng;
use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Stdio};

use crate::config::{Config, EngineSettings, Invocation, Phase};
use crate::disks::DiskSet;
use crate::error::{Error, Result};
use crate::throughput::{parse_bench_result, BenchResult};

/// Runs the storage engine executable.
pub trait Engine {
    /// Runs the invocation to completion with the harness's own stdio.
    fn execute(&mut self, phase: Phase, invocation: &Invocation) -> Result<()>;

    /// Runs the invocation to completion and returns its stdout.
    fn execute_captured(&mut self, phase: Phase, invocation: &Invocation) -> Result<String>;
}

impl<E: Engine + ?Sized> Engine for &mut E {
    fn execute(&mut self, phase: Phase, invocation: &Invocation) -> Result<()> {
        (**self).execute(phase, invocation)
    }

    fn execute_captured(&mut self, phase: Phase, invocation: &Invocation) -> Result<String> {
        (**self).execute_captured(phase, invocation)
    }
}

/// Spawns the engine as a child process and waits for it.
#[derive(Debug, Default, Clone, Copy)]
pub struct ProcessEngine;

fn check_status(phase: Phase, status: ExitStatus) -> Result<()> {
    if status.success() {
        Ok(())
    } else {
        Err(Error::EngineFailed {
            phase,
            code: status.code(),
        })
    }
}

impl Engine for ProcessEngine {
    fn execute(&mut self, phase: Phase, invocation: &Invocation) -> Result<()> {
        debug!("Running {}", invocation);
        let status = invocation.command().status()?;
        check_status(phase, status)
    }

    fn execute_captured(&mut self, phase: Phase, invocation: &Invocation) -> Result<String> {
        debug!("Running {}", invocation);
        let output = invocation.command().stderr(Stdio::inherit()).output()?;
        let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
        info!("{}", stdout.trim_end());
        check_status(phase, output.status)?;
        Ok(stdout)
    }
}

/// Drives one engine trial at a time over a shared config file and disk
/// directory.
pub struct TrialRunner<E: Engine> {
    engine: E,
    executable: PathBuf,
    config_path: PathBuf,
    disks: DiskSet,
    settings: EngineSettings,
}

impl<E: Engine> TrialRunner<E> {
    pub fn new(
        engine: E,
        executable: &Path,
        config_path: &Path,
        disks: DiskSet,
        settings: EngineSettings,
    ) -> Self {
        TrialRunner {
            engine,
            executable: executable.to_path_buf(),
            config_path: config_path.to_path_buf(),
            disks,
            settings,
        }
    }

    /// Runs a full trial: reset disks, write the config file, initialize the
    /// array, benchmark it and parse the reported throughput.
    ///
    /// Any engine failure aborts the trial before later phases run.
    pub fn run<R: Rng + ?Sized>(&mut self, config: &Config, rng: &mut R) -> Result<BenchResult> {
        let removed = self.disks.reset()?;
        debug!("Reset {} disks", removed);

        let offline = config.write(&self.config_path, &self.settings, &self.disks, rng)?;
        debug!("Wrote {} with offline disks {:?}", self.config_path.display(), offline);

        let init = config.invocation(&self.executable, &self.config_path, Phase::Initialize, &self.settings);
        self.engine.execute(Phase::Initialize, &init)?;

        let bench = config.invocation(&self.executable, &self.config_path, Phase::Benchmark, &self.settings);
        let stdout = self.engine.execute_captured(Phase::Benchmark, &bench)?;

        parse_bench_result(&stdout)
    }
}
