use std::path::PathBuf;

use crate::config::{ConfigError, Phase};

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),
    #[error("error parsing harness configuration: {0}")]
    Json(#[from] serde_json::Error),
    /// The engine ran but did not exit successfully. `code` is `None` when
    /// it was killed by a signal.
    #[error("engine {phase} phase failed ({})", describe_exit(.code))]
    EngineFailed { phase: Phase, code: Option<i32> },
    /// The benchmark output lacked a throughput line for `read` or `write`.
    #[error("missing {0} throughput in engine output")]
    MissingThroughput(&'static str),
    #[error("engine executable {} is not a file", .0.display())]
    MissingExecutable(PathBuf),
}

fn describe_exit(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!("exit code {}", code),
        None => "terminated by signal".to_string(),
    }
}
