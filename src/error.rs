//! Error types for sweep setup and execution.

use std::path::PathBuf;

use thiserror::Error;

use crate::invoke::RunOutcome;

/// Result type for sweep operations
pub type Result<T> = std::result::Result<T, SweepError>;

#[derive(Error, Debug)]
pub enum SweepError {
    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("failed to parse config file {path}: {source}")]
    ConfigParse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("I/O error on {path}: {source}")]
    Setup {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("run {index}/{total} failed ({outcome}), sweep aborted")]
    Aborted {
        index: usize,
        total: usize,
        outcome: RunOutcome,
    },
}

impl SweepError {
    pub(crate) fn setup(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Setup {
            path: path.into(),
            source,
        }
    }
}
