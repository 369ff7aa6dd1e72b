// ABOUTME: Application-wide error types for kagglelab.
// ABOUTME: Uses thiserror for ergonomic error handling.

use crate::pipeline::{HandleError, PipelineError, SecretError};
use crate::runtime::RuntimeError;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("file already exists: {0}")]
    AlreadyExists(PathBuf),

    #[error("configuration file not found in {0}")]
    ConfigNotFound(PathBuf),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("no service section in configuration")]
    NoService,

    #[error(transparent)]
    Runtime(#[from] RuntimeError),

    #[error(transparent)]
    Pipeline(#[from] PipelineError),

    #[error(transparent)]
    Secret(#[from] SecretError),

    #[error(transparent)]
    Handle(#[from] HandleError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

impl Error {
    /// Process exit code for this error. Failed steps propagate their own
    /// exit code when it fits.
    pub fn exit_code(&self) -> i32 {
        match self {
            Error::Pipeline(e) => e
                .exit_code()
                .and_then(|c| i32::try_from(c).ok())
                .filter(|c| (1..=255).contains(c))
                .unwrap_or(1),
            _ => 1,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
