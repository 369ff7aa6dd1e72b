// ABOUTME: Error types for building and executing pipelines.
// ABOUTME: Wraps runtime capability errors with the step that triggered them.

use super::secret::SecretError;
use crate::runtime::{ContainerError, ImageError, LogError};
use std::time::Duration;

/// Errors raised while configuring or running a pipeline.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// An operation was given an argument it can't use.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Base image could not be found or pulled.
    #[error("image {image} is unavailable: {source}")]
    ImageUnavailable { image: String, source: ImageError },

    /// A halting step exited non-zero.
    #[error("step {step} ({command}) failed with exit code {exit_code}")]
    StepFailed {
        step: usize,
        command: String,
        exit_code: i64,
    },

    /// A step ran longer than the configured timeout.
    #[error("step {step} ({command}) timed out after {timeout:?}")]
    StepTimedOut {
        step: usize,
        command: String,
        timeout: Duration,
    },

    #[error("container operation failed: {0}")]
    Container(#[from] ContainerError),

    #[error("could not read step output: {0}")]
    Logs(#[from] LogError),

    /// Committing or tagging a layer failed.
    #[error("could not commit step {step}: {source}")]
    Commit { step: usize, source: ImageError },

    #[error(transparent)]
    Secret(#[from] SecretError),

    /// The service container could not be started.
    #[error("service failed to start: {0}")]
    Service(String),
}

/// Coarse classification of [`PipelineError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineErrorKind {
    InvalidArgument,
    ImageUnavailable,
    StepFailed,
    StepTimedOut,
    Container,
    Commit,
    Secret,
    Service,
}

impl PipelineError {
    pub fn kind(&self) -> PipelineErrorKind {
        match self {
            PipelineError::InvalidArgument(_) => PipelineErrorKind::InvalidArgument,
            PipelineError::ImageUnavailable { .. } => PipelineErrorKind::ImageUnavailable,
            PipelineError::StepFailed { .. } => PipelineErrorKind::StepFailed,
            PipelineError::StepTimedOut { .. } => PipelineErrorKind::StepTimedOut,
            PipelineError::Container(_) | PipelineError::Logs(_) => PipelineErrorKind::Container,
            PipelineError::Commit { .. } => PipelineErrorKind::Commit,
            PipelineError::Secret(_) => PipelineErrorKind::Secret,
            PipelineError::Service(_) => PipelineErrorKind::Service,
        }
    }

    /// Exit code of the failed step, when a step ran to completion.
    pub fn exit_code(&self) -> Option<i64> {
        match self {
            PipelineError::StepFailed { exit_code, .. } => Some(*exit_code),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn step_failure_reports_command_and_code() {
        let err = PipelineError::StepFailed {
            step: 2,
            command: "kaggle competitions download -c titanic".to_string(),
            exit_code: 1,
        };
        assert_eq!(err.kind(), PipelineErrorKind::StepFailed);
        assert_eq!(err.exit_code(), Some(1));
        assert_eq!(
            err.to_string(),
            "step 2 (kaggle competitions download -c titanic) failed with exit code 1"
        );
    }

    #[test]
    fn timeout_message_names_duration() {
        let err = PipelineError::StepTimedOut {
            step: 1,
            command: "sleep 99".to_string(),
            timeout: Duration::from_secs(90),
        };
        assert!(err.to_string().ends_with("timed out after 90s"));
        assert_eq!(err.exit_code(), None);
    }
}
