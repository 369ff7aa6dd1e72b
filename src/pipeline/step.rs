// ABOUTME: Individual container mutations recorded by a pipeline.
// ABOUTME: Steps are applied in order; run-command steps carry a failure policy.

use super::handles::{HostDir, HostFile};
use super::secret::Secret;
use nonempty::NonEmpty;
use std::fmt;

/// What happens when a run-command step exits non-zero.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum FailurePolicy {
    /// Stop the pipeline.
    #[default]
    Halt,
    /// Keep going, reporting `fallback` in place of the failure.
    Tolerate { fallback: String },
}

/// A command run inside the container, producing a new layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecStep {
    pub args: NonEmpty<String>,
    pub on_failure: FailurePolicy,
}

impl ExecStep {
    pub fn new(args: NonEmpty<String>) -> Self {
        Self {
            args,
            on_failure: FailurePolicy::Halt,
        }
    }

    /// Arguments joined for display.
    pub fn command_line(&self) -> String {
        self.args
            .iter()
            .map(|a| {
                if a.is_empty() || a.contains(char::is_whitespace) {
                    format!("{:?}", a)
                } else {
                    a.clone()
                }
            })
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// One recorded mutation of the container description.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    MountDirectory { source: HostDir, target: String },
    /// Files are always mounted read-only.
    MountFile { source: HostFile, target: String },
    Workdir(String),
    Env { key: String, value: String },
    SecretEnv { key: String, secret: Secret },
    User(String),
    Exec(ExecStep),
    ExposePort(u16),
    Entrypoint(Vec<String>),
}

impl Step {
    pub fn as_exec(&self) -> Option<&ExecStep> {
        match self {
            Step::Exec(exec) => Some(exec),
            _ => None,
        }
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Step::MountDirectory { source, target } => write!(f, "mount dir  {} -> {}", source, target),
            Step::MountFile { source, target } => write!(f, "mount file {} -> {} (ro)", source, target),
            Step::Workdir(dir) => write!(f, "workdir    {}", dir),
            Step::Env { key, value } => write!(f, "env        {}={}", key, value),
            Step::SecretEnv { key, secret } => write!(f, "env        {}=<{}>", key, secret),
            Step::User(user) => write!(f, "user       {}", user),
            Step::Exec(exec) => {
                write!(f, "run        {}", exec.command_line())?;
                if let FailurePolicy::Tolerate { fallback } = &exec.on_failure {
                    write!(f, " [failure tolerated: {:?}]", fallback)?;
                }
                Ok(())
            }
            Step::ExposePort(port) => write!(f, "expose     {}/tcp", port),
            Step::Entrypoint(args) => write!(f, "entrypoint {:?}", args),
        }
    }
}
