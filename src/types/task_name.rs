// ABOUTME: Validated task name used to derive in-container paths.
// ABOUTME: Names become path components such as /home/jovyan/work/{name}.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use thiserror::Error;

const MAX_LEN: usize = 63;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TaskNameError {
    #[error("task name cannot be empty")]
    Empty,

    #[error("task name exceeds maximum length of {MAX_LEN} characters")]
    TooLong,

    #[error("task name cannot start with '{0}'")]
    InvalidStart(char),

    #[error("invalid character in task name: {0:?}")]
    InvalidChar(char),
}

/// Name of a preprocessing task.
///
/// Restricted to ASCII alphanumerics, `-`, `_` and `.` so it can be spliced
/// into container paths without escaping or traversal (`..` is rejected by
/// the leading-dot rule, `/` by the character set).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TaskName(String);

impl TaskName {
    pub fn new(value: &str) -> Result<Self, TaskNameError> {
        let first = value.chars().next().ok_or(TaskNameError::Empty)?;

        if value.len() > MAX_LEN {
            return Err(TaskNameError::TooLong);
        }

        if first == '.' || first == '-' {
            return Err(TaskNameError::InvalidStart(first));
        }

        if let Some(c) = value
            .chars()
            .find(|c| !c.is_ascii_alphanumeric() && !matches!(c, '-' | '_' | '.'))
        {
            return Err(TaskNameError::InvalidChar(c));
        }

        Ok(Self(value.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TaskName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Serialize for TaskName {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for TaskName {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::new(&s).map_err(serde::de::Error::custom)
    }
}
