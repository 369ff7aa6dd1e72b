// ABOUTME: Secret references in configuration files.
// ABOUTME: A secret comes from an environment variable or a file, never inline.

use crate::pipeline::Secret;
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum SecretRef {
    Env { env: String },
    File { file: PathBuf },
}

impl SecretRef {
    /// Turn the reference into a deferred secret, resolving file paths
    /// against `base`.
    pub fn to_secret(&self, base: &Path) -> Secret {
        match self {
            SecretRef::Env { env } => Secret::from_env(env.clone()),
            SecretRef::File { file } => Secret::from_file(super::expand_path(file, base)),
        }
    }
}
