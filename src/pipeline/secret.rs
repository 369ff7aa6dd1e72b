// ABOUTME: Opaque credentials resolved to plaintext only at the point of use.
// ABOUTME: Plaintext values are redacted from Debug output and plans.

use std::fmt;
use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum SecretError {
    #[error("secret {name}: environment variable {var} is not set")]
    MissingEnv { name: String, var: String },

    #[error("secret {name}: cannot read {path}: {source}")]
    Unreadable {
        name: String,
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("secret {0} resolved to an empty value")]
    Empty(String),
}

/// A resolved secret value.
#[derive(Clone, PartialEq, Eq)]
pub struct Plaintext(String);

impl Plaintext {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }

    /// Replace every occurrence of this value in `text` with `***`.
    pub fn redact(&self, text: &str) -> String {
        if self.0.is_empty() {
            text.to_string()
        } else {
            text.replace(&self.0, "***")
        }
    }
}

impl fmt::Debug for Plaintext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Plaintext(***)")
    }
}

/// Where a secret's value comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SecretSource {
    Env(String),
    File(PathBuf),
    /// Already resolved in-process.
    Value(Plaintext),
}

/// A credential reference. Resolution is deferred until [`Secret::plaintext`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Secret {
    source: SecretSource,
}

impl Secret {
    pub fn from_env(var: impl Into<String>) -> Self {
        Self {
            source: SecretSource::Env(var.into()),
        }
    }

    pub fn from_file(path: impl Into<PathBuf>) -> Self {
        Self {
            source: SecretSource::File(path.into()),
        }
    }

    pub fn from_plaintext(value: Plaintext) -> Self {
        Self {
            source: SecretSource::Value(value),
        }
    }

    pub fn source(&self) -> &SecretSource {
        &self.source
    }

    /// Resolve the secret.
    pub async fn plaintext(&self) -> Result<Plaintext, SecretError> {
        let value = match &self.source {
            SecretSource::Env(var) => std::env::var(var).map_err(|_| SecretError::MissingEnv {
                name: self.to_string(),
                var: var.clone(),
            })?,
            SecretSource::File(path) => tokio::fs::read_to_string(path)
                .await
                .map_err(|source| SecretError::Unreadable {
                    name: self.to_string(),
                    path: path.clone(),
                    source,
                })?
                .trim_end_matches(['\r', '\n'])
                .to_string(),
            SecretSource::Value(value) => value.expose().to_string(),
        };

        if value.is_empty() {
            return Err(SecretError::Empty(self.to_string()));
        }

        tracing::debug!(secret = %self, "resolved secret");
        Ok(Plaintext(value))
    }
}

impl fmt::Display for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.source {
            SecretSource::Env(var) => write!(f, "env:{}", var),
            SecretSource::File(path) => write!(f, "file:{}", path.display()),
            SecretSource::Value(_) => f.write_str("value:***"),
        }
    }
}
