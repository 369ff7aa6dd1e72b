// ABOUTME: Opaque handles to host directories and files.
// ABOUTME: Resolved to absolute paths up front so bind mounts never see relative paths.

use std::fmt;
use std::path::{Path, PathBuf};

#[derive(Debug, thiserror::Error)]
pub enum HandleError {
    #[error("{path}: {source}")]
    Unresolvable {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("not a directory: {0}")]
    NotADirectory(PathBuf),

    #[error("not a regular file: {0}")]
    NotAFile(PathBuf),
}

fn resolve(path: &Path) -> Result<PathBuf, HandleError> {
    std::fs::canonicalize(path).map_err(|source| HandleError::Unresolvable {
        path: path.to_path_buf(),
        source,
    })
}

/// A directory on the host that can be mounted into a container.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostDir(PathBuf);

impl HostDir {
    pub fn new(path: impl AsRef<Path>) -> Result<Self, HandleError> {
        let resolved = resolve(path.as_ref())?;
        if !resolved.is_dir() {
            return Err(HandleError::NotADirectory(resolved));
        }
        Ok(Self(resolved))
    }

    pub fn path(&self) -> &Path {
        &self.0
    }

    /// Last path component, used to name projects after their directory.
    pub fn name(&self) -> Option<&str> {
        self.0.file_name().and_then(|n| n.to_str())
    }
}

impl fmt::Display for HostDir {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.display())
    }
}

/// A regular file on the host that can be mounted into a container.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostFile(PathBuf);

impl HostFile {
    pub fn new(path: impl AsRef<Path>) -> Result<Self, HandleError> {
        let resolved = resolve(path.as_ref())?;
        if !resolved.is_file() {
            return Err(HandleError::NotAFile(resolved));
        }
        Ok(Self(resolved))
    }

    pub fn path(&self) -> &Path {
        &self.0
    }
}

impl fmt::Display for HostFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.display())
    }
}
