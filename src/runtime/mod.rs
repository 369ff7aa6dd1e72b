// ABOUTME: Container engine access for Docker and Podman.
// ABOUTME: Local detection, capability traits, and the bollard implementation.

mod bollard;
mod detection;
mod error;
pub mod traits;
mod types;

#[cfg(test)]
pub(crate) mod fake;

pub use self::bollard::BollardRuntime;
pub use detection::{DetectionError, detect_local};
pub use error::{RuntimeError, RuntimeErrorKind};
pub use traits::*;
pub use types::{DetectedRuntime, RuntimeConfig, RuntimeType};

/// Detect the local engine and verify it answers.
pub async fn connect_local(config: Option<&RuntimeConfig>) -> Result<BollardRuntime, RuntimeError> {
    let detected = detect_local(config)?;
    tracing::debug!(
        runtime = %detected.runtime_type,
        socket = %detected.socket_path,
        "detected container runtime"
    );
    let runtime = BollardRuntime::connect(&detected)?;
    runtime.ping().await?;
    Ok(runtime)
}
