// ABOUTME: Local container runtime detection.
// ABOUTME: Honours explicit config and DOCKER_HOST, then probes Podman and Docker sockets.

use super::types::{DetectedRuntime, RuntimeConfig, RuntimeType};
use std::path::Path;

#[derive(Debug, thiserror::Error)]
pub enum DetectionError {
    #[error("no container runtime found (checked DOCKER_HOST, Podman and Docker sockets)")]
    NoRuntimeFound,

    #[error("configured socket does not exist: {0}")]
    SocketMissing(String),

    #[error("unsupported DOCKER_HOST {0:?} (only unix:// sockets are supported)")]
    UnsupportedHost(String),
}

const ROOTFUL_PODMAN: &str = "/run/podman/podman.sock";
const DOCKER_SOCKET: &str = "/var/run/docker.sock";

/// Detect the container runtime on this machine.
///
/// Detection order:
/// 1. Explicit `runtime`/`socket` from configuration
/// 2. `DOCKER_HOST` (unix sockets only)
/// 3. Rootless Podman socket (`/run/user/$UID/podman/podman.sock`)
/// 4. Rootful Podman socket (`/run/podman/podman.sock`)
/// 5. Docker socket (`/var/run/docker.sock`)
pub fn detect_local(config: Option<&RuntimeConfig>) -> Result<DetectedRuntime, DetectionError> {
    let docker_host = std::env::var("DOCKER_HOST").ok();
    detect_with(
        config,
        docker_host.as_deref(),
        get_uid().as_deref(),
        |p| p.exists(),
    )
}

/// Detection logic with the environment passed in.
pub(crate) fn detect_with(
    config: Option<&RuntimeConfig>,
    docker_host: Option<&str>,
    uid: Option<&str>,
    exists: impl Fn(&Path) -> bool,
) -> Result<DetectedRuntime, DetectionError> {
    if let Some(cfg) = config {
        match (cfg.runtime, cfg.socket.as_deref()) {
            (Some(runtime_type), socket) => {
                let socket_path = socket
                    .map(str::to_string)
                    .unwrap_or_else(|| default_socket_path(runtime_type).to_string());
                return Ok(DetectedRuntime {
                    runtime_type,
                    socket_path,
                });
            }
            (None, Some(socket)) => {
                if !exists(Path::new(socket)) {
                    return Err(DetectionError::SocketMissing(socket.to_string()));
                }
                return Ok(DetectedRuntime {
                    runtime_type: guess_type(socket),
                    socket_path: socket.to_string(),
                });
            }
            (None, None) => {}
        }
    }

    if let Some(host) = docker_host.filter(|h| !h.is_empty()) {
        let socket = host
            .strip_prefix("unix://")
            .ok_or_else(|| DetectionError::UnsupportedHost(host.to_string()))?;
        return Ok(DetectedRuntime {
            runtime_type: guess_type(socket),
            socket_path: socket.to_string(),
        });
    }

    if let Some(uid) = uid {
        let rootless_socket = format!("/run/user/{}/podman/podman.sock", uid);
        if exists(Path::new(&rootless_socket)) {
            return Ok(DetectedRuntime {
                runtime_type: RuntimeType::Podman,
                socket_path: rootless_socket,
            });
        }
    }

    if exists(Path::new(ROOTFUL_PODMAN)) {
        return Ok(DetectedRuntime {
            runtime_type: RuntimeType::Podman,
            socket_path: ROOTFUL_PODMAN.to_string(),
        });
    }

    if exists(Path::new(DOCKER_SOCKET)) {
        return Ok(DetectedRuntime {
            runtime_type: RuntimeType::Docker,
            socket_path: DOCKER_SOCKET.to_string(),
        });
    }

    Err(DetectionError::NoRuntimeFound)
}

fn guess_type(socket: &str) -> RuntimeType {
    if socket.contains("podman") {
        RuntimeType::Podman
    } else {
        RuntimeType::Docker
    }
}

fn default_socket_path(runtime: RuntimeType) -> &'static str {
    match runtime {
        RuntimeType::Docker => DOCKER_SOCKET,
        RuntimeType::Podman => ROOTFUL_PODMAN,
    }
}

fn get_uid() -> Option<String> {
    std::env::var("UID").ok().or_else(|| {
        std::fs::read_to_string("/proc/self/status")
            .ok()
            .and_then(|s| {
                s.lines()
                    .find(|l| l.starts_with("Uid:"))
                    .and_then(|l| l.split_whitespace().nth(1))
                    .map(|s| s.to_string())
            })
    })
}
