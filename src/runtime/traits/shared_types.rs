// ABOUTME: Shared types used across engine trait definitions.
// ABOUTME: ContainerConfig, VolumeMount, PortMapping, CommitConfig, ContainerInfo.

use crate::types::ContainerId;
use std::collections::HashMap;

/// Configuration for creating a container.
#[derive(Debug, Clone, Default)]
pub struct ContainerConfig {
    /// Container name (engine-generated when None).
    pub name: Option<String>,
    /// Image reference or image ID to run.
    pub image: String,
    /// Environment variables, in `KEY=value` order of application.
    pub env: Vec<(String, String)>,
    pub labels: HashMap<String, String>,
    pub ports: Vec<PortMapping>,
    /// Bind mounts.
    pub volumes: Vec<VolumeMount>,
    /// Command (overrides image CMD).
    pub command: Option<Vec<String>>,
    /// Entrypoint (overrides image ENTRYPOINT). `Some(vec![])` resets it.
    pub entrypoint: Option<Vec<String>>,
    pub working_dir: Option<String>,
    pub user: Option<String>,
    /// Allocate a TTY.
    pub tty: bool,
    /// Keep stdin open for later attachment.
    pub open_stdin: bool,
}

/// Port mapping configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortMapping {
    /// Host port; None leaves the port exposed but unpublished.
    pub host_port: Option<u16>,
    pub container_port: u16,
    pub protocol: Protocol,
    /// Host IP to bind to.
    pub host_ip: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Protocol {
    #[default]
    Tcp,
    Udp,
}

impl Protocol {
    pub fn as_str(&self) -> &'static str {
        match self {
            Protocol::Tcp => "tcp",
            Protocol::Udp => "udp",
        }
    }
}

/// Bind mount of a host path into the container.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VolumeMount {
    /// Absolute host path.
    pub source: String,
    /// Target path in container.
    pub target: String,
    pub read_only: bool,
}

/// Options for committing a container into an image.
#[derive(Debug, Clone, Default)]
pub struct CommitConfig {
    /// Repository to tag the new image with, if any.
    pub repo: Option<String>,
    pub tag: Option<String>,
    pub comment: Option<String>,
    pub labels: HashMap<String, String>,
    /// Environment keys recorded empty in the new image. The container's
    /// values for them never reach the image config.
    pub masked_env: Vec<String>,
}

/// Information about a container.
#[derive(Debug, Clone)]
pub struct ContainerInfo {
    pub id: ContainerId,
    pub name: String,
    pub image: String,
    pub state: ContainerState,
    /// Exit code, once the container has stopped.
    pub exit_code: Option<i64>,
    pub labels: HashMap<String, String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContainerState {
    Created,
    Running,
    Paused,
    Restarting,
    Removing,
    Exited,
    Dead,
}

/// Engine metadata.
#[derive(Debug, Clone)]
pub struct RuntimeMetadata {
    /// Engine name ("Docker" or "Podman").
    pub name: String,
    pub version: String,
    pub api_version: String,
    pub os: String,
    pub arch: String,
}
