// ABOUTME: Terminal values of a pipeline: a notebook service or a debug shell.
// ABOUTME: The service token is held as plaintext but never printed.

use super::secret::Plaintext;
use super::spec::ContainerSpec;
use crate::types::ContainerId;
use nonempty::NonEmpty;
use std::fmt;
use std::net::IpAddr;

/// A notebook server ready to be started by the executor.
#[derive(Clone)]
pub struct ServiceSpec {
    container: ContainerSpec,
    command: NonEmpty<String>,
    port: u16,
    token: Plaintext,
}

impl ServiceSpec {
    pub(crate) fn new(
        container: ContainerSpec,
        command: NonEmpty<String>,
        port: u16,
        token: Plaintext,
    ) -> Self {
        Self {
            container,
            command,
            port,
            token,
        }
    }

    pub fn container(&self) -> &ContainerSpec {
        &self.container
    }

    /// Startup arguments, including the token.
    pub fn command(&self) -> &NonEmpty<String> {
        &self.command
    }

    /// Container port the notebook listens on.
    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn token(&self) -> &Plaintext {
        &self.token
    }

    /// Startup arguments with the token masked.
    pub fn redacted_command(&self) -> String {
        self.token
            .redact(&self.command.iter().cloned().collect::<Vec<_>>().join(" "))
    }
}

impl fmt::Debug for ServiceSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceSpec")
            .field("container", &self.container)
            .field("command", &self.redacted_command())
            .field("port", &self.port)
            .finish()
    }
}

/// Host-side binding for a started service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceOptions {
    pub host_ip: IpAddr,
    pub host_port: u16,
}

impl Default for ServiceOptions {
    fn default() -> Self {
        Self {
            host_ip: IpAddr::from([127, 0, 0, 1]),
            host_port: super::paths::NOTEBOOK_PORT,
        }
    }
}

/// A running notebook container.
#[derive(Debug, Clone)]
pub struct ServiceHandle {
    pub container: ContainerId,
    pub name: String,
    pub url: String,
    pub port: u16,
}

/// A running debug shell waiting for a terminal to attach.
#[derive(Debug, Clone)]
pub struct ShellHandle {
    pub container: ContainerId,
    pub name: String,
}

impl ShellHandle {
    /// Engine command that attaches the user's terminal, e.g.
    /// `docker attach kagglelab-titanic-shell`.
    pub fn attach_command(&self, engine_cli: &str) -> Vec<String> {
        vec![
            engine_cli.to_string(),
            "attach".to_string(),
            self.name.clone(),
        ]
    }
}
