// ABOUTME: Bollard-based container engine implementation.
// ABOUTME: Supports both Docker and Podman via the Docker-compatible API.

use crate::runtime::traits::sealed::Sealed;
use crate::runtime::traits::{
    CommitConfig, ContainerConfig, ContainerError, ContainerFilters, ContainerInfo, ContainerOps,
    ContainerState, ContainerSummary, ImageError, ImageOps, ImageSummary, LogError, LogLine, LogOps,
    LogOptions, LogStream, LogStreamBox, RuntimeInfo, RuntimeInfoError, RuntimeMetadata,
};
use crate::runtime::types::{DetectedRuntime, RuntimeType};
use crate::types::{ContainerId, ImageId, ImageRef};
use async_trait::async_trait;
use bollard::Docker;
use bollard::models::{ContainerCreateBody, HostConfig, Mount, MountTypeEnum, PortBinding};
use bollard::query_parameters::{
    CommitContainerOptions, CreateContainerOptions, CreateImageOptions, InspectContainerOptions,
    ListContainersOptions, ListImagesOptions, LogsOptions, RemoveContainerOptions, RemoveImageOptions,
    StopContainerOptions, TagImageOptions, WaitContainerOptions,
};
use futures::StreamExt;
use hyper_util::rt::TokioIo;
use std::collections::HashMap;
use std::time::Duration;
use tokio::net::UnixStream;

/// Seconds bollard waits on a single request; step containers are awaited
/// through streams, so this only bounds individual API calls.
const REQUEST_TIMEOUT_SECS: u64 = 120;

// =============================================================================
// Error Mapping Helpers
// =============================================================================

fn status_of(e: &bollard::errors::Error) -> Option<(u16, &str)> {
    match e {
        bollard::errors::Error::DockerResponseServerError {
            status_code,
            message,
        } => Some((*status_code, message.as_str())),
        _ => None,
    }
}

fn map_image_remove_error(e: bollard::errors::Error, image: &str) -> ImageError {
    match status_of(&e) {
        Some((404, _)) => ImageError::NotFound(image.to_string()),
        Some((409, message)) => ImageError::InUse(message.to_string()),
        _ => ImageError::Runtime(format!("failed to remove {}: {}", image, e)),
    }
}

fn map_container_create_error(e: bollard::errors::Error) -> ContainerError {
    match status_of(&e) {
        Some((404, message)) => ContainerError::ImageNotFound(message.to_string()),
        Some((409, message)) => ContainerError::AlreadyExists(message.to_string()),
        _ => ContainerError::Runtime(e.to_string()),
    }
}

fn map_container_start_error(e: bollard::errors::Error) -> ContainerError {
    match status_of(&e) {
        Some((404, message)) => ContainerError::NotFound(message.to_string()),
        Some((304, message)) => ContainerError::AlreadyRunning(message.to_string()),
        _ => ContainerError::Runtime(e.to_string()),
    }
}

fn map_container_stop_error(e: bollard::errors::Error) -> ContainerError {
    match status_of(&e) {
        Some((404, message)) => ContainerError::NotFound(message.to_string()),
        Some((304, message)) => ContainerError::NotRunning(message.to_string()),
        _ => ContainerError::Runtime(e.to_string()),
    }
}

fn map_container_not_found_error(e: bollard::errors::Error) -> ContainerError {
    match status_of(&e) {
        Some((404, message)) => ContainerError::NotFound(message.to_string()),
        _ => ContainerError::Runtime(e.to_string()),
    }
}

/// Dockerfile instructions blanking `keys` in a committed image. Podman's
/// compat commit applies these; Docker also honours them.
fn commit_changes(keys: &[String]) -> Option<String> {
    if keys.is_empty() {
        return None;
    }
    Some(
        keys.iter()
            .map(|k| format!("ENV {}=", k))
            .collect::<Vec<_>>()
            .join("\n"),
    )
}

/// Image config sent with a commit. Docker merges the container's config
/// into it, so masked keys are listed empty to win over the container's
/// values.
fn commit_image_config(config: &CommitConfig) -> bollard::models::ContainerConfig {
    let env: Vec<String> = config.masked_env.iter().map(|k| format!("{}=", k)).collect();
    bollard::models::ContainerConfig {
        labels: (!config.labels.is_empty()).then(|| config.labels.clone()),
        env: (!env.is_empty()).then_some(env),
        ..Default::default()
    }
}

// =============================================================================
// BollardRuntime
// =============================================================================

/// Container engine implementation using bollard.
///
/// Supports both Docker and Podman via the Docker-compatible API.
/// For Podman, pulls go through the native libpod API.
pub struct BollardRuntime {
    client: Docker,
    runtime_type: RuntimeType,
    socket_path: Option<String>,
}

impl BollardRuntime {
    pub fn new(client: Docker, runtime_type: RuntimeType) -> Self {
        Self {
            client,
            runtime_type,
            socket_path: None,
        }
    }

    /// Connect to a runtime found by [`detect_local`](crate::runtime::detect_local).
    pub fn connect(info: &DetectedRuntime) -> Result<Self, RuntimeInfoError> {
        let client = Docker::connect_with_unix(
            &info.socket_path,
            REQUEST_TIMEOUT_SECS,
            bollard::API_DEFAULT_VERSION,
        )
        .map_err(|e| RuntimeInfoError::ConnectionFailed(e.to_string()))?;

        Ok(Self {
            client,
            runtime_type: info.runtime_type,
            socket_path: Some(info.socket_path.clone()),
        })
    }

    pub fn runtime_type(&self) -> RuntimeType {
        self.runtime_type
    }

    /// Pull image using Podman's native libpod API with tlsVerify=false.
    /// This allows pulling from insecure (HTTP) registries.
    async fn pull_image_libpod(&self, socket_path: &str, image_name: &str) -> Result<(), ImageError> {
        let stream = UnixStream::connect(socket_path)
            .await
            .map_err(|e| ImageError::PullFailed(format!("failed to connect to socket: {}", e)))?;

        let (mut sender, conn) = hyper::client::conn::http1::handshake(TokioIo::new(stream))
            .await
            .map_err(|e| ImageError::PullFailed(format!("HTTP handshake failed: {}", e)))?;

        tokio::spawn(async move {
            if let Err(e) = conn.await {
                tracing::warn!("libpod connection error: {}", e);
            }
        });

        let uri = format!(
            "/v4.0.0/libpod/images/pull?reference={}&tlsVerify=false",
            urlencoding::encode(image_name)
        );

        let req = hyper::Request::builder()
            .method("POST")
            .uri(&uri)
            .header("Host", "localhost")
            .body(http_body_util::Empty::<bytes::Bytes>::new())
            .map_err(|e| ImageError::PullFailed(format!("failed to build request: {}", e)))?;

        let resp = sender
            .send_request(req)
            .await
            .map_err(|e| ImageError::PullFailed(format!("request failed: {}", e)))?;

        use http_body_util::BodyExt;

        let status = resp.status();
        // The body is a stream of progress JSON; errors may appear inside it even on 200.
        let body = resp
            .into_body()
            .collect()
            .await
            .map_err(|e| ImageError::PullFailed(format!("failed to read response: {}", e)))?
            .to_bytes();
        let body_text = String::from_utf8_lossy(&body);

        if !status.is_success() {
            return Err(ImageError::PullFailed(format!(
                "{}: libpod API error: {}",
                image_name, body_text
            )));
        }

        if body_text.contains("\"error\"") && !body_text.contains("\"error\":null") {
            return Err(ImageError::PullFailed(format!("{}: {}", image_name, body_text)));
        }

        Ok(())
    }
}

impl Sealed for BollardRuntime {}

#[async_trait]
impl RuntimeInfo for BollardRuntime {
    async fn info(&self) -> Result<RuntimeMetadata, RuntimeInfoError> {
        let info = self
            .client
            .info()
            .await
            .map_err(|e| RuntimeInfoError::ConnectionFailed(e.to_string()))?;

        let name = match self.runtime_type {
            RuntimeType::Docker => "Docker",
            RuntimeType::Podman => "Podman",
        };

        Ok(RuntimeMetadata {
            name: name.to_string(),
            version: info.server_version.unwrap_or_default(),
            api_version: bollard::API_DEFAULT_VERSION.to_string(),
            os: info.operating_system.unwrap_or_default(),
            arch: info.architecture.unwrap_or_default(),
        })
    }

    async fn ping(&self) -> Result<(), RuntimeInfoError> {
        self.client
            .ping()
            .await
            .map_err(|e| RuntimeInfoError::ConnectionFailed(e.to_string()))?;
        Ok(())
    }
}

#[async_trait]
impl ImageOps for BollardRuntime {
    async fn pull_image(&self, reference: &ImageRef) -> Result<(), ImageError> {
        let image_name = reference.to_string();
        tracing::debug!(image = %image_name, runtime = %self.runtime_type, "pulling image");

        if self.runtime_type == RuntimeType::Podman
            && let Some(socket_path) = &self.socket_path
        {
            return self.pull_image_libpod(socket_path, &image_name).await;
        }

        let opts = CreateImageOptions {
            from_image: Some(image_name.clone()),
            ..Default::default()
        };

        // Progress updates are only interesting for their errors.
        let mut stream = self.client.create_image(Some(opts), None, None);
        while let Some(result) = stream.next().await {
            result.map_err(|e| ImageError::PullFailed(format!("{}: {}", image_name, e)))?;
        }

        Ok(())
    }

    async fn image_exists(&self, image: &str) -> Result<bool, ImageError> {
        match self.client.inspect_image(image).await {
            Ok(_) => Ok(true),
            Err(bollard::errors::Error::DockerResponseServerError {
                status_code: 404, ..
            }) => Ok(false),
            Err(e) => Err(ImageError::Runtime(format!(
                "failed to inspect {}: {}",
                image, e
            ))),
        }
    }

    async fn commit_container(
        &self,
        container: &ContainerId,
        config: &CommitConfig,
    ) -> Result<ImageId, ImageError> {
        let opts = CommitContainerOptions {
            container: Some(container.to_string()),
            repo: config.repo.clone(),
            tag: config.tag.clone(),
            comment: config.comment.clone(),
            changes: commit_changes(&config.masked_env),
            pause: false,
            ..Default::default()
        };

        let response = self
            .client
            .commit_container(opts, commit_image_config(config))
            .await
            .map_err(|e| ImageError::CommitFailed(format!("{}: {}", container, e)))?;

        Ok(ImageId::new(response.id))
    }

    async fn list_images(
        &self,
        labels: &HashMap<String, String>,
    ) -> Result<Vec<ImageSummary>, ImageError> {
        let filters = HashMap::from([(
            "label".to_string(),
            labels
                .iter()
                .map(|(k, v)| format!("{}={}", k, v))
                .collect::<Vec<_>>(),
        )]);
        let opts = ListImagesOptions {
            all: false,
            filters: Some(filters),
            ..Default::default()
        };

        let images = self
            .client
            .list_images(Some(opts))
            .await
            .map_err(|e| ImageError::Runtime(format!("failed to list images: {}", e)))?;

        Ok(images
            .into_iter()
            .map(|image| ImageSummary {
                id: ImageId::new(image.id),
                tags: image
                    .repo_tags
                    .into_iter()
                    .filter(|t| t != "<none>:<none>")
                    .collect(),
                labels: image.labels,
            })
            .collect())
    }

    async fn tag_image(&self, image: &ImageId, reference: &ImageRef) -> Result<(), ImageError> {
        let opts = TagImageOptions {
            repo: Some(reference.repository()),
            tag: reference.tag().map(str::to_string),
        };

        self.client
            .tag_image(image.as_str(), Some(opts))
            .await
            .map_err(|e| match status_of(&e) {
                Some((404, _)) => ImageError::NotFound(image.to_string()),
                _ => ImageError::Runtime(format!("failed to tag {}: {}", image, e)),
            })
    }

    async fn remove_image(&self, image: &str, force: bool) -> Result<(), ImageError> {
        let opts = RemoveImageOptions {
            force,
            ..Default::default()
        };

        self.client
            .remove_image(image, Some(opts), None)
            .await
            .map_err(|e| map_image_remove_error(e, image))?;

        Ok(())
    }
}

#[async_trait]
impl ContainerOps for BollardRuntime {
    async fn create_container(
        &self,
        config: &ContainerConfig,
    ) -> Result<ContainerId, ContainerError> {
        let env: Vec<String> = config
            .env
            .iter()
            .map(|(k, v)| format!("{}={}", k, v))
            .collect();

        let mut host_config = HostConfig::default();

        let mounts: Vec<Mount> = config
            .volumes
            .iter()
            .map(|m| Mount {
                source: Some(m.source.clone()),
                target: Some(m.target.clone()),
                typ: Some(MountTypeEnum::BIND),
                read_only: Some(m.read_only),
                ..Default::default()
            })
            .collect();
        if !mounts.is_empty() {
            host_config.mounts = Some(mounts);
        }

        let mut port_bindings: HashMap<String, Option<Vec<PortBinding>>> = HashMap::new();
        let mut exposed_ports: Vec<String> = Vec::new();
        for port in &config.ports {
            let port_key = format!("{}/{}", port.container_port, port.protocol.as_str());
            exposed_ports.push(port_key.clone());

            if let Some(host_port) = port.host_port {
                port_bindings.insert(
                    port_key,
                    Some(vec![PortBinding {
                        host_ip: port.host_ip.clone(),
                        host_port: Some(host_port.to_string()),
                    }]),
                );
            }
        }
        if !port_bindings.is_empty() {
            host_config.port_bindings = Some(port_bindings);
        }

        // The engine resets ENTRYPOINT when given a single empty string.
        let entrypoint = config.entrypoint.as_ref().map(|ep| {
            if ep.is_empty() {
                vec![String::new()]
            } else {
                ep.clone()
            }
        });

        let body = ContainerCreateBody {
            image: Some(config.image.clone()),
            env: (!env.is_empty()).then_some(env),
            labels: (!config.labels.is_empty()).then(|| config.labels.clone()),
            cmd: config.command.clone(),
            entrypoint,
            working_dir: config.working_dir.clone(),
            user: config.user.clone(),
            tty: Some(config.tty),
            open_stdin: Some(config.open_stdin),
            attach_stdin: Some(config.open_stdin),
            attach_stdout: Some(true),
            attach_stderr: Some(true),
            host_config: Some(host_config),
            exposed_ports: (!exposed_ports.is_empty()).then_some(exposed_ports),
            ..Default::default()
        };

        let opts = CreateContainerOptions {
            name: config.name.clone(),
            ..Default::default()
        };

        let response = self
            .client
            .create_container(Some(opts), body)
            .await
            .map_err(map_container_create_error)?;

        for warning in &response.warnings {
            tracing::warn!(container = %response.id, "engine warning: {}", warning);
        }

        Ok(ContainerId::new(response.id))
    }

    async fn start_container(&self, id: &ContainerId) -> Result<(), ContainerError> {
        self.client
            .start_container(
                id.as_str(),
                None::<bollard::query_parameters::StartContainerOptions>,
            )
            .await
            .map_err(map_container_start_error)
    }

    async fn wait_container(&self, id: &ContainerId) -> Result<i64, ContainerError> {
        let mut stream = self
            .client
            .wait_container(id.as_str(), None::<WaitContainerOptions>);

        let mut exit_code = None;
        while let Some(item) = stream.next().await {
            match item {
                Ok(response) => exit_code = Some(response.status_code),
                // bollard reports non-zero exits as errors; they are results here.
                Err(bollard::errors::Error::DockerContainerWaitError { code, .. }) => {
                    exit_code = Some(code)
                }
                Err(e) => return Err(map_container_not_found_error(e)),
            }
        }

        match exit_code {
            Some(code) => Ok(code),
            None => self
                .inspect_container(id)
                .await?
                .exit_code
                .ok_or_else(|| ContainerError::Runtime(format!("no exit code for {}", id))),
        }
    }

    async fn stop_container(
        &self,
        id: &ContainerId,
        timeout: Duration,
    ) -> Result<(), ContainerError> {
        let opts = StopContainerOptions {
            t: Some(timeout.as_secs() as i32),
            signal: None,
        };

        self.client
            .stop_container(id.as_str(), Some(opts))
            .await
            .map_err(map_container_stop_error)
    }

    async fn remove_container(&self, id: &ContainerId, force: bool) -> Result<(), ContainerError> {
        let opts = RemoveContainerOptions {
            force,
            ..Default::default()
        };

        self.client
            .remove_container(id.as_str(), Some(opts))
            .await
            .map_err(map_container_not_found_error)
    }

    async fn inspect_container(&self, id: &ContainerId) -> Result<ContainerInfo, ContainerError> {
        let details = self
            .client
            .inspect_container(id.as_str(), None::<InspectContainerOptions>)
            .await
            .map_err(map_container_not_found_error)?;

        let state = details
            .state
            .as_ref()
            .and_then(|s| s.status)
            .map(|s| match s {
                bollard::models::ContainerStateStatusEnum::CREATED => ContainerState::Created,
                bollard::models::ContainerStateStatusEnum::RUNNING => ContainerState::Running,
                bollard::models::ContainerStateStatusEnum::PAUSED => ContainerState::Paused,
                bollard::models::ContainerStateStatusEnum::RESTARTING => ContainerState::Restarting,
                bollard::models::ContainerStateStatusEnum::REMOVING => ContainerState::Removing,
                bollard::models::ContainerStateStatusEnum::DEAD => ContainerState::Dead,
                _ => ContainerState::Exited,
            })
            .unwrap_or(ContainerState::Exited);

        let exit_code = match state {
            ContainerState::Exited | ContainerState::Dead => {
                details.state.as_ref().and_then(|s| s.exit_code)
            }
            _ => None,
        };

        Ok(ContainerInfo {
            id: id.clone(),
            name: details
                .name
                .unwrap_or_default()
                .trim_start_matches('/')
                .to_string(),
            image: details
                .config
                .as_ref()
                .and_then(|c| c.image.clone())
                .unwrap_or_default(),
            state,
            exit_code,
            labels: details.config.and_then(|c| c.labels).unwrap_or_default(),
        })
    }

    async fn list_containers(
        &self,
        filters: &ContainerFilters,
    ) -> Result<Vec<ContainerSummary>, ContainerError> {
        let mut filter_map: HashMap<String, Vec<String>> = HashMap::new();
        for (key, value) in &filters.labels {
            filter_map
                .entry("label".to_string())
                .or_default()
                .push(format!("{}={}", key, value));
        }

        let opts = ListContainersOptions {
            all: filters.all,
            filters: Some(filter_map),
            ..Default::default()
        };

        // Podman reports transient "stopping"/"stopped" states that bollard
        // cannot deserialize; retry briefly while they settle.
        let mut last_error = None;
        for attempt in 0..3 {
            match self.client.list_containers(Some(opts.clone())).await {
                Ok(containers) => {
                    return Ok(containers
                        .into_iter()
                        .map(|c| ContainerSummary {
                            id: ContainerId::new(c.id.unwrap_or_default()),
                            name: c
                                .names
                                .unwrap_or_default()
                                .first()
                                .map(|n| n.trim_start_matches('/').to_string())
                                .unwrap_or_default(),
                            image: c.image.unwrap_or_default(),
                            state: c
                                .state
                                .map(|s| format!("{:?}", s).to_lowercase())
                                .unwrap_or_default(),
                            labels: c.labels.unwrap_or_default(),
                        })
                        .collect());
                }
                Err(e) => {
                    let err_str = e.to_string();
                    if (err_str.contains("unknown variant `stopping`")
                        || err_str.contains("unknown variant `stopped`"))
                        && attempt < 2
                    {
                        tokio::time::sleep(Duration::from_millis(500)).await;
                        last_error = Some(err_str);
                        continue;
                    }
                    return Err(ContainerError::Runtime(err_str));
                }
            }
        }

        Err(ContainerError::Runtime(
            last_error.unwrap_or_else(|| "list_containers failed".to_string()),
        ))
    }
}

#[async_trait]
impl LogOps for BollardRuntime {
    async fn container_logs(
        &self,
        id: &ContainerId,
        opts: &LogOptions,
    ) -> Result<LogStreamBox, LogError> {
        let log_opts = LogsOptions {
            stdout: opts.stdout,
            stderr: opts.stderr,
            follow: opts.follow,
            tail: opts
                .tail
                .map(|n| n.to_string())
                .unwrap_or_else(|| "all".to_string()),
            ..Default::default()
        };

        let container = id.to_string();
        let stream = self.client.logs(id.as_str(), Some(log_opts)).map(move |result| {
            result
                .map(|output| {
                    let (stream, data) = match output {
                        bollard::container::LogOutput::StdErr { message } => {
                            (LogStream::Stderr, message)
                        }
                        bollard::container::LogOutput::StdOut { message }
                        | bollard::container::LogOutput::StdIn { message }
                        | bollard::container::LogOutput::Console { message } => {
                            (LogStream::Stdout, message)
                        }
                    };

                    LogLine {
                        content: String::from_utf8_lossy(&data).into_owned(),
                        stream,
                    }
                })
                .map_err(|e| match status_of(&e) {
                    Some((404, _)) => LogError::ContainerNotFound(container.clone()),
                    _ => LogError::StreamError(e.to_string()),
                })
        });

        Ok(Box::pin(stream))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn commit_without_masked_env_sends_no_env() {
        let config = CommitConfig {
            labels: HashMap::from([("kagglelab.role".to_string(), "step".to_string())]),
            ..Default::default()
        };

        assert!(commit_changes(&config.masked_env).is_none());
        let image = commit_image_config(&config);
        assert!(image.env.is_none());
        assert_eq!(image.labels.unwrap().len(), 1);
    }

    #[test]
    fn commit_blanks_masked_env_in_body_and_changes() {
        let config = CommitConfig {
            masked_env: vec!["MOTHERDUCK_TOKEN".to_string(), "JUPYTER_TOKEN".to_string()],
            ..Default::default()
        };

        assert_eq!(
            commit_image_config(&config).env,
            Some(vec![
                "MOTHERDUCK_TOKEN=".to_string(),
                "JUPYTER_TOKEN=".to_string()
            ])
        );
        assert_eq!(
            commit_changes(&config.masked_env).as_deref(),
            Some("ENV MOTHERDUCK_TOKEN=\nENV JUPYTER_TOKEN=")
        );
    }
}
