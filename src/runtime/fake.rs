// ABOUTME: In-memory engine used by unit tests of the pipeline executor.
// ABOUTME: Records every call and scripts exit codes by command substring.

use crate::runtime::traits::sealed::Sealed;
use crate::runtime::traits::{
    CommitConfig, ContainerConfig, ContainerError, ContainerFilters, ContainerInfo, ContainerOps,
    ContainerState, ContainerSummary, ImageError, ImageOps, ImageSummary, LogError, LogLine, LogOps, LogOptions,
    LogStream, LogStreamBox, RuntimeInfo, RuntimeInfoError, RuntimeMetadata,
};
use crate::types::{ContainerId, ImageId, ImageRef};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::time::Duration;

#[derive(Debug, Clone)]
struct FakeContainer {
    config: ContainerConfig,
    name: String,
    state: ContainerState,
    exit_code: Option<i64>,
}

#[derive(Debug, Clone)]
struct FakeImage {
    id: ImageId,
    labels: HashMap<String, String>,
    tags: Vec<String>,
}

#[derive(Default)]
struct State {
    next_id: u64,
    containers: HashMap<String, FakeContainer>,
    created: Vec<ContainerConfig>,
    executed: Vec<String>,
    commits: Vec<ImageId>,
    images: Vec<FakeImage>,
    commit_configs: Vec<CommitConfig>,
    removed_containers: Vec<String>,
    removed_images: Vec<String>,
    stopped: Vec<String>,
    pulls: Vec<String>,
    tags: Vec<(String, String)>,
}

/// Scriptable engine: every container exits 0 unless a rule matches its
/// command line.
#[derive(Default)]
pub struct FakeRuntime {
    state: Mutex<State>,
    failures: Vec<(String, i64)>,
    hangs: Vec<String>,
    crashes: Vec<(String, i64)>,
    outputs: Vec<(String, String)>,
    no_local_images: bool,
}

impl FakeRuntime {
    pub fn new() -> Self {
        Self::default()
    }

    /// Containers whose command contains `needle` exit with `code`.
    pub fn fail_when(mut self, needle: &str, code: i64) -> Self {
        self.failures.push((needle.to_string(), code));
        self
    }

    /// Containers whose command contains `needle` never exit.
    pub fn hang_when(mut self, needle: &str) -> Self {
        self.hangs.push(needle.to_string());
        self
    }

    /// Containers whose command contains `needle` exit with `code` as soon
    /// as they start.
    pub fn crash_when(mut self, needle: &str, code: i64) -> Self {
        self.crashes.push((needle.to_string(), code));
        self
    }

    /// Containers whose command contains `needle` print `line`.
    pub fn output_when(mut self, needle: &str, line: &str) -> Self {
        self.outputs.push((needle.to_string(), line.to_string()));
        self
    }

    pub fn without_local_images(mut self) -> Self {
        self.no_local_images = true;
        self
    }

    /// Pre-existing running container owned by `project`.
    pub fn with_running(self, name: &str, project: &str, role: &str) -> Self {
        {
            let mut state = self.state.lock();
            state.next_id += 1;
            let id = format!("pre{:04}", state.next_id);
            let labels = HashMap::from([
                ("kagglelab.managed".to_string(), "true".to_string()),
                ("kagglelab.project".to_string(), project.to_string()),
                ("kagglelab.role".to_string(), role.to_string()),
            ]);
            state.containers.insert(
                id,
                FakeContainer {
                    config: ContainerConfig {
                        name: Some(name.to_string()),
                        labels,
                        ..Default::default()
                    },
                    name: name.to_string(),
                    state: ContainerState::Running,
                    exit_code: None,
                },
            );
        }
        self
    }

    pub fn created(&self) -> Vec<ContainerConfig> {
        self.state.lock().created.clone()
    }

    /// Command lines of started containers, in start order.
    pub fn executed(&self) -> Vec<String> {
        self.state.lock().executed.clone()
    }

    pub fn commits(&self) -> Vec<ImageId> {
        self.state.lock().commits.clone()
    }

    pub fn commit_configs(&self) -> Vec<CommitConfig> {
        self.state.lock().commit_configs.clone()
    }

    pub fn removed_containers(&self) -> Vec<String> {
        self.state.lock().removed_containers.clone()
    }

    pub fn removed_images(&self) -> Vec<String> {
        self.state.lock().removed_images.clone()
    }

    pub fn stopped(&self) -> Vec<String> {
        self.state.lock().stopped.clone()
    }

    pub fn pulls(&self) -> Vec<String> {
        self.state.lock().pulls.clone()
    }

    pub fn tags(&self) -> Vec<(String, String)> {
        self.state.lock().tags.clone()
    }

    fn command_line(config: &ContainerConfig) -> String {
        config.command.clone().unwrap_or_default().join(" ")
    }

    fn command_of(&self, id: &ContainerId) -> Result<String, ContainerError> {
        self.state
            .lock()
            .containers
            .get(id.as_str())
            .map(|c| Self::command_line(&c.config))
            .ok_or_else(|| ContainerError::NotFound(id.to_string()))
    }
}

impl Sealed for FakeRuntime {}

#[async_trait]
impl RuntimeInfo for FakeRuntime {
    async fn info(&self) -> Result<RuntimeMetadata, RuntimeInfoError> {
        Ok(RuntimeMetadata {
            name: "Fake".to_string(),
            version: "0.0.0".to_string(),
            api_version: "1.43".to_string(),
            os: "linux".to_string(),
            arch: "amd64".to_string(),
        })
    }

    async fn ping(&self) -> Result<(), RuntimeInfoError> {
        Ok(())
    }
}

#[async_trait]
impl ImageOps for FakeRuntime {
    async fn pull_image(&self, reference: &ImageRef) -> Result<(), ImageError> {
        self.state.lock().pulls.push(reference.to_string());
        Ok(())
    }

    async fn image_exists(&self, image: &str) -> Result<bool, ImageError> {
        let state = self.state.lock();
        Ok(!self.no_local_images || state.pulls.iter().any(|p| p == image))
    }

    async fn commit_container(
        &self,
        container: &ContainerId,
        config: &CommitConfig,
    ) -> Result<ImageId, ImageError> {
        let mut state = self.state.lock();
        if !state.containers.contains_key(container.as_str()) {
            return Err(ImageError::CommitFailed(container.to_string()));
        }
        state.next_id += 1;
        let image = ImageId::new(format!("sha256:layer{:08}", state.next_id));
        let tags = match (&config.repo, &config.tag) {
            (Some(repo), Some(tag)) => vec![format!("{}:{}", repo, tag)],
            _ => Vec::new(),
        };
        state.images.push(FakeImage {
            id: image.clone(),
            labels: config.labels.clone(),
            tags,
        });
        state.commits.push(image.clone());
        state.commit_configs.push(config.clone());
        Ok(image)
    }

    async fn tag_image(&self, image: &ImageId, reference: &ImageRef) -> Result<(), ImageError> {
        let mut state = self.state.lock();
        if let Some(known) = state.images.iter_mut().find(|i| &i.id == image) {
            known.tags.push(reference.to_string());
        }
        state.tags.push((image.to_string(), reference.to_string()));
        Ok(())
    }

    async fn remove_image(&self, image: &str, _force: bool) -> Result<(), ImageError> {
        let mut state = self.state.lock();
        state.images.retain(|i| i.id.as_str() != image);
        state.removed_images.push(image.to_string());
        Ok(())
    }

    async fn list_images(
        &self,
        labels: &HashMap<String, String>,
    ) -> Result<Vec<ImageSummary>, ImageError> {
        Ok(self
            .state
            .lock()
            .images
            .iter()
            .filter(|i| labels.iter().all(|(k, v)| i.labels.get(k) == Some(v)))
            .map(|i| ImageSummary {
                id: i.id.clone(),
                tags: i.tags.clone(),
                labels: i.labels.clone(),
            })
            .collect())
    }
}

#[async_trait]
impl ContainerOps for FakeRuntime {
    async fn create_container(
        &self,
        config: &ContainerConfig,
    ) -> Result<ContainerId, ContainerError> {
        let mut state = self.state.lock();
        if let Some(name) = &config.name
            && state.containers.values().any(|c| &c.name == name)
        {
            return Err(ContainerError::AlreadyExists(name.clone()));
        }
        state.next_id += 1;
        let id = format!("ctr{:04}", state.next_id);
        state.containers.insert(
            id.clone(),
            FakeContainer {
                config: config.clone(),
                name: config.name.clone().unwrap_or_else(|| id.clone()),
                state: ContainerState::Created,
                exit_code: None,
            },
        );
        state.created.push(config.clone());
        Ok(ContainerId::new(id))
    }

    async fn start_container(&self, id: &ContainerId) -> Result<(), ContainerError> {
        let mut state = self.state.lock();
        let container = state
            .containers
            .get_mut(id.as_str())
            .ok_or_else(|| ContainerError::NotFound(id.to_string()))?;
        let line = Self::command_line(&container.config);
        match self.crashes.iter().find(|(n, _)| line.contains(n.as_str())) {
            Some((_, code)) => {
                container.state = ContainerState::Exited;
                container.exit_code = Some(*code);
            }
            None => container.state = ContainerState::Running,
        }
        state.executed.push(line);
        Ok(())
    }

    async fn wait_container(&self, id: &ContainerId) -> Result<i64, ContainerError> {
        let command = self.command_of(id)?;
        if self.hangs.iter().any(|n| command.contains(n.as_str())) {
            std::future::pending::<()>().await;
        }
        let code = self
            .failures
            .iter()
            .find(|(n, _)| command.contains(n.as_str()))
            .map(|(_, code)| *code)
            .unwrap_or(0);

        let mut state = self.state.lock();
        if let Some(container) = state.containers.get_mut(id.as_str()) {
            container.state = ContainerState::Exited;
            container.exit_code = Some(code);
        }
        Ok(code)
    }

    async fn stop_container(
        &self,
        id: &ContainerId,
        _timeout: Duration,
    ) -> Result<(), ContainerError> {
        let mut state = self.state.lock();
        let container = state
            .containers
            .get_mut(id.as_str())
            .ok_or_else(|| ContainerError::NotFound(id.to_string()))?;
        container.state = ContainerState::Exited;
        state.stopped.push(id.to_string());
        Ok(())
    }

    async fn remove_container(&self, id: &ContainerId, _force: bool) -> Result<(), ContainerError> {
        let mut state = self.state.lock();
        state
            .containers
            .remove(id.as_str())
            .ok_or_else(|| ContainerError::NotFound(id.to_string()))?;
        state.removed_containers.push(id.to_string());
        Ok(())
    }

    async fn inspect_container(&self, id: &ContainerId) -> Result<ContainerInfo, ContainerError> {
        let state = self.state.lock();
        let container = state
            .containers
            .get(id.as_str())
            .ok_or_else(|| ContainerError::NotFound(id.to_string()))?;
        Ok(ContainerInfo {
            id: id.clone(),
            name: container.name.clone(),
            image: container.config.image.clone(),
            state: container.state,
            exit_code: container.exit_code,
            labels: container.config.labels.clone(),
        })
    }

    async fn list_containers(
        &self,
        filters: &ContainerFilters,
    ) -> Result<Vec<ContainerSummary>, ContainerError> {
        let state = self.state.lock();
        let mut found: Vec<_> = state
            .containers
            .iter()
            .filter(|(_, c)| filters.all || c.state == ContainerState::Running)
            .filter(|(_, c)| {
                filters
                    .labels
                    .iter()
                    .all(|(k, v)| c.config.labels.get(k) == Some(v))
            })
            .map(|(id, c)| ContainerSummary {
                id: ContainerId::new(id.clone()),
                name: c.name.clone(),
                image: c.config.image.clone(),
                state: match c.state {
                    ContainerState::Running => "running".to_string(),
                    ContainerState::Created => "created".to_string(),
                    _ => "exited".to_string(),
                },
                labels: c.config.labels.clone(),
            })
            .collect();
        found.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(found)
    }
}

#[async_trait]
impl LogOps for FakeRuntime {
    async fn container_logs(
        &self,
        id: &ContainerId,
        _opts: &LogOptions,
    ) -> Result<LogStreamBox, LogError> {
        let command = self
            .command_of(id)
            .map_err(|_| LogError::ContainerNotFound(id.to_string()))?;
        let lines: Vec<Result<LogLine, LogError>> = self
            .outputs
            .iter()
            .filter(|(needle, _)| command.contains(needle.as_str()))
            .map(|(_, line)| {
                Ok(LogLine {
                    content: line.clone(),
                    stream: LogStream::Stdout,
                })
            })
            .collect();
        Ok(Box::pin(futures::stream::iter(lines)))
    }
}
