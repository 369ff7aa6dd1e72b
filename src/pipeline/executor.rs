// ABOUTME: Materializes pipeline descriptions against a container engine.
// ABOUTME: Each run-command step runs in a fresh container and is committed as a layer.

use super::error::PipelineError;
use super::events::{EventSender, PipelineEvent, StepIndex};
use super::secret::Plaintext;
use super::service::{ServiceHandle, ServiceOptions, ServiceSpec, ShellHandle};
use super::spec::{ContainerSpec, Snapshot};
use super::step::{ExecStep, FailurePolicy, Step};
use crate::diagnostics::{Diagnostics, Warning};
use crate::runtime::{
    CommitConfig, ContainerConfig, ContainerFilters, ContainerState, ContainerSummary,
    FullRuntime, ImageError, LogOptions, PortMapping, Protocol, VolumeMount,
};
use crate::types::{ContainerId, ImageId, ImageRef};
use futures::StreamExt;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::time::Duration;

pub const LABEL_MANAGED: &str = "kagglelab.managed";
pub const LABEL_PROJECT: &str = "kagglelab.project";
pub const LABEL_ROLE: &str = "kagglelab.role";
pub const LABEL_BUILT_AT: &str = "kagglelab.built-at";

/// What a managed container is for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Step,
    Service,
    Shell,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Step => "step",
            Role::Service => "service",
            Role::Shell => "shell",
        }
    }
}

#[derive(Debug, Clone)]
pub struct ExecutorOptions {
    /// Project name written to labels and container names.
    pub project: String,
    /// Upper bound for a single run-command step.
    pub step_timeout: Duration,
    /// Tag every layer and keep the layers of failed builds.
    pub keep_layers: bool,
    /// Tag applied to the final image.
    pub tag: Option<ImageRef>,
    /// Grace period when stopping containers.
    pub stop_timeout: Duration,
}

impl ExecutorOptions {
    pub fn new(project: impl Into<String>) -> Self {
        Self {
            project: project.into(),
            step_timeout: Duration::from_secs(60 * 60),
            keep_layers: false,
            tag: None,
            stop_timeout: Duration::from_secs(10),
        }
    }
}

/// Result of running a container description's steps.
#[derive(Debug, Clone)]
pub struct BuiltImage {
    /// Image to start containers from: the last layer, or the base image when
    /// there were no run-command steps.
    pub image: String,
    /// Committed layers in step order.
    pub layers: Vec<ImageId>,
    /// Configuration after all steps.
    pub snapshot: Snapshot,
    /// Number of tolerated step failures.
    pub masked_failures: usize,
}

/// Runs pipelines on a container engine.
pub struct Executor<'r, R: FullRuntime + ?Sized> {
    runtime: &'r R,
    options: ExecutorOptions,
    events: Option<EventSender>,
}

impl<'r, R: FullRuntime + ?Sized> Executor<'r, R> {
    pub fn new(runtime: &'r R, options: ExecutorOptions) -> Self {
        Self {
            runtime,
            options,
            events: None,
        }
    }

    /// Send progress events to `events`.
    pub fn with_events(mut self, events: EventSender) -> Self {
        self.events = Some(events);
        self
    }

    pub fn options(&self) -> &ExecutorOptions {
        &self.options
    }

    fn emit(&self, event: PipelineEvent) {
        if let Some(tx) = &self.events {
            // Receiver gone means nobody is listening; keep running.
            let _ = tx.send(event);
        }
    }

    fn labels(&self, role: Role) -> HashMap<String, String> {
        HashMap::from([
            (LABEL_MANAGED.to_string(), "true".to_string()),
            (LABEL_PROJECT.to_string(), self.options.project.clone()),
            (LABEL_ROLE.to_string(), role.as_str().to_string()),
        ])
    }

    fn container_name(&self, role: Role) -> String {
        let suffix = match role {
            Role::Service => "lab",
            other => other.as_str(),
        };
        format!("kagglelab-{}-{}", self.options.project, suffix)
    }

    // -------------------------------------------------------------------------
    // Build
    // -------------------------------------------------------------------------

    /// Run every step of `spec` in order and return the resulting image.
    pub async fn build(
        &self,
        spec: &ContainerSpec,
        diagnostics: &mut Diagnostics,
    ) -> Result<BuiltImage, PipelineError> {
        self.ensure_base(spec.base()).await?;

        let total = spec.exec_steps().count();
        let mut built = BuiltImage {
            image: spec.base().to_string(),
            layers: Vec::new(),
            snapshot: Snapshot::default(),
            masked_failures: 0,
        };

        let mut number = 0;
        for step in spec.steps() {
            built.snapshot.apply(step);
            let Step::Exec(exec) = step else {
                continue;
            };
            number += 1;
            let index = StepIndex { number, total };

            match self.run_step(&built, exec, index, diagnostics).await {
                Ok((layer, masked)) => {
                    if masked {
                        built.masked_failures += 1;
                    }
                    built.image = layer.to_string();
                    built.layers.push(layer);
                }
                Err(err) => {
                    self.discard_layers(&built, diagnostics).await;
                    return Err(err);
                }
            }
        }

        if let Some(tag) = &self.options.tag {
            let image = ImageId::new(built.image.clone());
            self.runtime
                .tag_image(&image, tag)
                .await
                .map_err(|source| PipelineError::Commit {
                    step: number,
                    source,
                })?;
            tracing::info!(image = %image.short(), tag = %tag, "tagged final image");
        }

        self.prune_previous(&built, diagnostics).await;
        Ok(built)
    }

    async fn ensure_base(&self, base: &ImageRef) -> Result<(), PipelineError> {
        let name = base.to_string();
        let unavailable = |source| PipelineError::ImageUnavailable {
            image: name.clone(),
            source,
        };

        if self.runtime.image_exists(&name).await.map_err(unavailable)? {
            tracing::debug!(image = %name, "base image present");
            return Ok(());
        }

        self.emit(PipelineEvent::PullingImage(name.clone()));
        tracing::info!(image = %name, "pulling base image");
        self.runtime.pull_image(base).await.map_err(unavailable)
    }

    /// Run one command and commit the result. Returns the new layer and
    /// whether a failure was tolerated.
    async fn run_step(
        &self,
        built: &BuiltImage,
        exec: &ExecStep,
        index: StepIndex,
        diagnostics: &mut Diagnostics,
    ) -> Result<(ImageId, bool), PipelineError> {
        let command = exec.command_line();
        let (env, secrets) = resolve_env(&built.snapshot).await?;

        let config = ContainerConfig {
            image: built.image.clone(),
            env,
            labels: self.labels(Role::Step),
            volumes: volumes(&built.snapshot),
            command: Some(exec.args.iter().cloned().collect()),
            // Run the command directly, not through the image's entrypoint.
            entrypoint: Some(Vec::new()),
            working_dir: built.snapshot.workdir.clone(),
            user: built.snapshot.user.clone(),
            ..Default::default()
        };

        self.emit(PipelineEvent::StepStarted {
            step: index,
            command: command.clone(),
        });
        tracing::info!(step = index.number, total = index.total, %command, "running step");

        let id = self.runtime.create_container(&config).await?;

        let exit_code = match tokio::time::timeout(
            self.options.step_timeout,
            self.run_to_exit(&id, index, &secrets),
        )
        .await
        {
            Ok(Ok(code)) => code,
            Ok(Err(err)) => {
                self.remove_quietly(&id, diagnostics).await;
                return Err(err);
            }
            Err(_) => {
                tracing::warn!(step = index.number, %command, "step timed out");
                let _ = self
                    .runtime
                    .stop_container(&id, self.options.stop_timeout)
                    .await;
                self.remove_quietly(&id, diagnostics).await;
                return Err(PipelineError::StepTimedOut {
                    step: index.number,
                    command,
                    timeout: self.options.step_timeout,
                });
            }
        };

        self.emit(PipelineEvent::StepFinished {
            step: index,
            exit_code,
        });

        let mut masked = false;
        if exit_code != 0 {
            match &exec.on_failure {
                FailurePolicy::Halt => {
                    self.remove_quietly(&id, diagnostics).await;
                    return Err(PipelineError::StepFailed {
                        step: index.number,
                        command,
                        exit_code,
                    });
                }
                FailurePolicy::Tolerate { fallback } => {
                    masked = true;
                    self.emit(PipelineEvent::FailureMasked {
                        step: index,
                        exit_code,
                        fallback: fallback.clone(),
                    });
                    diagnostics.warn(Warning::masked_failure(format!(
                        "step {} ({}) exited with {}: {}",
                        index.number, command, exit_code, fallback
                    )));
                }
            }
        }

        let layer = self.commit(&id, exec, index, &built.snapshot).await;
        self.remove_quietly(&id, diagnostics).await;
        let layer = layer?;

        self.emit(PipelineEvent::LayerCommitted {
            step: index,
            image: layer.clone(),
        });
        Ok((layer, masked))
    }

    async fn run_to_exit(
        &self,
        id: &ContainerId,
        index: StepIndex,
        secrets: &[Plaintext],
    ) -> Result<i64, PipelineError> {
        self.runtime.start_container(id).await?;

        let mut logs = self
            .runtime
            .container_logs(id, &LogOptions::follow_all())
            .await?;
        while let Some(line) = logs.next().await {
            let line = line?;
            let content = secrets
                .iter()
                .fold(line.content, |text, secret| secret.redact(&text));
            tracing::debug!(step = index.number, "{}", content.trim_end());
            self.emit(PipelineEvent::Output {
                step: index,
                line: content,
            });
        }

        Ok(self.runtime.wait_container(id).await?)
    }

    async fn commit(
        &self,
        id: &ContainerId,
        exec: &ExecStep,
        index: StepIndex,
        snapshot: &Snapshot,
    ) -> Result<ImageId, PipelineError> {
        let mut labels = self.labels(Role::Step);
        labels.insert(LABEL_BUILT_AT.to_string(), chrono::Utc::now().to_rfc3339());

        let (repo, tag) = if self.options.keep_layers {
            (
                Some(format!("kagglelab-{}-layers", self.options.project)),
                Some(format!("step-{}", index.number)),
            )
        } else {
            (None, None)
        };

        let config = CommitConfig {
            repo,
            tag,
            comment: Some(exec.command_line()),
            labels,
            masked_env: snapshot.secret_env.iter().map(|(k, _)| k.clone()).collect(),
        };

        let layer = self
            .runtime
            .commit_container(id, &config)
            .await
            .map_err(|source| PipelineError::Commit {
                step: index.number,
                source,
            })?;
        tracing::debug!(step = index.number, layer = %layer.short(), "committed layer");
        Ok(layer)
    }

    /// Remove what a failed build left behind. Removing the newest untagged
    /// layer also removes its untagged parents.
    async fn discard_layers(&self, built: &BuiltImage, diagnostics: &mut Diagnostics) {
        if self.options.keep_layers {
            return;
        }
        let Some(last) = built.layers.last() else {
            return;
        };
        if let Err(e) = self.runtime.remove_image(last.as_str(), false).await {
            diagnostics.warn(Warning::layer_cleanup(format!(
                "could not remove layer {}: {}",
                last.short(),
                e
            )));
        }
    }

    /// Remove untagged images left by earlier builds of this project.
    /// Removing an image also removes its untagged parents. Images still used
    /// by a container are kept.
    async fn prune_previous(&self, built: &BuiltImage, diagnostics: &mut Diagnostics) {
        let labels = HashMap::from([
            (LABEL_MANAGED.to_string(), "true".to_string()),
            (LABEL_PROJECT.to_string(), self.options.project.clone()),
        ]);
        let images = match self.runtime.list_images(&labels).await {
            Ok(images) => images,
            Err(e) => {
                diagnostics.warn(Warning::layer_cleanup(format!(
                    "could not list previous layers: {}",
                    e
                )));
                return;
            }
        };

        for image in images {
            if !image.tags.is_empty() || built.layers.contains(&image.id) {
                continue;
            }
            match self.runtime.remove_image(image.id.as_str(), false).await {
                Ok(()) => {
                    tracing::debug!(image = %image.id.short(), "removed previous build");
                }
                Err(ImageError::InUse(_) | ImageError::NotFound(_)) => {
                    tracing::debug!(image = %image.id.short(), "previous build still in use");
                }
                Err(e) => diagnostics.warn(Warning::layer_cleanup(format!(
                    "could not remove layer {}: {}",
                    image.id.short(),
                    e
                ))),
            }
        }
    }

    async fn remove_quietly(&self, id: &ContainerId, diagnostics: &mut Diagnostics) {
        if let Err(e) = self.runtime.remove_container(id, true).await {
            diagnostics.warn(Warning::container_cleanup(format!(
                "could not remove container {}: {}",
                id.short(),
                e
            )));
        }
    }

    // -------------------------------------------------------------------------
    // Terminal operations
    // -------------------------------------------------------------------------

    /// Build the service's container and start the notebook in it.
    pub async fn start_service(
        &self,
        service: &ServiceSpec,
        options: &ServiceOptions,
        diagnostics: &mut Diagnostics,
    ) -> Result<ServiceHandle, PipelineError> {
        let built = self.build(service.container(), diagnostics).await?;
        let name = self.container_name(Role::Service);

        self.replace_stopped(Role::Service, &name, diagnostics).await?;

        let (env, _) = resolve_env(&built.snapshot).await?;
        let config = ContainerConfig {
            name: Some(name.clone()),
            image: built.image.clone(),
            env,
            labels: self.labels(Role::Service),
            ports: vec![PortMapping {
                host_port: Some(options.host_port),
                container_port: service.port(),
                protocol: Protocol::Tcp,
                host_ip: Some(options.host_ip.to_string()),
            }],
            volumes: volumes(&built.snapshot),
            command: Some(service.command().iter().cloned().collect()),
            entrypoint: built.snapshot.entrypoint.clone(),
            working_dir: built.snapshot.workdir.clone(),
            user: built.snapshot.user.clone(),
            ..Default::default()
        };

        tracing::info!(
            container = %name,
            command = %service.redacted_command(),
            "starting service"
        );
        let id = self.runtime.create_container(&config).await?;
        if let Err(e) = self.runtime.start_container(&id).await {
            self.remove_quietly(&id, diagnostics).await;
            return Err(PipelineError::Service(e.to_string()));
        }

        let info = self.runtime.inspect_container(&id).await?;
        if info.state != ContainerState::Running {
            self.remove_quietly(&id, diagnostics).await;
            return Err(PipelineError::Service(format!(
                "{} exited immediately with code {}",
                name,
                info.exit_code.unwrap_or(-1)
            )));
        }

        Ok(ServiceHandle {
            container: id,
            url: format!(
                "http://{}/lab",
                SocketAddr::new(options.host_ip, options.host_port)
            ),
            port: options.host_port,
            name,
        })
    }

    /// Build `spec` and start its interactive entrypoint with a TTY.
    pub async fn open_shell(
        &self,
        spec: &ContainerSpec,
        diagnostics: &mut Diagnostics,
    ) -> Result<ShellHandle, PipelineError> {
        if !spec.is_interactive() {
            return Err(PipelineError::InvalidArgument(
                "container is not interactive; use Pipeline::debug".to_string(),
            ));
        }

        let built = self.build(spec, diagnostics).await?;
        let name = self.container_name(Role::Shell);

        // A previous shell may still be attached; it is replaced either way.
        for stale in self.project_containers(Some(Role::Shell)).await? {
            let _ = self
                .runtime
                .stop_container(&stale.id, self.options.stop_timeout)
                .await;
            self.remove_quietly(&stale.id, diagnostics).await;
        }

        let (env, _) = resolve_env(&built.snapshot).await?;
        let config = ContainerConfig {
            name: Some(name.clone()),
            image: built.image.clone(),
            env,
            labels: self.labels(Role::Shell),
            volumes: volumes(&built.snapshot),
            entrypoint: built.snapshot.entrypoint.clone(),
            working_dir: built.snapshot.workdir.clone(),
            user: built.snapshot.user.clone(),
            tty: true,
            open_stdin: true,
            ..Default::default()
        };

        let id = self.runtime.create_container(&config).await?;
        self.runtime.start_container(&id).await?;
        tracing::info!(container = %name, "shell started");

        Ok(ShellHandle {
            container: id,
            name,
        })
    }

    /// Stop and remove this project's service and shell containers. Returns
    /// their names.
    pub async fn stop_services(
        &self,
        diagnostics: &mut Diagnostics,
    ) -> Result<Vec<String>, PipelineError> {
        let mut stopped = Vec::new();
        for container in self.project_containers(None).await? {
            if container.state == "running" {
                let _ = self
                    .runtime
                    .stop_container(&container.id, self.options.stop_timeout)
                    .await;
            }
            self.remove_quietly(&container.id, diagnostics).await;
            tracing::info!(container = %container.name, "removed");
            stopped.push(container.name);
        }
        Ok(stopped)
    }

    async fn project_containers(
        &self,
        role: Option<Role>,
    ) -> Result<Vec<ContainerSummary>, PipelineError> {
        let mut labels = HashMap::from([
            (LABEL_MANAGED.to_string(), "true".to_string()),
            (LABEL_PROJECT.to_string(), self.options.project.clone()),
        ]);
        if let Some(role) = role {
            labels.insert(LABEL_ROLE.to_string(), role.as_str().to_string());
        }
        let filters = ContainerFilters { labels, all: true };
        Ok(self.runtime.list_containers(&filters).await?)
    }

    /// Remove a stopped container holding `name`; refuse if it's running.
    async fn replace_stopped(
        &self,
        role: Role,
        name: &str,
        diagnostics: &mut Diagnostics,
    ) -> Result<(), PipelineError> {
        for existing in self.project_containers(Some(role)).await? {
            if existing.state == "running" {
                return Err(PipelineError::Service(format!(
                    "{} is already running; stop it first",
                    name
                )));
            }
            self.remove_quietly(&existing.id, diagnostics).await;
        }
        Ok(())
    }
}

/// Plain and secret environment, with the secrets' plaintexts for redaction.
async fn resolve_env(
    snapshot: &Snapshot,
) -> Result<(Vec<(String, String)>, Vec<Plaintext>), PipelineError> {
    let mut env = snapshot.env.clone();
    let mut secrets = Vec::with_capacity(snapshot.secret_env.len());
    for (key, secret) in &snapshot.secret_env {
        let value = secret.plaintext().await?;
        env.push((key.clone(), value.expose().to_string()));
        secrets.push(value);
    }
    Ok((env, secrets))
}

fn volumes(snapshot: &Snapshot) -> Vec<VolumeMount> {
    snapshot
        .mounts
        .iter()
        .map(|m| VolumeMount {
            source: m.source.to_string_lossy().into_owned(),
            target: m.target.clone(),
            read_only: m.read_only,
        })
        .collect()
}
