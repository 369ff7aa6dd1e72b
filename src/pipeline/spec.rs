// ABOUTME: Container description built by a pipeline, and its folded state.
// ABOUTME: Snapshot applies steps in order; later steps win for the same key or target.

use super::secret::Secret;
use super::step::{ExecStep, Step};
use crate::types::ImageRef;
use std::path::PathBuf;

/// Base image plus the ordered mutations applied on top of it.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ContainerSpec {
    base: ImageRef,
    steps: Vec<Step>,
    interactive: bool,
}

impl ContainerSpec {
    pub fn new(base: ImageRef) -> Self {
        Self {
            base,
            steps: Vec::new(),
            interactive: false,
        }
    }

    pub fn base(&self) -> &ImageRef {
        &self.base
    }

    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    /// Whether the container expects a TTY and open stdin.
    pub fn is_interactive(&self) -> bool {
        self.interactive
    }

    pub fn exec_steps(&self) -> impl Iterator<Item = &ExecStep> {
        self.steps.iter().filter_map(Step::as_exec)
    }

    /// State after every step has been applied.
    pub fn snapshot(&self) -> Snapshot {
        let mut snapshot = Snapshot::default();
        for step in &self.steps {
            snapshot.apply(step);
        }
        snapshot
    }

    pub(crate) fn with_base(mut self, base: ImageRef) -> Self {
        self.base = base;
        self
    }

    pub(crate) fn push(mut self, step: Step) -> Self {
        self.steps.push(step);
        self
    }

    pub(crate) fn interactive(mut self) -> Self {
        self.interactive = true;
        self
    }
}

/// A bind mount in effect at some point of the pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MountPoint {
    pub source: PathBuf,
    pub target: String,
    pub read_only: bool,
}

/// Container configuration accumulated by non-command steps.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Snapshot {
    pub mounts: Vec<MountPoint>,
    pub workdir: Option<String>,
    pub env: Vec<(String, String)>,
    pub secret_env: Vec<(String, Secret)>,
    pub user: Option<String>,
    pub entrypoint: Option<Vec<String>>,
    pub exposed_ports: Vec<u16>,
}

impl Snapshot {
    /// Apply one step. Run-command steps do not change configuration.
    pub fn apply(&mut self, step: &Step) {
        match step {
            Step::MountDirectory { source, target } => {
                self.mount(source.path().to_path_buf(), target, false)
            }
            Step::MountFile { source, target } => {
                self.mount(source.path().to_path_buf(), target, true)
            }
            Step::Workdir(dir) => self.workdir = Some(dir.clone()),
            Step::Env { key, value } => {
                self.secret_env.retain(|(k, _)| k != key);
                upsert(&mut self.env, key, value.clone());
            }
            Step::SecretEnv { key, secret } => {
                self.env.retain(|(k, _)| k != key);
                upsert(&mut self.secret_env, key, secret.clone());
            }
            Step::User(user) => self.user = Some(user.clone()),
            Step::Exec(_) => {}
            Step::ExposePort(port) => {
                if !self.exposed_ports.contains(port) {
                    self.exposed_ports.push(*port);
                }
            }
            Step::Entrypoint(args) => self.entrypoint = Some(args.clone()),
        }
    }

    fn mount(&mut self, source: PathBuf, target: &str, read_only: bool) {
        let point = MountPoint {
            source,
            target: target.to_string(),
            read_only,
        };
        match self.mounts.iter_mut().find(|m| m.target == target) {
            Some(existing) => *existing = point,
            None => self.mounts.push(point),
        }
    }
}

fn upsert<V>(entries: &mut Vec<(String, V)>, key: &str, value: V) {
    match entries.iter_mut().find(|(k, _)| k == key) {
        Some((_, existing)) => *existing = value,
        None => entries.push((key.to_string(), value)),
    }
}
