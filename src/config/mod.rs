// ABOUTME: Configuration types and parsing for kagglelab.yml.
// ABOUTME: Maps configured steps one-to-one onto pipeline operations.

mod init;
mod secret_ref;

pub use init::init_config;
pub use secret_ref::SecretRef;

use crate::error::{Error, Result};
use crate::pipeline::{
    ExecutorOptions, HostDir, HostFile, Pipeline, PreprocessSources, ScriptFailure,
    ScriptOptions, Secret, ServiceOptions,
};
use crate::runtime::RuntimeConfig;
use crate::types::{ImageRef, TaskName};
use serde::Deserialize;
use std::net::IpAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const CONFIG_FILENAME: &str = "kagglelab.yml";
pub const CONFIG_FILENAME_ALT: &str = "kagglelab.yaml";
pub const CONFIG_FILENAME_DIR: &str = ".kagglelab/config.yml";

/// Project name used when none can be derived.
pub const FALLBACK_PROJECT: &str = "lab";

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub project: Option<String>,

    #[serde(default)]
    pub image: Option<ImageRef>,

    /// Directory mounted at the work root; defaults to the project root.
    #[serde(default)]
    pub working_dir: Option<PathBuf>,

    #[serde(flatten)]
    pub runtime: RuntimeConfig,

    /// Tag for the final image.
    #[serde(default)]
    pub tag: Option<ImageRef>,

    #[serde(default = "default_step_timeout", with = "humantime_serde")]
    pub step_timeout: Duration,

    #[serde(default)]
    pub keep_layers: bool,

    #[serde(default)]
    pub script_failure: ScriptFailure,

    #[serde(default)]
    pub steps: Vec<StepConfig>,

    #[serde(default)]
    pub service: Option<ServiceConfig>,

    /// Directory relative paths are resolved against.
    #[serde(skip)]
    root: PathBuf,
}

/// One pipeline operation. Keys match the operation's parameters.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepConfig {
    ImportData {
        api_keys: PathBuf,
        competition: String,
    },
    Preprocess {
        name: TaskName,
        task_dir: PathBuf,
        #[serde(default)]
        requirements: Option<PathBuf>,
        #[serde(default)]
        entry_script: Option<PathBuf>,
    },
    PreprocessScripted {
        name: TaskName,
        script: PathBuf,
        token: SecretRef,
    },
}

impl StepConfig {
    pub fn operation(&self) -> &'static str {
        match self {
            StepConfig::ImportData { .. } => "import_data",
            StepConfig::Preprocess { .. } => "preprocess",
            StepConfig::PreprocessScripted { .. } => "preprocess_scripted",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ServiceConfig {
    #[serde(default = "default_service_token")]
    pub token: SecretRef,

    #[serde(default = "default_host_port")]
    pub host_port: u16,

    #[serde(default = "default_host_ip")]
    pub host_ip: IpAddr,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            token: default_service_token(),
            host_port: default_host_port(),
            host_ip: default_host_ip(),
        }
    }
}

fn default_step_timeout() -> Duration {
    Duration::from_secs(60 * 60)
}

fn default_service_token() -> SecretRef {
    SecretRef::Env {
        env: crate::pipeline::NOTEBOOK_TOKEN_ENV.to_string(),
    }
}

fn default_host_port() -> u16 {
    crate::pipeline::paths::NOTEBOOK_PORT
}

fn default_host_ip() -> IpAddr {
    IpAddr::from([127, 0, 0, 1])
}

impl Config {
    /// Parse YAML whose relative paths are resolved against `root`.
    pub fn from_yaml(yaml: &str, root: &Path) -> Result<Self> {
        let mut config: Config = serde_yaml::from_str(yaml)?;
        config.root = root.to_path_buf();
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content, &project_root(path))
    }

    pub fn discover(dir: &Path) -> Result<Self> {
        let candidates = [
            dir.join(CONFIG_FILENAME),
            dir.join(CONFIG_FILENAME_ALT),
            dir.join(CONFIG_FILENAME_DIR),
        ];

        for path in &candidates {
            if path.exists() {
                tracing::debug!(path = %path.display(), "loading configuration");
                return Self::load(path);
            }
        }

        Err(Error::ConfigNotFound(dir.to_path_buf()))
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Configured project name, or the root directory's name, reduced to
    /// characters that are valid in container and image names.
    pub fn project_name(&self) -> String {
        let raw = self
            .project
            .clone()
            .or_else(|| {
                self.root
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
            })
            .unwrap_or_default();
        sanitize_project(&raw)
    }

    pub fn resolve(&self, path: &Path) -> PathBuf {
        expand_path(path, &self.root)
    }

    /// Build the pipeline described by `steps`, without touching an engine.
    pub fn to_pipeline(&self) -> Result<Pipeline> {
        let working_dir = match &self.working_dir {
            Some(dir) => HostDir::new(self.resolve(dir))?,
            None => HostDir::new(&self.root)?,
        };

        let mut pipeline = Pipeline::new(working_dir);
        if let Some(image) = &self.image {
            pipeline = pipeline.with_base_image(image.clone());
        }

        let script_options = ScriptOptions {
            on_failure: self.script_failure,
            ..Default::default()
        };

        for step in &self.steps {
            pipeline = match step {
                StepConfig::ImportData {
                    api_keys,
                    competition,
                } => pipeline.import_data(&HostFile::new(self.resolve(api_keys))?, competition)?,
                StepConfig::Preprocess {
                    name,
                    task_dir,
                    requirements,
                    entry_script,
                } => {
                    let sources = PreprocessSources {
                        requirements: self.host_file(requirements.as_deref())?,
                        entry_script: self.host_file(entry_script.as_deref())?,
                    };
                    pipeline.preprocess_with(name, &HostDir::new(self.resolve(task_dir))?, &sources)
                }
                StepConfig::PreprocessScripted {
                    name,
                    script,
                    token,
                } => pipeline.preprocess_scripted_with(
                    name,
                    &HostFile::new(self.resolve(script))?,
                    &token.to_secret(&self.root),
                    &script_options,
                ),
            };
        }

        Ok(pipeline)
    }

    fn host_file(&self, path: Option<&Path>) -> Result<Option<HostFile>> {
        path.map(|p| HostFile::new(self.resolve(p)))
            .transpose()
            .map_err(Error::from)
    }

    pub fn executor_options(&self) -> ExecutorOptions {
        ExecutorOptions {
            step_timeout: self.step_timeout,
            keep_layers: self.keep_layers,
            tag: self.tag.clone(),
            ..ExecutorOptions::new(self.project_name())
        }
    }

    /// Token and host binding for `serve`. Without a `service` section the
    /// token is read from `JUPYTER_TOKEN`.
    pub fn service_options(&self, port_override: Option<u16>) -> (Secret, ServiceOptions) {
        let service = self.service.clone().unwrap_or_default();
        let options = ServiceOptions {
            host_ip: service.host_ip,
            host_port: port_override.unwrap_or(service.host_port),
        };
        (service.token.to_secret(&self.root), options)
    }
}

/// Directory a config file's relative paths refer to. Files inside
/// `.kagglelab/` belong to the directory containing it.
fn project_root(config_path: &Path) -> PathBuf {
    let parent = config_path.parent().unwrap_or(Path::new("."));
    let parent = if parent.file_name().is_some_and(|n| n == ".kagglelab") {
        parent.parent().unwrap_or(parent)
    } else {
        parent
    };
    if parent.as_os_str().is_empty() {
        PathBuf::from(".")
    } else {
        parent.to_path_buf()
    }
}

/// Expand a leading `~` to `$HOME` and anchor relative paths at `base`.
pub(crate) fn expand_path(path: &Path, base: &Path) -> PathBuf {
    let expanded = match path.strip_prefix("~") {
        Ok(rest) => match std::env::var_os("HOME") {
            Some(home) => PathBuf::from(home).join(rest),
            None => path.to_path_buf(),
        },
        Err(_) => path.to_path_buf(),
    };
    if expanded.is_absolute() {
        expanded
    } else {
        base.join(expanded)
    }
}

fn sanitize_project(raw: &str) -> String {
    let cleaned: String = raw
        .to_ascii_lowercase()
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.') {
                c
            } else {
                '-'
            }
        })
        .collect();
    let trimmed = cleaned.trim_start_matches(['.', '-']);
    let truncated: String = trimmed.chars().take(40).collect();

    TaskName::new(&truncated)
        .map(|n| n.to_string())
        .unwrap_or_else(|_| FALLBACK_PROJECT.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minimal_config_uses_defaults() {
        let config = Config::from_yaml("steps: []", Path::new("/work/titanic")).unwrap();
        assert_eq!(config.project_name(), "titanic");
        assert_eq!(config.step_timeout, Duration::from_secs(3600));
        assert!(!config.keep_layers);
        assert_eq!(config.script_failure, ScriptFailure::Tolerate);
        assert!(config.image.is_none());
        assert_eq!(config.runtime, RuntimeConfig::default());
    }

    #[test]
    fn parses_steps_as_single_key_maps() {
        let yaml = r#"
project: Titanic Survival
runtime: podman
step_timeout: 90m
script_failure: halt
steps:
  - import_data: { api_keys: ~/.kaggle/kaggle.json, competition: titanic }
  - preprocess: { name: features, task_dir: ./features }
  - preprocess_scripted:
      name: report
      script: report.R
      token: { env: MOTHERDUCK_TOKEN }
"#;
        let config = Config::from_yaml(yaml, Path::new("/p")).unwrap();
        assert_eq!(config.project_name(), "titanic-survival");
        assert_eq!(config.runtime.runtime, Some(crate::runtime::RuntimeType::Podman));
        assert_eq!(config.step_timeout, Duration::from_secs(90 * 60));
        assert_eq!(config.script_failure, ScriptFailure::Halt);

        let ops: Vec<_> = config.steps.iter().map(StepConfig::operation).collect();
        assert_eq!(ops, vec!["import_data", "preprocess", "preprocess_scripted"]);
    }

    #[test]
    fn unknown_step_is_rejected() {
        let err = Config::from_yaml("steps:\n  - train: {}\n", Path::new("/p")).unwrap_err();
        assert!(matches!(err, Error::Yaml(_)));
    }

    #[test]
    fn invalid_task_name_is_rejected() {
        let yaml = "steps:\n  - preprocess: { name: ../up, task_dir: . }\n";
        assert!(Config::from_yaml(yaml, Path::new("/p")).is_err());
    }

    #[test]
    fn relative_paths_resolve_against_root() {
        assert_eq!(
            expand_path(Path::new("./data/x.csv"), Path::new("/p")),
            PathBuf::from("/p/./data/x.csv")
        );
        assert_eq!(
            expand_path(Path::new("/abs/file"), Path::new("/p")),
            PathBuf::from("/abs/file")
        );
    }

    #[test]
    fn tilde_expands_to_home() {
        temp_env::with_var("HOME", Some("/home/tester"), || {
            assert_eq!(
                expand_path(Path::new("~/.kaggle/kaggle.json"), Path::new("/p")),
                PathBuf::from("/home/tester/.kaggle/kaggle.json")
            );
        });
    }

    #[test]
    fn config_in_dot_dir_belongs_to_parent() {
        assert_eq!(
            project_root(Path::new("/p/.kagglelab/config.yml")),
            PathBuf::from("/p")
        );
        assert_eq!(
            project_root(Path::new("/p/kagglelab.yml")),
            PathBuf::from("/p")
        );
        assert_eq!(project_root(Path::new("kagglelab.yml")), PathBuf::from("."));
    }

    #[test]
    fn project_name_falls_back_when_unusable() {
        assert_eq!(sanitize_project("..."), FALLBACK_PROJECT);
        assert_eq!(sanitize_project(""), FALLBACK_PROJECT);
        assert_eq!(sanitize_project("My Data_Set"), "my-data_set");
    }

    #[test]
    fn service_defaults_and_port_override() {
        let config = Config::from_yaml("{}", Path::new("/p")).unwrap();
        let (secret, options) = config.service_options(Some(9999));
        assert_eq!(secret.to_string(), "env:JUPYTER_TOKEN");
        assert_eq!(options.host_port, 9999);
        assert!(options.host_ip.is_loopback());
    }

    #[test]
    fn to_pipeline_maps_steps_in_order() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("kaggle.json"), "{}").unwrap();
        std::fs::create_dir(dir.path().join("features")).unwrap();
        let yaml = r#"
steps:
  - import_data: { api_keys: kaggle.json, competition: titanic }
  - preprocess: { name: features, task_dir: features }
"#;
        let config = Config::from_yaml(yaml, dir.path()).unwrap();
        let spec = config.to_pipeline().unwrap().into_spec();
        let commands: Vec<_> = spec.exec_steps().map(|e| e.command_line()).collect();
        assert_eq!(commands.len(), 5);
        assert_eq!(commands[0], "pip3 install kaggle");
        assert_eq!(commands[4], "python3 /home/jovyan/work/features/main.py");
    }

    #[test]
    fn to_pipeline_reports_missing_files() {
        let dir = tempfile::tempdir().unwrap();
        let yaml = "steps:\n  - import_data: { api_keys: nope.json, competition: titanic }\n";
        let config = Config::from_yaml(yaml, dir.path()).unwrap();
        assert!(matches!(config.to_pipeline(), Err(Error::Handle(_))));
    }
}
