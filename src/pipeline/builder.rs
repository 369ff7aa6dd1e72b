// ABOUTME: The chainable pipeline configuration object.
// ABOUTME: Each call consumes the pipeline and returns a new one with more steps.

use super::error::PipelineError;
use super::handles::{HostDir, HostFile};
use super::paths;
use super::secret::{Secret, SecretError};
use super::service::ServiceSpec;
use super::spec::ContainerSpec;
use super::step::{ExecStep, FailurePolicy, Step};
use crate::types::{ImageRef, TaskName};
use nonempty::NonEmpty;

/// Release of the DuckDB CLI installed by [`Pipeline::preprocess_scripted`].
pub const ANALYTICS_CLI_URL: &str =
    "https://github.com/duckdb/duckdb/releases/download/v1.1.3/duckdb_cli-linux-amd64.zip";

/// Environment variable carrying the scripted step's credential.
pub const ANALYTICS_TOKEN_ENV: &str = "MOTHERDUCK_TOKEN";

/// Environment variable carrying the notebook token.
pub const NOTEBOOK_TOKEN_ENV: &str = "JUPYTER_TOKEN";

/// Optional separate files for [`Pipeline::preprocess_with`].
#[derive(Debug, Clone, Default)]
pub struct PreprocessSources {
    /// Dependency manifest mounted in place of `requirements.txt`.
    pub requirements: Option<HostFile>,
    /// Entry script mounted in place of `main.py`.
    pub entry_script: Option<HostFile>,
}

/// Settings for [`Pipeline::preprocess_scripted_with`].
#[derive(Debug, Clone)]
pub struct ScriptOptions {
    pub on_failure: ScriptFailure,
    pub analytics_cli_url: String,
}

impl Default for ScriptOptions {
    fn default() -> Self {
        Self {
            on_failure: ScriptFailure::Tolerate,
            analytics_cli_url: ANALYTICS_CLI_URL.to_string(),
        }
    }
}

/// How a failing analysis script is treated.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScriptFailure {
    /// Report a fallback message and continue.
    #[default]
    Tolerate,
    /// Stop the pipeline like any other step.
    Halt,
}

/// Pipeline state: one container description and one working directory.
///
/// Every method takes `self` by value and hands back a new pipeline, so a
/// value can't be observed half-way through a mutation; clone it to fork.
#[derive(Debug, Clone)]
pub struct Pipeline {
    container: ContainerSpec,
    working_dir: HostDir,
}

impl Pipeline {
    /// Start from the default notebook image.
    pub fn new(working_dir: HostDir) -> Self {
        Self {
            container: ContainerSpec::new(ImageRef::default()),
            working_dir,
        }
    }

    pub fn container(&self) -> &ContainerSpec {
        &self.container
    }

    pub fn working_dir(&self) -> &HostDir {
        &self.working_dir
    }

    /// Finish without a terminal operation.
    pub fn into_spec(self) -> ContainerSpec {
        self.container
    }

    fn push(self, step: Step) -> Self {
        Self {
            container: self.container.push(step),
            working_dir: self.working_dir,
        }
    }

    // -------------------------------------------------------------------------
    // Primitives
    // -------------------------------------------------------------------------

    pub fn with_base_image(self, image: ImageRef) -> Self {
        Self {
            container: self.container.with_base(image),
            working_dir: self.working_dir,
        }
    }

    pub fn with_mounted_directory(self, target: impl Into<String>, source: &HostDir) -> Self {
        self.push(Step::MountDirectory {
            source: source.clone(),
            target: target.into(),
        })
    }

    pub fn with_mounted_file(self, target: impl Into<String>, source: &HostFile) -> Self {
        self.push(Step::MountFile {
            source: source.clone(),
            target: target.into(),
        })
    }

    pub fn with_workdir(self, dir: impl Into<String>) -> Self {
        self.push(Step::Workdir(dir.into()))
    }

    pub fn with_env(self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.push(Step::Env {
            key: key.into(),
            value: value.into(),
        })
    }

    pub fn with_secret_env(self, key: impl Into<String>, secret: &Secret) -> Self {
        self.push(Step::SecretEnv {
            key: key.into(),
            secret: secret.clone(),
        })
    }

    pub fn with_user(self, user: impl Into<String>) -> Self {
        self.push(Step::User(user.into()))
    }

    pub fn with_exec(self, args: NonEmpty<String>) -> Self {
        self.push(Step::Exec(ExecStep::new(args)))
    }

    /// Run a command whose non-zero exit is reported as `fallback` instead of
    /// stopping the pipeline.
    pub fn with_exec_tolerating_failure(
        self,
        args: NonEmpty<String>,
        fallback: impl Into<String>,
    ) -> Self {
        self.push(Step::Exec(ExecStep {
            args,
            on_failure: FailurePolicy::Tolerate {
                fallback: fallback.into(),
            },
        }))
    }

    pub fn with_exposed_port(self, port: u16) -> Self {
        self.push(Step::ExposePort(port))
    }

    pub fn with_entrypoint(self, args: Vec<String>) -> Self {
        self.push(Step::Entrypoint(args))
    }

    // -------------------------------------------------------------------------
    // Operations
    // -------------------------------------------------------------------------

    /// Mount the working directory and Kaggle credentials, then download and
    /// unpack the competition's dataset.
    pub fn import_data(self, api_keys: &HostFile, competition: &str) -> Result<Self, PipelineError> {
        validate_competition(competition)?;

        let working_dir = self.working_dir.clone();
        Ok(self
            .with_mounted_directory(paths::WORK_ROOT, &working_dir)
            .with_mounted_file(paths::KAGGLE_CREDENTIALS, api_keys)
            .with_exec(cmd(["pip3", "install", "kaggle"]))
            .with_exec(cmd([
                "kaggle",
                "competitions",
                "download",
                "-c",
                competition,
            ]))
            .with_exec(cmd(["unzip", &format!("{}.zip", competition)])))
    }

    /// Mount `task_dir` under the work root, install its `requirements.txt`
    /// and run its `main.py` from there.
    pub fn preprocess(self, name: &TaskName, task_dir: &HostDir) -> Self {
        self.preprocess_with(name, task_dir, &PreprocessSources::default())
    }

    /// Like [`preprocess`](Self::preprocess), with the manifest and entry
    /// script optionally taken from separate files.
    pub fn preprocess_with(
        self,
        name: &TaskName,
        task_dir: &HostDir,
        sources: &PreprocessSources,
    ) -> Self {
        let task_path = paths::task_dir(name);
        let mut pipeline = self.with_mounted_directory(task_path.clone(), task_dir);

        let requirements = match &sources.requirements {
            Some(file) => {
                let target = paths::process_file(name, paths::REQUIREMENTS_FILE);
                pipeline = pipeline.with_mounted_file(target.clone(), file);
                target
            }
            None => format!("{}/{}", task_path, paths::REQUIREMENTS_FILE),
        };

        let entry_script = match &sources.entry_script {
            Some(file) => {
                let target = paths::process_file(name, paths::ENTRY_SCRIPT);
                pipeline = pipeline.with_mounted_file(target.clone(), file);
                target
            }
            None => format!("{}/{}", task_path, paths::ENTRY_SCRIPT),
        };

        pipeline
            .with_workdir(task_path)
            .with_exec(cmd(["pip3", "install", "-r", &requirements]))
            .with_exec(cmd(["python3", &entry_script]))
    }

    /// Run an R analysis script with the DuckDB CLI available and `token`
    /// exported as [`ANALYTICS_TOKEN_ENV`]. Script failures are tolerated.
    pub fn preprocess_scripted(self, name: &TaskName, script: &HostFile, token: &Secret) -> Self {
        self.preprocess_scripted_with(name, script, token, &ScriptOptions::default())
    }

    pub fn preprocess_scripted_with(
        self,
        name: &TaskName,
        script: &HostFile,
        token: &Secret,
        options: &ScriptOptions,
    ) -> Self {
        let script_path = paths::script_file(name);
        let run = cmd(["Rscript", &script_path]);

        let pipeline = self
            .with_mounted_file(script_path.clone(), script)
            .with_exec(cmd([
                "mamba",
                "install",
                "--yes",
                "--quiet",
                "-c",
                "conda-forge",
                "r-base",
            ]))
            .with_exec(cmd([
                "wget",
                "-q",
                "-O",
                paths::ANALYTICS_CLI_ARCHIVE,
                &options.analytics_cli_url,
            ]))
            .with_exec(cmd([
                "unzip",
                "-o",
                paths::ANALYTICS_CLI_ARCHIVE,
                "-d",
                paths::LOCAL_BIN,
            ]))
            .with_secret_env(ANALYTICS_TOKEN_ENV, token);

        match options.on_failure {
            ScriptFailure::Tolerate => pipeline.with_exec_tolerating_failure(
                run,
                format!("script {} failed; continuing without its output", name),
            ),
            ScriptFailure::Halt => pipeline.with_exec(run),
        }
    }

    // -------------------------------------------------------------------------
    // Terminal operations
    // -------------------------------------------------------------------------

    /// Configure the notebook server. Awaits the token's plaintext, which is
    /// passed both as a startup argument and as [`NOTEBOOK_TOKEN_ENV`].
    pub async fn start_service(self, secret: &Secret) -> Result<ServiceSpec, SecretError> {
        let token = secret.plaintext().await?;

        let container = self
            .with_exposed_port(paths::NOTEBOOK_PORT)
            .with_entrypoint(
                ["tini", "-g", "--", "start.sh"]
                    .into_iter()
                    .map(str::to_string)
                    .collect(),
            )
            .with_secret_env(NOTEBOOK_TOKEN_ENV, &Secret::from_plaintext(token.clone()))
            .into_spec();

        let command = cmd([
            "start-notebook.py",
            &format!("--IdentityProvider.token={}", token.expose()),
        ]);

        Ok(ServiceSpec::new(container, command, paths::NOTEBOOK_PORT, token))
    }

    /// The container with its entrypoint replaced by an interactive shell.
    pub fn debug(self) -> ContainerSpec {
        self.with_entrypoint(vec![paths::SHELL.to_string()])
            .into_spec()
            .interactive()
    }
}

fn cmd<'a>(args: impl IntoIterator<Item = &'a str>) -> NonEmpty<String> {
    let mut iter = args.into_iter().map(str::to_string);
    let head = iter.next().unwrap_or_default();
    NonEmpty::from((head, iter.collect()))
}

fn validate_competition(competition: &str) -> Result<(), PipelineError> {
    if competition.is_empty() {
        return Err(PipelineError::InvalidArgument(
            "competition cannot be empty".to_string(),
        ));
    }
    if let Some(c) = competition
        .chars()
        .find(|c| !c.is_ascii_alphanumeric() && !matches!(c, '-' | '_'))
    {
        return Err(PipelineError::InvalidArgument(format!(
            "invalid character {:?} in competition {:?}",
            c, competition
        )));
    }
    Ok(())
}
