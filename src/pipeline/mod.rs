// ABOUTME: Chainable description of a data-science container and its execution.
// ABOUTME: Builder, step model, secrets, host handles, and the engine executor.

mod builder;
mod error;
pub mod events;
mod executor;
mod handles;
pub mod paths;
mod secret;
mod service;
mod spec;
mod step;

pub use builder::{
    ANALYTICS_CLI_URL, ANALYTICS_TOKEN_ENV, NOTEBOOK_TOKEN_ENV, Pipeline, PreprocessSources,
    ScriptFailure, ScriptOptions,
};
pub use error::{PipelineError, PipelineErrorKind};
pub use events::{PipelineEvent, StepIndex};
pub use executor::{
    BuiltImage, Executor, ExecutorOptions, LABEL_BUILT_AT, LABEL_MANAGED, LABEL_PROJECT,
    LABEL_ROLE, Role,
};
pub use handles::{HandleError, HostDir, HostFile};
pub use secret::{Plaintext, Secret, SecretError, SecretSource};
pub use service::{ServiceHandle, ServiceOptions, ServiceSpec, ShellHandle};
pub use spec::{ContainerSpec, MountPoint, Snapshot};
pub use step::{ExecStep, FailurePolicy, Step};
