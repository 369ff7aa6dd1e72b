// ABOUTME: Composable capability traits for container engines.
// ABOUTME: Defines ImageOps, ContainerOps, LogOps, RuntimeInfo and FullRuntime.

mod container;
mod image;
mod logs;
mod runtime_info;
pub(crate) mod sealed;
mod shared_types;

pub use container::{ContainerError, ContainerFilters, ContainerOps, ContainerSummary};
pub use image::{ImageError, ImageOps, ImageSummary};
pub use logs::{LogError, LogLine, LogOps, LogOptions, LogStream, LogStreamBox};
pub use runtime_info::{RuntimeInfo, RuntimeInfoError};
pub use shared_types::*;

/// Everything the pipeline executor needs from an engine.
pub trait FullRuntime: ImageOps + ContainerOps + LogOps + RuntimeInfo {}

impl<T> FullRuntime for T where T: ImageOps + ContainerOps + LogOps + RuntimeInfo {}
