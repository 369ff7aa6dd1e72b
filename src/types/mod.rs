// ABOUTME: Type-safe identifiers and validated domain types.
// ABOUTME: Phantom-typed engine IDs, image references, and task names.

mod id;
mod image_ref;
mod task_name;

pub use id::{ContainerId, Id, ImageId};
pub use image_ref::{DEFAULT_BASE_IMAGE, ImageRef, ParseImageRefError};
pub use task_name::{TaskName, TaskNameError};
