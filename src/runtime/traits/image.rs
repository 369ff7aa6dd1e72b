// ABOUTME: Image operations trait for container engines.
// ABOUTME: Pull base images, commit step layers, tag and remove images.

use super::sealed::Sealed;
use super::shared_types::CommitConfig;
use crate::types::{ContainerId, ImageId, ImageRef};
use async_trait::async_trait;
use std::collections::HashMap;

/// Image operations: pull, existence check, commit, tag, list, remove.
#[async_trait]
pub trait ImageOps: Sealed + Send + Sync {
    /// Pull an image from its registry.
    async fn pull_image(&self, reference: &ImageRef) -> Result<(), ImageError>;

    /// Check whether an image (by reference or ID) exists locally.
    async fn image_exists(&self, image: &str) -> Result<bool, ImageError>;

    /// Snapshot a stopped container's filesystem into a new image.
    async fn commit_container(
        &self,
        container: &ContainerId,
        config: &CommitConfig,
    ) -> Result<ImageId, ImageError>;

    /// Attach a repository tag to an existing image.
    async fn tag_image(&self, image: &ImageId, reference: &ImageRef) -> Result<(), ImageError>;

    /// Remove an image by ID or reference.
    async fn remove_image(&self, image: &str, force: bool) -> Result<(), ImageError>;

    /// List top-level images carrying every label in `labels`.
    async fn list_images(
        &self,
        labels: &HashMap<String, String>,
    ) -> Result<Vec<ImageSummary>, ImageError>;
}

/// A local image as reported by the engine.
#[derive(Debug, Clone)]
pub struct ImageSummary {
    pub id: ImageId,
    /// Repository tags; empty for untagged images.
    pub tags: Vec<String>,
    pub labels: HashMap<String, String>,
}

#[derive(Debug, thiserror::Error)]
pub enum ImageError {
    #[error("image not found: {0}")]
    NotFound(String),

    #[error("pull failed: {0}")]
    PullFailed(String),

    #[error("commit failed: {0}")]
    CommitFailed(String),

    #[error("image in use, cannot remove: {0}")]
    InUse(String),

    #[error("runtime error: {0}")]
    Runtime(String),
}
