//! Post repository.

use crate::error::MetadataResult;
use crate::models::{PostImageRow, PostRow};
use async_trait::async_trait;
use uuid::Uuid;

/// Repository for posts and their permanent image lists.
#[async_trait]
pub trait PostRepo: Send + Sync {
    /// Create a post together with its ordered image list.
    ///
    /// The post and every image row are written in one transaction. Image
    /// positions follow the order of `image_file_names`.
    async fn create_post(&self, post: &PostRow, image_file_names: &[String]) -> MetadataResult<()>;

    /// Get a post by ID.
    async fn get_post(&self, post_id: Uuid) -> MetadataResult<Option<PostRow>>;

    /// Get a post's images ordered by position.
    async fn get_post_images(&self, post_id: Uuid) -> MetadataResult<Vec<PostImageRow>>;

    /// Check whether any post references a permanent image file.
    async fn post_image_referenced(&self, file_name: &str) -> MetadataResult<bool>;
}
