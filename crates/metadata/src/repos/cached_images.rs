//! Cached image repository.

use crate::error::MetadataResult;
use crate::models::CachedImageRow;
use async_trait::async_trait;
use time::OffsetDateTime;

/// Repository for images waiting in the cache directory.
#[async_trait]
pub trait CachedImageRepo: Send + Sync {
    /// Record a freshly cached image.
    async fn insert_cached_image(&self, image: &CachedImageRow) -> MetadataResult<()>;

    /// Get a cached image by file name.
    async fn get_cached_image(&self, file_name: &str) -> MetadataResult<Option<CachedImageRow>>;

    /// Check whether a cached image row exists.
    async fn cached_image_exists(&self, file_name: &str) -> MetadataResult<bool>;

    /// Get cached images whose `expire_time` is at or before `now`.
    async fn get_expired_cached_images(
        &self,
        now: OffsetDateTime,
    ) -> MetadataResult<Vec<CachedImageRow>>;

    /// Delete a cached image row.
    ///
    /// Returns `true` if this call removed the row, `false` if it was already gone.
    async fn delete_cached_image(&self, file_name: &str) -> MetadataResult<bool>;
}
