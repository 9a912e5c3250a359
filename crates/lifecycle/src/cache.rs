//! Cache-write path and the existence check for cached images.

use crate::error::{LifecycleError, LifecycleResult};
use crate::naming::NameAllocator;
use bytes::Bytes;
use std::sync::Arc;
use tessera_core::ImageId;
use tessera_core::config::ImageConfig;
use tessera_metadata::MetadataStore;
use tessera_metadata::models::CachedImageRow;
use tessera_storage::{ImageStore, StorageError};
use time::{Duration, OffsetDateTime};

/// Writes uploads into the cache directory and tracks their expiry.
pub struct CacheStore {
    metadata: Arc<dyn MetadataStore>,
    cache: Arc<dyn ImageStore>,
    allocator: NameAllocator,
    ttl: Duration,
}

impl CacheStore {
    pub fn new(
        metadata: Arc<dyn MetadataStore>,
        cache: Arc<dyn ImageStore>,
        config: &ImageConfig,
    ) -> Self {
        let allocator = NameAllocator::new(cache.clone(), config.max_name_attempts);
        Self::with_allocator(metadata, cache, allocator, config.cache_ttl())
    }

    pub fn with_allocator(
        metadata: Arc<dyn MetadataStore>,
        cache: Arc<dyn ImageStore>,
        allocator: NameAllocator,
        ttl: Duration,
    ) -> Self {
        Self {
            metadata,
            cache,
            allocator,
            ttl,
        }
    }

    /// Store an uploaded image and return its identifier.
    pub async fn cache_image(&self, data: Bytes) -> LifecycleResult<ImageId> {
        self.cache_image_at(data, OffsetDateTime::now_utc()).await
    }

    /// Store an uploaded image as if uploaded at `now`.
    ///
    /// If the metadata insert fails the written file is left behind for
    /// directory-scan reconciliation to reclaim.
    pub async fn cache_image_at(
        &self,
        data: Bytes,
        now: OffsetDateTime,
    ) -> LifecycleResult<ImageId> {
        let attempts = self.allocator.max_attempts();
        for attempt in 1..=attempts {
            let id = self.allocator.allocate().await?;
            let file_name = id.file_name();
            // Built before the write so an unrepresentable expiry leaves no file
            let row = CachedImageRow::new(&file_name, now, self.ttl)?;

            match self.cache.put_new(file_name.as_str(), data.clone()).await {
                Ok(()) => {}
                Err(StorageError::AlreadyExists(_)) => {
                    // Another writer claimed the name after our existence check
                    tracing::debug!(
                        file_name = %file_name,
                        attempt = attempt,
                        "Lost race for cache file name, retrying"
                    );
                    continue;
                }
                Err(e) => return Err(e.into()),
            }

            if let Err(e) = self.metadata.insert_cached_image(&row).await {
                tracing::warn!(
                    file_name = %file_name,
                    error = %e,
                    "Cached image written but not recorded, leaving file for reconciliation"
                );
                return Err(e.into());
            }

            tracing::debug!(
                file_name = %file_name,
                size = data.len(),
                expire_time = row.expire_time,
                "Image cached"
            );
            return Ok(id);
        }

        Err(LifecycleError::ResourceExhausted { attempts })
    }

    /// Whether a cached image is still usable.
    ///
    /// A metadata row whose file has disappeared is deleted on the spot and
    /// reported as absent.
    pub async fn check_cache_image_existence(&self, id: &ImageId) -> LifecycleResult<bool> {
        let file_name = id.file_name();
        if !self.metadata.cached_image_exists(file_name.as_str()).await? {
            return Ok(false);
        }

        if self.cache.exists(file_name.as_str()).await? {
            return Ok(true);
        }

        match self.metadata.delete_cached_image(file_name.as_str()).await {
            Ok(_) => {
                tracing::info!(
                    file_name = %file_name,
                    "Removed cached image record with missing file"
                );
            }
            Err(e) => {
                // The cleanup job's expiry sweep retires the row later
                tracing::warn!(
                    file_name = %file_name,
                    error = %e,
                    "Failed to remove dangling cached image record"
                );
            }
        }
        Ok(false)
    }
}
