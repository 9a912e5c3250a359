//! Promotion of cached images to permanent post images.

use crate::error::{LifecycleError, LifecycleResult};
use std::sync::Arc;
use tessera_core::{ImageFileName, ImageId, ManagedDirectory};
use tessera_metadata::models::{PendingDeletionRow, PostRow};
use tessera_metadata::{MetadataError, MetadataStore};
use tessera_storage::{ImageDirectories, ImageStore};
use time::OffsetDateTime;
use uuid::Uuid;

/// A post created with its permanent images.
#[derive(Debug, Clone)]
pub struct PublishedPost {
    pub post_id: Uuid,
    /// Permanent file names, in request order.
    pub images: Vec<ImageFileName>,
}

/// Creates posts from cached images.
pub struct PostPublisher {
    metadata: Arc<dyn MetadataStore>,
    cache: Arc<dyn ImageStore>,
    post_image: Arc<dyn ImageStore>,
}

impl PostPublisher {
    pub fn new(metadata: Arc<dyn MetadataStore>, dirs: &ImageDirectories) -> Self {
        Self {
            metadata,
            cache: dirs.cache.clone(),
            post_image: dirs.post_image.clone(),
        }
    }

    /// Promote `image_ids` in order and create the post referencing them.
    ///
    /// The first failure aborts the call. Images promoted before it stay
    /// promoted: their permanent copies remain, their cache rows are gone and
    /// their cache files are queued for deletion. No post is created.
    pub async fn create_post(
        &self,
        post_id: Uuid,
        image_ids: &[ImageId],
    ) -> LifecycleResult<PublishedPost> {
        let mut images = Vec::with_capacity(image_ids.len());
        for id in image_ids {
            images.push(self.promote(id).await?);
        }

        let post = PostRow {
            post_id,
            created_at: OffsetDateTime::now_utc(),
        };
        let names: Vec<String> = images.iter().map(|n| n.to_string()).collect();
        self.metadata.create_post(&post, &names).await?;

        tracing::info!(
            post_id = %post_id,
            image_count = images.len(),
            "Post created"
        );
        Ok(PublishedPost { post_id, images })
    }

    async fn promote(&self, id: &ImageId) -> LifecycleResult<ImageFileName> {
        let file_name = id.file_name();

        let data = match self.cache.get(file_name.as_str()).await {
            Ok(data) => data,
            Err(e) if e.is_not_found() => {
                return Err(LifecycleError::ImageNotFound(file_name.to_string()));
            }
            Err(e) => return Err(e.into()),
        };

        self.post_image.put(file_name.as_str(), data).await?;

        // A copy left by an earlier failed attempt may have been queued as an orphan
        if self
            .metadata
            .cancel_deletion(ManagedDirectory::PostImage, file_name.as_str())
            .await?
        {
            tracing::info!(
                file_name = %file_name,
                "Withdrew pending deletion of re-promoted post image"
            );
        }

        // The cache copy is removed later by the cleanup job
        let deletion = PendingDeletionRow::new(ManagedDirectory::Cache, &file_name);
        self.metadata.enqueue_deletion(&deletion).await?;

        if !self.metadata.delete_cached_image(file_name.as_str()).await? {
            tracing::debug!(
                file_name = %file_name,
                "Promoted image had no cache record"
            );
        }

        tracing::debug!(file_name = %file_name, "Image promoted");
        Ok(file_name)
    }

    /// Permanent image names of a post, in position order.
    pub async fn post_images(&self, post_id: Uuid) -> LifecycleResult<Vec<ImageFileName>> {
        if self.metadata.get_post(post_id).await?.is_none() {
            return Err(LifecycleError::PostNotFound(post_id));
        }

        self.metadata
            .get_post_images(post_id)
            .await?
            .into_iter()
            .map(|row| {
                ImageFileName::parse(&row.file_name).map_err(|e| {
                    LifecycleError::Metadata(MetadataError::CorruptRow(format!(
                        "post {post_id} image {}: {e}",
                        row.position
                    )))
                })
            })
            .collect()
    }
}
