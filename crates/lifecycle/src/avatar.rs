//! Deferred removal of replaced or deleted avatars.

use crate::error::LifecycleResult;
use std::sync::Arc;
use tessera_core::{DEFAULT_AVATAR_FILE_NAME, ImageFileName, ManagedDirectory};
use tessera_metadata::MetadataStore;
use tessera_metadata::models::PendingDeletionRow;

pub struct AvatarRetirer {
    metadata: Arc<dyn MetadataStore>,
}

impl AvatarRetirer {
    pub fn new(metadata: Arc<dyn MetadataStore>) -> Self {
        Self { metadata }
    }

    /// Queue an avatar file for deletion.
    ///
    /// Returns `false` when nothing new was queued: the file is the shared
    /// default avatar, or it is already pending.
    pub async fn retire(&self, file_name: &ImageFileName) -> LifecycleResult<bool> {
        if file_name.as_str() == DEFAULT_AVATAR_FILE_NAME {
            tracing::debug!("Default avatar is shared, not retiring");
            return Ok(false);
        }

        let deletion = PendingDeletionRow::new(ManagedDirectory::Avatar, file_name);
        let queued = self.metadata.enqueue_deletion(&deletion).await?;
        if queued {
            tracing::debug!(file_name = %file_name, "Avatar queued for deletion");
        }
        Ok(queued)
    }
}
