//! Deferred deletion queue repository.

use crate::error::MetadataResult;
use crate::models::PendingDeletionRow;
use async_trait::async_trait;
use tessera_core::ManagedDirectory;
use uuid::Uuid;

/// Repository for the pending-deletion queues (one per managed directory).
#[async_trait]
pub trait DeletionRepo: Send + Sync {
    /// Queue a file for deletion.
    ///
    /// Idempotent on `(scope, file_name)`: returns `false` if the file was
    /// already queued, in which case the existing record is kept.
    async fn enqueue_deletion(&self, deletion: &PendingDeletionRow) -> MetadataResult<bool>;

    /// Load the whole queue for a directory, oldest first.
    async fn list_pending_deletions(
        &self,
        scope: ManagedDirectory,
    ) -> MetadataResult<Vec<PendingDeletionRow>>;

    /// Check whether a file is queued for deletion.
    async fn is_deletion_pending(
        &self,
        scope: ManagedDirectory,
        file_name: &str,
    ) -> MetadataResult<bool>;

    /// Withdraw a queued deletion because the file is wanted again.
    ///
    /// Returns `true` if an entry was removed.
    async fn cancel_deletion(
        &self,
        scope: ManagedDirectory,
        file_name: &str,
    ) -> MetadataResult<bool>;

    /// Retire a queue entry.
    ///
    /// Returns `true` if this call removed the row, `false` if a concurrent
    /// caller already had.
    async fn delete_pending_deletion(&self, deletion_id: Uuid) -> MetadataResult<bool>;
}
