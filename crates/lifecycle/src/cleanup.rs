//! Cleanup job: drains the deletion queues and the expired cache set.
//!
//! Every run loads its batch up front and processes each entry on its own.
//! Entries whose removal fails stay queued for the next run; the job never
//! retries within a run and never returns an error to its trigger.
//!
//! Overlapping runs are safe. Removing an absent file counts as success, and
//! retiring a row another run already retired is reported as a no-op by the
//! metadata store.

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tessera_core::ManagedDirectory;
use tessera_metadata::MetadataStore;
use tessera_metadata::models::PendingDeletionRow;
use tessera_storage::ImageDirectories;
use time::OffsetDateTime;

/// Counters for one cleanup run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CleanupStats {
    /// Queue entries and expired cache records examined.
    pub processed: u64,
    /// Files removed by this run.
    pub removed: u64,
    /// Files that were already gone.
    pub already_absent: u64,
    /// Queue entries and cache records retired by this run.
    pub retired: u64,
    /// Post-image deletions dropped because a post references the file again.
    /// The file is kept; the entry counts as retired.
    pub still_referenced: u64,
    /// Errors. An entry whose file was removed but whose record could not be
    /// retired counts in both `removed` and `failed`, so `failed` does not
    /// mean the file is still present.
    pub failed: u64,
}

/// Outcome of removing one file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RemovalOutcome {
    Removed,
    AlreadyAbsent,
    Failed,
}

pub struct CleanupJob {
    metadata: Arc<dyn MetadataStore>,
    dirs: ImageDirectories,
}

impl CleanupJob {
    pub fn new(metadata: Arc<dyn MetadataStore>, dirs: ImageDirectories) -> Self {
        Self { metadata, dirs }
    }

    pub async fn run(&self) -> CleanupStats {
        self.run_at(OffsetDateTime::now_utc()).await
    }

    /// Run once, treating cache records with `expire_time <= now` as expired.
    pub async fn run_at(&self, now: OffsetDateTime) -> CleanupStats {
        let mut stats = CleanupStats::default();

        for scope in ManagedDirectory::ALL {
            self.drain_queue(scope, &mut stats).await;
        }
        self.sweep_expired(now, &mut stats).await;

        if stats.failed > 0 {
            tracing::warn!(
                processed = stats.processed,
                removed = stats.removed,
                already_absent = stats.already_absent,
                retired = stats.retired,
                still_referenced = stats.still_referenced,
                failed = stats.failed,
                "Cleanup run finished with failures, remaining entries retried next run"
            );
        } else {
            tracing::info!(
                processed = stats.processed,
                removed = stats.removed,
                already_absent = stats.already_absent,
                retired = stats.retired,
                still_referenced = stats.still_referenced,
                "Cleanup run finished"
            );
        }
        stats
    }

    async fn drain_queue(&self, scope: ManagedDirectory, stats: &mut CleanupStats) {
        let entries = match self.metadata.list_pending_deletions(scope).await {
            Ok(entries) => entries,
            Err(e) => {
                tracing::error!(
                    scope = %scope,
                    error = %e,
                    "Failed to load deletion queue, skipping this run"
                );
                stats.failed += 1;
                return;
            }
        };

        for entry in entries {
            stats.processed += 1;
            if scope == ManagedDirectory::PostImage {
                match self.metadata.post_image_referenced(&entry.file_name).await {
                    Ok(false) => {}
                    Ok(true) => {
                        // Queued as an orphan, then attached to a post before this run
                        tracing::info!(
                            file_name = %entry.file_name,
                            "Post image referenced again, dropping its deletion"
                        );
                        stats.still_referenced += 1;
                        self.retire_deletion(&entry, stats).await;
                        continue;
                    }
                    Err(e) => {
                        tracing::warn!(
                            file_name = %entry.file_name,
                            error = %e,
                            "Failed to check post image references, keeping entry for next run"
                        );
                        stats.failed += 1;
                        continue;
                    }
                }
            }

            match self.remove_file(scope, &entry.file_name).await {
                RemovalOutcome::Removed => stats.removed += 1,
                RemovalOutcome::AlreadyAbsent => stats.already_absent += 1,
                RemovalOutcome::Failed => {
                    stats.failed += 1;
                    continue;
                }
            }
            self.retire_deletion(&entry, stats).await;
        }
    }

    async fn retire_deletion(&self, entry: &PendingDeletionRow, stats: &mut CleanupStats) {
        match self.metadata.delete_pending_deletion(entry.deletion_id).await {
            Ok(true) => stats.retired += 1,
            Ok(false) => {
                tracing::debug!(
                    deletion_id = %entry.deletion_id,
                    file_name = %entry.file_name,
                    "Deletion already retired by a concurrent run"
                );
            }
            Err(e) => {
                tracing::warn!(
                    deletion_id = %entry.deletion_id,
                    file_name = %entry.file_name,
                    error = %e,
                    "Failed to retire deletion entry"
                );
                stats.failed += 1;
            }
        }
    }

    async fn sweep_expired(&self, now: OffsetDateTime, stats: &mut CleanupStats) {
        let expired = match self.metadata.get_expired_cached_images(now).await {
            Ok(expired) => expired,
            Err(e) => {
                tracing::error!(
                    error = %e,
                    "Failed to load expired cached images, skipping this run"
                );
                stats.failed += 1;
                return;
            }
        };

        for image in expired {
            stats.processed += 1;
            match self.remove_file(ManagedDirectory::Cache, &image.file_name).await {
                RemovalOutcome::Removed => stats.removed += 1,
                RemovalOutcome::AlreadyAbsent => stats.already_absent += 1,
                RemovalOutcome::Failed => {
                    stats.failed += 1;
                    continue;
                }
            }

            match self.metadata.delete_cached_image(&image.file_name).await {
                Ok(true) => stats.retired += 1,
                Ok(false) => {
                    tracing::debug!(
                        file_name = %image.file_name,
                        "Cached image record already removed"
                    );
                }
                Err(e) => {
                    tracing::warn!(
                        file_name = %image.file_name,
                        error = %e,
                        "Failed to remove expired cached image record"
                    );
                    stats.failed += 1;
                }
            }
        }
    }

    async fn remove_file(&self, scope: ManagedDirectory, file_name: &str) -> RemovalOutcome {
        let store = self.dirs.for_dir(scope);
        match store.delete(file_name).await {
            Ok(()) => {
                tracing::debug!(scope = %scope, file_name = %file_name, "Removed file");
                RemovalOutcome::Removed
            }
            Err(e) if e.is_not_found() => {
                tracing::warn!(
                    scope = %scope,
                    file_name = %file_name,
                    "File already absent, retiring its entry"
                );
                RemovalOutcome::AlreadyAbsent
            }
            Err(e) => {
                tracing::error!(
                    scope = %scope,
                    backend = store.backend_name(),
                    file_name = %file_name,
                    error = %e,
                    "Failed to remove file, keeping entry for next run"
                );
                RemovalOutcome::Failed
            }
        }
    }
}
