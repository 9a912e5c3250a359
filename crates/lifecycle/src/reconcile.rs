//! Directory-scan reconciliation of orphaned files.

use crate::error::LifecycleResult;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tessera_core::{ImageFileName, ManagedDirectory};
use tessera_metadata::models::PendingDeletionRow;
use tessera_metadata::{MetadataResult, MetadataStore};
use tessera_storage::{ImageDirectories, StorageError};
use time::{Duration, OffsetDateTime};

/// Counters for one reconciliation scan.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconcileStats {
    /// Files listed.
    pub scanned: u64,
    /// Orphans newly queued for deletion.
    pub orphans_enqueued: u64,
    /// Files that could not be checked.
    pub failed: u64,
}

/// Directories the scan covers. Avatar references live in user records,
/// which this subsystem does not see.
const SCANNED: [ManagedDirectory; 2] = [ManagedDirectory::Cache, ManagedDirectory::PostImage];

/// Finds files nothing references and queues them for the cleanup job.
///
/// Catches the leftovers of failed synchronous paths: cache files whose
/// record was never written, and permanent copies of an aborted promotion.
pub struct Reconciler {
    metadata: Arc<dyn MetadataStore>,
    dirs: ImageDirectories,
    grace_period: Duration,
}

impl Reconciler {
    pub fn new(
        metadata: Arc<dyn MetadataStore>,
        dirs: ImageDirectories,
        grace_period: Duration,
    ) -> Self {
        Self {
            metadata,
            dirs,
            grace_period,
        }
    }

    /// Scan once. Files modified less than the grace period before `now` are
    /// left alone so in-flight uploads and promotions are not queued.
    pub async fn scan(&self, now: OffsetDateTime) -> LifecycleResult<ReconcileStats> {
        let mut stats = ReconcileStats::default();
        let Some(cutoff) = now.checked_sub(self.grace_period) else {
            // No file can be older than an unrepresentable instant
            tracing::warn!(
                grace_period = %self.grace_period,
                "Grace period reaches past the earliest representable time, skipping scan"
            );
            return Ok(stats);
        };

        for dir in SCANNED {
            let names = self.dirs.for_dir(dir).list().await?;
            for name in names {
                stats.scanned += 1;
                let Ok(file_name) = ImageFileName::parse(&name) else {
                    tracing::debug!(scope = %dir, file_name = %name, "Skipping unmanaged file");
                    continue;
                };

                match self.check_file(dir, &file_name, cutoff).await {
                    Ok(true) => stats.orphans_enqueued += 1,
                    Ok(false) => {}
                    Err(e) => {
                        tracing::warn!(
                            scope = %dir,
                            file_name = %file_name,
                            error = %e,
                            "Failed to check file during reconciliation"
                        );
                        stats.failed += 1;
                    }
                }
            }
        }

        tracing::info!(
            scanned = stats.scanned,
            orphans_enqueued = stats.orphans_enqueued,
            failed = stats.failed,
            "Reconciliation scan finished"
        );
        Ok(stats)
    }

    /// Queue the file if it is an orphan older than `cutoff`.
    async fn check_file(
        &self,
        dir: ManagedDirectory,
        file_name: &ImageFileName,
        cutoff: OffsetDateTime,
    ) -> Result<bool, ScanError> {
        if self.is_referenced(dir, file_name.as_str()).await? {
            return Ok(false);
        }
        if self
            .metadata
            .is_deletion_pending(dir, file_name.as_str())
            .await?
        {
            return Ok(false);
        }

        let meta = match self.dirs.for_dir(dir).head(file_name.as_str()).await {
            Ok(meta) => meta,
            // Removed since listing
            Err(e) if e.is_not_found() => return Ok(false),
            Err(e) => return Err(e.into()),
        };
        match meta.last_modified {
            Some(modified) if modified <= cutoff => {}
            _ => return Ok(false),
        }

        let deletion = PendingDeletionRow::new(dir, file_name);
        let queued = self.metadata.enqueue_deletion(&deletion).await?;
        if queued {
            tracing::info!(
                scope = %dir,
                file_name = %file_name,
                "Queued orphaned file for deletion"
            );
        }
        Ok(queued)
    }

    async fn is_referenced(&self, dir: ManagedDirectory, file_name: &str) -> MetadataResult<bool> {
        match dir {
            ManagedDirectory::Cache => self.metadata.cached_image_exists(file_name).await,
            ManagedDirectory::PostImage => self.metadata.post_image_referenced(file_name).await,
            // Never scanned; treat as referenced
            ManagedDirectory::Avatar => Ok(true),
        }
    }
}

/// Per-file failure during a scan.
#[derive(Debug, thiserror::Error)]
enum ScanError {
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error(transparent)]
    Metadata(#[from] tessera_metadata::MetadataError),
}
