//! Database models mapping to the metadata schema.

use crate::error::{MetadataError, MetadataResult};
use sqlx::FromRow;
use tessera_core::{ImageFileName, ManagedDirectory};
use time::OffsetDateTime;
use uuid::Uuid;

// =============================================================================
// Cached images
// =============================================================================

/// An uploaded image sitting in the cache directory, not yet attached to a post.
///
/// A row exists exactly when the cache file is expected to exist; any
/// divergence is corrected by the existence check or the cleanup job.
#[derive(Debug, Clone, FromRow)]
pub struct CachedImageRow {
    pub file_name: String,
    /// Unix seconds after which the entry may be removed (inclusive).
    pub expire_time: i64,
    pub created_at: OffsetDateTime,
}

impl CachedImageRow {
    /// Row for an image cached at `created_at` that expires after `ttl`.
    pub fn new(
        file_name: &ImageFileName,
        created_at: OffsetDateTime,
        ttl: time::Duration,
    ) -> MetadataResult<Self> {
        let expires = created_at.checked_add(ttl).ok_or_else(|| {
            MetadataError::OutOfRange(format!("expiry of {file_name} ({created_at} + {ttl})"))
        })?;
        Ok(Self {
            file_name: file_name.to_string(),
            expire_time: expires.unix_timestamp(),
            created_at,
        })
    }
}

// =============================================================================
// Pending deletions
// =============================================================================

/// A promise to remove `file_name` from the directory named by `scope`.
///
/// Destroyed only once the file is confirmed gone.
#[derive(Debug, Clone, FromRow)]
pub struct PendingDeletionRow {
    pub deletion_id: Uuid,
    pub scope: String,
    pub file_name: String,
    pub created_at: OffsetDateTime,
}

impl PendingDeletionRow {
    pub fn new(scope: ManagedDirectory, file_name: &ImageFileName) -> Self {
        Self {
            deletion_id: Uuid::new_v4(),
            scope: scope.as_str().to_string(),
            file_name: file_name.to_string(),
            created_at: OffsetDateTime::now_utc(),
        }
    }

    /// Parsed scope tag.
    pub fn directory(&self) -> MetadataResult<ManagedDirectory> {
        self.scope
            .parse()
            .map_err(|e| MetadataError::CorruptRow(format!("deletion {}: {e}", self.deletion_id)))
    }
}

// =============================================================================
// Posts
// =============================================================================

/// Post record. Only the parts relevant to image attachment are modelled.
#[derive(Debug, Clone, FromRow)]
pub struct PostRow {
    pub post_id: Uuid,
    pub created_at: OffsetDateTime,
}

/// One permanent image of a post, at its user-visible position.
#[derive(Debug, Clone, FromRow)]
pub struct PostImageRow {
    pub post_id: Uuid,
    pub position: i32,
    pub file_name: String,
}
