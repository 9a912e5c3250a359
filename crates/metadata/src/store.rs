//! Metadata store trait and implementations.

use crate::error::MetadataResult;
use crate::repos::{CachedImageRepo, DeletionRepo, PostRepo};
use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Pool, Sqlite};
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

/// Combined metadata store trait.
#[async_trait]
pub trait MetadataStore: CachedImageRepo + DeletionRepo + PostRepo + Send + Sync {
    /// Run database migrations.
    async fn migrate(&self) -> MetadataResult<()>;

    /// Check database connectivity and health.
    async fn health_check(&self) -> MetadataResult<()>;
}

/// SQLite-based metadata store.
pub struct SqliteStore {
    pool: Pool<Sqlite>,
}

impl SqliteStore {
    /// Create a new SQLite store.
    pub async fn new(path: impl AsRef<Path>) -> MetadataResult<Self> {
        let path = path.as_ref();

        // Ensure parent directory exists
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let opts = SqliteConnectOptions::from_str(&format!("sqlite:{}?mode=rwc", path.display()))?
            .create_if_missing(true)
            .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal)
            .synchronous(sqlx::sqlite::SqliteSynchronous::Normal)
            .foreign_keys(true)
            // Prevent transient "database is locked" errors under concurrent access.
            .busy_timeout(Duration::from_secs(5));

        let pool = SqlitePoolOptions::new()
            // SQLite permits limited write concurrency; a single connection serializes
            // writers instead of surfacing "database is locked".
            .max_connections(1)
            .connect_with(opts)
            .await?;

        let store = Self { pool };
        store.migrate().await?;

        tracing::debug!(path = %path.display(), "SQLite metadata store opened");

        Ok(store)
    }
}

#[async_trait]
impl MetadataStore for SqliteStore {
    async fn migrate(&self) -> MetadataResult<()> {
        sqlx::raw_sql(SCHEMA_SQL).execute(&self.pool).await?;
        Ok(())
    }

    async fn health_check(&self) -> MetadataResult<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

// Implement all the repository traits for SqliteStore
mod sqlite_impl {
    use super::*;
    use crate::models::*;
    use tessera_core::ManagedDirectory;
    use time::OffsetDateTime;
    use uuid::Uuid;

    #[async_trait]
    impl CachedImageRepo for SqliteStore {
        async fn insert_cached_image(&self, image: &CachedImageRow) -> MetadataResult<()> {
            sqlx::query(
                "INSERT INTO cached_images (file_name, expire_time, created_at) VALUES (?, ?, ?)",
            )
            .bind(&image.file_name)
            .bind(image.expire_time)
            .bind(image.created_at)
            .execute(&self.pool)
            .await?;
            Ok(())
        }

        async fn get_cached_image(
            &self,
            file_name: &str,
        ) -> MetadataResult<Option<CachedImageRow>> {
            let row = sqlx::query_as::<_, CachedImageRow>(
                "SELECT * FROM cached_images WHERE file_name = ?",
            )
            .bind(file_name)
            .fetch_optional(&self.pool)
            .await?;
            Ok(row)
        }

        async fn cached_image_exists(&self, file_name: &str) -> MetadataResult<bool> {
            let row: Option<(i32,)> =
                sqlx::query_as("SELECT 1 FROM cached_images WHERE file_name = ?")
                    .bind(file_name)
                    .fetch_optional(&self.pool)
                    .await?;
            Ok(row.is_some())
        }

        async fn get_expired_cached_images(
            &self,
            now: OffsetDateTime,
        ) -> MetadataResult<Vec<CachedImageRow>> {
            let rows = sqlx::query_as::<_, CachedImageRow>(
                "SELECT * FROM cached_images WHERE expire_time <= ? ORDER BY expire_time",
            )
            .bind(now.unix_timestamp())
            .fetch_all(&self.pool)
            .await?;
            Ok(rows)
        }

        async fn delete_cached_image(&self, file_name: &str) -> MetadataResult<bool> {
            let result = sqlx::query("DELETE FROM cached_images WHERE file_name = ?")
                .bind(file_name)
                .execute(&self.pool)
                .await?;
            Ok(result.rows_affected() > 0)
        }
    }

    #[async_trait]
    impl DeletionRepo for SqliteStore {
        async fn enqueue_deletion(&self, deletion: &PendingDeletionRow) -> MetadataResult<bool> {
            let result = sqlx::query(
                r#"
                INSERT OR IGNORE INTO pending_deletions (deletion_id, scope, file_name, created_at)
                VALUES (?, ?, ?, ?)
                "#,
            )
            .bind(deletion.deletion_id)
            .bind(&deletion.scope)
            .bind(&deletion.file_name)
            .bind(deletion.created_at)
            .execute(&self.pool)
            .await?;
            Ok(result.rows_affected() > 0)
        }

        async fn list_pending_deletions(
            &self,
            scope: ManagedDirectory,
        ) -> MetadataResult<Vec<PendingDeletionRow>> {
            let rows = sqlx::query_as::<_, PendingDeletionRow>(
                "SELECT * FROM pending_deletions WHERE scope = ? ORDER BY created_at",
            )
            .bind(scope.as_str())
            .fetch_all(&self.pool)
            .await?;
            Ok(rows)
        }

        async fn is_deletion_pending(
            &self,
            scope: ManagedDirectory,
            file_name: &str,
        ) -> MetadataResult<bool> {
            let row: Option<(i32,)> = sqlx::query_as(
                "SELECT 1 FROM pending_deletions WHERE scope = ? AND file_name = ?",
            )
            .bind(scope.as_str())
            .bind(file_name)
            .fetch_optional(&self.pool)
            .await?;
            Ok(row.is_some())
        }

        async fn cancel_deletion(
            &self,
            scope: ManagedDirectory,
            file_name: &str,
        ) -> MetadataResult<bool> {
            let result =
                sqlx::query("DELETE FROM pending_deletions WHERE scope = ? AND file_name = ?")
                    .bind(scope.as_str())
                    .bind(file_name)
                    .execute(&self.pool)
                    .await?;
            Ok(result.rows_affected() > 0)
        }

        async fn delete_pending_deletion(&self, deletion_id: Uuid) -> MetadataResult<bool> {
            let result = sqlx::query("DELETE FROM pending_deletions WHERE deletion_id = ?")
                .bind(deletion_id)
                .execute(&self.pool)
                .await?;
            Ok(result.rows_affected() > 0)
        }
    }

    #[async_trait]
    impl PostRepo for SqliteStore {
        async fn create_post(
            &self,
            post: &PostRow,
            image_file_names: &[String],
        ) -> MetadataResult<()> {
            let mut tx = self.pool.begin().await?;

            sqlx::query("INSERT INTO posts (post_id, created_at) VALUES (?, ?)")
                .bind(post.post_id)
                .bind(post.created_at)
                .execute(&mut *tx)
                .await?;

            for (position, file_name) in image_file_names.iter().enumerate() {
                sqlx::query(
                    "INSERT INTO post_images (post_id, position, file_name) VALUES (?, ?, ?)",
                )
                .bind(post.post_id)
                .bind(position as i32)
                .bind(file_name)
                .execute(&mut *tx)
                .await?;
            }

            tx.commit().await?;
            Ok(())
        }

        async fn get_post(&self, post_id: Uuid) -> MetadataResult<Option<PostRow>> {
            let row = sqlx::query_as::<_, PostRow>("SELECT * FROM posts WHERE post_id = ?")
                .bind(post_id)
                .fetch_optional(&self.pool)
                .await?;
            Ok(row)
        }

        async fn get_post_images(&self, post_id: Uuid) -> MetadataResult<Vec<PostImageRow>> {
            let rows = sqlx::query_as::<_, PostImageRow>(
                "SELECT * FROM post_images WHERE post_id = ? ORDER BY position",
            )
            .bind(post_id)
            .fetch_all(&self.pool)
            .await?;
            Ok(rows)
        }

        async fn post_image_referenced(&self, file_name: &str) -> MetadataResult<bool> {
            let row: Option<(i32,)> =
                sqlx::query_as("SELECT 1 FROM post_images WHERE file_name = ? LIMIT 1")
                    .bind(file_name)
                    .fetch_optional(&self.pool)
                    .await?;
            Ok(row.is_some())
        }
    }
}

/// SQL schema for SQLite.
const SCHEMA_SQL: &str = r#"
-- Images waiting in the cache directory
CREATE TABLE IF NOT EXISTS cached_images (
    file_name TEXT PRIMARY KEY,
    -- Unix seconds; eligible for cleanup once expire_time <= now
    expire_time INTEGER NOT NULL,
    created_at TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_cached_images_expire ON cached_images(expire_time);

-- Files awaiting physical removal, one queue per managed directory
CREATE TABLE IF NOT EXISTS pending_deletions (
    deletion_id BLOB PRIMARY KEY,
    scope TEXT NOT NULL CHECK (scope IN ('cache', 'avatar', 'post_image')),
    file_name TEXT NOT NULL,
    created_at TEXT NOT NULL,
    UNIQUE(scope, file_name)
);
CREATE INDEX IF NOT EXISTS idx_pending_deletions_scope ON pending_deletions(scope, created_at);

-- Posts (image attachment only)
CREATE TABLE IF NOT EXISTS posts (
    post_id BLOB PRIMARY KEY,
    created_at TEXT NOT NULL
);

-- Ordered permanent images of a post; immutable after creation
CREATE TABLE IF NOT EXISTS post_images (
    post_id BLOB NOT NULL,
    position INTEGER NOT NULL,
    file_name TEXT NOT NULL,
    PRIMARY KEY (post_id, position),
    FOREIGN KEY (post_id) REFERENCES posts(post_id) ON DELETE CASCADE
);
CREATE INDEX IF NOT EXISTS idx_post_images_file ON post_images(file_name);
"#;
