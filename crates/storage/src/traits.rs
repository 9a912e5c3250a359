//! Storage trait definitions.

use crate::error::StorageResult;
use async_trait::async_trait;
use bytes::Bytes;

/// A flat directory of image files addressed by file name.
#[async_trait]
pub trait ImageStore: Send + Sync + 'static {
    /// Check if a file exists.
    async fn exists(&self, key: &str) -> StorageResult<bool>;

    /// Get a file's size and modification time without reading it.
    async fn head(&self, key: &str) -> StorageResult<ObjectMeta>;

    /// Read a file. Fails with `NotFound` if it is absent.
    async fn get(&self, key: &str) -> StorageResult<Bytes>;

    /// Write a file atomically, replacing any existing file.
    async fn put(&self, key: &str, data: Bytes) -> StorageResult<()>;

    /// Write a file atomically only if no file of that name exists.
    ///
    /// Fails with `AlreadyExists` if the name is taken, including when a
    /// concurrent writer claims it between any earlier existence check and this call.
    async fn put_new(&self, key: &str, data: Bytes) -> StorageResult<()>;

    /// Delete a file. Fails with `NotFound` if it is already absent.
    async fn delete(&self, key: &str) -> StorageResult<()>;

    /// List the names of all files in the directory.
    async fn list(&self) -> StorageResult<Vec<String>>;

    /// Get the name of this storage backend, for logging.
    fn backend_name(&self) -> &'static str;

    /// Verify the backend is reachable.
    ///
    /// The default implementation returns Ok(()).
    async fn health_check(&self) -> StorageResult<()> {
        Ok(())
    }
}

/// Metadata about a stored file.
#[derive(Clone, Debug)]
pub struct ObjectMeta {
    /// File size in bytes.
    pub size: u64,
    /// Last modification time (if available).
    pub last_modified: Option<time::OffsetDateTime>,
}
