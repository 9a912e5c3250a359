use async_trait::async_trait;
use bytes::Bytes;
use std::collections::{HashSet, VecDeque};
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use tessera_core::{ImageId, ManagedDirectory};
use tessera_lifecycle::IdGenerator;
use tessera_metadata::models::{CachedImageRow, PendingDeletionRow, PostImageRow, PostRow};
use tessera_metadata::repos::{CachedImageRepo, DeletionRepo, PostRepo};
use tessera_metadata::{MetadataError, MetadataResult, MetadataStore};
use tessera_storage::error::{StorageError, StorageResult};
use tessera_storage::traits::{ImageStore, ObjectMeta};
use time::OffsetDateTime;
use uuid::Uuid;

/// Wraps a real store and injects failures on demand.
#[allow(dead_code)]
pub struct FaultyStore {
    inner: Arc<dyn ImageStore>,
    failing_deletes: Mutex<HashSet<String>>,
    failing_puts: Mutex<HashSet<String>>,
    hide_existing: AtomicBool,
}

#[allow(dead_code)]
impl FaultyStore {
    pub fn new(inner: Arc<dyn ImageStore>) -> Arc<Self> {
        Arc::new(Self {
            inner,
            failing_deletes: Mutex::new(HashSet::new()),
            failing_puts: Mutex::new(HashSet::new()),
            hide_existing: AtomicBool::new(false),
        })
    }

    /// Make `delete` of this file fail with a permission error.
    pub fn fail_delete(&self, key: &str) {
        self.failing_deletes.lock().unwrap().insert(key.to_string());
    }

    pub fn heal_delete(&self, key: &str) {
        self.failing_deletes.lock().unwrap().remove(key);
    }

    /// Make `put` of this file fail with an I/O error.
    pub fn fail_put(&self, key: &str) {
        self.failing_puts.lock().unwrap().insert(key.to_string());
    }

    /// Make `exists` report every file as absent, as if a concurrent writer
    /// created it right after the existence check.
    pub fn hide_existing(&self, hide: bool) {
        self.hide_existing.store(hide, Ordering::SeqCst);
    }
}

#[async_trait]
impl ImageStore for FaultyStore {
    async fn exists(&self, key: &str) -> StorageResult<bool> {
        if self.hide_existing.load(Ordering::SeqCst) {
            return Ok(false);
        }
        self.inner.exists(key).await
    }

    async fn head(&self, key: &str) -> StorageResult<ObjectMeta> {
        self.inner.head(key).await
    }

    async fn get(&self, key: &str) -> StorageResult<Bytes> {
        self.inner.get(key).await
    }

    async fn put(&self, key: &str, data: Bytes) -> StorageResult<()> {
        if self.failing_puts.lock().unwrap().contains(key) {
            return Err(StorageError::Io(std::io::Error::other("injected write failure")));
        }
        self.inner.put(key, data).await
    }

    async fn put_new(&self, key: &str, data: Bytes) -> StorageResult<()> {
        if self.failing_puts.lock().unwrap().contains(key) {
            return Err(StorageError::Io(std::io::Error::other("injected write failure")));
        }
        self.inner.put_new(key, data).await
    }

    async fn delete(&self, key: &str) -> StorageResult<()> {
        if self.failing_deletes.lock().unwrap().contains(key) {
            return Err(StorageError::Io(std::io::Error::new(
                std::io::ErrorKind::PermissionDenied,
                "injected delete failure",
            )));
        }
        self.inner.delete(key).await
    }

    async fn list(&self) -> StorageResult<Vec<String>> {
        self.inner.list().await
    }

    fn backend_name(&self) -> &'static str {
        self.inner.backend_name()
    }
}

/// Hands out a fixed sequence of identifiers, then random ones.
#[allow(dead_code)]
pub struct ScriptedIds(Mutex<VecDeque<ImageId>>);

#[allow(dead_code)]
impl ScriptedIds {
    pub fn new(ids: impl IntoIterator<Item = ImageId>) -> Arc<Self> {
        Arc::new(Self(Mutex::new(ids.into_iter().collect())))
    }
}

impl IdGenerator for ScriptedIds {
    fn next_id(&self) -> ImageId {
        self.0
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(ImageId::generate)
    }
}

/// Metadata operations [`FaultyMetadata`] can be told to fail.
#[allow(dead_code)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MetadataOp {
    InsertCachedImage,
    DeleteCachedImage,
    GetExpiredCachedImages,
    EnqueueDeletion,
    ListPendingDeletions,
    DeletePendingDeletion,
    CreatePost,
    PostImageReferenced,
}

/// Wraps a real metadata store and injects failures on demand.
#[allow(dead_code)]
pub struct FaultyMetadata {
    inner: Arc<dyn MetadataStore>,
    failing: Mutex<HashSet<MetadataOp>>,
}

#[allow(dead_code)]
impl FaultyMetadata {
    pub fn new(inner: Arc<dyn MetadataStore>) -> Arc<Self> {
        Arc::new(Self {
            inner,
            failing: Mutex::new(HashSet::new()),
        })
    }

    pub fn fail(&self, op: MetadataOp) {
        self.failing.lock().unwrap().insert(op);
    }

    pub fn heal(&self, op: MetadataOp) {
        self.failing.lock().unwrap().remove(&op);
    }

    fn check(&self, op: MetadataOp) -> MetadataResult<()> {
        if self.failing.lock().unwrap().contains(&op) {
            return Err(MetadataError::Database(sqlx::Error::PoolTimedOut));
        }
        Ok(())
    }
}

#[async_trait]
impl CachedImageRepo for FaultyMetadata {
    async fn insert_cached_image(&self, image: &CachedImageRow) -> MetadataResult<()> {
        self.check(MetadataOp::InsertCachedImage)?;
        self.inner.insert_cached_image(image).await
    }

    async fn get_cached_image(&self, file_name: &str) -> MetadataResult<Option<CachedImageRow>> {
        self.inner.get_cached_image(file_name).await
    }

    async fn cached_image_exists(&self, file_name: &str) -> MetadataResult<bool> {
        self.inner.cached_image_exists(file_name).await
    }

    async fn get_expired_cached_images(
        &self,
        now: OffsetDateTime,
    ) -> MetadataResult<Vec<CachedImageRow>> {
        self.check(MetadataOp::GetExpiredCachedImages)?;
        self.inner.get_expired_cached_images(now).await
    }

    async fn delete_cached_image(&self, file_name: &str) -> MetadataResult<bool> {
        self.check(MetadataOp::DeleteCachedImage)?;
        self.inner.delete_cached_image(file_name).await
    }
}

#[async_trait]
impl DeletionRepo for FaultyMetadata {
    async fn enqueue_deletion(&self, deletion: &PendingDeletionRow) -> MetadataResult<bool> {
        self.check(MetadataOp::EnqueueDeletion)?;
        self.inner.enqueue_deletion(deletion).await
    }

    async fn list_pending_deletions(
        &self,
        scope: ManagedDirectory,
    ) -> MetadataResult<Vec<PendingDeletionRow>> {
        self.check(MetadataOp::ListPendingDeletions)?;
        self.inner.list_pending_deletions(scope).await
    }

    async fn is_deletion_pending(
        &self,
        scope: ManagedDirectory,
        file_name: &str,
    ) -> MetadataResult<bool> {
        self.inner.is_deletion_pending(scope, file_name).await
    }

    async fn cancel_deletion(
        &self,
        scope: ManagedDirectory,
        file_name: &str,
    ) -> MetadataResult<bool> {
        self.inner.cancel_deletion(scope, file_name).await
    }

    async fn delete_pending_deletion(&self, deletion_id: Uuid) -> MetadataResult<bool> {
        self.check(MetadataOp::DeletePendingDeletion)?;
        self.inner.delete_pending_deletion(deletion_id).await
    }
}

#[async_trait]
impl PostRepo for FaultyMetadata {
    async fn create_post(&self, post: &PostRow, image_file_names: &[String]) -> MetadataResult<()> {
        self.check(MetadataOp::CreatePost)?;
        self.inner.create_post(post, image_file_names).await
    }

    async fn get_post(&self, post_id: Uuid) -> MetadataResult<Option<PostRow>> {
        self.inner.get_post(post_id).await
    }

    async fn get_post_images(&self, post_id: Uuid) -> MetadataResult<Vec<PostImageRow>> {
        self.inner.get_post_images(post_id).await
    }

    async fn post_image_referenced(&self, file_name: &str) -> MetadataResult<bool> {
        self.check(MetadataOp::PostImageReferenced)?;
        self.inner.post_image_referenced(file_name).await
    }
}

#[async_trait]
impl MetadataStore for FaultyMetadata {
    async fn migrate(&self) -> MetadataResult<()> {
        self.inner.migrate().await
    }

    async fn health_check(&self) -> MetadataResult<()> {
        self.inner.health_check().await
    }
}
