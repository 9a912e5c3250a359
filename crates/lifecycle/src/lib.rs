//! Image lifecycle for Tessera.
//!
//! Uploaded images land in the cache directory with an expiry time. Creating
//! a post promotes them into the permanent post-image directory. Files that
//! are no longer needed are never removed inline: they are queued, and the
//! cleanup job removes them later, so the filesystem converges on what the
//! metadata store says without either side needing a shared transaction.

pub mod avatar;
pub mod cache;
pub mod cleanup;
pub mod error;
pub mod naming;
pub mod promotion;
pub mod reconcile;
pub mod scheduler;

pub use avatar::AvatarRetirer;
pub use cache::CacheStore;
pub use cleanup::{CleanupJob, CleanupStats};
pub use error::{ErrorClass, LifecycleError, LifecycleResult};
pub use naming::{IdGenerator, NameAllocator, RandomIdGenerator};
pub use promotion::{PostPublisher, PublishedPost};
pub use reconcile::{ReconcileStats, Reconciler};
pub use scheduler::{spawn_cleanup_every, spawn_cleanup_scheduler};

use std::sync::Arc;
use tessera_core::config::AppConfig;
use tessera_metadata::MetadataStore;
use tessera_storage::ImageDirectories;

/// Every lifecycle component, wired to one metadata store and directory set.
#[derive(Clone)]
pub struct ImageLifecycle {
    pub cache: Arc<CacheStore>,
    pub publisher: Arc<PostPublisher>,
    pub avatars: Arc<AvatarRetirer>,
    pub cleanup: Arc<CleanupJob>,
    pub reconciler: Arc<Reconciler>,
}

impl ImageLifecycle {
    pub fn new(
        metadata: Arc<dyn MetadataStore>,
        dirs: ImageDirectories,
        config: &AppConfig,
    ) -> Self {
        Self {
            cache: Arc::new(CacheStore::new(
                metadata.clone(),
                dirs.cache.clone(),
                &config.images,
            )),
            publisher: Arc::new(PostPublisher::new(metadata.clone(), &dirs)),
            avatars: Arc::new(AvatarRetirer::new(metadata.clone())),
            cleanup: Arc::new(CleanupJob::new(metadata.clone(), dirs.clone())),
            reconciler: Arc::new(Reconciler::new(
                metadata,
                dirs,
                config.cleanup.reconcile_grace_period(),
            )),
        }
    }
}
