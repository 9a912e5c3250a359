//! Collision-free identifier allocation for the cache directory.

use crate::error::{LifecycleError, LifecycleResult};
use std::sync::Arc;
use tessera_core::ImageId;
use tessera_storage::ImageStore;

/// Source of candidate identifiers.
pub trait IdGenerator: Send + Sync {
    fn next_id(&self) -> ImageId;
}

/// Random v4 UUID identifiers.
#[derive(Debug, Default, Clone, Copy)]
pub struct RandomIdGenerator;

impl IdGenerator for RandomIdGenerator {
    fn next_id(&self) -> ImageId {
        ImageId::generate()
    }
}

/// Picks identifiers whose file does not yet exist in the cache directory.
///
/// The existence check is not atomic with the later write. Callers must still
/// create the file with [`ImageStore::put_new`] and treat `AlreadyExists` as
/// a reason to allocate again.
pub struct NameAllocator {
    cache: Arc<dyn ImageStore>,
    ids: Arc<dyn IdGenerator>,
    max_attempts: u32,
}

impl NameAllocator {
    pub fn new(cache: Arc<dyn ImageStore>, max_attempts: u32) -> Self {
        Self::with_generator(cache, Arc::new(RandomIdGenerator), max_attempts)
    }

    pub fn with_generator(
        cache: Arc<dyn ImageStore>,
        ids: Arc<dyn IdGenerator>,
        max_attempts: u32,
    ) -> Self {
        Self {
            cache,
            ids,
            max_attempts: max_attempts.max(1),
        }
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Allocate an identifier with no file in the cache directory.
    pub async fn allocate(&self) -> LifecycleResult<ImageId> {
        for attempt in 1..=self.max_attempts {
            let id = self.ids.next_id();
            let file_name = id.file_name();
            if !self.cache.exists(file_name.as_str()).await? {
                return Ok(id);
            }
            tracing::debug!(
                file_name = %file_name,
                attempt = attempt,
                "Cache name collision, generating another"
            );
        }

        tracing::error!(
            attempts = self.max_attempts,
            "Could not find a free cache file name"
        );
        Err(LifecycleError::ResourceExhausted {
            attempts: self.max_attempts,
        })
    }
}
