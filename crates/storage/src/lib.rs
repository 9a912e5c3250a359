//! Image file storage for Tessera.
//!
//! This crate provides:
//! - The [`ImageStore`] abstraction over one flat directory of image files
//! - Atomic writes, including create-only writes for name claiming
//! - A local filesystem backend
//! - [`ImageDirectories`], the set of managed directories built from config

pub mod backends;
pub mod error;
pub mod traits;

pub use backends::filesystem::FilesystemBackend;
pub use error::{StorageError, StorageResult};
pub use traits::{ImageStore, ObjectMeta};

use std::sync::Arc;
use tessera_core::ManagedDirectory;
use tessera_core::config::StorageConfig;

/// Handles to every managed directory.
#[derive(Clone)]
pub struct ImageDirectories {
    pub cache: Arc<dyn ImageStore>,
    pub avatar: Arc<dyn ImageStore>,
    pub post_image: Arc<dyn ImageStore>,
}

impl ImageDirectories {
    pub fn new(
        cache: Arc<dyn ImageStore>,
        avatar: Arc<dyn ImageStore>,
        post_image: Arc<dyn ImageStore>,
    ) -> Self {
        Self {
            cache,
            avatar,
            post_image,
        }
    }

    /// Store backing a managed directory.
    pub fn for_dir(&self, dir: ManagedDirectory) -> &Arc<dyn ImageStore> {
        match dir {
            ManagedDirectory::Cache => &self.cache,
            ManagedDirectory::Avatar => &self.avatar,
            ManagedDirectory::PostImage => &self.post_image,
        }
    }

    /// Check every directory is reachable.
    pub async fn health_check(&self) -> StorageResult<()> {
        for dir in ManagedDirectory::ALL {
            self.for_dir(dir).health_check().await?;
        }
        Ok(())
    }
}

/// Open the managed directories from configuration, creating them if needed.
pub async fn from_config(config: &StorageConfig) -> StorageResult<ImageDirectories> {
    config.validate().map_err(StorageError::Config)?;

    let open = |dir: ManagedDirectory| {
        let path = config.path_for(dir).to_path_buf();
        async move {
            let backend = FilesystemBackend::new(path).await?;
            Ok::<Arc<dyn ImageStore>, StorageError>(Arc::new(backend))
        }
    };

    Ok(ImageDirectories {
        cache: open(ManagedDirectory::Cache).await?,
        avatar: open(ManagedDirectory::Avatar).await?,
        post_image: open(ManagedDirectory::PostImage).await?,
    })
}
