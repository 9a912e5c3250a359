use bytes::Bytes;
use std::path::PathBuf;
use std::sync::Arc;
use tempfile::TempDir;
use tessera_core::config::AppConfig;
use tessera_core::{ImageId, ManagedDirectory};
use tessera_lifecycle::ImageLifecycle;
use tessera_metadata::MetadataStore;
use tessera_storage::{FilesystemBackend, ImageDirectories, ImageStore};

use super::mocks::{FaultyMetadata, FaultyStore};

/// Lifecycle components over a temp directory and SQLite database.
///
/// Every managed directory is a [`FaultyStore`] and the metadata store a
/// [`FaultyMetadata`], all with no faults armed.
#[allow(dead_code)]
pub struct TestHarness {
    pub config: AppConfig,
    pub metadata: Arc<dyn MetadataStore>,
    pub metadata_faults: Arc<FaultyMetadata>,
    pub dirs: ImageDirectories,
    pub cache_faults: Arc<FaultyStore>,
    pub avatar_faults: Arc<FaultyStore>,
    pub post_faults: Arc<FaultyStore>,
    pub lifecycle: ImageLifecycle,
    _temp_dir: TempDir,
}

#[allow(dead_code)]
impl TestHarness {
    pub async fn new() -> Self {
        let temp_dir = tempfile::tempdir().expect("Failed to create temp directory");
        let config = AppConfig::for_testing(temp_dir.path());

        let sqlite = tessera_metadata::from_config(&config.metadata)
            .await
            .expect("Failed to open metadata store");
        let metadata_faults = FaultyMetadata::new(sqlite);
        let metadata: Arc<dyn MetadataStore> = metadata_faults.clone();

        let open = |dir: ManagedDirectory| {
            let path = config.storage.path_for(dir).to_path_buf();
            async move {
                let backend = FilesystemBackend::new(path)
                    .await
                    .expect("Failed to create storage directory");
                FaultyStore::new(Arc::new(backend))
            }
        };
        let cache_faults = open(ManagedDirectory::Cache).await;
        let avatar_faults = open(ManagedDirectory::Avatar).await;
        let post_faults = open(ManagedDirectory::PostImage).await;

        let dirs = ImageDirectories::new(
            cache_faults.clone(),
            avatar_faults.clone(),
            post_faults.clone(),
        );
        let lifecycle = ImageLifecycle::new(metadata.clone(), dirs.clone(), &config);

        Self {
            config,
            metadata,
            metadata_faults,
            dirs,
            cache_faults,
            avatar_faults,
            post_faults,
            lifecycle,
            _temp_dir: temp_dir,
        }
    }

    /// On-disk path of a file in a managed directory.
    pub fn path_of(&self, dir: ManagedDirectory, file_name: &str) -> PathBuf {
        self.config.storage.path_for(dir).join(file_name)
    }

    pub fn cache_path(&self, id: &ImageId) -> PathBuf {
        self.path_of(ManagedDirectory::Cache, id.file_name().as_str())
    }

    pub fn post_path(&self, id: &ImageId) -> PathBuf {
        self.path_of(ManagedDirectory::PostImage, id.file_name().as_str())
    }

    /// Cache an image with distinguishable contents.
    pub async fn cache(&self, contents: &'static str) -> ImageId {
        self.lifecycle
            .cache
            .cache_image(Bytes::from_static(contents.as_bytes()))
            .await
            .expect("Failed to cache image")
    }

    /// File names queued for deletion in a directory.
    pub async fn pending(&self, dir: ManagedDirectory) -> Vec<String> {
        self.metadata
            .list_pending_deletions(dir)
            .await
            .expect("Failed to list pending deletions")
            .into_iter()
            .map(|row| row.file_name)
            .collect()
    }

    pub fn store(&self, dir: ManagedDirectory) -> &Arc<dyn ImageStore> {
        self.dirs.for_dir(dir)
    }
}
