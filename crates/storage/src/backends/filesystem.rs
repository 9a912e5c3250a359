//! Local filesystem storage backend.

use crate::error::{StorageError, StorageResult};
use crate::traits::{ImageStore, ObjectMeta};
use async_trait::async_trait;
use bytes::Bytes;
use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::instrument;
use uuid::Uuid;

/// A managed directory on the local filesystem.
pub struct FilesystemBackend {
    root: PathBuf,
}

impl FilesystemBackend {
    /// Create a new filesystem backend, creating the directory if needed.
    pub async fn new(root: impl AsRef<Path>) -> StorageResult<Self> {
        let root = root.as_ref().to_path_buf();
        fs::create_dir_all(&root).await?;
        Ok(Self { root })
    }

    /// Get the full path for a key, with path traversal protection.
    ///
    /// Keys are plain file names directly inside the root. Symlinks are
    /// refused so a link planted in the directory cannot redirect reads or
    /// deletes outside of it.
    async fn key_path(&self, key: &str) -> StorageResult<PathBuf> {
        let mut components = Path::new(key).components();
        let single_normal = matches!(
            (components.next(), components.next()),
            (Some(Component::Normal(_)), None)
        );
        if key.is_empty() || !single_normal || key.contains(['/', '\\']) {
            return Err(StorageError::InvalidKey(format!(
                "not a plain file name: {key}"
            )));
        }

        let path = self.root.join(key);
        match fs::symlink_metadata(&path).await {
            Ok(meta) if meta.file_type().is_symlink() => Err(StorageError::InvalidKey(format!(
                "refusing to follow symlink: {key}"
            ))),
            Ok(_) => Ok(path),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(path),
            Err(err) => Err(StorageError::Io(std::io::Error::new(
                err.kind(),
                format!("failed to stat path: {err}"),
            ))),
        }
    }

    /// Sibling temp path for an atomic write to `path`.
    fn temp_path(path: &Path) -> PathBuf {
        // Use UUID to avoid conflicts during concurrent writes to the same key
        let temp_name = format!(".tmp.{}", Uuid::new_v4());
        path.with_file_name(
            path.file_name()
                .map(|n| format!("{}{}", n.to_string_lossy(), temp_name))
                .unwrap_or_else(|| temp_name.clone()),
        )
    }

    /// Write `data` to a fresh temp file and flush it to disk.
    async fn write_temp(path: &Path, data: &[u8]) -> StorageResult<PathBuf> {
        let temp_path = Self::temp_path(path);
        let result = async {
            let mut file = fs::File::create(&temp_path).await?;
            file.write_all(data).await?;
            // Ensure data is on disk before it becomes visible under the final name
            file.sync_all().await
        }
        .await;

        if let Err(e) = result {
            let _ = fs::remove_file(&temp_path).await;
            return Err(StorageError::Io(e));
        }
        Ok(temp_path)
    }
}

fn not_found_or_io(key: &str, e: std::io::Error) -> StorageError {
    if e.kind() == ErrorKind::NotFound {
        StorageError::NotFound(key.to_string())
    } else {
        StorageError::Io(e)
    }
}

#[async_trait]
impl ImageStore for FilesystemBackend {
    #[instrument(skip(self), fields(backend = "filesystem"))]
    async fn exists(&self, key: &str) -> StorageResult<bool> {
        let path = self.key_path(key).await?;
        fs::try_exists(&path).await.map_err(StorageError::Io)
    }

    #[instrument(skip(self), fields(backend = "filesystem"))]
    async fn head(&self, key: &str) -> StorageResult<ObjectMeta> {
        let path = self.key_path(key).await?;
        let metadata = fs::metadata(&path)
            .await
            .map_err(|e| not_found_or_io(key, e))?;

        Ok(ObjectMeta {
            size: metadata.len(),
            last_modified: metadata.modified().ok().map(|t| t.into()),
        })
    }

    #[instrument(skip(self), fields(backend = "filesystem"))]
    async fn get(&self, key: &str) -> StorageResult<Bytes> {
        let path = self.key_path(key).await?;
        let data = fs::read(&path).await.map_err(|e| not_found_or_io(key, e))?;
        Ok(Bytes::from(data))
    }

    #[instrument(skip(self, data), fields(backend = "filesystem", size = data.len()))]
    async fn put(&self, key: &str, data: Bytes) -> StorageResult<()> {
        let path = self.key_path(key).await?;
        let temp_path = Self::write_temp(&path, &data).await?;
        if let Err(e) = fs::rename(&temp_path, &path).await {
            let _ = fs::remove_file(&temp_path).await;
            return Err(StorageError::Io(e));
        }
        Ok(())
    }

    #[instrument(skip(self, data), fields(backend = "filesystem", size = data.len()))]
    async fn put_new(&self, key: &str, data: Bytes) -> StorageResult<()> {
        let path = self.key_path(key).await?;
        let temp_path = Self::write_temp(&path, &data).await?;

        // hard_link fails if the destination exists, which makes the claim on
        // the name atomic where a rename would silently overwrite.
        let linked = fs::hard_link(&temp_path, &path).await;
        let _ = fs::remove_file(&temp_path).await;
        match linked {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                Err(StorageError::AlreadyExists(key.to_string()))
            }
            Err(e) => Err(StorageError::Io(e)),
        }
    }

    #[instrument(skip(self), fields(backend = "filesystem"))]
    async fn delete(&self, key: &str) -> StorageResult<()> {
        let path = self.key_path(key).await?;
        fs::remove_file(&path)
            .await
            .map_err(|e| not_found_or_io(key, e))
    }

    #[instrument(skip(self), fields(backend = "filesystem"))]
    async fn list(&self) -> StorageResult<Vec<String>> {
        let mut results = Vec::new();
        let mut entries = fs::read_dir(&self.root).await?;
        while let Some(entry) = entries.next_entry().await? {
            // Use file_type() instead of path.is_file() to avoid following symlinks.
            let file_type = entry.file_type().await?;
            if file_type.is_file()
                && let Some(name) = entry.file_name().to_str()
            {
                results.push(name.to_string());
            }
        }
        results.sort();
        Ok(results)
    }

    fn backend_name(&self) -> &'static str {
        "filesystem"
    }

    #[instrument(skip(self), fields(backend = "filesystem"))]
    async fn health_check(&self) -> StorageResult<()> {
        let metadata = fs::metadata(&self.root).await.map_err(|e| {
            StorageError::Io(std::io::Error::new(
                e.kind(),
                format!("storage root not accessible: {}", e),
            ))
        })?;

        if !metadata.is_dir() {
            return Err(StorageError::Io(std::io::Error::new(
                ErrorKind::NotADirectory,
                format!("storage root is not a directory: {:?}", self.root),
            )));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_put_get_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let backend = FilesystemBackend::new(dir.path()).await.unwrap();

        let data = Bytes::from("image bytes");
        backend.put("a.webp", data.clone()).await.unwrap();
        assert!(backend.exists("a.webp").await.unwrap());
        assert_eq!(backend.get("a.webp").await.unwrap(), data);
        assert_eq!(backend.head("a.webp").await.unwrap().size, 11);
    }

    #[tokio::test]
    async fn test_put_new_refuses_existing_name() {
        let dir = tempfile::tempdir().unwrap();
        let backend = FilesystemBackend::new(dir.path()).await.unwrap();

        backend
            .put_new("taken.webp", Bytes::from("first"))
            .await
            .unwrap();
        let err = backend
            .put_new("taken.webp", Bytes::from("second"))
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::AlreadyExists(_)));

        // Original content untouched and no temp files left behind
        assert_eq!(
            backend.get("taken.webp").await.unwrap(),
            Bytes::from("first")
        );
        assert_eq!(backend.list().await.unwrap(), vec!["taken.webp".to_string()]);
    }

    #[tokio::test]
    async fn test_delete_missing_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let backend = FilesystemBackend::new(dir.path()).await.unwrap();

        backend.put("gone.webp", Bytes::from("x")).await.unwrap();
        backend.delete("gone.webp").await.unwrap();
        let err = backend.delete("gone.webp").await.unwrap_err();
        assert!(err.is_not_found());
        assert!(backend.get("gone.webp").await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn test_path_traversal_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let backend = FilesystemBackend::new(dir.path().join("cache"))
            .await
            .unwrap();

        assert!(backend.exists("../escape").await.is_err());
        assert!(backend.exists("/absolute/path").await.is_err());
        assert!(backend.exists("nested/key.webp").await.is_err());
        assert!(backend.exists("..").await.is_err());
        assert!(backend.exists("").await.is_err());

        assert!(backend.exists("valid.webp").await.is_ok());
    }

    #[tokio::test]
    #[cfg(unix)]
    async fn test_symlink_rejected() {
        use std::os::unix::fs::symlink;

        let dir = tempfile::tempdir().unwrap();
        let outside_dir = tempfile::tempdir().unwrap();
        let outside_file = outside_dir.path().join("secret.webp");
        std::fs::write(&outside_file, "secret data").unwrap();

        let backend = FilesystemBackend::new(dir.path()).await.unwrap();
        symlink(&outside_file, dir.path().join("link.webp")).unwrap();

        let result = backend.delete("link.webp").await;
        assert!(matches!(result, Err(StorageError::InvalidKey(_))));
        assert!(outside_file.exists());
        // Symlinks are not listed either
        assert!(backend.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_list_skips_directories() {
        let dir = tempfile::tempdir().unwrap();
        let backend = FilesystemBackend::new(dir.path()).await.unwrap();
        std::fs::create_dir(dir.path().join("subdir")).unwrap();
        backend.put("b.webp", Bytes::from("b")).await.unwrap();
        backend.put("a.webp", Bytes::from("a")).await.unwrap();

        assert_eq!(
            backend.list().await.unwrap(),
            vec!["a.webp".to_string(), "b.webp".to_string()]
        );
    }

    #[tokio::test]
    async fn test_health_check() {
        let dir = tempfile::tempdir().unwrap();
        let backend = FilesystemBackend::new(dir.path()).await.unwrap();
        backend.health_check().await.unwrap();
    }
}
