//! Configuration types shared across crates.

use crate::ManagedDirectory;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use time::Duration;

/// Storage roots of the managed directories.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Temporary holding area for uploaded images not yet attached to a post.
    #[serde(default = "default_cache_path")]
    pub cache_path: PathBuf,
    /// User avatars.
    #[serde(default = "default_avatar_path")]
    pub avatar_path: PathBuf,
    /// Images attached to published posts.
    #[serde(default = "default_post_image_path")]
    pub post_image_path: PathBuf,
}

fn default_cache_path() -> PathBuf {
    PathBuf::from("./data/images/cache")
}

fn default_avatar_path() -> PathBuf {
    PathBuf::from("./data/images/avatars")
}

fn default_post_image_path() -> PathBuf {
    PathBuf::from("./data/images/posts")
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            cache_path: default_cache_path(),
            avatar_path: default_avatar_path(),
            post_image_path: default_post_image_path(),
        }
    }
}

impl StorageConfig {
    /// Build a configuration with all three directories under one root.
    pub fn under(root: impl AsRef<Path>) -> Self {
        let root = root.as_ref();
        Self {
            cache_path: root.join("cache"),
            avatar_path: root.join("avatars"),
            post_image_path: root.join("posts"),
        }
    }

    /// Root path for a managed directory.
    pub fn path_for(&self, dir: ManagedDirectory) -> &Path {
        match dir {
            ManagedDirectory::Cache => &self.cache_path,
            ManagedDirectory::Avatar => &self.avatar_path,
            ManagedDirectory::PostImage => &self.post_image_path,
        }
    }

    /// Validate storage configuration invariants.
    pub fn validate(&self) -> Result<(), String> {
        let paths = [&self.cache_path, &self.avatar_path, &self.post_image_path];
        if paths.iter().any(|p| p.as_os_str().is_empty()) {
            return Err("storage paths must not be empty".to_string());
        }
        for (i, a) in paths.iter().enumerate() {
            if paths[i + 1..].contains(a) {
                return Err(format!(
                    "storage paths must be distinct, {} is used twice",
                    a.display()
                ));
            }
        }
        Ok(())
    }
}

/// Metadata store configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum MetadataConfig {
    /// SQLite database.
    Sqlite {
        /// Database file path.
        path: PathBuf,
    },
}

impl Default for MetadataConfig {
    fn default() -> Self {
        Self::Sqlite {
            path: PathBuf::from("./data/metadata.db"),
        }
    }
}

/// Upper bound for configured durations: 100 years.
///
/// Timestamps are only representable up to year 9999, so larger values would
/// overflow when added to the current time.
pub const MAX_DURATION_SECS: u64 = 100 * 365 * 24 * 60 * 60;

/// Cached image configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ImageConfig {
    /// Seconds until a cached image expires.
    #[serde(default = "default_cache_ttl_secs")]
    pub cache_ttl_secs: u64,
    /// Identifiers the naming allocator tries before failing.
    #[serde(default = "default_max_name_attempts")]
    pub max_name_attempts: u32,
}

fn default_cache_ttl_secs() -> u64 {
    crate::DEFAULT_CACHE_TTL_SECS
}

fn default_max_name_attempts() -> u32 {
    crate::DEFAULT_MAX_NAME_ATTEMPTS
}

impl Default for ImageConfig {
    fn default() -> Self {
        Self {
            cache_ttl_secs: default_cache_ttl_secs(),
            max_name_attempts: default_max_name_attempts(),
        }
    }
}

impl ImageConfig {
    /// Get the cache TTL as a Duration.
    pub fn cache_ttl(&self) -> Duration {
        // Saturate instead of wrapping; validate() keeps real values far below
        let secs = i64::try_from(self.cache_ttl_secs).unwrap_or(i64::MAX);
        Duration::seconds(secs)
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.cache_ttl_secs == 0 {
            return Err("images.cache_ttl_secs cannot be 0".to_string());
        }
        if self.cache_ttl_secs > MAX_DURATION_SECS {
            return Err(format!(
                "images.cache_ttl_secs {} exceeds maximum value {}",
                self.cache_ttl_secs, MAX_DURATION_SECS
            ));
        }
        if self.max_name_attempts == 0 {
            return Err("images.max_name_attempts cannot be 0".to_string());
        }
        Ok(())
    }
}

/// Cleanup job configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CleanupConfig {
    /// Run the cleanup job on a schedule.
    #[serde(default = "default_auto_schedule_enabled")]
    pub auto_schedule_enabled: bool,
    /// Interval in seconds between cleanup runs (default: 1 hour).
    #[serde(default = "default_cleanup_interval_secs")]
    pub interval_secs: u64,
    /// Also run the directory-scan reconciliation on every tick (default: false).
    /// Scanning lists every file in the cache and post-image directories.
    #[serde(default)]
    pub reconcile_enabled: bool,
    /// Minimum age in seconds of an unreferenced file before reconciliation
    /// queues it for deletion.
    #[serde(default = "default_reconcile_grace_period_secs")]
    pub reconcile_grace_period_secs: u64,
}

fn default_auto_schedule_enabled() -> bool {
    true
}

fn default_cleanup_interval_secs() -> u64 {
    3600 // 1 hour
}

fn default_reconcile_grace_period_secs() -> u64 {
    86400 // 1 day
}

impl Default for CleanupConfig {
    fn default() -> Self {
        Self {
            auto_schedule_enabled: default_auto_schedule_enabled(),
            interval_secs: default_cleanup_interval_secs(),
            reconcile_enabled: false,
            reconcile_grace_period_secs: default_reconcile_grace_period_secs(),
        }
    }
}

impl CleanupConfig {
    /// Get the schedule interval as a std::time::Duration.
    pub fn interval(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.interval_secs)
    }

    /// Get the reconciliation grace period as a Duration.
    pub fn reconcile_grace_period(&self) -> Duration {
        let secs = i64::try_from(self.reconcile_grace_period_secs).unwrap_or(i64::MAX);
        Duration::seconds(secs)
    }

    pub fn validate(&self) -> Result<(), String> {
        // tokio::time::interval panics on a zero period
        if self.auto_schedule_enabled && self.interval_secs == 0 {
            return Err("cleanup.interval_secs cannot be 0 when scheduling is enabled".to_string());
        }
        if self.reconcile_grace_period_secs > MAX_DURATION_SECS {
            return Err(format!(
                "cleanup.reconcile_grace_period_secs {} exceeds maximum value {}",
                self.reconcile_grace_period_secs, MAX_DURATION_SECS
            ));
        }
        Ok(())
    }
}

/// Complete application configuration.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub metadata: MetadataConfig,
    #[serde(default)]
    pub images: ImageConfig,
    #[serde(default)]
    pub cleanup: CleanupConfig,
}

impl AppConfig {
    /// Create a test configuration rooted in `root`.
    ///
    /// **For testing only.** Scheduling is disabled.
    pub fn for_testing(root: impl AsRef<Path>) -> Self {
        let root = root.as_ref();
        Self {
            storage: StorageConfig::under(root.join("images")),
            metadata: MetadataConfig::Sqlite {
                path: root.join("metadata.db"),
            },
            images: ImageConfig::default(),
            cleanup: CleanupConfig {
                auto_schedule_enabled: false,
                ..CleanupConfig::default()
            },
        }
    }

    /// Validate every section.
    pub fn validate(&self) -> Result<(), String> {
        self.storage.validate()?;
        self.images.validate()?;
        self.cleanup.validate()?;
        Ok(())
    }
}
