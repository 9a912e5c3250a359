//! Lifecycle error types.

use tessera_metadata::MetadataError;
use tessera_storage::StorageError;
use thiserror::Error;
use uuid::Uuid;

/// Broad failure classes callers branch on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// A referenced cached image or post does not exist. Never retried.
    NotFound,
    /// No free identifier was found within the attempt bound.
    ResourceExhausted,
    /// Filesystem failure not explained by absence.
    IoFailure,
    /// Metadata store failure.
    StoreFailure,
    /// Malformed caller input.
    InvalidInput,
}

/// Errors surfaced by the synchronous lifecycle paths.
#[derive(Debug, Error)]
pub enum LifecycleError {
    #[error("cached image not found: {0}")]
    ImageNotFound(String),

    #[error("post not found: {0}")]
    PostNotFound(Uuid),

    #[error("invalid image reference: {0}")]
    InvalidImageId(String),

    #[error("no free image name after {attempts} attempts")]
    ResourceExhausted { attempts: u32 },

    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("metadata error: {0}")]
    Metadata(#[from] MetadataError),
}

impl LifecycleError {
    pub fn class(&self) -> ErrorClass {
        match self {
            Self::ImageNotFound(_) | Self::PostNotFound(_) => ErrorClass::NotFound,
            Self::InvalidImageId(_) => ErrorClass::InvalidInput,
            Self::ResourceExhausted { .. } => ErrorClass::ResourceExhausted,
            Self::Storage(StorageError::InvalidKey(_)) => ErrorClass::InvalidInput,
            Self::Storage(_) => ErrorClass::IoFailure,
            Self::Metadata(_) => ErrorClass::StoreFailure,
        }
    }
}

impl From<tessera_core::Error> for LifecycleError {
    fn from(e: tessera_core::Error) -> Self {
        match e {
            tessera_core::Error::InvalidImageId(s) | tessera_core::Error::InvalidFileName(s) => {
                Self::InvalidImageId(s)
            }
            other => Self::InvalidImageId(other.to_string()),
        }
    }
}

/// Result type for lifecycle operations.
pub type LifecycleResult<T> = std::result::Result<T, LifecycleError>;
