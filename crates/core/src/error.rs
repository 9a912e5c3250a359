//! Error types for the core domain.

use thiserror::Error;

/// Core domain error type.
#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid image id: {0}")]
    InvalidImageId(String),

    #[error("invalid file name: {0}")]
    InvalidFileName(String),

    #[error("unknown managed directory: {0}")]
    UnknownDirectory(String),
}

/// Result type alias for core operations.
pub type Result<T> = std::result::Result<T, Error>;
