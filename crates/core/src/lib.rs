//! Core domain types and shared logic for the Tessera image lifecycle.
//!
//! This crate defines the canonical data model used across all other crates:
//! - Image identifiers and their on-disk file names
//! - The managed directories images move between
//! - Application configuration

pub mod config;
pub mod directory;
pub mod error;
pub mod image;

pub use directory::ManagedDirectory;
pub use error::{Error, Result};
pub use image::{DEFAULT_AVATAR_FILE_NAME, IMAGE_EXTENSION, ImageFileName, ImageId};

/// Default lifetime of a cached image: 1 day.
pub const DEFAULT_CACHE_TTL_SECS: u64 = 24 * 60 * 60;

/// Default number of identifiers the naming allocator tries before giving up.
pub const DEFAULT_MAX_NAME_ATTEMPTS: u32 = 16;
