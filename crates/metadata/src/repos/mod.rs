//! Repository traits for metadata operations.

pub mod cached_images;
pub mod deletions;
pub mod posts;

pub use cached_images::CachedImageRepo;
pub use deletions::DeletionRepo;
pub use posts::PostRepo;
