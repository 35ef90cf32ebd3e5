//! Local directory content-addressable store
//!
//! This module provides a `ContentStore` that keeps blobs on disk under
//! their digest, along with a JSON index of stored entries.

pub mod index;
pub mod store;

// Re-export main types
pub use index::{BlobIndex, BlobRecord};
pub use store::FsStore;
