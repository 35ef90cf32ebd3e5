//! Content-addressable stores for Cairn
//!
//! This crate defines the `ContentStore` collaborator the archiver talks to,
//! plus two implementations: an in-memory store and a local directory store
//! laid out by digest.

pub mod cas;
pub mod memory;
pub mod store;

// Re-export main types
pub use cas::{BlobIndex, BlobRecord, FsStore};
pub use memory::MemoryStore;
pub use store::{ContentStore, PushToken, UploadReader};

use cairn_core::error::CairnError;

/// Result type for store operations
pub type StoreResult<T> = Result<T, CairnError>;
