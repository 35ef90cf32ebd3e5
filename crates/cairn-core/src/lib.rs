//! # cairn-core
//!
//! Core types and utilities shared across all Cairn crates.
//!
//! This crate provides:
//! - `CairnError` enum for unified error handling
//! - Digest descriptors (`HexDigest`, `DigestItem`) and the `Size` byte count
//! - Pluggable content hashing (`HashAlgorithm`, `ContentHasher`)
//!
//! ## Architecture
//!
//! The crate is organized into modules:
//! - `types`: Core data types (digests, sizes)
//! - `error`: Error types and result aliases
//! - `utils`: Hashing helpers

pub mod error;
pub mod types;
pub mod utils;

// Re-export commonly used types
pub use error::{CairnError, CairnResult};
pub use types::{DigestItem, HexDigest, Size};
pub use utils::hash::{ContentHasher, HashAlgorithm};
