//! Core data types for Cairn archiving.
//!
//! This module provides the fundamental types used throughout Cairn:
//! - Digest descriptors identifying a byte sequence
//! - Byte sizes with human-readable formatting

pub mod digest;
pub mod size;

// Re-export all public types
pub use digest::{DigestItem, HexDigest};
pub use size::Size;
