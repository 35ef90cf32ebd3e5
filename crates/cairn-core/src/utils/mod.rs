//! Utility functions and helpers.
//!
//! Common functionality used across multiple Cairn crates.

pub mod hash;

// Re-export commonly used utilities
pub use hash::{hash_bytes, hash_file, hash_reader, verify_integrity};
