//! Content digest descriptors.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::Size;

/// Lowercase hexadecimal content digest. Empty until computed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct HexDigest(String);

impl HexDigest {
    /// Wrap an already hex-encoded digest
    pub fn new(hex: impl Into<String>) -> Self {
        Self(hex.into())
    }

    /// Digest as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// True until a digest has been computed
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Check that the digest is `len` lowercase hex characters
    pub fn is_valid(&self, len: usize) -> bool {
        self.0.len() == len
            && self
                .0
                .bytes()
                .all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b))
    }
}

impl fmt::Display for HexDigest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for HexDigest {
    fn from(hex: String) -> Self {
        Self(hex)
    }
}

impl AsRef<str> for HexDigest {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Digest of a piece of content: hash, whether it is fully known, and size.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DigestItem {
    /// Hex digest of the content
    pub digest: HexDigest,
    /// Set once the whole content went through the hash function
    pub hashed: bool,
    /// Content size in bytes
    pub size: u64,
}

impl DigestItem {
    /// Create a digest for fully hashed content
    pub fn new(digest: HexDigest, size: u64) -> Self {
        Self {
            digest,
            hashed: true,
            size,
        }
    }

    /// Content size as a `Size`
    pub fn size(&self) -> Size {
        Size(self.size)
    }
}
