//! Pluggable content hashing.
//!
//! The archiver never depends on a specific hash function: every digest is
//! produced through a `HashAlgorithm`, which yields a streaming
//! `ContentHasher`. Blake3 is the default.

use serde::{Deserialize, Serialize};
use sha1::Digest as _;
use std::fmt;
use std::io::{self, Read, Write};
use std::path::Path;
use std::str::FromStr;

use crate::error::{CairnError, CairnResult};
use crate::types::{DigestItem, HexDigest};

/// Size of the read buffer used while streaming content into a hasher
const READ_BUFFER_SIZE: usize = 64 * 1024;

/// Hash function used to address content
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HashAlgorithm {
    #[default]
    Blake3,
    Sha1,
    Sha256,
}

impl HashAlgorithm {
    /// Start a new streaming hasher
    pub fn hasher(self) -> ContentHasher {
        match self {
            HashAlgorithm::Blake3 => ContentHasher::Blake3(Box::new(blake3::Hasher::new())),
            HashAlgorithm::Sha1 => ContentHasher::Sha1(sha1::Sha1::new()),
            HashAlgorithm::Sha256 => ContentHasher::Sha256(sha2::Sha256::new()),
        }
    }

    /// Length of a hex digest produced by this algorithm
    pub fn hex_len(self) -> usize {
        match self {
            HashAlgorithm::Blake3 | HashAlgorithm::Sha256 => 64,
            HashAlgorithm::Sha1 => 40,
        }
    }

    /// Lowercase algorithm name, as written in configuration
    pub fn name(self) -> &'static str {
        match self {
            HashAlgorithm::Blake3 => "blake3",
            HashAlgorithm::Sha1 => "sha1",
            HashAlgorithm::Sha256 => "sha256",
        }
    }
}

impl fmt::Display for HashAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for HashAlgorithm {
    type Err = CairnError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "blake3" => Ok(HashAlgorithm::Blake3),
            "sha1" => Ok(HashAlgorithm::Sha1),
            "sha256" => Ok(HashAlgorithm::Sha256),
            other => Err(CairnError::ConfigValidation {
                field: "hash-algorithm".to_string(),
                reason: format!("unknown algorithm '{}', expected blake3, sha1 or sha256", other),
            }),
        }
    }
}

/// Streaming hasher for one of the supported algorithms
pub enum ContentHasher {
    Blake3(Box<blake3::Hasher>),
    Sha1(sha1::Sha1),
    Sha256(sha2::Sha256),
}

impl ContentHasher {
    /// Feed more content into the hasher
    pub fn update(&mut self, data: &[u8]) {
        match self {
            ContentHasher::Blake3(h) => {
                h.update(data);
            }
            ContentHasher::Sha1(h) => h.update(data),
            ContentHasher::Sha256(h) => h.update(data),
        }
    }

    /// Consume the hasher and return the hex digest
    pub fn finalize(self) -> HexDigest {
        let hex = match self {
            ContentHasher::Blake3(h) => h.finalize().to_hex().to_string(),
            ContentHasher::Sha1(h) => hex::encode(h.finalize()),
            ContentHasher::Sha256(h) => hex::encode(h.finalize()),
        };
        HexDigest::new(hex)
    }
}

impl Write for ContentHasher {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.update(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Hash an in-memory buffer
pub fn hash_bytes(algorithm: HashAlgorithm, data: &[u8]) -> DigestItem {
    let mut hasher = algorithm.hasher();
    hasher.update(data);
    DigestItem::new(hasher.finalize(), data.len() as u64)
}

/// Stream a reader to its end through the hasher, counting bytes as it goes
pub fn hash_reader<R: Read + ?Sized>(algorithm: HashAlgorithm, reader: &mut R) -> io::Result<DigestItem> {
    let mut hasher = algorithm.hasher();
    let mut buffer = vec![0u8; READ_BUFFER_SIZE];
    let mut size = 0u64;
    loop {
        let read = match reader.read(&mut buffer) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        };
        hasher.update(&buffer[..read]);
        size += read as u64;
    }
    Ok(DigestItem::new(hasher.finalize(), size))
}

/// Open, hash and close a file
pub fn hash_file(algorithm: HashAlgorithm, path: &Path) -> CairnResult<DigestItem> {
    let mut file = std::fs::File::open(path)
        .map_err(|e| CairnError::hash(path.display().to_string(), e))?;
    hash_reader(algorithm, &mut file).map_err(|e| CairnError::hash(path.display().to_string(), e))
}

/// Check that `data` has the digest and size the uploader announced
pub fn verify_integrity(
    algorithm: HashAlgorithm,
    name: &str,
    data: &[u8],
    expected: &DigestItem,
) -> CairnResult<()> {
    let actual = hash_bytes(algorithm, data);
    if actual.digest == expected.digest && actual.size == expected.size {
        return Ok(());
    }
    Err(CairnError::IntegrityFailure {
        name: name.to_string(),
        expected: format!("{} ({} bytes)", expected.digest, expected.size),
        actual: format!("{} ({} bytes)", actual.digest, actual.size),
    })
}


#[cfg(test)]
mod property_tests {
    use super::*;
    use proptest::prelude::*;
    use proptest::test_runner::Config as ProptestConfig;
    use std::io::Cursor;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(16))]
        #[test]
        fn streaming_matches_buffered(content in prop::collection::vec(any::<u8>(), 0..4096)) {
            for algorithm in [HashAlgorithm::Blake3, HashAlgorithm::Sha1, HashAlgorithm::Sha256] {
                let streamed = hash_reader(algorithm, &mut Cursor::new(&content)).unwrap();
                prop_assert_eq!(streamed, hash_bytes(algorithm, &content));
            }
        }
    }
}
