//! In-memory content store
//!
//! Keeps every blob in a `DashMap` keyed by digest. Useful for dry runs and
//! as the store behind archiver tests.

use async_trait::async_trait;
use cairn_core::error::CairnError;
use cairn_core::utils::hash::{hash_bytes, verify_integrity};
use cairn_core::{DigestItem, HashAlgorithm, HexDigest};
use dashmap::DashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::io::AsyncReadExt;

use crate::store::{ContentStore, PushToken, UploadReader};
use crate::StoreResult;

/// Content store backed by process memory
#[derive(Debug)]
pub struct MemoryStore {
    algorithm: HashAlgorithm,
    blobs: DashMap<HexDigest, Vec<u8>>,
    contains_calls: AtomicUsize,
    pushes: AtomicUsize,
}

impl MemoryStore {
    /// Create an empty store verifying uploads with `algorithm`
    pub fn new(algorithm: HashAlgorithm) -> Self {
        Self {
            algorithm,
            blobs: DashMap::new(),
            contains_calls: AtomicUsize::new(0),
            pushes: AtomicUsize::new(0),
        }
    }

    /// Seed the store with content, returning its digest
    pub fn insert(&self, content: &[u8]) -> DigestItem {
        let item = hash_bytes(self.algorithm, content);
        self.blobs.insert(item.digest.clone(), content.to_vec());
        item
    }

    /// Get stored content by digest
    pub fn get(&self, digest: &HexDigest) -> Option<Vec<u8>> {
        self.blobs.get(digest).map(|entry| entry.value().clone())
    }

    /// Number of distinct blobs held
    pub fn len(&self) -> usize {
        self.blobs.len()
    }

    /// Check if the store is empty
    pub fn is_empty(&self) -> bool {
        self.blobs.is_empty()
    }

    /// Number of `contains` queries served
    pub fn contains_calls(&self) -> usize {
        self.contains_calls.load(Ordering::SeqCst)
    }

    /// Number of successful uploads
    pub fn pushes(&self) -> usize {
        self.pushes.load(Ordering::SeqCst)
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new(HashAlgorithm::default())
    }
}

#[async_trait]
impl ContentStore for MemoryStore {
    async fn contains(&self, items: &[DigestItem]) -> StoreResult<Vec<Option<PushToken>>> {
        self.contains_calls.fetch_add(1, Ordering::SeqCst);
        Ok(items
            .iter()
            .map(|item| {
                if self.blobs.contains_key(&item.digest) {
                    None
                } else {
                    Some(PushToken::new(item.clone(), item.digest.to_string()))
                }
            })
            .collect())
    }

    async fn push(&self, token: &PushToken, mut content: UploadReader) -> StoreResult<()> {
        let mut data = Vec::with_capacity(token.digest().size as usize);
        content
            .read_to_end(&mut data)
            .await
            .map_err(|e| CairnError::io(format!("Failed to read upload {}", token.handle()), e))?;

        verify_integrity(self.algorithm, token.handle(), &data, token.digest())?;

        self.blobs.insert(token.digest().digest.clone(), data);
        self.pushes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}


#[cfg(test)]
mod property_tests {
    use super::*;
    use proptest::prelude::*;
    use proptest::test_runner::Config as ProptestConfig;
    use std::io::Cursor;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(32))]
        #[test]
        fn pushed_blobs_are_found(
            blobs in prop::collection::vec(prop::collection::vec(any::<u8>(), 0..2048), 1..8)
        ) {
            let runtime = tokio::runtime::Builder::new_current_thread().build().unwrap();
            runtime.block_on(async {
                let store = MemoryStore::default();
                let items: Vec<DigestItem> = blobs
                    .iter()
                    .map(|blob| hash_bytes(HashAlgorithm::Blake3, blob))
                    .collect();

                let tokens = store.contains(&items).await.unwrap();
                for (blob, token) in blobs.iter().zip(tokens) {
                    let token = token.expect("empty store misses every digest");
                    store
                        .push(&token, Box::new(Cursor::new(blob.clone())))
                        .await
                        .unwrap();
                }

                let tokens = store.contains(&items).await.unwrap();
                assert!(tokens.iter().all(Option::is_none));
                for (blob, item) in blobs.iter().zip(&items) {
                    assert_eq!(&store.get(&item.digest).unwrap(), blob);
                }
            });
        }
    }
}
