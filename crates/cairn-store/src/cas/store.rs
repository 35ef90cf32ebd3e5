//! CAS store implementation
//!
//! This module provides `FsStore`, a `ContentStore` writing blobs to a local
//! directory sharded by digest prefix.

use async_trait::async_trait;
use cairn_core::error::CairnError;
use cairn_core::{DigestItem, HashAlgorithm, HexDigest};
use camino::{Utf8Path, Utf8PathBuf};
use std::fs;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::io::{AsyncReadExt, AsyncWriteExt};

use super::BlobIndex;
use crate::store::{ContentStore, PushToken, UploadReader};
use crate::StoreResult;

/// Copy buffer used while streaming uploads to disk
const COPY_BUFFER_SIZE: usize = 64 * 1024;

/// Content-addressable storage in a local directory
#[derive(Debug)]
pub struct FsStore {
    /// Root directory for storage
    root_path: Utf8PathBuf,
    /// Algorithm used to verify uploads
    algorithm: HashAlgorithm,
    /// Index for metadata
    index: Arc<BlobIndex>,
    /// Sequence used to name in-flight uploads
    next_upload: AtomicU64,
}

impl FsStore {
    /// Create a new CAS store
    pub fn new<P: AsRef<Utf8Path>>(root_path: P, algorithm: HashAlgorithm) -> StoreResult<Self> {
        let root_path = root_path.as_ref().to_path_buf();

        fs::create_dir_all(&root_path)
            .map_err(|e| CairnError::io("Failed to create store directory", e))?;

        let index = Arc::new(BlobIndex::open(root_path.join("index.json"))?);

        Ok(Self {
            root_path,
            algorithm,
            index,
            next_upload: AtomicU64::new(0),
        })
    }

    /// Get the storage path for a digest
    fn digest_to_path(&self, digest: &HexDigest) -> Utf8PathBuf {
        let hex = digest.as_str();
        if hex.len() < 4 {
            return self.root_path.join(hex);
        }
        // Store as store/ab/cd/abcd...
        self.root_path.join(&hex[0..2]).join(&hex[2..4]).join(hex)
    }

    fn temp_path(&self, token: &PushToken) -> Utf8PathBuf {
        self.root_path.join("tmp").join(format!("{}.partial", token.handle()))
    }

    /// Check if content exists in store
    pub fn contains_digest(&self, digest: &HexDigest) -> bool {
        self.digest_to_path(digest).exists()
    }

    /// Get content by digest
    pub async fn get(&self, digest: &HexDigest) -> StoreResult<Vec<u8>> {
        let path = self.digest_to_path(digest);
        tokio::fs::read(&path)
            .await
            .map_err(|e| CairnError::io(format!("Failed to read content {}", digest), e))
    }

    /// Get the root path of the store
    pub fn root_path(&self) -> &Utf8Path {
        &self.root_path
    }

    /// Metadata index of stored blobs
    pub fn index(&self) -> &BlobIndex {
        &self.index
    }

    /// Save index to disk
    pub fn save_index(&self) -> StoreResult<()> {
        self.index.save()
    }

    /// Stream `content` into `temp`, returning what was actually written
    async fn write_verified(&self, temp: &Utf8Path, mut content: UploadReader) -> StoreResult<DigestItem> {
        let mut file = tokio::fs::File::create(temp)
            .await
            .map_err(|e| CairnError::io(format!("Failed to create {}", temp), e))?;
        let mut hasher = self.algorithm.hasher();
        let mut buffer = vec![0u8; COPY_BUFFER_SIZE];
        let mut size = 0u64;

        loop {
            let read = content
                .read(&mut buffer)
                .await
                .map_err(|e| CairnError::io("Failed to read upload content", e))?;
            if read == 0 {
                break;
            }
            hasher.update(&buffer[..read]);
            file.write_all(&buffer[..read])
                .await
                .map_err(|e| CairnError::io(format!("Failed to write {}", temp), e))?;
            size += read as u64;
        }
        file.flush()
            .await
            .map_err(|e| CairnError::io(format!("Failed to flush {}", temp), e))?;

        Ok(DigestItem::new(hasher.finalize(), size))
    }
}

#[async_trait]
impl ContentStore for FsStore {
    async fn contains(&self, items: &[DigestItem]) -> StoreResult<Vec<Option<PushToken>>> {
        let mut tokens = Vec::with_capacity(items.len());
        for item in items {
            let path = self.digest_to_path(&item.digest);
            if tokio::fs::metadata(&path).await.is_ok() {
                self.index.record_hit(&item.digest, item.size);
                tokens.push(None);
            } else {
                let sequence = self.next_upload.fetch_add(1, Ordering::Relaxed);
                tokens.push(Some(PushToken::new(
                    item.clone(),
                    format!("{}-{}", item.digest, sequence),
                )));
            }
        }
        Ok(tokens)
    }

    async fn push(&self, token: &PushToken, content: UploadReader) -> StoreResult<()> {
        let temp = self.temp_path(token);
        if let Some(parent) = temp.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| CairnError::io("Failed to create upload directory", e))?;
        }

        let written = match self.write_verified(&temp, content).await {
            Ok(written) => written,
            Err(e) => {
                let _ = tokio::fs::remove_file(&temp).await;
                return Err(e);
            }
        };

        let expected = token.digest();
        if written.digest != expected.digest || written.size != expected.size {
            let _ = tokio::fs::remove_file(&temp).await;
            return Err(CairnError::IntegrityFailure {
                name: token.handle().to_string(),
                expected: format!("{} ({} bytes)", expected.digest, expected.size),
                actual: format!("{} ({} bytes)", written.digest, written.size),
            });
        }

        let path = self.digest_to_path(&expected.digest);
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| CairnError::io("Failed to create content directory", e))?;
        }
        tokio::fs::rename(&temp, &path)
            .await
            .map_err(|e| CairnError::io(format!("Failed to move upload into {}", path), e))?;

        self.index.record_upload(&expected.digest, expected.size);
        tracing::trace!("stored {} ({} bytes)", expected.digest, expected.size);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cairn_core::utils::hash::hash_bytes;
    use std::io::Cursor;
    use tempfile::tempdir;

    fn open_store(temp_dir: &tempfile::TempDir) -> FsStore {
        let store_path = Utf8PathBuf::from_path_buf(temp_dir.path().to_path_buf()).unwrap();
        FsStore::new(&store_path, HashAlgorithm::Blake3).unwrap()
    }

    async fn upload(store: &FsStore, content: &[u8]) -> DigestItem {
        let item = hash_bytes(HashAlgorithm::Blake3, content);
        let tokens = store.contains(&[item.clone()]).await.unwrap();
        let token = tokens[0].clone().expect("content should be missing");
        store
            .push(&token, Box::new(Cursor::new(content.to_vec())))
            .await
            .unwrap();
        item
    }

    #[test]
    fn test_cas_store_creation() {
        let temp_dir = tempdir().unwrap();
        let store = open_store(&temp_dir);
        assert_eq!(store.root_path().as_std_path(), temp_dir.path());
    }

    #[tokio::test]
    async fn test_push_and_get() {
        let temp_dir = tempdir().unwrap();
        let store = open_store(&temp_dir);

        let item = upload(&store, b"hello world").await;
        assert!(store.contains_digest(&item.digest));
        assert_eq!(store.get(&item.digest).await.unwrap(), b"hello world");
        assert_eq!(store.index().get(&item.digest).unwrap().size, 11);
    }

    #[tokio::test]
    async fn test_sharded_layout() {
        let temp_dir = tempdir().unwrap();
        let store = open_store(&temp_dir);

        let item = upload(&store, b"layout").await;
        let hex = item.digest.as_str();
        let expected = temp_dir.path().join(&hex[0..2]).join(&hex[2..4]).join(hex);
        assert!(expected.exists());
    }

    #[tokio::test]
    async fn test_contains_after_push_is_hit() {
        let temp_dir = tempdir().unwrap();
        let store = open_store(&temp_dir);

        let item = upload(&store, b"content").await;
        let missing = hash_bytes(HashAlgorithm::Blake3, b"other");
        let tokens = store.contains(&[item, missing]).await.unwrap();
        assert!(tokens[0].is_none());
        assert!(tokens[1].is_some());
    }

    #[tokio::test]
    async fn test_push_rejects_corrupt_upload() {
        let temp_dir = tempdir().unwrap();
        let store = open_store(&temp_dir);

        let item = hash_bytes(HashAlgorithm::Blake3, b"expected");
        let token = store.contains(&[item.clone()]).await.unwrap()[0].clone().unwrap();
        let result = store
            .push(&token, Box::new(Cursor::new(b"tampered".to_vec())))
            .await;

        assert!(matches!(result, Err(CairnError::IntegrityFailure { .. })));
        assert!(!store.contains_digest(&item.digest));
        assert!(!store.temp_path(&token).exists());
    }

    #[tokio::test]
    async fn test_index_survives_reopen() {
        let temp_dir = tempdir().unwrap();
        let item = {
            let store = open_store(&temp_dir);
            let item = upload(&store, b"persisted").await;
            store.save_index().unwrap();
            item
        };

        let store = open_store(&temp_dir);
        assert_eq!(store.index().len(), 1);
        assert!(store.contains_digest(&item.digest));
    }
}
