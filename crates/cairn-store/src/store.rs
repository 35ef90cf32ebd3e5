//! The remote store contract consumed by the archiver.

use async_trait::async_trait;
use cairn_core::DigestItem;
use tokio::io::AsyncRead;

use crate::StoreResult;

/// Readable content handed to `ContentStore::push`
pub type UploadReader = Box<dyn AsyncRead + Send + Unpin>;

/// Opaque server-side state returned for content the store does not hold yet.
///
/// It is required to upload that content later.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PushToken {
    digest: DigestItem,
    handle: String,
}

impl PushToken {
    /// Create a token for `digest`; `handle` is store specific
    pub fn new(digest: DigestItem, handle: impl Into<String>) -> Self {
        Self {
            digest,
            handle: handle.into(),
        }
    }

    /// Digest of the content this token allows to upload
    pub fn digest(&self) -> &DigestItem {
        &self.digest
    }

    /// Store specific handle (upload URL, temporary name, ...)
    pub fn handle(&self) -> &str {
        &self.handle
    }
}

/// A content-addressable store
#[async_trait]
pub trait ContentStore: Send + Sync {
    /// Check which digests are present.
    ///
    /// Returns one entry per input digest, in order: `None` when the store
    /// already holds the content, a token to upload it otherwise.
    async fn contains(&self, items: &[DigestItem]) -> StoreResult<Vec<Option<PushToken>>>;

    /// Upload the content associated with a previously issued token
    async fn push(&self, token: &PushToken, content: UploadReader) -> StoreResult<()>;
}
