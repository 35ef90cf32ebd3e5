//! Archive items and the handles callers wait on
//!
//! An item is created for every push. Items naming a path that was already
//! pushed become duplicates of the first one (the representative) and get its
//! digest and error instead of going through the pipeline themselves.
//!
//! Locking order is always representative first, then each duplicate.

use std::fmt;
use std::io::{Read, Seek};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use cairn_core::error::CairnError;
use cairn_core::{DigestItem, HexDigest};
use cairn_store::PushToken;
use parking_lot::Mutex;
use tokio::sync::watch;

/// A seekable byte source supplied by a caller
pub trait ReadSeek: Read + Seek + Send {}

impl<T: Read + Seek + Send> ReadSeek for T {}

pub(crate) type StreamSource = Box<dyn ReadSeek>;

#[derive(Default)]
struct ItemState {
    digest: Option<DigestItem>,
    error: Option<CairnError>,
    linked: Vec<Arc<ArchiveItem>>,
    is_duplicate: bool,
    stream: Option<StreamSource>,
    token: Option<PushToken>,
}

/// One unit of work flowing through the pipeline
pub(crate) struct ArchiveItem {
    display_name: String,
    path: Option<PathBuf>,
    state: Mutex<ItemState>,
    hashed: watch::Sender<bool>,
}

impl ArchiveItem {
    fn with_state(display_name: String, path: Option<PathBuf>, state: ItemState) -> Arc<Self> {
        let (hashed, _) = watch::channel(false);
        Arc::new(Self {
            display_name,
            path,
            state: Mutex::new(state),
            hashed,
        })
    }

    pub(crate) fn from_path(display_name: impl Into<String>, path: PathBuf) -> Arc<Self> {
        Self::with_state(display_name.into(), Some(path), ItemState::default())
    }

    pub(crate) fn from_stream(display_name: impl Into<String>, stream: StreamSource) -> Arc<Self> {
        let state = ItemState {
            stream: Some(stream),
            ..ItemState::default()
        };
        Self::with_state(display_name.into(), None, state)
    }

    pub(crate) fn display_name(&self) -> &str {
        &self.display_name
    }

    /// Path used for deduplication; stream items have none
    pub(crate) fn path(&self) -> Option<&Path> {
        self.path.as_deref().filter(|path| !path.as_os_str().is_empty())
    }

    pub(crate) fn digest(&self) -> Option<DigestItem> {
        self.state.lock().digest.clone()
    }

    pub(crate) fn error(&self) -> Option<CairnError> {
        self.state.lock().error.clone()
    }

    pub(crate) fn is_hashed(&self) -> bool {
        *self.hashed.borrow()
    }

    pub(crate) async fn wait_for_hashed(&self) {
        let mut hashed = self.hashed.subscribe();
        // The sender is owned by `self` and outlives this borrow.
        let _ = hashed.wait_for(|hashed| *hashed).await;
    }

    /// Release the completion signal. Firing twice is a no-op.
    fn release(&self) {
        self.hashed.send_if_modified(|hashed| !std::mem::replace(hashed, true));
    }

    /// Link `duplicate` to this representative.
    ///
    /// The duplicate immediately inherits a digest or error that is already
    /// known and is released if so.
    ///
    /// # Panics
    ///
    /// If `duplicate` is already linked, has duplicates of its own, carries a
    /// stream or already failed.
    pub(crate) fn link(&self, duplicate: &Arc<ArchiveItem>) {
        assert!(
            !std::ptr::eq(self, Arc::as_ptr(duplicate)),
            "item {} linked to itself",
            self.display_name
        );
        let mut state = self.state.lock();
        assert!(
            !state.is_duplicate,
            "item {} is a duplicate and cannot be a representative",
            self.display_name
        );
        let mut child = duplicate.state.lock();
        assert!(
            !child.is_duplicate
                && child.linked.is_empty()
                && child.stream.is_none()
                && child.token.is_none()
                && child.error.is_none(),
            "item {} cannot be linked as a duplicate of {}",
            duplicate.display_name,
            self.display_name
        );

        child.is_duplicate = true;
        state.linked.push(Arc::clone(duplicate));

        let mut done = false;
        if let Some(error) = &state.error {
            child.error = Some(error.clone());
            done = true;
        }
        if let Some(digest) = &state.digest {
            child.digest = Some(digest.clone());
            done = true;
        }
        if done {
            duplicate.release();
        }
    }

    /// Store the digest, copy it to every duplicate and release them,
    /// releasing this item last.
    pub(crate) fn complete_hash(&self, digest: DigestItem) {
        let mut state = self.state.lock();
        debug_assert!(state.digest.is_none(), "digest of {} set twice", self.display_name);
        if state.digest.is_some() {
            return;
        }
        for duplicate in &state.linked {
            duplicate.state.lock().digest = Some(digest.clone());
            duplicate.release();
        }
        state.digest = Some(digest);
        drop(state);
        self.release();
    }

    /// Fail the item. The first error sticks and is mirrored to every
    /// duplicate; all of them are released.
    pub(crate) fn fail(&self, error: CairnError) {
        let mut state = self.state.lock();
        state.stream = None;
        if state.error.is_none() {
            for duplicate in &state.linked {
                let mut child = duplicate.state.lock();
                if child.error.is_none() {
                    child.error = Some(error.clone());
                }
            }
            state.error = Some(error);
        }
        for duplicate in &state.linked {
            duplicate.release();
        }
        drop(state);
        self.release();
    }

    pub(crate) fn take_stream(&self) -> Option<StreamSource> {
        self.state.lock().stream.take()
    }

    pub(crate) fn restore_stream(&self, stream: StreamSource) {
        self.state.lock().stream = Some(stream);
    }

    pub(crate) fn set_token(&self, token: PushToken) {
        self.state.lock().token = Some(token);
    }

    pub(crate) fn take_token(&self) -> Option<PushToken> {
        self.state.lock().token.take()
    }
}

impl fmt::Debug for ArchiveItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ArchiveItem")
            .field("display_name", &self.display_name)
            .field("path", &self.path)
            .field("hashed", &self.is_hashed())
            .finish()
    }
}

/// Caller side view of a pushed item.
///
/// Cheap to clone; every accessor may be called while the pipeline is still
/// working on the item.
#[derive(Debug, Clone)]
pub struct ItemHandle {
    item: Arc<ArchiveItem>,
}

impl ItemHandle {
    pub(crate) fn new(item: Arc<ArchiveItem>) -> Self {
        Self { item }
    }

    pub fn display_name(&self) -> &str {
        self.item.display_name()
    }

    /// Wait until the digest or an error is known.
    ///
    /// Returns immediately if that already happened.
    pub async fn wait_for_hashed(&self) {
        self.item.wait_for_hashed().await
    }

    /// True once `wait_for_hashed` would return immediately
    pub fn is_hashed(&self) -> bool {
        self.item.is_hashed()
    }

    /// Error that failed this item, if any
    pub fn error(&self) -> Option<CairnError> {
        self.item.error()
    }

    /// Content digest; empty until hashed
    pub fn digest(&self) -> HexDigest {
        self.item
            .digest()
            .map(|digest| digest.digest)
            .unwrap_or_default()
    }

    /// Full digest descriptor once hashed
    pub fn digest_item(&self) -> Option<DigestItem> {
        self.item.digest()
    }
}
