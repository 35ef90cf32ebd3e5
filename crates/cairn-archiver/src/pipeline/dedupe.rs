//! Stage 1: link items naming an already seen path to its representative

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use crate::item::ArchiveItem;
use crate::progress::ProgressEvent;

use super::{forward, ItemReceiver, ItemSender, Shared};

pub(super) async fn run(shared: Arc<Shared>, mut submitted: ItemReceiver, hash: ItemSender) {
    // Paths are compared as given; symlinks are not resolved.
    let mut seen: HashMap<PathBuf, Arc<ArchiveItem>> = HashMap::new();
    let mut duplicates = 0usize;

    while let Some(item) = submitted.recv().await {
        if let Some(reason) = shared.canceler.reason() {
            item.fail(reason);
            continue;
        }

        if let Some(path) = item.path() {
            if let Some(representative) = seen.get(path) {
                representative.link(&item);
                duplicates += 1;
                continue;
            }
            seen.insert(path.to_path_buf(), Arc::clone(&item));
        }

        shared.progress.update(ProgressEvent::ToHash, 1);
        forward(&hash, item).await;
    }

    tracing::debug!(
        "Dedupe stage done: {} distinct paths, {} duplicates",
        seen.len(),
        duplicates
    );
}
