//! Stage 2: hash representatives on a bounded pool

use std::io::{Seek, SeekFrom};
use std::sync::Arc;

use cairn_core::error::CairnError;
use cairn_core::utils::hash::{hash_file, hash_reader};
use cairn_core::DigestItem;

use crate::item::ArchiveItem;
use crate::pool::WorkerPool;
use crate::progress::ProgressEvent;
use crate::ArchiverResult;

use super::{forward, ItemReceiver, ItemSender, Shared};

pub(super) async fn run(shared: Arc<Shared>, width: usize, mut queued: ItemReceiver, lookup: ItemSender) {
    let mut pool = WorkerPool::new("hash", width, Arc::clone(&shared.canceler));

    while let Some(item) = queued.recv().await {
        let job = {
            let shared = Arc::clone(&shared);
            let item = Arc::clone(&item);
            let lookup = lookup.clone();
            async move {
                match hash_item(&shared, &item).await {
                    Ok(digest) => {
                        item.complete_hash(digest);
                        shared.progress.update(ProgressEvent::Hashed, 1);
                        shared.progress.update(ProgressEvent::ToLookup, 1);
                        forward(&lookup, item).await;
                    }
                    Err(e) => shared.abort(&item, e),
                }
            }
        };
        pool.schedule(job, move |reason| item.fail(reason)).await;
    }

    pool.wait().await;
}

/// Hash the item's file, or its stream which is rewound afterwards
async fn hash_item(shared: &Shared, item: &Arc<ArchiveItem>) -> ArchiverResult<DigestItem> {
    let algorithm = shared.algorithm;
    let name = item.display_name().to_string();

    if let Some(path) = item.path() {
        let path = path.to_path_buf();
        return tokio::task::spawn_blocking(move || hash_file(algorithm, &path))
            .await
            .map_err(|e| CairnError::store(format!("hashing task failed: {}", e)))?;
    }

    let Some(mut stream) = item.take_stream() else {
        return Err(CairnError::store(format!("{} has no content to hash", name)));
    };
    let (stream, result) = tokio::task::spawn_blocking(move || {
        let result = hash_reader(algorithm, &mut stream)
            .map_err(|e| CairnError::hash(&name, e))
            .and_then(|digest| match stream.seek(SeekFrom::Start(0)) {
                Ok(0) => Ok(digest),
                Ok(position) => Err(CairnError::Seek {
                    name: name.clone(),
                    message: format!("stream is at offset {} after rewinding", position),
                }),
                Err(e) => Err(CairnError::Seek {
                    name: name.clone(),
                    message: e.to_string(),
                }),
            });
        (stream, result)
    })
    .await
    .map_err(|e| CairnError::store(format!("hashing task failed: {}", e)))?;

    if result.is_ok() {
        item.restore_stream(stream);
    }
    result
}
