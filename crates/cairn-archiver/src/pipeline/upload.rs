//! Stage 4: upload content the store is missing

use std::io::{self, Read};
use std::sync::Arc;
use std::time::Instant;

use bytes::Bytes;
use cairn_core::error::CairnError;
use cairn_core::Size;
use cairn_store::UploadReader;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tokio_util::io::StreamReader;

use crate::item::{ArchiveItem, StreamSource};
use crate::pool::WorkerPool;
use crate::progress::ProgressEvent;
use crate::stats::UploadStat;
use crate::ArchiverResult;

use super::{ItemReceiver, Shared};

/// Bytes read from a stream source per chunk handed to the store
const UPLOAD_CHUNK_SIZE: usize = 64 * 1024;
/// Chunks buffered between the reading thread and the store
const UPLOAD_CHUNKS_IN_FLIGHT: usize = 4;

pub(super) async fn run(shared: Arc<Shared>, width: usize, mut missing: ItemReceiver) {
    let mut pool = WorkerPool::new("upload", width, Arc::clone(&shared.canceler));

    while let Some(item) = missing.recv().await {
        let job = {
            let shared = Arc::clone(&shared);
            let item = Arc::clone(&item);
            async move { upload(&shared, &item).await }
        };
        pool.schedule(job, move |reason| item.fail(reason)).await;
    }

    pool.wait().await;
}

async fn upload(shared: &Shared, item: &ArchiveItem) {
    let name = item.display_name().to_string();
    let Some(token) = item.take_token() else {
        shared.abort(item, CairnError::store(format!("no upload token for {}", name)));
        return;
    };

    let content = match open(item).await {
        Ok(content) => content,
        Err(e) => {
            shared.abort(item, e);
            return;
        }
    };

    let size = item.digest().map_or(0, |digest| digest.size);
    let start = Instant::now();
    match shared.store.push(&token, content).await {
        Ok(()) => shared.progress.update(ProgressEvent::Uploaded, 1),
        Err(e) => shared.abort(item, CairnError::push(&name, e)),
    }
    shared.stats.record_upload(UploadStat {
        duration: start.elapsed(),
        size,
        name,
    });
    tracing::debug!("Uploaded {:>7}: {}", Size(size), item.display_name());
}

/// Reopen the file, or stream the caller's reader to the store
async fn open(item: &ArchiveItem) -> ArchiverResult<UploadReader> {
    if let Some(path) = item.path() {
        let file = tokio::fs::File::open(path)
            .await
            .map_err(|e| CairnError::io(format!("Failed to open {}", path.display()), e))?;
        return Ok(Box::new(file));
    }

    match item.take_stream() {
        Some(stream) => Ok(stream_reader(stream)),
        None => Err(CairnError::store(format!(
            "{} has no content left to upload",
            item.display_name()
        ))),
    }
}

/// Feed a blocking reader to the store chunk by chunk from a blocking thread.
///
/// A read error is passed on to the store as the error of its next read.
fn stream_reader(mut stream: StreamSource) -> UploadReader {
    let (chunks, received) = mpsc::channel::<io::Result<Bytes>>(UPLOAD_CHUNKS_IN_FLIGHT);
    tokio::task::spawn_blocking(move || loop {
        let mut chunk = vec![0u8; UPLOAD_CHUNK_SIZE];
        let next = match stream.read(&mut chunk) {
            Ok(0) => return,
            Ok(read) => {
                chunk.truncate(read);
                Ok(Bytes::from(chunk))
            }
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => Err(e),
        };
        let failed = next.is_err();
        // The store dropped the reader, nobody wants the rest.
        if chunks.blocking_send(next).is_err() || failed {
            return;
        }
    });
    Box::new(StreamReader::new(ReceiverStream::new(received)))
}
