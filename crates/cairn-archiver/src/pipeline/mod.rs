//! The archiver and its four pipeline stages

mod dedupe;
mod hash;
mod lookup;
mod upload;

use std::io::{self, SeekFrom};
use std::path::PathBuf;
use std::sync::Arc;

use cairn_core::error::CairnError;
use cairn_core::HashAlgorithm;
use cairn_store::ContentStore;
use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::canceler::Canceler;
use crate::item::{ArchiveItem, ItemHandle, ReadSeek};
use crate::options::ArchiverOptions;
use crate::progress::{NoopProgress, Progress, ProgressEvent};
use crate::stats::{Stats, StatsAggregator};
use crate::ArchiverResult;

pub(crate) type ItemSender = mpsc::Sender<Arc<ArchiveItem>>;
pub(crate) type ItemReceiver = mpsc::Receiver<Arc<ArchiveItem>>;

/// State shared by every stage and worker of one pipeline
pub(crate) struct Shared {
    pub(crate) store: Arc<dyn ContentStore>,
    pub(crate) canceler: Arc<Canceler>,
    pub(crate) stats: StatsAggregator,
    pub(crate) progress: Arc<dyn Progress>,
    pub(crate) algorithm: HashAlgorithm,
}

impl Shared {
    /// Fail `item` and trip the canceler with the same error
    pub(crate) fn abort(&self, item: &ArchiveItem, error: CairnError) {
        item.fail(error.clone());
        if self.canceler.cancel(error) {
            tracing::debug!("{} stopped the archiver", item.display_name());
        }
    }
}

/// Archives content into a [`ContentStore`].
///
/// Must be created inside a tokio runtime. Call [`Archiver::close`] once every
/// item was pushed to wait for the pipeline to drain.
pub struct Archiver {
    shared: Arc<Shared>,
    submit: Mutex<Option<ItemSender>>,
    stages: tokio::sync::Mutex<Vec<JoinHandle<()>>>,
}

impl Archiver {
    pub fn new(store: Arc<dyn ContentStore>, options: ArchiverOptions) -> Self {
        Self::with_progress(store, options, Arc::new(NoopProgress))
    }

    /// Create an archiver reporting stage counters to `progress`
    pub fn with_progress(
        store: Arc<dyn ContentStore>,
        options: ArchiverOptions,
        progress: Arc<dyn Progress>,
    ) -> Self {
        let shared = Arc::new(Shared {
            store,
            canceler: Arc::new(Canceler::new()),
            stats: StatsAggregator::default(),
            progress,
            algorithm: options.hash_algorithm,
        });

        let (submit, dedupe_rx) = mpsc::channel(options.dedupe_queue.max(1));
        let (hash_tx, hash_rx) = mpsc::channel(options.hash_queue.max(1));
        let (lookup_tx, lookup_rx) = mpsc::channel(options.lookup_queue.max(1));
        let (upload_tx, upload_rx) = mpsc::channel(options.upload_queue.max(1));

        let stages = vec![
            tokio::spawn(dedupe::run(Arc::clone(&shared), dedupe_rx, hash_tx)),
            tokio::spawn(hash::run(
                Arc::clone(&shared),
                options.max_concurrent_hash,
                hash_rx,
                lookup_tx,
            )),
            tokio::spawn(lookup::run(
                Arc::clone(&shared),
                lookup::Batching {
                    width: options.max_concurrent_contains,
                    size: options.contains_batch_size.max(1),
                    delay: options.contains_batching_delay,
                },
                lookup_rx,
                upload_tx,
            )),
            tokio::spawn(upload::run(
                Arc::clone(&shared),
                options.max_concurrent_upload,
                upload_rx,
            )),
        ];

        tracing::debug!(
            "Started archiver: hash={}, contains={}, upload={}, batch={} / {:?}",
            options.max_concurrent_hash,
            options.max_concurrent_contains,
            options.max_concurrent_upload,
            options.contains_batch_size,
            options.contains_batching_delay
        );

        Self {
            shared,
            submit: Mutex::new(Some(submit)),
            stages: tokio::sync::Mutex::new(stages),
        }
    }

    /// Archive content read from a caller supplied stream.
    ///
    /// The stream is rewound to its start first. If that fails the returned
    /// handle is already completed with a [`CairnError::Seek`] error.
    pub async fn push<R>(&self, display_name: impl Into<String>, mut source: R) -> ArchiverResult<ItemHandle>
    where
        R: ReadSeek + 'static,
    {
        let display_name = display_name.into();
        match source.seek(SeekFrom::Start(0)) {
            Ok(0) => {}
            Ok(position) => {
                return Ok(failed_item(
                    display_name.clone(),
                    CairnError::Seek {
                        name: display_name,
                        message: format!("stream is at offset {} after rewinding", position),
                    },
                ))
            }
            Err(e) => {
                return Ok(failed_item(
                    display_name.clone(),
                    CairnError::Seek {
                        name: display_name,
                        message: e.to_string(),
                    },
                ))
            }
        }
        self.submit(ArchiveItem::from_stream(display_name, Box::new(source)))
            .await
    }

    /// Archive the content of a file on disk.
    ///
    /// Items naming the same path are hashed and looked up once. An empty
    /// path is rejected without entering the pipeline.
    pub async fn push_file(
        &self,
        display_name: impl Into<String>,
        path: impl Into<PathBuf>,
    ) -> ArchiverResult<ItemHandle> {
        let display_name = display_name.into();
        let path = path.into();
        if path.as_os_str().is_empty() {
            return Err(CairnError::io(
                format!("Cannot archive {}", display_name),
                io::Error::new(io::ErrorKind::InvalidInput, "empty path"),
            ));
        }
        self.submit(ArchiveItem::from_path(display_name, path))
            .await
    }

    async fn submit(&self, item: Arc<ArchiveItem>) -> ArchiverResult<ItemHandle> {
        let sender = self.submit.lock().clone().ok_or(CairnError::Closed)?;
        let handle = ItemHandle::new(Arc::clone(&item));
        sender.send(item).await.map_err(|_| CairnError::Closed)?;
        self.shared.progress.update(ProgressEvent::Found, 1);
        Ok(handle)
    }

    /// Copy of the statistics gathered so far
    pub fn stats(&self) -> Stats {
        self.shared.stats.snapshot()
    }

    /// Cancel the pipeline. Only the first reason is kept.
    pub fn cancel(&self, reason: CairnError) {
        self.shared.canceler.cancel(reason);
    }

    pub fn cancelation_reason(&self) -> Option<CairnError> {
        self.shared.canceler.reason()
    }

    /// The pipeline canceler, to wait on cancellation from outside
    pub fn canceler(&self) -> Arc<Canceler> {
        Arc::clone(&self.shared.canceler)
    }

    /// Stop accepting items, wait for every stage to drain and return the
    /// cancellation reason if the pipeline was cancelled.
    ///
    /// Calling it again returns the same result without waiting.
    pub async fn close(&self) -> ArchiverResult<()> {
        drop(self.submit.lock().take());

        let mut stages = self.stages.lock().await;
        let drained = !stages.is_empty();
        for stage in stages.drain(..) {
            if let Err(e) = stage.await {
                if e.is_panic() {
                    std::panic::resume_unwind(e.into_panic());
                }
            }
        }
        drop(stages);

        if drained {
            let summary = self.stats().summary();
            tracing::info!("Archiver closed. {}", summary);
        }
        match self.cancelation_reason() {
            Some(reason) => Err(reason),
            None => Ok(()),
        }
    }
}

impl std::fmt::Debug for Archiver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Archiver")
            .field("algorithm", &self.shared.algorithm)
            .field("canceler", &self.shared.canceler)
            .finish()
    }
}

fn failed_item(display_name: String, error: CairnError) -> ItemHandle {
    let item = ArchiveItem::from_path(display_name, PathBuf::new());
    item.fail(error);
    ItemHandle::new(item)
}

/// Forward `item` downstream; fails it if the next stage is gone
pub(crate) async fn forward(next: &ItemSender, item: Arc<ArchiveItem>) {
    if let Err(mpsc::error::SendError(item)) = next.send(item).await {
        item.fail(CairnError::Closed);
    }
}
