//! Stage 3: batched existence checks
//!
//! Hashed items accumulate into a batch that is flushed when it is full or
//! when the batching delay, armed by the first item of the batch, expires.

use std::mem;
use std::sync::Arc;
use std::time::Duration;

use cairn_core::error::CairnError;
use cairn_core::DigestItem;
use tokio::time::Instant;

use crate::item::ArchiveItem;
use crate::pool::WorkerPool;
use crate::progress::ProgressEvent;

use super::{forward, ItemReceiver, ItemSender, Shared};

/// Existence check pool width and batching triggers
#[derive(Debug, Clone, Copy)]
pub(super) struct Batching {
    pub(super) width: usize,
    pub(super) size: usize,
    pub(super) delay: Duration,
}

enum Batch {
    Empty,
    Accumulating {
        items: Vec<Arc<ArchiveItem>>,
        deadline: Instant,
    },
}

impl Batch {
    /// Add an item, returning the batch once it reached `size`
    fn push(&mut self, item: Arc<ArchiveItem>, batching: &Batching) -> Option<Vec<Arc<ArchiveItem>>> {
        match self {
            Batch::Empty => {
                let items = vec![item];
                if items.len() >= batching.size {
                    return Some(items);
                }
                *self = Batch::Accumulating {
                    items,
                    deadline: Instant::now() + batching.delay,
                };
                None
            }
            Batch::Accumulating { items, .. } => {
                items.push(item);
                if items.len() >= batching.size {
                    self.take()
                } else {
                    None
                }
            }
        }
    }

    fn deadline(&self) -> Option<Instant> {
        match self {
            Batch::Empty => None,
            Batch::Accumulating { deadline, .. } => Some(*deadline),
        }
    }

    /// Empty the batch, disarming the timer
    fn take(&mut self) -> Option<Vec<Arc<ArchiveItem>>> {
        match mem::replace(self, Batch::Empty) {
            Batch::Empty => None,
            Batch::Accumulating { items, .. } => Some(items),
        }
    }
}

pub(super) async fn run(
    shared: Arc<Shared>,
    batching: Batching,
    mut hashed: ItemReceiver,
    upload: ItemSender,
) {
    let mut pool = WorkerPool::new("contains", batching.width, Arc::clone(&shared.canceler));
    let mut batch = Batch::Empty;

    loop {
        let deadline = batch.deadline();
        let expired = async {
            match deadline {
                Some(deadline) => tokio::time::sleep_until(deadline).await,
                None => std::future::pending().await,
            }
        };

        let full = tokio::select! {
            received = hashed.recv() => match received {
                Some(item) => batch.push(item, &batching),
                None => break,
            },
            () = expired => batch.take(),
        };

        if let Some(items) = full {
            schedule(&mut pool, &shared, items, &upload).await;
        }
    }

    if let Some(items) = batch.take() {
        schedule(&mut pool, &shared, items, &upload).await;
    }
    pool.wait().await;
}

async fn schedule(
    pool: &mut WorkerPool,
    shared: &Arc<Shared>,
    items: Vec<Arc<ArchiveItem>>,
    upload: &ItemSender,
) {
    let cancelled = items.clone();
    let job = {
        let shared = Arc::clone(shared);
        let upload = upload.clone();
        async move { contains(&shared, items, &upload).await }
    };
    pool.schedule(job, move |reason| {
        for item in cancelled {
            item.fail(reason.clone());
        }
    })
    .await;
}

async fn contains(shared: &Shared, items: Vec<Arc<ArchiveItem>>, upload: &ItemSender) {
    let digests: Vec<DigestItem> = items
        .iter()
        .map(|item| item.digest().unwrap_or_default())
        .collect();

    let answer = shared.store.contains(&digests).await.and_then(|tokens| {
        if tokens.len() == digests.len() {
            Ok(tokens)
        } else {
            Err(CairnError::store(format!(
                "store answered {} entries for {} digests",
                tokens.len(),
                digests.len()
            )))
        }
    });
    let tokens = match answer {
        Ok(tokens) => tokens,
        Err(e) => {
            // A failed lookup stops the whole pipeline.
            let error = CairnError::contains(items.len(), e);
            shared.canceler.cancel(error.clone());
            for item in &items {
                item.fail(error.clone());
            }
            return;
        }
    };

    shared
        .progress
        .update(ProgressEvent::LookedUp, items.len() as u64);
    for ((item, digest), token) in items.into_iter().zip(&digests).zip(tokens) {
        match token {
            None => shared.stats.record_hit(digest.size),
            Some(token) => {
                item.set_token(token);
                shared.progress.update(ProgressEvent::ToUpload, 1);
                forward(upload, item).await;
            }
        }
    }
    tracing::debug!("Looked up {} items", digests.len());
}
