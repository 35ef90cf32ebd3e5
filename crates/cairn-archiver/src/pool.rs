//! Bounded worker pool with cancellation-aware scheduling

use std::future::Future;
use std::sync::Arc;

use cairn_core::error::CairnError;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

use crate::canceler::Canceler;

/// Runs at most `width` jobs at a time.
///
/// Scheduling waits for a free slot. If the pipeline is cancelled before a
/// slot frees up, the job is dropped and its `on_cancel` callback runs with
/// the cancellation reason instead.
#[derive(Debug)]
pub struct WorkerPool {
    name: &'static str,
    slots: Arc<Semaphore>,
    tasks: JoinSet<()>,
    canceler: Arc<Canceler>,
}

impl WorkerPool {
    pub fn new(name: &'static str, width: usize, canceler: Arc<Canceler>) -> Self {
        Self {
            name,
            slots: Arc::new(Semaphore::new(width.max(1))),
            tasks: JoinSet::new(),
            canceler,
        }
    }

    /// Schedule `job`, or call `on_cancel` if the pipeline is cancelled first
    pub async fn schedule<F, C>(&mut self, job: F, on_cancel: C)
    where
        F: Future<Output = ()> + Send + 'static,
        C: FnOnce(CairnError) + Send + 'static,
    {
        self.reap_finished();

        if let Some(reason) = self.canceler.reason() {
            on_cancel(reason);
            return;
        }

        let slot = tokio::select! {
            biased;
            reason = self.canceler.cancelled() => {
                on_cancel(reason);
                return;
            }
            slot = Arc::clone(&self.slots).acquire_owned() => slot,
        };

        match slot {
            Ok(slot) => {
                self.tasks.spawn(async move {
                    job.await;
                    drop(slot);
                });
            }
            // The semaphore is never closed while the pool is alive.
            Err(_) => on_cancel(CairnError::Closed),
        }
    }

    /// Wait for every scheduled job and return the cancellation reason, if any.
    ///
    /// A panicking job is re-raised here.
    pub async fn wait(mut self) -> Option<CairnError> {
        while let Some(result) = self.tasks.join_next().await {
            if let Err(e) = result {
                if e.is_panic() {
                    std::panic::resume_unwind(e.into_panic());
                }
                tracing::warn!("{} worker was aborted", self.name);
            }
        }
        self.canceler.reason()
    }

    fn reap_finished(&mut self) {
        while let Some(result) = self.tasks.try_join_next() {
            if let Err(e) = result {
                if e.is_panic() {
                    std::panic::resume_unwind(e.into_panic());
                }
            }
        }
    }
}
