//! Cooperative cancellation shared by every stage of one pipeline

use cairn_core::error::CairnError;
use parking_lot::Mutex;
use tokio::sync::watch;

/// Single-assignment cancellation cell.
///
/// The first error passed to [`Canceler::cancel`] is kept for the lifetime of
/// the pipeline; later calls are ignored.
#[derive(Debug)]
pub struct Canceler {
    reason: Mutex<Option<CairnError>>,
    tripped: watch::Sender<bool>,
}

impl Canceler {
    pub fn new() -> Self {
        let (tripped, _) = watch::channel(false);
        Self {
            reason: Mutex::new(None),
            tripped,
        }
    }

    /// Trip the canceler. Returns false if it was already tripped.
    pub fn cancel(&self, reason: CairnError) -> bool {
        {
            let mut current = self.reason.lock();
            if current.is_some() {
                return false;
            }
            tracing::warn!("Cancelling archiver: {}", reason);
            *current = Some(reason);
        }
        self.tripped.send_replace(true);
        true
    }

    /// The error that tripped the canceler, if any
    pub fn reason(&self) -> Option<CairnError> {
        self.reason.lock().clone()
    }

    pub fn is_cancelled(&self) -> bool {
        self.reason.lock().is_some()
    }

    /// Wait until the canceler trips and return its reason
    pub async fn cancelled(&self) -> CairnError {
        let mut tripped = self.tripped.subscribe();
        // The sender lives in `self`, so the channel cannot close while we wait.
        let _ = tripped.wait_for(|tripped| *tripped).await;
        self.reason().unwrap_or(CairnError::Interrupted)
    }
}

impl Default for Canceler {
    fn default() -> Self {
        Self::new()
    }
}
