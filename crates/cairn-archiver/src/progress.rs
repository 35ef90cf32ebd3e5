//! Progress reporting hooks
//!
//! The pipeline reports how many items enter and leave each stage. Reporters
//! are write-only observers and never influence the pipeline.

use std::sync::atomic::{AtomicU64, Ordering};

/// Per-stage counters bumped by the pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProgressEvent {
    /// Item pushed by a caller
    Found,
    /// Representative queued for hashing
    ToHash,
    Hashed,
    /// Hashed item queued for an existence check
    ToLookup,
    LookedUp,
    /// Missing item queued for upload
    ToUpload,
    Uploaded,
}

impl ProgressEvent {
    pub const ALL: [ProgressEvent; 7] = [
        ProgressEvent::Found,
        ProgressEvent::ToHash,
        ProgressEvent::Hashed,
        ProgressEvent::ToLookup,
        ProgressEvent::LookedUp,
        ProgressEvent::ToUpload,
        ProgressEvent::Uploaded,
    ];

    /// Label used in logs and summaries
    pub fn label(self) -> &'static str {
        match self {
            ProgressEvent::Found => "found",
            ProgressEvent::ToHash => "to hash",
            ProgressEvent::Hashed => "hashed",
            ProgressEvent::ToLookup => "to lookup",
            ProgressEvent::LookedUp => "looked up",
            ProgressEvent::ToUpload => "to upload",
            ProgressEvent::Uploaded => "uploaded",
        }
    }

    fn index(self) -> usize {
        self as usize
    }
}

/// Receiver of progress events
pub trait Progress: Send + Sync {
    fn update(&self, event: ProgressEvent, count: u64);
}

/// Ignores every event
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopProgress;

impl Progress for NoopProgress {
    fn update(&self, _event: ProgressEvent, _count: u64) {}
}

/// Emits every event as a `trace!` log line
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingProgress;

impl Progress for TracingProgress {
    fn update(&self, event: ProgressEvent, count: u64) {
        tracing::trace!(stage = event.label(), count, "progress");
    }
}

/// Accumulates events into atomic counters
#[derive(Debug, Default)]
pub struct CounterProgress {
    counters: [AtomicU64; 7],
}

impl CounterProgress {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current value of the counter for `event`
    pub fn get(&self, event: ProgressEvent) -> u64 {
        self.counters[event.index()].load(Ordering::Relaxed)
    }
}

impl Progress for CounterProgress {
    fn update(&self, event: ProgressEvent, count: u64) {
        self.counters[event.index()].fetch_add(count, Ordering::Relaxed);
    }
}
