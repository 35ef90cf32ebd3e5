//! Deduplicating content archiver
//!
//! Pushes files and in-memory sources to a content-addressable store through
//! a four-stage pipeline connected by bounded queues:
//!
//! 1. dedupe: items naming an already seen path are linked to the first one
//! 2. hash: representatives are hashed on a bounded worker pool
//! 3. lookup: hashed items are batched into existence checks
//! 4. upload: content the store is missing is uploaded
//!
//! Any failure trips the pipeline [`Canceler`]; every pending item is then
//! failed with the same error so callers waiting on an [`ItemHandle`] always
//! wake up.

pub mod canceler;
pub mod item;
pub mod options;
pub mod pipeline;
pub mod pool;
pub mod progress;
pub mod stats;

// Re-export main types
pub use canceler::Canceler;
pub use item::ItemHandle;
pub use options::ArchiverOptions;
pub use pipeline::Archiver;
pub use pool::WorkerPool;
pub use progress::{CounterProgress, NoopProgress, Progress, ProgressEvent, TracingProgress};
pub use stats::{Stats, StatsSummary, UploadStat};

use cairn_core::error::CairnError;

/// Result type for archiver operations
pub type ArchiverResult<T> = Result<T, CairnError>;
