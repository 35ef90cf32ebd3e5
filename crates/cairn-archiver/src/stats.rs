//! Cache hit and upload statistics

use std::fmt;
use std::time::Duration;

use cairn_core::Size;
use parking_lot::Mutex;

/// One upload performed by the pipeline, successful or not
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadStat {
    pub duration: Duration,
    pub size: u64,
    pub name: String,
}

/// Statistics of one pipeline run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Stats {
    /// Sizes of the items the store already held
    pub hits: Vec<u64>,
    /// Uploads of the items the store was missing
    pub pushed: Vec<UploadStat>,
}

impl Stats {
    pub fn total_hits(&self) -> usize {
        self.hits.len()
    }

    pub fn total_bytes_hits(&self) -> Size {
        self.hits.iter().copied().map(Size).sum()
    }

    pub fn total_misses(&self) -> usize {
        self.pushed.len()
    }

    pub fn total_bytes_pushed(&self) -> Size {
        self.pushed.iter().map(|stat| Size(stat.size)).sum()
    }

    /// Aggregated counts and byte totals
    pub fn summary(&self) -> StatsSummary {
        StatsSummary {
            hit_count: self.total_hits(),
            hit_bytes: self.total_bytes_hits().bytes(),
            upload_count: self.total_misses(),
            upload_bytes: self.total_bytes_pushed().bytes(),
        }
    }
}

/// Point-in-time totals
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatsSummary {
    pub hit_count: usize,
    pub hit_bytes: u64,
    pub upload_count: usize,
    pub upload_bytes: u64,
}

impl fmt::Display for StatsSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Hits: {} ({}), Uploaded: {} ({})",
            self.hit_count,
            Size(self.hit_bytes),
            self.upload_count,
            Size(self.upload_bytes)
        )
    }
}

/// Lock-protected accumulator shared by the pipeline workers
#[derive(Debug, Default)]
pub(crate) struct StatsAggregator {
    stats: Mutex<Stats>,
}

impl StatsAggregator {
    pub(crate) fn record_hit(&self, size: u64) {
        self.stats.lock().hits.push(size);
    }

    pub(crate) fn record_upload(&self, stat: UploadStat) {
        self.stats.lock().pushed.push(stat);
    }

    /// Copy of the statistics gathered so far
    pub(crate) fn snapshot(&self) -> Stats {
        self.stats.lock().clone()
    }
}
