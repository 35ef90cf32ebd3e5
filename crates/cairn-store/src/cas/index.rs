//! Blob index of an `FsStore`
//!
//! The blobs themselves are the source of truth. The index only records when
//! each blob arrived and when a lookup last found it, and is rebuilt empty if
//! it cannot be read.

use cairn_core::error::CairnError;
use cairn_core::{HexDigest, Size};
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::StoreResult;

/// What the index knows about one stored blob
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlobRecord {
    pub digest: HexDigest,
    pub size: u64,
    pub stored_at: DateTime<Utc>,
    /// Last time an existence check found the blob
    pub last_hit: Option<DateTime<Utc>>,
}

impl BlobRecord {
    pub fn new(digest: HexDigest, size: u64) -> Self {
        Self {
            digest,
            size,
            stored_at: Utc::now(),
            last_hit: None,
        }
    }
}

#[derive(Debug)]
pub struct BlobIndex {
    records: DashMap<HexDigest, BlobRecord>,
    path: PathBuf,
}

impl BlobIndex {
    /// Open the index at `path`, starting empty if it is missing or unreadable
    pub fn open<P: AsRef<Path>>(path: P) -> StoreResult<Self> {
        let path = path.as_ref().to_path_buf();
        let records = DashMap::new();

        if path.exists() {
            let content = fs::read_to_string(&path)
                .map_err(|e| CairnError::io(format!("Failed to read {}", path.display()), e))?;
            match serde_json::from_str::<Vec<BlobRecord>>(&content) {
                Ok(loaded) => {
                    for record in loaded {
                        records.insert(record.digest.clone(), record);
                    }
                }
                Err(e) => tracing::warn!("Ignoring unreadable index {}: {}", path.display(), e),
            }
        }

        Ok(Self { records, path })
    }

    pub fn record_upload(&self, digest: &HexDigest, size: u64) {
        self.records
            .entry(digest.clone())
            .or_insert_with(|| BlobRecord::new(digest.clone(), size));
    }

    /// Note a lookup hit. Blobs stored before the index existed get a record now.
    pub fn record_hit(&self, digest: &HexDigest, size: u64) {
        let now = Utc::now();
        self.records
            .entry(digest.clone())
            .or_insert_with(|| BlobRecord::new(digest.clone(), size))
            .last_hit = Some(now);
    }

    pub fn get(&self, digest: &HexDigest) -> Option<BlobRecord> {
        self.records.get(digest).map(|record| record.value().clone())
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Total size of the indexed blobs
    pub fn total_size(&self) -> Size {
        self.records.iter().map(|record| Size(record.size)).sum()
    }

    /// Write the index next to the blobs, replacing the previous file
    pub fn save(&self) -> StoreResult<()> {
        let mut records: Vec<BlobRecord> =
            self.records.iter().map(|record| record.value().clone()).collect();
        records.sort_by(|a, b| a.digest.cmp(&b.digest));

        let content = serde_json::to_string_pretty(&records)
            .map_err(|e| CairnError::store(format!("Failed to serialize index: {}", e)))?;

        let partial = self.path.with_extension("json.partial");
        fs::write(&partial, content)
            .map_err(|e| CairnError::io(format!("Failed to write {}", partial.display()), e))?;
        fs::rename(&partial, &self.path)
            .map_err(|e| CairnError::io(format!("Failed to replace {}", self.path.display()), e))
    }
}
