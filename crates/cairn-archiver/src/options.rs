//! Pipeline tuning knobs

use std::time::Duration;

use cairn_config::ArchiverSection;
use cairn_core::HashAlgorithm;

/// Worker pool widths, batching and queue capacities of one pipeline
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiverOptions {
    /// Hashing pool width; disk I/O bound
    pub max_concurrent_hash: usize,
    /// Existence check pool width; bounded to avoid overloading the store
    pub max_concurrent_contains: usize,
    /// Upload pool width; network I/O bound
    pub max_concurrent_upload: usize,
    /// Items per existence check
    pub contains_batch_size: usize,
    /// Longest wait before a partial batch is flushed
    pub contains_batching_delay: Duration,
    pub hash_algorithm: HashAlgorithm,
    pub dedupe_queue: usize,
    pub hash_queue: usize,
    pub lookup_queue: usize,
    pub upload_queue: usize,
}

impl Default for ArchiverOptions {
    fn default() -> Self {
        Self::from(&ArchiverSection::default())
    }
}

impl From<&ArchiverSection> for ArchiverOptions {
    fn from(section: &ArchiverSection) -> Self {
        Self {
            max_concurrent_hash: section.max_concurrent_hash,
            max_concurrent_contains: section.max_concurrent_contains,
            max_concurrent_upload: section.max_concurrent_upload,
            contains_batch_size: section.contains_batch_size,
            contains_batching_delay: section.contains_batching_delay(),
            hash_algorithm: section.hash_algorithm,
            dedupe_queue: section.dedupe_queue,
            hash_queue: section.hash_queue,
            lookup_queue: section.lookup_queue,
            upload_queue: section.upload_queue,
        }
    }
}

impl ArchiverOptions {
    pub fn with_batching(mut self, size: usize, delay: Duration) -> Self {
        self.contains_batch_size = size;
        self.contains_batching_delay = delay;
        self
    }

    pub fn with_hash_algorithm(mut self, algorithm: HashAlgorithm) -> Self {
        self.hash_algorithm = algorithm;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let options = ArchiverOptions::default();
        assert_eq!(options.max_concurrent_hash, 5);
        assert_eq!(options.max_concurrent_contains, 64);
        assert_eq!(options.max_concurrent_upload, 8);
        assert_eq!(options.contains_batch_size, 50);
        assert_eq!(options.contains_batching_delay, Duration::from_millis(100));
        assert_eq!(options.dedupe_queue, 1024);
        assert_eq!(options.hash_queue, 10240);
        assert_eq!(options.lookup_queue, 2048);
        assert_eq!(options.upload_queue, 2048);
    }

    #[test]
    fn test_from_section() {
        let section = ArchiverSection {
            contains_batch_size: 3,
            contains_batching_delay_ms: 7,
            hash_algorithm: HashAlgorithm::Sha1,
            ..ArchiverSection::default()
        };
        let options = ArchiverOptions::from(&section);
        assert_eq!(options.contains_batch_size, 3);
        assert_eq!(options.contains_batching_delay, Duration::from_millis(7));
        assert_eq!(options.hash_algorithm, HashAlgorithm::Sha1);
    }
}
