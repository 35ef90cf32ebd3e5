//! Error types and result aliases for Cairn operations.
//!
//! Provides a unified error type that covers every failure the archiver can
//! surface, with actionable messages. Errors are `Clone` because a single
//! failure is mirrored onto every item deduplicated against the same source
//! and retained by the pipeline canceler.

use std::sync::Arc;
use thiserror::Error;

/// Unified error type for all Cairn operations
#[derive(Error, Debug, Clone)]
pub enum CairnError {
    // Source errors
    #[error("Failed to hash {name}")]
    Hash {
        name: String,
        #[source]
        source: Arc<std::io::Error>,
    },

    #[error("Failed to rewind {name} to its start: {message}")]
    Seek { name: String, message: String },

    // Store errors
    #[error("Existence check for {count} items failed")]
    Contains {
        count: usize,
        #[source]
        source: Arc<CairnError>,
    },

    #[error("Upload of {name} failed")]
    Push {
        name: String,
        #[source]
        source: Arc<CairnError>,
    },

    #[error("Network error: {message}")]
    Network {
        message: String,
        #[source]
        source: Option<Arc<dyn std::error::Error + Send + Sync>>,
    },

    #[error("Store error: {message}")]
    Store { message: String },

    #[error("Integrity check failed for {name}: expected {expected}, got {actual}")]
    IntegrityFailure {
        name: String,
        expected: String,
        actual: String,
    },

    // Lifecycle errors
    #[error("Archiver is closed, no more items can be pushed")]
    Closed,

    #[error("Interrupted")]
    Interrupted,

    // Config errors
    #[error("Failed to parse cairn.toml: {message} at line {line}, column {column}")]
    TomlParse {
        message: String,
        line: usize,
        column: usize,
    },

    #[error("Configuration field '{field}' is invalid: {reason}")]
    ConfigValidation { field: String, reason: String },

    // IO errors
    #[error("IO error: {message}")]
    Io {
        message: String,
        #[source]
        source: Arc<std::io::Error>,
    },
}

/// Result type alias for Cairn operations
pub type CairnResult<T> = Result<T, CairnError>;

impl CairnError {
    /// Create an IO error from std::io::Error
    pub fn io(message: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            message: message.into(),
            source: Arc::new(source),
        }
    }

    /// Create a hashing error for the named item
    pub fn hash(name: impl Into<String>, source: std::io::Error) -> Self {
        Self::Hash {
            name: name.into(),
            source: Arc::new(source),
        }
    }

    /// Create a store error
    pub fn store(message: impl Into<String>) -> Self {
        Self::Store {
            message: message.into(),
        }
    }

    /// Wrap a failed existence check covering `count` items
    pub fn contains(count: usize, source: CairnError) -> Self {
        Self::Contains {
            count,
            source: Arc::new(source),
        }
    }

    /// Wrap a failed upload of the named item
    pub fn push(name: impl Into<String>, source: CairnError) -> Self {
        Self::Push {
            name: name.into(),
            source: Arc::new(source),
        }
    }

    /// Check if this error is recoverable by rebuilding the pipeline and retrying
    pub fn is_recoverable(&self) -> bool {
        match self {
            CairnError::Network { .. } | CairnError::Io { .. } => true,
            CairnError::Contains { source, .. } | CairnError::Push { source, .. } => {
                source.is_recoverable()
            }
            _ => false,
        }
    }

    /// Get a user-friendly suggestion for fixing this error
    pub fn suggestion(&self) -> Option<&'static str> {
        match self {
            CairnError::Hash { .. } => Some("Check that the file exists and is readable"),
            CairnError::Network { .. } => Some("Check your connection to the store and try again"),
            CairnError::Contains { .. } | CairnError::Push { .. } => {
                Some("The store rejected the request; retry the whole archive run")
            }
            CairnError::IntegrityFailure { .. } => {
                Some("The content changed while it was being archived; rerun once it is stable")
            }
            CairnError::TomlParse { .. } | CairnError::ConfigValidation { .. } => {
                Some("Fix cairn.toml or run 'cairn check' to validate it")
            }
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error;

    #[test]
    fn test_hash_error_keeps_source() {
        let err = CairnError::hash(
            "out/lib.a",
            std::io::Error::new(std::io::ErrorKind::NotFound, "missing"),
        );
        assert_eq!(err.to_string(), "Failed to hash out/lib.a");
        assert_eq!(err.source().unwrap().to_string(), "missing");
    }

    #[test]
    fn test_clone_shares_source() {
        let err = CairnError::io(
            "read failed",
            std::io::Error::new(std::io::ErrorKind::Other, "boom"),
        );
        let copy = err.clone();
        assert_eq!(err.to_string(), copy.to_string());
    }

    #[test]
    fn test_wrapped_recoverability() {
        let network = CairnError::Network {
            message: "unreachable".to_string(),
            source: None,
        };
        assert!(CairnError::contains(3, network).is_recoverable());
        assert!(!CairnError::push("a", CairnError::store("full")).is_recoverable());
        assert!(!CairnError::Interrupted.is_recoverable());
    }

    #[test]
    fn test_suggestions() {
        assert!(CairnError::Closed.suggestion().is_none());
        assert!(CairnError::ConfigValidation {
            field: "archiver.contains-batch-size".to_string(),
            reason: "must be at least 1".to_string(),
        }
        .suggestion()
        .is_some());
    }
}
