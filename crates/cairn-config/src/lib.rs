//! Configuration parsing for Cairn
//!
//! This crate handles parsing and validation of cairn.toml files and the
//! layering of global, project, environment and command line settings.

pub mod merge;
pub mod settings;

// Re-export main types
pub use merge::{ConfigLayering, ConfigLoader, ConfigSource, LoadedConfig};
pub use settings::{ArchiverSection, CairnToml, StoreSection};

use cairn_core::error::CairnError;

/// Result type for configuration operations
pub type ConfigResult<T> = Result<T, CairnError>;
