//! cairn.toml configuration parsing and serialization

use cairn_core::error::CairnError;
use cairn_core::HashAlgorithm;
use camino::{Utf8Path, Utf8PathBuf};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::ConfigResult;

/// Complete cairn.toml configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CairnToml {
    /// Pipeline tuning
    pub archiver: ArchiverSection,

    /// Destination store
    pub store: StoreSection,
}

/// `[archiver]` section
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case", deny_unknown_fields)]
pub struct ArchiverSection {
    /// Concurrent hashing jobs (disk I/O bound)
    pub max_concurrent_hash: usize,

    /// Concurrent existence checks (bounded to avoid overloading the server)
    pub max_concurrent_contains: usize,

    /// Concurrent uploads (network I/O bound)
    pub max_concurrent_upload: usize,

    /// Maximum number of digests per existence check
    pub contains_batch_size: usize,

    /// Longest time a partial batch waits before being flushed
    pub contains_batching_delay_ms: u64,

    /// Content hash function
    pub hash_algorithm: HashAlgorithm,

    /// Capacity of the submission queue
    pub dedupe_queue: usize,

    /// Capacity of the queue feeding the hashers
    pub hash_queue: usize,

    /// Capacity of the queue feeding the existence checks
    pub lookup_queue: usize,

    /// Capacity of the queue feeding the uploaders
    pub upload_queue: usize,
}

impl Default for ArchiverSection {
    fn default() -> Self {
        Self {
            max_concurrent_hash: 5,
            max_concurrent_contains: 64,
            max_concurrent_upload: 8,
            contains_batch_size: 50,
            contains_batching_delay_ms: 100,
            hash_algorithm: HashAlgorithm::Blake3,
            dedupe_queue: 1024,
            hash_queue: 10240,
            lookup_queue: 2048,
            upload_queue: 2048,
        }
    }
}

impl ArchiverSection {
    /// Batching delay as a `Duration`
    pub fn contains_batching_delay(&self) -> Duration {
        Duration::from_millis(self.contains_batching_delay_ms)
    }
}

/// `[store]` section
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StoreSection {
    /// Directory of the local content-addressable store
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<Utf8PathBuf>,
}

/// Parse a TOML document into a raw table, keeping error locations
pub fn parse_table(content: &str) -> ConfigResult<toml::Table> {
    content
        .parse::<toml::Table>()
        .map_err(|e| toml_error(content, &e))
}

/// Turn a merged raw table into a validated configuration
pub fn from_table(table: toml::Table, content: Option<&str>) -> ConfigResult<CairnToml> {
    let config: CairnToml = toml::Value::Table(table)
        .try_into()
        .map_err(|e: toml::de::Error| toml_error(content.unwrap_or_default(), &e))?;
    validate_config(&config)?;
    Ok(config)
}

/// Parse TOML string to CairnToml configuration
pub fn parse_cairn_toml(content: &str) -> ConfigResult<CairnToml> {
    let config: CairnToml = toml::from_str(content).map_err(|e| toml_error(content, &e))?;
    validate_config(&config)?;
    Ok(config)
}

/// Serialize CairnToml to TOML string
pub fn serialize_cairn_toml(config: &CairnToml) -> ConfigResult<String> {
    toml::to_string_pretty(config).map_err(|e| CairnError::TomlParse {
        message: format!("TOML serialization error: {}", e),
        line: 0,
        column: 0,
    })
}

/// Validate configuration completeness
pub fn validate_config(config: &CairnToml) -> ConfigResult<()> {
    let archiver = &config.archiver;
    let positive = [
        ("archiver.max-concurrent-hash", archiver.max_concurrent_hash),
        ("archiver.max-concurrent-contains", archiver.max_concurrent_contains),
        ("archiver.max-concurrent-upload", archiver.max_concurrent_upload),
        ("archiver.contains-batch-size", archiver.contains_batch_size),
        ("archiver.dedupe-queue", archiver.dedupe_queue),
        ("archiver.hash-queue", archiver.hash_queue),
        ("archiver.lookup-queue", archiver.lookup_queue),
        ("archiver.upload-queue", archiver.upload_queue),
    ];
    for (field, value) in positive {
        if value == 0 {
            return Err(CairnError::ConfigValidation {
                field: field.to_string(),
                reason: "must be at least 1".to_string(),
            });
        }
    }

    if let Some(path) = &config.store.path {
        if path.as_str().is_empty() {
            return Err(CairnError::ConfigValidation {
                field: "store.path".to_string(),
                reason: "must not be empty".to_string(),
            });
        }
    }

    Ok(())
}

/// Load and parse cairn.toml from file path
pub async fn load_from_file(path: &Utf8Path) -> ConfigResult<CairnToml> {
    let content = read_file(path).await?;
    parse_cairn_toml(&content).map_err(|e| in_file(path, e))
}

pub(crate) async fn read_file(path: &Utf8Path) -> ConfigResult<String> {
    tokio::fs::read_to_string(path)
        .await
        .map_err(|e| CairnError::io(format!("Failed to read {}", path), e))
}

/// Prefix parse and validation messages with the file they came from
pub(crate) fn in_file(path: &Utf8Path, error: CairnError) -> CairnError {
    match error {
        CairnError::TomlParse {
            message,
            line,
            column,
        } => CairnError::TomlParse {
            message: format!("in {}: {}", path, message),
            line,
            column,
        },
        CairnError::ConfigValidation { field, reason } => CairnError::ConfigValidation {
            field,
            reason: format!("{} (in {})", reason, path),
        },
        other => other,
    }
}

fn toml_error(content: &str, error: &toml::de::Error) -> CairnError {
    let (line, column) = error
        .span()
        .map(|span| line_column(content, span.start))
        .unwrap_or((0, 0));
    CairnError::TomlParse {
        message: error.message().to_string(),
        line,
        column,
    }
}

/// 1-based line and column of a byte offset
fn line_column(content: &str, offset: usize) -> (usize, usize) {
    let offset = offset.min(content.len());
    let before = &content[..offset];
    let line = before.matches('\n').count() + 1;
    let column = before.rsplit('\n').next().map_or(0, |tail| tail.chars().count()) + 1;
    (line, column)
}
