//! `cairn archive`: push files and directory trees into the store

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use cairn_archiver::{Archiver, ArchiverOptions, ItemHandle};
use cairn_core::error::{CairnError, CairnResult};
use cairn_store::{ContentStore, FsStore, MemoryStore};
use camino::Utf8PathBuf;
use tracing::{debug, warn};
use walkdir::WalkDir;

use super::CommandContext;
use crate::output::colors::ColorSupport;
use crate::output::progress::TerminalProgress;

/// Failed items listed individually before the rest are summarized
const MAX_LISTED_FAILURES: usize = 10;

/// Arguments of `cairn archive`
#[derive(Debug, Default)]
pub struct ArchiveRequest {
    pub paths: Vec<PathBuf>,
    pub store: Option<PathBuf>,
    pub hash_workers: Option<usize>,
    pub upload_workers: Option<usize>,
    pub batch_size: Option<usize>,
    pub dry_run: bool,
}

impl ArchiveRequest {
    fn overrides(&self) -> CairnResult<HashMap<String, String>> {
        let mut overrides = HashMap::new();
        if let Some(workers) = self.hash_workers {
            overrides.insert("archiver.max-concurrent-hash".to_string(), workers.to_string());
        }
        if let Some(workers) = self.upload_workers {
            overrides.insert("archiver.max-concurrent-upload".to_string(), workers.to_string());
        }
        if let Some(size) = self.batch_size {
            overrides.insert("archiver.contains-batch-size".to_string(), size.to_string());
        }
        if let Some(store) = &self.store {
            let store = store.to_str().ok_or_else(|| CairnError::ConfigValidation {
                field: "--store".to_string(),
                reason: format!("{} is not valid UTF-8", store.display()),
            })?;
            overrides.insert("store.path".to_string(), store.to_string());
        }
        Ok(overrides)
    }
}

/// Archive every file named by the request
pub async fn execute(request: ArchiveRequest, ctx: &CommandContext) -> CairnResult<()> {
    let loaded = ctx.load_config(request.overrides()?).await?;
    let options = ArchiverOptions::from(&loaded.config.archiver);

    let fs_store = if request.dry_run {
        None
    } else {
        let root = store_root(ctx, loaded.config.store.path.clone());
        debug!("Using store at {}", root);
        Some(Arc::new(FsStore::new(&root, options.hash_algorithm)?))
    };
    let store: Arc<dyn ContentStore> = match &fs_store {
        Some(store) => store.clone(),
        None => Arc::new(MemoryStore::new(options.hash_algorithm)),
    };

    let progress = Arc::new(TerminalProgress::new(ColorSupport::detect().is_enabled()));
    let archiver = Archiver::with_progress(store, options, progress.clone());

    let canceler = archiver.canceler();
    let interrupt = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            canceler.cancel(CairnError::Interrupted);
        }
    });

    let handles = push_paths(&archiver, &request.paths, ctx).await;
    let result = archiver.close().await;
    interrupt.abort();
    progress.finish();

    let saved = match &fs_store {
        Some(store) => store.save_index(),
        None => Ok(()),
    };

    report_failures(&handles, ctx);
    let summary = archiver.stats().summary();
    ctx.output.stats(&summary);

    settle(result, saved)?;
    if let Some(store) = &fs_store {
        ctx.output.detail(&format!(
            "Store {} holds {} blobs ({})",
            store.root_path(),
            store.index().len(),
            store.index().total_size()
        ));
    }
    ctx.output.success(&format!("Archived {} items", handles.len()));
    Ok(())
}

/// The pipeline's error wins over a failure to save the store index
fn settle(pipeline: CairnResult<()>, index: CairnResult<()>) -> CairnResult<()> {
    match (pipeline, index) {
        (Err(e), Err(index_error)) => {
            warn!("Failed to save store index: {}", index_error);
            Err(e)
        }
        (Err(e), Ok(())) | (Ok(()), Err(e)) => Err(e),
        (Ok(()), Ok(())) => Ok(()),
    }
}

/// Store directory: explicit setting, or `.cairn/store` under the working directory
fn store_root(ctx: &CommandContext, configured: Option<Utf8PathBuf>) -> Utf8PathBuf {
    match configured {
        Some(path) if path.is_absolute() => path,
        Some(path) => ctx.cwd.join(path),
        None => ctx.cwd.join(".cairn").join("store"),
    }
}

/// Walk every path and push the files found; stops early once cancelled
async fn push_paths(archiver: &Archiver, paths: &[PathBuf], ctx: &CommandContext) -> Vec<ItemHandle> {
    let canceler = archiver.canceler();
    let mut handles = Vec::new();

    'paths: for root in paths {
        let root = if root.is_absolute() {
            root.clone()
        } else {
            ctx.cwd.as_std_path().join(root)
        };
        for entry in WalkDir::new(&root).follow_links(false).sort_by_file_name() {
            if canceler.is_cancelled() {
                break 'paths;
            }
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    warn!("Skipping unreadable entry: {}", e);
                    ctx.output.warn(&format!("Skipping unreadable entry: {}", e));
                    continue;
                }
            };
            if !entry.file_type().is_file() {
                continue;
            }

            let name = display_name(entry.path(), ctx.cwd.as_std_path());
            match archiver.push_file(name, entry.path()).await {
                Ok(handle) => handles.push(handle),
                Err(e) => {
                    warn!("Stopped pushing files: {}", e);
                    break 'paths;
                }
            }
        }
    }

    handles
}

/// Path relative to `base` when possible
fn display_name(path: &Path, base: &Path) -> String {
    path.strip_prefix(base)
        .unwrap_or(path)
        .to_string_lossy()
        .into_owned()
}

fn report_failures(handles: &[ItemHandle], ctx: &CommandContext) {
    let failed: Vec<_> = handles
        .iter()
        .filter_map(|handle| handle.error().map(|e| (handle.display_name(), e)))
        .collect();

    for (name, error) in failed.iter().take(MAX_LISTED_FAILURES) {
        ctx.output.error(&format!("{}: {}", name, error));
    }
    if failed.len() > MAX_LISTED_FAILURES {
        ctx.output.error(&format!(
            "... and {} more failed items",
            failed.len() - MAX_LISTED_FAILURES
        ));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn index_error() -> CairnError {
        CairnError::io(
            "Failed to write index",
            std::io::Error::new(std::io::ErrorKind::PermissionDenied, "read-only"),
        )
    }

    #[test]
    fn test_pipeline_error_beats_index_error() {
        let result = settle(Err(CairnError::Interrupted), Err(index_error()));
        assert!(matches!(result, Err(CairnError::Interrupted)));
    }

    #[test]
    fn test_index_error_reported_alone() {
        let result = settle(Ok(()), Err(index_error()));
        assert!(matches!(result, Err(CairnError::Io { .. })));
        assert!(settle(Ok(()), Ok(())).is_ok());
    }
}
