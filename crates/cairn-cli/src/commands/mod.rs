//! Command implementations and dispatch logic.
//!
//! Each command is an async function taking the shared `CommandContext`.

use std::collections::HashMap;

use cairn_config::{ConfigLoader, LoadedConfig};
use cairn_core::error::{CairnError, CairnResult};
use camino::Utf8PathBuf;
use tracing::info;

pub mod archive;
pub mod check;

#[cfg(test)]
mod tests;

use crate::{output::OutputHandler, Commands};

/// Shared context for all commands
pub struct CommandContext {
    pub cwd: Utf8PathBuf,
    pub output: OutputHandler,
    /// Dotted-key overrides given with `--set`
    pub overrides: HashMap<String, String>,
    pub loader: ConfigLoader,
}

impl CommandContext {
    /// Create a context for the current directory
    pub fn new(overrides: Vec<String>) -> CairnResult<Self> {
        let cwd = std::env::current_dir()
            .map_err(|e| CairnError::io("Failed to get current directory", e))?;
        let cwd = Utf8PathBuf::from_path_buf(cwd).map_err(|path| CairnError::ConfigValidation {
            field: "cwd".to_string(),
            reason: format!("{} is not valid UTF-8", path.display()),
        })?;

        Ok(Self {
            loader: ConfigLoader::new(cwd.clone()),
            cwd,
            output: OutputHandler::new(),
            overrides: parse_overrides(&overrides)?,
        })
    }

    /// Load the layered configuration, applying `extra` on top of `--set`
    pub async fn load_config(&self, extra: HashMap<String, String>) -> CairnResult<LoadedConfig> {
        let mut overrides = self.overrides.clone();
        overrides.extend(extra);
        self.loader.load(overrides).await
    }
}

/// Split `KEY=VALUE` arguments
pub fn parse_overrides(raw: &[String]) -> CairnResult<HashMap<String, String>> {
    raw.iter()
        .map(|entry| match entry.split_once('=') {
            Some((key, value)) if !key.trim().is_empty() => {
                Ok((key.trim().to_string(), value.trim().to_string()))
            }
            _ => Err(CairnError::ConfigValidation {
                field: "--set".to_string(),
                reason: format!("expected KEY=VALUE, got '{}'", entry),
            }),
        })
        .collect()
}

/// Dispatch a command to its handler
pub async fn dispatch_command(command: Commands, ctx: &CommandContext) -> CairnResult<()> {
    match command {
        Commands::Archive {
            paths,
            store,
            hash_workers,
            upload_workers,
            batch_size,
            dry_run,
        } => {
            info!("Archiving {} paths (dry run: {})", paths.len(), dry_run);
            let request = archive::ArchiveRequest {
                paths,
                store,
                hash_workers,
                upload_workers,
                batch_size,
                dry_run,
            };
            archive::execute(request, ctx).await
        }
        Commands::Check => {
            info!("Checking configuration");
            check::execute(ctx).await
        }
        Commands::Version => show_version(ctx),
    }
}

fn show_version(ctx: &CommandContext) -> CairnResult<()> {
    ctx.output.info(&format!("cairn v{}", env!("CARGO_PKG_VERSION")));
    ctx.output.info(&format!("Built: {}", env!("CAIRN_BUILD_DATE")));
    ctx.output.info(&format!("Target: {}", env!("CAIRN_TARGET")));
    ctx.output.info(&format!("Rust: {}", env!("CAIRN_RUSTC_VERSION")));
    Ok(())
}
