//! # cairn
//!
//! Archives build outputs into a content-addressable store, hashing and
//! uploading each distinct piece of content once.
//!
//! This is the entry point of the CLI. It parses arguments, sets up logging
//! and the panic hook, and dispatches to the command handlers.

use std::path::PathBuf;
use std::process::ExitCode;

use cairn_core::error::{CairnError, CairnResult};
use clap::{Parser, Subcommand};
use tracing::{error, info};

mod commands;
mod output;

use commands::CommandContext;
use output::errors::ErrorFormatter;

/// Deduplicating content archiver
#[derive(Parser)]
#[command(name = "cairn", version, about = "Deduplicating content archiver")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Override a configuration key, e.g. `archiver.contains-batch-size=20`
    #[arg(long = "set", value_name = "KEY=VALUE", global = true)]
    pub overrides: Vec<String>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Archive files and directories into the store
    Archive {
        /// Files or directories to archive
        #[arg(required = true, value_name = "PATH")]
        paths: Vec<PathBuf>,

        /// Store directory (defaults to `[store] path` or .cairn/store)
        #[arg(long, env = "CAIRN_STORE_PATH")]
        store: Option<PathBuf>,

        /// Concurrent hashing jobs
        #[arg(long)]
        hash_workers: Option<usize>,

        /// Concurrent uploads
        #[arg(long)]
        upload_workers: Option<usize>,

        /// Digests per existence check
        #[arg(long)]
        batch_size: Option<usize>,

        /// Hash and look up content against an empty in-memory store
        #[arg(long)]
        dry_run: bool,
    },
    /// Validate configuration and print the effective settings
    Check,
    /// Show version information
    Version,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    setup_logging(cli.verbose);
    setup_panic_handler();

    info!("Starting cairn v{}", env!("CARGO_PKG_VERSION"));

    match run_cli(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{}", e);
            eprintln!("{}", ErrorFormatter::new().format_error(&e));
            match e {
                CairnError::Interrupted => ExitCode::from(130),
                _ => ExitCode::FAILURE,
            }
        }
    }
}

fn run_cli(cli: Cli) -> CairnResult<()> {
    let rt = tokio::runtime::Runtime::new()
        .map_err(|e| CairnError::io("Failed to create async runtime", e))?;

    rt.block_on(async {
        let ctx = CommandContext::new(cli.overrides)?;
        commands::dispatch_command(cli.command, &ctx).await
    })
}

fn setup_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        tracing_subscriber::EnvFilter::new(format!(
            "cairn={level},cairn_archiver={level},cairn_store={level},cairn_config={level}"
        ))
    });

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn setup_panic_handler() {
    std::panic::set_hook(Box::new(|panic_info| {
        error!("cairn encountered an unexpected error: {}", panic_info);
        eprintln!("cairn crashed! This is a bug.");
        eprintln!("Error: {}", panic_info);
    }));
}
