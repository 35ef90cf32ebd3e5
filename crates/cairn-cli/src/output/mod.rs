//! Terminal output formatting.
//!
//! Keeps the look of every command consistent: colored status markers, the
//! live progress line and error rendering.

pub mod colors;
pub mod errors;
pub mod progress;

use cairn_archiver::StatsSummary;
use cairn_core::Size;

/// Output handler for consistent terminal formatting
pub struct OutputHandler {
    colors: colors::ColorSupport,
}

impl OutputHandler {
    pub fn new() -> Self {
        Self {
            colors: colors::ColorSupport::detect(),
        }
    }

    /// Print an info message
    pub fn info(&self, message: &str) {
        println!("{}", message);
    }

    /// Print a secondary, dimmed message
    pub fn detail(&self, message: &str) {
        println!("{}", self.colors.dim(message));
    }

    /// Print a success message
    pub fn success(&self, message: &str) {
        println!("{} {}", self.colors.green("✓"), message);
    }

    /// Print a warning message
    pub fn warn(&self, message: &str) {
        eprintln!("{} {}", self.colors.yellow("⚠"), message);
    }

    /// Print an error message
    pub fn error(&self, message: &str) {
        eprintln!("{} {}", self.colors.red("✗"), message);
    }

    /// Print the cache hit / upload totals of an archive run
    pub fn stats(&self, summary: &StatsSummary) {
        self.info(&format!(
            "  {} {:>6} items {:>10}",
            self.colors.green("cached  "),
            summary.hit_count,
            Size(summary.hit_bytes)
        ));
        self.info(&format!(
            "  {} {:>6} items {:>10}",
            self.colors.yellow("uploaded"),
            summary.upload_count,
            Size(summary.upload_bytes)
        ));
    }
}

impl Default for OutputHandler {
    fn default() -> Self {
        Self::new()
    }
}
