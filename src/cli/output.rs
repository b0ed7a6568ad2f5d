//! Output formatting and progress indicators
//!
//! This module provides utilities for displaying progress bars,
//! status messages, and JSON output.

use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;

/// Create a progress bar over the build queue
pub fn create_build_bar(total: u64) -> ProgressBar {
    let pb = ProgressBar::new(total);
    let style = ProgressStyle::default_bar()
        .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} packages ({msg})")
        .map_or_else(|_| ProgressStyle::default_bar(), |s| s.progress_chars("█▓▒░"));
    pb.set_style(style);
    pb
}

/// Status message prefixes
pub mod status {
    /// Success prefix (green checkmark)
    pub const SUCCESS: &str = "✓";

    /// Error prefix (red X)
    pub const ERROR: &str = "✗";

    /// Warning prefix (yellow triangle)
    pub const WARNING: &str = "⚠";

    /// Info prefix (blue circle)
    pub const INFO: &str = "ℹ";
}

/// How results are printed
#[derive(Debug, Clone, Copy, Default)]
pub struct OutputConfig {
    /// Suppress everything but errors
    pub quiet: bool,
    /// Print machine-readable JSON
    pub json: bool,
    /// Verbosity level from `-v`
    pub verbose: u8,
}

impl OutputConfig {
    pub fn new(quiet: bool, json: bool, verbose: u8) -> Self {
        Self {
            quiet,
            json,
            verbose,
        }
    }

    /// Log filter directive for this verbosity
    pub fn log_level(&self) -> &'static str {
        if self.quiet {
            return "error";
        }
        match self.verbose {
            0 => "warn",
            1 => "info",
            _ => "debug",
        }
    }

    /// Progress bar for `total` packages, hidden when quiet or printing JSON
    pub fn build_bar(&self, total: u64) -> ProgressBar {
        if self.quiet || self.json {
            ProgressBar::hidden()
        } else {
            create_build_bar(total)
        }
    }

    pub fn success(&self, message: &str) {
        if !self.quiet && !self.json {
            println!("{} {message}", status::SUCCESS);
        }
    }

    pub fn info(&self, message: &str) {
        if !self.quiet && !self.json {
            println!("{} {message}", status::INFO);
        }
    }

    pub fn warning(&self, message: &str) {
        if !self.quiet && !self.json {
            println!("{} {message}", status::WARNING);
        }
    }

    /// Print a plain line, such as one entry of a list
    pub fn line(&self, message: &str) {
        if !self.quiet && !self.json {
            println!("{message}");
        }
    }

    /// Print `value` as pretty JSON when JSON output is on
    pub fn print_json<T: Serialize>(&self, value: &T) -> anyhow::Result<()> {
        if self.json {
            println!("{}", serde_json::to_string_pretty(value)?);
        }
        Ok(())
    }
}

/// Print an error and its causes to stderr
pub fn display_error(error: &anyhow::Error) {
    eprintln!("{} Error: {error}", status::ERROR);
    for cause in error.chain().skip(1) {
        eprintln!("  caused by: {cause}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_level_follows_verbosity() {
        assert_eq!(OutputConfig::new(false, false, 0).log_level(), "warn");
        assert_eq!(OutputConfig::new(false, false, 1).log_level(), "info");
        assert_eq!(OutputConfig::new(false, false, 3).log_level(), "debug");
        assert_eq!(OutputConfig::new(true, false, 2).log_level(), "error");
    }

    #[test]
    fn test_quiet_hides_progress() {
        assert!(OutputConfig::new(true, false, 0).build_bar(10).is_hidden());
        assert!(OutputConfig::new(false, true, 0).build_bar(10).is_hidden());
    }
}
