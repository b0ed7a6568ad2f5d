//! Run context
//!
//! Everything a run needs to know about where it writes, passed explicitly
//! to the build loop.

use std::path::{Path, PathBuf};

use crate::config::defaults::{
    CHECKPOINT_FILE, FAILED_SUBDIR, LOGS_SUBDIR, LOG_EXTENSION, ORDER_FILE, REPORT_FILE,
    WORK_SUBDIR,
};
use crate::core::config::RunConfig;

/// Paths and flags of one run
#[derive(Debug, Clone)]
pub struct RunContext {
    /// Resolved configuration
    pub config: RunConfig,
    /// Output directory of the run
    pub output_dir: PathBuf,
    /// Directory where the builder keeps source trees
    pub work_dir: PathBuf,
    /// Print the order instead of building
    pub dry_run: bool,
}

impl RunContext {
    /// Create a context rooted at `output_dir`
    ///
    /// The work directory defaults to `<output_dir>/work`.
    pub fn new(config: RunConfig, output_dir: PathBuf) -> Self {
        let work_dir = config
            .build
            .work_dir
            .clone()
            .unwrap_or_else(|| output_dir.join(WORK_SUBDIR));
        Self {
            config,
            output_dir,
            work_dir,
            dry_run: false,
        }
    }

    /// Set the dry-run flag
    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    pub fn logs_dir(&self) -> PathBuf {
        self.output_dir.join(LOGS_SUBDIR)
    }

    pub fn failed_dir(&self) -> PathBuf {
        self.output_dir.join(FAILED_SUBDIR)
    }

    pub fn checkpoint_path(&self) -> PathBuf {
        self.output_dir.join(CHECKPOINT_FILE)
    }

    pub fn order_path(&self) -> PathBuf {
        self.output_dir.join(ORDER_FILE)
    }

    pub fn report_path(&self) -> PathBuf {
        self.output_dir.join(REPORT_FILE)
    }

    /// Log file of `package`
    pub fn log_path(&self, package: &str) -> PathBuf {
        self.logs_dir().join(format!("{package}.{LOG_EXTENSION}"))
    }

    /// Source tree the builder leaves for `package`
    pub fn source_dir(&self, package: &str) -> PathBuf {
        self.work_dir.join(package)
    }

    /// Where a failed package's source tree is kept
    pub fn archived_source_dir(&self, package: &str) -> PathBuf {
        self.failed_dir().join(package)
    }

    /// Output directory of the run a checkpoint belongs to
    pub fn output_dir_of(checkpoint: &Path) -> PathBuf {
        checkpoint
            .parent()
            .map_or_else(|| PathBuf::from("."), Path::to_path_buf)
    }
}
