//! System package database
//!
//! The build loop only needs three things from the package database: purging
//! packages a build pulled in, clearing lock files left by a crashed build,
//! and rescanning after an interruption.

use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use walkdir::WalkDir;

use crate::core::config::RunConfig;
use crate::error::DatabaseError;

/// Operations on the system package database
pub trait PackageDatabase {
    /// Remove `names` from the system, keeping essential packages
    fn purge_non_essential(&mut self, names: &[String]) -> Result<(), DatabaseError>;

    /// Delete build lock files left behind by an interrupted build
    ///
    /// Returns how many locks were removed.
    fn remove_stale_build_locks(&mut self) -> Result<usize, DatabaseError>;

    /// Rebuild the database's view of installed packages
    fn rescan(&mut self) -> Result<(), DatabaseError>;
}

/// Package database driven by configured commands
///
/// An empty command makes the corresponding operation a no-op.
#[derive(Debug, Clone, Default)]
pub struct CommandPackageDatabase {
    lock_dir: Option<PathBuf>,
    rescan_command: Vec<String>,
    purge_command: Vec<String>,
}

impl CommandPackageDatabase {
    /// Create a package database from the run configuration
    pub fn from_config(config: &RunConfig) -> Self {
        Self {
            lock_dir: config.database.lock_dir.clone(),
            rescan_command: config.database.rescan_command.clone(),
            purge_command: config.database.purge_command.clone(),
        }
    }
}

impl PackageDatabase for CommandPackageDatabase {
    fn purge_non_essential(&mut self, names: &[String]) -> Result<(), DatabaseError> {
        if names.is_empty() {
            return Ok(());
        }
        run(&self.purge_command, names)
    }

    fn remove_stale_build_locks(&mut self) -> Result<usize, DatabaseError> {
        match &self.lock_dir {
            Some(dir) => remove_locks(dir),
            None => Ok(0),
        }
    }

    fn rescan(&mut self) -> Result<(), DatabaseError> {
        run(&self.rescan_command, &[])
    }
}

fn run(command: &[String], extra: &[String]) -> Result<(), DatabaseError> {
    let Some((program, args)) = command.split_first() else {
        return Ok(());
    };
    let rendered = command
        .iter()
        .chain(extra)
        .cloned()
        .collect::<Vec<_>>()
        .join(" ");
    tracing::debug!("Running {}", rendered);

    let status = Command::new(program)
        .args(args)
        .args(extra)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .status()
        .map_err(|e| DatabaseError::CommandFailed {
            command: rendered.clone(),
            error: e.to_string(),
        })?;

    if status.success() {
        Ok(())
    } else {
        Err(DatabaseError::CommandFailed {
            command: rendered,
            error: format!("exited with {status}"),
        })
    }
}

fn remove_locks(dir: &Path) -> Result<usize, DatabaseError> {
    if !dir.exists() {
        return Ok(0);
    }

    let mut removed = 0;
    for entry in WalkDir::new(dir).into_iter().filter_map(Result::ok) {
        let path = entry.path();
        if !entry.file_type().is_file() || path.extension().map_or(true, |ext| ext != "lock") {
            continue;
        }
        std::fs::remove_file(path).map_err(|e| DatabaseError::LockRemoval {
            path: path.to_path_buf(),
            error: e.to_string(),
        })?;
        tracing::info!("Removed stale build lock {}", path.display());
        removed += 1;
    }
    Ok(removed)
}
