//! External build action
//!
//! Builds one package by running the configured command with the package
//! name appended. Standard output and standard error both go to the
//! package's log file.

use std::fs::File;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use crate::core::config::RunConfig;
use crate::error::BuildError;

/// Environment variable naming the package being built
pub const ENV_PACKAGE: &str = "MASSBUILD_PACKAGE";
/// Environment variable holding the package's source tree
pub const ENV_SOURCE_DIR: &str = "MASSBUILD_SOURCE_DIR";
/// Environment variable holding the package-description filter hook
pub const ENV_FILTER: &str = "MASSBUILD_FILTER";

/// Outcome of one build
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuildStatus {
    /// The package built
    Success,
    /// The build ran and failed
    Failed { exit_code: Option<i32> },
}

/// Builds a single package
pub trait BuildAction {
    /// Build `package`, writing all output to `log_path`
    fn build(&mut self, package: &str, log_path: &Path) -> Result<BuildStatus, BuildError>;
}

/// Build action running an external command
#[derive(Debug, Clone)]
pub struct CommandBuildAction {
    command: Vec<String>,
    work_dir: PathBuf,
    filter: Option<String>,
}

impl CommandBuildAction {
    /// Create a build action running `command` inside `work_dir`
    pub fn new(command: Vec<String>, work_dir: PathBuf) -> Self {
        Self {
            command,
            work_dir,
            filter: None,
        }
    }

    /// Create a build action from the run configuration
    pub fn from_config(config: &RunConfig, work_dir: PathBuf) -> Self {
        Self::new(config.build.command.clone(), work_dir).with_filter(config.build.filter.clone())
    }

    /// Forward a package-description filter hook to the builder
    pub fn with_filter(mut self, filter: Option<String>) -> Self {
        self.filter = filter;
        self
    }

    fn command_for(&self, package: &str) -> Result<Command, BuildError> {
        let (program, args) = self
            .command
            .split_first()
            .ok_or_else(|| BuildError::SpawnFailed {
                package: package.to_string(),
                error: "empty build command".to_string(),
            })?;

        let mut cmd = Command::new(program);
        cmd.args(args)
            .arg(package)
            .current_dir(&self.work_dir)
            .env(ENV_PACKAGE, package)
            .env(ENV_SOURCE_DIR, self.work_dir.join(package))
            .stdin(Stdio::null());
        if let Some(filter) = &self.filter {
            cmd.env(ENV_FILTER, filter);
        }
        Ok(cmd)
    }
}

impl BuildAction for CommandBuildAction {
    fn build(&mut self, package: &str, log_path: &Path) -> Result<BuildStatus, BuildError> {
        let log_error = |e: std::io::Error| BuildError::LogFile {
            path: log_path.to_path_buf(),
            error: e.to_string(),
        };
        let stdout = File::create(log_path).map_err(log_error)?;
        let stderr = stdout.try_clone().map_err(log_error)?;

        let mut cmd = self.command_for(package)?;
        tracing::debug!("Running {:?}", cmd);

        let status = cmd
            .stdout(stdout)
            .stderr(stderr)
            .status()
            .map_err(|e| BuildError::SpawnFailed {
                package: package.to_string(),
                error: e.to_string(),
            })?;

        if status.success() {
            Ok(BuildStatus::Success)
        } else {
            Ok(BuildStatus::Failed {
                exit_code: status.code(),
            })
        }
    }
}
