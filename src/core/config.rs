//! Run configuration
//!
//! Reads settings from `config.toml` in the config directory (or an explicit
//! path). Command-line flags are layered on top by the CLI. The resolved
//! configuration is stored in the checkpoint so a run can be resumed from
//! the checkpoint path alone.
//!
//! ```toml
//! index = "/srv/corpus/index.toml"
//! output_dir = "/srv/rebuild/run-1"
//!
//! [build]
//! command = ["sbuild", "--no-clean"]
//! probe = "hello"
//! skip = ["texlive-full"]
//! skip_patterns = ["^linux-image-"]
//!
//! [database]
//! lock_dir = "/var/lib/massbuild/locks"
//! rescan_command = ["pkgdb", "rescan"]
//! purge_command = ["pkgdb", "purge"]
//! ```

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

use crate::core::graph::DependencyGraph;
use crate::error::ConfigError;
use crate::infra::dirs::MassbuildDirs;

/// Configuration of one run
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunConfig {
    /// Package index consumed by the metadata provider
    #[serde(default)]
    pub index: Option<PathBuf>,

    /// Directory receiving logs, checkpoint and reports
    #[serde(default)]
    pub output_dir: Option<PathBuf>,

    /// Build settings
    #[serde(default)]
    pub build: BuildSettings,

    /// Package database settings
    #[serde(default)]
    pub database: DatabaseSettings,
}

/// Build settings
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BuildSettings {
    /// Build command; the package name is appended as the last argument
    #[serde(default)]
    pub command: Vec<String>,

    /// Directory where the builder keeps per-package source trees
    #[serde(default)]
    pub work_dir: Option<PathBuf>,

    /// Package built first to sanity-check the environment
    #[serde(default)]
    pub probe: Option<String>,

    /// Packages never to build
    #[serde(default)]
    pub skip: Vec<String>,

    /// Regular expressions; matching packages are never built
    #[serde(default)]
    pub skip_patterns: Vec<String>,

    /// Package-description filter hook handed to the builder
    #[serde(default)]
    pub filter: Option<String>,

    /// Purge the built family from the package database after each attempt
    #[serde(default)]
    pub purge_after_build: bool,
}

/// Package database settings
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DatabaseSettings {
    /// Directory holding build lock files left by crashed builds
    #[serde(default)]
    pub lock_dir: Option<PathBuf>,

    /// Command that rescans the package database
    #[serde(default)]
    pub rescan_command: Vec<String>,

    /// Command purging packages; names are appended
    #[serde(default)]
    pub purge_command: Vec<String>,
}

impl RunConfig {
    /// Load configuration from the config directory
    ///
    /// A missing config file yields the default configuration.
    pub fn load(dirs: &MassbuildDirs) -> Result<Self, ConfigError> {
        Self::load_from_path(&dirs.config_path())
    }

    /// Load configuration from a specific path
    pub fn load_from_path(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::debug!("No config file at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            error: e.to_string(),
        })?;

        Self::from_toml(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            error: e.to_string(),
        })
    }

    /// Parse from TOML string
    pub fn from_toml(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    /// Package index path, which must exist
    pub fn index_path(&self) -> Result<&Path, ConfigError> {
        let path = self.index.as_deref().ok_or(ConfigError::MissingIndex)?;
        if !path.is_file() {
            return Err(ConfigError::IndexNotFound {
                path: path.to_path_buf(),
            });
        }
        Ok(path)
    }

    /// Check that the build command can be run
    pub fn validate_builder(&self) -> Result<(), ConfigError> {
        let program = self
            .build
            .command
            .first()
            .ok_or(ConfigError::MissingBuildCommand)?;
        which::which(program).map_err(|_| ConfigError::ExecutableNotFound {
            program: program.clone(),
        })?;
        Ok(())
    }

    /// Compile the skip patterns
    pub fn skip_patterns(&self) -> Result<Vec<Regex>, ConfigError> {
        self.build
            .skip_patterns
            .iter()
            .map(|pattern| {
                Regex::new(pattern).map_err(|e| ConfigError::InvalidPattern {
                    pattern: pattern.clone(),
                    error: e.to_string(),
                })
            })
            .collect()
    }

    /// Packages never to build: explicit names plus graph nodes matching a
    /// skip pattern
    pub fn skip_set(&self, graph: &DependencyGraph) -> Result<BTreeSet<String>, ConfigError> {
        let patterns = self.skip_patterns()?;
        let mut skip: BTreeSet<String> = self.build.skip.iter().cloned().collect();
        for node in graph.nodes().iter().filter(|n| !n.is_virtual) {
            if patterns.iter().any(|re| re.is_match(&node.name)) {
                skip.insert(node.name.clone());
            }
        }
        Ok(skip)
    }
}
