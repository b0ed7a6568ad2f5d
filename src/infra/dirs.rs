//! Platform-specific directory management
//!
//! Environment variables override the platform defaults:
//! - `MASSBUILD_CONFIG_DIR` - Override config directory
//! - `MASSBUILD_DATA_DIR` - Override data directory

use std::env;
use std::path::PathBuf;

/// Environment variable names for directory overrides
pub const ENV_CONFIG_DIR: &str = "MASSBUILD_CONFIG_DIR";
pub const ENV_DATA_DIR: &str = "MASSBUILD_DATA_DIR";

/// Application name used in directory paths
const APP_NAME: &str = "massbuild";

/// Subdirectory holding default run output directories
const RUNS_SUBDIR: &str = "runs";

/// Platform-specific directory provider for massbuild
///
/// Follows XDG on Linux and `~/Library` on macOS.
#[derive(Debug, Clone)]
pub struct MassbuildDirs {
    config_dir: PathBuf,
    data_dir: PathBuf,
}

impl MassbuildDirs {
    /// Create a new `MassbuildDirs` instance
    ///
    /// Checks environment variables first, then falls back to platform defaults.
    #[must_use]
    pub fn new() -> Self {
        Self {
            config_dir: resolve(ENV_CONFIG_DIR, dirs::config_dir, &[".config"]),
            data_dir: resolve(ENV_DATA_DIR, dirs::data_dir, &[".local", "share"]),
        }
    }

    /// Get the config directory path
    ///
    /// - Linux: `$XDG_CONFIG_HOME/massbuild` or `~/.config/massbuild`
    /// - macOS: `~/Library/Application Support/massbuild`
    #[must_use]
    pub fn config_dir(&self) -> PathBuf {
        self.config_dir.clone()
    }

    /// Get the data directory path
    #[must_use]
    pub fn data_dir(&self) -> PathBuf {
        self.data_dir.clone()
    }

    /// Get the config file path
    #[must_use]
    pub fn config_path(&self) -> PathBuf {
        self.config_dir.join("config.toml")
    }

    /// Directory under which runs without an explicit output directory go
    #[must_use]
    pub fn runs_dir(&self) -> PathBuf {
        self.data_dir.join(RUNS_SUBDIR)
    }
}

impl Default for MassbuildDirs {
    fn default() -> Self {
        Self::new()
    }
}

fn resolve(var: &str, platform: fn() -> Option<PathBuf>, home_fallback: &[&str]) -> PathBuf {
    if let Ok(path) = env::var(var) {
        return PathBuf::from(path);
    }

    platform().map(|p| p.join(APP_NAME)).unwrap_or_else(|| {
        let base = dirs::home_dir().unwrap_or_else(|| PathBuf::from("."));
        home_fallback
            .iter()
            .fold(base, |path, part| path.join(part))
            .join(APP_NAME)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dirs_new_creates_instance() {
        let dirs = MassbuildDirs::new();
        assert!(!dirs.config_dir().as_os_str().is_empty());
        assert!(!dirs.data_dir().as_os_str().is_empty());
    }

    #[test]
    fn test_config_path_is_under_config_dir() {
        let dirs = MassbuildDirs::new();
        assert!(dirs.config_path().starts_with(dirs.config_dir()));
        assert!(dirs.config_path().ends_with("config.toml"));
    }

    #[test]
    fn test_runs_dir_is_under_data_dir() {
        let dirs = MassbuildDirs::new();
        assert!(dirs.runs_dir().starts_with(dirs.data_dir()));
    }
}
