//! Error types for massbuild
//!
//! Domain-specific error types using thiserror.

use std::path::PathBuf;
use thiserror::Error;

/// Metadata provider errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ProviderError {
    /// Package not present in the index
    #[error("Package '{name}' not found in package index")]
    NotFound { name: String },

    /// Index could not be read
    #[error("Failed to read package index '{path}': {error}")]
    ReadError { path: PathBuf, error: String },

    /// Index could not be parsed
    #[error("Failed to parse package index '{path}': {error}")]
    ParseError { path: PathBuf, error: String },
}

/// Checkpoint errors
///
/// Every variant is fatal: a checkpoint that cannot be trusted is never
/// partially resumed.
#[derive(Error, Debug)]
pub enum CheckpointError {
    /// Checkpoint already exists where a new one was requested
    #[error("Checkpoint already exists at '{path}'")]
    AlreadyExists { path: PathBuf },

    /// IO error
    #[error("IO error for checkpoint '{path}': {error}")]
    Io { path: PathBuf, error: String },

    /// Record failed validation
    #[error("Checkpoint '{path}' is corrupt at line {line}: {reason}")]
    Corrupt {
        path: PathBuf,
        line: usize,
        reason: String,
    },

    /// Snapshot record missing
    #[error("Checkpoint '{path}' does not start with a snapshot record")]
    MissingSnapshot { path: PathBuf },

    /// Unsupported format version
    #[error("Checkpoint '{path}' has format version {found}, expected {expected}")]
    UnsupportedVersion {
        path: PathBuf,
        found: u32,
        expected: u32,
    },

    /// Record could not be serialized
    #[error("Failed to serialize checkpoint record: {0}")]
    Serialize(String),
}

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to read config file
    #[error("Failed to read config file '{path}': {error}")]
    ReadError { path: PathBuf, error: String },

    /// Failed to parse config file
    #[error("Failed to parse config file '{path}': {error}")]
    ParseError { path: PathBuf, error: String },

    /// No package index configured
    #[error("No package index configured. Pass --index or set 'index' in config.toml")]
    MissingIndex,

    /// Package index path does not exist
    #[error("Package index not found: {path}")]
    IndexNotFound { path: PathBuf },

    /// Build command missing
    #[error("No build command configured. Set 'build.command' in config.toml or pass --builder")]
    MissingBuildCommand,

    /// Build executable not found
    #[error("Build executable '{program}' not found in PATH")]
    ExecutableNotFound { program: String },

    /// Invalid skip pattern
    #[error("Invalid skip pattern '{pattern}': {error}")]
    InvalidPattern { pattern: String, error: String },

    /// Output directory already exists
    #[error("Output directory '{path}' already exists. Use 'massbuild resume' to continue a previous run")]
    OutputExists { path: PathBuf },
}

/// Build action errors
#[derive(Error, Debug)]
pub enum BuildError {
    /// Build process could not be spawned
    #[error("Failed to start build for package '{package}': {error}")]
    SpawnFailed { package: String, error: String },

    /// Log file could not be created
    #[error("Failed to create build log '{path}': {error}")]
    LogFile { path: PathBuf, error: String },
}

/// Package database errors
#[derive(Error, Debug)]
pub enum DatabaseError {
    /// Database command failed
    #[error("Package database command '{command}' failed: {error}")]
    CommandFailed { command: String, error: String },

    /// Lock file could not be removed
    #[error("Failed to remove stale build lock '{path}': {error}")]
    LockRemoval { path: PathBuf, error: String },
}

/// Filesystem errors
#[derive(Error, Debug)]
pub enum FilesystemError {
    /// Failed to create directory
    #[error("Failed to create directory '{path}': {error}")]
    CreateDir { path: PathBuf, error: String },

    /// Failed to remove directory
    #[error("Failed to remove directory '{path}': {error}")]
    RemoveDir { path: PathBuf, error: String },

    /// Failed to move directory
    #[error("Failed to move '{from}' to '{to}': {error}")]
    Rename {
        from: PathBuf,
        to: PathBuf,
        error: String,
    },

    /// Failed to write file
    #[error("Failed to write file '{path}': {error}")]
    WriteFile { path: PathBuf, error: String },
}

/// Top-level massbuild error type
#[derive(Error, Debug)]
pub enum MassbuildError {
    /// Provider error
    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    /// Checkpoint error
    #[error("Checkpoint error: {0}")]
    Checkpoint(#[from] CheckpointError),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Build error
    #[error("Build error: {0}")]
    Build(#[from] BuildError),

    /// Database error
    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),

    /// Filesystem error
    #[error("Filesystem error: {0}")]
    Filesystem(#[from] FilesystemError),
}
