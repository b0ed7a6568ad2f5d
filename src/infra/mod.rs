//! Infrastructure layer
//!
//! Handles all I/O with the outside world: the package index, the external
//! builder, the system package database and the filesystem.

pub mod builder;
pub mod dirs;
pub mod filesystem;
pub mod pkgdb;
pub mod provider;
