//! Filesystem operations
//!
//! Handles file and directory operations.

use std::path::Path;

use crate::error::FilesystemError;

/// Create a directory and all parent directories
pub fn create_dir_all(path: &Path) -> Result<(), FilesystemError> {
    std::fs::create_dir_all(path).map_err(|e| FilesystemError::CreateDir {
        path: path.to_path_buf(),
        error: e.to_string(),
    })
}

/// Create a directory that must not exist yet
pub fn create_new_dir(path: &Path) -> Result<(), FilesystemError> {
    if let Some(parent) = path.parent() {
        create_dir_all(parent)?;
    }
    std::fs::create_dir(path).map_err(|e| FilesystemError::CreateDir {
        path: path.to_path_buf(),
        error: e.to_string(),
    })
}

/// Remove a directory and all its contents
pub fn remove_dir_all(path: &Path) -> Result<(), FilesystemError> {
    if path.exists() {
        std::fs::remove_dir_all(path).map_err(|e| FilesystemError::RemoveDir {
            path: path.to_path_buf(),
            error: e.to_string(),
        })?;
    }
    Ok(())
}

/// Move a directory to `to`, replacing anything already there
///
/// Returns `false` when `from` does not exist.
pub fn relocate_dir(from: &Path, to: &Path) -> Result<bool, FilesystemError> {
    if !from.exists() {
        return Ok(false);
    }
    remove_dir_all(to)?;
    if let Some(parent) = to.parent() {
        create_dir_all(parent)?;
    }
    std::fs::rename(from, to).map_err(|e| FilesystemError::Rename {
        from: from.to_path_buf(),
        to: to.to_path_buf(),
        error: e.to_string(),
    })?;
    Ok(true)
}

/// Write content to a file
pub fn write_file(path: &Path, content: &str) -> Result<(), FilesystemError> {
    if let Some(parent) = path.parent() {
        create_dir_all(parent)?;
    }
    std::fs::write(path, content).map_err(|e| FilesystemError::WriteFile {
        path: path.to_path_buf(),
        error: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_create_new_dir_refuses_existing() {
        let temp = TempDir::new().unwrap();
        let dir = temp.path().join("out");

        create_new_dir(&dir).unwrap();
        assert!(create_new_dir(&dir).is_err());
    }

    #[test]
    fn test_relocate_replaces_target() {
        let temp = TempDir::new().unwrap();
        let from = temp.path().join("work").join("zlib");
        let to = temp.path().join("failed").join("zlib");
        write_file(&from.join("configure"), "#!/bin/sh").unwrap();
        write_file(&to.join("stale"), "old").unwrap();

        assert!(relocate_dir(&from, &to).unwrap());
        assert!(!from.exists());
        assert!(to.join("configure").exists());
        assert!(!to.join("stale").exists());
    }

    #[test]
    fn test_relocate_missing_source() {
        let temp = TempDir::new().unwrap();
        let moved = relocate_dir(&temp.path().join("nope"), &temp.path().join("dest")).unwrap();
        assert!(!moved);
    }

    #[test]
    fn test_write_file_creates_parents() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("logs").join("a.log");
        write_file(&path, "skipped\n").unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "skipped\n");
    }
}
