//! Filesystem helpers shared by the staging and packing layers

use crate::error::{ArchiveError, Result};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Resolve an archive target path to an absolute, canonical form.
///
/// Parent directories are created when missing; the target file itself does
/// not need to exist yet.
pub fn canonical_target_path(path: &Path) -> Result<PathBuf> {
    let file_name = path
        .file_name()
        .ok_or_else(|| ArchiveError::InvalidPath(path.display().to_string()))?;

    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => PathBuf::from("."),
    };

    fs::create_dir_all(&parent)?;
    let canonical_parent = parent.canonicalize()?;

    Ok(canonical_parent.join(file_name))
}

/// Recursively delete a directory. A missing directory is not an error.
pub fn remove_dir_recursive(path: &Path) -> Result<()> {
    match fs::remove_dir_all(path) {
        Ok(()) => Ok(()),
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(err) => Err(err.into()),
    }
}

/// Create a directory and any missing parents.
pub fn ensure_dir(path: &Path) -> Result<()> {
    fs::create_dir_all(path)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_canonical_target_path_creates_parents() {
        let temp_dir = TempDir::new().unwrap();
        let target = temp_dir.path().join("a/b/report.rptdocument");

        let canonical = canonical_target_path(&target).unwrap();

        assert!(target.parent().unwrap().exists());
        assert!(canonical.is_absolute());
        assert_eq!(canonical.file_name().unwrap(), "report.rptdocument");
    }

    #[test]
    fn test_canonical_target_path_rejects_bare_root() {
        assert!(canonical_target_path(Path::new("/")).is_err());
    }

    #[test]
    fn test_remove_dir_recursive() {
        let temp_dir = TempDir::new().unwrap();
        let dir = temp_dir.path().join("staging");
        fs::create_dir_all(dir.join("content")).unwrap();
        fs::write(dir.join("content/0"), b"bytes").unwrap();

        remove_dir_recursive(&dir).unwrap();
        assert!(!dir.exists());

        // Deleting again is fine
        remove_dir_recursive(&dir).unwrap();
    }

    #[test]
    fn test_ensure_dir_is_idempotent() {
        let temp_dir = TempDir::new().unwrap();
        let dir = temp_dir.path().join("x/y/z");

        ensure_dir(&dir).unwrap();
        ensure_dir(&dir).unwrap();
        assert!(dir.is_dir());
    }
}
