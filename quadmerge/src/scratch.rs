//! Scratch directory for intermediate row and placeholder images.
//!
//! One run owns one [`ScratchDir`]. Acquiring it wipes whatever a crashed
//! earlier run left behind; dropping it removes the directory again, whether
//! the run finished or bailed out with `?`.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::error::{MergeError, MergeResult};

/// Directory name created under the temp root.
pub const SCRATCH_DIR_NAME: &str = "quadmerge-temp";

/// File name of the shared transparent tile.
pub const PLACEHOLDER_FILE_NAME: &str = "empty.png";

/// Scoped scratch directory, removed on drop.
#[derive(Debug)]
pub struct ScratchDir {
    path: PathBuf,
}

impl ScratchDir {
    /// Create `<temp_root>/quadmerge-temp`, clearing any stale copy first.
    pub fn acquire(temp_root: &Path) -> MergeResult<Self> {
        let path = scratch_path(temp_root);

        if path.exists() {
            warn!(path = %path.display(), "Removing stale scratch directory");
            remove_if_present(&path).map_err(|source| MergeError::ScratchDirectory {
                path: path.clone(),
                source,
            })?;
        }

        fs::create_dir_all(&path).map_err(|source| MergeError::ScratchDirectory {
            path: path.clone(),
            source,
        })?;

        debug!(path = %path.display(), "Scratch directory ready");
        Ok(Self { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Intermediate image for grid row `row`.
    pub fn row_path(&self, row: u32) -> PathBuf {
        self.path.join(format!("row-{}.png", row))
    }

    pub fn placeholder_path(&self) -> PathBuf {
        self.path.join(PLACEHOLDER_FILE_NAME)
    }

    /// Any other file inside the scratch directory.
    pub fn file(&self, name: &str) -> PathBuf {
        self.path.join(name)
    }
}

impl Drop for ScratchDir {
    fn drop(&mut self) {
        match remove_if_present(&self.path) {
            Ok(()) => debug!(path = %self.path.display(), "Scratch directory removed"),
            Err(e) => warn!(
                path = %self.path.display(),
                error = %e,
                "Failed to remove scratch directory"
            ),
        }
    }
}

/// Where the scratch directory lives for a given temp root.
///
/// Also used by the Ctrl+C handler, which cannot reach the guard itself.
pub fn scratch_path(temp_root: &Path) -> PathBuf {
    temp_root.join(SCRATCH_DIR_NAME)
}

/// Recursively delete `path`, treating "already gone" as success.
pub fn remove_if_present(path: &Path) -> io::Result<()> {
    match fs::remove_dir_all(path) {
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_acquire_creates_directory() {
        let temp = TempDir::new().unwrap();
        let scratch = ScratchDir::acquire(temp.path()).unwrap();

        assert!(scratch.path().is_dir());
        assert_eq!(scratch.path(), temp.path().join("quadmerge-temp"));
    }

    #[test]
    fn test_drop_removes_directory() {
        let temp = TempDir::new().unwrap();
        let path = {
            let scratch = ScratchDir::acquire(temp.path()).unwrap();
            fs::write(scratch.row_path(0), b"row").unwrap();
            scratch.path().to_path_buf()
        };

        assert!(!path.exists());
    }

    #[test]
    fn test_acquire_clears_stale_artifacts() {
        let temp = TempDir::new().unwrap();
        let stale = temp.path().join("quadmerge-temp");
        fs::create_dir_all(stale.join("nested")).unwrap();
        fs::write(stale.join("row-7.png"), b"old").unwrap();

        let scratch = ScratchDir::acquire(temp.path()).unwrap();

        assert!(scratch.path().is_dir());
        assert_eq!(fs::read_dir(scratch.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_drop_tolerates_missing_directory() {
        let temp = TempDir::new().unwrap();
        let scratch = ScratchDir::acquire(temp.path()).unwrap();
        fs::remove_dir_all(scratch.path()).unwrap();
        drop(scratch);
    }

    #[test]
    fn test_cleanup_on_error_path() {
        fn failing_run(root: &Path) -> MergeResult<()> {
            let scratch = ScratchDir::acquire(root)?;
            fs::write(scratch.placeholder_path(), b"x").unwrap();
            Err(MergeError::InvalidOption("boom".to_string()))
        }

        let temp = TempDir::new().unwrap();
        assert!(failing_run(temp.path()).is_err());
        assert!(!scratch_path(temp.path()).exists());
    }

    #[test]
    fn test_artifact_paths() {
        let temp = TempDir::new().unwrap();
        let scratch = ScratchDir::acquire(temp.path()).unwrap();

        assert_eq!(scratch.row_path(12).file_name().unwrap(), "row-12.png");
        assert_eq!(scratch.placeholder_path().file_name().unwrap(), "empty.png");
        assert_eq!(scratch.file("out.png").parent().unwrap(), scratch.path());
    }

    #[test]
    fn test_remove_if_present_missing_is_ok() {
        let temp = TempDir::new().unwrap();
        assert!(remove_if_present(&temp.path().join("nope")).is_ok());
    }
}
