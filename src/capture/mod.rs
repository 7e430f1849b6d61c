//! Screen capture functionality.
//!
//! This module provides:
//! - The [`ScreenCapture`] seam used by every lookup
//! - Full-screen capture of the primary monitor (`PrimaryMonitor`)
//! - Screenshot file naming and the self-deleting [`CaptureFile`]

pub mod screenshot;

pub use screenshot::{screenshot_name, PrimaryMonitor};

use anyhow::Result;
use std::path::{Path, PathBuf};

/// Writes a full-screen screenshot to `path`. The caller owns the file.
pub trait ScreenCapture {
    fn capture_to(&self, path: &Path) -> Result<()>;
}

/// A screenshot on disk that is deleted when dropped.
#[derive(Debug)]
pub struct CaptureFile {
    path: PathBuf,
}

impl CaptureFile {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for CaptureFile {
    fn drop(&mut self) {
        if let Err(e) = std::fs::remove_file(&self.path) {
            if e.kind() != std::io::ErrorKind::NotFound {
                crate::log(&format!(
                    "Failed to delete capture {}: {}",
                    self.path.display(),
                    e
                ));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_capture_file_deleted_on_drop() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("shot.png");
        std::fs::write(&path, b"png").unwrap();
        drop(CaptureFile::new(path.clone()));
        assert!(!path.exists());
    }

    #[test]
    fn test_capture_file_already_gone() {
        let dir = tempfile::tempdir().unwrap();
        drop(CaptureFile::new(dir.path().join("never_written.png")));
    }
}
