//! On-disk asset layout rooted at the configured project directory.

use anyhow::{anyhow, Result};
use std::path::{Path, PathBuf};

use crate::device::OsFamily;

/// Extensions tried for a template, in priority order.
pub const TEMPLATE_EXTENSIONS: [&str; 3] = ["png", "jpg", "jpeg"];

/// Directory layout for templates, caches, screenshots, and logs.
#[derive(Debug, Clone)]
pub struct AssetPaths {
    root: PathBuf,
}

impl AssetPaths {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Returns the template directory: `<root>/template_pic/`
    pub fn template_dir(&self) -> PathBuf {
        self.root.join("template_pic")
    }

    /// Returns the text cache directory: `<root>/pic_cache_for_text/`
    pub fn cache_dir(&self) -> PathBuf {
        self.root.join("pic_cache_for_text")
    }

    /// Returns the screenshots directory: `<root>/screenshot/`
    pub fn screenshot_dir(&self) -> PathBuf {
        self.root.join("screenshot")
    }

    /// Returns the logs directory: `<root>/logs/`
    pub fn logs_dir(&self) -> PathBuf {
        self.root.join("logs")
    }

    /// Returns the preview directory: `<root>/preview/`
    pub fn preview_dir(&self) -> PathBuf {
        self.root.join("preview")
    }

    /// Ensures all output directories exist.
    pub fn ensure_directories(&self) -> std::io::Result<()> {
        std::fs::create_dir_all(self.template_dir())?;
        std::fs::create_dir_all(self.cache_dir())?;
        std::fs::create_dir_all(self.screenshot_dir())?;
        std::fs::create_dir_all(self.logs_dir())?;
        Ok(())
    }
}

/// Builds `name_<os>_<w>x<h>`.
pub fn resolution_qualified_name(name: &str, os: OsFamily, resolution: (u32, u32)) -> String {
    format!(
        "{}_{}_{}x{}",
        name,
        os.as_str(),
        resolution.0,
        resolution.1
    )
}

/// Joins an optional subfolder onto a base directory. An empty subfolder is ignored.
pub fn with_subfolder(base: &Path, subfolder: &str) -> PathBuf {
    if subfolder.is_empty() {
        base.to_path_buf()
    } else {
        base.join(subfolder)
    }
}

/// Looks up `<dir>/<qualified>.{png,jpg,jpeg}`, first existing file wins.
pub fn find_template(dir: &Path, qualified: &str) -> Option<PathBuf> {
    TEMPLATE_EXTENSIONS
        .iter()
        .map(|ext| dir.join(format!("{}.{}", qualified, ext)))
        .find(|p| p.is_file())
}

/// Like [`find_template`] but a miss is an error naming the expected prefix.
pub fn require_template(dir: &Path, qualified: &str) -> Result<PathBuf> {
    find_template(dir, qualified).ok_or_else(|| {
        anyhow!(
            "Missing template for this resolution: {}",
            dir.join(qualified).display()
        )
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_qualified_name() {
        assert_eq!(
            resolution_qualified_name("send_btn", OsFamily::Mac, (2880, 1800)),
            "send_btn_mac_2880x1800"
        );
        assert_eq!(
            resolution_qualified_name("send_btn", OsFamily::Windows, (1920, 1080)),
            "send_btn_win_1920x1080"
        );
    }

    #[test]
    fn test_find_template_extension_priority() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a_win_10x10.jpeg"), b"x").unwrap();
        assert_eq!(
            find_template(dir.path(), "a_win_10x10").unwrap(),
            dir.path().join("a_win_10x10.jpeg")
        );

        std::fs::write(dir.path().join("a_win_10x10.jpg"), b"x").unwrap();
        assert_eq!(
            find_template(dir.path(), "a_win_10x10").unwrap(),
            dir.path().join("a_win_10x10.jpg")
        );

        std::fs::write(dir.path().join("a_win_10x10.png"), b"x").unwrap();
        assert_eq!(
            find_template(dir.path(), "a_win_10x10").unwrap(),
            dir.path().join("a_win_10x10.png")
        );
    }

    #[test]
    fn test_require_template_names_missing_path() {
        let dir = tempfile::tempdir().unwrap();
        let err = require_template(dir.path(), "missing_mac_100x100").unwrap_err();
        assert!(err.to_string().contains("missing_mac_100x100"));
    }

    #[test]
    fn test_layout() {
        let paths = AssetPaths::new("/tmp/project");
        assert_eq!(paths.template_dir(), PathBuf::from("/tmp/project/template_pic"));
        assert_eq!(
            paths.cache_dir(),
            PathBuf::from("/tmp/project/pic_cache_for_text")
        );
        assert_eq!(with_subfolder(&paths.template_dir(), ""), paths.template_dir());
        assert_eq!(
            with_subfolder(&paths.template_dir(), "im"),
            PathBuf::from("/tmp/project/template_pic/im")
        );
    }
}
