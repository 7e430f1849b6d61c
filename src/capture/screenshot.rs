//! Screenshot capture of the primary monitor via xcap.

use anyhow::{anyhow, Context, Result};
use chrono::Local;
use std::path::Path;

use super::ScreenCapture;

/// Captures whichever monitor the OS reports as primary.
#[derive(Debug, Default, Clone, Copy)]
pub struct PrimaryMonitor;

impl ScreenCapture for PrimaryMonitor {
    fn capture_to(&self, path: &Path) -> Result<()> {
        let monitors =
            xcap::Monitor::all().map_err(|e| anyhow!("Failed to enumerate monitors: {}", e))?;
        let primary = monitors
            .iter()
            .position(|m| m.is_primary().unwrap_or(false))
            .unwrap_or(0);
        let monitor = monitors
            .get(primary)
            .ok_or_else(|| anyhow!("No monitors found"))?;

        let img = monitor
            .capture_image()
            .map_err(|e| anyhow!("Failed to capture screen: {}", e))?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        img.save(path)
            .with_context(|| format!("Failed to save screenshot to {}", path.display()))?;
        Ok(())
    }
}

/// Unique screenshot stem: local timestamp plus a random UUID.
pub fn screenshot_name() -> String {
    format!(
        "{}_{}",
        Local::now().format("%Y%m%d_%H%M%S%.3f"),
        uuid::Uuid::new_v4()
    )
}
