//! Platform detection, persistent device identity, and pixel scaling.
//!
//! Captures are taken in physical pixels while the pointer is driven in
//! logical coordinates, so every interaction point is divided by the
//! device's scale factor before it reaches the OS.

use anyhow::{anyhow, Context, Result};
use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use crate::geometry::Point;

/// Name of the device identity file in the user's home directory.
pub const DEVICE_ID_FILE: &str = "pc_uuid.txt";

/// The two supported desktop OS families.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OsFamily {
    Windows,
    Mac,
}

impl OsFamily {
    /// Detects the running OS. Anything else is unsupported.
    pub fn current() -> Result<Self> {
        Self::from_target(std::env::consts::OS)
    }

    fn from_target(os: &str) -> Result<Self> {
        match os {
            "windows" => Ok(OsFamily::Windows),
            "macos" => Ok(OsFamily::Mac),
            other => Err(anyhow!("unsupported OS: {}", other)),
        }
    }

    /// Short tag used in asset file names.
    pub fn as_str(&self) -> &'static str {
        match self {
            OsFamily::Windows => "win",
            OsFamily::Mac => "mac",
        }
    }

    /// Scale used when the device has no explicit override.
    pub fn default_scale(&self) -> f64 {
        match self {
            OsFamily::Windows => 1.0,
            OsFamily::Mac => 2.0,
        }
    }
}

impl fmt::Display for OsFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Mac instruction-set variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Architecture {
    Arm64,
    X86,
}

impl fmt::Display for Architecture {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Architecture::Arm64 => write!(f, "arm64"),
            Architecture::X86 => write!(f, "x86"),
        }
    }
}

/// Returns the chip architecture. Only meaningful on Mac.
pub fn architecture(os: OsFamily) -> Result<Architecture> {
    architecture_for(os, std::env::consts::ARCH)
}

fn architecture_for(os: OsFamily, arch: &str) -> Result<Architecture> {
    if os != OsFamily::Mac {
        return Err(anyhow!("architecture() is only available on mac, current os: {}", os));
    }
    match arch {
        "aarch64" => Ok(Architecture::Arm64),
        "x86" | "x86_64" => Ok(Architecture::X86),
        other => Err(anyhow!("unsupported mac architecture: {}", other)),
    }
}

/// Returns `~/pc_uuid.txt`.
pub fn default_device_id_path() -> Result<PathBuf> {
    dirs::home_dir()
        .map(|home| home.join(DEVICE_ID_FILE))
        .ok_or_else(|| anyhow!("Could not determine home directory for device id"))
}

/// Reads the persisted device id, generating and writing one on first use.
pub fn load_or_create_device_id(path: &Path) -> Result<String> {
    if path.exists() {
        let id = fs::read_to_string(path)
            .with_context(|| format!("Failed to read device id from {}", path.display()))?;
        return Ok(id.trim().to_string());
    }

    let id = uuid::Uuid::new_v4().to_string();
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, &id)
        .with_context(|| format!("Failed to write device id to {}", path.display()))?;
    crate::log(&format!("Generated device id {} at {}", id, path.display()));
    Ok(id)
}

/// Per-device override if present, else the OS default.
pub fn resolve_scale(os: OsFamily, device_id: &str, overrides: &HashMap<String, f64>) -> f64 {
    overrides
        .get(device_id)
        .copied()
        .unwrap_or_else(|| os.default_scale())
}

/// The machine the session runs on.
#[derive(Debug, Clone)]
pub struct Device {
    pub os: OsFamily,
    pub id: String,
    scale: f64,
}

impl Device {
    pub fn new(os: OsFamily, id: impl Into<String>, overrides: &HashMap<String, f64>) -> Self {
        let id = id.into();
        let scale = resolve_scale(os, &id, overrides);
        Self { os, id, scale }
    }

    /// Detects the OS and loads the persisted id.
    pub fn detect(id_path: Option<&Path>, overrides: &HashMap<String, f64>) -> Result<Self> {
        let os = OsFamily::current()?;
        let id_path = match id_path {
            Some(path) => path.to_path_buf(),
            None => default_device_id_path()?,
        };
        let id = load_or_create_device_id(&id_path)?;
        let device = Self::new(os, id, overrides);
        crate::log(&format!(
            "Device: os={}, id={}, scale={}",
            device.os, device.id, device.scale
        ));
        Ok(device)
    }

    pub fn scale(&self) -> f64 {
        self.scale
    }

    /// Converts a capture pixel into a pointer coordinate.
    pub fn to_physical(&self, point: Point) -> Point {
        Point::new(point.x / self.scale, point.y / self.scale)
    }
}
