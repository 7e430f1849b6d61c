//! Configuration for a test session.
//!
//! Loads settings from a JSON file. Provides match thresholds, poll timing
//! defaults for both strategies, per-device scale overrides, and OCR setup.

use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

/// Default poll timing for one matching strategy, in seconds.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct PollDefaults {
    #[serde(default)]
    pub before: f64,
    pub timeout: f64,
    #[serde(default)]
    pub interval: f64,
    #[serde(default)]
    pub after: f64,
}

impl PollDefaults {
    pub const fn new(before: f64, timeout: f64, interval: f64, after: f64) -> Self {
        Self {
            before,
            timeout,
            interval,
            after,
        }
    }
}

/// OCR engine settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct OcrConfig {
    /// Explicit tesseract executable; searched on PATH when unset
    #[serde(default)]
    pub tesseract_path: Option<PathBuf>,
    /// Explicit tessdata directory; a per-user data dir is used when unset
    #[serde(default)]
    pub tessdata_dir: Option<PathBuf>,
    /// Tesseract language spec, e.g. "chi_sim+eng"
    #[serde(default = "default_ocr_languages")]
    pub languages: String,
}

impl Default for OcrConfig {
    fn default() -> Self {
        Self {
            tesseract_path: None,
            tessdata_dir: None,
            languages: default_ocr_languages(),
        }
    }
}

fn default_ocr_languages() -> String {
    "chi_sim+eng".to_string()
}

/// Complete session configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AutotestConfig {
    /// Project root holding template_pic/, pic_cache_for_text/ and screenshot/
    #[serde(default = "default_root_path")]
    pub root_path: PathBuf,
    /// Template similarity threshold, in (0, 1)
    #[serde(default = "default_threshold")]
    pub threshold: f32,
    /// Threshold used when matching a cached text crop; expects a near-exact echo
    #[serde(default = "default_cache_threshold")]
    pub cache_threshold: f32,
    #[serde(default = "default_pic_poll")]
    pub pic_poll: PollDefaults,
    #[serde(default = "default_text_poll")]
    pub text_poll: PollDefaults,
    /// Device id to scale factor overrides
    #[serde(default)]
    pub device_scales: HashMap<String, f64>,
    /// Where the device id is persisted; `~/pc_uuid.txt` when unset
    #[serde(default)]
    pub device_id_path: Option<PathBuf>,
    /// Pause between moving onto a target and double-clicking it
    #[serde(default = "default_double_click_pause_ms")]
    pub double_click_pause_ms: u64,
    /// Race timeout per configuration when the caller gives none (seconds)
    #[serde(default = "default_race_timeout_per_config")]
    pub race_timeout_per_config: f64,
    #[serde(default = "default_clear_alert_timeout")]
    pub clear_alert_timeout: f64,
    #[serde(default = "default_clear_alert_repeat")]
    pub clear_alert_repeat: u32,
    #[serde(default)]
    pub ocr: OcrConfig,
    /// Mirror log lines into `<root>/logs/dtclient_autotest.log`
    #[serde(default)]
    pub log_to_file: bool,
    /// Save an annotated copy of every direct match into `<root>/preview/`
    #[serde(default)]
    pub preview: bool,
}

fn default_root_path() -> PathBuf {
    PathBuf::from(".")
}

fn default_threshold() -> f32 {
    0.7
}

fn default_cache_threshold() -> f32 {
    0.91
}

fn default_pic_poll() -> PollDefaults {
    PollDefaults::new(0.0, 10.0, 0.0, 0.0)
}

fn default_text_poll() -> PollDefaults {
    PollDefaults::new(0.0, 35.0, 0.0, 0.0)
}

fn default_double_click_pause_ms() -> u64 {
    1000
}

fn default_race_timeout_per_config() -> f64 {
    3.0
}

fn default_clear_alert_timeout() -> f64 {
    10.0
}

fn default_clear_alert_repeat() -> u32 {
    1
}

impl Default for AutotestConfig {
    fn default() -> Self {
        Self {
            root_path: default_root_path(),
            threshold: default_threshold(),
            cache_threshold: default_cache_threshold(),
            pic_poll: default_pic_poll(),
            text_poll: default_text_poll(),
            device_scales: HashMap::new(),
            device_id_path: None,
            double_click_pause_ms: default_double_click_pause_ms(),
            race_timeout_per_config: default_race_timeout_per_config(),
            clear_alert_timeout: default_clear_alert_timeout(),
            clear_alert_repeat: default_clear_alert_repeat(),
            ocr: OcrConfig::default(),
            log_to_file: false,
            preview: false,
        }
    }
}

impl AutotestConfig {
    /// Rejects thresholds outside (0, 1) and negative durations.
    pub fn validate(&self) -> Result<()> {
        check_threshold("threshold", self.threshold)?;
        check_threshold("cache_threshold", self.cache_threshold)?;
        check_poll("pic_poll", &self.pic_poll)?;
        check_poll("text_poll", &self.text_poll)?;
        check_seconds("race_timeout_per_config", self.race_timeout_per_config)?;
        check_seconds("clear_alert_timeout", self.clear_alert_timeout)?;
        for (id, scale) in &self.device_scales {
            if !(scale.is_finite() && *scale > 0.0) {
                return Err(anyhow!(
                    "device_scales[{}] must be a positive number, got {}",
                    id,
                    scale
                ));
            }
        }
        Ok(())
    }
}

/// Checks a similarity threshold lies strictly inside (0, 1).
pub fn check_threshold(name: &str, value: f32) -> Result<()> {
    if value > 0.0 && value < 1.0 {
        Ok(())
    } else {
        Err(anyhow!("{} must be within (0, 1), got {}", name, value))
    }
}

fn check_seconds(name: &str, value: f64) -> Result<()> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(anyhow!("{} must be a non-negative duration, got {}", name, value))
    }
}

fn check_poll(name: &str, poll: &PollDefaults) -> Result<()> {
    check_seconds(&format!("{}.before", name), poll.before)?;
    check_seconds(&format!("{}.timeout", name), poll.timeout)?;
    check_seconds(&format!("{}.interval", name), poll.interval)?;
    check_seconds(&format!("{}.after", name), poll.after)
}

/// Loads configuration from a JSON file or returns defaults.
pub fn load_config(config_path: &Path) -> AutotestConfig {
    crate::log(&format!("Looking for config at: {}", config_path.display()));

    if config_path.exists() {
        match fs::read_to_string(config_path) {
            Ok(contents) => match serde_json::from_str(&contents) {
                Ok(config) => {
                    crate::log("Config loaded");
                    return config;
                }
                Err(e) => {
                    crate::log(&format!(
                        "Failed to parse {}: {}. Using defaults.",
                        config_path.display(),
                        e
                    ));
                }
            },
            Err(e) => {
                crate::log(&format!(
                    "Failed to read {}: {}. Using defaults.",
                    config_path.display(),
                    e
                ));
            }
        }
    } else {
        crate::log("Config file not found. Using defaults.");
    }

    AutotestConfig::default()
}
