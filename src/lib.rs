//! DingTalk desktop UI automation support.
//!
//! Locates regions of interest on screen through template matching or OCR,
//! converts them into nine-point regions, and drives the pointer at the
//! selected point. Every lookup can run inside a bounded poll, and text
//! lookups can be short-circuited by an on-disk image cache.

pub mod autotest;
pub mod cache;
pub mod capture;
pub mod config;
pub mod device;
pub mod geometry;
pub mod input;
pub mod matching;
pub mod ocr;
pub mod paths;
pub mod poll;
pub mod preview;

pub use autotest::Autotest;
pub use cache::{CacheKey, CacheQuery};
pub use config::{load_config, AutotestConfig};
pub use geometry::{Bounds, MatchResult, Payload, Point, Position, Region};
pub use input::{ActMode, ActSpec};
pub use matching::{PicQuery, SortRule, TextQuery};
pub use poll::{PollOverrides, PollState, PollTiming, RaceHit};

use chrono::Local;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::PathBuf;
use std::sync::Mutex;

static LOG_FILE: Mutex<Option<PathBuf>> = Mutex::new(None);

/// Routes log lines to a file in addition to stdout. `None` turns it off.
pub fn set_log_file(path: Option<PathBuf>) {
    if let Some(dir) = path.as_ref().and_then(|p| p.parent()) {
        let _ = std::fs::create_dir_all(dir);
    }
    if let Ok(mut guard) = LOG_FILE.lock() {
        *guard = path;
    }
}

/// Logs a message to both console and log file with timestamp.
pub fn log(msg: &str) {
    let timestamp = Local::now().format("%H:%M:%S%.3f");
    let line = format!("[{}] {}\n", timestamp, msg);
    print!("{}", line);
    let log_path = match LOG_FILE.lock() {
        Ok(guard) => guard.clone(),
        Err(_) => None,
    };
    if let Some(log_path) = log_path {
        if let Ok(mut file) = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&log_path)
        {
            let _ = file.write_all(line.as_bytes());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_appends_to_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("logs").join("run.log");
        set_log_file(Some(path.clone()));
        log("first line");
        log("second line");
        set_log_file(None);
        log("not written");

        let contents = std::fs::read_to_string(&path).unwrap();
        assert!(contents.contains("] first line"));
        assert!(contents.contains("] second line"));
        assert!(!contents.contains("not written"));
    }
}
