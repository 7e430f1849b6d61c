//! Image cache for OCR text lookups.
//!
//! The first successful OCR lookup for a key crops the matched line out of
//! the capture and stores it as
//! `<root>/pic_cache_for_text/<subfolder>/<key>_<os>_<w>x<h>.png`.
//! Later lookups with the same key try a template match against that crop
//! first and only fall back to OCR when it no longer matches, deleting the
//! stale crop on the way. Staleness is only discovered on a miss.
//!
//! The cache directory assumes one active session per machine.

use anyhow::{anyhow, Context, Result};
use image::GenericImageView;
use sha2::{Digest, Sha256};
use std::fmt;
use std::path::{Path, PathBuf};

use crate::device::OsFamily;
use crate::geometry::{MatchResult, Position, Region};
use crate::matching::TextQuery;
use crate::paths::{resolution_qualified_name, with_subfolder};
use crate::poll::PollOverrides;

/// Default namespace under the cache directory.
pub const DEFAULT_SUBFOLDER: &str = "default";

/// Identifies one cached lookup.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey(String);

impl CacheKey {
    /// An explicit, caller-chosen key. It becomes part of a file name.
    pub fn new(name: impl Into<String>) -> Result<Self> {
        let name = name.into();
        if name.is_empty() {
            return Err(anyhow!("cache key must not be empty"));
        }
        if name.contains(['/', '\\']) || name == "." || name == ".." {
            return Err(anyhow!("cache key must be a plain file name, got {:?}", name));
        }
        Ok(Self(name))
    }

    /// A key fingerprinting a source location; see [`cache_key!`](crate::cache_key).
    pub fn from_call_site(file: &str, module: &str, line: u32, column: u32) -> Self {
        let site = format!("{}::{}::{}:{}", file, module, line, column);
        Self(hex::encode(Sha256::digest(site.as_bytes())))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Builds a [`CacheKey`] from the invocation's file, module, line and column.
///
/// Moving the call to another line changes the key and orphans the old crop.
#[macro_export]
macro_rules! cache_key {
    () => {
        $crate::cache::CacheKey::from_call_site(file!(), module_path!(), line!(), column!())
    };
}

/// A text lookup with an image-cache fast path.
#[derive(Debug, Clone)]
pub struct CacheQuery {
    pub text: TextQuery,
    pub key: CacheKey,
    /// Threshold for matching the cached crop; the session's cache threshold when unset
    pub threshold: Option<f32>,
    /// Cache base directory; `<root>/pic_cache_for_text` when unset
    pub sub_path: Option<PathBuf>,
    pub subfolder: String,
    pub text_poll: PollOverrides,
    pub pic_poll: PollOverrides,
}

impl CacheQuery {
    pub fn new(text: TextQuery, key: CacheKey) -> Self {
        Self {
            text,
            key,
            threshold: None,
            sub_path: None,
            subfolder: DEFAULT_SUBFOLDER.to_string(),
            text_poll: PollOverrides::default(),
            pic_poll: PollOverrides::default(),
        }
    }

    pub fn threshold(mut self, threshold: f32) -> Self {
        self.threshold = Some(threshold);
        self
    }

    pub fn sub_path(mut self, sub_path: impl Into<PathBuf>) -> Self {
        self.sub_path = Some(sub_path.into());
        self
    }

    pub fn subfolder(mut self, subfolder: impl Into<String>) -> Self {
        self.subfolder = subfolder.into();
        self
    }

    pub fn text_poll(mut self, overrides: PollOverrides) -> Self {
        self.text_poll = overrides;
        self
    }

    pub fn pic_poll(mut self, overrides: PollOverrides) -> Self {
        self.pic_poll = overrides;
        self
    }
}

/// Result of a cached lookup and which path produced it.
#[derive(Debug, Clone, PartialEq)]
pub struct CachedLookup {
    pub result: MatchResult,
    /// True when the cached crop answered and OCR was skipped
    pub via_cache: bool,
}

/// Path of the cached crop for `key` on this OS and resolution.
pub fn cache_file(
    base: &Path,
    subfolder: &str,
    key: &CacheKey,
    os: OsFamily,
    resolution: (u32, u32),
) -> PathBuf {
    with_subfolder(base, subfolder).join(format!(
        "{}.png",
        resolution_qualified_name(key.as_str(), os, resolution)
    ))
}

/// Crops `region`'s box out of `capture` and writes it to `dest`.
///
/// The box is truncated to whole pixels and clamped to the image. Returns
/// `false` without writing when nothing is left.
pub fn store_crop(capture: &Path, region: &Region, dest: &Path) -> Result<bool> {
    let img = image::open(capture)
        .with_context(|| format!("Failed to open capture {}", capture.display()))?;
    let (width, height) = img.dimensions();

    let lt = region.point(Position::LeftTop);
    let rb = region.point(Position::RightBottom);
    let clamp = |v: f64, max: u32| (v.max(0.0) as u32).min(max);
    let (x0, y0) = (clamp(lt.x, width), clamp(lt.y, height));
    let (x1, y1) = (clamp(rb.x, width), clamp(rb.y, height));

    if x1 <= x0 || y1 <= y0 {
        crate::log(&format!(
            "Skipping cache write for empty crop ({}, {})-({}, {})",
            x0, y0, x1, y1
        ));
        return Ok(false);
    }

    if let Some(parent) = dest.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let crop = img.crop_imm(x0, y0, x1 - x0, y1 - y0);
    crop.save(dest)
        .with_context(|| format!("Failed to write cache crop {}", dest.display()))?;
    crate::log(&format!(
        "Cached {}x{} crop at {}",
        x1 - x0,
        y1 - y0,
        dest.display()
    ));
    Ok(true)
}

/// Deletes a stale cached crop.
pub fn invalidate(path: &Path) -> Result<()> {
    if path.exists() {
        std::fs::remove_file(path)
            .with_context(|| format!("Failed to delete stale cache {}", path.display()))?;
        crate::log(&format!("Invalidated stale cache {}", path.display()));
    }
    Ok(())
}
