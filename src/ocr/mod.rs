//! OCR collaborator: a black box turning an image into text lines.

pub mod engine;
pub mod setup;

pub use engine::{OcrEngine, OcrLine, TesseractEngine};
pub use setup::{ensure_tesseract, TesseractPaths};

use anyhow::Result;

use crate::config::OcrConfig;

/// Locates Tesseract and its language data and builds an engine.
pub fn tesseract_from_config(config: &OcrConfig) -> Result<TesseractEngine> {
    let paths = ensure_tesseract(config)?;
    Ok(TesseractEngine::new(paths, config.languages.clone()))
}
