//! Debug previews: the capture with every matched region outlined in red.

use anyhow::{Context, Result};
use image::{Rgba, RgbaImage};
use imageproc::drawing::draw_hollow_rect_mut;
use imageproc::rect::Rect;
use std::path::Path;

use crate::geometry::{MatchResult, Position};

const OUTLINE: Rgba<u8> = Rgba([255, 0, 0, 255]);
const THICKNESS: i32 = 2;

/// Returns a copy of `image` with each region's box outlined.
pub fn render_preview(image: &RgbaImage, result: &MatchResult) -> RgbaImage {
    let mut canvas = image.clone();
    for region in &result.regions {
        let lt = region.point(Position::LeftTop);
        let rb = region.point(Position::RightBottom);
        let (x, y) = (lt.x as i32, lt.y as i32);
        let (w, h) = ((rb.x - lt.x) as i32, (rb.y - lt.y) as i32);

        for inset in 0..THICKNESS {
            let (rw, rh) = (w - 2 * inset, h - 2 * inset);
            if rw <= 0 || rh <= 0 {
                break;
            }
            let rect = Rect::at(x + inset, y + inset).of_size(rw as u32, rh as u32);
            draw_hollow_rect_mut(&mut canvas, rect, OUTLINE);
        }
    }
    canvas
}

/// Renders a preview of `capture` and writes it to `dest`.
pub fn save_preview(capture: &Path, result: &MatchResult, dest: &Path) -> Result<()> {
    let image = image::open(capture)
        .with_context(|| format!("Failed to open capture {}", capture.display()))?
        .to_rgba8();
    if let Some(parent) = dest.parent() {
        std::fs::create_dir_all(parent)?;
    }
    render_preview(&image, result)
        .save(dest)
        .with_context(|| format!("Failed to write preview {}", dest.display()))?;
    crate::log(&format!(
        "Preview with {} regions saved to {}",
        result.len(),
        dest.display()
    ));
    Ok(())
}
