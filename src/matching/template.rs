//! Template matching adapter.
//!
//! Scores every top-left placement of the template over the capture with
//! the mean-subtracted normalized cross-correlation (correlation
//! coefficient, in -1..=1) and turns the placements above threshold into
//! regions the size of the template.
//!
//! The raw correlation comes from imageproc's parallel matcher; window
//! means and variances come from integral images, so the extra cost per
//! placement is constant.

use anyhow::{Context, Result};
use image::{GrayImage, Luma};
use imageproc::definitions::Image;
use imageproc::integral_image::{integral_image, integral_squared_image, sum_image_pixels};
use imageproc::template_matching::{find_extremes, match_template_parallel, MatchTemplateMethod};
use std::path::Path;

use super::rank::{sort_by_score, sort_regions, Candidate, Deduplicator, SortRule};
use crate::geometry::{MatchResult, Payload, Point, Region};

/// Loads an image from disk as 8-bit grayscale.
pub fn load_gray(path: &Path) -> Result<GrayImage> {
    let img = image::open(path)
        .with_context(|| format!("Failed to load image: {}", path.display()))?;
    Ok(img.to_luma8())
}

/// Per-pixel variance (in gray levels squared) below which a window or
/// template counts as flat. Flat windows score 0.
const MIN_VARIANCE: f64 = 1.0;

fn fits(image: &GrayImage, template: &GrayImage) -> bool {
    template.width() > 0
        && template.height() > 0
        && template.width() <= image.width()
        && template.height() <= image.height()
}

/// Correlation coefficient of `template` at every top-left placement.
///
/// `None` when the template itself is flat, since nothing correlates with it.
pub fn correlation_scores(image: &GrayImage, template: &GrayImage) -> Option<Image<Luma<f32>>> {
    let (tw, th) = template.dimensions();
    let n = (tw as f64) * (th as f64);
    let (t_sum, t_sq) = template.pixels().fold((0u64, 0u64), |(sum, sq), p| {
        let v = p.0[0] as u64;
        (sum + v, sq + v * v)
    });
    let t_mean = t_sum as f64 / n;
    let t_var_sum = t_sq as f64 - (t_sum as f64) * (t_sum as f64) / n;
    if t_var_sum < MIN_VARIANCE * n {
        return None;
    }

    // sum(T' * I) = sum(T * I) - mean(T) * sum(I) over each window.
    let mut scores =
        match_template_parallel(image, template, MatchTemplateMethod::CrossCorrelation);
    let sums = integral_image::<_, u64>(image);
    let squares = integral_squared_image::<_, u64>(image);

    for (x, y, p) in scores.enumerate_pixels_mut() {
        let (right, bottom) = (x + tw - 1, y + th - 1);
        let w_sum = sum_image_pixels(&sums, x, y, right, bottom)[0] as f64;
        let w_sq = sum_image_pixels(&squares, x, y, right, bottom)[0] as f64;
        let w_var_sum = w_sq - w_sum * w_sum / n;

        p.0[0] = if w_var_sum < MIN_VARIANCE * n {
            0.0
        } else {
            let numerator = p.0[0] as f64 - t_mean * w_sum;
            (numerator / (t_var_sum * w_var_sum).sqrt()).clamp(-1.0, 1.0) as f32
        };
    }
    Some(scores)
}

/// Returns every placement scoring strictly above `threshold`, in scan order.
///
/// A template larger than the capture, or a flat one, yields no candidates.
pub fn score_candidates(image: &GrayImage, template: &GrayImage, threshold: f32) -> Vec<Candidate> {
    if !fits(image, template) {
        crate::log(&format!(
            "Template {}x{} does not fit capture {}x{}",
            template.width(),
            template.height(),
            image.width(),
            image.height()
        ));
        return Vec::new();
    }
    let Some(scores) = correlation_scores(image, template) else {
        crate::log("Template has no contrast, nothing can match it");
        return Vec::new();
    };

    scores
        .enumerate_pixels()
        .filter(|(_, _, p)| p.0[0].is_finite() && p.0[0] > threshold)
        .map(|(x, y, p)| Candidate {
            x,
            y,
            score: p.0[0],
        })
        .collect()
}

fn to_region(candidate: &Candidate, template: &GrayImage) -> Region {
    let (x, y) = (candidate.x as f64, candidate.y as f64);
    Region::from_bounding_box(
        Point::new(x, y),
        Point::new(x + template.width() as f64, y + template.height() as f64),
        Payload::Score(candidate.score),
    )
}

/// Finds all placements above `threshold`.
///
/// Candidates are sorted best-first, optionally collapsed by `dedup`, turned
/// into regions and finally ordered by `sort_rule`.
pub fn locate(
    image: &GrayImage,
    template: &GrayImage,
    threshold: f32,
    dedup: Option<&dyn Deduplicator>,
    sort_rule: SortRule,
) -> MatchResult {
    let mut candidates = score_candidates(image, template, threshold);
    sort_by_score(&mut candidates);
    if let Some(dedup) = dedup {
        candidates = dedup.dedup(candidates);
    }

    let mut regions: Vec<Region> = candidates.iter().map(|c| to_region(c, template)).collect();
    sort_regions(&mut regions, sort_rule);
    MatchResult::new(regions)
}

/// Finds only the single best placement, if it beats `threshold`.
pub fn locate_best(image: &GrayImage, template: &GrayImage, threshold: f32) -> MatchResult {
    if !fits(image, template) {
        return MatchResult::not_found();
    }
    let Some(scores) = correlation_scores(image, template) else {
        return MatchResult::not_found();
    };

    let extremes = find_extremes(&scores);
    let best = extremes.max_value;
    if !best.is_finite() || best <= threshold {
        return MatchResult::not_found();
    }

    let (x, y) = extremes.max_value_location;
    MatchResult::new(vec![to_region(&Candidate { x, y, score: best }, template)])
}
