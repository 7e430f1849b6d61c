//! Candidate ordering and duplicate suppression.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

use crate::geometry::{Position, Region};

/// Ordering applied to the final region list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortRule {
    /// Best score first. OCR regions carry no score and keep recognition order.
    #[default]
    ScoreDesc,
    /// Top-left y ascending, then x ascending.
    ReadingOrder,
}

/// A raw template hit: top-left pixel and its similarity.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Candidate {
    pub x: u32,
    pub y: u32,
    pub score: f32,
}

/// Collapses clusters of adjacent candidates into one representative.
///
/// Input is sorted best-first; implementations keep that order.
pub trait Deduplicator {
    fn dedup(&self, sorted: Vec<Candidate>) -> Vec<Candidate>;
}

/// Single pass greedy clustering.
///
/// Each kept candidate opens a cluster tracking its min/max x and y. A later
/// candidate within one pixel of a cluster's extent grows that cluster and
/// is dropped. Clusters are never merged with each other, so two clusters
/// bridged by a later candidate stay separate. Approximates
/// connected-component labeling; swap the [`Deduplicator`] for exact grouping.
#[derive(Debug, Clone, Copy, Default)]
pub struct GreedyClusterDedup;

#[derive(Debug, Clone, Copy)]
struct Cluster {
    x_min: i64,
    x_max: i64,
    y_min: i64,
    y_max: i64,
}

impl Cluster {
    fn seed(x: i64, y: i64) -> Self {
        Self {
            x_min: x,
            x_max: x,
            y_min: y,
            y_max: y,
        }
    }

    fn touches(&self, x: i64, y: i64) -> bool {
        !(x > self.x_max + 1 || x < self.x_min - 1 || y > self.y_max + 1 || y < self.y_min - 1)
    }

    fn absorb(&mut self, x: i64, y: i64) {
        self.x_min = self.x_min.min(x);
        self.x_max = self.x_max.max(x);
        self.y_min = self.y_min.min(y);
        self.y_max = self.y_max.max(y);
    }
}

impl Deduplicator for GreedyClusterDedup {
    fn dedup(&self, sorted: Vec<Candidate>) -> Vec<Candidate> {
        let mut clusters: Vec<Cluster> = Vec::new();
        let mut kept = Vec::new();

        for candidate in sorted {
            let (x, y) = (candidate.x as i64, candidate.y as i64);
            match clusters.iter_mut().find(|c| c.touches(x, y)) {
                Some(cluster) => cluster.absorb(x, y),
                None => {
                    clusters.push(Cluster::seed(x, y));
                    kept.push(candidate);
                }
            }
        }

        kept
    }
}

/// Sorts candidates best score first. Ties keep scan order.
pub fn sort_by_score(candidates: &mut [Candidate]) {
    candidates.sort_by(|a, b| b.score.total_cmp(&a.score));
}

/// Applies `rule` to an already built region list.
pub fn sort_regions(regions: &mut [Region], rule: SortRule) {
    match rule {
        SortRule::ScoreDesc => regions.sort_by(|a, b| match (a.score(), b.score()) {
            (Some(sa), Some(sb)) => sb.total_cmp(&sa),
            _ => Ordering::Equal,
        }),
        SortRule::ReadingOrder => regions.sort_by(|a, b| {
            let (pa, pb) = (a.point(Position::LeftTop), b.point(Position::LeftTop));
            pa.y.total_cmp(&pb.y).then(pa.x.total_cmp(&pb.x))
        }),
    }
}
