//! Nine-point region model shared by both matching strategies.
//!
//! ```text
//! LeftTop ------ MidTop ------ RightTop
//!    |                            |
//! LeftMid ------ Center ------ RightMid
//!    |                            |
//! LeftBottom -- MidBottom -- RightBottom
//! ```
//!
//! All nine points are stored, not derived. Offsetting one point leaves the
//! other eight where they were.

use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};

/// A coordinate in capture-pixel space.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    fn midpoint(a: Point, b: Point) -> Point {
        Point::new((a.x + b.x) / 2.0, (a.y + b.y) / 2.0)
    }
}

/// Named anchor points of a region.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Position {
    #[default]
    Center,
    LeftTop,
    MidTop,
    RightTop,
    RightMid,
    RightBottom,
    MidBottom,
    LeftBottom,
    LeftMid,
}

impl Position {
    /// Center first, then clockwise from the top-left corner.
    pub const ALL: [Position; 9] = [
        Position::Center,
        Position::LeftTop,
        Position::MidTop,
        Position::RightTop,
        Position::RightMid,
        Position::RightBottom,
        Position::MidBottom,
        Position::LeftBottom,
        Position::LeftMid,
    ];

    fn index(self) -> usize {
        match self {
            Position::Center => 0,
            Position::LeftTop => 1,
            Position::MidTop => 2,
            Position::RightTop => 3,
            Position::RightMid => 4,
            Position::RightBottom => 5,
            Position::MidBottom => 6,
            Position::LeftBottom => 7,
            Position::LeftMid => 8,
        }
    }
}

/// What a region was matched on.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Payload {
    /// Template similarity score
    Score(f32),
    /// Recognized OCR line text
    Text(String),
}

/// A located rectangle with its nine interaction points.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Region {
    points: [Point; 9],
    pub payload: Payload,
}

impl Region {
    /// Interpolates the nine points from an axis-aligned box.
    ///
    /// Zero-width or zero-height boxes are fine; points collapse onto an edge.
    pub fn from_bounding_box(top_left: Point, bottom_right: Point, payload: Payload) -> Self {
        let mid = Point::midpoint(top_left, bottom_right);
        let (l, t, r, b) = (top_left.x, top_left.y, bottom_right.x, bottom_right.y);
        Self {
            points: [
                mid,
                Point::new(l, t),
                Point::new(mid.x, t),
                Point::new(r, t),
                Point::new(r, mid.y),
                Point::new(r, b),
                Point::new(mid.x, b),
                Point::new(l, b),
                Point::new(l, mid.y),
            ],
            payload,
        }
    }

    /// Builds a region from an OCR quadrilateral ordered lt, rt, rb, lb.
    ///
    /// The right-top corner is taken from the quad as-is; the other edges
    /// follow the lt/rb diagonal.
    pub fn from_quad(quad: &[Point; 4], payload: Payload) -> Self {
        let lt = quad[0];
        let rt = quad[1];
        let rb = quad[2];
        let mid = Point::midpoint(lt, rb);
        Self {
            points: [
                mid,
                lt,
                Point::new(mid.x, lt.y),
                rt,
                Point::new(rt.x, mid.y),
                rb,
                Point::new(mid.x, rb.y),
                Point::new(lt.x, rb.y),
                Point::new(lt.x, mid.y),
            ],
            payload,
        }
    }

    pub fn point(&self, position: Position) -> Point {
        self.points[position.index()]
    }

    pub fn center(&self) -> Point {
        self.point(Position::Center)
    }

    /// Returns a copy with one point replaced.
    pub fn with_point(&self, position: Position, point: Point) -> Self {
        let mut points = self.points;
        points[position.index()] = point;
        Self {
            points,
            payload: self.payload.clone(),
        }
    }

    /// Returns a copy with one point shifted by `(dx, dy)` pixels.
    pub fn offset(&self, position: Position, dx: i32, dy: i32) -> Self {
        let p = self.point(position);
        self.with_point(position, Point::new(p.x + dx as f64, p.y + dy as f64))
    }

    pub fn score(&self) -> Option<f32> {
        match self.payload {
            Payload::Score(s) => Some(s),
            Payload::Text(_) => None,
        }
    }

    pub fn text(&self) -> Option<&str> {
        match &self.payload {
            Payload::Text(t) => Some(t),
            Payload::Score(_) => None,
        }
    }
}

/// Optional window on the center point; inclusive on all sides.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Bounds {
    pub left: Option<f64>,
    pub right: Option<f64>,
    pub top: Option<f64>,
    pub bottom: Option<f64>,
}

/// Ordered regions from one lookup; index 0 is the best.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct MatchResult {
    pub regions: Vec<Region>,
}

impl MatchResult {
    pub fn new(regions: Vec<Region>) -> Self {
        Self { regions }
    }

    pub fn not_found() -> Self {
        Self::default()
    }

    pub fn found(&self) -> bool {
        !self.regions.is_empty()
    }

    pub fn len(&self) -> usize {
        self.regions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.regions.is_empty()
    }

    /// Returns the region at `index`, failing on an empty result or out-of-range index.
    pub fn region(&self, index: usize) -> Result<&Region> {
        if self.regions.is_empty() {
            return Err(anyhow!("match result is empty, nothing to interact with"));
        }
        self.regions.get(index).ok_or_else(|| {
            anyhow!(
                "priority_index out of range: priority_index = {}, regions = {}",
                index,
                self.regions.len()
            )
        })
    }

    /// Returns a copy with one region's named point shifted by `(dx, dy)`.
    pub fn offset_point(
        &self,
        index: usize,
        position: Position,
        dx: i32,
        dy: i32,
    ) -> Result<MatchResult> {
        let shifted = self.region(index)?.offset(position, dx, dy);
        let mut regions = self.regions.clone();
        regions[index] = shifted;
        Ok(MatchResult { regions })
    }

    /// Keeps regions whose center lies inside `bounds`.
    ///
    /// Missing bounds default to the full capture `resolution`.
    pub fn filter_by_bounds(&self, bounds: Bounds, resolution: (u32, u32)) -> MatchResult {
        let left = bounds.left.unwrap_or(0.0);
        let right = bounds.right.unwrap_or(resolution.0 as f64);
        let top = bounds.top.unwrap_or(0.0);
        let bottom = bounds.bottom.unwrap_or(resolution.1 as f64);

        let regions = self
            .regions
            .iter()
            .filter(|r| {
                let c = r.center();
                c.x >= left && c.x <= right && c.y >= top && c.y <= bottom
            })
            .cloned()
            .collect();
        MatchResult { regions }
    }
}
