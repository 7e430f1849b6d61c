//! Resolving a region point and performing the interaction.

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::{MouseButton, PointerDriver};
use crate::device::Device;
use crate::geometry::{MatchResult, Point, Position};

/// Interaction performed on the resolved point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActMode {
    #[default]
    LeftClick,
    RightClick,
    DoubleLeftClick,
    MoveOn,
}

impl std::fmt::Display for ActMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ActMode::LeftClick => write!(f, "left click"),
            ActMode::RightClick => write!(f, "right click"),
            ActMode::DoubleLeftClick => write!(f, "double left click"),
            ActMode::MoveOn => write!(f, "move on"),
        }
    }
}

/// Which region, which of its points, and what to do there.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ActSpec {
    #[serde(default)]
    pub priority_index: usize,
    #[serde(default)]
    pub position: Position,
    #[serde(default)]
    pub mode: ActMode,
}

impl ActSpec {
    pub fn new(priority_index: usize, position: Position, mode: ActMode) -> Self {
        Self {
            priority_index,
            position,
            mode,
        }
    }
}

/// Returns the capture-pixel point selected by `index` and `position`.
pub fn resolve_point(result: &MatchResult, index: usize, position: Position) -> Result<Point> {
    Ok(result.region(index)?.point(position))
}

/// Performs `spec` on `result` and returns the pointer coordinate used.
///
/// A left click is sent as move, press, release. A double click moves first
/// and waits `double_click_pause` before clicking twice.
pub fn act(
    pointer: &mut dyn PointerDriver,
    device: &Device,
    result: &MatchResult,
    spec: ActSpec,
    double_click_pause: Duration,
) -> Result<Point> {
    let pixel = resolve_point(result, spec.priority_index, spec.position)?;
    let target = device.to_physical(pixel);

    crate::log(&format!(
        "{} at ({:.1}, {:.1}) [pixel ({:.1}, {:.1}), scale {}]",
        spec.mode,
        target.x,
        target.y,
        pixel.x,
        pixel.y,
        device.scale()
    ));

    match spec.mode {
        ActMode::LeftClick => {
            pointer.move_to(target)?;
            pointer.press(MouseButton::Left)?;
            pointer.release(MouseButton::Left)?;
        }
        ActMode::RightClick => {
            pointer.move_to(target)?;
            pointer.click(MouseButton::Right)?;
        }
        ActMode::DoubleLeftClick => {
            pointer.move_to(target)?;
            std::thread::sleep(double_click_pause);
            pointer.double_click(MouseButton::Left)?;
        }
        ActMode::MoveOn => {
            pointer.move_to(target)?;
        }
    }

    Ok(target)
}
