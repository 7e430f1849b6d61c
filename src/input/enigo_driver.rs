//! enigo-based pointer driver for macOS and other non-Windows hosts.

use anyhow::{anyhow, Result};
use enigo::{Button, Coordinate, Direction, Enigo, Mouse, Settings};

use super::{MouseButton, PointerDriver};
use crate::geometry::Point;

pub struct EnigoDriver {
    enigo: Enigo,
}

impl EnigoDriver {
    pub fn new() -> Result<Self> {
        let enigo = Enigo::new(&Settings::default())
            .map_err(|e| anyhow!("Failed to create Enigo: {}", e))?;
        Ok(Self { enigo })
    }

    fn button(&mut self, button: MouseButton, direction: Direction) -> Result<()> {
        let button = match button {
            MouseButton::Left => Button::Left,
            MouseButton::Right => Button::Right,
        };
        self.enigo
            .button(button, direction)
            .map_err(|e| anyhow!("Mouse {:?} {:?} failed: {}", button, direction, e))
    }
}

impl PointerDriver for EnigoDriver {
    fn move_to(&mut self, point: Point) -> Result<()> {
        let (x, y) = (point.x.round() as i32, point.y.round() as i32);
        self.enigo
            .move_mouse(x, y, Coordinate::Abs)
            .map_err(|e| anyhow!("Failed to move mouse to ({}, {}): {}", x, y, e))
    }

    fn press(&mut self, button: MouseButton) -> Result<()> {
        self.button(button, Direction::Press)
    }

    fn release(&mut self, button: MouseButton) -> Result<()> {
        self.button(button, Direction::Release)
    }

    fn click(&mut self, button: MouseButton) -> Result<()> {
        self.button(button, Direction::Click)
    }

    fn double_click(&mut self, button: MouseButton) -> Result<()> {
        self.button(button, Direction::Click)?;
        self.button(button, Direction::Click)
    }
}
