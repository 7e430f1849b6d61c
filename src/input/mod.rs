//! Pointer input for UI automation.
//!
//! This module provides:
//! - The [`PointerDriver`] seam over OS-level mouse synthesis
//! - A SendInput driver on Windows and an enigo driver elsewhere
//! - Point resolution and the click/move interactions built on top

pub mod act;
#[cfg(not(windows))]
mod enigo_driver;
#[cfg(windows)]
mod sendinput;

pub use act::{act, resolve_point, ActMode, ActSpec};
#[cfg(not(windows))]
pub use enigo_driver::EnigoDriver;
#[cfg(windows)]
pub use sendinput::SendInputDriver;

use anyhow::Result;

use crate::geometry::Point;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MouseButton {
    Left,
    Right,
}

/// OS-level pointer synthesis. Coordinates are logical screen coordinates.
pub trait PointerDriver {
    fn move_to(&mut self, point: Point) -> Result<()>;
    fn press(&mut self, button: MouseButton) -> Result<()>;
    fn release(&mut self, button: MouseButton) -> Result<()>;
    /// Press and release at the current position.
    fn click(&mut self, button: MouseButton) -> Result<()>;
    fn double_click(&mut self, button: MouseButton) -> Result<()>;
}

/// Creates the pointer driver for the running platform.
pub fn platform_pointer() -> Result<Box<dyn PointerDriver>> {
    #[cfg(windows)]
    {
        Ok(Box::new(SendInputDriver::new()))
    }
    #[cfg(not(windows))]
    {
        Ok(Box::new(EnigoDriver::new()?))
    }
}
