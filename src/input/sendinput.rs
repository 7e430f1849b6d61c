//! SendInput-based pointer driver.
//!
//! Simulates hardware-level input, which the client processes like a real
//! mouse. Moves the actual cursor.

use anyhow::{anyhow, Result};

use windows::Win32::UI::Input::KeyboardAndMouse::{
    SendInput, INPUT, INPUT_0, INPUT_MOUSE, MOUSEEVENTF_ABSOLUTE, MOUSEEVENTF_LEFTDOWN,
    MOUSEEVENTF_LEFTUP, MOUSEEVENTF_MOVE, MOUSEEVENTF_RIGHTDOWN, MOUSEEVENTF_RIGHTUP,
    MOUSE_EVENT_FLAGS, MOUSEINPUT,
};
use windows::Win32::UI::WindowsAndMessaging::{GetSystemMetrics, SM_CXSCREEN, SM_CYSCREEN};

use super::{MouseButton, PointerDriver};
use crate::geometry::Point;

/// Delay between the two clicks of a double click; well under the system threshold.
const DOUBLE_CLICK_GAP_MS: u64 = 50;

pub struct SendInputDriver {
    /// Last absolute position, normalized to 0..=65535
    position: (i32, i32),
}

impl SendInputDriver {
    pub fn new() -> Self {
        Self { position: (0, 0) }
    }

    fn send(&self, flags: MOUSE_EVENT_FLAGS) -> Result<()> {
        let input = INPUT {
            r#type: INPUT_MOUSE,
            Anonymous: INPUT_0 {
                mi: MOUSEINPUT {
                    dx: self.position.0,
                    dy: self.position.1,
                    dwFlags: flags | MOUSEEVENTF_ABSOLUTE | MOUSEEVENTF_MOVE,
                    ..Default::default()
                },
            },
        };
        let sent = unsafe { SendInput(&[input], std::mem::size_of::<INPUT>() as i32) };
        if sent != 1 {
            return Err(anyhow!("SendInput rejected mouse event (flags {:?})", flags));
        }
        Ok(())
    }
}

impl Default for SendInputDriver {
    fn default() -> Self {
        Self::new()
    }
}

fn button_flags(button: MouseButton) -> (MOUSE_EVENT_FLAGS, MOUSE_EVENT_FLAGS) {
    match button {
        MouseButton::Left => (MOUSEEVENTF_LEFTDOWN, MOUSEEVENTF_LEFTUP),
        MouseButton::Right => (MOUSEEVENTF_RIGHTDOWN, MOUSEEVENTF_RIGHTUP),
    }
}

impl PointerDriver for SendInputDriver {
    fn move_to(&mut self, point: Point) -> Result<()> {
        let screen_width = unsafe { GetSystemMetrics(SM_CXSCREEN) };
        let screen_height = unsafe { GetSystemMetrics(SM_CYSCREEN) };
        if screen_width <= 0 || screen_height <= 0 {
            return Err(anyhow!("GetSystemMetrics returned no screen size"));
        }

        // Normalize to 0-65535 range (required by MOUSEEVENTF_ABSOLUTE)
        let norm_x = ((point.x.round() as i64 * 65535) / screen_width as i64) as i32;
        let norm_y = ((point.y.round() as i64 * 65535) / screen_height as i64) as i32;
        self.position = (norm_x, norm_y);

        self.send(MOUSE_EVENT_FLAGS(0))
    }

    fn press(&mut self, button: MouseButton) -> Result<()> {
        self.send(button_flags(button).0)
    }

    fn release(&mut self, button: MouseButton) -> Result<()> {
        self.send(button_flags(button).1)
    }

    fn click(&mut self, button: MouseButton) -> Result<()> {
        self.press(button)?;
        self.release(button)
    }

    fn double_click(&mut self, button: MouseButton) -> Result<()> {
        self.click(button)?;
        std::thread::sleep(std::time::Duration::from_millis(DOUBLE_CLICK_GAP_MS));
        self.click(button)
    }
}
