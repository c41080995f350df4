//! On-screen clock.

use renderer::{RenderDevice, TextRun};

/// Placement of the scene clock, in window pixels from the top-left corner.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClockHud {
    pub x: f32,
    pub y: f32,
    pub scale: f32,
    pub color: [f32; 4],
}

impl Default for ClockHud {
    fn default() -> Self {
        Self {
            x: 20.0,
            y: 40.0,
            scale: 3.0,
            color: [1.0, 1.0, 1.0, 1.0],
        }
    }
}

impl ClockHud {
    pub fn text_run(&self, clock: &str) -> TextRun {
        TextRun {
            text: clock.to_string(),
            x: self.x,
            y: self.y,
            scale: self.scale,
            color: self.color,
        }
    }

    /// Queue the clock on the overlay, drawn after every pass.
    pub fn draw(&self, device: &mut dyn RenderDevice, clock: &str) {
        device.draw_text(self.text_run(clock));
    }
}
