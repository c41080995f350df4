//! Polled keyboard and mouse state for isleview.
//!
//! `winit` delivers events between frames; the frame latches the mouse movement with
//! [`InputState::poll`], reads held keys, and calls [`InputState::end_frame`] once done.

use glam::Vec2;
use std::collections::HashSet;

pub use winit::event::ElementState;
pub use winit::keyboard::KeyCode;

/// Whether a key is down, as seen by a polling reader.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyState {
    Pressed,
    Released,
}

impl KeyState {
    pub fn is_pressed(self) -> bool {
        self == KeyState::Pressed
    }
}

#[derive(Debug, Default)]
pub struct InputState {
    held: HashSet<KeyCode>,
    /// Movement latched for the current frame.
    mouse_delta: Vec2,
    /// Movement gathered since the last poll.
    pending_delta: Vec2,
    cursor_locked: bool,
}

impl InputState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Latch the mouse movement gathered since the previous poll.
    pub fn poll(&mut self) {
        self.mouse_delta = self.pending_delta;
        self.pending_delta = Vec2::ZERO;
    }

    /// Forget the latched movement so a frame without a poll sees none.
    pub fn end_frame(&mut self) {
        self.mouse_delta = Vec2::ZERO;
    }

    pub fn process_keyboard(&mut self, key: KeyCode, state: ElementState) {
        match state {
            ElementState::Pressed => {
                self.held.insert(key);
            }
            ElementState::Released => {
                self.held.remove(&key);
            }
        }
    }

    /// Raw pointer movement in pixels, y positive downwards.
    pub fn process_mouse_motion(&mut self, delta: (f64, f64)) {
        self.pending_delta += Vec2::new(delta.0 as f32, delta.1 as f32);
    }

    /// Drop held keys and pending movement, e.g. when focus is lost and releases go unseen.
    pub fn reset(&mut self) {
        self.held.clear();
        self.pending_delta = Vec2::ZERO;
        self.mouse_delta = Vec2::ZERO;
    }

    pub fn key_state(&self, key: KeyCode) -> KeyState {
        if self.held.contains(&key) {
            KeyState::Pressed
        } else {
            KeyState::Released
        }
    }

    pub fn mouse_delta(&self) -> Vec2 {
        self.mouse_delta
    }

    pub fn is_cursor_locked(&self) -> bool {
        self.cursor_locked
    }

    pub fn set_cursor_locked(&mut self, locked: bool) {
        self.cursor_locked = locked;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn held_key_reports_pressed_until_release() {
        let mut input = InputState::new();
        input.process_keyboard(KeyCode::KeyW, ElementState::Pressed);
        assert_eq!(input.key_state(KeyCode::KeyW), KeyState::Pressed);

        input.end_frame();
        assert!(input.key_state(KeyCode::KeyW).is_pressed());

        input.process_keyboard(KeyCode::KeyW, ElementState::Released);
        assert_eq!(input.key_state(KeyCode::KeyW), KeyState::Released);
    }

    #[test]
    fn key_repeat_keeps_the_key_held() {
        let mut input = InputState::new();
        input.process_keyboard(KeyCode::Space, ElementState::Pressed);
        input.process_keyboard(KeyCode::Space, ElementState::Pressed);
        input.process_keyboard(KeyCode::Space, ElementState::Released);
        assert!(!input.key_state(KeyCode::Space).is_pressed());
    }

    #[test]
    fn mouse_motion_accumulates_until_polled() {
        let mut input = InputState::new();
        input.process_mouse_motion((3.0, -1.0));
        input.process_mouse_motion((2.0, 4.0));
        assert_eq!(input.mouse_delta(), Vec2::ZERO);

        input.poll();
        assert_eq!(input.mouse_delta(), Vec2::new(5.0, 3.0));

        input.end_frame();
        input.poll();
        assert_eq!(input.mouse_delta(), Vec2::ZERO);
    }

    #[test]
    fn reset_forgets_everything() {
        let mut input = InputState::new();
        input.process_keyboard(KeyCode::ShiftLeft, ElementState::Pressed);
        input.process_mouse_motion((10.0, 10.0));
        input.reset();
        input.poll();
        assert_eq!(input.key_state(KeyCode::ShiftLeft), KeyState::Released);
        assert_eq!(input.mouse_delta(), Vec2::ZERO);
    }
}
