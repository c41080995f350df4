//! Window, input and presentation behind one polling interface.
//!
//! The frame loop only talks to [`Display`]; [`WinitDisplay`] backs it with a real
//! window and the wgpu renderer, the test double with a [`renderer::FrameRecorder`].

use glam::Vec2;
use input::{InputState, KeyCode, KeyState};
use renderer::{RenderDevice, Renderer, RendererError, Viewport};
use std::time::Instant;
use winit::event::{DeviceEvent, WindowEvent};
use winit::keyboard::PhysicalKey;
use winit::window::CursorGrabMode;

pub trait Display {
    /// Latch input gathered since the previous frame. Never blocks.
    fn poll_events(&mut self);

    fn key_state(&self, key: KeyCode) -> KeyState;

    /// Mouse movement latched by the last poll, in pixels, y positive downwards.
    fn cursor_delta(&self) -> Vec2;

    /// Monotonic seconds.
    fn time(&self) -> f64;

    /// Present everything drawn since the last swap.
    fn swap_buffers(&mut self) -> Result<(), RendererError>;

    fn should_close(&self) -> bool;

    fn request_close(&mut self);

    /// Window-sized viewport.
    fn viewport(&self) -> Viewport;

    fn device(&mut self) -> &mut dyn RenderDevice;
}

/// A winit window presenting through [`Renderer`].
pub struct WinitDisplay {
    renderer: Renderer,
    input: InputState,
    start: Instant,
    close_requested: bool,
}

impl WinitDisplay {
    pub fn new(renderer: Renderer) -> Self {
        let mut display = Self {
            renderer,
            input: InputState::new(),
            start: Instant::now(),
            close_requested: false,
        };
        display.grab_cursor();
        display
    }

    pub fn request_redraw(&self) {
        self.renderer.window.request_redraw();
    }

    /// Feed a window event. Returns true on `RedrawRequested`, when a frame should run.
    pub fn handle_window_event(&mut self, event: &WindowEvent) -> bool {
        match event {
            WindowEvent::CloseRequested => {
                self.close_requested = true;
            }
            WindowEvent::Resized(size) => {
                self.renderer.resize(*size);
            }
            WindowEvent::Focused(false) => {
                self.input.reset();
                self.release_cursor();
            }
            WindowEvent::KeyboardInput { event, .. } => {
                if let PhysicalKey::Code(key) = event.physical_key {
                    self.input.process_keyboard(key, event.state);
                }
            }
            WindowEvent::MouseInput { state, .. } => {
                if state.is_pressed() && !self.input.is_cursor_locked() {
                    self.grab_cursor();
                }
            }
            WindowEvent::RedrawRequested => return true,
            _ => {}
        }
        false
    }

    /// Raw mouse motion drives the look while the cursor is captured.
    pub fn handle_device_event(&mut self, event: &DeviceEvent) {
        if let DeviceEvent::MouseMotion { delta } = event {
            if self.input.is_cursor_locked() {
                self.input.process_mouse_motion(*delta);
            }
        }
    }

    fn grab_cursor(&mut self) {
        let window = &self.renderer.window;
        let grabbed = window
            .set_cursor_grab(CursorGrabMode::Locked)
            .or_else(|_| window.set_cursor_grab(CursorGrabMode::Confined));
        match grabbed {
            Ok(()) => {
                window.set_cursor_visible(false);
                self.input.set_cursor_locked(true);
            }
            Err(e) => log::debug!("cursor grab unavailable: {e}"),
        }
    }

    fn release_cursor(&mut self) {
        let window = &self.renderer.window;
        let _ = window.set_cursor_grab(CursorGrabMode::None);
        window.set_cursor_visible(true);
        self.input.set_cursor_locked(false);
    }
}

impl Display for WinitDisplay {
    fn poll_events(&mut self) {
        self.input.poll();
    }

    fn key_state(&self, key: KeyCode) -> KeyState {
        self.input.key_state(key)
    }

    fn cursor_delta(&self) -> Vec2 {
        self.input.mouse_delta()
    }

    fn time(&self) -> f64 {
        self.start.elapsed().as_secs_f64()
    }

    fn swap_buffers(&mut self) -> Result<(), RendererError> {
        let result = self.renderer.present();
        self.input.end_frame();
        result
    }

    fn should_close(&self) -> bool {
        self.close_requested
    }

    fn request_close(&mut self) {
        self.close_requested = true;
    }

    fn viewport(&self) -> Viewport {
        self.renderer.display_viewport()
    }

    fn device(&mut self) -> &mut dyn RenderDevice {
        &mut self.renderer
    }
}
