//! The walking first-person viewer: look, walk, jump and fall onto the terrain.

use engine_core::CameraConfig;
use glam::Vec2;
use physics::{GroundQuery, GroundState, VerticalBody, VerticalParams};
use renderer::Camera;

/// What the player asked for this frame, read from the keyboard and mouse.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct MoveIntent {
    /// x strafes right, y walks forward; each component in -1..=1.
    pub walk: Vec2,
    pub run: bool,
    pub jump: bool,
    /// Mouse movement in pixels, y positive upwards.
    pub look: Vec2,
}

pub struct Player {
    pub camera: Camera,
    body: VerticalBody,
    speed: f32,
    run_multiplier: f32,
}

impl Player {
    pub fn new(config: &CameraConfig, aspect: f32) -> Self {
        let camera = Camera::from_config(config, aspect);
        let body = VerticalBody::new(camera.position.y, VerticalParams::from(config));
        Self {
            camera,
            body,
            speed: config.speed,
            run_multiplier: config.run_multiplier,
        }
    }

    /// Turn the view. Applied as soon as input is read.
    pub fn look(&mut self, delta: Vec2) {
        if delta != Vec2::ZERO {
            self.camera.process_mouse(delta.x, delta.y);
        }
    }

    /// Walk, jump, then integrate gravity and settle on the ground under the new position.
    pub fn step(&mut self, intent: &MoveIntent, dt: f32, ground: &impl GroundQuery) -> GroundState {
        let multiplier = if intent.run { self.run_multiplier } else { 1.0 };
        self.camera.walk(intent.walk, self.speed * multiplier * dt);

        if intent.jump && self.body.jump() {
            log::trace!("jump from {:.2}", self.body.height);
        }

        let position = self.camera.position;
        let state = self.body.step_over(dt, position.x, position.z, ground);
        self.camera.position.y = self.body.height;
        state
    }

    pub fn is_grounded(&self) -> bool {
        self.body.is_grounded()
    }

    pub fn vertical_velocity(&self) -> f32 {
        self.body.velocity
    }
}
