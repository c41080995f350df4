//! First-person camera with yaw/pitch look.

use engine_core::CameraConfig;
use glam::{Mat4, Vec3};

/// Pitch limit in degrees, short of straight up/down so the view never flips.
pub const MAX_PITCH_DEGREES: f32 = 89.0;

/// FPS camera with configurable FOV and clipping planes.
#[derive(Debug, Clone)]
pub struct Camera {
    /// Eye position in world space.
    pub position: Vec3,
    /// Field of view in degrees.
    pub fov_degrees: f32,
    /// Near clipping plane.
    pub near: f32,
    /// Far clipping plane.
    pub far: f32,
    /// Aspect ratio (width / height).
    pub aspect: f32,
    /// Degrees of rotation per pixel of mouse movement.
    pub sensitivity: f32,
    /// Degrees; -90 looks down -Z.
    yaw: f32,
    /// Degrees, positive looks up.
    pitch: f32,
}

impl Default for Camera {
    fn default() -> Self {
        Self::from_config(&CameraConfig::default(), 16.0 / 9.0)
    }
}

impl Camera {
    pub fn from_config(config: &CameraConfig, aspect: f32) -> Self {
        Self {
            position: Vec3::from_array(config.spawn),
            fov_degrees: config.fov_degrees,
            near: config.near,
            far: config.far,
            aspect,
            sensitivity: config.sensitivity,
            yaw: -90.0,
            pitch: 0.0,
        }
    }

    /// Update aspect ratio (call on window resize).
    pub fn set_aspect(&mut self, width: u32, height: u32) {
        self.aspect = width as f32 / height.max(1) as f32;
    }

    /// Mouse look. `offset_y` is positive when the mouse moves up.
    pub fn process_mouse(&mut self, offset_x: f32, offset_y: f32) {
        self.yaw += offset_x * self.sensitivity;
        self.pitch = (self.pitch + offset_y * self.sensitivity)
            .clamp(-MAX_PITCH_DEGREES, MAX_PITCH_DEGREES);
    }

    /// Unit view direction.
    pub fn front(&self) -> Vec3 {
        let (yaw, pitch) = (self.yaw.to_radians(), self.pitch.to_radians());
        Vec3::new(yaw.cos() * pitch.cos(), pitch.sin(), yaw.sin() * pitch.cos()).normalize()
    }

    /// Unit vector to the right of the view, always horizontal.
    pub fn right(&self) -> Vec3 {
        self.front().cross(Vec3::Y).normalize()
    }

    /// View direction projected onto the ground plane.
    pub fn flat_front(&self) -> Vec3 {
        let f = self.front();
        Vec3::new(f.x, 0.0, f.z).normalize_or_zero()
    }

    /// Move on the ground plane. `input.y` walks forward/back, `input.x` strafes.
    pub fn walk(&mut self, input: glam::Vec2, distance: f32) {
        let step = self.flat_front() * input.y + self.right() * input.x;
        self.position += step * distance;
    }

    /// Get the view matrix.
    pub fn view_matrix(&self) -> Mat4 {
        Mat4::look_at_rh(self.position, self.position + self.front(), Vec3::Y)
    }

    /// Get the projection matrix.
    pub fn projection_matrix(&self) -> Mat4 {
        Mat4::perspective_rh(self.fov_degrees.to_radians(), self.aspect, self.near, self.far)
    }

    /// Get current pitch in degrees.
    pub fn pitch(&self) -> f32 {
        self.pitch
    }

    /// Model matrix of a quad at `position` that always faces the camera.
    pub fn billboard(&self, position: Vec3, scale: f32) -> Mat4 {
        let rotation = glam::Mat3::from_mat4(self.view_matrix()).inverse();
        Mat4::from_translation(position)
            * Mat4::from_mat3(rotation)
            * Mat4::from_scale(Vec3::splat(scale))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: Vec3, b: Vec3) -> bool {
        (a - b).length() < 1e-5
    }

    #[test]
    fn starts_looking_down_negative_z() {
        let camera = Camera::default();
        assert!(approx(camera.front(), Vec3::NEG_Z));
        assert!(approx(camera.right(), Vec3::X));
        assert_eq!(camera.position, Vec3::new(0.0, 5.0, 0.0));
    }

    #[test]
    fn pitch_is_clamped() {
        let mut camera = Camera::default();
        camera.process_mouse(0.0, 10_000.0);
        assert_eq!(camera.pitch(), MAX_PITCH_DEGREES);
        camera.process_mouse(0.0, -100_000.0);
        assert_eq!(camera.pitch(), -MAX_PITCH_DEGREES);
        assert!(camera.view_matrix().is_finite());
    }

    #[test]
    fn mouse_right_turns_right() {
        let mut camera = Camera::default();
        // 900 px * 0.1 deg/px = 90 degrees.
        camera.process_mouse(900.0, 0.0);
        assert!(approx(camera.front(), Vec3::X));
    }

    #[test]
    fn walking_ignores_pitch() {
        let mut camera = Camera::default();
        camera.process_mouse(0.0, 450.0);
        let start = camera.position;
        camera.walk(glam::Vec2::new(0.0, 1.0), 2.0);
        assert!(approx(camera.position - start, Vec3::new(0.0, 0.0, -2.0)));
    }

    #[test]
    fn billboard_faces_the_camera() {
        let mut camera = Camera::default();
        camera.process_mouse(123.0, 45.0);
        let model = camera.billboard(camera.position + camera.front() * 400.0, 40.0);
        let normal = model.transform_vector3(Vec3::Z).normalize();
        assert!(approx(normal, -camera.front()));
    }
}
