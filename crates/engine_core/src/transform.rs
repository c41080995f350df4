//! Placement of static scene instances.

use glam::{Mat4, Quat, Vec3};

/// Position, rotation and scale of one instance.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform {
    pub position: Vec3,
    pub rotation: Quat,
    pub scale: Vec3,
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            rotation: Quat::IDENTITY,
            scale: Vec3::ONE,
        }
    }
}

impl Transform {
    /// Rotation about the vertical axis (degrees) and a uniform scale. This is the only
    /// shape scene instances take.
    pub fn from_yaw_scale(position: Vec3, yaw_degrees: f32, scale: f32) -> Self {
        Self {
            position,
            rotation: Quat::from_rotation_y(yaw_degrees.to_radians()),
            scale: Vec3::splat(scale),
        }
    }

    /// Model matrix: translate * rotate * scale.
    pub fn to_matrix(&self) -> Mat4 {
        Mat4::from_scale_rotation_translation(self.scale, self.rotation, self.position)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn yaw_scale_matrix_places_origin_at_position() {
        let t = Transform::from_yaw_scale(Vec3::new(3.0, 4.0, 5.0), 90.0, 2.0);
        let m = t.to_matrix();
        let origin = m.transform_point3(Vec3::ZERO);
        assert!((origin - Vec3::new(3.0, 4.0, 5.0)).length() < 1e-5);

        // +X rotated 90 degrees about Y lands on -Z, then scaled by 2.
        let x = m.transform_vector3(Vec3::X);
        assert!((x - Vec3::new(0.0, 0.0, -2.0)).length() < 1e-5, "got {x:?}");
    }

    #[test]
    fn default_is_identity() {
        assert_eq!(Transform::default().to_matrix(), Mat4::IDENTITY);
    }
}
