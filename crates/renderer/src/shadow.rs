//! Directional sun shadow: light frame, pass bracketing, and the depth target.

use crate::device::{ClearOps, RenderDevice, RenderTarget, Viewport};
use crate::error::RendererError;
use crate::texture::Texture;
use engine_core::ShadowConfig;
use glam::{Mat4, Vec3};

/// Light-space transform of the current frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LightFrame {
    /// Unit direction towards the sun.
    pub direction: Vec3,
    pub view: Mat4,
    pub projection: Mat4,
    /// `projection * view`.
    pub light_space: Mat4,
}

impl LightFrame {
    /// Orthographic light volume centred on the camera.
    ///
    /// The light sits `light_distance` along the sun direction from the camera and looks
    /// back at it, so shadow resolution stays constant around the player; casters
    /// outside the `2 * half_extent` square get no shadow.
    pub fn follow_camera(
        sun_direction: Vec3,
        camera_position: Vec3,
        config: &ShadowConfig,
    ) -> Self {
        let direction = match sun_direction.try_normalize() {
            Some(d) => d,
            None => Vec3::Y,
        };
        let eye = camera_position + direction * config.light_distance;
        let up = if direction.y.abs() > 0.99 { Vec3::Z } else { Vec3::Y };
        let view = Mat4::look_at_rh(eye, camera_position, up);
        let half = config.half_extent;
        let projection = Mat4::orthographic_rh(-half, half, -half, half, config.near, config.far);
        Self {
            direction,
            view,
            projection,
            light_space: projection * view,
        }
    }

    /// Position in light clip space (x, y in -1..1, z in 0..1 inside the volume).
    pub fn to_light_clip(&self, world: Vec3) -> Vec3 {
        self.light_space.project_point3(world)
    }
}

/// Brackets the depth-only pass on a [`RenderDevice`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShadowPass {
    resolution: u32,
}

impl ShadowPass {
    pub fn new(resolution: u32) -> Self {
        Self { resolution }
    }

    pub fn resolution(&self) -> u32 {
        self.resolution
    }

    pub fn viewport(&self) -> Viewport {
        Viewport::new(self.resolution, self.resolution)
    }

    /// Bind the shadow target, size the viewport to it and clear depth.
    pub fn begin(&self, device: &mut dyn RenderDevice) {
        device.bind_target(RenderTarget::Shadow);
        device.set_viewport(self.viewport());
        device.clear(ClearOps::depth_only());
    }

    /// Rebind the display and put back the window viewport.
    pub fn end(&self, device: &mut dyn RenderDevice, restore: Viewport) {
        device.bind_target(RenderTarget::Display);
        device.set_viewport(restore);
    }
}

/// The GPU depth texture the shadow pass renders into. Created once, never resized.
pub struct ShadowTarget {
    pub depth: Texture,
    pub resolution: u32,
}

impl ShadowTarget {
    /// Check a requested resolution against the device limit.
    pub fn validate_resolution(resolution: u32, max_dimension: u32) -> Result<(), RendererError> {
        if resolution == 0 {
            return Err(RendererError::ShadowTargetIncomplete {
                resolution,
                reason: "zero-sized target".to_string(),
            });
        }
        if resolution > max_dimension {
            return Err(RendererError::ShadowTargetIncomplete {
                resolution,
                reason: format!("exceeds the device limit of {max_dimension}"),
            });
        }
        Ok(())
    }

    pub fn create(device: &wgpu::Device, resolution: u32) -> Result<Self, RendererError> {
        Self::validate_resolution(resolution, device.limits().max_texture_dimension_2d)?;

        device.push_error_scope(wgpu::ErrorFilter::Validation);
        let depth = Texture::create_shadow_map(device, resolution);
        if let Some(err) = pollster::block_on(device.pop_error_scope()) {
            return Err(RendererError::ShadowTargetIncomplete {
                resolution,
                reason: err.to_string(),
            });
        }

        log::info!("Shadow map: {resolution}x{resolution} {:?}", Texture::DEPTH_FORMAT);
        Ok(Self { depth, resolution })
    }
}
