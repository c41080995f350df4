//! Stateful drawing interface shared by the frame loop and every drawable.
//!
//! The state model is deliberately GL-like: a bound target, a viewport, a current
//! program with loose uniforms, a cull mode and texture slots. [`crate::FrameRecorder`]
//! records calls against it; the wgpu [`crate::Renderer`] replays the recording.

use crate::hud::TextRun;
use crate::mesh::MeshData;
use crate::program::{Program, ProgramId};

/// Where draws and clears land.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RenderTarget {
    /// The window's swap-chain image plus its depth buffer.
    Display,
    /// The depth-only shadow map.
    Shadow,
}

/// Pixel rectangle draws are mapped to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Viewport {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl Viewport {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            x: 0,
            y: 0,
            width,
            height,
        }
    }

    pub fn aspect(&self) -> f32 {
        self.width as f32 / self.height.max(1) as f32
    }
}

/// Which buffers a clear touches, and with what value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClearOps {
    pub color: Option<[f32; 4]>,
    pub depth: Option<f32>,
}

impl ClearOps {
    pub fn depth_only() -> Self {
        Self {
            color: None,
            depth: Some(1.0),
        }
    }

    pub fn color_and_depth(color: [f32; 4]) -> Self {
        Self {
            color: Some(color),
            depth: Some(1.0),
        }
    }
}

/// Face culling mode. Front faces wind counter-clockwise.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum CullFace {
    #[default]
    Back,
    Front,
    None,
}

impl CullFace {
    pub const ALL: [CullFace; 3] = [CullFace::Back, CullFace::Front, CullFace::None];
}

/// Handle to a mesh uploaded through [`RenderDevice::upload_mesh`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MeshId(pub(crate) u32);

impl MeshId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Textures a program can sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TextureId {
    ShadowMap,
}

/// Texture slot lit programs read the shadow map from.
pub const SHADOW_MAP_SLOT: u32 = 1;

/// Number of texture slots tracked per draw.
pub const TEXTURE_SLOTS: usize = 2;

/// GL-style drawing state machine.
pub trait RenderDevice {
    /// Register mesh data and get a handle for later draws.
    fn upload_mesh(&mut self, data: &MeshData) -> MeshId;

    fn bind_target(&mut self, target: RenderTarget);
    fn bound_target(&self) -> RenderTarget;

    fn set_viewport(&mut self, viewport: Viewport);
    fn viewport(&self) -> Viewport;

    /// Clear buffers of the bound target.
    fn clear(&mut self, ops: ClearOps);

    /// Make `program` current and return it for uniform updates.
    fn use_program(&mut self, program: ProgramId) -> &mut dyn Program;

    /// The current program.
    fn program(&mut self) -> &mut dyn Program;

    fn set_cull_face(&mut self, cull: CullFace);

    fn bind_texture(&mut self, slot: u32, texture: TextureId);

    /// Draw `mesh` with the current program, its uniforms as they are now, and the
    /// current target, viewport and cull state.
    fn draw_mesh(&mut self, mesh: MeshId);

    /// Queue screen-space text for the overlay drawn after all passes.
    fn draw_text(&mut self, text: TextRun);
}

/// Anything that can put itself on screen with the currently bound program.
///
/// Called once per pass: the caller binds the shadow program for the depth pass and
/// a lit program for the main pass, and sets the shared uniforms beforehand.
pub trait Drawable {
    fn draw(&self, device: &mut dyn RenderDevice, program: ProgramId);
}
