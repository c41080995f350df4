//! Shader programs and their loose, name-addressed uniforms.
//!
//! All WGSL programs share one uniform block ([`DrawUniforms`], bind group 0 with a
//! dynamic offset per draw). Each program only exposes the names its shader reads;
//! writes to any other name are dropped, the way GL ignores inactive uniform locations.

use bytemuck::{Pod, Zeroable};
use glam::{Mat4, Vec3};
use std::collections::HashSet;
use std::mem::offset_of;

/// Uniform names understood by the built-in programs.
pub mod uniform {
    pub const MODEL: &str = "model";
    pub const VIEW: &str = "view";
    pub const PROJECTION: &str = "projection";
    pub const LIGHT_SPACE: &str = "light_space_matrix";
    pub const SUN_DIRECTION: &str = "sun_direction";
    pub const SUN_COLOR: &str = "sun_color";
    pub const AMBIENT_COLOR: &str = "ambient_color";
    pub const SKY_COLOR: &str = "sky_color";
    pub const OBJECT_COLOR: &str = "object_color";
    pub const VIEW_POSITION: &str = "view_position";
    pub const THICKNESS: &str = "thickness";
    pub const ALPHA: &str = "alpha";
    pub const SHADOW_MAP: &str = "shadow_map";
    pub const USE_VERTEX_COLOR: &str = "use_vertex_color";
}

/// Per-draw uniform block (must match `Uniforms` in every .wgsl file).
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct DrawUniforms {
    pub model: [[f32; 4]; 4],
    pub view: [[f32; 4]; 4],
    pub projection: [[f32; 4]; 4],
    pub light_space: [[f32; 4]; 4],
    pub sun_direction: [f32; 4],
    pub sun_color: [f32; 4],
    pub ambient_color: [f32; 4],
    pub sky_color: [f32; 4],
    pub object_color: [f32; 4],
    pub view_position: [f32; 4],
    /// x = outline thickness, y = alpha, zw unused
    pub params: [f32; 4],
    /// x = shadow map slot, y = use vertex color (0 or 1), zw unused
    pub flags: [i32; 4],
}

impl Default for DrawUniforms {
    fn default() -> Self {
        Self {
            model: Mat4::IDENTITY.to_cols_array_2d(),
            view: Mat4::IDENTITY.to_cols_array_2d(),
            projection: Mat4::IDENTITY.to_cols_array_2d(),
            light_space: Mat4::IDENTITY.to_cols_array_2d(),
            sun_direction: [0.0, 1.0, 0.0, 0.0],
            sun_color: [1.0; 4],
            ambient_color: [0.3, 0.3, 0.3, 1.0],
            sky_color: [0.0, 0.0, 0.0, 1.0],
            object_color: [1.0; 4],
            view_position: [0.0, 0.0, 0.0, 1.0],
            params: [0.0, 1.0, 0.0, 0.0],
            flags: [0, 1, 0, 0],
        }
    }
}

/// Type of a uniform slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UniformKind {
    Mat4,
    Vec3,
    Float,
    Int,
}

impl UniformKind {
    fn size(self) -> usize {
        match self {
            UniformKind::Mat4 => 64,
            UniformKind::Vec3 => 12,
            UniformKind::Float | UniformKind::Int => 4,
        }
    }
}

/// Byte offset and type of one named uniform inside [`DrawUniforms`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UniformSlot {
    pub offset: usize,
    pub kind: UniformKind,
}

const fn slot(offset: usize, kind: UniformKind) -> UniformSlot {
    UniformSlot { offset, kind }
}

const MODEL: (&str, UniformSlot) = (
    uniform::MODEL,
    slot(offset_of!(DrawUniforms, model), UniformKind::Mat4),
);
const VIEW: (&str, UniformSlot) = (
    uniform::VIEW,
    slot(offset_of!(DrawUniforms, view), UniformKind::Mat4),
);
const PROJECTION: (&str, UniformSlot) = (
    uniform::PROJECTION,
    slot(offset_of!(DrawUniforms, projection), UniformKind::Mat4),
);
const LIGHT_SPACE: (&str, UniformSlot) = (
    uniform::LIGHT_SPACE,
    slot(offset_of!(DrawUniforms, light_space), UniformKind::Mat4),
);
const SUN_DIRECTION: (&str, UniformSlot) = (
    uniform::SUN_DIRECTION,
    slot(offset_of!(DrawUniforms, sun_direction), UniformKind::Vec3),
);
const SUN_COLOR: (&str, UniformSlot) = (
    uniform::SUN_COLOR,
    slot(offset_of!(DrawUniforms, sun_color), UniformKind::Vec3),
);
const AMBIENT_COLOR: (&str, UniformSlot) = (
    uniform::AMBIENT_COLOR,
    slot(offset_of!(DrawUniforms, ambient_color), UniformKind::Vec3),
);
const SKY_COLOR: (&str, UniformSlot) = (
    uniform::SKY_COLOR,
    slot(offset_of!(DrawUniforms, sky_color), UniformKind::Vec3),
);
const OBJECT_COLOR: (&str, UniformSlot) = (
    uniform::OBJECT_COLOR,
    slot(offset_of!(DrawUniforms, object_color), UniformKind::Vec3),
);
const VIEW_POSITION: (&str, UniformSlot) = (
    uniform::VIEW_POSITION,
    slot(offset_of!(DrawUniforms, view_position), UniformKind::Vec3),
);
const THICKNESS: (&str, UniformSlot) = (
    uniform::THICKNESS,
    slot(offset_of!(DrawUniforms, params), UniformKind::Float),
);
const ALPHA: (&str, UniformSlot) = (
    uniform::ALPHA,
    slot(offset_of!(DrawUniforms, params) + 4, UniformKind::Float),
);
const SHADOW_MAP: (&str, UniformSlot) = (
    uniform::SHADOW_MAP,
    slot(offset_of!(DrawUniforms, flags), UniformKind::Int),
);
const USE_VERTEX_COLOR: (&str, UniformSlot) = (
    uniform::USE_VERTEX_COLOR,
    slot(offset_of!(DrawUniforms, flags) + 4, UniformKind::Int),
);

/// Static name table of the uniforms a program reads.
#[derive(Debug)]
pub struct UniformLayout {
    entries: &'static [(&'static str, UniformSlot)],
}

impl UniformLayout {
    pub fn lookup(&self, name: &str) -> Option<UniformSlot> {
        self.entries.iter().find(|(n, _)| *n == name).map(|(_, s)| *s)
    }

    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.entries.iter().map(|(n, _)| *n)
    }
}

static TERRAIN_LAYOUT: UniformLayout = UniformLayout {
    entries: &[
        MODEL,
        VIEW,
        PROJECTION,
        LIGHT_SPACE,
        SUN_DIRECTION,
        SUN_COLOR,
        AMBIENT_COLOR,
        SKY_COLOR,
        VIEW_POSITION,
        SHADOW_MAP,
    ],
};

static LIT_LAYOUT: UniformLayout = UniformLayout {
    entries: &[
        MODEL,
        VIEW,
        PROJECTION,
        LIGHT_SPACE,
        SUN_DIRECTION,
        SUN_COLOR,
        AMBIENT_COLOR,
        SKY_COLOR,
        OBJECT_COLOR,
        SHADOW_MAP,
        USE_VERTEX_COLOR,
    ],
};

static SHADOW_LAYOUT: UniformLayout = UniformLayout {
    entries: &[MODEL, LIGHT_SPACE],
};

static OUTLINE_LAYOUT: UniformLayout = UniformLayout {
    entries: &[MODEL, VIEW, PROJECTION, THICKNESS, OBJECT_COLOR],
};

static WATER_LAYOUT: UniformLayout = UniformLayout {
    entries: &[MODEL, VIEW, PROJECTION, OBJECT_COLOR, SKY_COLOR, ALPHA],
};

static SUN_LAYOUT: UniformLayout = UniformLayout {
    entries: &[MODEL, VIEW, PROJECTION, SUN_COLOR],
};

/// Built-in programs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProgramId {
    /// Height-banded terrain shading with shadows.
    Terrain,
    /// Vegetation and imported models: vertex or object colour, sun + ambient, shadows.
    Lit,
    /// Depth only, from the light.
    Shadow,
    /// Silhouette: vertices pushed along their normals, flat colour.
    Outline,
    /// Translucent water plane tinted by the sky.
    Water,
    /// Sun billboard.
    Sun,
}

impl ProgramId {
    pub const ALL: [ProgramId; 6] = [
        ProgramId::Terrain,
        ProgramId::Lit,
        ProgramId::Shadow,
        ProgramId::Outline,
        ProgramId::Water,
        ProgramId::Sun,
    ];

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn label(self) -> &'static str {
        match self {
            ProgramId::Terrain => "terrain",
            ProgramId::Lit => "lit",
            ProgramId::Shadow => "shadow",
            ProgramId::Outline => "outline",
            ProgramId::Water => "water",
            ProgramId::Sun => "sun",
        }
    }

    pub fn layout(self) -> &'static UniformLayout {
        match self {
            ProgramId::Terrain => &TERRAIN_LAYOUT,
            ProgramId::Lit => &LIT_LAYOUT,
            ProgramId::Shadow => &SHADOW_LAYOUT,
            ProgramId::Outline => &OUTLINE_LAYOUT,
            ProgramId::Water => &WATER_LAYOUT,
            ProgramId::Sun => &SUN_LAYOUT,
        }
    }

    /// WGSL source, embedded at build time.
    pub fn source(self) -> &'static str {
        match self {
            ProgramId::Terrain => include_str!("shaders/terrain.wgsl"),
            ProgramId::Lit => include_str!("shaders/lit.wgsl"),
            ProgramId::Shadow => include_str!("shaders/shadow.wgsl"),
            ProgramId::Outline => include_str!("shaders/outline.wgsl"),
            ProgramId::Water => include_str!("shaders/water.wgsl"),
            ProgramId::Sun => include_str!("shaders/sun.wgsl"),
        }
    }

    /// Depth-only programs have no fragment stage and only run against the shadow target.
    pub fn writes_color(self) -> bool {
        self != ProgramId::Shadow
    }

    /// Whether the program reads the shadow map (bind group 1).
    pub fn samples_shadow_map(self) -> bool {
        matches!(self, ProgramId::Terrain | ProgramId::Lit)
    }

    pub fn alpha_blended(self) -> bool {
        matches!(self, ProgramId::Water | ProgramId::Sun)
    }
}

/// Uniform setter interface of a program.
pub trait Program {
    fn id(&self) -> ProgramId;
    fn set_mat4(&mut self, name: &str, value: Mat4);
    fn set_vec3(&mut self, name: &str, value: Vec3);
    fn set_float(&mut self, name: &str, value: f32);
    fn set_int(&mut self, name: &str, value: i32);
}

/// CPU copy of a program's uniform state.
#[derive(Debug, Clone)]
pub struct ProgramState {
    id: ProgramId,
    uniforms: DrawUniforms,
    ignored: HashSet<String>,
}

impl ProgramState {
    pub fn new(id: ProgramId) -> Self {
        Self {
            id,
            uniforms: DrawUniforms::default(),
            ignored: HashSet::new(),
        }
    }

    pub fn uniforms(&self) -> &DrawUniforms {
        &self.uniforms
    }

    fn write(&mut self, name: &str, kind: UniformKind, bytes: &[u8]) {
        match self.id.layout().lookup(name) {
            Some(slot) if slot.kind == kind => {
                let dst = bytemuck::bytes_of_mut(&mut self.uniforms);
                dst[slot.offset..slot.offset + kind.size()].copy_from_slice(&bytes[..kind.size()]);
            }
            found => {
                if self.ignored.insert(name.to_string()) {
                    match found {
                        Some(slot) => log::debug!(
                            "{} program: '{}' is a {:?}, ignoring {:?} write",
                            self.id.label(),
                            name,
                            slot.kind,
                            kind
                        ),
                        None => {
                            log::debug!("{} program has no uniform '{}'", self.id.label(), name)
                        }
                    }
                }
            }
        }
    }
}

impl Program for ProgramState {
    fn id(&self) -> ProgramId {
        self.id
    }

    fn set_mat4(&mut self, name: &str, value: Mat4) {
        self.write(name, UniformKind::Mat4, bytemuck::bytes_of(&value.to_cols_array()));
    }

    fn set_vec3(&mut self, name: &str, value: Vec3) {
        self.write(name, UniformKind::Vec3, bytemuck::bytes_of(&value.to_array()));
    }

    fn set_float(&mut self, name: &str, value: f32) {
        self.write(name, UniformKind::Float, bytemuck::bytes_of(&value));
    }

    fn set_int(&mut self, name: &str, value: i32) {
        self.write(name, UniformKind::Int, bytemuck::bytes_of(&value));
    }
}
