//! Rendering for isleview: a GL-like drawing interface recorded on the CPU and
//! replayed with wgpu.

pub mod camera;
pub mod device;
pub mod error;
pub mod hud;
pub mod mesh;
pub mod pipeline;
pub mod program;
pub mod recorder;
pub mod renderer;
pub mod shadow;
pub mod texture;
pub mod vertex;

pub use camera::*;
pub use device::*;
pub use error::*;
pub use hud::*;
pub use mesh::*;
pub use program::*;
pub use recorder::*;
pub use renderer::*;
pub use shadow::*;
pub use texture::*;
pub use vertex::*;
