//! Startup failures of the renderer. All of them are fatal.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum RendererError {
    #[error("no suitable GPU adapter found")]
    NoAdapter,

    #[error("failed to create surface: {0}")]
    Surface(#[from] wgpu::CreateSurfaceError),

    #[error("failed to open GPU device: {0}")]
    Device(#[from] wgpu::RequestDeviceError),

    #[error("shadow target {resolution}x{resolution} is incomplete: {reason}")]
    ShadowTargetIncomplete { resolution: u32, reason: String },

    #[error("failed to build {program} program: {message}")]
    ProgramBuild { program: &'static str, message: String },

    #[error("surface unusable: {0}")]
    Frame(#[from] wgpu::SurfaceError),
}
