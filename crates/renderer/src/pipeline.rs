//! Bind group layouts and render pipelines for the built-in programs.

use crate::device::CullFace;
use crate::error::RendererError;
use crate::hud::OverlayVertex;
use crate::program::{DrawUniforms, ProgramId};
use crate::texture::Texture;
use crate::vertex::Vertex;
use std::num::NonZeroU64;

/// Size of one [`DrawUniforms`] block as seen by the shaders.
pub fn draw_uniforms_size() -> NonZeroU64 {
    // DrawUniforms is a non-empty Pod struct.
    NonZeroU64::new(std::mem::size_of::<DrawUniforms>() as u64).unwrap_or(NonZeroU64::MIN)
}

/// Group 0: the per-draw uniform block, addressed with a dynamic offset.
pub fn create_uniform_bind_group_layout(device: &wgpu::Device) -> wgpu::BindGroupLayout {
    device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        label: Some("Draw Uniforms Bind Group Layout"),
        entries: &[wgpu::BindGroupLayoutEntry {
            binding: 0,
            visibility: wgpu::ShaderStages::VERTEX_FRAGMENT,
            ty: wgpu::BindingType::Buffer {
                ty: wgpu::BufferBindingType::Uniform,
                has_dynamic_offset: true,
                min_binding_size: Some(draw_uniforms_size()),
            },
            count: None,
        }],
    })
}

/// Group 1 of shadow-receiving programs: depth texture + comparison sampler.
pub fn create_shadow_bind_group_layout(device: &wgpu::Device) -> wgpu::BindGroupLayout {
    device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        label: Some("Shadow Sample Bind Group Layout"),
        entries: &[
            wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Texture {
                    sample_type: wgpu::TextureSampleType::Depth,
                    view_dimension: wgpu::TextureViewDimension::D2,
                    multisampled: false,
                },
                count: None,
            },
            wgpu::BindGroupLayoutEntry {
                binding: 1,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Comparison),
                count: None,
            },
        ],
    })
}

/// Font atlas texture + sampler for the text overlay.
pub fn create_overlay_bind_group_layout(device: &wgpu::Device) -> wgpu::BindGroupLayout {
    device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        label: Some("Overlay Bind Group Layout"),
        entries: &[
            wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Texture {
                    sample_type: wgpu::TextureSampleType::Float { filterable: true },
                    view_dimension: wgpu::TextureViewDimension::D2,
                    multisampled: false,
                },
                count: None,
            },
            wgpu::BindGroupLayoutEntry {
                binding: 1,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                count: None,
            },
        ],
    })
}

/// Layouts every program pipeline is built against.
pub struct ProgramLayouts<'a> {
    pub uniforms: &'a wgpu::BindGroupLayout,
    pub shadow: &'a wgpu::BindGroupLayout,
}

fn cull_mode(cull: CullFace) -> Option<wgpu::Face> {
    match cull {
        CullFace::Back => Some(wgpu::Face::Back),
        CullFace::Front => Some(wgpu::Face::Front),
        CullFace::None => None,
    }
}

/// Build the pipeline for `program` with the given cull mode.
///
/// Shader compilation and pipeline validation run inside an error scope so a broken
/// program surfaces as [`RendererError::ProgramBuild`] instead of a panic later.
pub fn create_program_pipeline(
    device: &wgpu::Device,
    program: ProgramId,
    cull: CullFace,
    color_format: wgpu::TextureFormat,
    layouts: &ProgramLayouts,
) -> Result<wgpu::RenderPipeline, RendererError> {
    device.push_error_scope(wgpu::ErrorFilter::Validation);

    let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
        label: Some(program.label()),
        source: wgpu::ShaderSource::Wgsl(program.source().into()),
    });

    let bind_group_layouts: Vec<&wgpu::BindGroupLayout> = if program.samples_shadow_map() {
        vec![layouts.uniforms, layouts.shadow]
    } else {
        vec![layouts.uniforms]
    };
    let layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
        label: Some(program.label()),
        bind_group_layouts: &bind_group_layouts,
        push_constant_ranges: &[],
    });

    let blend = if program.alpha_blended() {
        wgpu::BlendState::ALPHA_BLENDING
    } else {
        wgpu::BlendState::REPLACE
    };
    let color_targets = [Some(wgpu::ColorTargetState {
        format: color_format,
        blend: Some(blend),
        write_mask: wgpu::ColorWrites::ALL,
    })];
    let fragment = program.writes_color().then(|| wgpu::FragmentState {
        module: &shader,
        entry_point: Some("fs_main"),
        targets: &color_targets,
        compilation_options: Default::default(),
    });

    let depth_stencil = if program.writes_color() {
        wgpu::DepthStencilState {
            format: Texture::DEPTH_FORMAT,
            // Translucent surfaces are tested against, but never occlude, the scene.
            depth_write_enabled: !program.alpha_blended(),
            depth_compare: wgpu::CompareFunction::Less,
            stencil: wgpu::StencilState::default(),
            bias: wgpu::DepthBiasState::default(),
        }
    } else {
        wgpu::DepthStencilState {
            format: Texture::DEPTH_FORMAT,
            depth_write_enabled: true,
            depth_compare: wgpu::CompareFunction::LessEqual,
            stencil: wgpu::StencilState::default(),
            bias: wgpu::DepthBiasState {
                constant: 2,
                slope_scale: 2.0,
                clamp: 0.0,
            },
        }
    };

    let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        label: Some(program.label()),
        layout: Some(&layout),
        vertex: wgpu::VertexState {
            module: &shader,
            entry_point: Some("vs_main"),
            buffers: &[Vertex::layout()],
            compilation_options: Default::default(),
        },
        fragment,
        primitive: wgpu::PrimitiveState {
            topology: wgpu::PrimitiveTopology::TriangleList,
            strip_index_format: None,
            front_face: wgpu::FrontFace::Ccw,
            cull_mode: cull_mode(cull),
            polygon_mode: wgpu::PolygonMode::Fill,
            unclipped_depth: false,
            conservative: false,
        },
        depth_stencil: Some(depth_stencil),
        multisample: wgpu::MultisampleState::default(),
        multiview: None,
        cache: None,
    });

    match pollster::block_on(device.pop_error_scope()) {
        Some(err) => Err(RendererError::ProgramBuild {
            program: program.label(),
            message: err.to_string(),
        }),
        None => Ok(pipeline),
    }
}

/// Alpha-blended screen-space text, no depth.
pub fn create_overlay_pipeline(
    device: &wgpu::Device,
    color_format: wgpu::TextureFormat,
    layout: &wgpu::BindGroupLayout,
) -> Result<wgpu::RenderPipeline, RendererError> {
    device.push_error_scope(wgpu::ErrorFilter::Validation);

    let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
        label: Some("overlay"),
        source: wgpu::ShaderSource::Wgsl(include_str!("shaders/overlay.wgsl").into()),
    });
    let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
        label: Some("Overlay Pipeline Layout"),
        bind_group_layouts: &[layout],
        push_constant_ranges: &[],
    });
    let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        label: Some("Overlay Pipeline"),
        layout: Some(&pipeline_layout),
        vertex: wgpu::VertexState {
            module: &shader,
            entry_point: Some("vs_main"),
            buffers: &[OverlayVertex::layout()],
            compilation_options: Default::default(),
        },
        fragment: Some(wgpu::FragmentState {
            module: &shader,
            entry_point: Some("fs_main"),
            targets: &[Some(wgpu::ColorTargetState {
                format: color_format,
                blend: Some(wgpu::BlendState::ALPHA_BLENDING),
                write_mask: wgpu::ColorWrites::ALL,
            })],
            compilation_options: Default::default(),
        }),
        primitive: wgpu::PrimitiveState {
            topology: wgpu::PrimitiveTopology::TriangleList,
            cull_mode: None,
            ..Default::default()
        },
        depth_stencil: None,
        multisample: wgpu::MultisampleState::default(),
        multiview: None,
        cache: None,
    });

    match pollster::block_on(device.pop_error_scope()) {
        Some(err) => Err(RendererError::ProgramBuild {
            program: "overlay",
            message: err.to_string(),
        }),
        None => Ok(pipeline),
    }
}
