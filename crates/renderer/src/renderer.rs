//! wgpu backend: owns the surface and GPU resources and replays recorded frames.

use crate::{
    device::{
        ClearOps, CullFace, MeshId, RenderDevice, RenderTarget, TextureId, Viewport,
        SHADOW_MAP_SLOT,
    },
    error::RendererError,
    hud::{FontAtlas, OverlayTextBuilder, TextRun},
    mesh::{Mesh, MeshData},
    pipeline::{
        create_overlay_bind_group_layout, create_overlay_pipeline, create_program_pipeline,
        create_shadow_bind_group_layout, create_uniform_bind_group_layout, draw_uniforms_size,
        ProgramLayouts,
    },
    program::{DrawUniforms, Program, ProgramId},
    recorder::{DrawRecord, FrameRecorder, PassRecord, RecordedFrame},
    shadow::ShadowTarget,
    texture::Texture,
};
use engine_core::SceneConfig;
use std::collections::HashMap;
use std::sync::Arc;
use wgpu::util::DeviceExt;
use winit::window::Window;

/// Draw slots the uniform buffer starts with; it doubles when a frame needs more.
const INITIAL_DRAW_CAPACITY: u64 = 256;

/// Main renderer state.
pub struct Renderer {
    pub surface: wgpu::Surface<'static>,
    pub device: wgpu::Device,
    pub queue: wgpu::Queue,
    pub config: wgpu::SurfaceConfiguration,
    pub size: winit::dpi::PhysicalSize<u32>,
    pub window: Arc<Window>,

    /// CPU-side device state; the source of truth for everything drawn this frame.
    recorder: FrameRecorder,
    /// GPU buffers, indexed by [`MeshId`].
    meshes: Vec<Mesh>,

    // Pipelines, one per program and cull mode
    pipelines: HashMap<(ProgramId, CullFace), wgpu::RenderPipeline>,

    // Per-draw uniforms
    uniform_layout: wgpu::BindGroupLayout,
    uniform_buffer: wgpu::Buffer,
    uniform_bind_group: wgpu::BindGroup,
    uniform_stride: u64,
    uniform_capacity: u64,
    uniform_staging: Vec<u8>,

    // Shadow mapping
    shadow_target: ShadowTarget,
    shadow_bind_group: wgpu::BindGroup,
    /// 1x1 depth cleared to 1.0, bound when no shadow map is bound: everything lit.
    unshadowed_bind_group: wgpu::BindGroup,

    // Depth buffer
    depth_texture: Texture,

    // Text overlay
    overlay_pipeline: wgpu::RenderPipeline,
    overlay_bind_group: wgpu::BindGroup,

    warned_target_mismatch: bool,
}

impl Renderer {
    /// Create a new renderer for the given window.
    pub async fn new(window: Arc<Window>, scene: &SceneConfig) -> Result<Self, RendererError> {
        let size = window.inner_size();

        let instance = wgpu::Instance::new(wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..Default::default()
        });

        let surface = instance.create_surface(window.clone())?;

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await
            .ok_or(RendererError::NoAdapter)?;

        log::info!("Using GPU: {:?}", adapter.get_info().name);

        let (device, queue) = adapter
            .request_device(
                &wgpu::DeviceDescriptor {
                    label: Some("Main Device"),
                    required_features: wgpu::Features::empty(),
                    required_limits: wgpu::Limits::default(),
                    memory_hints: Default::default(),
                },
                None,
            )
            .await?;

        // Configure surface
        let surface_caps = surface.get_capabilities(&adapter);
        let surface_format = surface_caps
            .formats
            .iter()
            .find(|f| f.is_srgb())
            .copied()
            .or_else(|| surface_caps.formats.first().copied())
            .ok_or(RendererError::NoAdapter)?;

        let present_mode = if scene.window.vsync {
            surface_caps
                .present_modes
                .iter()
                .find(|m| matches!(m, wgpu::PresentMode::Mailbox))
                .copied()
                .unwrap_or(wgpu::PresentMode::AutoVsync)
        } else {
            wgpu::PresentMode::AutoNoVsync
        };

        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format: surface_format,
            width: size.width.max(1),
            height: size.height.max(1),
            present_mode,
            alpha_mode: surface_caps
                .alpha_modes
                .first()
                .copied()
                .unwrap_or(wgpu::CompositeAlphaMode::Auto),
            view_formats: vec![],
            desired_maximum_frame_latency: 1,
        };
        surface.configure(&device, &config);

        // Bind group layouts
        let uniform_layout = create_uniform_bind_group_layout(&device);
        let shadow_layout = create_shadow_bind_group_layout(&device);
        let overlay_layout = create_overlay_bind_group_layout(&device);

        // Programs: every (program, cull) pair up front so a broken shader fails at startup.
        let layouts = ProgramLayouts {
            uniforms: &uniform_layout,
            shadow: &shadow_layout,
        };
        let mut pipelines = HashMap::new();
        for program in ProgramId::ALL {
            for cull in CullFace::ALL {
                let pipeline =
                    create_program_pipeline(&device, program, cull, surface_format, &layouts)?;
                pipelines.insert((program, cull), pipeline);
            }
        }
        log::info!("Built {} program pipelines", pipelines.len());

        // Per-draw uniform buffer
        let uniform_stride = wgpu::util::align_to(
            std::mem::size_of::<DrawUniforms>() as u64,
            device.limits().min_uniform_buffer_offset_alignment as u64,
        );
        let (uniform_buffer, uniform_bind_group) =
            create_uniform_storage(&device, &uniform_layout, uniform_stride, INITIAL_DRAW_CAPACITY);

        // Shadow map (created once, never resized)
        let shadow_target = ShadowTarget::create(&device, scene.shadow.resolution)?;
        let shadow_bind_group = create_shadow_sample_bind_group(
            &device,
            &shadow_layout,
            &shadow_target.depth,
            "Shadow Bind Group",
        );

        let unshadowed = Texture::create_shadow_map(&device, 1);
        clear_depth(&device, &queue, &unshadowed.view);
        let unshadowed_bind_group = create_shadow_sample_bind_group(
            &device,
            &shadow_layout,
            &unshadowed,
            "Unshadowed Bind Group",
        );

        let depth_texture =
            Texture::create_depth_texture(&device, config.width, config.height, "Depth Texture");

        // Text overlay
        let atlas = FontAtlas::generate();
        let font = Texture::from_r8(
            &device,
            &queue,
            &atlas.pixels,
            atlas.width,
            atlas.height,
            "Font Atlas",
        );
        let overlay_pipeline = create_overlay_pipeline(&device, surface_format, &overlay_layout)?;
        let overlay_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Overlay Bind Group"),
            layout: &overlay_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(&font.view),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::Sampler(&font.sampler),
                },
            ],
        });

        let recorder = FrameRecorder::new(Viewport::new(config.width, config.height));

        Ok(Self {
            surface,
            device,
            queue,
            config,
            size,
            window,
            recorder,
            meshes: Vec::new(),
            pipelines,
            uniform_layout,
            uniform_buffer,
            uniform_bind_group,
            uniform_stride,
            uniform_capacity: INITIAL_DRAW_CAPACITY,
            uniform_staging: Vec::new(),
            shadow_target,
            shadow_bind_group,
            unshadowed_bind_group,
            depth_texture,
            overlay_pipeline,
            overlay_bind_group,
            warned_target_mismatch: false,
        })
    }

    /// Handle window resize.
    pub fn resize(&mut self, new_size: winit::dpi::PhysicalSize<u32>) {
        if new_size.width > 0 && new_size.height > 0 {
            self.size = new_size;
            self.config.width = new_size.width;
            self.config.height = new_size.height;
            self.surface.configure(&self.device, &self.config);
            self.depth_texture = Texture::create_depth_texture(
                &self.device,
                self.config.width,
                self.config.height,
                "Depth Texture",
            );
        }
    }

    /// Window-sized viewport.
    pub fn display_viewport(&self) -> Viewport {
        Viewport::new(self.config.width, self.config.height)
    }

    /// Replay the recorded frame onto the swap chain and present it.
    ///
    /// A lost or outdated surface is reconfigured and the frame dropped; only running
    /// out of memory is an error.
    pub fn present(&mut self) -> Result<(), RendererError> {
        let frame = self.recorder.take_frame();

        let output = match self.surface.get_current_texture() {
            Ok(output) => output,
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                log::debug!("Surface lost or outdated, reconfiguring");
                self.surface.configure(&self.device, &self.config);
                return Ok(());
            }
            Err(wgpu::SurfaceError::Timeout) => {
                log::warn!("Surface timeout, frame skipped");
                return Ok(());
            }
            Err(err) => return Err(err.into()),
        };
        let view = output.texture.create_view(&wgpu::TextureViewDescriptor::default());

        self.upload_uniforms(&frame);

        let mut encoder = self.device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("Render Encoder"),
        });

        let mut draw_index = 0u64;
        let mut mismatched = 0usize;
        for pass in &frame.passes {
            mismatched += self.replay_pass(&mut encoder, &view, pass, draw_index);
            draw_index += pass.draws.len() as u64;
        }
        if mismatched > 0 && !self.warned_target_mismatch {
            log::warn!("{mismatched} draws skipped: program does not match the bound target");
            self.warned_target_mismatch = true;
        }

        self.render_overlay(&mut encoder, &view, &frame.text);

        self.queue.submit(std::iter::once(encoder.finish()));
        output.present();
        Ok(())
    }

    /// Write every draw's uniform block at its own aligned offset.
    fn upload_uniforms(&mut self, frame: &RecordedFrame) {
        let count = frame.draw_count() as u64;
        if count == 0 {
            return;
        }
        if count > self.uniform_capacity {
            let capacity = count.next_power_of_two();
            let (buffer, bind_group) = create_uniform_storage(
                &self.device,
                &self.uniform_layout,
                self.uniform_stride,
                capacity,
            );
            self.uniform_buffer = buffer;
            self.uniform_bind_group = bind_group;
            self.uniform_capacity = capacity;
            log::debug!("Uniform buffer grown to {capacity} draws");
        }

        let stride = self.uniform_stride as usize;
        self.uniform_staging.clear();
        self.uniform_staging.resize(count as usize * stride, 0);
        let draws = frame.passes.iter().flat_map(|p| p.draws.iter());
        for (i, draw) in draws.enumerate() {
            let bytes = bytemuck::bytes_of(&draw.uniforms);
            self.uniform_staging[i * stride..i * stride + bytes.len()].copy_from_slice(bytes);
        }
        self.queue.write_buffer(&self.uniform_buffer, 0, &self.uniform_staging);
    }

    /// Encode one recorded pass. Returns the number of draws skipped for a target mismatch.
    fn replay_pass(
        &self,
        encoder: &mut wgpu::CommandEncoder,
        surface_view: &wgpu::TextureView,
        pass: &PassRecord,
        first_draw: u64,
    ) -> usize {
        let clear = pass.clear.unwrap_or(ClearOps {
            color: None,
            depth: None,
        });
        let depth_ops = wgpu::Operations {
            load: match clear.depth {
                Some(d) => wgpu::LoadOp::Clear(d),
                None => wgpu::LoadOp::Load,
            },
            store: wgpu::StoreOp::Store,
        };

        let (label, color_view, depth_view, limit) = match pass.target {
            RenderTarget::Shadow => (
                "Shadow Pass",
                None,
                &self.shadow_target.depth.view,
                (self.shadow_target.resolution, self.shadow_target.resolution),
            ),
            RenderTarget::Display => (
                "Main Pass",
                Some(surface_view),
                &self.depth_texture.view,
                (self.config.width, self.config.height),
            ),
        };
        let color_attachments: Vec<Option<wgpu::RenderPassColorAttachment>> = color_view
            .map(|view| wgpu::RenderPassColorAttachment {
                view,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: match clear.color {
                        Some([r, g, b, a]) => wgpu::LoadOp::Clear(wgpu::Color {
                            r: r as f64,
                            g: g as f64,
                            b: b as f64,
                            a: a as f64,
                        }),
                        None => wgpu::LoadOp::Load,
                    },
                    store: wgpu::StoreOp::Store,
                },
            })
            .into_iter()
            .map(Some)
            .collect();

        let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some(label),
            color_attachments: &color_attachments,
            depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                view: depth_view,
                depth_ops: Some(depth_ops),
                stencil_ops: None,
            }),
            timestamp_writes: None,
            occlusion_query_set: None,
        });

        let mut skipped = 0;
        for (i, draw) in pass.draws.iter().enumerate() {
            if draw.program.writes_color() != (pass.target == RenderTarget::Display) {
                skipped += 1;
                continue;
            }
            let Some(mesh) = self.meshes.get(draw.mesh.index()) else {
                continue;
            };
            if mesh.num_indices == 0 {
                continue;
            }
            let Some(pipeline) = self.pipelines.get(&(draw.program, draw.cull)) else {
                continue;
            };

            render_pass.set_pipeline(pipeline);
            let (x, y, w, h) = clamp_viewport(draw.viewport, limit);
            render_pass.set_viewport(x, y, w, h, 0.0, 1.0);
            let offset = (first_draw + i as u64) * self.uniform_stride;
            render_pass.set_bind_group(0, &self.uniform_bind_group, &[offset as u32]);
            if draw.program.samples_shadow_map() {
                render_pass.set_bind_group(1, self.shadow_bind_group_for(draw), &[]);
            }
            render_pass.set_vertex_buffer(0, mesh.vertex_buffer.slice(..));
            render_pass.set_index_buffer(mesh.index_buffer.slice(..), wgpu::IndexFormat::Uint32);
            render_pass.draw_indexed(0..mesh.num_indices, 0, 0..1);
        }
        skipped
    }

    fn shadow_bind_group_for(&self, draw: &DrawRecord) -> &wgpu::BindGroup {
        match draw.textures.get(SHADOW_MAP_SLOT as usize) {
            Some(Some(TextureId::ShadowMap)) => &self.shadow_bind_group,
            _ => &self.unshadowed_bind_group,
        }
    }

    /// Screen-space text, drawn over everything else.
    fn render_overlay(
        &self,
        encoder: &mut wgpu::CommandEncoder,
        view: &wgpu::TextureView,
        runs: &[TextRun],
    ) {
        let mut builder =
            OverlayTextBuilder::new(self.config.width as f32, self.config.height as f32);
        for run in runs {
            builder.add_text(run);
        }
        if builder.vertices.is_empty() || builder.indices.is_empty() {
            return;
        }

        let vertex_buffer = self.device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Overlay Vertex Buffer"),
            contents: bytemuck::cast_slice(&builder.vertices),
            usage: wgpu::BufferUsages::VERTEX,
        });
        let index_buffer = self.device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Overlay Index Buffer"),
            contents: bytemuck::cast_slice(&builder.indices),
            usage: wgpu::BufferUsages::INDEX,
        });

        let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("Overlay Pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Load,
                    store: wgpu::StoreOp::Store,
                },
            })],
            depth_stencil_attachment: None,
            timestamp_writes: None,
            occlusion_query_set: None,
        });

        render_pass.set_pipeline(&self.overlay_pipeline);
        render_pass.set_bind_group(0, &self.overlay_bind_group, &[]);
        render_pass.set_vertex_buffer(0, vertex_buffer.slice(..));
        render_pass.set_index_buffer(index_buffer.slice(..), wgpu::IndexFormat::Uint32);
        render_pass.draw_indexed(0..builder.indices.len() as u32, 0, 0..1);
    }
}

impl RenderDevice for Renderer {
    fn upload_mesh(&mut self, data: &MeshData) -> MeshId {
        self.meshes.push(data.upload(&self.device));
        self.recorder.upload_mesh(data)
    }

    fn bind_target(&mut self, target: RenderTarget) {
        self.recorder.bind_target(target);
    }

    fn bound_target(&self) -> RenderTarget {
        self.recorder.bound_target()
    }

    fn set_viewport(&mut self, viewport: Viewport) {
        self.recorder.set_viewport(viewport);
    }

    fn viewport(&self) -> Viewport {
        self.recorder.viewport()
    }

    fn clear(&mut self, ops: ClearOps) {
        self.recorder.clear(ops);
    }

    fn use_program(&mut self, program: ProgramId) -> &mut dyn Program {
        self.recorder.use_program(program)
    }

    fn program(&mut self) -> &mut dyn Program {
        self.recorder.program()
    }

    fn set_cull_face(&mut self, cull: CullFace) {
        self.recorder.set_cull_face(cull);
    }

    fn bind_texture(&mut self, slot: u32, texture: TextureId) {
        self.recorder.bind_texture(slot, texture);
    }

    fn draw_mesh(&mut self, mesh: MeshId) {
        self.recorder.draw_mesh(mesh);
    }

    fn draw_text(&mut self, text: TextRun) {
        self.recorder.draw_text(text);
    }
}

fn create_uniform_storage(
    device: &wgpu::Device,
    layout: &wgpu::BindGroupLayout,
    stride: u64,
    capacity: u64,
) -> (wgpu::Buffer, wgpu::BindGroup) {
    let buffer = device.create_buffer(&wgpu::BufferDescriptor {
        label: Some("Draw Uniform Buffer"),
        size: stride * capacity,
        usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        mapped_at_creation: false,
    });
    let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
        label: Some("Draw Uniform Bind Group"),
        layout,
        entries: &[wgpu::BindGroupEntry {
            binding: 0,
            resource: wgpu::BindingResource::Buffer(wgpu::BufferBinding {
                buffer: &buffer,
                offset: 0,
                size: Some(draw_uniforms_size()),
            }),
        }],
    });
    (buffer, bind_group)
}

fn create_shadow_sample_bind_group(
    device: &wgpu::Device,
    layout: &wgpu::BindGroupLayout,
    depth: &Texture,
    label: &str,
) -> wgpu::BindGroup {
    device.create_bind_group(&wgpu::BindGroupDescriptor {
        label: Some(label),
        layout,
        entries: &[
            wgpu::BindGroupEntry {
                binding: 0,
                resource: wgpu::BindingResource::TextureView(&depth.view),
            },
            wgpu::BindGroupEntry {
                binding: 1,
                resource: wgpu::BindingResource::Sampler(&depth.sampler),
            },
        ],
    })
}

/// Clear a depth texture to the far plane once.
fn clear_depth(device: &wgpu::Device, queue: &wgpu::Queue, view: &wgpu::TextureView) {
    let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
        label: Some("Depth Clear Encoder"),
    });
    {
        let _pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("Depth Clear"),
            color_attachments: &[],
            depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                view,
                depth_ops: Some(wgpu::Operations {
                    load: wgpu::LoadOp::Clear(1.0),
                    store: wgpu::StoreOp::Store,
                }),
                stencil_ops: None,
            }),
            timestamp_writes: None,
            occlusion_query_set: None,
        });
    }
    queue.submit(std::iter::once(encoder.finish()));
}

/// Fit a recorded viewport inside the attachment it is replayed on.
fn clamp_viewport(viewport: Viewport, (width, height): (u32, u32)) -> (f32, f32, f32, f32) {
    let x = viewport.x.min(width.saturating_sub(1));
    let y = viewport.y.min(height.saturating_sub(1));
    let w = viewport.width.clamp(1, width - x);
    let h = viewport.height.clamp(1, height - y);
    (x as f32, y as f32, w as f32, h as f32)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn viewport_inside_attachment_is_unchanged() {
        assert_eq!(
            clamp_viewport(Viewport::new(1280, 720), (1280, 720)),
            (0.0, 0.0, 1280.0, 720.0)
        );
    }

    #[test]
    fn stale_viewport_is_clamped() {
        // Window shrank after the viewport was recorded.
        assert_eq!(clamp_viewport(Viewport::new(1920, 1080), (800, 600)), (0.0, 0.0, 800.0, 600.0));
        let offset = Viewport {
            x: 700,
            y: 0,
            width: 400,
            height: 0,
        };
        assert_eq!(clamp_viewport(offset, (800, 600)), (700.0, 0.0, 100.0, 1.0));
    }
}
