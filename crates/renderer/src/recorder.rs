//! CPU-side [`RenderDevice`] that records a frame as a list of passes.
//!
//! A pass is a run of clears and draws against one target. Binding a target ends the
//! open pass; a clear after draws starts a new one, since GPU passes only clear on load.

use crate::device::{
    ClearOps, CullFace, MeshId, RenderDevice, RenderTarget, TextureId, Viewport, TEXTURE_SLOTS,
};
use crate::hud::TextRun;
use crate::mesh::MeshData;
use crate::program::{DrawUniforms, Program, ProgramId, ProgramState};

/// Size of an uploaded mesh, kept for bookkeeping and tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MeshInfo {
    pub vertex_count: usize,
    pub index_count: usize,
}

/// One recorded draw call with a snapshot of its state.
#[derive(Debug, Clone, PartialEq)]
pub struct DrawRecord {
    pub program: ProgramId,
    pub mesh: MeshId,
    pub cull: CullFace,
    pub viewport: Viewport,
    pub uniforms: DrawUniforms,
    pub textures: [Option<TextureId>; TEXTURE_SLOTS],
}

/// Clears and draws against one target.
#[derive(Debug, Clone, PartialEq)]
pub struct PassRecord {
    pub target: RenderTarget,
    pub clear: Option<ClearOps>,
    pub draws: Vec<DrawRecord>,
}

impl PassRecord {
    pub fn draws_with(&self, program: ProgramId) -> usize {
        self.draws.iter().filter(|d| d.program == program).count()
    }
}

/// Everything recorded between two [`FrameRecorder::take_frame`] calls.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecordedFrame {
    pub passes: Vec<PassRecord>,
    pub text: Vec<TextRun>,
}

impl RecordedFrame {
    pub fn draw_count(&self) -> usize {
        self.passes.iter().map(|p| p.draws.len()).sum()
    }
}

/// Recording implementation of [`RenderDevice`].
///
/// Device state (target, viewport, program, cull, textures) persists across frames the
/// way GL state does; only the recorded passes are drained per frame.
#[derive(Debug)]
pub struct FrameRecorder {
    target: RenderTarget,
    viewport: Viewport,
    cull: CullFace,
    current: ProgramId,
    programs: Vec<ProgramState>,
    textures: [Option<TextureId>; TEXTURE_SLOTS],
    meshes: Vec<MeshInfo>,
    frame: RecordedFrame,
    pass_open: bool,
}

impl FrameRecorder {
    /// Starts with the display bound and the window viewport.
    pub fn new(display_viewport: Viewport) -> Self {
        Self {
            target: RenderTarget::Display,
            viewport: display_viewport,
            cull: CullFace::Back,
            current: ProgramId::Terrain,
            programs: ProgramId::ALL.iter().map(|&id| ProgramState::new(id)).collect(),
            textures: [None; TEXTURE_SLOTS],
            meshes: Vec::new(),
            frame: RecordedFrame::default(),
            pass_open: false,
        }
    }

    /// Drain the recorded frame.
    pub fn take_frame(&mut self) -> RecordedFrame {
        self.pass_open = false;
        std::mem::take(&mut self.frame)
    }

    pub fn mesh_info(&self, mesh: MeshId) -> Option<MeshInfo> {
        self.meshes.get(mesh.index()).copied()
    }

    pub fn mesh_count(&self) -> usize {
        self.meshes.len()
    }

    fn open_pass(&mut self, clear: Option<ClearOps>) -> &mut PassRecord {
        self.frame.passes.push(PassRecord {
            target: self.target,
            clear,
            draws: Vec::new(),
        });
        self.pass_open = true;
        // Just pushed.
        let last = self.frame.passes.len() - 1;
        &mut self.frame.passes[last]
    }

    fn current_pass(&mut self) -> &mut PassRecord {
        if self.pass_open {
            let last = self.frame.passes.len() - 1;
            &mut self.frame.passes[last]
        } else {
            self.open_pass(None)
        }
    }
}

impl RenderDevice for FrameRecorder {
    fn upload_mesh(&mut self, data: &MeshData) -> MeshId {
        let id = MeshId(self.meshes.len() as u32);
        self.meshes.push(MeshInfo {
            vertex_count: data.vertices.len(),
            index_count: data.indices.len(),
        });
        id
    }

    fn bind_target(&mut self, target: RenderTarget) {
        self.target = target;
        self.pass_open = false;
    }

    fn bound_target(&self) -> RenderTarget {
        self.target
    }

    fn set_viewport(&mut self, viewport: Viewport) {
        self.viewport = viewport;
    }

    fn viewport(&self) -> Viewport {
        self.viewport
    }

    fn clear(&mut self, ops: ClearOps) {
        let reuse = self.pass_open
            && self
                .frame
                .passes
                .last()
                .is_some_and(|p| p.draws.is_empty());
        if reuse {
            let pass = self.current_pass();
            let merged = match pass.clear {
                Some(prev) => ClearOps {
                    color: ops.color.or(prev.color),
                    depth: ops.depth.or(prev.depth),
                },
                None => ops,
            };
            pass.clear = Some(merged);
        } else {
            self.open_pass(Some(ops));
        }
    }

    fn use_program(&mut self, program: ProgramId) -> &mut dyn Program {
        self.current = program;
        &mut self.programs[program.index()]
    }

    fn program(&mut self) -> &mut dyn Program {
        &mut self.programs[self.current.index()]
    }

    fn set_cull_face(&mut self, cull: CullFace) {
        self.cull = cull;
    }

    fn bind_texture(&mut self, slot: u32, texture: TextureId) {
        match self.textures.get_mut(slot as usize) {
            Some(bound) => *bound = Some(texture),
            None => log::warn!("texture slot {slot} out of range, ignoring {texture:?}"),
        }
    }

    fn draw_mesh(&mut self, mesh: MeshId) {
        if mesh.index() >= self.meshes.len() {
            log::warn!("draw of unknown mesh {mesh:?} skipped");
            return;
        }
        let record = DrawRecord {
            program: self.current,
            mesh,
            cull: self.cull,
            viewport: self.viewport,
            uniforms: *self.programs[self.current.index()].uniforms(),
            textures: self.textures,
        };
        self.current_pass().draws.push(record);
    }

    fn draw_text(&mut self, text: TextRun) {
        self.frame.text.push(text);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::program::uniform;
    use glam::{Mat4, Vec3};

    fn recorder_with_mesh() -> (FrameRecorder, MeshId) {
        let mut recorder = FrameRecorder::new(Viewport::new(1280, 720));
        let mesh = recorder.upload_mesh(&MeshData::cube(1.0, [1.0; 3]));
        (recorder, mesh)
    }

    #[test]
    fn mesh_ids_are_sequential() {
        let (mut recorder, first) = recorder_with_mesh();
        let second = recorder.upload_mesh(&MeshData::plane(1.0, 0.0));
        assert_eq!((first.index(), second.index()), (0, 1));
        assert_eq!(recorder.mesh_info(first).unwrap().index_count, 36);
        assert_eq!(recorder.mesh_info(second).unwrap().vertex_count, 4);
    }

    #[test]
    fn draws_snapshot_uniforms_at_call_time() {
        let (mut recorder, mesh) = recorder_with_mesh();
        let a = Mat4::from_translation(Vec3::X);
        let b = Mat4::from_translation(Vec3::Z);

        recorder.use_program(ProgramId::Lit).set_mat4(uniform::MODEL, a);
        recorder.draw_mesh(mesh);
        recorder.program().set_mat4(uniform::MODEL, b);
        recorder.draw_mesh(mesh);

        let frame = recorder.take_frame();
        assert_eq!(frame.passes.len(), 1);
        let draws = &frame.passes[0].draws;
        assert_eq!(draws[0].uniforms.model, a.to_cols_array_2d());
        assert_eq!(draws[1].uniforms.model, b.to_cols_array_2d());
    }

    #[test]
    fn binding_a_target_splits_passes() {
        let (mut recorder, mesh) = recorder_with_mesh();
        recorder.bind_target(RenderTarget::Shadow);
        recorder.clear(ClearOps::depth_only());
        recorder.use_program(ProgramId::Shadow);
        recorder.draw_mesh(mesh);
        recorder.bind_target(RenderTarget::Display);
        recorder.clear(ClearOps::color_and_depth([0.5, 0.6, 0.7, 1.0]));
        recorder.use_program(ProgramId::Terrain);
        recorder.draw_mesh(mesh);

        let frame = recorder.take_frame();
        let targets: Vec<_> = frame.passes.iter().map(|p| p.target).collect();
        assert_eq!(targets, vec![RenderTarget::Shadow, RenderTarget::Display]);
        assert_eq!(frame.passes[0].clear, Some(ClearOps::depth_only()));
        assert_eq!(frame.passes[0].draws_with(ProgramId::Shadow), 1);
        assert_eq!(frame.passes[1].draws_with(ProgramId::Terrain), 1);
    }

    #[test]
    fn clear_after_draws_opens_a_new_pass() {
        let (mut recorder, mesh) = recorder_with_mesh();
        recorder.draw_mesh(mesh);
        recorder.clear(ClearOps::color_and_depth([0.0; 4]));
        recorder.draw_mesh(mesh);
        let frame = recorder.take_frame();
        assert_eq!(frame.passes.len(), 2);
        assert_eq!(frame.passes[0].clear, None);
        assert!(frame.passes[1].clear.is_some());
    }

    #[test]
    fn consecutive_clears_merge() {
        let (mut recorder, _) = recorder_with_mesh();
        recorder.clear(ClearOps {
            color: Some([1.0, 0.0, 0.0, 1.0]),
            depth: None,
        });
        recorder.clear(ClearOps::depth_only());
        let frame = recorder.take_frame();
        assert_eq!(frame.passes.len(), 1);
        assert_eq!(
            frame.passes[0].clear,
            Some(ClearOps {
                color: Some([1.0, 0.0, 0.0, 1.0]),
                depth: Some(1.0),
            })
        );
    }

    #[test]
    fn state_survives_take_frame() {
        let (mut recorder, mesh) = recorder_with_mesh();
        recorder.bind_target(RenderTarget::Shadow);
        recorder.set_viewport(Viewport::new(2048, 2048));
        recorder.set_cull_face(CullFace::Front);
        recorder.bind_texture(1, TextureId::ShadowMap);
        let _ = recorder.take_frame();

        assert_eq!(recorder.bound_target(), RenderTarget::Shadow);
        assert_eq!(recorder.viewport(), Viewport::new(2048, 2048));
        recorder.draw_mesh(mesh);
        let frame = recorder.take_frame();
        let draw = &frame.passes[0].draws[0];
        assert_eq!(draw.cull, CullFace::Front);
        assert_eq!(draw.textures[1], Some(TextureId::ShadowMap));
    }

    #[test]
    fn unknown_mesh_and_slot_are_ignored() {
        let mut recorder = FrameRecorder::new(Viewport::new(10, 10));
        recorder.draw_mesh(MeshId(7));
        recorder.bind_texture(9, TextureId::ShadowMap);
        assert_eq!(recorder.take_frame().draw_count(), 0);
    }

    #[test]
    fn text_is_collected_per_frame() {
        let mut recorder = FrameRecorder::new(Viewport::new(10, 10));
        recorder.draw_text(TextRun {
            text: "12:30".into(),
            x: 0.0,
            y: 0.0,
            scale: 1.0,
            color: [1.0; 4],
        });
        assert_eq!(recorder.take_frame().text.len(), 1);
        assert!(recorder.take_frame().text.is_empty());
    }
}
