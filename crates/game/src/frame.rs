//! The per-frame state machine: input, physics, light, shadow pass, main pass, present.

use crate::daylight::{DayNightCycle, Daylight};
use crate::display::Display;
use crate::hud::ClockHud;
use crate::player::{MoveIntent, Player};
use crate::scene::Scene;
use engine_core::{SceneConfig, ShadowConfig, SkyConfig, Time};
use glam::{Mat4, Vec2, Vec3};
use input::KeyCode;
use renderer::{
    uniform, ClearOps, CullFace, Drawable, LightFrame, Program, ProgramId, RenderDevice,
    RendererError, ShadowPass, TextureId, Viewport, SHADOW_MAP_SLOT,
};

/// Phases of one frame, in the only order they may run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FramePhase {
    Input,
    PhysicsUpdate,
    LightUpdate,
    ShadowPass,
    MainPass,
    Present,
}

impl FramePhase {
    pub const ORDER: [FramePhase; 6] = [
        FramePhase::Input,
        FramePhase::PhysicsUpdate,
        FramePhase::LightUpdate,
        FramePhase::ShadowPass,
        FramePhase::MainPass,
        FramePhase::Present,
    ];

    pub fn next(self) -> Option<FramePhase> {
        let index = Self::ORDER.iter().position(|&p| p == self)?;
        Self::ORDER.get(index + 1).copied()
    }
}

/// Uniforms every program of the main pass shares.
#[derive(Debug, Clone, Copy)]
struct SharedUniforms {
    view: Mat4,
    projection: Mat4,
    light_space: Mat4,
    sun_direction: Vec3,
    sun_color: Vec3,
    ambient_color: Vec3,
    sky_color: Vec3,
    view_position: Vec3,
}

impl SharedUniforms {
    fn apply(&self, p: &mut dyn Program) {
        p.set_mat4(uniform::VIEW, self.view);
        p.set_mat4(uniform::PROJECTION, self.projection);
        p.set_mat4(uniform::LIGHT_SPACE, self.light_space);
        p.set_vec3(uniform::SUN_DIRECTION, self.sun_direction);
        p.set_vec3(uniform::SUN_COLOR, self.sun_color);
        p.set_vec3(uniform::AMBIENT_COLOR, self.ambient_color);
        p.set_vec3(uniform::SKY_COLOR, self.sky_color);
        p.set_vec3(uniform::VIEW_POSITION, self.view_position);
        p.set_int(uniform::SHADOW_MAP, SHADOW_MAP_SLOT as i32);
    }
}

/// Runs frames against a [`Display`] and keeps the phase log of the last one.
pub struct FrameOrchestrator {
    time: Time,
    cycle: DayNightCycle,
    shadow: ShadowPass,
    shadow_config: ShadowConfig,
    sky: SkyConfig,
    clock: ClockHud,
    daylight: Daylight,
    light: Option<LightFrame>,
    phases: Vec<FramePhase>,
}

impl FrameOrchestrator {
    pub fn new(config: &SceneConfig) -> Self {
        let cycle = DayNightCycle::new(&config.sky);
        Self {
            time: Time::new(),
            daylight: cycle.daylight(),
            cycle,
            shadow: ShadowPass::new(config.shadow.resolution),
            shadow_config: config.shadow.clone(),
            sky: config.sky.clone(),
            clock: ClockHud::default(),
            light: None,
            phases: Vec::with_capacity(FramePhase::ORDER.len()),
        }
    }

    /// Phases the last frame went through.
    pub fn phases(&self) -> &[FramePhase] {
        &self.phases
    }

    pub fn cycle(&self) -> &DayNightCycle {
        &self.cycle
    }

    pub fn daylight(&self) -> Daylight {
        self.daylight
    }

    /// Light transform of the last frame.
    pub fn light(&self) -> Option<&LightFrame> {
        self.light.as_ref()
    }

    fn enter(&mut self, phase: FramePhase) {
        let expected = match self.phases.last() {
            None => Some(FramePhase::Input),
            Some(last) => last.next(),
        };
        debug_assert_eq!(
            expected,
            Some(phase),
            "frame phase {phase:?} entered out of order after {:?}",
            self.phases.last()
        );
        self.phases.push(phase);
    }

    /// Run one whole frame. Escape only requests the close; the frame still completes.
    pub fn run_frame(
        &mut self,
        display: &mut dyn Display,
        scene: &Scene,
        player: &mut Player,
    ) -> Result<(), RendererError> {
        self.phases.clear();

        self.enter(FramePhase::Input);
        self.time.update(display.time());
        let dt = self.time.delta_seconds();
        let intent = read_input(display);
        player.look(intent.look);

        self.enter(FramePhase::PhysicsUpdate);
        player.step(&intent, dt, &scene.terrain);

        self.enter(FramePhase::LightUpdate);
        self.daylight = self.cycle.advance(dt);
        let light = LightFrame::follow_camera(
            self.daylight.sun_direction,
            player.camera.position,
            &self.shadow_config,
        );
        self.light = Some(light);

        self.enter(FramePhase::ShadowPass);
        let viewport = display.viewport();
        self.render_shadows(display.device(), scene, &light, viewport);

        self.enter(FramePhase::MainPass);
        player.camera.aspect = viewport.aspect();
        let shared = SharedUniforms {
            view: player.camera.view_matrix(),
            projection: player.camera.projection_matrix(),
            light_space: light.light_space,
            sun_direction: self.daylight.sun_direction,
            sun_color: Vec3::from_array(self.sky.sun_color),
            ambient_color: Vec3::from_array(self.sky.ambient_color),
            sky_color: self.daylight.sky_color,
            view_position: player.camera.position,
        };
        self.render_main(display.device(), scene, player, &shared);

        self.enter(FramePhase::Present);
        display.swap_buffers()
    }

    fn render_shadows(
        &self,
        device: &mut dyn RenderDevice,
        scene: &Scene,
        light: &LightFrame,
        restore: Viewport,
    ) {
        self.shadow.begin(device);
        device.set_cull_face(CullFace::Back);
        device
            .use_program(ProgramId::Shadow)
            .set_mat4(uniform::LIGHT_SPACE, light.light_space);
        for caster in scene.shadow_casters() {
            caster.draw(device, ProgramId::Shadow);
        }
        self.shadow.end(device, restore);
    }

    fn render_main(
        &self,
        device: &mut dyn RenderDevice,
        scene: &Scene,
        player: &Player,
        shared: &SharedUniforms,
    ) {
        device.clear(ClearOps::color_and_depth(shared.sky_color.extend(1.0).to_array()));
        device.set_cull_face(CullFace::Back);
        device.bind_texture(SHADOW_MAP_SLOT, TextureId::ShadowMap);
        let apply = |d: &mut dyn RenderDevice| shared.apply(d.program());

        shared.apply(device.use_program(ProgramId::Terrain));
        scene.ground.draw(device, ProgramId::Terrain);
        scene.draw_outline(device, &scene.ground, apply);

        shared.apply(device.use_program(ProgramId::Lit));
        scene.forest.draw(device, ProgramId::Lit);
        scene.draw_outline(device, &scene.forest, apply);

        shared.apply(device.use_program(ProgramId::Lit));
        scene.crowd.draw(device, ProgramId::Lit);

        if let Some(water) = &scene.water {
            let p = device.use_program(ProgramId::Water);
            shared.apply(p);
            p.set_mat4(uniform::MODEL, Mat4::IDENTITY);
            p.set_vec3(uniform::OBJECT_COLOR, water.color);
            p.set_float(uniform::ALPHA, water.alpha);
            device.draw_mesh(water.mesh);
        }

        let sun_position = player.camera.position + shared.sun_direction * self.sky.sun_distance;
        let p = device.use_program(ProgramId::Sun);
        shared.apply(p);
        p.set_mat4(uniform::MODEL, player.camera.billboard(sun_position, self.sky.sun_scale));
        device.set_cull_face(CullFace::None);
        device.draw_mesh(scene.sun);
        device.set_cull_face(CullFace::Back);

        self.clock.draw(device, &self.cycle.clock_text());
    }
}

/// Keyboard and mouse state of this frame as a movement request. Escape asks to close.
fn read_input(display: &mut dyn Display) -> MoveIntent {
    display.poll_events();
    if display.key_state(KeyCode::Escape).is_pressed() {
        log::info!("Escape pressed, closing");
        display.request_close();
    }

    let held = |key| display.key_state(key).is_pressed();
    let axis = |positive, negative| match (held(positive), held(negative)) {
        (true, false) => 1.0,
        (false, true) => -1.0,
        _ => 0.0,
    };
    let walk = Vec2::new(axis(KeyCode::KeyD, KeyCode::KeyA), axis(KeyCode::KeyW, KeyCode::KeyS));
    let cursor = display.cursor_delta();

    MoveIntent {
        walk,
        run: held(KeyCode::ShiftLeft),
        jump: held(KeyCode::Space),
        // Window y grows downwards; the camera wants up-positive.
        look: Vec2::new(cursor.x, -cursor.y),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::display::headless::HeadlessDisplay;
    use crate::population::{scatter_rng, ModelId, Population};
    use crate::vegetation::Forest;
    use engine_core::ScatterConfig;
    use renderer::{MeshData, RenderTarget};
    use terrain::{HeightField, TerrainMesh};

    const CROWD: usize = 3;
    const TREES: usize = 4;

    fn everywhere(count: usize) -> ScatterConfig {
        ScatterConfig {
            count,
            min_radius: 0.0,
            spawn_radius: 50.0,
            min_elevation: 0.0,
            max_elevation: 1.0,
            min_scale: 1.0,
            max_scale: 2.0,
        }
    }

    struct Fixture {
        display: HeadlessDisplay,
        scene: Scene,
        player: Player,
        frames: FrameOrchestrator,
    }

    fn fixture(config: SceneConfig) -> Fixture {
        let mut display = HeadlessDisplay::new(800, 600);
        let terrain = TerrainMesh::build(&HeightField::flat(8, 8), 300.0);
        let mut rng = scatter_rng(Some(3));
        let forest = Forest::generate(&terrain, &everywhere(TREES), &mut rng);
        let population = Population::scatter(&terrain, &[ModelId(0)], &everywhere(CROWD), &mut rng);
        let models = [MeshData::cube(1.0, [0.9, 0.2, 0.2])];
        let scene = Scene::build(display.device(), &config, terrain, &forest, &models, &population);
        let player = Player::new(&config.camera, display.viewport().aspect());
        Fixture {
            display,
            scene,
            player,
            frames: FrameOrchestrator::new(&config),
        }
    }

    impl Fixture {
        fn run(&mut self, frames: usize) {
            for _ in 0..frames {
                self.frames
                    .run_frame(&mut self.display, &self.scene, &mut self.player)
                    .unwrap();
            }
        }
    }

    #[test]
    fn phases_run_in_order() {
        let mut f = fixture(SceneConfig::default());
        f.run(1);
        assert_eq!(f.frames.phases(), &FramePhase::ORDER);
        f.run(1);
        assert_eq!(f.frames.phases(), &FramePhase::ORDER);
    }

    #[test]
    #[cfg(debug_assertions)]
    #[should_panic(expected = "out of order")]
    fn skipping_a_phase_is_caught() {
        let mut frames = FrameOrchestrator::new(&SceneConfig::default());
        frames.enter(FramePhase::Input);
        frames.enter(FramePhase::LightUpdate);
    }

    #[test]
    fn shadow_pass_precedes_main_pass() {
        let mut f = fixture(SceneConfig::default());
        f.run(1);
        let frame = f.display.last_frame();

        assert_eq!(frame.passes.len(), 2);
        let shadow = &frame.passes[0];
        assert_eq!(shadow.target, RenderTarget::Shadow);
        assert_eq!(shadow.clear, Some(ClearOps::depth_only()));
        // terrain, forest, one draw per character
        assert_eq!(shadow.draws.len(), 2 + CROWD);
        assert_eq!(shadow.draws_with(ProgramId::Shadow), shadow.draws.len());
        assert!(shadow.draws.iter().all(|d| d.viewport == Viewport::new(2048, 2048)));
        let light = f.frames.light().unwrap();
        assert_eq!(shadow.draws[0].uniforms.light_space, light.light_space.to_cols_array_2d());

        let main = &frame.passes[1];
        assert_eq!(main.target, RenderTarget::Display);
        assert!(main.draws.iter().all(|d| d.viewport == Viewport::new(800, 600)));
        let sky = f.frames.daylight().sky_color.extend(1.0).to_array();
        assert_eq!(main.clear, Some(ClearOps::color_and_depth(sky)));
    }

    #[test]
    fn main_pass_draw_order() {
        let mut f = fixture(SceneConfig::default());
        f.run(1);
        let main = &f.display.last_frame().passes[1];

        let programs: Vec<ProgramId> = main.draws.iter().map(|d| d.program).collect();
        let mut expected = vec![
            ProgramId::Terrain,
            ProgramId::Outline,
            ProgramId::Lit,
            ProgramId::Outline,
        ];
        expected.extend([ProgramId::Lit; CROWD]);
        expected.extend([ProgramId::Water, ProgramId::Sun]);
        assert_eq!(programs, expected);

        for draw in &main.draws {
            match draw.program {
                ProgramId::Outline => assert_eq!(draw.cull, CullFace::Front),
                ProgramId::Sun => assert_eq!(draw.cull, CullFace::None),
                _ => assert_eq!(draw.cull, CullFace::Back),
            }
            assert_eq!(draw.textures[SHADOW_MAP_SLOT as usize], Some(TextureId::ShadowMap));
        }
    }

    #[test]
    fn lit_draws_share_camera_and_light() {
        let mut f = fixture(SceneConfig::default());
        f.run(2);
        let main = &f.display.last_frame().passes[1];
        let view = f.player.camera.view_matrix().to_cols_array_2d();
        let light = f.frames.light().unwrap().light_space.to_cols_array_2d();
        for draw in main.draws.iter().filter(|d| d.program.samples_shadow_map()) {
            assert_eq!(draw.uniforms.view, view);
            assert_eq!(draw.uniforms.light_space, light);
        }
    }

    #[test]
    fn sun_sits_along_the_sun_direction() {
        let mut f = fixture(SceneConfig::default());
        f.run(1);
        let main = &f.display.last_frame().passes[1];
        let sun = main.draws.iter().find(|d| d.program == ProgramId::Sun).unwrap();
        let model = Mat4::from_cols_array_2d(&sun.uniforms.model);
        let expected = f.player.camera.position + f.frames.daylight().sun_direction * 400.0;
        assert!((model.w_axis.truncate() - expected).length() < 1e-3);
    }

    #[test]
    fn outline_and_water_can_be_disabled() {
        let mut config = SceneConfig::default();
        config.outline.enabled = false;
        config.water.enabled = false;
        let mut f = fixture(config);
        f.run(1);
        let main = &f.display.last_frame().passes[1];
        assert_eq!(main.draws_with(ProgramId::Outline), 0);
        assert_eq!(main.draws_with(ProgramId::Water), 0);
        assert_eq!(main.draws_with(ProgramId::Sun), 1);
    }

    #[test]
    fn clock_is_drawn_every_frame() {
        let mut f = fixture(SceneConfig::default());
        f.run(1);
        let text = &f.display.last_frame().text;
        assert_eq!(text.len(), 1);
        assert_eq!(text[0].text, "08:00");
    }

    #[test]
    fn camera_settles_on_the_terrain() {
        let mut f = fixture(SceneConfig::default());
        f.run(120);
        assert!(f.player.is_grounded());
        assert!((f.player.camera.position.y - (0.2 + 2.0)).abs() < 1e-5);
    }

    #[test]
    fn space_only_jumps_from_the_ground() {
        let mut f = fixture(SceneConfig::default());
        f.display.held.insert(KeyCode::Space);
        // Still falling from the spawn height: holding space does nothing.
        f.run(3);
        assert!(f.player.vertical_velocity() < 0.0);

        f.display.held.clear();
        f.run(120);
        assert!(f.player.is_grounded());

        f.display.held.insert(KeyCode::Space);
        f.run(1);
        assert!(!f.player.is_grounded());
        assert!(f.player.vertical_velocity() > 0.0);
    }

    #[test]
    fn w_walks_forward() {
        let mut f = fixture(SceneConfig::default());
        f.run(1);
        let start = f.player.camera.position;
        f.display.held.insert(KeyCode::KeyW);
        f.run(30);
        let moved = f.player.camera.position - start;
        // 30 frames at 1/60 s and 5 m/s, looking down -Z.
        assert!((moved.z + 2.5).abs() < 1e-3, "{moved:?}");
        assert!(moved.x.abs() < 1e-3);
    }

    #[test]
    fn mouse_up_looks_up() {
        let mut f = fixture(SceneConfig::default());
        f.display.cursor = Vec2::new(0.0, -100.0);
        f.run(1);
        assert!((f.player.camera.pitch() - 10.0).abs() < 1e-4);
    }

    #[test]
    fn escape_closes_after_the_frame() {
        let mut f = fixture(SceneConfig::default());
        f.display.held.insert(KeyCode::Escape);
        f.run(1);
        assert!(f.display.should_close());
        assert_eq!(f.frames.phases().last(), Some(&FramePhase::Present));
        assert_eq!(f.display.frames.len(), 1);
    }

    #[test]
    fn scene_clock_follows_display_time() {
        let mut f = fixture(SceneConfig::default());
        f.display.frame_time = 1.0;
        // The first frame only starts the clock.
        f.run(31);
        assert_eq!(f.frames.cycle().clock_text(), "09:00");
    }
}
