//! Everything drawn each frame, uploaded once at startup.

use crate::model::load_or_box;
use crate::population::{scatter_rng, ModelId, Population, SceneInstance};
use crate::vegetation::Forest;
use engine_core::{OutlineConfig, SceneConfig, WaterConfig};
use glam::{Mat4, Vec3};
use renderer::{uniform, CullFace, Drawable, MeshData, MeshId, ProgramId, RenderDevice};
use terrain::{HeightField, TerrainMesh};

/// A single mesh placed in world space.
#[derive(Debug, Clone, Copy)]
pub struct StaticMesh {
    pub mesh: MeshId,
    /// Take colour from the vertices instead of `object_color`.
    pub vertex_colors: bool,
}

impl Drawable for StaticMesh {
    fn draw(&self, device: &mut dyn RenderDevice, program: ProgramId) {
        let p = device.program();
        p.set_mat4(uniform::MODEL, Mat4::IDENTITY);
        if program == ProgramId::Lit {
            p.set_int(uniform::USE_VERTEX_COLOR, self.vertex_colors as i32);
        }
        device.draw_mesh(self.mesh);
    }
}

/// Characters: one draw per instance with its own model matrix.
#[derive(Debug, Clone, Default)]
pub struct Crowd {
    models: Vec<MeshId>,
    instances: Vec<SceneInstance>,
}

impl Crowd {
    pub fn new(models: Vec<MeshId>, population: &Population) -> Self {
        Self {
            models,
            instances: population.instances().to_vec(),
        }
    }

    pub fn len(&self) -> usize {
        self.instances.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instances.is_empty()
    }
}

impl Drawable for Crowd {
    fn draw(&self, device: &mut dyn RenderDevice, program: ProgramId) {
        if program == ProgramId::Lit {
            device.program().set_int(uniform::USE_VERTEX_COLOR, 1);
        }
        for instance in &self.instances {
            let Some(&mesh) = self.models.get(instance.model.0) else {
                continue;
            };
            device.program().set_mat4(uniform::MODEL, instance.transform.to_matrix());
            device.draw_mesh(mesh);
        }
    }
}

/// Translucent sea plane.
#[derive(Debug, Clone, Copy)]
pub struct Water {
    pub mesh: MeshId,
    pub color: Vec3,
    pub alpha: f32,
}

/// Uploaded scene content and the terrain kept for ground queries.
pub struct Scene {
    pub terrain: TerrainMesh,
    pub ground: StaticMesh,
    pub forest: StaticMesh,
    pub crowd: Crowd,
    pub water: Option<Water>,
    /// Unit quad turned towards the camera every frame.
    pub sun: MeshId,
    pub outline: Option<OutlineConfig>,
}

impl Scene {
    /// Read the heightmap and models named in `config`, scatter the forest and the crowd,
    /// and upload it all.
    pub fn load(device: &mut dyn RenderDevice, config: &SceneConfig) -> Self {
        let field = HeightField::load_or_flat(&config.assets.heightmap, config.terrain.max_height);
        let terrain = TerrainMesh::build(&field, config.terrain.size);

        let models: Vec<MeshData> = config.assets.models.iter().map(load_or_box).collect();

        let mut rng = scatter_rng(config.population.seed);
        let forest = Forest::generate(&terrain, &config.population.vegetation, &mut rng);
        let ids: Vec<ModelId> = (0..models.len()).map(ModelId).collect();
        let population =
            Population::scatter(&terrain, &ids, &config.population.characters, &mut rng);

        Self::build(device, config, terrain, &forest, &models, &population)
    }

    /// Upload already generated content.
    pub fn build(
        device: &mut dyn RenderDevice,
        config: &SceneConfig,
        terrain: TerrainMesh,
        forest: &Forest,
        models: &[MeshData],
        population: &Population,
    ) -> Self {
        let ground = StaticMesh {
            mesh: device.upload_mesh(&MeshData::from_terrain(&terrain)),
            vertex_colors: false,
        };
        let forest = StaticMesh {
            mesh: device.upload_mesh(forest.mesh()),
            vertex_colors: true,
        };
        let model_ids = models.iter().map(|m| device.upload_mesh(m)).collect();
        let crowd = Crowd::new(model_ids, population);

        let water = config.water.enabled.then(|| upload_water(device, &config.water));
        let sun = device.upload_mesh(&MeshData::billboard_quad(0.5));

        log::info!(
            "Scene ready: {}x{} terrain, {} characters, water {}",
            terrain.width(),
            terrain.depth(),
            crowd.len(),
            if water.is_some() { "on" } else { "off" }
        );

        Self {
            terrain,
            ground,
            forest,
            crowd,
            water,
            sun,
            outline: config.outline.enabled.then(|| config.outline.clone()),
        }
    }

    /// Everything that casts a shadow, in draw order.
    pub fn shadow_casters(&self) -> [&dyn Drawable; 3] {
        [&self.ground, &self.forest, &self.crowd]
    }

    /// Redraw `drawable` as an inflated silhouette with front faces culled.
    ///
    /// Leaves the outline program current and restores back-face culling.
    pub fn draw_outline(
        &self,
        device: &mut dyn RenderDevice,
        drawable: &dyn Drawable,
        shared: impl Fn(&mut dyn RenderDevice),
    ) {
        let Some(outline) = &self.outline else {
            return;
        };
        let p = device.use_program(ProgramId::Outline);
        p.set_float(uniform::THICKNESS, outline.thickness);
        p.set_vec3(uniform::OBJECT_COLOR, Vec3::from_array(outline.color));
        shared(&mut *device);
        device.set_cull_face(CullFace::Front);
        drawable.draw(device, ProgramId::Outline);
        device.set_cull_face(CullFace::Back);
    }
}

fn upload_water(device: &mut dyn RenderDevice, config: &WaterConfig) -> Water {
    Water {
        mesh: device.upload_mesh(&MeshData::plane(config.size, config.height)),
        color: Vec3::from_array(config.color),
        alpha: config.alpha,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use engine_core::Transform;
    use renderer::{FrameRecorder, Viewport};

    fn recorder() -> FrameRecorder {
        FrameRecorder::new(Viewport::new(640, 480))
    }

    #[test]
    fn crowd_draws_each_instance_with_its_matrix() {
        let mut device = recorder();
        let mesh = device.upload_mesh(&MeshData::cube(1.0, [1.0; 3]));
        let population = Population::default();
        let mut crowd = Crowd::new(vec![mesh], &population);
        let placed = Transform::from_yaw_scale(Vec3::new(3.0, 1.0, -4.0), 90.0, 2.0);
        crowd.instances = vec![
            SceneInstance {
                transform: placed,
                model: ModelId(0),
            },
            SceneInstance {
                transform: Transform::default(),
                model: ModelId(5),
            },
        ];

        device.use_program(ProgramId::Lit);
        crowd.draw(&mut device, ProgramId::Lit);
        let frame = device.take_frame();
        // The instance with an unknown model is skipped.
        assert_eq!(frame.draw_count(), 1);
        let draw = &frame.passes[0].draws[0];
        assert_eq!(draw.uniforms.model, placed.to_matrix().to_cols_array_2d());
        assert_eq!(draw.uniforms.flags[1], 1);
    }

    #[test]
    fn terrain_uses_object_colour_in_lit_programs() {
        let mut device = recorder();
        let ground = StaticMesh {
            mesh: device.upload_mesh(&MeshData::plane(1.0, 0.0)),
            vertex_colors: false,
        };
        device.use_program(ProgramId::Lit);
        ground.draw(&mut device, ProgramId::Lit);
        assert_eq!(device.take_frame().passes[0].draws[0].uniforms.flags[1], 0);
    }

    #[test]
    fn load_without_assets_still_builds_a_scene() {
        let mut config = SceneConfig::default();
        config.assets.heightmap = "missing/heightmap.png".into();
        config.assets.models = vec!["missing/model.glb".into()];
        config.population.seed = Some(1);

        let mut device = recorder();
        let scene = Scene::load(&mut device, &config);
        assert_eq!(scene.terrain.width(), 2);
        // Flat terrain sits below every scatter band.
        assert!(scene.crowd.is_empty());
        // terrain, forest, one model, water, sun
        assert_eq!(device.mesh_count(), 5);
        assert!(scene.water.is_some());
    }

    #[test]
    fn disabled_water_and_outline_are_absent() {
        let mut config = SceneConfig::default();
        config.water.enabled = false;
        config.outline.enabled = false;
        let terrain = TerrainMesh::build(&HeightField::flat(2, 2), 300.0);

        let mut device = recorder();
        let scene = Scene::build(
            &mut device,
            &config,
            terrain,
            &Forest::default(),
            &[],
            &Population::default(),
        );
        assert!(scene.water.is_none());

        let outlined = scene.ground;
        scene.draw_outline(&mut device, &outlined, |_| {});
        assert_eq!(device.take_frame().draw_count(), 0);
    }
}
