//! Random static placement of characters and trees over the terrain.
//!
//! Instances are a flat list, placed once at startup and never moved.

use engine_core::{ScatterConfig, Transform};
use glam::Vec3;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::f32::consts::TAU;
use terrain::TerrainMesh;

/// Placement attempts allowed per requested instance.
const ATTEMPTS_PER_INSTANCE: usize = 10;

/// Index into the scene's model list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ModelId(pub usize);

/// One placed copy of a model.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SceneInstance {
    pub transform: Transform,
    pub model: ModelId,
}

/// RNG for scattering: fixed when a seed is configured, otherwise from entropy.
pub fn scatter_rng(seed: Option<u64>) -> StdRng {
    match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    }
}

/// Sample placements on the terrain.
///
/// Points are drawn in polar coordinates around the origin and kept only where the
/// ground lies inside the configured elevation band. Stops after `count` placements or
/// `count * 10` attempts, whichever comes first, so a hostile band yields fewer.
pub fn scatter(
    terrain: &TerrainMesh,
    config: &ScatterConfig,
    rng: &mut impl Rng,
) -> Vec<Transform> {
    let mut placed = Vec::with_capacity(config.count);
    let attempts = config.count.saturating_mul(ATTEMPTS_PER_INSTANCE);

    for _ in 0..attempts {
        if placed.len() >= config.count {
            break;
        }
        let angle = rng.gen_range(0.0..TAU);
        let distance = if config.spawn_radius > config.min_radius {
            rng.gen_range(config.min_radius..config.spawn_radius)
        } else {
            config.min_radius
        };
        let x = angle.cos() * distance;
        let z = angle.sin() * distance;

        let height = terrain.height_at(x, z);
        if height < config.min_elevation || height > config.max_elevation {
            continue;
        }

        let yaw = rng.gen_range(0.0..360.0);
        let scale = if config.max_scale > config.min_scale {
            rng.gen_range(config.min_scale..=config.max_scale)
        } else {
            config.min_scale
        };
        placed.push(Transform::from_yaw_scale(Vec3::new(x, height, z), yaw, scale));
    }

    if placed.len() < config.count {
        log::warn!(
            "placed {} of {} instances after {attempts} attempts",
            placed.len(),
            config.count
        );
    }
    placed
}

/// The character crowd.
#[derive(Debug, Clone, Default)]
pub struct Population {
    instances: Vec<SceneInstance>,
}

impl Population {
    /// Scatter characters, picking one of `models` at random for each.
    pub fn scatter(
        terrain: &TerrainMesh,
        models: &[ModelId],
        config: &ScatterConfig,
        rng: &mut impl Rng,
    ) -> Self {
        if models.is_empty() {
            log::warn!("no character models, population left empty");
            return Self::default();
        }
        let instances: Vec<SceneInstance> = scatter(terrain, config, rng)
            .into_iter()
            .map(|transform| SceneInstance {
                transform,
                model: models[rng.gen_range(0..models.len())],
            })
            .collect();
        log::info!("Populated {} characters", instances.len());
        Self { instances }
    }

    pub fn instances(&self) -> &[SceneInstance] {
        &self.instances
    }

    pub fn len(&self) -> usize {
        self.instances.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instances.is_empty()
    }
}
