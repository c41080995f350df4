//! Low-poly forest baked into a single mesh.

use crate::population::scatter;
use engine_core::{ScatterConfig, Transform};
use glam::Vec3;
use rand::Rng;
use renderer::MeshData;
use terrain::TerrainMesh;

const TRUNK_COLOR: [f32; 3] = [0.55, 0.45, 0.40];
const LEAF_COLOR: [f32; 3] = [0.48, 0.77, 0.63];
const PEBBLE_COLOR: [f32; 3] = [0.5, 0.5, 0.6];
const ROCK_COLOR: [f32; 3] = [0.6, 0.6, 0.65];

/// Chance of a pebble next to a trunk.
const PEBBLE_CHANCE: f64 = 0.3;
const PEBBLE_OFFSET: Vec3 = Vec3::new(1.0, 0.0, 0.5);

/// Every tree of the scene, merged so the forest is one draw per pass.
#[derive(Debug, Clone, Default)]
pub struct Forest {
    mesh: MeshData,
    trees: Vec<Transform>,
}

impl Forest {
    /// Scatter trees over `terrain` and bake their geometry.
    pub fn generate(terrain: &TerrainMesh, config: &ScatterConfig, rng: &mut impl Rng) -> Self {
        let trees = scatter(terrain, config, rng);
        let mut mesh = MeshData::new();
        for tree in &trees {
            push_tree(&mut mesh, tree.position, tree.scale.x, rng);
        }
        log::info!("Grew {} trees ({} triangles)", trees.len(), mesh.triangle_count());
        Self { mesh, trees }
    }

    pub fn mesh(&self) -> &MeshData {
        &self.mesh
    }

    /// Placement of every tree; the mesh is already in world space.
    pub fn trees(&self) -> &[Transform] {
        &self.trees
    }
}

/// Trunk, two stacked leaf cones, a flat rock at the base and sometimes a pebble.
fn push_tree(mesh: &mut MeshData, base: Vec3, scale: f32, rng: &mut impl Rng) {
    mesh.push_cylinder(base, 0.5 * scale, 2.0 * scale, TRUNK_COLOR);
    mesh.push_cone(base + Vec3::Y * 1.5 * scale, 2.5 * scale, 2.0 * scale, LEAF_COLOR);
    mesh.push_cone(base + Vec3::Y * 3.0 * scale, 1.8 * scale, 1.5 * scale, LEAF_COLOR);

    if rng.gen_bool(PEBBLE_CHANCE) {
        mesh.push_cone(base + PEBBLE_OFFSET, 0.8, 0.6, PEBBLE_COLOR);
    }

    let radius = rng.gen_range(1.0..2.0);
    let height = rng.gen_range(0.5..1.0);
    mesh.push_cone(base, radius, height, ROCK_COLOR);
}
