//! glTF model import for the crowd.
//!
//! A model is flattened into one [`MeshData`]: every primitive of every node is baked
//! with its world transform, and the material's base colour becomes the vertex colour.

use glam::{Mat4, Vec3};
use renderer::{MeshData, Vertex};
use std::path::Path;
use thiserror::Error;

/// Size of the stand-in box for a model that failed to load.
const FALLBACK_BOX_SIZE: f32 = 1.0;
const FALLBACK_BOX_COLOR: [f32; 3] = [0.8, 0.3, 0.3];

#[derive(Debug, Error)]
pub enum ModelError {
    #[error("failed to import glTF: {0}")]
    Import(#[from] gltf::Error),

    #[error("primitive {primitive} of mesh '{mesh}' has no positions")]
    MissingPositions { mesh: String, primitive: usize },

    #[error("model contains no triangles")]
    Empty,
}

/// Import every mesh of the default (or first) scene into one mesh.
pub fn load_model(path: impl AsRef<Path>) -> Result<MeshData, ModelError> {
    let path = path.as_ref();
    let (document, buffers, _images) = gltf::import(path)?;

    let mut data = MeshData::new();
    let scene = document.default_scene().or_else(|| document.scenes().next());
    if let Some(scene) = scene {
        for node in scene.nodes() {
            process_node(&node, Mat4::IDENTITY, &buffers, &mut data)?;
        }
    }

    if data.is_empty() {
        return Err(ModelError::Empty);
    }
    log::info!(
        "Loaded model {}: {} vertices, {} triangles",
        path.display(),
        data.vertices.len(),
        data.triangle_count()
    );
    Ok(data)
}

/// Load a model, or a small box in its place when the file is missing or unreadable.
pub fn load_or_box(path: impl AsRef<Path>) -> MeshData {
    let path = path.as_ref();
    match load_model(path) {
        Ok(data) => data,
        Err(e) => {
            log::warn!("Model {} unavailable ({e}), using a box", path.display());
            MeshData::cube(FALLBACK_BOX_SIZE, FALLBACK_BOX_COLOR)
        }
    }
}

fn process_node(
    node: &gltf::Node,
    parent: Mat4,
    buffers: &[gltf::buffer::Data],
    out: &mut MeshData,
) -> Result<(), ModelError> {
    let world = parent * Mat4::from_cols_array_2d(&node.transform().matrix());

    if let Some(mesh) = node.mesh() {
        let name = mesh.name().unwrap_or("unnamed");
        for (index, primitive) in mesh.primitives().enumerate() {
            if primitive.mode() != gltf::mesh::Mode::Triangles {
                log::debug!("skipping non-triangle primitive {index} of mesh '{name}'");
                continue;
            }
            let local =
                read_primitive(&primitive, buffers).ok_or_else(|| ModelError::MissingPositions {
                    mesh: name.to_string(),
                    primitive: index,
                })?;
            out.append_transformed(&local, world);
        }
    }

    for child in node.children() {
        process_node(&child, world, buffers, out)?;
    }
    Ok(())
}

/// Positions, normals and indices of one primitive in node space.
fn read_primitive(primitive: &gltf::Primitive, buffers: &[gltf::buffer::Data]) -> Option<MeshData> {
    let reader = primitive.reader(|buffer| Some(&buffers[buffer.index()]));

    let positions: Vec<[f32; 3]> = reader.read_positions()?.collect();
    let indices: Vec<u32> = reader
        .read_indices()
        .map(|iter| iter.into_u32().collect())
        .unwrap_or_else(|| (0..positions.len() as u32).collect());
    let normals: Vec<[f32; 3]> = match reader.read_normals() {
        Some(iter) => iter.collect(),
        None => face_normals(&positions, &indices),
    };

    let base = primitive.material().pbr_metallic_roughness().base_color_factor();
    let color = [base[0], base[1], base[2]];

    let vertices = positions
        .iter()
        .enumerate()
        .map(|(i, &p)| {
            let normal = normals.get(i).copied().unwrap_or([0.0, 1.0, 0.0]);
            Vertex::with_color(p, normal, color)
        })
        .collect();
    Some(MeshData { vertices, indices })
}

/// Per-vertex normals accumulated from the faces that use each vertex.
fn face_normals(positions: &[[f32; 3]], indices: &[u32]) -> Vec<[f32; 3]> {
    let mut sums = vec![Vec3::ZERO; positions.len()];
    for tri in indices.chunks_exact(3) {
        let [a, b, c] = [tri[0], tri[1], tri[2]].map(|i| i as usize);
        if a >= positions.len() || b >= positions.len() || c >= positions.len() {
            continue;
        }
        let (pa, pb, pc) = (
            Vec3::from_array(positions[a]),
            Vec3::from_array(positions[b]),
            Vec3::from_array(positions[c]),
        );
        let n = (pb - pa).cross(pc - pa);
        for i in [a, b, c] {
            sums[i] += n;
        }
    }
    sums.into_iter()
        .map(|n| n.try_normalize().unwrap_or(Vec3::Y).to_array())
        .collect()
}
