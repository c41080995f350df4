//! Indexed triangle mesh built once from a [`HeightField`], plus ground queries.
//!
//! The mesh is centred on the world origin and spans `world_size` along both X and Z
//! regardless of grid resolution. It is immutable after construction; physics and both
//! render passes read it every frame.

use bytemuck::{Pod, Zeroable};
use glam::Vec3;
use physics::GroundQuery;

use crate::heightfield::HeightField;

/// Y component of the unnormalised finite-difference normal.
///
/// This is a shading parameter, not a physical unit: it sets how strongly the normal
/// tilts for a given height difference between neighbours, independent of the actual
/// grid spacing. Larger values flatten the lighting, smaller values exaggerate relief.
pub const NORMAL_SLOPE_SCALE: f32 = 2.0;

/// Added to every [`TerrainMesh::height_at`] result so a camera resting on the returned
/// height does not clip into the rendered surface between samples.
pub const GROUND_CLEARANCE: f32 = 0.2;

/// Terrain vertex: world position and normal, interleaved.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct TerrainVertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
}

/// Vertex and index buffers for the whole terrain.
#[derive(Debug, Clone)]
pub struct TerrainMesh {
    field: HeightField,
    world_size: f32,
    vertices: Vec<TerrainVertex>,
    indices: Vec<u32>,
}

impl TerrainMesh {
    /// Build the mesh. Vertex `(j, i)` sits at index `i * width + j`.
    pub fn build(field: &HeightField, world_size: f32) -> Self {
        let width = field.width();
        let depth = field.depth();
        let half = world_size / 2.0;
        let step_x = world_size / (width - 1) as f32;
        let step_z = world_size / (depth - 1) as f32;

        let mut vertices = Vec::with_capacity(width * depth);
        for i in 0..depth {
            for j in 0..width {
                let x = -half + j as f32 * step_x;
                let z = -half + i as f32 * step_z;
                let y = field.height(j, i);
                let normal = Self::sample_normal(field, j, i);
                vertices.push(TerrainVertex {
                    position: [x, y, z],
                    normal: normal.to_array(),
                });
            }
        }

        // Two triangles per cell, counter-clockwise when seen from +Y.
        let mut indices = Vec::with_capacity(6 * (width - 1) * (depth - 1));
        for i in 0..(depth - 1) {
            for j in 0..(width - 1) {
                let top_left = (i * width + j) as u32;
                let top_right = top_left + 1;
                let bottom_left = ((i + 1) * width + j) as u32;
                let bottom_right = bottom_left + 1;

                indices.push(top_left);
                indices.push(bottom_left);
                indices.push(top_right);

                indices.push(top_right);
                indices.push(bottom_left);
                indices.push(bottom_right);
            }
        }

        log::info!(
            "Built terrain mesh: {} vertices, {} triangles, {}m across",
            vertices.len(),
            indices.len() / 3,
            world_size
        );

        Self {
            field: field.clone(),
            world_size,
            vertices,
            indices,
        }
    }

    /// Central-difference normal; border samples use themselves as the missing neighbour.
    fn sample_normal(field: &HeightField, j: usize, i: usize) -> Vec3 {
        let (j, i) = (j as isize, i as isize);
        let left = field.height_clamped(j - 1, i);
        let right = field.height_clamped(j + 1, i);
        let near = field.height_clamped(j, i - 1);
        let far = field.height_clamped(j, i + 1);
        Vec3::new(left - right, NORMAL_SLOPE_SCALE, near - far).normalize()
    }

    /// Ground height under a world position: nearest sample plus [`GROUND_CLEARANCE`].
    ///
    /// Not interpolated, so walking produces small steps at cell boundaries. Coordinates
    /// outside the terrain (or NaN) clamp onto the border cells; this never panics.
    pub fn height_at(&self, world_x: f32, world_z: f32) -> f32 {
        let j = self.grid_index(world_x, self.field.width());
        let i = self.grid_index(world_z, self.field.depth());
        self.field.height(j, i) + GROUND_CLEARANCE
    }

    fn grid_index(&self, coord: f32, dimension: usize) -> usize {
        let percent = (coord + self.world_size / 2.0) / self.world_size;
        // `as` saturates and maps NaN to 0, so the clamp below covers every input.
        let index = (percent * (dimension - 1) as f32).floor() as isize;
        index.clamp(0, dimension as isize - 2) as usize
    }

    /// Whether a world position lies over the terrain.
    pub fn contains(&self, x: f32, z: f32) -> bool {
        let half = self.world_size / 2.0;
        (-half..=half).contains(&x) && (-half..=half).contains(&z)
    }

    pub fn vertices(&self) -> &[TerrainVertex] {
        &self.vertices
    }

    pub fn indices(&self) -> &[u32] {
        &self.indices
    }

    pub fn world_size(&self) -> f32 {
        self.world_size
    }

    pub fn width(&self) -> usize {
        self.field.width()
    }

    pub fn depth(&self) -> usize {
        self.field.depth()
    }

    pub fn height_field(&self) -> &HeightField {
        &self.field
    }
}

impl GroundQuery for TerrainMesh {
    fn ground_height(&self, x: f32, z: f32) -> f32 {
        self.height_at(x, z)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{GrayImage, Luma};

    /// Field whose sample values are all distinct: height(j, i) = 1 + j + 10 * i.
    fn ramp_field(width: u32, depth: u32) -> HeightField {
        let img = GrayImage::from_fn(width, depth, |j, i| Luma([(1 + j + 10 * i) as u8]));
        HeightField::from_luma(&img, 255.0).unwrap()
    }

    #[test]
    fn vertex_and_index_counts_follow_grid() {
        for (w, d) in [(2, 2), (3, 5), (17, 9), (64, 64)] {
            let mesh = TerrainMesh::build(&ramp_field(w, d), 300.0);
            let (w, d) = (w as usize, d as usize);
            assert_eq!(mesh.vertices().len(), w * d);
            assert_eq!(mesh.indices().len(), 6 * (w - 1) * (d - 1));
            assert!(mesh.indices().iter().all(|&ix| (ix as usize) < w * d));
        }
    }

    #[test]
    fn mesh_is_centred_and_spans_world_size() {
        let mesh = TerrainMesh::build(&ramp_field(5, 3), 300.0);
        let first = mesh.vertices()[0].position;
        let last = mesh.vertices()[mesh.vertices().len() - 1].position;
        assert_eq!([first[0], first[2]], [-150.0, -150.0]);
        assert_eq!([last[0], last[2]], [150.0, 150.0]);
        // Row-major by i: vertex 1 is one step along X.
        assert_eq!(mesh.vertices()[1].position[0], -75.0);
        assert_eq!(mesh.vertices()[5].position[2], 0.0);
        assert_eq!((mesh.width(), mesh.depth()), (5, 3));
        assert_eq!(mesh.height_field().height(4, 2), mesh.vertices()[14].position[1]);
    }

    #[test]
    fn zero_image_yields_zero_vertex_heights() {
        let n = 16;
        let field = HeightField::from_luma(&GrayImage::new(n, n), 40.0).unwrap();
        let mesh = TerrainMesh::build(&field, 300.0);
        assert!(mesh.vertices().iter().all(|v| v.position[1] == 0.0));
        // Clearance is only added by the query.
        assert_eq!(mesh.height_at(12.0, -40.0), GROUND_CLEARANCE);
    }

    #[test]
    fn flat_field_normals_point_up() {
        let mesh = TerrainMesh::build(&HeightField::flat(8, 6), 100.0);
        for v in mesh.vertices() {
            let n = Vec3::from_array(v.normal);
            assert!((n - Vec3::Y).length() < 1e-6, "normal {n:?}");
        }
    }

    #[test]
    fn normals_lean_away_from_rising_ground() {
        // Height grows with j (along +X), so the surface faces -X.
        let img = GrayImage::from_fn(4, 4, |j, _| Luma([(j * 40) as u8]));
        let field = HeightField::from_luma(&img, 255.0).unwrap();
        let mesh = TerrainMesh::build(&field, 10.0);
        let n = Vec3::from_array(mesh.vertices()[1 * 4 + 1].normal);
        assert!(n.x < 0.0 && n.y > 0.0 && n.z.abs() < 1e-6, "normal {n:?}");
        assert!((n.length() - 1.0).abs() < 1e-5);

        let expected = Vec3::new(0.0 - 80.0, NORMAL_SLOPE_SCALE, 0.0).normalize();
        assert!((n - expected).length() < 1e-5);
    }

    #[test]
    fn triangles_face_up() {
        let mesh = TerrainMesh::build(&ramp_field(4, 3), 30.0);
        let v = mesh.vertices();
        for tri in mesh.indices().chunks(3) {
            let a = Vec3::from_array(v[tri[0] as usize].position);
            let b = Vec3::from_array(v[tri[1] as usize].position);
            let c = Vec3::from_array(v[tri[2] as usize].position);
            // Counter-clockwise front face in a right-handed frame: normal along (b-a)x(c-a).
            let face = (b - a).cross(c - a);
            assert!(face.y > 0.0, "triangle {tri:?} faces down");
        }
    }

    #[test]
    fn height_query_uses_nearest_sample_without_interpolation() {
        let field = ramp_field(4, 4);
        let mesh = TerrainMesh::build(&field, 30.0);
        // x = -15 + 12 => percent 0.4 => floor(0.4 * 3) = 1; same for z.
        let h = mesh.height_at(-3.0, -3.0);
        assert_eq!(h, field.height(1, 1) + GROUND_CLEARANCE);
        // Anywhere inside the same cell returns the same height.
        assert_eq!(mesh.height_at(-4.9, -0.1), h);
    }

    #[test]
    fn height_query_clamps_out_of_range_coordinates() {
        let field = ramp_field(5, 4);
        let mesh = TerrainMesh::build(&field, 300.0);
        let far_corner = field.height(5 - 2, 4 - 2) + GROUND_CLEARANCE;
        let near_corner = field.height(0, 0) + GROUND_CLEARANCE;

        assert_eq!(mesh.height_at(1.0e6, 1.0e6), far_corner);
        assert_eq!(mesh.height_at(150.0, 150.0), far_corner);
        assert_eq!(mesh.height_at(-1.0e6, -1.0e6), near_corner);
        assert_eq!(
            mesh.height_at(f32::INFINITY, f32::NEG_INFINITY),
            field.height(3, 0) + GROUND_CLEARANCE
        );
        assert_eq!(mesh.height_at(f32::NAN, f32::NAN), near_corner);
    }

    #[test]
    fn flat_fallback_scenario() {
        let mesh = TerrainMesh::build(&HeightField::flat(2, 2), 300.0);
        assert!((mesh.height_at(0.0, 0.0) - 0.2).abs() < 1e-6);
        assert_eq!(mesh.height_at(1000.0, 1000.0), mesh.height_at(0.0, 0.0));
        assert_eq!(mesh.ground_height(-1000.0, 0.0), mesh.height_at(0.0, 0.0));
    }

    #[test]
    fn contains_matches_extent() {
        let mesh = TerrainMesh::build(&HeightField::flat(2, 2), 300.0);
        assert!(mesh.contains(0.0, 0.0));
        assert!(mesh.contains(150.0, -150.0));
        assert!(!mesh.contains(150.1, 0.0));
    }
}
