//! Mesh data structures and primitive generation.

use crate::vertex::Vertex;
use glam::{Mat3, Mat4, Vec3};
use terrain::TerrainMesh;
use wgpu::util::DeviceExt;

/// Sides of the low-poly cylinders and cones.
pub const LOW_POLY_SEGMENTS: u32 = 6;

/// A GPU mesh with vertex and index buffers.
pub struct Mesh {
    pub vertex_buffer: wgpu::Buffer,
    pub index_buffer: wgpu::Buffer,
    pub num_indices: u32,
}

impl Mesh {
    /// Create a mesh from vertex and index data.
    pub fn new(device: &wgpu::Device, vertices: &[Vertex], indices: &[u32]) -> Self {
        let vertex_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Vertex Buffer"),
            contents: bytemuck::cast_slice(vertices),
            usage: wgpu::BufferUsages::VERTEX,
        });

        let index_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Index Buffer"),
            contents: bytemuck::cast_slice(indices),
            usage: wgpu::BufferUsages::INDEX,
        });

        Self {
            vertex_buffer,
            index_buffer,
            num_indices: indices.len() as u32,
        }
    }
}

/// Mesh data before GPU upload.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MeshData {
    pub vertices: Vec<Vertex>,
    pub indices: Vec<u32>,
}

impl MeshData {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    pub fn upload(&self, device: &wgpu::Device) -> Mesh {
        Mesh::new(device, &self.vertices, &self.indices)
    }

    /// Terrain vertices as-is; the terrain program colours by height, so vertex colour is white.
    pub fn from_terrain(terrain: &TerrainMesh) -> Self {
        Self {
            vertices: terrain
                .vertices()
                .iter()
                .map(|v| Vertex::new(v.position, v.normal))
                .collect(),
            indices: terrain.indices().to_vec(),
        }
    }

    /// Horizontal square at height `y`, spanning `[-half_extent, half_extent]` on X and Z.
    pub fn plane(half_extent: f32, y: f32) -> Self {
        let h = half_extent;
        let up = [0.0, 1.0, 0.0];
        Self {
            vertices: vec![
                Vertex::new([-h, y, -h], up),
                Vertex::new([-h, y, h], up),
                Vertex::new([h, y, h], up),
                Vertex::new([h, y, -h], up),
            ],
            indices: vec![0, 1, 2, 2, 3, 0],
        }
    }

    /// Quad in the XY plane facing +Z, corners at ±`half`.
    pub fn billboard_quad(half: f32) -> Self {
        let n = [0.0, 0.0, 1.0];
        Self {
            vertices: vec![
                Vertex::new([-half, -half, 0.0], n),
                Vertex::new([half, -half, 0.0], n),
                Vertex::new([half, half, 0.0], n),
                Vertex::new([-half, half, 0.0], n),
            ],
            indices: vec![0, 1, 2, 2, 3, 0],
        }
    }

    /// Axis-aligned box standing on the origin, `size` along every axis.
    pub fn cube(size: f32, color: [f32; 3]) -> Self {
        let h = size / 2.0;
        // (normal, four corners counter-clockwise seen from outside)
        let faces: [([f32; 3], [[f32; 3]; 4]); 6] = [
            ([0.0, 0.0, 1.0], [[-h, 0.0, h], [h, 0.0, h], [h, size, h], [-h, size, h]]),
            ([0.0, 0.0, -1.0], [[h, 0.0, -h], [-h, 0.0, -h], [-h, size, -h], [h, size, -h]]),
            ([0.0, 1.0, 0.0], [[-h, size, h], [h, size, h], [h, size, -h], [-h, size, -h]]),
            ([0.0, -1.0, 0.0], [[-h, 0.0, -h], [h, 0.0, -h], [h, 0.0, h], [-h, 0.0, h]]),
            ([1.0, 0.0, 0.0], [[h, 0.0, h], [h, 0.0, -h], [h, size, -h], [h, size, h]]),
            ([-1.0, 0.0, 0.0], [[-h, 0.0, -h], [-h, 0.0, h], [-h, size, h], [-h, size, -h]]),
        ];

        let mut data = Self::new();
        for (normal, corners) in faces {
            let base = data.vertices.len() as u32;
            for corner in corners {
                data.vertices.push(Vertex::with_color(corner, normal, color));
            }
            data.indices.extend_from_slice(&[base, base + 1, base + 2, base + 2, base + 3, base]);
        }
        data
    }

    fn push_triangle(&mut self, a: Vec3, b: Vec3, c: Vec3, normal: Vec3, color: [f32; 3]) {
        let base = self.vertices.len() as u32;
        for p in [a, b, c] {
            self.vertices.push(Vertex::with_color(p.to_array(), normal.to_array(), color));
        }
        self.indices.extend_from_slice(&[base, base + 1, base + 2]);
    }

    /// Open hexagonal cylinder standing on `base`, flat-shaded per side.
    pub fn push_cylinder(&mut self, base: Vec3, radius: f32, height: f32, color: [f32; 3]) {
        let step = std::f32::consts::TAU / LOW_POLY_SEGMENTS as f32;
        let top = Vec3::Y * height;
        for i in 0..LOW_POLY_SEGMENTS {
            let a1 = i as f32 * step;
            let a2 = a1 + step;
            let b1 = base + Vec3::new(a1.cos(), 0.0, a1.sin()) * radius;
            let b2 = base + Vec3::new(a2.cos(), 0.0, a2.sin()) * radius;
            let mid = a1 + step / 2.0;
            let normal = Vec3::new(mid.cos(), 0.0, mid.sin());

            self.push_triangle(b1, b1 + top, b2, normal, color);
            self.push_triangle(b1 + top, b2 + top, b2, normal, color);
        }
    }

    /// Hexagonal cone (no base cap) standing on `base`, flat-shaded per side.
    pub fn push_cone(&mut self, base: Vec3, radius: f32, height: f32, color: [f32; 3]) {
        let step = std::f32::consts::TAU / LOW_POLY_SEGMENTS as f32;
        let apex = base + Vec3::Y * height;
        for i in 0..LOW_POLY_SEGMENTS {
            let a1 = i as f32 * step;
            let a2 = a1 + step;
            let p1 = base + Vec3::new(a1.cos(), 0.0, a1.sin()) * radius;
            let p2 = base + Vec3::new(a2.cos(), 0.0, a2.sin()) * radius;
            let normal = (apex - p1).cross(p2 - p1).normalize_or_zero();
            self.push_triangle(p1, apex, p2, normal, color);
        }
    }

    /// Append `other` transformed by `transform` (normals by its inverse transpose).
    pub fn append_transformed(&mut self, other: &MeshData, transform: Mat4) {
        let normal_matrix = Mat3::from_mat4(transform).inverse().transpose();
        let base = self.vertices.len() as u32;
        self.vertices.extend(other.vertices.iter().map(|v| Vertex {
            position: transform.transform_point3(Vec3::from_array(v.position)).to_array(),
            normal: (normal_matrix * Vec3::from_array(v.normal)).normalize_or_zero().to_array(),
            color: v.color,
        }));
        self.indices.extend(other.indices.iter().map(|i| i + base));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use terrain::HeightField;

    /// Every triangle's winding agrees with its stored normal.
    fn assert_outward(data: &MeshData) {
        for tri in data.indices.chunks(3) {
            let corner = |k: usize| Vec3::from_array(data.vertices[tri[k] as usize].position);
            let [a, b, c] = [corner(0), corner(1), corner(2)];
            let face = (b - a).cross(c - a);
            let n = Vec3::from_array(data.vertices[tri[0] as usize].normal);
            assert!(face.dot(n) > 0.0, "triangle {tri:?} winds against its normal");
        }
    }

    #[test]
    fn terrain_conversion_keeps_layout() {
        let terrain = TerrainMesh::build(&HeightField::flat(3, 4), 300.0);
        let data = MeshData::from_terrain(&terrain);
        assert_eq!(data.vertices.len(), 12);
        assert_eq!(data.indices.len(), 6 * 2 * 3);
        assert_eq!(data.vertices[5].position, terrain.vertices()[5].position);
    }

    #[test]
    fn primitives_wind_counter_clockwise() {
        assert_outward(&MeshData::plane(800.0, 12.0));
        assert_outward(&MeshData::billboard_quad(1.0));
        assert_outward(&MeshData::cube(1.0, [1.0; 3]));

        let mut tree = MeshData::new();
        tree.push_cylinder(Vec3::ZERO, 0.5, 2.0, [0.5; 3]);
        tree.push_cone(Vec3::new(0.0, 1.5, 0.0), 2.5, 2.0, [0.5; 3]);
        assert_outward(&tree);
        assert_eq!(tree.triangle_count(), 3 * LOW_POLY_SEGMENTS as usize);
    }

    #[test]
    fn cone_normals_point_up_and_out() {
        let mut cone = MeshData::new();
        cone.push_cone(Vec3::ZERO, 1.0, 1.0, [1.0; 3]);
        for v in &cone.vertices {
            assert!(v.normal[1] > 0.0);
        }
    }

    #[test]
    fn plane_sits_at_height() {
        let plane = MeshData::plane(10.0, 12.0);
        assert!(plane.vertices.iter().all(|v| v.position[1] == 12.0));
    }

    #[test]
    fn append_offsets_indices_and_moves_vertices() {
        let cube = MeshData::cube(1.0, [1.0; 3]);
        let mut merged = cube.clone();
        merged.append_transformed(&cube, Mat4::from_translation(Vec3::new(10.0, 0.0, 0.0)));
        assert_eq!(merged.vertices.len(), 48);
        assert_eq!(merged.indices[36], 24);
        assert_eq!(merged.vertices[24].position[0], cube.vertices[0].position[0] + 10.0);
        assert_outward(&merged);
    }
}
