//! Terrain built from a grayscale heightmap: the sampled height field, the indexed
//! triangle mesh derived from it, and nearest-sample ground queries for physics.

pub mod heightfield;
pub mod mesh;

pub use heightfield::*;
pub use mesh::*;
