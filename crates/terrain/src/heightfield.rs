//! Height field sampled 1:1 from a grayscale raster image.
//!
//! Source resolution is mesh resolution: a 512x512 image yields a 512x512 vertex grid.
//! Callers that want a different density must resample the image before building the field.

use image::{GrayImage, ImageReader};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Smallest grid the mesh builder accepts (one cell).
pub const MIN_DIMENSION: usize = 2;

/// Failure to turn a heightmap file into a height field.
#[derive(Debug, Error)]
pub enum AssetLoadError {
    #[error("failed to open heightmap {path:?}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to decode heightmap {path:?}: {source}")]
    Decode {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error("heightmap is {width}x{depth}; at least 2x2 samples are required")]
    TooSmall { width: usize, depth: usize },
}

/// Immutable grid of elevation samples.
///
/// `width` counts samples along X (image columns, index `j`), `depth` along Z
/// (image rows, index `i`). Samples are stored row-major by `i`.
#[derive(Debug, Clone, PartialEq)]
pub struct HeightField {
    width: usize,
    depth: usize,
    max_height: f32,
    heights: Vec<f32>,
}

impl HeightField {
    /// Decode `path` and sample it. Each pixel's luma in [0, 255] maps linearly onto
    /// [0, `max_height`].
    pub fn load(path: impl AsRef<Path>, max_height: f32) -> Result<Self, AssetLoadError> {
        let path = path.as_ref();
        let reader = ImageReader::open(path)
            .and_then(|r| r.with_guessed_format())
            .map_err(|source| AssetLoadError::Open {
                path: path.to_path_buf(),
                source,
            })?;
        let image = reader.decode().map_err(|source| AssetLoadError::Decode {
            path: path.to_path_buf(),
            source,
        })?;
        let field = Self::from_luma(&image.to_luma8(), max_height)?;
        log::info!(
            "Loaded heightmap {:?}: {}x{} samples, max height {}",
            path,
            field.width,
            field.depth,
            max_height
        );
        Ok(field)
    }

    /// Load `path`, or fall back to a flat 2x2 field so the renderer keeps running
    /// without a heightmap.
    pub fn load_or_flat(path: impl AsRef<Path>, max_height: f32) -> Self {
        match Self::load(path, max_height) {
            Ok(field) => field,
            Err(e) => {
                log::warn!("{e}; using a flat {MIN_DIMENSION}x{MIN_DIMENSION} terrain");
                Self::flat(MIN_DIMENSION, MIN_DIMENSION)
            }
        }
    }

    /// Sample an in-memory grayscale image.
    pub fn from_luma(image: &GrayImage, max_height: f32) -> Result<Self, AssetLoadError> {
        let width = image.width() as usize;
        let depth = image.height() as usize;
        if width < MIN_DIMENSION || depth < MIN_DIMENSION {
            return Err(AssetLoadError::TooSmall { width, depth });
        }

        let mut heights = Vec::with_capacity(width * depth);
        for i in 0..depth {
            for j in 0..width {
                let luma = image.get_pixel(j as u32, i as u32).0[0];
                heights.push(luma as f32 / 255.0 * max_height);
            }
        }

        Ok(Self {
            width,
            depth,
            max_height,
            heights,
        })
    }

    /// All-zero field; dimensions below 2 are raised to 2.
    pub fn flat(width: usize, depth: usize) -> Self {
        let width = width.max(MIN_DIMENSION);
        let depth = depth.max(MIN_DIMENSION);
        Self {
            width,
            depth,
            max_height: 0.0,
            heights: vec![0.0; width * depth],
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn depth(&self) -> usize {
        self.depth
    }

    pub fn max_height(&self) -> f32 {
        self.max_height
    }

    /// Height at column `j`, row `i`. Panics when out of range; use
    /// [`HeightField::height_clamped`] for neighbour reads.
    #[inline]
    pub fn height(&self, j: usize, i: usize) -> f32 {
        assert!(
            j < self.width && i < self.depth,
            "sample ({j}, {i}) outside {}x{}",
            self.width,
            self.depth
        );
        self.heights[i * self.width + j]
    }

    /// Height with both indices clamped onto the grid (border samples repeat).
    #[inline]
    pub fn height_clamped(&self, j: isize, i: isize) -> f32 {
        let j = j.clamp(0, self.width as isize - 1) as usize;
        let i = i.clamp(0, self.depth as isize - 1) as usize;
        self.heights[i * self.width + j]
    }

    /// Raw samples, row-major by `i`.
    pub fn samples(&self) -> &[f32] {
        &self.heights
    }
}
