//! Scene configuration: one immutable structure handed to every constructor.
//!
//! Every field has a default, so a partial `config.ron` only overrides what it names.
//! Loading the file lives in the application crate; this crate only defines the shape.

use glam::Vec3;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// All tunables of the scene, grouped by the system that reads them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SceneConfig {
    pub window: WindowConfig,
    pub camera: CameraConfig,
    pub terrain: TerrainConfig,
    pub shadow: ShadowConfig,
    pub sky: SkyConfig,
    pub water: WaterConfig,
    pub outline: OutlineConfig,
    pub population: PopulationConfig,
    pub assets: AssetConfig,
}

/// Window size and presentation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WindowConfig {
    /// Window width in physical pixels.
    pub width: u32,
    /// Window height in physical pixels.
    pub height: u32,
    pub title: String,
    /// Enable vsync (recommended to avoid tearing).
    pub vsync: bool,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            width: 1280,
            height: 720,
            title: "isleview".to_string(),
            vsync: true,
        }
    }
}

/// First-person camera: walking, look, projection and vertical physics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraConfig {
    /// Walk speed in metres per second.
    pub speed: f32,
    /// Speed multiplier while Left Shift is held.
    pub run_multiplier: f32,
    /// Degrees of yaw/pitch per pixel of mouse movement.
    pub sensitivity: f32,
    /// Height of the eye above the ground when standing.
    pub eye_height: f32,
    /// Upward velocity set by a jump.
    pub jump_impulse: f32,
    /// Downward acceleration, positive.
    pub gravity: f32,
    pub fov_degrees: f32,
    pub near: f32,
    pub far: f32,
    /// Spawn position; the camera falls onto the terrain from here.
    pub spawn: [f32; 3],
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            speed: 5.0,
            run_multiplier: 2.0,
            sensitivity: 0.1,
            eye_height: 2.0,
            jump_impulse: 15.0,
            gravity: 40.0,
            fov_degrees: 45.0,
            near: 0.1,
            far: 1000.0,
            spawn: [0.0, 5.0, 0.0],
        }
    }
}

/// Terrain extent and elevation scale.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TerrainConfig {
    /// Edge length of the square terrain in world units, centred on the origin.
    pub size: f32,
    /// Height of a pure white heightmap pixel.
    pub max_height: f32,
}

impl Default for TerrainConfig {
    fn default() -> Self {
        Self {
            size: 300.0,
            max_height: 40.0,
        }
    }
}

/// Shadow map resolution and the camera-following light frustum.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ShadowConfig {
    /// Edge length of the square depth target in texels.
    pub resolution: u32,
    /// Half width/height of the orthographic light volume.
    pub half_extent: f32,
    pub near: f32,
    pub far: f32,
    /// Distance of the light eye from the camera, along the sun direction.
    pub light_distance: f32,
}

impl Default for ShadowConfig {
    fn default() -> Self {
        Self {
            resolution: 2048,
            half_extent: 150.0,
            near: 1.0,
            far: 300.0,
            light_distance: 150.0,
        }
    }
}

/// Day/night cycle and palette.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SkyConfig {
    /// Scene time at startup (scene minutes; 480 = 08:00).
    pub start_time: f32,
    /// Scene seconds advanced per real second.
    pub time_rate: f32,
    /// Fixed Z component of the unnormalised sun direction.
    pub sun_tilt: f32,
    pub day_color: [f32; 3],
    pub sunset_color: [f32; 3],
    pub night_color: [f32; 3],
    pub sun_color: [f32; 3],
    pub ambient_color: [f32; 3],
    /// Distance of the sun billboard from the camera.
    pub sun_distance: f32,
    pub sun_scale: f32,
}

impl Default for SkyConfig {
    fn default() -> Self {
        Self {
            start_time: 480.0,
            time_rate: 2.0,
            sun_tilt: 0.1,
            day_color: [0.53, 0.81, 0.92],
            sunset_color: [0.98, 0.55, 0.35],
            night_color: [0.02, 0.02, 0.08],
            sun_color: [1.0, 0.95, 0.85],
            ambient_color: [0.3, 0.3, 0.35],
            sun_distance: 400.0,
            sun_scale: 40.0,
        }
    }
}

impl SkyConfig {
    pub fn day(&self) -> Vec3 {
        Vec3::from_array(self.day_color)
    }

    pub fn sunset(&self) -> Vec3 {
        Vec3::from_array(self.sunset_color)
    }

    pub fn night(&self) -> Vec3 {
        Vec3::from_array(self.night_color)
    }
}

/// Translucent sea plane.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WaterConfig {
    pub enabled: bool,
    /// Half edge length of the plane.
    pub size: f32,
    pub height: f32,
    pub color: [f32; 3],
    pub alpha: f32,
}

impl Default for WaterConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            size: 800.0,
            height: 12.0,
            color: [0.1, 0.3, 0.8],
            alpha: 0.6,
        }
    }
}

/// Stylised silhouette drawn behind opaque geometry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutlineConfig {
    pub enabled: bool,
    /// Distance vertices are pushed along their normals.
    pub thickness: f32,
    pub color: [f32; 3],
}

impl Default for OutlineConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            thickness: 0.12,
            color: [0.05, 0.05, 0.05],
        }
    }
}

/// Random placement rules for one kind of static instance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScatterConfig {
    /// Number of instances to place; placement gives up after `count * 10` attempts.
    pub count: usize,
    pub min_radius: f32,
    pub spawn_radius: f32,
    /// Instances are only placed where the ground is within this band.
    pub min_elevation: f32,
    pub max_elevation: f32,
    pub min_scale: f32,
    pub max_scale: f32,
}

impl Default for ScatterConfig {
    fn default() -> Self {
        Self {
            count: 80,
            min_radius: 10.0,
            spawn_radius: 260.0,
            min_elevation: 15.0,
            max_elevation: 85.0,
            min_scale: 2.0,
            max_scale: 2.0,
        }
    }
}

/// Crowd and forest placement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PopulationConfig {
    /// Fixed RNG seed; `None` scatters differently on every run.
    pub seed: Option<u64>,
    pub characters: ScatterConfig,
    pub vegetation: ScatterConfig,
}

impl Default for PopulationConfig {
    fn default() -> Self {
        Self {
            seed: None,
            characters: ScatterConfig::default(),
            vegetation: ScatterConfig {
                count: 200,
                min_radius: 0.0,
                spawn_radius: 280.0,
                min_elevation: 15.0,
                max_elevation: 80.0,
                min_scale: 1.2,
                max_scale: 2.5,
            },
        }
    }
}

/// Asset paths read once at startup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AssetConfig {
    pub heightmap: PathBuf,
    /// Character models; the crowd picks one at random per instance.
    pub models: Vec<PathBuf>,
}

impl Default for AssetConfig {
    fn default() -> Self {
        Self {
            heightmap: PathBuf::from("assets/textures/heightmap.jpg"),
            models: ["character", "abe", "boss", "michelle"]
                .iter()
                .map(|name| PathBuf::from(format!("assets/models/{name}.glb")))
                .collect(),
        }
    }
}
