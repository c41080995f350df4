//! Shared value types for isleview: instance placement, the frame clock, and the
//! scene configuration every constructor is handed.

pub mod config;
pub mod time;
pub mod transform;

pub use config::*;
pub use time::*;
pub use transform::*;

pub use glam::{Mat4, Quat, Vec2, Vec3, Vec4};
