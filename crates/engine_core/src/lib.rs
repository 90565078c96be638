//! Core engine types shared by the villager crates.
//!
//! - Transform and planar facing helpers
//! - World calendar (seasons, day/night, hour ticks)

pub mod time;
pub mod transform;

pub use time::*;
pub use transform::*;

// Re-export commonly used types
pub use glam::{Quat, Vec2, Vec3};
