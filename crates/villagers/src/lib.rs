//! Villager variety: per-region, per-season skins for townsfolk and guards.
//!
//! - Image naming and the qualifier fallback chain
//! - Archive tables, record geometry and the texture-set cache
//! - Billboard orientation and animation state
//! - Population cap tuning, Orc names and the mod message surface

pub mod archive;
pub mod assets;
pub mod billboard;
pub mod cache;
pub mod config;
pub mod engine;
pub mod geometry;
pub mod messages;
pub mod names;
pub mod naming;
pub mod population;
pub mod resolver;
pub mod texture;
pub mod world;

pub use archive::*;
pub use assets::*;
pub use billboard::*;
pub use cache::*;
pub use config::*;
pub use engine::*;
pub use geometry::*;
pub use messages::*;
pub use names::*;
pub use naming::*;
pub use population::*;
pub use resolver::*;
pub use texture::*;
pub use world::*;
