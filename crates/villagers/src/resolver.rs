//! Variant resolution: pick the most specific custom skin that actually exists.
//!
//! Qualifiers are dropped in a fixed order until the first frame of an identity
//! is found: season, then variety (reset to 0), then climate. A dropped
//! qualifier is never restored, so at most four probes are made.

use thiserror::Error;

use crate::archive::{is_guard_archive, is_redguard_archive};
use crate::assets::AssetProvider;
use crate::config::VarietyConfig;
use crate::naming::{guard_image_name, image_name, CLIMATE_SUBTROPICAL};
use crate::population::uses_redguard_population;
use crate::world::WorldContext;

/// Everything that selects a villager skin.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AssetIdentity {
    pub archive: u32,
    pub face_record: u32,
    pub variety: u32,
    pub climate: String,
    pub season: String,
}

impl AssetIdentity {
    pub fn new(
        archive: u32,
        face_record: u32,
        variety: u32,
        climate: impl Into<String>,
        season: impl Into<String>,
    ) -> Self {
        Self {
            archive,
            face_record,
            variety,
            climate: climate.into(),
            season: season.into(),
        }
    }

    /// Name of record 0, frame 0. Also the cache key.
    pub fn first_frame_name(&self) -> String {
        self.frame_name(0, 0)
    }

    pub fn frame_name(&self, record: usize, frame: usize) -> String {
        image_name(
            self.archive,
            record,
            frame,
            self.face_record,
            self.variety,
            &self.climate,
            &self.season,
        )
    }
}

/// A successful resolution and the names probed on the way.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    pub identity: AssetIdentity,
    pub probes: Vec<String>,
}

impl Resolution {
    pub fn key(&self) -> String {
        self.identity.first_frame_name()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("no villager variant for {requested} after fallback ({} probe(s))", probes.len())]
pub struct ResolutionMiss {
    pub requested: String,
    pub probes: Vec<String>,
}

/// Run the fallback chain for `identity` against `assets`.
pub fn resolve_variant(
    assets: &dyn AssetProvider,
    identity: &AssetIdentity,
) -> Result<Resolution, ResolutionMiss> {
    let mut current = identity.clone();
    let mut probes = Vec::with_capacity(4);
    let mut probe = |id: &AssetIdentity| {
        let name = id.first_frame_name();
        let found = assets.has_asset(&name);
        probes.push(name);
        found
    };

    let mut found = probe(&current);
    if !found && !current.season.is_empty() {
        current.season.clear();
        found = probe(&current);
    }
    if !found && current.variety != 0 {
        current.variety = 0;
        found = probe(&current);
    }
    if !found && !current.climate.is_empty() {
        current.climate.clear();
        found = probe(&current);
    }

    if found {
        Ok(Resolution {
            identity: current,
            probes,
        })
    } else {
        Err(ResolutionMiss {
            requested: identity.first_frame_name(),
            probes,
        })
    }
}

/// Climate tag for `archive` in the current surroundings.
pub fn climate_variant(archive: u32, world: &WorldContext, config: &VarietyConfig) -> &'static str {
    if !is_redguard_archive(archive) {
        return "";
    }
    if uses_redguard_population(world, config) {
        CLIMATE_SUBTROPICAL
    } else {
        ""
    }
}

/// Guard tag for the current region, if one is configured.
pub fn regional_variant(archive: u32, world: &WorldContext, config: &VarietyConfig) -> Option<String> {
    if !is_guard_archive(archive) {
        return None;
    }
    config.regional_guard_tag(world.region).map(str::to_string)
}

/// Guard tag derived from whether the current climate is arid.
pub fn national_variant(archive: u32, world: &WorldContext, config: &VarietyConfig) -> Option<String> {
    if !is_guard_archive(archive) {
        return None;
    }
    let tag = if config.arid_climates.contains(&world.climate) {
        &config.guard_national_arid
    } else {
        &config.guard_national_default
    };
    tag.clone().filter(|tag| !tag.is_empty())
}

/// Regional tag if any, else national tag, else none.
pub fn guard_variant(archive: u32, world: &WorldContext, config: &VarietyConfig) -> Option<String> {
    regional_variant(archive, world, config).or_else(|| national_variant(archive, world, config))
}

/// First-frame name of a guard archive if its tagged skin exists.
pub fn resolve_guard(assets: &dyn AssetProvider, archive: u32, tag: Option<&str>) -> Option<String> {
    let name = guard_image_name(archive, 0, 0, tag);
    assets.has_asset(&name).then_some(name)
}
