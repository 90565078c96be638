//! Spawn orchestration: pick the archive for a person, load geometry and the
//! best available appearance, and hand back a ready billboard.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use rand::Rng;
use thiserror::Error;

use crate::archive::{
    face_record, person_archives, ArchiveSource, AtlasLayout, GUARD_ARCHIVES, NUM_FACE_VARIANTS, NUM_OUTFIT_VARIANTS,
};
use crate::assets::AssetProvider;
use crate::billboard::{Appearance, BillboardState};
use crate::cache::{LoadContext, VariantCache};
use crate::config::VarietyConfig;
use crate::geometry::{GeometryCache, RecordGeometry};
use crate::messages::{handle_message, MessageArg, Response};
use crate::names::generate_name_for;
use crate::naming::season_tag;
use crate::population::NpcRecord;
use crate::resolver::{climate_variant, guard_variant, AssetIdentity};
use crate::world::{Gender, Race, WorldContext};

/// Who to draw.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PersonSpec {
    pub race: Race,
    pub gender: Gender,
    pub outfit: usize,
    pub is_guard: bool,
    pub face_variant: u32,
    pub face_record: u32,
}

impl PersonSpec {
    pub fn new(race: Race, gender: Gender, outfit: usize, face_variant: u32) -> Self {
        Self {
            race,
            gender,
            outfit,
            is_guard: false,
            face_variant,
            face_record: face_record(race, gender, outfit, face_variant),
        }
    }

    pub fn guard(race: Race) -> Self {
        Self {
            is_guard: true,
            ..Self::new(race, Gender::Male, 0, 0)
        }
    }
}

impl From<&NpcRecord> for PersonSpec {
    fn from(npc: &NpcRecord) -> Self {
        Self {
            is_guard: npc.is_guard,
            ..Self::new(npc.race, npc.gender, npc.outfit, npc.face_variant)
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SpawnError {
    #[error("outfit {outfit} out of range for {gender:?} {race:?} ({available} archive(s))")]
    OutfitOutOfRange {
        race: Race,
        gender: Gender,
        outfit: usize,
        available: usize,
    },
}

/// Result of warming the caches for one location.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PreloadReport {
    pub requested: usize,
    pub loaded: usize,
}

impl PreloadReport {
    pub fn missing(&self) -> usize {
        self.requested - self.loaded
    }
}

pub struct VarietyEngine {
    config: VarietyConfig,
    assets: Box<dyn AssetProvider>,
    archives: Box<dyn ArchiveSource>,
    variants: VariantCache,
    geometry: GeometryCache,
    /// Packed legacy atlases, one per archive, shared by every billboard drawn from it.
    atlases: Mutex<HashMap<u32, Arc<AtlasLayout>>>,
}

impl VarietyEngine {
    pub fn new(config: VarietyConfig, assets: Box<dyn AssetProvider>, archives: Box<dyn ArchiveSource>) -> Self {
        Self {
            config,
            assets,
            archives,
            variants: VariantCache::new(),
            geometry: GeometryCache::new(),
            atlases: Mutex::new(HashMap::new()),
        }
    }

    pub fn config(&self) -> &VarietyConfig {
        &self.config
    }

    pub fn variant_cache(&self) -> &VariantCache {
        &self.variants
    }

    pub fn geometry_cache(&self) -> &GeometryCache {
        &self.geometry
    }

    /// Archive for a person here. Region overrides replace the race tables.
    pub fn archive_for(&self, spec: &PersonSpec, world: &WorldContext) -> Result<u32, SpawnError> {
        let overrides = self.config.special_cases.region_archives(world.region);
        if spec.is_guard {
            return Ok(overrides.and_then(|o| o.guard).unwrap_or(GUARD_ARCHIVES[0]));
        }
        let table: &[u32] = match overrides {
            Some(o) if !o.for_gender(spec.gender).is_empty() => o.for_gender(spec.gender),
            _ => person_archives(spec.race, spec.gender),
        };
        table.get(spec.outfit).copied().ok_or(SpawnError::OutfitOutOfRange {
            race: spec.race,
            gender: spec.gender,
            outfit: spec.outfit,
            available: table.len(),
        })
    }

    /// Record to show in the talk window for a face.
    pub fn portrait_record(&self, spec: &PersonSpec, world: &WorldContext) -> u32 {
        self.config.special_cases.portrait_record(world.region, spec.face_record)
    }

    fn geometry_for(&self, archive: u32) -> Arc<RecordGeometry> {
        self.geometry
            .get_or_load(archive, self.archives.as_ref(), self.assets.as_ref(), &self.config)
            .unwrap_or_else(|e| {
                log::warn!("{}; billboard will have no size", e);
                Arc::new(RecordGeometry::empty(archive))
            })
    }

    fn atlas_for(&self, archive: u32) -> Option<Arc<AtlasLayout>> {
        let mut atlases = self.atlases.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(atlas) = atlases.get(&archive) {
            return Some(atlas.clone());
        }
        let atlas = self.archives.atlas(archive)?;
        atlases.insert(archive, atlas.clone());
        Some(atlas)
    }

    fn identity(&self, archive: u32, face_record: u32, variety: u32, world: &WorldContext) -> AssetIdentity {
        AssetIdentity::new(
            archive,
            face_record,
            variety,
            climate_variant(archive, world, &self.config),
            season_tag(world.season()),
        )
    }

    /// Build a billboard for `spec` with a random variety.
    pub fn set_person(
        &self,
        spec: &PersonSpec,
        world: &WorldContext,
        rng: &mut impl Rng,
    ) -> Result<BillboardState, SpawnError> {
        let archive = self.archive_for(spec, world)?;
        let geometry = self.geometry_for(archive);
        let variety = rng.gen_range(0..self.config.num_variants.max(1));
        let appearance = self.appearance(archive, spec, variety, world, &geometry);
        log::debug!(
            "Villager {:03}.{}.{} in region {} uses the {} layer",
            archive,
            spec.face_record,
            variety,
            world.region,
            appearance.layer()
        );
        Ok(BillboardState::new(appearance, geometry, spec.is_guard))
    }

    /// Variant, then replacement, then atlas, then nothing.
    fn appearance(
        &self,
        archive: u32,
        spec: &PersonSpec,
        variety: u32,
        world: &WorldContext,
        geometry: &RecordGeometry,
    ) -> Appearance {
        let ctx = LoadContext {
            assets: self.assets.as_ref(),
            archives: self.archives.as_ref(),
            geometry,
        };

        let variant = if spec.is_guard {
            guard_variant(archive, world, &self.config)
                .map(|tag| self.variants.get_or_load_guard(archive, Some(tag.as_str()), &ctx))
        } else {
            let identity = self.identity(archive, spec.face_record, variety, world);
            Some(self.variants.get_or_load(&identity, &ctx))
        };
        match variant {
            Some(Ok(set)) => return Appearance::Variant(set),
            Some(Err(e)) => log::debug!("{}", e),
            None => {}
        }

        match self.variants.get_or_load_replacement(archive, &ctx) {
            Ok(set) => return Appearance::Replacement(set),
            Err(e) => log::debug!("{}", e),
        }

        match self.atlas_for(archive) {
            Some(atlas) => Appearance::Atlas(atlas),
            None => {
                log::warn!("No textures at all for archive {:03}", archive);
                Appearance::Untextured
            }
        }
    }

    /// Warm the caches for every gender, outfit, face and variety of `race`, plus the guard.
    pub fn preload(&self, race: Race, world: &WorldContext) -> PreloadReport {
        let mut report = PreloadReport::default();
        for gender in Gender::ALL {
            for outfit in 0..NUM_OUTFIT_VARIANTS {
                for face in 0..NUM_FACE_VARIANTS {
                    let spec = PersonSpec::new(race, gender, outfit, face);
                    let Ok(archive) = self.archive_for(&spec, world) else {
                        continue;
                    };
                    let geometry = self.geometry_for(archive);
                    let ctx = LoadContext {
                        assets: self.assets.as_ref(),
                        archives: self.archives.as_ref(),
                        geometry: &geometry,
                    };
                    for variety in 0..self.config.num_variants {
                        report.requested += 1;
                        let identity = self.identity(archive, spec.face_record, variety, world);
                        if self.variants.get_or_load(&identity, &ctx).is_ok() {
                            report.loaded += 1;
                        }
                    }
                }
            }
        }

        let guard = PersonSpec::guard(race);
        if let Ok(archive) = self.archive_for(&guard, world) {
            report.requested += 1;
            let geometry = self.geometry_for(archive);
            let appearance = self.appearance(archive, &guard, 0, world, &geometry);
            if appearance.texture_set().is_some() {
                report.loaded += 1;
            }
        }

        log::info!(
            "Preloaded {}/{} {:?} variant(s) for region {}",
            report.loaded,
            report.requested,
            race,
            world.region
        );
        report
    }

    pub fn handle_message(&self, message: &str, data: &MessageArg, world: &WorldContext) -> Response {
        handle_message(message, data, world, &self.config)
    }

    /// Orc name in Orc regions; `None` leaves naming to the host.
    pub fn generate_name(&self, world: &WorldContext, gender: Gender, rng: &mut impl Rng) -> Option<String> {
        generate_name_for(world.region, gender, &self.config, rng)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::archive::{ArchiveEntry, ArchiveManifest, RawRecord};
    use crate::assets::InMemoryAssets;
    use crate::naming::replacement_name;
    use crate::world::{Climate, REGION_ORSINIUM};
    use engine_core::WorldClock;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn manifest(archives: &[u32]) -> ArchiveManifest {
        let record = RawRecord { width: 32, height: 64, scale: [0, 0], frames: 2 };
        ArchiveManifest::new(
            archives
                .iter()
                .map(|&archive| ArchiveEntry { archive, records: vec![record; 16] })
                .collect(),
        )
    }

    fn summer_in(region: u32, climate: Climate) -> WorldContext {
        WorldContext::new(region, climate, WorldClock::at(6, 1, 12))
    }

    fn engine(assets: InMemoryAssets, archives: &[u32]) -> VarietyEngine {
        VarietyEngine::new(VarietyConfig::default(), Box::new(assets), Box::new(manifest(archives)))
    }

    #[test]
    fn custom_skin_is_preferred() {
        let spec = PersonSpec::new(Race::Redguard, Gender::Female, 1, 14);
        assert_eq!(spec.face_record, 158);
        let assets = InMemoryAssets::new()
            .with("396.158.0_0-0", 32, 64)
            .with("396_0-0", 32, 64);
        let engine = engine(assets, &[396]);
        let mut rng = StdRng::seed_from_u64(1);
        let state = engine
            .set_person(&spec, &summer_in(17, Climate::Woodlands), &mut rng)
            .expect("spawn");
        assert!(matches!(state.appearance(), Appearance::Variant(set) if set.key == "396.158.0_0-0"));
        assert_eq!(state.size(), glam::Vec2::new(32.0, 64.0) * crate::geometry::GLOBAL_SCALE);
    }

    #[test]
    fn layers_fall_through_to_replacement_then_atlas() {
        let mut rng = StdRng::seed_from_u64(2);
        let world = summer_in(17, Climate::Woodlands);
        let spec = PersonSpec::new(Race::Breton, Gender::Male, 0, 3);

        let with_replacement = engine(InMemoryAssets::new().with(replacement_name(385, 0, 0), 32, 64), &[385]);
        let state = with_replacement.set_person(&spec, &world, &mut rng).expect("spawn");
        assert_eq!(state.appearance().layer(), "replacement");

        let bare = engine(InMemoryAssets::new(), &[385]);
        let state = bare.set_person(&spec, &world, &mut rng).expect("spawn");
        assert_eq!(state.appearance().layer(), "atlas");

        let nothing = engine(InMemoryAssets::new(), &[]);
        let state = nothing.set_person(&spec, &world, &mut rng).expect("spawn");
        assert_eq!(state.appearance().layer(), "untextured");
        assert_eq!(state.size(), glam::Vec2::ZERO);
    }

    #[test]
    fn atlas_fallbacks_share_one_layout() {
        let engine = engine(InMemoryAssets::new(), &[385]);
        let world = summer_in(17, Climate::Woodlands);
        let spec = PersonSpec::new(Race::Breton, Gender::Male, 0, 3);
        let mut rng = StdRng::seed_from_u64(6);
        let first = engine.set_person(&spec, &world, &mut rng).expect("spawn");
        let second = engine.set_person(&spec, &world, &mut rng).expect("spawn");
        match (first.appearance(), second.appearance()) {
            (Appearance::Atlas(a), Appearance::Atlas(b)) => assert!(Arc::ptr_eq(a, b)),
            other => panic!("expected atlas layers, got {other:?}"),
        }
    }

    #[test]
    fn portraits_follow_configured_remaps() {
        use crate::config::{PortraitRange, PortraitRemap};

        let mut config = VarietyConfig::default();
        config.special_cases.portrait_remaps = vec![PortraitRemap {
            region: 26,
            ranges: vec![PortraitRange { first: 192, last: 215, target: 500 }],
        }];
        let engine = VarietyEngine::new(config, Box::new(InMemoryAssets::new()), Box::new(manifest(&[])));
        let spec = PersonSpec::new(Race::Breton, Gender::Male, 0, 3);
        assert_eq!(spec.face_record, 195);
        assert_eq!(engine.portrait_record(&spec, &summer_in(26, Climate::Mountain)), 503);
        assert_eq!(engine.portrait_record(&spec, &summer_in(17, Climate::Woodlands)), 195);
    }

    #[test]
    fn guards_use_their_regional_tag() {
        let assets = InMemoryAssets::new().with("399.Orsinium_0-0", 32, 64);
        let engine = engine(assets, &[399]);
        let mut rng = StdRng::seed_from_u64(3);
        let state = engine
            .set_person(&PersonSpec::guard(Race::Breton), &summer_in(REGION_ORSINIUM, Climate::Mountain), &mut rng)
            .expect("spawn");
        assert!(state.is_guard());
        assert!(matches!(state.appearance(), Appearance::Variant(set) if set.key == "399.Orsinium_0-0"));
    }

    #[test]
    fn region_overrides_replace_race_tables() {
        let engine = engine(InMemoryAssets::new(), &[]);
        let spec = PersonSpec::new(Race::Breton, Gender::Female, 2, 0);
        let orsinium = summer_in(REGION_ORSINIUM, Climate::Mountain);
        assert_eq!(engine.archive_for(&spec, &orsinium), Ok(10059));
        assert_eq!(engine.archive_for(&spec, &summer_in(17, Climate::Woodlands)), Ok(455));
        assert_eq!(engine.archive_for(&PersonSpec::guard(Race::Breton), &orsinium), Ok(399));

        let bad = PersonSpec { outfit: 9, ..spec };
        assert!(matches!(
            engine.archive_for(&bad, &orsinium),
            Err(SpawnError::OutfitOutOfRange { outfit: 9, available: 4, .. })
        ));
    }

    #[test]
    fn preload_then_spawn_hits_the_cache() {
        let assets = InMemoryAssets::new().with("396.158.0_0-0", 32, 64);
        let engine = engine(assets, &[395, 396, 397, 398, 381, 382, 383, 384, 399]);
        let world = summer_in(17, Climate::Woodlands);

        let report = engine.preload(Race::Redguard, &world);
        assert_eq!(report.requested, 2 * 4 * 24 * 2 + 1);
        // Both varieties of face 158 resolve to the same set.
        assert_eq!(report.loaded, 2);
        let builds = engine.variant_cache().stats().builds;
        assert_eq!(builds, 1);

        let mut rng = StdRng::seed_from_u64(4);
        let spec = PersonSpec::new(Race::Redguard, Gender::Female, 1, 14);
        engine.set_person(&spec, &world, &mut rng).expect("spawn");
        assert_eq!(engine.variant_cache().stats().builds, builds);
    }

    #[test]
    fn messages_and_names_go_through_the_engine() {
        let engine = engine(InMemoryAssets::new(), &[]);
        let world = summer_in(REGION_ORSINIUM, Climate::Mountain);
        let response = engine.handle_message("getSeasonStr", &MessageArg::None, &world);
        assert_eq!(response.payload, MessageArg::from("m"));

        let mut rng = StdRng::seed_from_u64(5);
        let name = engine.generate_name(&world, Gender::Female, &mut rng).expect("orc name");
        assert!(name.contains(" gra-"));
        assert!(engine
            .generate_name(&summer_in(17, Climate::Woodlands), Gender::Female, &mut rng)
            .is_none());
    }
}
