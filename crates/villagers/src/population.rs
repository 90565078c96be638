//! Local population cap tuning.
//!
//! The cap scales with location size and category, drops in storms and is cut
//! to a fifth at night. It is pushed into the host's population simulator on
//! every NPC enable and on every hour tick, so day/night changes apply even
//! when nothing spawns.

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::archive::{NUM_FACE_VARIANTS, NUM_OUTFIT_VARIANTS};
use crate::config::VarietyConfig;
use crate::world::{Gender, Race, WorldContext};

/// Blocks per population chunk.
pub const BLOCKS_PER_CHUNK: u32 = 16;
/// Chunk multiplier bounds.
pub const MIN_CHUNKS: u32 = 1;
pub const MAX_CHUNKS: u32 = 4;
/// Night divides the cap by this.
pub const NIGHT_DIVISOR: u32 = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LocationHandle(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LocationCategory {
    Farm,
    ReligiousOrTavern,
    Village,
    Hamlet,
    City,
}

/// Population per chunk in normal weather and in storms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PerChunk {
    pub normal: u32,
    pub storm: u32,
}

impl PerChunk {
    pub const fn new(normal: u32, storm: u32) -> Self {
        Self { normal, storm }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PopulationTable {
    pub farm: PerChunk,
    pub religious_or_tavern: PerChunk,
    pub village: PerChunk,
    pub hamlet: PerChunk,
    pub city: PerChunk,
}

impl Default for PopulationTable {
    fn default() -> Self {
        Self {
            farm: PerChunk::new(8, 4),
            religious_or_tavern: PerChunk::new(16, 8),
            village: PerChunk::new(40, 16),
            hamlet: PerChunk::new(60, 24),
            city: PerChunk::new(100, 40),
        }
    }
}

impl PopulationTable {
    pub fn per_chunk(&self, category: LocationCategory, storm: bool) -> u32 {
        let entry = match category {
            LocationCategory::Farm => self.farm,
            LocationCategory::ReligiousOrTavern => self.religious_or_tavern,
            LocationCategory::Village => self.village,
            LocationCategory::Hamlet => self.hamlet,
            LocationCategory::City => self.city,
        };
        if storm {
            entry.storm
        } else {
            entry.normal
        }
    }
}

/// The player's current location as seen by the cap controller.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LocationContext {
    pub location: LocationHandle,
    pub category: LocationCategory,
    pub total_blocks: u32,
    pub world: WorldContext,
}

/// The host's population simulator. Only the cap is written.
pub trait PopulationSimulator {
    fn set_population_cap(&mut self, location: LocationHandle, cap: u32);
}

/// An NPC about to be enabled by the population simulator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NpcRecord {
    pub race: Race,
    pub gender: Gender,
    pub outfit: usize,
    pub face_variant: u32,
    pub is_guard: bool,
}

impl NpcRecord {
    pub fn random(race: Race, rng: &mut impl Rng) -> Self {
        let mut npc = Self {
            race,
            gender: Gender::Male,
            outfit: 0,
            face_variant: 0,
            is_guard: false,
        };
        npc.randomise(race, rng);
        npc
    }

    /// Re-roll gender, outfit and face as a member of `race`.
    pub fn randomise(&mut self, race: Race, rng: &mut impl Rng) {
        self.race = race;
        self.gender = if rng.gen_bool(0.5) { Gender::Male } else { Gender::Female };
        self.outfit = rng.gen_range(0..NUM_OUTFIT_VARIANTS);
        self.face_variant = rng.gen_range(0..NUM_FACE_VARIANTS);
    }
}

/// Target cap for a location: `clamp(blocks / 16, 1, 4) * per_chunk`, a fifth of that at night.
pub fn recompute(ctx: &LocationContext, table: &PopulationTable) -> u32 {
    let chunks = (ctx.total_blocks / BLOCKS_PER_CHUNK).clamp(MIN_CHUNKS, MAX_CHUNKS);
    let per_chunk = table.per_chunk(ctx.category, ctx.world.weather.is_storm());
    let cap = chunks * per_chunk;
    if ctx.world.is_night() {
        cap / NIGHT_DIVISOR
    } else {
        cap
    }
}

/// Whether townsfolk here are drawn with the Redguard skins.
pub fn uses_redguard_population(world: &WorldContext, config: &VarietyConfig) -> bool {
    config.subtropical_climates.contains(&world.climate) || config.subtropical_regions.contains(&world.region)
}

/// Event handlers the host wires to its spawn and clock events.
#[derive(Debug, Clone)]
pub struct PopulationCapController {
    config: VarietyConfig,
    last_cap: Option<(LocationHandle, u32)>,
}

impl PopulationCapController {
    pub fn new(config: &VarietyConfig) -> Self {
        Self {
            config: config.clone(),
            last_cap: None,
        }
    }

    pub fn last_cap(&self) -> Option<(LocationHandle, u32)> {
        self.last_cap
    }

    /// Push the cap before the spawn is processed, then swap non-Redguards in hot places.
    pub fn on_spawn(
        &mut self,
        ctx: &LocationContext,
        npc: &mut NpcRecord,
        sim: &mut dyn PopulationSimulator,
        rng: &mut impl Rng,
    ) {
        self.push(ctx, sim);
        if !npc.is_guard && npc.race != Race::Redguard && uses_redguard_population(&ctx.world, &self.config) {
            log::debug!("Re-rolling {:?} NPC as Redguard in region {}", npc.race, ctx.world.region);
            npc.randomise(Race::Redguard, rng);
        }
    }

    pub fn on_hour_tick(&mut self, ctx: &LocationContext, sim: &mut dyn PopulationSimulator) {
        self.push(ctx, sim);
    }

    fn push(&mut self, ctx: &LocationContext, sim: &mut dyn PopulationSimulator) {
        let cap = recompute(ctx, &self.config.population);
        if self.last_cap != Some((ctx.location, cap)) {
            log::info!(
                "Population cap for {:?} ({:?}, {} blocks) set to {}",
                ctx.location,
                ctx.category,
                ctx.total_blocks,
                cap
            );
        }
        sim.set_population_cap(ctx.location, cap);
        self.last_cap = Some((ctx.location, cap));
    }
}
