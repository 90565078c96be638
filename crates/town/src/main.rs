//! villager-town: a headless town that spawns villagers through the variety engine
//! and walks them around for a number of in-game hours.

mod bus;
mod config;
mod town;

use anyhow::{Context, Result};
use glam::Vec3;
use villagers::{
    person_archives, ArchiveEntry, ArchiveManifest, ArchiveSource, AssetProvider, DirectoryAssets, Gender,
    InMemoryAssets, MessageArg, Race, RawRecord, VarietyConfig, VarietyEngine, GUARD_ARCHIVES,
};

use config::HostConfig;
use town::Town;

const RACES: [Race; 3] = [Race::Breton, Race::Redguard, Race::Nord];

/// Stand-in record used by the built-in manifest: 16 records, 4 frames each.
const DEFAULT_RECORD: RawRecord = RawRecord {
    width: 32,
    height: 64,
    scale: [0, 0],
    frames: 4,
};

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let host = HostConfig::load();
    let variety = match &host.variety_config {
        Some(path) => VarietyConfig::load_or_default(path),
        None => VarietyConfig::load(),
    };
    log::info!(
        "Region {} ({:?}, {:?}, {} blocks), {} hour(s) at {}x",
        host.region,
        host.climate,
        host.category,
        host.total_blocks,
        host.hours,
        host.time_scale
    );

    let assets: Box<dyn AssetProvider> = match &host.asset_dir {
        Some(dir) => Box::new(
            DirectoryAssets::scan(dir).with_context(|| format!("failed to scan texture pack {:?}", dir))?,
        ),
        None => {
            log::info!("No texture pack configured, drawing from archive atlases only");
            Box::new(InMemoryAssets::new())
        }
    };
    let archives: Box<dyn ArchiveSource> = match &host.manifest {
        Some(path) => Box::new(
            ArchiveManifest::load_from(path).with_context(|| format!("failed to load manifest {:?}", path))?,
        ),
        None => Box::new(builtin_manifest(&variety)),
    };

    let engine = VarietyEngine::new(variety, assets, archives);
    let mut town = Town::new(engine, &host);
    town.set_camera(Vec3::new(0.0, 1.8, 0.0));
    town.enter();
    if let Some(preload) = town.last_preload() {
        if preload.missing() > 0 {
            log::info!("{} of {} variant(s) fell back to plainer layers", preload.missing(), preload.requested);
        }
    }
    for villager in town.villagers().iter().take(5) {
        log::info!(
            "Met {} ({:?} {:?}, portrait {})",
            villager.name,
            villager.spec.race,
            villager.spec.gender,
            town.engine().portrait_record(&villager.spec, town.world_context())
        );
    }

    town.send_message("getSeasonStr", MessageArg::None);
    for response in town.take_responses() {
        log::info!("{}: {:?}", response.name, response.payload);
    }

    let step = host.step.max(1e-3);
    let steps = (host.hours as f64 * 3600.0 / host.time_scale.max(1) as f64 / f64::from(step)).ceil() as u64;
    let mut last_hour = town.world_context().clock.hour();
    for _ in 0..steps {
        town.step(step);
        let hour = town.world_context().clock.hour();
        if hour != last_hour {
            let stats = town.stats();
            log::info!(
                "{:02}:00  {} villager(s), {} guard(s), cap {}",
                hour,
                stats.villagers,
                stats.guards,
                stats.cap
            );
            last_hour = hour;
        }
    }

    let stats = town.stats();
    let cache = town.engine().variant_cache().stats();
    log::info!(
        "Done after {} hour(s): {} spawned, {} sent home, {} frame update(s) ({} UV byte(s)), {} unheard event(s)",
        stats.hours,
        stats.spawned,
        stats.despawned,
        stats.frame_updates,
        stats.uv_bytes,
        town.bus_mut().dropped()
    );
    log::info!(
        "Variant cache: {} set(s), {} build(s), {} hit(s)",
        cache.sets,
        cache.builds,
        cache.hits
    );
    Ok(())
}

/// Every archive the engine can ask for, with placeholder records.
fn builtin_manifest(config: &VarietyConfig) -> ArchiveManifest {
    let mut ids: Vec<u32> = RACES
        .iter()
        .flat_map(|&race| Gender::ALL.iter().flat_map(move |&gender| person_archives(race, gender).iter().copied()))
        .chain(GUARD_ARCHIVES)
        .collect();
    for region in &config.special_cases.region_archives {
        ids.extend(region.male.iter().chain(&region.female).copied());
        ids.extend(region.guard);
    }
    ids.sort_unstable();
    ids.dedup();

    ArchiveManifest::new(
        ids.into_iter()
            .map(|archive| ArchiveEntry {
                archive,
                records: vec![DEFAULT_RECORD; 16],
            })
            .collect(),
    )
}
