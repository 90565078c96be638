//! Process-lifetime cache of decoded texture sets.
//!
//! A set holds every frame of every record of one archive for one resolved
//! identity, laid out like the archive itself (`albedo[record][frame]`). Sets
//! are keyed by their resolved first-frame name and are never replaced or
//! evicted. The fill-or-fetch runs under a lock, so each key is built at most
//! once even when several spawns ask for it at the same time.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use thiserror::Error;

use crate::archive::ArchiveSource;
use crate::assets::AssetProvider;
use crate::geometry::RecordGeometry;
use crate::naming::{emission_name, guard_image_name, image_name_any_face, replacement_name};
use crate::resolver::{resolve_variant, AssetIdentity, ResolutionMiss};
use crate::texture::{Texture, TextureHandle};

/// Decoded frames for one resolved identity.
#[derive(Debug)]
pub struct TextureSet {
    pub key: String,
    pub albedo: Vec<Vec<TextureHandle>>,
    /// Same shape as `albedo` when the identity ships emission maps.
    pub emission: Option<Vec<Vec<TextureHandle>>>,
    /// Built from texture-pack skins rather than the engine's plain replacements.
    pub custom: bool,
}

impl TextureSet {
    pub fn record_count(&self) -> usize {
        self.albedo.len()
    }

    pub fn frame_count(&self, record: usize) -> Option<usize> {
        self.albedo.get(record).map(Vec::len)
    }

    pub fn albedo(&self, record: usize, frame: usize) -> Option<&TextureHandle> {
        self.albedo.get(record)?.get(frame)
    }

    pub fn emission(&self, record: usize, frame: usize) -> Option<&TextureHandle> {
        self.emission.as_ref()?.get(record)?.get(frame)
    }

    pub fn is_emissive(&self) -> bool {
        self.emission.is_some()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LoadError {
    #[error(transparent)]
    Unresolved(#[from] ResolutionMiss),
    #[error("no custom first frame {0}")]
    Missing(String),
    #[error("archive {archive:03} has no frames for record 0 (key {key})")]
    NoFrames { archive: u32, key: String },
}

/// What the cache needs to build a set.
#[derive(Clone, Copy)]
pub struct LoadContext<'a> {
    pub assets: &'a dyn AssetProvider,
    pub archives: &'a dyn ArchiveSource,
    pub geometry: &'a RecordGeometry,
}

/// How the frames of a set are named.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FrameNaming {
    Villager(AssetIdentity),
    Guard { archive: u32, tag: Option<String> },
    Replacement { archive: u32 },
}

impl FrameNaming {
    pub fn archive(&self) -> u32 {
        match self {
            FrameNaming::Villager(identity) => identity.archive,
            FrameNaming::Guard { archive, .. } | FrameNaming::Replacement { archive } => *archive,
        }
    }

    fn primary(&self, record: usize, frame: usize) -> String {
        match self {
            FrameNaming::Villager(identity) => identity.frame_name(record, frame),
            FrameNaming::Guard { archive, tag } => guard_image_name(*archive, record, frame, tag.as_deref()),
            FrameNaming::Replacement { archive } => replacement_name(*archive, record, frame),
        }
    }

    /// Names tried in order for one frame before the archive's own frame.
    fn candidates(&self, record: usize, frame: usize) -> Vec<String> {
        let mut names = vec![self.primary(record, frame)];
        if let FrameNaming::Villager(id) = self {
            names.push(image_name_any_face(
                id.archive,
                record,
                frame,
                id.variety,
                &id.climate,
                &id.season,
            ));
        }
        names
    }

    pub fn first_frame(&self) -> String {
        self.primary(0, 0)
    }

    fn custom(&self) -> bool {
        !matches!(self, FrameNaming::Replacement { .. })
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub builds: u64,
    pub sets: usize,
}

#[derive(Debug, Default)]
struct CacheState {
    sets: HashMap<String, Arc<TextureSet>>,
    /// Requested first-frame names that resolved to a different key.
    aliases: HashMap<String, String>,
    hits: u64,
    builds: u64,
}

impl CacheState {
    fn lookup(&self, requested: &str) -> Option<Arc<TextureSet>> {
        let key = self.aliases.get(requested).map(String::as_str).unwrap_or(requested);
        self.sets.get(key).cloned()
    }
}

#[derive(Debug, Default)]
pub struct VariantCache {
    state: Mutex<CacheState>,
}

impl VariantCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Texture set for a villager identity, resolving the fallback chain on first use.
    pub fn get_or_load(
        &self,
        identity: &AssetIdentity,
        ctx: &LoadContext<'_>,
    ) -> Result<Arc<TextureSet>, LoadError> {
        self.get_or_build(identity.first_frame_name(), ctx, || {
            let resolution = resolve_variant(ctx.assets, identity)?;
            if resolution.identity != *identity {
                log::debug!(
                    "Villager variant {} resolved to {}",
                    identity.first_frame_name(),
                    resolution.key()
                );
            }
            Ok(FrameNaming::Villager(resolution.identity))
        })
    }

    /// Texture set for a guard archive with an optional regional or national tag.
    pub fn get_or_load_guard(
        &self,
        archive: u32,
        tag: Option<&str>,
        ctx: &LoadContext<'_>,
    ) -> Result<Arc<TextureSet>, LoadError> {
        let naming = FrameNaming::Guard {
            archive,
            tag: tag.filter(|t| !t.is_empty()).map(str::to_string),
        };
        self.get_or_build(naming.first_frame(), ctx, || require_first_frame(naming, ctx))
    }

    /// Texture set from the engine's plain replacement names.
    pub fn get_or_load_replacement(
        &self,
        archive: u32,
        ctx: &LoadContext<'_>,
    ) -> Result<Arc<TextureSet>, LoadError> {
        let naming = FrameNaming::Replacement { archive };
        self.get_or_build(naming.first_frame(), ctx, || require_first_frame(naming, ctx))
    }

    fn get_or_build(
        &self,
        requested: String,
        ctx: &LoadContext<'_>,
        resolve: impl FnOnce() -> Result<FrameNaming, LoadError>,
    ) -> Result<Arc<TextureSet>, LoadError> {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(set) = state.lookup(&requested) {
            state.hits += 1;
            return Ok(set);
        }

        let naming = resolve()?;
        let key = naming.first_frame();
        if let Some(set) = state.sets.get(&key).cloned() {
            state.hits += 1;
            state.aliases.insert(requested, key);
            return Ok(set);
        }

        let set = Arc::new(build_set(&naming, ctx)?);
        state.builds += 1;
        state.sets.insert(key.clone(), set.clone());
        if requested != key {
            state.aliases.insert(requested, key);
        }
        Ok(set)
    }

    pub fn contains(&self, key: &str) -> bool {
        let state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        state.lookup(key).is_some()
    }

    pub fn stats(&self) -> CacheStats {
        let state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        CacheStats {
            hits: state.hits,
            builds: state.builds,
            sets: state.sets.len(),
        }
    }
}

fn require_first_frame(naming: FrameNaming, ctx: &LoadContext<'_>) -> Result<FrameNaming, LoadError> {
    let first = naming.first_frame();
    if ctx.assets.has_asset(&first) {
        Ok(naming)
    } else {
        Err(LoadError::Missing(first))
    }
}

/// Assemble every frame: custom names first, then the archive's own frame.
fn build_set(naming: &FrameNaming, ctx: &LoadContext<'_>) -> Result<TextureSet, LoadError> {
    let archive = naming.archive();
    let key = naming.first_frame();
    // Emission maps must exist for the first frame to be used at all.
    let emissive = ctx.assets.has_asset(&emission_name(&key));

    let mut albedo = Vec::with_capacity(ctx.geometry.record_count());
    let mut emission = emissive.then(|| Vec::with_capacity(ctx.geometry.record_count()));

    for (record, info) in ctx.geometry.records.iter().enumerate() {
        let mut frames = Vec::with_capacity(info.frame_count);
        let mut emission_frames = Vec::new();
        for frame in 0..info.frame_count {
            let texture = naming
                .candidates(record, frame)
                .iter()
                .find_map(|name| ctx.assets.get_asset(name))
                .or_else(|| ctx.archives.vanilla_frame(archive, record, frame))
                .unwrap_or_else(|| {
                    log::warn!("No texture for {:03} record {} frame {} ({})", archive, record, frame, key);
                    Texture::missing(naming.primary(record, frame))
                });
            if emissive {
                let glow = ctx
                    .assets
                    .get_asset(&emission_name(&naming.primary(record, frame)))
                    .unwrap_or_else(|| texture.clone());
                emission_frames.push(glow);
            }
            frames.push(texture);
        }
        albedo.push(frames);
        if let Some(emission) = emission.as_mut() {
            emission.push(emission_frames);
        }
    }

    if albedo.first().map_or(true, Vec::is_empty) {
        log::error!("Archive {:03} yielded no frames for record 0 ({})", archive, key);
        return Err(LoadError::NoFrames { archive, key });
    }

    log::info!(
        "Loaded {} record(s) for {}{}",
        albedo.len(),
        key,
        if emissive { " with emission" } else { "" }
    );
    Ok(TextureSet {
        key,
        albedo,
        emission,
        custom: naming.custom(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::archive::{ArchiveEntry, ArchiveManifest, RawRecord};
    use crate::assets::InMemoryAssets;
    use crate::config::VarietyConfig;
    use crate::geometry::load_from_archive;
    use crate::texture::TextureOrigin;

    fn manifest() -> ArchiveManifest {
        let record = RawRecord { width: 30, height: 70, scale: [0, 0], frames: 2 };
        ArchiveManifest::new(vec![
            ArchiveEntry { archive: 396, records: vec![record; 3] },
            ArchiveEntry { archive: 399, records: vec![record; 2] },
        ])
    }

    fn geometry(archive: u32, manifest: &ArchiveManifest) -> RecordGeometry {
        load_from_archive(archive, manifest, &VarietyConfig::default()).expect("geometry")
    }

    #[test]
    fn identities_resolving_to_one_key_share_a_set() {
        let manifest = manifest();
        let geometry = geometry(396, &manifest);
        let assets = InMemoryAssets::new()
            .with("396.158.0_0-0", 30, 70)
            .with("396.158.0_1-1", 30, 70);
        let ctx = LoadContext { assets: &assets, archives: &manifest, geometry: &geometry };
        let cache = VariantCache::new();

        let winter = cache.get_or_load(&AssetIdentity::new(396, 158, 1, "", "w"), &ctx).expect("load");
        let fetches_after_build = assets.fetch_count();
        let summer = cache.get_or_load(&AssetIdentity::new(396, 158, 0, "", "m"), &ctx).expect("load");
        let again = cache.get_or_load(&AssetIdentity::new(396, 158, 1, "", "w"), &ctx).expect("load");

        assert!(Arc::ptr_eq(&winter, &summer));
        assert!(Arc::ptr_eq(&winter, &again));
        assert_eq!(winter.key, "396.158.0_0-0");
        assert_eq!(assets.fetch_count(), fetches_after_build);
        assert_eq!(cache.stats(), CacheStats { hits: 2, builds: 1, sets: 1 });
        assert!(cache.contains("396.158.1w_0-0"));
    }

    #[test]
    fn frames_fall_back_to_any_face_then_vanilla() {
        let manifest = manifest();
        let geometry = geometry(396, &manifest);
        let assets = InMemoryAssets::new()
            .with("396.158.1_0-0", 30, 70)
            .with("396.X.1_0-1", 31, 70);
        let ctx = LoadContext { assets: &assets, archives: &manifest, geometry: &geometry };
        let set = VariantCache::new()
            .get_or_load(&AssetIdentity::new(396, 158, 1, "", ""), &ctx)
            .expect("load");

        assert_eq!(set.record_count(), 3);
        assert_eq!(set.frame_count(2), Some(2));
        assert_eq!(set.albedo(0, 0).map(|t| t.name.as_str()), Some("396.158.1_0-0"));
        assert_eq!(set.albedo(0, 1).map(|t| t.width), Some(31));
        assert_eq!(set.albedo(2, 1).map(|t| t.origin), Some(TextureOrigin::Vanilla));
        assert!(set.custom);
        assert!(!set.is_emissive());
    }

    #[test]
    fn emission_needs_first_frame_and_defaults_to_albedo() {
        let manifest = manifest();
        let geometry = geometry(396, &manifest);
        let assets = InMemoryAssets::new()
            .with("396.158.1_0-0", 30, 70)
            .with("396.158.1_0-0_Emission", 30, 70)
            .with("396.158.1_1-0_Emission", 30, 70);
        let ctx = LoadContext { assets: &assets, archives: &manifest, geometry: &geometry };
        let set = VariantCache::new()
            .get_or_load(&AssetIdentity::new(396, 158, 1, "", ""), &ctx)
            .expect("load");

        assert!(set.is_emissive());
        let emission = set.emission.as_ref().expect("emission");
        assert_eq!(emission.len(), set.albedo.len());
        assert_eq!(set.emission(1, 0).map(|t| t.name.as_str()), Some("396.158.1_1-0_Emission"));
        let fallback = set.emission(2, 1).expect("frame");
        assert!(Arc::ptr_eq(fallback, set.albedo(2, 1).expect("frame")));
    }

    #[test]
    fn misses_are_not_cached() {
        let manifest = manifest();
        let geometry = geometry(396, &manifest);
        let assets = InMemoryAssets::new();
        let ctx = LoadContext { assets: &assets, archives: &manifest, geometry: &geometry };
        let cache = VariantCache::new();
        let err = cache
            .get_or_load(&AssetIdentity::new(396, 158, 1, "", ""), &ctx)
            .unwrap_err();
        assert!(matches!(err, LoadError::Unresolved(_)));
        assert_eq!(cache.stats().sets, 0);

        let assets = InMemoryAssets::new().with("396.158.0_0-0", 30, 70);
        let ctx = LoadContext { assets: &assets, ..ctx };
        assert!(cache.get_or_load(&AssetIdentity::new(396, 158, 1, "", ""), &ctx).is_ok());
    }

    #[test]
    fn empty_geometry_fails_without_caching() {
        let manifest = manifest();
        let geometry = RecordGeometry::empty(396);
        let assets = InMemoryAssets::new().with("396.158.0_0-0", 30, 70);
        let ctx = LoadContext { assets: &assets, archives: &manifest, geometry: &geometry };
        let cache = VariantCache::new();
        let err = cache
            .get_or_load(&AssetIdentity::new(396, 158, 0, "", ""), &ctx)
            .unwrap_err();
        assert!(matches!(err, LoadError::NoFrames { archive: 396, .. }));
        assert_eq!(cache.stats().sets, 0);
    }

    #[test]
    fn guard_and_replacement_sets_use_their_own_names() {
        let manifest = manifest();
        let geometry = geometry(399, &manifest);
        let assets = InMemoryAssets::new()
            .with("399.Hammerfell_0-0", 30, 70)
            .with("399_0-0", 30, 70);
        let ctx = LoadContext { assets: &assets, archives: &manifest, geometry: &geometry };
        let cache = VariantCache::new();

        let guard = cache.get_or_load_guard(399, Some("Hammerfell"), &ctx).expect("guard");
        assert_eq!(guard.key, "399.Hammerfell_0-0");
        assert!(guard.custom);
        let plain = cache.get_or_load_replacement(399, &ctx).expect("replacement");
        assert_eq!(plain.key, "399_0-0");
        assert!(!plain.custom);
        assert!(matches!(
            cache.get_or_load_guard(399, Some("Orsinium"), &ctx),
            Err(LoadError::Missing(name)) if name == "399.Orsinium_0-0"
        ));
        assert_eq!(cache.stats().builds, 2);
    }

    #[test]
    fn concurrent_requests_build_once() {
        let manifest = manifest();
        let geometry = geometry(396, &manifest);
        let assets = InMemoryAssets::new().with("396.158.0_0-0", 30, 70);
        let cache = VariantCache::new();
        std::thread::scope(|scope| {
            for _ in 0..8 {
                scope.spawn(|| {
                    let ctx = LoadContext { assets: &assets, archives: &manifest, geometry: &geometry };
                    cache
                        .get_or_load(&AssetIdentity::new(396, 158, 1, "", "f"), &ctx)
                        .expect("load");
                });
            }
        });
        let stats = cache.stats();
        assert_eq!(stats.builds, 1);
        assert_eq!(stats.hits, 7);
    }
}
