//! Per-archive record sizes and frame counts.
//!
//! Geometry is cached apart from texture sets: it is needed whether or not a
//! texture set hit occurs, and for custom archives it may come from the
//! imported textures rather than the archive itself.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use glam::Vec2;
use thiserror::Error;

use crate::archive::{ArchiveError, ArchiveSource, RawRecord};
use crate::assets::AssetProvider;
use crate::config::VarietyConfig;
use crate::naming::{image_name_any_face, replacement_name};

/// World units per archive pixel.
pub const GLOBAL_SCALE: f32 = 0.025;
/// Archive scale values are in 1/256ths.
pub const SCALE_DIVISOR: f32 = 256.0;
/// Upper bound on records probed for archives without metadata.
pub const MAX_DISCOVERED_RECORDS: usize = 64;
/// Upper bound on frames probed per record.
pub const MAX_DISCOVERED_FRAMES: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RecordInfo {
    /// Billboard size in world units.
    pub size: Vec2,
    pub frame_count: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GeometrySource {
    /// Read from the archive metadata.
    Archive,
    /// Probed from imported textures.
    Discovered,
    /// Nothing could be found.
    Empty,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RecordGeometry {
    pub archive: u32,
    pub records: Vec<RecordInfo>,
    pub source: GeometrySource,
}

impl RecordGeometry {
    pub fn empty(archive: u32) -> Self {
        Self {
            archive,
            records: Vec::new(),
            source: GeometrySource::Empty,
        }
    }

    pub fn record_count(&self) -> usize {
        self.records.len()
    }

    pub fn frame_count(&self, record: usize) -> Option<usize> {
        self.records.get(record).map(|r| r.frame_count)
    }

    pub fn size(&self, record: usize) -> Option<Vec2> {
        self.records.get(record).map(|r| r.size)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GeometryError {
    #[error("archive {archive:03} metadata unreadable ({cause}) and no imported records found")]
    NoRecords { archive: u32, cause: ArchiveError },
}

/// Final billboard size for a raw record: pixel size plus archive scale, then the
/// configured override, then world scale.
pub fn scaled_size(archive: u32, record: usize, raw: &RawRecord, config: &VarietyConfig) -> Vec2 {
    let x_change = (raw.width as f32 * (raw.scale[0] as f32 / SCALE_DIVISOR)) as i32;
    let y_change = (raw.height as f32 * (raw.scale[1] as f32 / SCALE_DIVISOR)) as i32;
    let size = Vec2::new(
        (raw.width as i32 + x_change) as f32,
        (raw.height as i32 + y_change) as f32,
    );
    apply_override(archive, record, size, config) * GLOBAL_SCALE
}

fn apply_override(archive: u32, record: usize, size: Vec2, config: &VarietyConfig) -> Vec2 {
    match config.scale_override(archive, record) {
        Some([sx, sy]) => size * Vec2::new(sx, sy),
        None => size,
    }
}

/// Read geometry from the archive metadata.
pub fn load_from_archive(
    archive: u32,
    source: &dyn ArchiveSource,
    config: &VarietyConfig,
) -> Result<RecordGeometry, ArchiveError> {
    let count = source.record_count(archive)?;
    let records = (0..count)
        .map(|record| {
            let raw = source.record(archive, record)?;
            Ok(RecordInfo {
                size: scaled_size(archive, record, &raw, config),
                frame_count: raw.frames,
            })
        })
        .collect::<Result<Vec<_>, ArchiveError>>()?;
    Ok(RecordGeometry {
        archive,
        records,
        source: GeometrySource::Archive,
    })
}

/// Probe imported textures record by record until a record yields no frames.
pub fn discover(archive: u32, assets: &dyn AssetProvider, config: &VarietyConfig) -> RecordGeometry {
    let probe = |record: usize, frame: usize| -> Option<String> {
        [
            replacement_name(archive, record, frame),
            image_name_any_face(archive, record, frame, 0, "", ""),
        ]
        .into_iter()
        .find(|name| assets.has_asset(name))
    };

    let mut records = Vec::new();
    for record in 0..MAX_DISCOVERED_RECORDS {
        let Some(first) = probe(record, 0) else {
            break;
        };
        let frame_count = 1 + (1..MAX_DISCOVERED_FRAMES)
            .take_while(|&frame| probe(record, frame).is_some())
            .count();
        let natural = assets
            .get_asset(&first)
            .map(|t| Vec2::new(t.width as f32, t.height as f32))
            .unwrap_or(Vec2::ZERO);
        records.push(RecordInfo {
            size: apply_override(archive, record, natural, config) * GLOBAL_SCALE,
            frame_count,
        });
    }

    let source = if records.is_empty() {
        GeometrySource::Empty
    } else {
        GeometrySource::Discovered
    };
    RecordGeometry {
        archive,
        records,
        source,
    }
}

/// Process-lifetime geometry cache keyed by archive.
#[derive(Debug, Default)]
pub struct GeometryCache {
    entries: Mutex<HashMap<u32, Arc<RecordGeometry>>>,
}

impl GeometryCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cached geometry for `archive`, loading from the archive or by discovery on first use.
    /// Failures are not cached.
    pub fn get_or_load(
        &self,
        archive: u32,
        source: &dyn ArchiveSource,
        assets: &dyn AssetProvider,
        config: &VarietyConfig,
    ) -> Result<Arc<RecordGeometry>, GeometryError> {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(geometry) = entries.get(&archive) {
            return Ok(geometry.clone());
        }

        let geometry = match load_from_archive(archive, source, config) {
            Ok(geometry) => geometry,
            Err(cause) => {
                log::debug!("Archive {:03} metadata unavailable ({}), probing imported textures", archive, cause);
                let discovered = discover(archive, assets, config);
                if discovered.records.is_empty() {
                    log::error!("No records found for archive {:03}", archive);
                    return Err(GeometryError::NoRecords { archive, cause });
                }
                log::info!(
                    "Discovered {} record(s) for custom archive {:03}",
                    discovered.record_count(),
                    archive
                );
                discovered
            }
        };

        let geometry = Arc::new(geometry);
        entries.insert(archive, geometry.clone());
        Ok(geometry)
    }

    pub fn len(&self) -> usize {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::archive::{ArchiveEntry, ArchiveManifest};
    use crate::assets::InMemoryAssets;
    use crate::config::ScaleOverride;

    fn manifest() -> ArchiveManifest {
        ArchiveManifest::new(vec![ArchiveEntry {
            archive: 396,
            records: vec![
                RawRecord { width: 40, height: 80, scale: [0, 0], frames: 4 },
                RawRecord { width: 40, height: 80, scale: [64, -128], frames: 2 },
            ],
        }])
    }

    #[test]
    fn archive_scale_is_applied_before_world_scale() {
        let geometry = load_from_archive(396, &manifest(), &VarietyConfig::default()).expect("load");
        assert_eq!(geometry.source, GeometrySource::Archive);
        assert_eq!(geometry.record_count(), 2);
        assert_eq!(geometry.frame_count(1), Some(2));
        assert_eq!(geometry.size(0), Some(Vec2::new(40.0, 80.0) * GLOBAL_SCALE));
        // 40 * 64/256 = 10, 80 * -128/256 = -40.
        assert_eq!(geometry.size(1), Some(Vec2::new(50.0, 40.0) * GLOBAL_SCALE));
        assert_eq!(geometry.size(2), None);
    }

    #[test]
    fn scale_override_multiplies_size() {
        let mut config = VarietyConfig::default();
        config.scale_overrides.push(ScaleOverride {
            archive: 396,
            record: None,
            scale: [0.5, 2.0],
        });
        let geometry = load_from_archive(396, &manifest(), &config).expect("load");
        assert_eq!(geometry.size(0), Some(Vec2::new(20.0, 160.0) * GLOBAL_SCALE));
    }

    #[test]
    fn unknown_archive_is_discovered_from_imported_frames() {
        let mut assets = InMemoryAssets::new();
        for frame in 0..3 {
            assets.insert(replacement_name(10053, 0, frame), 60, 90);
        }
        assets.insert(image_name_any_face(10053, 1, 0, 0, "", ""), 30, 45);
        // Record 3 is unreachable because record 2 has no frames.
        assets.insert(replacement_name(10053, 3, 0), 10, 10);

        let cache = GeometryCache::new();
        let geometry = cache
            .get_or_load(10053, &manifest(), &assets, &VarietyConfig::default())
            .expect("discovered");
        assert_eq!(geometry.source, GeometrySource::Discovered);
        assert_eq!(geometry.record_count(), 2);
        assert_eq!(geometry.frame_count(0), Some(3));
        assert_eq!(geometry.frame_count(1), Some(1));
        assert_eq!(geometry.size(1), Some(Vec2::new(30.0, 45.0) * GLOBAL_SCALE));
    }

    #[test]
    fn failed_discovery_is_not_cached() {
        let cache = GeometryCache::new();
        let assets = InMemoryAssets::new();
        let err = cache
            .get_or_load(10060, &manifest(), &assets, &VarietyConfig::default())
            .unwrap_err();
        assert!(matches!(err, GeometryError::NoRecords { archive: 10060, .. }));
        assert!(cache.is_empty());
    }

    #[test]
    fn cached_geometry_is_shared() {
        let cache = GeometryCache::new();
        let assets = InMemoryAssets::new();
        let config = VarietyConfig::default();
        let a = cache.get_or_load(396, &manifest(), &assets, &config).expect("load");
        let b = cache.get_or_load(396, &manifest(), &assets, &config).expect("load");
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(cache.len(), 1);
    }
}
