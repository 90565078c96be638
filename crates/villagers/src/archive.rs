//! Sprite archives: which archive a person uses, and the supplied reader that
//! reports each archive's records, frames and legacy atlas layout.

use std::path::Path;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::ConfigError;
use crate::texture::{Texture, TextureHandle, TextureOrigin};
use crate::world::{Gender, Race};

/// Outfit variants per race and gender.
pub const NUM_OUTFIT_VARIANTS: usize = 4;
/// Face variants per outfit.
pub const NUM_FACE_VARIANTS: u32 = 24;
/// Archives used by town guards.
pub const GUARD_ARCHIVES: [u32; 1] = [399];

pub const MALE_REDGUARD_ARCHIVES: [u32; 4] = [381, 382, 383, 384];
pub const FEMALE_REDGUARD_ARCHIVES: [u32; 4] = [395, 396, 397, 398];
pub const MALE_NORD_ARCHIVES: [u32; 4] = [387, 388, 389, 390];
pub const FEMALE_NORD_ARCHIVES: [u32; 4] = [392, 393, 451, 452];
pub const MALE_BRETON_ARCHIVES: [u32; 4] = [385, 386, 391, 394];
pub const FEMALE_BRETON_ARCHIVES: [u32; 4] = [453, 454, 455, 456];

// First face record of each outfit.
const MALE_REDGUARD_FACES: [u32; 4] = [336, 312, 336, 312];
const FEMALE_REDGUARD_FACES: [u32; 4] = [144, 144, 120, 96];
const MALE_NORD_FACES: [u32; 4] = [240, 264, 168, 192];
const FEMALE_NORD_FACES: [u32; 4] = [72, 0, 48, 0];
const MALE_BRETON_FACES: [u32; 4] = [192, 216, 288, 240];
const FEMALE_BRETON_FACES: [u32; 4] = [72, 72, 24, 72];

/// Archives for a race and gender, one per outfit.
pub fn person_archives(race: Race, gender: Gender) -> &'static [u32; 4] {
    match (race, gender) {
        (Race::Redguard, Gender::Male) => &MALE_REDGUARD_ARCHIVES,
        (Race::Redguard, Gender::Female) => &FEMALE_REDGUARD_ARCHIVES,
        (Race::Nord, Gender::Male) => &MALE_NORD_ARCHIVES,
        (Race::Nord, Gender::Female) => &FEMALE_NORD_ARCHIVES,
        (Race::Breton, Gender::Male) => &MALE_BRETON_ARCHIVES,
        (Race::Breton, Gender::Female) => &FEMALE_BRETON_ARCHIVES,
    }
}

/// Face record id for an outfit and face variant.
pub fn face_record(race: Race, gender: Gender, outfit: usize, face: u32) -> u32 {
    let bases = match (race, gender) {
        (Race::Redguard, Gender::Male) => &MALE_REDGUARD_FACES,
        (Race::Redguard, Gender::Female) => &FEMALE_REDGUARD_FACES,
        (Race::Nord, Gender::Male) => &MALE_NORD_FACES,
        (Race::Nord, Gender::Female) => &FEMALE_NORD_FACES,
        (Race::Breton, Gender::Male) => &MALE_BRETON_FACES,
        (Race::Breton, Gender::Female) => &FEMALE_BRETON_FACES,
    };
    bases[outfit % NUM_OUTFIT_VARIANTS] + face
}

pub fn is_redguard_archive(archive: u32) -> bool {
    MALE_REDGUARD_ARCHIVES.contains(&archive) || FEMALE_REDGUARD_ARCHIVES.contains(&archive)
}

pub fn is_guard_archive(archive: u32) -> bool {
    GUARD_ARCHIVES.contains(&archive)
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ArchiveError {
    #[error("archive {0:03} is not available")]
    NotFound(u32),
    #[error("archive {archive:03} has no record {record}")]
    RecordOutOfRange { archive: u32, record: usize },
}

/// Raw per-record metadata as stored in the archive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawRecord {
    pub width: u32,
    pub height: u32,
    /// Signed scale in 1/256ths, applied on top of the pixel size.
    #[serde(default)]
    pub scale: [i32; 2],
    pub frames: usize,
}

/// UV sub-rectangle of a packed atlas, in normalized coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct UvRect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl UvRect {
    pub const FULL: UvRect = UvRect {
        x: 0.0,
        y: 0.0,
        width: 1.0,
        height: 1.0,
    };

    pub fn x_max(&self) -> f32 {
        self.x + self.width
    }

    pub fn y_max(&self) -> f32 {
        self.y + self.height
    }
}

/// Where a record's frames start in the atlas rect list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecordIndex {
    pub start_index: usize,
    pub frame_count: usize,
}

/// Legacy packed atlas: every frame of every record in one sheet.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct AtlasLayout {
    pub width: u32,
    pub height: u32,
    pub rects: Vec<UvRect>,
    pub indices: Vec<RecordIndex>,
}

impl AtlasLayout {
    /// Shelf-pack every frame left to right, wrapping rows at `max_width`.
    pub fn pack(records: &[RawRecord], max_width: u32, padding: u32) -> Self {
        let mut placed = Vec::new();
        let mut indices = Vec::with_capacity(records.len());
        let (mut x, mut y, mut row_height, mut width) = (0u32, 0u32, 0u32, 0u32);

        for record in records {
            indices.push(RecordIndex {
                start_index: placed.len(),
                frame_count: record.frames,
            });
            for _ in 0..record.frames {
                if x > 0 && x + record.width > max_width {
                    x = 0;
                    y += row_height + padding;
                    row_height = 0;
                }
                placed.push((x, y, record.width, record.height));
                x += record.width + padding;
                width = width.max(x.saturating_sub(padding));
                row_height = row_height.max(record.height);
            }
        }
        let height = y + row_height;

        let (w, h) = (width.max(1) as f32, height.max(1) as f32);
        let rects = placed
            .into_iter()
            .map(|(px, py, pw, ph)| UvRect {
                x: px as f32 / w,
                y: py as f32 / h,
                width: pw as f32 / w,
                height: ph as f32 / h,
            })
            .collect();

        Self {
            width,
            height,
            rects,
            indices,
        }
    }
}

/// Supplied reader for the game's own sprite archives.
pub trait ArchiveSource: Send + Sync {
    fn record_count(&self, archive: u32) -> Result<usize, ArchiveError>;
    fn record(&self, archive: u32, record: usize) -> Result<RawRecord, ArchiveError>;
    /// The archive's own frame, used when no custom frame exists.
    fn vanilla_frame(&self, archive: u32, record: usize, frame: usize) -> Option<TextureHandle>;
    /// Packed atlas for the legacy rendering path.
    fn atlas(&self, archive: u32) -> Option<Arc<AtlasLayout>>;
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArchiveEntry {
    pub archive: u32,
    pub records: Vec<RawRecord>,
}

/// Archive metadata described in a RON manifest instead of parsed from the binary files.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ArchiveManifest {
    pub archives: Vec<ArchiveEntry>,
    #[serde(default = "default_atlas_width")]
    pub atlas_width: u32,
    #[serde(default = "default_atlas_padding")]
    pub atlas_padding: u32,
}

fn default_atlas_width() -> u32 {
    1024
}
fn default_atlas_padding() -> u32 {
    4
}

impl ArchiveManifest {
    pub fn new(archives: Vec<ArchiveEntry>) -> Self {
        Self {
            archives,
            atlas_width: default_atlas_width(),
            atlas_padding: default_atlas_padding(),
        }
    }

    pub fn from_ron_str(data: &str) -> Result<Self, ConfigError> {
        Ok(ron::from_str(data)?)
    }

    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let data = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_ron_str(&data)
    }

    fn entry(&self, archive: u32) -> Result<&ArchiveEntry, ArchiveError> {
        self.archives
            .iter()
            .find(|e| e.archive == archive)
            .ok_or(ArchiveError::NotFound(archive))
    }
}

impl ArchiveSource for ArchiveManifest {
    fn record_count(&self, archive: u32) -> Result<usize, ArchiveError> {
        Ok(self.entry(archive)?.records.len())
    }

    fn record(&self, archive: u32, record: usize) -> Result<RawRecord, ArchiveError> {
        self.entry(archive)?
            .records
            .get(record)
            .copied()
            .ok_or(ArchiveError::RecordOutOfRange { archive, record })
    }

    fn vanilla_frame(&self, archive: u32, record: usize, frame: usize) -> Option<TextureHandle> {
        let raw = self.record(archive, record).ok()?;
        if frame >= raw.frames {
            return None;
        }
        let name = format!("TEXTURE.{archive:03}/{record}-{frame}");
        Some(Arc::new(Texture::new(name, raw.width, raw.height, TextureOrigin::Vanilla)))
    }

    fn atlas(&self, archive: u32) -> Option<Arc<AtlasLayout>> {
        let entry = self.entry(archive).ok()?;
        Some(Arc::new(AtlasLayout::pack(
            &entry.records,
            self.atlas_width,
            self.atlas_padding,
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(width: u32, height: u32, frames: usize) -> RawRecord {
        RawRecord {
            width,
            height,
            scale: [0, 0],
            frames,
        }
    }

    #[test]
    fn face_records_offset_outfit_base() {
        assert_eq!(face_record(Race::Redguard, Gender::Female, 1, 14), 158);
        assert_eq!(face_record(Race::Breton, Gender::Male, 2, 0), 288);
        assert_eq!(face_record(Race::Nord, Gender::Female, 3, 23), 23);
    }

    #[test]
    fn archive_tables_cover_each_outfit() {
        assert_eq!(person_archives(Race::Redguard, Gender::Female)[1], 396);
        assert_eq!(person_archives(Race::Nord, Gender::Female)[2], 451);
        assert!(is_redguard_archive(383));
        assert!(!is_redguard_archive(385));
        assert!(is_guard_archive(399));
    }

    #[test]
    fn atlas_packs_records_in_order() {
        let atlas = AtlasLayout::pack(&[raw(10, 20, 2), raw(30, 10, 1)], 50, 2);
        assert_eq!(atlas.rects.len(), 3);
        assert_eq!(atlas.indices[1], RecordIndex { start_index: 2, frame_count: 1 });
        // Third frame wraps to a second row: 24 + 30 > 50.
        assert_eq!(atlas.height, 20 + 2 + 10);
        let last = atlas.rects[2];
        assert!(last.x.abs() < 1e-6);
        assert!(last.y > 0.0);
        for rect in &atlas.rects {
            assert!(rect.x_max() <= 1.0 + 1e-6 && rect.y_max() <= 1.0 + 1e-6);
        }
    }

    #[test]
    fn manifest_answers_record_queries() {
        let manifest = ArchiveManifest::from_ron_str(
            "(archives: [(archive: 396, records: [(width: 30, height: 70, frames: 4), (width: 28, height: 70, scale: (16, -16), frames: 4)])])",
        )
        .expect("manifest");
        assert_eq!(manifest.record_count(396), Ok(2));
        assert_eq!(manifest.record(396, 1).map(|r| r.scale), Ok([16, -16]));
        assert_eq!(
            manifest.record(396, 2),
            Err(ArchiveError::RecordOutOfRange { archive: 396, record: 2 })
        );
        assert_eq!(manifest.record_count(10053), Err(ArchiveError::NotFound(10053)));
        let frame = manifest.vanilla_frame(396, 0, 3).expect("frame");
        assert_eq!(frame.origin, TextureOrigin::Vanilla);
        assert!(manifest.vanilla_frame(396, 0, 4).is_none());
        assert_eq!(manifest.atlas(396).expect("atlas").rects.len(), 8);
    }
}
