//! Variety configuration. Loaded from `villagers.ron` at startup.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::population::PopulationTable;
use crate::world::{Climate, Gender, REGION_DRAGONTAIL_MOUNTAINS, REGION_EPHESUS, REGION_ORSINIUM};

/// Default config file name, looked up in the current directory.
pub const CONFIG_FILE: &str = "villagers.ron";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid config: {0}")]
    Parse(#[from] ron::error::SpannedError),
}

/// Tunables for variant selection, guards, population and region special cases.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VarietyConfig {
    /// Number of variety skins per identity. A variety falls back to 0 when no images exist.
    pub num_variants: u32,
    /// Climates where Redguard archives use the subtropical skins.
    pub subtropical_climates: Vec<Climate>,
    /// Regions that reuse the subtropical Redguard skins regardless of climate.
    pub subtropical_regions: Vec<u32>,
    /// Climates counted as arid for the national guard variant.
    pub arid_climates: Vec<Climate>,
    /// Guard tags by region. Takes priority over the national tags.
    pub guard_regional_variants: Vec<RegionalTag>,
    /// Guard tag in arid climates.
    pub guard_national_arid: Option<String>,
    /// Guard tag everywhere else.
    pub guard_national_default: Option<String>,
    /// Population per 16 blocks by location category.
    pub population: PopulationTable,
    /// Billboard size multipliers applied after the archive's own scale.
    pub scale_overrides: Vec<ScaleOverride>,
    /// Regions where generated names use the Orc name tables.
    pub orc_name_regions: Vec<u32>,
    pub special_cases: SpecialCases,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegionalTag {
    pub region: u32,
    pub tag: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScaleOverride {
    pub archive: u32,
    /// `None` applies to every record of the archive.
    #[serde(default)]
    pub record: Option<usize>,
    pub scale: [f32; 2],
}

/// Content-specific exceptions kept out of the resolution code.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpecialCases {
    /// Regions that replace the race tables with their own archives.
    pub region_archives: Vec<RegionArchives>,
    /// Face record to talk-window portrait record mappings.
    pub portrait_remaps: Vec<PortraitRemap>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegionArchives {
    pub region: u32,
    /// One archive per outfit.
    pub male: Vec<u32>,
    pub female: Vec<u32>,
    #[serde(default)]
    pub guard: Option<u32>,
}

impl RegionArchives {
    pub fn for_gender(&self, gender: Gender) -> &[u32] {
        match gender {
            Gender::Male => &self.male,
            Gender::Female => &self.female,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PortraitRemap {
    pub region: u32,
    pub ranges: Vec<PortraitRange>,
}

/// Face records `first..=last` map onto portraits starting at `target`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortraitRange {
    pub first: u32,
    pub last: u32,
    pub target: u32,
}

impl SpecialCases {
    pub fn region_archives(&self, region: u32) -> Option<&RegionArchives> {
        self.region_archives.iter().find(|r| r.region == region)
    }

    /// Portrait record for a face record; unchanged when no range covers it.
    pub fn portrait_record(&self, region: u32, face_record: u32) -> u32 {
        self.portrait_remaps
            .iter()
            .filter(|remap| remap.region == region)
            .flat_map(|remap| remap.ranges.iter())
            .find(|range| (range.first..=range.last).contains(&face_record))
            .map(|range| range.target + (face_record - range.first))
            .unwrap_or(face_record)
    }
}

impl Default for VarietyConfig {
    fn default() -> Self {
        Self {
            num_variants: 2,
            subtropical_climates: vec![Climate::Swamp, Climate::Subtropical],
            subtropical_regions: vec![REGION_DRAGONTAIL_MOUNTAINS, REGION_EPHESUS],
            arid_climates: vec![Climate::Desert, Climate::Desert2, Climate::Subtropical],
            guard_regional_variants: vec![RegionalTag {
                region: REGION_ORSINIUM,
                tag: "Orsinium".to_string(),
            }],
            guard_national_arid: Some("Hammerfell".to_string()),
            guard_national_default: None,
            population: PopulationTable::default(),
            scale_overrides: Vec::new(),
            orc_name_regions: vec![REGION_ORSINIUM],
            special_cases: SpecialCases {
                region_archives: vec![RegionArchives {
                    region: REGION_ORSINIUM,
                    male: vec![10053, 10054, 10055, 10056],
                    female: vec![10057, 10058, 10059, 10060],
                    guard: None,
                }],
                portrait_remaps: Vec::new(),
            },
        }
    }
}

impl VarietyConfig {
    /// Load config from `villagers.ron` in the current directory. If the file is missing or invalid, returns default config.
    pub fn load() -> Self {
        Self::load_or_default(&config_path())
    }

    pub fn load_or_default(path: &Path) -> Self {
        match Self::load_from(path) {
            Ok(config) => config,
            Err(ConfigError::Io { source, .. }) if source.kind() == std::io::ErrorKind::NotFound => {
                log::info!("No variety config at {:?}, using defaults", path);
                Self::default()
            }
            Err(e) => {
                log::warn!("{}, using defaults", e);
                Self::default()
            }
        }
    }

    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let data = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_ron_str(&data)
    }

    pub fn from_ron_str(data: &str) -> Result<Self, ConfigError> {
        Ok(ron::from_str(data)?)
    }

    pub fn scale_override(&self, archive: u32, record: usize) -> Option<[f32; 2]> {
        self.scale_overrides
            .iter()
            .find(|o| o.archive == archive && o.record == Some(record))
            .or_else(|| {
                self.scale_overrides
                    .iter()
                    .find(|o| o.archive == archive && o.record.is_none())
            })
            .map(|o| o.scale)
    }

    pub fn regional_guard_tag(&self, region: u32) -> Option<&str> {
        self.guard_regional_variants
            .iter()
            .find(|r| r.region == region)
            .map(|r| r.tag.as_str())
    }
}

fn config_path() -> PathBuf {
    std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")).join(CONFIG_FILE)
}
