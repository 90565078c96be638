//! Host settings (location, calendar, asset paths). Loaded from town.ron at startup.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use villagers::{Climate, LocationCategory, Race, WeatherKind};

/// Simulated town settings. Loaded from `town.ron` in the current directory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HostConfig {
    /// Region index of the town.
    #[serde(default = "default_region")]
    pub region: u32,
    #[serde(default = "default_climate")]
    pub climate: Climate,
    #[serde(default = "default_category")]
    pub category: LocationCategory,
    /// Town size in blocks.
    #[serde(default = "default_total_blocks")]
    pub total_blocks: u32,
    /// Native race of the townsfolk before any climate override.
    #[serde(default = "default_race")]
    pub race: Race,
    #[serde(default)]
    pub weather: WeatherKind,
    /// Starting month (0-based).
    #[serde(default)]
    pub start_month: u32,
    #[serde(default)]
    pub start_day: u32,
    #[serde(default = "default_start_hour")]
    pub start_hour: u32,
    /// In-game hours to simulate.
    #[serde(default = "default_hours")]
    pub hours: u32,
    /// In-game seconds per real second.
    #[serde(default = "default_time_scale")]
    pub time_scale: u64,
    /// Fixed simulation step in seconds.
    #[serde(default = "default_step")]
    pub step: f32,
    /// Texture-pack directory with `<image name>.png` files.
    #[serde(default)]
    pub asset_dir: Option<PathBuf>,
    /// RON archive manifest. A built-in one is used when missing.
    #[serde(default)]
    pub manifest: Option<PathBuf>,
    /// Variety config path. Defaults to `villagers.ron`.
    #[serde(default)]
    pub variety_config: Option<PathBuf>,
    #[serde(default)]
    pub seed: Option<u64>,
}

fn default_region() -> u32 {
    17
}
fn default_climate() -> Climate {
    Climate::Woodlands
}
fn default_category() -> LocationCategory {
    LocationCategory::Village
}
fn default_total_blocks() -> u32 {
    32
}
fn default_race() -> Race {
    Race::Breton
}
fn default_start_hour() -> u32 {
    8
}
fn default_hours() -> u32 {
    24
}
fn default_time_scale() -> u64 {
    12
}
fn default_step() -> f32 {
    1.0 / 30.0
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            region: default_region(),
            climate: default_climate(),
            category: default_category(),
            total_blocks: default_total_blocks(),
            race: default_race(),
            weather: WeatherKind::default(),
            start_month: 0,
            start_day: 0,
            start_hour: default_start_hour(),
            hours: default_hours(),
            time_scale: default_time_scale(),
            step: default_step(),
            asset_dir: None,
            manifest: None,
            variety_config: None,
            seed: None,
        }
    }
}

impl HostConfig {
    /// Load config from `town.ron`. If the file is missing or invalid, returns default config.
    pub fn load() -> Self {
        Self::load_from(&config_path())
    }

    pub fn load_from(path: &Path) -> Self {
        if let Ok(data) = std::fs::read_to_string(path) {
            match ron::from_str(&data) {
                Ok(c) => return c,
                Err(e) => log::warn!("Invalid config at {:?}: {}, using defaults", path, e),
            }
        }
        Self::default()
    }
}

fn config_path() -> PathBuf {
    std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")).join("town.ron")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_file_fills_defaults() {
        let config: HostConfig = ron::from_str("(region: 26, climate: Mountain, hours: 3)").expect("parse");
        assert_eq!(config.region, 26);
        assert_eq!(config.climate, Climate::Mountain);
        assert_eq!(config.hours, 3);
        assert_eq!(config.category, LocationCategory::Village);
        assert_eq!(config.asset_dir, None);
    }

    #[test]
    fn missing_file_gives_defaults() {
        assert_eq!(HostConfig::load_from(Path::new("/no/such/town.ron")), HostConfig::default());
    }
}
