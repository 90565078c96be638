//! World-side types the variety engine reads: race, gender, climate, weather and
//! the snapshot of where the player currently is.

use engine_core::{Season, WorldClock};
use serde::{Deserialize, Serialize};

/// Region index of the Orsinium area.
pub const REGION_ORSINIUM: u32 = 26;
/// Region index of the Dragontail Mountains.
pub const REGION_DRAGONTAIL_MOUNTAINS: u32 = 1;
/// Region index of Ephesus.
pub const REGION_EPHESUS: u32 = 53;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Race {
    Breton,
    Redguard,
    Nord,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Gender {
    Male,
    Female,
}

impl Gender {
    pub const ALL: [Gender; 2] = [Gender::Female, Gender::Male];
}

/// Climate zones, numbered the way the world map stores them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Climate {
    Ocean = 223,
    Desert = 224,
    Desert2 = 225,
    Mountain = 226,
    Rainforest = 227,
    Swamp = 228,
    Subtropical = 229,
    MountainWoods = 230,
    Woodlands = 231,
    HauntedWoodlands = 232,
}

impl Climate {
    pub fn from_index(index: u32) -> Option<Self> {
        Some(match index {
            223 => Climate::Ocean,
            224 => Climate::Desert,
            225 => Climate::Desert2,
            226 => Climate::Mountain,
            227 => Climate::Rainforest,
            228 => Climate::Swamp,
            229 => Climate::Subtropical,
            230 => Climate::MountainWoods,
            231 => Climate::Woodlands,
            232 => Climate::HauntedWoodlands,
            _ => return None,
        })
    }

    pub fn index(self) -> u32 {
        self as u32
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum WeatherKind {
    #[default]
    Sunny,
    Cloudy,
    Overcast,
    Fog,
    Rain,
    Thunder,
    Snow,
}

impl WeatherKind {
    /// Weather that keeps people indoors.
    pub fn is_storm(self) -> bool {
        matches!(self, WeatherKind::Rain | WeatherKind::Thunder | WeatherKind::Snow)
    }
}

/// Snapshot of the player's surroundings at the moment a request is handled.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WorldContext {
    pub region: u32,
    pub climate: Climate,
    pub weather: WeatherKind,
    pub clock: WorldClock,
}

impl WorldContext {
    pub fn new(region: u32, climate: Climate, clock: WorldClock) -> Self {
        Self {
            region,
            climate,
            weather: WeatherKind::default(),
            clock,
        }
    }

    pub fn with_weather(mut self, weather: WeatherKind) -> Self {
        self.weather = weather;
        self
    }

    pub fn season(&self) -> Season {
        self.clock.season()
    }

    pub fn is_night(&self) -> bool {
        self.clock.is_night()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn climate_index_roundtrip() {
        for index in 223..=232 {
            let climate = Climate::from_index(index).expect("known climate");
            assert_eq!(climate.index(), index);
        }
        assert!(Climate::from_index(0).is_none());
    }

    #[test]
    fn storms_are_wet_weather() {
        assert!(WeatherKind::Thunder.is_storm());
        assert!(WeatherKind::Snow.is_storm());
        assert!(!WeatherKind::Fog.is_storm());
        assert!(!WeatherKind::Sunny.is_storm());
    }
}
