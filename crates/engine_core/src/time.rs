//! World calendar: time of day, seasons and hour ticks.

/// Hour at which day starts.
pub const DAWN_HOUR: u32 = 6;
/// Hour at which night starts.
pub const DUSK_HOUR: u32 = 18;

const SECONDS_PER_MINUTE: u64 = 60;
const MINUTES_PER_HOUR: u64 = 60;
const HOURS_PER_DAY: u64 = 24;
const DAYS_PER_MONTH: u64 = 30;
const MONTHS_PER_YEAR: u64 = 12;

const SECONDS_PER_HOUR: u64 = SECONDS_PER_MINUTE * MINUTES_PER_HOUR;
const SECONDS_PER_DAY: u64 = SECONDS_PER_HOUR * HOURS_PER_DAY;
const SECONDS_PER_MONTH: u64 = SECONDS_PER_DAY * DAYS_PER_MONTH;
const SECONDS_PER_YEAR: u64 = SECONDS_PER_MONTH * MONTHS_PER_YEAR;

/// Season of the year. The discriminant is the season ordinal used to index tag tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum Season {
    Fall = 0,
    Spring = 1,
    Summer = 2,
    Winter = 3,
}

impl Season {
    pub const ALL: [Season; 4] = [Season::Fall, Season::Spring, Season::Summer, Season::Winter];

    /// Season for a zero-based month index (0 = first month of the year).
    pub fn from_month(month: u32) -> Self {
        match month % 12 {
            11 | 0 | 1 => Season::Winter,
            2..=4 => Season::Spring,
            5..=7 => Season::Summer,
            _ => Season::Fall,
        }
    }

    pub fn ordinal(self) -> usize {
        self as usize
    }
}

/// Game world clock measured in whole game seconds since the start of year 0.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct WorldClock {
    seconds: u64,
}

impl WorldClock {
    /// Create a clock at the given zero-based month, day and hour.
    pub fn at(month: u32, day: u32, hour: u32) -> Self {
        let seconds = u64::from(month) % MONTHS_PER_YEAR * SECONDS_PER_MONTH
            + u64::from(day) % DAYS_PER_MONTH * SECONDS_PER_DAY
            + u64::from(hour) % HOURS_PER_DAY * SECONDS_PER_HOUR;
        Self { seconds }
    }

    /// Zero-based hour of the day.
    pub fn hour(&self) -> u32 {
        ((self.seconds % SECONDS_PER_DAY) / SECONDS_PER_HOUR) as u32
    }

    /// Zero-based day of the month.
    pub fn day(&self) -> u32 {
        ((self.seconds % SECONDS_PER_MONTH) / SECONDS_PER_DAY) as u32
    }

    /// Zero-based month of the year.
    pub fn month(&self) -> u32 {
        ((self.seconds % SECONDS_PER_YEAR) / SECONDS_PER_MONTH) as u32
    }

    pub fn year(&self) -> u64 {
        self.seconds / SECONDS_PER_YEAR
    }

    pub fn season(&self) -> Season {
        Season::from_month(self.month())
    }

    pub fn is_day(&self) -> bool {
        let hour = self.hour();
        (DAWN_HOUR..DUSK_HOUR).contains(&hour)
    }

    pub fn is_night(&self) -> bool {
        !self.is_day()
    }

    /// Advance by `seconds` of game time. Returns the number of hour boundaries crossed.
    pub fn advance(&mut self, seconds: u64) -> u64 {
        let before = self.seconds / SECONDS_PER_HOUR;
        self.seconds = self.seconds.saturating_add(seconds);
        self.seconds / SECONDS_PER_HOUR - before
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seasons_follow_months() {
        assert_eq!(WorldClock::at(0, 0, 12).season(), Season::Winter);
        assert_eq!(WorldClock::at(3, 0, 12).season(), Season::Spring);
        assert_eq!(WorldClock::at(6, 0, 12).season(), Season::Summer);
        assert_eq!(WorldClock::at(9, 0, 12).season(), Season::Fall);
        assert_eq!(WorldClock::at(11, 29, 23).season(), Season::Winter);
    }

    #[test]
    fn night_spans_dusk_to_dawn() {
        assert!(WorldClock::at(0, 0, 5).is_night());
        assert!(WorldClock::at(0, 0, 6).is_day());
        assert!(WorldClock::at(0, 0, 17).is_day());
        assert!(WorldClock::at(0, 0, 18).is_night());
    }

    #[test]
    fn advance_counts_hour_boundaries() {
        let mut clock = WorldClock::at(0, 0, 10);
        assert_eq!(clock.advance(1_800), 0);
        assert_eq!(clock.advance(1_800), 1);
        assert_eq!(clock.hour(), 11);
        assert_eq!(clock.advance(SECONDS_PER_DAY), 24);
        assert_eq!(clock.day(), 1);
    }

    #[test]
    fn season_ordinals_match_tag_order() {
        let ordinals: Vec<usize> = Season::ALL.iter().map(|s| s.ordinal()).collect();
        assert_eq!(ordinals, vec![0, 1, 2, 3]);
    }
}
