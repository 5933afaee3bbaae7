// Session data model and the loading layer: memo cache, schedule lookups and
// parallel fetches.

pub mod cache;
pub mod fetcher;
pub mod schedule;

use std::{fmt, str::FromStr, time::Duration};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

pub use cache::{DEFAULT_CACHE_CAPACITY, SessionCache};
pub use fetcher::{FetchOutcome, ParallelFetcher};
pub use schedule::ScheduleResolver;

/// The kind of on-track session within an event weekend.
#[derive(Debug, Clone, Copy, Hash, Eq, PartialEq, Serialize, Deserialize)]
pub enum SessionType {
    Practice1,
    Practice2,
    Practice3,
    SprintQualifying,
    Sprint,
    Qualifying,
    Race,
}

impl SessionType {
    /// Short identifier used on the command line and by most timing feeds.
    pub fn identifier(&self) -> &'static str {
        match self {
            SessionType::Practice1 => "FP1",
            SessionType::Practice2 => "FP2",
            SessionType::Practice3 => "FP3",
            SessionType::SprintQualifying => "SQ",
            SessionType::Sprint => "S",
            SessionType::Qualifying => "Q",
            SessionType::Race => "R",
        }
    }
}

impl fmt::Display for SessionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionType::Practice1 => write!(f, "Practice 1"),
            SessionType::Practice2 => write!(f, "Practice 2"),
            SessionType::Practice3 => write!(f, "Practice 3"),
            SessionType::SprintQualifying => write!(f, "Sprint Qualifying"),
            SessionType::Sprint => write!(f, "Sprint"),
            SessionType::Qualifying => write!(f, "Qualifying"),
            SessionType::Race => write!(f, "Race"),
        }
    }
}

impl FromStr for SessionType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "FP1" | "PRACTICE 1" => Ok(SessionType::Practice1),
            "FP2" | "PRACTICE 2" => Ok(SessionType::Practice2),
            "FP3" | "PRACTICE 3" => Ok(SessionType::Practice3),
            "SQ" | "SPRINT QUALIFYING" | "SPRINT SHOOTOUT" => Ok(SessionType::SprintQualifying),
            "S" | "SPRINT" => Ok(SessionType::Sprint),
            "Q" | "QUALIFYING" => Ok(SessionType::Qualifying),
            "R" | "RACE" => Ok(SessionType::Race),
            other => Err(format!("unknown session type '{other}'")),
        }
    }
}

/// Identifies one session of one event in one season.
#[derive(Debug, Clone, Hash, Eq, PartialEq, Serialize, Deserialize)]
pub struct SessionKey {
    pub year: i32,
    pub event: String,
    pub session_type: SessionType,
}

impl SessionKey {
    pub fn new(year: i32, event: impl Into<String>, session_type: SessionType) -> Self {
        Self {
            year,
            event: event.into(),
            session_type,
        }
    }

    pub fn race(year: i32, event: impl Into<String>) -> Self {
        Self::new(year, event, SessionType::Race)
    }
}

impl fmt::Display for SessionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.year, self.event, self.session_type)
    }
}

/// A championship event as listed in the season schedule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventInfo {
    /// Championship round, 1-based
    pub round: u32,
    /// Event name (e.g., "Bahrain Grand Prix")
    pub name: String,
    /// Date of the main race
    pub date: Option<NaiveDate>,
    pub country: Option<String>,
    pub location: Option<String>,
}

/// Raw car data sample as published by the provider, before a distance axis is derived.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CarSample {
    /// Seconds since the start of the lap
    pub time_s: f64,
    /// Car speed in km/h
    pub speed_kph: f64,
    /// Throttle application, 0-100
    pub throttle: f64,
    /// Brake application
    pub brake: f64,
}

/// A single lap driven by one driver.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Lap {
    /// Driver abbreviation (e.g., "VER")
    pub driver: String,
    pub lap_number: u32,
    /// Lap time, absent for laps without a valid timing
    pub lap_time: Option<Duration>,
    pub stint: Option<u32>,
    /// Tyre compound (e.g., "SOFT")
    pub compound: Option<String>,
    /// Session time at which the car left the pit lane
    pub pit_out_time: Option<Duration>,
    /// Car data for this lap. Empty when the provider does not publish telemetry;
    /// OpenF1 enrichment only fills it for each driver's fastest lap.
    pub telemetry: Vec<CarSample>,
}

impl Lap {
    pub fn lap_time_seconds(&self) -> Option<f64> {
        self.lap_time.map(|t| t.as_secs_f64())
    }
}

/// Classification row for one driver in a session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DriverResult {
    pub abbreviation: String,
    pub full_name: Option<String>,
    pub team_name: String,
    pub grid_position: Option<u32>,
    pub finish_position: Option<u32>,
    pub points: f64,
}

/// A fully loaded session. Sessions are immutable once the provider produced them
/// and are shared read-only between the cache and the aggregators.
#[derive(Debug, Clone, PartialEq)]
pub struct Session {
    pub key: SessionKey,
    pub event: EventInfo,
    pub laps: Vec<Lap>,
    pub results: Vec<DriverResult>,
}

impl Session {
    /// Laps driven by a single driver, in lap order.
    pub fn laps_for<'s>(&'s self, driver: &str) -> impl Iterator<Item = &'s Lap> {
        self.laps.iter().filter(move |lap| lap.driver == driver)
    }

    pub fn result_for(&self, abbreviation: &str) -> Option<&DriverResult> {
        self.results
            .iter()
            .find(|r| r.abbreviation.eq_ignore_ascii_case(abbreviation))
    }

    /// The fastest timed lap of a driver. The first of equally fast laps wins.
    pub fn fastest_lap(&self, driver: &str) -> Option<&Lap> {
        self.laps_for(driver)
            .filter(|lap| lap.lap_time.is_some())
            .min_by_key(|lap| lap.lap_time)
    }
}
