// Derived analytics over loaded sessions.
//
// The builders in the submodules are pure functions of the sessions they are
// handed. `SessionAnalysis` wires them to the fetch layer and exposes one method
// per chart, taking plain identifiers and returning provider-agnostic records.

pub mod lap_times;
pub mod stints;
pub mod team_points;
pub mod telemetry;

use std::sync::Arc;

use itertools::Itertools;
use log::{info, warn};

pub use lap_times::{LapTimePoint, LapTimeSeries, build_series};
pub use stints::{StintRange, build_stints};
pub use team_points::{TeamPoints, TeamTotal, aggregate};
pub use telemetry::{
    ChannelComparison, DriverTrace, TelemetryComparison, TelemetrySample, add_distance, compare,
};

use crate::session::{
    EventInfo, Lap, ParallelFetcher, ScheduleResolver, SessionKey, SessionType,
};

pub struct SessionAnalysis {
    fetcher: Arc<ParallelFetcher>,
    schedule: Arc<ScheduleResolver>,
}

impl SessionAnalysis {
    pub fn new(fetcher: Arc<ParallelFetcher>, schedule: Arc<ScheduleResolver>) -> Self {
        Self { fetcher, schedule }
    }

    /// Events of a season, or none when the schedule cannot be loaded.
    pub fn season_events(&self, year: i32) -> Vec<EventInfo> {
        self.schedule.events_for(year).unwrap_or_default()
    }

    /// Abbreviations of the drivers classified in an event's race, sorted.
    pub fn event_drivers(&self, year: i32, event: &str) -> Vec<String> {
        match self.fetcher.cache().get(&SessionKey::race(year, event)) {
            Ok(session) => session
                .results
                .iter()
                .map(|r| r.abbreviation.clone())
                .filter(|a| !a.is_empty())
                .sorted()
                .dedup()
                .collect(),
            Err(e) => {
                warn!("No drivers for {} {}: {}", year, event, e);
                Vec::new()
            }
        }
    }

    /// Lap times of one driver over several races of a season, one series per race.
    pub fn driver_lap_times(&self, year: i32, driver: &str, races: &[String]) -> LapTimeSeries {
        let keys: Vec<SessionKey> = races
            .iter()
            .map(|race| SessionKey::race(year, race.as_str()))
            .collect();
        let outcomes = self.fetcher.fetch_many(&keys);

        let driver_laps: Vec<(&str, Vec<Lap>)> = outcomes
            .iter()
            .filter_map(|outcome| {
                let session = outcome.session()?;
                let laps = session.laps_for(driver).cloned().collect();
                Some((outcome.key.event.as_str(), laps))
            })
            .collect();

        build_series(
            driver_laps
                .iter()
                .map(|(race, laps)| (*race, laps.as_slice())),
        )
    }

    /// Lap times of every driver at one circuit, one series per season.
    /// Seasons whose race cannot be loaded are skipped.
    pub fn circuit_lap_times(&self, circuit: &str, years: &[i32]) -> LapTimeSeries {
        let keys: Vec<SessionKey> = years
            .iter()
            .map(|year| SessionKey::race(*year, circuit))
            .collect();
        let outcomes = self.fetcher.fetch_many(&keys);

        let labels: Vec<String> = outcomes.iter().map(|o| o.key.year.to_string()).collect();

        build_series(outcomes.iter().zip(&labels).filter_map(|(outcome, year)| {
            outcome
                .session()
                .map(|session| (year.as_str(), session.laps.as_slice()))
        }))
    }

    /// Tyre stints of every driver in a race.
    pub fn tyre_stints(&self, year: i32, event: &str) -> Vec<StintRange> {
        match self.fetcher.cache().get(&SessionKey::race(year, event)) {
            Ok(session) => build_stints(&session.laps),
            Err(e) => {
                warn!("No stint data for {} {}: {}", year, event, e);
                Vec::new()
            }
        }
    }

    /// Points scored by each team over every race of a season.
    pub fn team_points(&self, year: i32) -> TeamPoints {
        let events = match self.schedule.events_for(year) {
            Ok(events) => events,
            Err(e) => {
                warn!("{}", e);
                return TeamPoints::default();
            }
        };
        let keys: Vec<SessionKey> = events
            .iter()
            .map(|event| SessionKey::race(year, event.name.as_str()))
            .collect();

        let sessions: Vec<_> = self
            .fetcher
            .fetch_many(&keys)
            .into_iter()
            .map(|outcome| outcome.into_pair().1)
            .collect();
        info!(
            "Aggregating team points over {} of {} races of {}",
            sessions.iter().flatten().count(),
            sessions.len(),
            year
        );
        aggregate(&sessions)
    }

    /// Speed, throttle and brake over the fastest laps of two drivers.
    pub fn compare_fastest_laps(
        &self,
        year: i32,
        event: &str,
        session_type: SessionType,
        driver_a: &str,
        driver_b: &str,
    ) -> TelemetryComparison {
        match self
            .fetcher
            .cache()
            .get(&SessionKey::new(year, event, session_type))
        {
            Ok(session) => compare(&session, driver_a, driver_b),
            Err(e) => {
                warn!("No telemetry for {} {} {}: {}", year, event, session_type, e);
                TelemetryComparison::empty(driver_a, driver_b)
            }
        }
    }
}
