//! Session provider backed by an Ergast-compatible JSON API (e.g. the Jolpica mirror).
//!
//! The API publishes schedules, classifications and per-lap timings for races.
//! It has no practice sessions, tyre data or car telemetry, so laps loaded from
//! it carry neither stint nor compound information and have no car samples.
//! [`OpenF1Enrichment`](super::OpenF1Enrichment) adds those on top.

use std::{collections::HashMap, sync::Arc, time::Duration};

use chrono::NaiveDate;
use log::{debug, warn};
use moka::sync::Cache;
use serde::Deserialize;

use super::{
    SessionProvider, find_event,
    http::{HttpClient, get_json},
};
use crate::{
    driver::{MetadataSource, ProfilePatch},
    errors::{PaddockError, ProviderError},
    session::{DriverResult, EventInfo, Lap, Session, SessionKey, SessionType},
};

pub const DEFAULT_ERGAST_BASE_URL: &str = "https://api.jolpi.ca/ergast/f1";

/// Largest page the API will return.
const PAGE_SIZE: usize = 100;

/// Seasons whose schedule is kept after the first request.
const SCHEDULE_CACHE_CAPACITY: u64 = 16;

#[derive(Deserialize, Debug)]
struct Envelope {
    #[serde(rename = "MRData")]
    data: MrData,
}

#[derive(Deserialize, Debug)]
struct MrData {
    #[serde(default)]
    total: String,
    #[serde(rename = "RaceTable")]
    race_table: Option<RaceTable>,
    #[serde(rename = "DriverTable")]
    driver_table: Option<DriverTable>,
}

#[derive(Deserialize, Debug, Default)]
struct RaceTable {
    #[serde(rename = "Races", default)]
    races: Vec<RaceEntry>,
}

#[derive(Deserialize, Debug, Default)]
struct DriverTable {
    #[serde(rename = "Drivers", default)]
    drivers: Vec<DriverEntry>,
}

#[derive(Deserialize, Debug, Default)]
struct RaceEntry {
    round: String,
    #[serde(rename = "raceName")]
    race_name: String,
    date: Option<String>,
    #[serde(rename = "Circuit")]
    circuit: Option<CircuitEntry>,
    #[serde(rename = "Results", default)]
    results: Vec<ResultEntry>,
    #[serde(rename = "SprintResults", default)]
    sprint_results: Vec<ResultEntry>,
    #[serde(rename = "QualifyingResults", default)]
    qualifying_results: Vec<ResultEntry>,
    #[serde(rename = "Laps", default)]
    laps: Vec<LapEntry>,
}

#[derive(Deserialize, Debug, Default)]
struct CircuitEntry {
    #[serde(rename = "Location")]
    location: Option<LocationEntry>,
}

#[derive(Deserialize, Debug, Default)]
struct LocationEntry {
    locality: Option<String>,
    country: Option<String>,
}

#[derive(Deserialize, Debug, Clone, Default)]
struct DriverEntry {
    #[serde(rename = "driverId")]
    driver_id: String,
    code: Option<String>,
    #[serde(rename = "givenName", default)]
    given_name: String,
    #[serde(rename = "familyName", default)]
    family_name: String,
    #[serde(rename = "dateOfBirth")]
    date_of_birth: Option<String>,
    nationality: Option<String>,
}

impl DriverEntry {
    fn full_name(&self) -> Option<String> {
        let name = format!("{} {}", self.given_name, self.family_name)
            .trim()
            .to_string();
        (!name.is_empty()).then_some(name)
    }

    /// Three letter code, derived from the family name for seasons that predate codes.
    fn abbreviation(&self) -> String {
        match &self.code {
            Some(code) if !code.is_empty() => code.clone(),
            _ => abbreviate(if self.family_name.is_empty() {
                &self.driver_id
            } else {
                &self.family_name
            }),
        }
    }
}

#[derive(Deserialize, Debug, Default)]
struct ConstructorEntry {
    name: String,
}

#[derive(Deserialize, Debug, Default)]
struct ResultEntry {
    position: Option<String>,
    #[serde(default)]
    points: Option<String>,
    grid: Option<String>,
    #[serde(rename = "Driver")]
    driver: DriverEntry,
    #[serde(rename = "Constructor")]
    constructor: ConstructorEntry,
}

#[derive(Deserialize, Debug, Default)]
struct LapEntry {
    number: String,
    #[serde(rename = "Timings", default)]
    timings: Vec<TimingEntry>,
}

#[derive(Deserialize, Debug, Default)]
struct TimingEntry {
    #[serde(rename = "driverId")]
    driver_id: String,
    time: Option<String>,
}

fn abbreviate(name: &str) -> String {
    name.chars()
        .filter(|c| c.is_alphabetic())
        .take(3)
        .collect::<String>()
        .to_uppercase()
}

/// Parses an Ergast lap time such as `1:31.447` or `58.112`.
pub(crate) fn parse_lap_time(raw: &str) -> Option<Duration> {
    let (minutes, seconds) = match raw.split_once(':') {
        Some((m, s)) => (m.trim().parse::<u64>().ok()?, s),
        None => (0, raw),
    };
    let seconds = seconds.trim().parse::<f64>().ok()?;
    if !seconds.is_finite() || seconds < 0. {
        return None;
    }
    // timings are published with millisecond precision
    let millis = (seconds * 1000.).round() as u64;
    Some(Duration::from_secs(minutes * 60) + Duration::from_millis(millis))
}

fn parse_position(raw: Option<&String>) -> Option<u32> {
    // grid "0" means a pit lane start
    raw.and_then(|p| p.parse::<u32>().ok()).filter(|p| *p > 0)
}

fn parse_date(raw: Option<&String>) -> Option<NaiveDate> {
    raw.and_then(|d| NaiveDate::parse_from_str(d, "%Y-%m-%d").ok())
}

impl From<RaceEntry> for EventInfo {
    fn from(race: RaceEntry) -> Self {
        let location = race.circuit.and_then(|c| c.location).unwrap_or_default();
        EventInfo {
            round: race.round.parse().unwrap_or(0),
            date: parse_date(race.date.as_ref()),
            name: race.race_name,
            country: location.country,
            location: location.locality,
        }
    }
}

/// Reads schedules, classifications and lap timings from an Ergast-compatible API.
///
/// Every session load needs the season schedule to resolve the event name to a
/// round, so schedules are memoized per season. A failed schedule request is
/// not remembered.
pub struct ErgastProvider {
    client: Arc<dyn HttpClient>,
    base_url: String,
    schedules: Cache<i32, Arc<Vec<EventInfo>>>,
}

impl ErgastProvider {
    pub fn new(client: Arc<dyn HttpClient>, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            schedules: Cache::new(SCHEDULE_CACHE_CAPACITY),
        }
    }

    fn fetch_schedule(&self, year: i32) -> Result<Arc<Vec<EventInfo>>, ProviderError> {
        debug!("Fetching the {} schedule", year);
        let mut events: Vec<EventInfo> = self
            .races(&format!("{}.json", year))?
            .into_iter()
            .map(EventInfo::from)
            .collect();
        events.sort_by_key(|e| e.round);
        Ok(Arc::new(events))
    }

    /// Fetches every page of `path`, handing each decoded page to `on_page`.
    fn fetch_paged(
        &self,
        path: &str,
        mut on_page: impl FnMut(MrData),
    ) -> Result<(), ProviderError> {
        let mut offset = 0;
        loop {
            let url = format!(
                "{}/{}?limit={}&offset={}",
                self.base_url, path, PAGE_SIZE, offset
            );
            let envelope: Envelope = get_json(self.client.as_ref(), &url)?;
            let total = envelope.data.total.parse::<usize>().unwrap_or(0);
            on_page(envelope.data);
            offset += PAGE_SIZE;
            if offset >= total {
                return Ok(());
            }
        }
    }

    fn races(&self, path: &str) -> Result<Vec<RaceEntry>, ProviderError> {
        let mut races: Vec<RaceEntry> = Vec::new();
        self.fetch_paged(path, |page| {
            for race in page.race_table.unwrap_or_default().races {
                // Long tables are split across pages; merge rows of the same round
                match races.iter_mut().find(|r| r.round == race.round) {
                    Some(existing) => {
                        existing.results.extend(race.results);
                        existing.sprint_results.extend(race.sprint_results);
                        existing.qualifying_results.extend(race.qualifying_results);
                        existing.laps.extend(race.laps);
                    }
                    None => races.push(race),
                }
            }
        })?;
        Ok(races)
    }

    fn resolve_event(&self, year: i32, event: &str) -> Result<EventInfo, ProviderError> {
        let schedule = self.event_schedule(year, false)?;
        find_event(&schedule, event)
            .cloned()
            .ok_or_else(|| ProviderError::UnknownEvent {
                year,
                event: event.to_string(),
            })
    }

    fn classification(
        &self,
        year: i32,
        round: u32,
        session_type: SessionType,
    ) -> Result<Vec<ResultEntry>, ProviderError> {
        let endpoint = match session_type {
            SessionType::Race => "results",
            SessionType::Sprint => "sprint",
            SessionType::Qualifying => "qualifying",
            other => return Err(ProviderError::UnsupportedSession { session_type: other }),
        };
        let races = self.races(&format!("{}/{}/{}.json", year, round, endpoint))?;
        Ok(races
            .into_iter()
            .next()
            .map(|race| match session_type {
                SessionType::Sprint => race.sprint_results,
                SessionType::Qualifying => race.qualifying_results,
                _ => race.results,
            })
            .unwrap_or_default())
    }

    fn race_laps(
        &self,
        year: i32,
        round: u32,
        driver_codes: &HashMap<String, String>,
    ) -> Result<Vec<Lap>, ProviderError> {
        let races = self.races(&format!("{}/{}/laps.json", year, round))?;
        let mut laps = Vec::new();
        for race in races {
            for lap in race.laps {
                let Ok(lap_number) = lap.number.parse::<u32>() else {
                    warn!("Skipping lap with invalid number '{}'", lap.number);
                    continue;
                };
                for timing in lap.timings {
                    let driver = driver_codes
                        .get(&timing.driver_id)
                        .cloned()
                        .unwrap_or_else(|| abbreviate(&timing.driver_id));
                    laps.push(Lap {
                        driver,
                        lap_number,
                        lap_time: timing.time.as_deref().and_then(parse_lap_time),
                        ..Lap::default()
                    });
                }
            }
        }
        laps.sort_by(|a, b| {
            a.driver
                .cmp(&b.driver)
                .then(a.lap_number.cmp(&b.lap_number))
        });
        Ok(laps)
    }
}

impl SessionProvider for ErgastProvider {
    fn event_schedule(
        &self,
        year: i32,
        _include_testing: bool,
    ) -> Result<Vec<EventInfo>, ProviderError> {
        // Pre-season testing is never published by this API
        self.schedules
            .try_get_with(year, || self.fetch_schedule(year))
            .map(|events| events.as_ref().clone())
            .map_err(Arc::unwrap_or_clone)
    }

    fn load_session(&self, key: &SessionKey) -> Result<Session, ProviderError> {
        let event = self.resolve_event(key.year, &key.event)?;
        debug!("Loading {} (round {})", key, event.round);

        let entries = self.classification(key.year, event.round, key.session_type)?;
        let driver_codes: HashMap<String, String> = entries
            .iter()
            .map(|r| (r.driver.driver_id.clone(), r.driver.abbreviation()))
            .collect();

        let results = entries
            .iter()
            .map(|r| DriverResult {
                abbreviation: r.driver.abbreviation(),
                full_name: r.driver.full_name(),
                team_name: r.constructor.name.clone(),
                grid_position: parse_position(r.grid.as_ref()),
                finish_position: parse_position(r.position.as_ref()),
                points: r
                    .points
                    .as_ref()
                    .and_then(|p| p.parse::<f64>().ok())
                    .unwrap_or(0.),
            })
            .collect();

        let laps = match key.session_type {
            SessionType::Race => self.race_laps(key.year, event.round, &driver_codes)?,
            _ => Vec::new(),
        };

        Ok(Session {
            key: key.clone(),
            event,
            laps,
            results,
        })
    }
}

/// Driver directory of a season, used as a metadata source keyed by driver code.
pub struct ErgastDriverDirectory {
    client: Arc<dyn HttpClient>,
    base_url: String,
}

impl ErgastDriverDirectory {
    pub fn new(client: Arc<dyn HttpClient>, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }
}

impl MetadataSource for ErgastDriverDirectory {
    fn name(&self) -> &'static str {
        "driver directory"
    }

    fn lookup(&self, year: i32, abbreviation: &str) -> Result<ProfilePatch, PaddockError> {
        let url = format!("{}/{}/drivers.json?limit={}", self.base_url, year, PAGE_SIZE);
        let envelope: Envelope =
            get_json(self.client.as_ref(), &url).map_err(|e| PaddockError::MetadataUnavailable {
                source_name: self.name().to_string(),
                reason: e.to_string(),
            })?;

        let Some(driver) = envelope
            .data
            .driver_table
            .unwrap_or_default()
            .drivers
            .into_iter()
            .find(|d| d.abbreviation().eq_ignore_ascii_case(abbreviation))
        else {
            return Ok(ProfilePatch::default());
        };

        Ok(ProfilePatch {
            name: driver.full_name(),
            nationality: driver.nationality.clone(),
            date_of_birth: parse_date(driver.date_of_birth.as_ref()),
            ..ProfilePatch::default()
        })
    }
}
