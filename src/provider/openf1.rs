//! Tyre stints and car data from the OpenF1 API.
//!
//! OpenF1 covers seasons from 2023 on. It publishes lap start times, tyre stints
//! as lap ranges and car data samples, none of which the Ergast API has.
//! [`OpenF1Enrichment`] wraps another provider: sessions it loads get stint,
//! compound and fastest-lap telemetry filled in, and sessions it does not
//! publish at all (practice, sprint qualifying) are built from OpenF1 laps.

use std::{collections::HashMap, sync::Arc, time::Duration};

use chrono::{DateTime, TimeDelta, Utc};
use itertools::Itertools;
use log::{debug, warn};
use moka::sync::Cache;
use serde::{Deserialize, de::DeserializeOwned};

use super::{
    SessionProvider, find_event,
    http::{HttpClient, get_json},
};
use crate::{
    errors::ProviderError,
    session::{CarSample, EventInfo, Lap, Session, SessionKey, SessionType},
};

pub const DEFAULT_OPENF1_BASE_URL: &str = "https://api.openf1.org/v1";

const SESSION_LIST_CACHE_CAPACITY: u64 = 16;

#[derive(Deserialize, Debug, Clone)]
struct SessionEntry {
    session_key: u64,
    session_name: String,
    date_start: Option<String>,
    country_name: Option<String>,
    location: Option<String>,
}

#[derive(Deserialize, Debug)]
struct DriverEntry {
    driver_number: u32,
    name_acronym: Option<String>,
}

#[derive(Deserialize, Debug)]
struct LapEntry {
    driver_number: u32,
    lap_number: u32,
    lap_duration: Option<f64>,
    date_start: Option<String>,
}

#[derive(Deserialize, Debug)]
struct StintEntry {
    driver_number: u32,
    stint_number: u32,
    compound: Option<String>,
    lap_start: Option<u32>,
    lap_end: Option<u32>,
}

impl StintEntry {
    fn covers(&self, lap_number: u32) -> bool {
        match (self.lap_start, self.lap_end) {
            (Some(start), Some(end)) => (start..=end).contains(&lap_number),
            _ => false,
        }
    }
}

#[derive(Deserialize, Debug)]
struct CarDataEntry {
    date: String,
    speed: Option<f64>,
    throttle: Option<f64>,
    brake: Option<f64>,
}

/// Session names OpenF1 uses for a session type. Sprint qualifying was called
/// the sprint shootout in 2023.
fn session_names(session_type: SessionType) -> &'static [&'static str] {
    match session_type {
        SessionType::Practice1 => &["Practice 1"],
        SessionType::Practice2 => &["Practice 2"],
        SessionType::Practice3 => &["Practice 3"],
        SessionType::SprintQualifying => &["Sprint Qualifying", "Sprint Shootout"],
        SessionType::Sprint => &["Sprint"],
        SessionType::Qualifying => &["Qualifying"],
        SessionType::Race => &["Race"],
    }
}

fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .ok()
        .map(|t| t.with_timezone(&Utc))
}

/// Timestamp as accepted by the `date` filters, UTC without offset.
fn query_time(time: &DateTime<Utc>) -> String {
    time.format("%Y-%m-%dT%H:%M:%S%.3f").to_string()
}

fn lap_duration(seconds: f64) -> Option<Duration> {
    if !seconds.is_finite() || seconds < 0. {
        return None;
    }
    Some(Duration::from_millis((seconds * 1000.).round() as u64))
}

fn same_text(a: &Option<String>, b: &Option<String>) -> bool {
    matches!((a, b), (Some(a), Some(b)) if a.eq_ignore_ascii_case(b))
}

/// Whether an OpenF1 session belongs to `event`. Sessions run between the day
/// before the weekend and the race day; when dates are missing the venue decides.
fn belongs_to(session: &SessionEntry, event: &EventInfo) -> bool {
    let start = session.date_start.as_deref().and_then(parse_timestamp);
    match (event.date, start) {
        (Some(race_day), Some(start)) => {
            (-1..=4).contains(&(race_day - start.date_naive()).num_days())
        }
        _ => {
            same_text(&session.location, &event.location)
                || same_text(&session.country_name, &event.country)
        }
    }
}

/// Provider decorator adding OpenF1 stints and car data to another provider's sessions.
///
/// Failing to enrich a session the wrapped provider loaded only costs the extra
/// data: the session is returned as loaded, with a warning.
pub struct OpenF1Enrichment {
    inner: Arc<dyn SessionProvider>,
    client: Arc<dyn HttpClient>,
    base_url: String,
    seasons: Cache<i32, Arc<Vec<SessionEntry>>>,
}

impl OpenF1Enrichment {
    pub fn new(
        inner: Arc<dyn SessionProvider>,
        client: Arc<dyn HttpClient>,
        base_url: impl Into<String>,
    ) -> Self {
        Self {
            inner,
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            seasons: Cache::new(SESSION_LIST_CACHE_CAPACITY),
        }
    }

    fn fetch<T: DeserializeOwned>(&self, path: &str) -> Result<T, ProviderError> {
        get_json(self.client.as_ref(), &format!("{}/{}", self.base_url, path))
    }

    fn season_sessions(&self, year: i32) -> Result<Arc<Vec<SessionEntry>>, ProviderError> {
        self.seasons
            .try_get_with(year, || {
                self.fetch::<Vec<SessionEntry>>(&format!("sessions?year={}", year))
                    .map(Arc::new)
            })
            .map_err(Arc::unwrap_or_clone)
    }

    fn find_session(
        &self,
        key: &SessionKey,
        event: &EventInfo,
    ) -> Result<Option<u64>, ProviderError> {
        let names = session_names(key.session_type);
        Ok(self
            .season_sessions(key.year)?
            .iter()
            .filter(|s| names.contains(&s.session_name.as_str()))
            .find(|s| belongs_to(s, event))
            .map(|s| s.session_key))
    }

    fn car_data(
        &self,
        session_key: u64,
        driver_number: u32,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<CarSample>, ProviderError> {
        let entries: Vec<CarDataEntry> = self.fetch(&format!(
            "car_data?session_key={}&driver_number={}&date>={}&date<={}",
            session_key,
            driver_number,
            query_time(&start),
            query_time(&end)
        ))?;
        Ok(entries
            .into_iter()
            .filter_map(|entry| {
                let at = parse_timestamp(&entry.date)?;
                Some(CarSample {
                    time_s: (at - start).num_milliseconds() as f64 / 1000.,
                    speed_kph: entry.speed?,
                    throttle: entry.throttle.unwrap_or(0.),
                    brake: entry.brake.unwrap_or(0.),
                })
            })
            .sorted_by(|a, b| a.time_s.total_cmp(&b.time_s))
            .collect())
    }

    /// Adds stints, compounds and fastest-lap telemetry to `session`, building
    /// its laps from OpenF1 when it has none. Returns `false` when OpenF1 does
    /// not list the session.
    fn enrich(&self, session: &mut Session) -> Result<bool, ProviderError> {
        let Some(session_key) = self.find_session(&session.key, &session.event)? else {
            debug!("OpenF1 does not list {}", session.key);
            return Ok(false);
        };

        let numbers: HashMap<String, u32> = self
            .fetch::<Vec<DriverEntry>>(&format!("drivers?session_key={}", session_key))?
            .into_iter()
            .filter_map(|d| Some((d.name_acronym?, d.driver_number)))
            .collect();
        let acronyms: HashMap<u32, &str> =
            numbers.iter().map(|(a, n)| (*n, a.as_str())).collect();
        let acronym = |number: u32| {
            acronyms
                .get(&number)
                .map(|a| a.to_string())
                .unwrap_or_else(|| number.to_string())
        };

        let laps: Vec<LapEntry> = self.fetch(&format!("laps?session_key={}", session_key))?;
        if session.laps.is_empty() {
            session.laps = laps
                .iter()
                .map(|lap| Lap {
                    driver: acronym(lap.driver_number),
                    lap_number: lap.lap_number,
                    lap_time: lap.lap_duration.and_then(lap_duration),
                    ..Lap::default()
                })
                .sorted_by(|a, b| {
                    a.driver
                        .cmp(&b.driver)
                        .then(a.lap_number.cmp(&b.lap_number))
                })
                .collect();
        }

        let stints: Vec<(String, StintEntry)> = self
            .fetch::<Vec<StintEntry>>(&format!("stints?session_key={}", session_key))?
            .into_iter()
            .map(|stint| (acronym(stint.driver_number), stint))
            .collect();
        for lap in session.laps.iter_mut() {
            let Some((_, stint)) = stints
                .iter()
                .find(|(driver, stint)| *driver == lap.driver && stint.covers(lap.lap_number))
            else {
                continue;
            };
            lap.stint = lap.stint.or(Some(stint.stint_number));
            if lap.compound.is_none() {
                lap.compound = stint.compound.clone();
            }
        }

        let lap_starts: HashMap<(String, u32), DateTime<Utc>> = laps
            .iter()
            .filter_map(|lap| {
                let start = parse_timestamp(lap.date_start.as_deref()?)?;
                Some(((acronym(lap.driver_number), lap.lap_number), start))
            })
            .collect();
        let drivers: Vec<String> = session
            .laps
            .iter()
            .map(|lap| lap.driver.clone())
            .unique()
            .collect();

        for driver in drivers {
            let Some((lap_number, lap_time)) = session
                .fastest_lap(&driver)
                .and_then(|lap| Some((lap.lap_number, lap.lap_time?)))
            else {
                continue;
            };
            let (Some(&start), Some(&number)) = (
                lap_starts.get(&(driver.clone(), lap_number)),
                numbers.get(&driver),
            ) else {
                continue;
            };
            let Ok(length) = TimeDelta::from_std(lap_time) else {
                continue;
            };

            match self.car_data(session_key, number, start, start + length) {
                Ok(samples) => {
                    if let Some(lap) = session
                        .laps
                        .iter_mut()
                        .find(|lap| lap.driver == driver && lap.lap_number == lap_number)
                    {
                        lap.telemetry = samples;
                    }
                }
                Err(e) => warn!("No car data for {} in {}: {}", driver, session.key, e),
            }
        }

        Ok(true)
    }
}

impl SessionProvider for OpenF1Enrichment {
    fn event_schedule(
        &self,
        year: i32,
        include_testing: bool,
    ) -> Result<Vec<EventInfo>, ProviderError> {
        self.inner.event_schedule(year, include_testing)
    }

    fn load_session(&self, key: &SessionKey) -> Result<Session, ProviderError> {
        match self.inner.load_session(key) {
            Ok(mut session) => {
                if let Err(e) = self.enrich(&mut session) {
                    warn!("Could not add tyre and car data to {}: {}", key, e);
                }
                Ok(session)
            }
            Err(ProviderError::UnsupportedSession { session_type }) => {
                debug!("Loading {} from OpenF1 only", key);
                let schedule = self.inner.event_schedule(key.year, false)?;
                let event = find_event(&schedule, &key.event).cloned().ok_or_else(|| {
                    ProviderError::UnknownEvent {
                        year: key.year,
                        event: key.event.clone(),
                    }
                })?;
                let mut session = Session {
                    key: key.clone(),
                    event,
                    laps: Vec::new(),
                    results: Vec::new(),
                };
                if !self.enrich(&mut session)? {
                    return Err(ProviderError::UnsupportedSession { session_type });
                }
                Ok(session)
            }
            Err(e) => Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::{build_stints, compare};
    use crate::provider::http::tests::MockHttpClient;
    use chrono::NaiveDate;

    const BASE: &str = "http://openf1.test/v1";

    const SESSIONS_2023: &str = r#"[
        {"session_key":7763,"session_name":"Practice 1","session_type":"Practice","date_start":"2023-03-03T11:30:00+00:00","country_name":"Bahrain","location":"Sakhir","year":2023},
        {"session_key":7952,"session_name":"Qualifying","session_type":"Qualifying","date_start":"2023-03-04T15:00:00+00:00","country_name":"Bahrain","location":"Sakhir","year":2023},
        {"session_key":7953,"session_name":"Race","session_type":"Race","date_start":"2023-03-05T15:00:00+00:00","country_name":"Bahrain","location":"Sakhir","year":2023},
        {"session_key":7779,"session_name":"Race","session_type":"Race","date_start":"2023-03-19T17:00:00+00:00","country_name":"Saudi Arabia","location":"Jeddah","year":2023}
    ]"#;

    const DRIVERS: &str = r#"[
        {"driver_number":1,"name_acronym":"VER","full_name":"Max VERSTAPPEN","team_name":"Red Bull Racing"},
        {"driver_number":11,"name_acronym":"PER","full_name":"Sergio PEREZ","team_name":"Red Bull Racing"}
    ]"#;

    const RACE_LAPS: &str = r#"[
        {"driver_number":1,"lap_number":1,"lap_duration":97.284,"date_start":"2023-03-05T15:03:00.000000+00:00","is_pit_out_lap":false},
        {"driver_number":1,"lap_number":2,"lap_duration":96.5,"date_start":"2023-03-05T15:04:37.284000+00:00","is_pit_out_lap":true},
        {"driver_number":11,"lap_number":1,"lap_duration":98.1,"date_start":"2023-03-05T15:03:01.000000+00:00","is_pit_out_lap":false},
        {"driver_number":11,"lap_number":2,"lap_duration":null,"date_start":"2023-03-05T15:04:39.100000+00:00","is_pit_out_lap":false}
    ]"#;

    const RACE_STINTS: &str = r#"[
        {"driver_number":1,"stint_number":1,"compound":"SOFT","lap_start":1,"lap_end":1,"tyre_age_at_start":0},
        {"driver_number":1,"stint_number":2,"compound":"HARD","lap_start":2,"lap_end":2,"tyre_age_at_start":0},
        {"driver_number":11,"stint_number":1,"compound":"MEDIUM","lap_start":1,"lap_end":2,"tyre_age_at_start":3}
    ]"#;

    const VER_CAR_DATA: &str = r#"[
        {"date":"2023-03-05T15:04:37.784000+00:00","speed":216,"throttle":99,"brake":0,"driver_number":1},
        {"date":"2023-03-05T15:04:37.534000+00:00","speed":180,"throttle":100,"brake":0,"driver_number":1}
    ]"#;

    const PRACTICE_LAPS: &str = r#"[
        {"driver_number":1,"lap_number":1,"lap_duration":null,"date_start":null},
        {"driver_number":1,"lap_number":2,"lap_duration":93.8,"date_start":"2023-03-03T11:40:00+00:00"}
    ]"#;

    /// Stand-in for the primary provider: one race with lap times only.
    struct RaceOnly;

    fn bahrain() -> EventInfo {
        EventInfo {
            round: 1,
            name: "Bahrain Grand Prix".to_string(),
            date: NaiveDate::from_ymd_opt(2023, 3, 5),
            country: Some("Bahrain".to_string()),
            location: Some("Sakhir".to_string()),
        }
    }

    fn timed(driver: &str, lap_number: u32, lap_time_ms: Option<u64>) -> Lap {
        Lap {
            driver: driver.to_string(),
            lap_number,
            lap_time: lap_time_ms.map(Duration::from_millis),
            ..Lap::default()
        }
    }

    impl SessionProvider for RaceOnly {
        fn event_schedule(&self, year: i32, _: bool) -> Result<Vec<EventInfo>, ProviderError> {
            Ok(if year == 2023 { vec![bahrain()] } else { Vec::new() })
        }

        fn load_session(&self, key: &SessionKey) -> Result<Session, ProviderError> {
            if key.session_type != SessionType::Race {
                return Err(ProviderError::UnsupportedSession {
                    session_type: key.session_type,
                });
            }
            Ok(Session {
                key: key.clone(),
                event: bahrain(),
                laps: vec![
                    timed("PER", 1, Some(98_100)),
                    timed("PER", 2, None),
                    timed("VER", 1, Some(97_284)),
                    timed("VER", 2, Some(96_500)),
                ],
                results: Vec::new(),
            })
        }
    }

    fn race_client() -> MockHttpClient {
        MockHttpClient::default()
            .with_json(&format!("{BASE}/sessions?year=2023"), SESSIONS_2023)
            .with_json(&format!("{BASE}/drivers?session_key=7953"), DRIVERS)
            .with_json(&format!("{BASE}/laps?session_key=7953"), RACE_LAPS)
            .with_json(&format!("{BASE}/stints?session_key=7953"), RACE_STINTS)
            .with_json(
                &format!(
                    "{BASE}/car_data?session_key=7953&driver_number=1&date>=2023-03-05T15:04:37.284&date<=2023-03-05T15:06:13.784"
                ),
                VER_CAR_DATA,
            )
    }

    fn enrichment(client: Arc<MockHttpClient>) -> OpenF1Enrichment {
        OpenF1Enrichment::new(Arc::new(RaceOnly), client, BASE)
    }

    #[test]
    fn test_race_laps_get_stints_and_compounds() {
        let provider = enrichment(Arc::new(race_client()));

        let session = provider
            .load_session(&SessionKey::race(2023, "Bahrain Grand Prix"))
            .unwrap();

        let stints = build_stints(&session.laps);
        let ranges: Vec<(&str, u32, &str, u32, u32)> = stints
            .iter()
            .map(|s| (s.driver.as_str(), s.stint, s.compound.as_str(), s.start_lap, s.end_lap))
            .collect();
        assert_eq!(
            ranges,
            vec![
                ("PER", 1, "MEDIUM", 1, 3),
                ("VER", 1, "SOFT", 1, 2),
                ("VER", 2, "HARD", 2, 3),
            ]
        );
    }

    #[test]
    fn test_fastest_lap_gets_car_data() {
        let provider = enrichment(Arc::new(race_client()));

        let session = provider
            .load_session(&SessionKey::race(2023, "Bahrain Grand Prix"))
            .unwrap();

        let fastest = session.fastest_lap("VER").unwrap();
        assert_eq!(fastest.lap_number, 2);
        let times: Vec<f64> = fastest.telemetry.iter().map(|s| s.time_s).collect();
        assert_eq!(times, vec![0.25, 0.5]);
        assert_eq!(fastest.telemetry[0].speed_kph, 180.);

        // Car data for PER is not served; the lap is kept without telemetry
        assert!(session.fastest_lap("PER").unwrap().telemetry.is_empty());

        let comparison = compare(&session, "VER", "PER");
        assert_eq!(comparison.speed.first.points.len(), 2);
        assert!(comparison.speed.second.points.is_empty());
    }

    #[test]
    fn test_practice_built_from_openf1_laps() {
        let client = race_client()
            .with_json(&format!("{BASE}/drivers?session_key=7763"), DRIVERS)
            .with_json(&format!("{BASE}/laps?session_key=7763"), PRACTICE_LAPS)
            .with_json(&format!("{BASE}/stints?session_key=7763"), "[]");
        let provider = enrichment(Arc::new(client));

        let session = provider
            .load_session(&SessionKey::new(2023, "Bahrain", SessionType::Practice1))
            .unwrap();

        assert_eq!(session.event.round, 1);
        assert!(session.results.is_empty());
        assert_eq!(session.laps.len(), 2);
        assert_eq!(session.laps[0].lap_time, None);
        assert_eq!(
            session.fastest_lap("VER").map(|lap| lap.lap_time),
            Some(Some(Duration::from_millis(93_800)))
        );
    }

    #[test]
    fn test_session_not_listed_keeps_primary_data() {
        let client =
            MockHttpClient::default().with_json(&format!("{BASE}/sessions?year=2019"), "[]");
        let provider = enrichment(Arc::new(client));

        let session = provider
            .load_session(&SessionKey::race(2019, "Bahrain Grand Prix"))
            .unwrap();
        assert_eq!(session.laps.len(), 4);
        assert!(session.laps.iter().all(|lap| lap.stint.is_none()));

        assert!(matches!(
            provider.load_session(&SessionKey::new(2019, "Bahrain", SessionType::Practice2)),
            Err(ProviderError::UnknownEvent { .. })
        ));
    }

    #[test]
    fn test_unreachable_openf1_keeps_primary_data() {
        let provider = enrichment(Arc::new(MockHttpClient::default()));

        let session = provider
            .load_session(&SessionKey::race(2023, "Bahrain Grand Prix"))
            .unwrap();

        assert_eq!(session.laps.len(), 4);
        assert!(session.laps.iter().all(|lap| lap.compound.is_none()));
    }

    #[test]
    fn test_practice_unlisted_is_unsupported() {
        let client =
            MockHttpClient::default().with_json(&format!("{BASE}/sessions?year=2023"), "[]");
        let provider = enrichment(Arc::new(client));

        assert_eq!(
            provider.load_session(&SessionKey::new(2023, "Bahrain", SessionType::Practice3)),
            Err(ProviderError::UnsupportedSession {
                session_type: SessionType::Practice3
            })
        );
    }

    #[test]
    fn test_session_list_requested_once_per_season() {
        let client = Arc::new(race_client());
        let provider = enrichment(client.clone());

        provider
            .load_session(&SessionKey::race(2023, "Bahrain Grand Prix"))
            .unwrap();
        provider
            .load_session(&SessionKey::race(2023, "Bahrain Grand Prix"))
            .unwrap();

        let listings = client
            .requests()
            .iter()
            .filter(|url| url.contains("/sessions?"))
            .count();
        assert_eq!(listings, 1);
    }

    #[test]
    fn test_sessions_matched_by_weekend() {
        let entry = |date: &str, location: &str| SessionEntry {
            session_key: 1,
            session_name: "Race".to_string(),
            date_start: Some(date.to_string()),
            country_name: Some("United States".to_string()),
            location: Some(location.to_string()),
        };
        let miami = EventInfo {
            round: 5,
            name: "Miami Grand Prix".to_string(),
            date: NaiveDate::from_ymd_opt(2023, 5, 7),
            country: Some("USA".to_string()),
            location: Some("Miami".to_string()),
        };

        assert!(belongs_to(&entry("2023-05-07T19:30:00+00:00", "Miami"), &miami));
        assert!(belongs_to(&entry("2023-05-05T18:00:00+00:00", "Miami"), &miami));
        assert!(!belongs_to(&entry("2023-10-22T19:00:00+00:00", "Austin"), &miami));
    }
}
