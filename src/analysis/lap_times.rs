use serde::{Deserialize, Serialize};

use crate::session::Lap;

/// One timed lap, ready for plotting.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LapTimePoint {
    /// Series label: the race name, or the season when comparing years at one circuit
    pub race: String,
    pub driver: String,
    pub lap_number: u32,
    pub lap_time_seconds: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LapTimeSeries {
    pub points: Vec<LapTimePoint>,
}

impl LapTimeSeries {
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Points of one series label, in input order.
    pub fn for_race<'a>(&'a self, race: &'a str) -> impl Iterator<Item = &'a LapTimePoint> + 'a {
        self.points.iter().filter(move |p| p.race == race)
    }
}

/// Flattens labelled groups of laps into a lap time series.
///
/// Laps without a lap time are dropped rather than plotted as zero. Filtering
/// to a driver or circuit is the caller's job; every timed lap passed in ends up
/// in the series.
pub fn build_series<'a, L>(race_laps: L) -> LapTimeSeries
where
    L: IntoIterator<Item = (&'a str, &'a [Lap])>,
{
    let points = race_laps
        .into_iter()
        .flat_map(|(race, laps)| {
            laps.iter().filter_map(move |lap| {
                lap.lap_time_seconds().map(|lap_time_seconds| LapTimePoint {
                    race: race.to_string(),
                    driver: lap.driver.clone(),
                    lap_number: lap.lap_number,
                    lap_time_seconds,
                })
            })
        })
        .collect();
    LapTimeSeries { points }
}
