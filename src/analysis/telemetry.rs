use serde::{Deserialize, Serialize};
use uom::si::{
    f64::Velocity,
    velocity::{kilometer_per_hour, meter_per_second},
};

use crate::session::{CarSample, Session};

/// Car data sample placed on a distance axis.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TelemetrySample {
    /// Meters from the start of the lap, non-decreasing
    pub distance: f64,
    pub speed: f64,
    pub throttle: f64,
    pub brake: f64,
}

/// One driver's channel plotted against distance as `(distance, value)` pairs.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DriverTrace {
    pub driver: String,
    pub points: Vec<(f64, f64)>,
}

/// The same channel for both compared drivers. Each trace keeps its own
/// distance samples; the two are overlaid, never resampled onto one axis.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChannelComparison {
    pub first: DriverTrace,
    pub second: DriverTrace,
}

impl ChannelComparison {
    pub fn is_empty(&self) -> bool {
        self.first.points.is_empty() && self.second.points.is_empty()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TelemetryComparison {
    pub speed: ChannelComparison,
    pub throttle: ChannelComparison,
    pub brake: ChannelComparison,
}

impl TelemetryComparison {
    /// Three comparisons with no data for either driver.
    pub fn empty(driver_a: &str, driver_b: &str) -> Self {
        let channel = ChannelComparison {
            first: DriverTrace {
                driver: driver_a.to_string(),
                points: Vec::new(),
            },
            second: DriverTrace {
                driver: driver_b.to_string(),
                points: Vec::new(),
            },
        };
        Self {
            speed: channel.clone(),
            throttle: channel.clone(),
            brake: channel,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.speed.is_empty() && self.throttle.is_empty() && self.brake.is_empty()
    }
}

/// Places raw car samples on a cumulative distance axis.
///
/// Each sample covers `speed * dt` meters, where `dt` is the time since the
/// previous sample (since the lap start for the first one). Negative time steps
/// contribute nothing, keeping the axis non-decreasing.
pub fn add_distance(samples: &[CarSample]) -> Vec<TelemetrySample> {
    let mut distance = 0.;
    let mut prev_time = 0.;
    samples
        .iter()
        .map(|sample| {
            let dt = (sample.time_s - prev_time).max(0.);
            prev_time = sample.time_s;
            let speed_mps = Velocity::new::<kilometer_per_hour>(sample.speed_kph)
                .get::<meter_per_second>();
            distance += speed_mps * dt;
            TelemetrySample {
                distance,
                speed: sample.speed_kph,
                throttle: sample.throttle,
                brake: sample.brake,
            }
        })
        .collect()
}

fn trace(
    driver: &str,
    samples: &[TelemetrySample],
    channel: impl Fn(&TelemetrySample) -> f64,
) -> DriverTrace {
    DriverTrace {
        driver: driver.to_string(),
        points: samples.iter().map(|s| (s.distance, channel(s))).collect(),
    }
}

/// Compares speed, throttle and brake over the fastest lap of two drivers.
///
/// If either driver has no timed lap in the session all three comparisons are
/// returned empty for both drivers.
pub fn compare(session: &Session, driver_a: &str, driver_b: &str) -> TelemetryComparison {
    let (Some(lap_a), Some(lap_b)) = (session.fastest_lap(driver_a), session.fastest_lap(driver_b))
    else {
        return TelemetryComparison::empty(driver_a, driver_b);
    };

    let a = add_distance(&lap_a.telemetry);
    let b = add_distance(&lap_b.telemetry);

    let channel = |value: fn(&TelemetrySample) -> f64| ChannelComparison {
        first: trace(driver_a, &a, value),
        second: trace(driver_b, &b, value),
    };

    TelemetryComparison {
        speed: channel(|s| s.speed),
        throttle: channel(|s| s.throttle),
        brake: channel(|s| s.brake),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::{EventInfo, Lap, SessionKey};
    use std::time::Duration;

    fn sample(time_s: f64, speed_kph: f64, throttle: f64, brake: f64) -> CarSample {
        CarSample {
            time_s,
            speed_kph,
            throttle,
            brake,
        }
    }

    fn lap(driver: &str, lap_number: u32, lap_time_ms: u64, telemetry: Vec<CarSample>) -> Lap {
        Lap {
            driver: driver.to_string(),
            lap_number,
            lap_time: Some(Duration::from_millis(lap_time_ms)),
            telemetry,
            ..Lap::default()
        }
    }

    fn session(laps: Vec<Lap>) -> Session {
        Session {
            key: SessionKey::race(2023, "Monza"),
            event: EventInfo {
                round: 14,
                name: "Italian Grand Prix".to_string(),
                date: None,
                country: None,
                location: None,
            },
            laps,
            results: Vec::new(),
        }
    }

    #[test]
    fn test_add_distance_integrates_speed() {
        // 36 km/h is 10 m/s
        let samples = vec![
            sample(0.5, 36., 100., 0.),
            sample(1.5, 72., 100., 0.),
            sample(2.0, 72., 0., 1.),
        ];

        let aligned = add_distance(&samples);
        let distances: Vec<f64> = aligned.iter().map(|s| s.distance).collect();
        assert!((distances[0] - 5.).abs() < 1e-9);
        assert!((distances[1] - 25.).abs() < 1e-9);
        assert!((distances[2] - 35.).abs() < 1e-9);
        assert_eq!(aligned[2].brake, 1.);
    }

    #[test]
    fn test_add_distance_is_non_decreasing() {
        let samples = vec![
            sample(1.0, 100., 50., 0.),
            sample(0.8, 100., 50., 0.),
            sample(1.2, 0., 0., 1.),
        ];

        let aligned = add_distance(&samples);
        assert!(aligned.windows(2).all(|w| w[1].distance >= w[0].distance));
    }

    #[test]
    fn test_compare_uses_fastest_lap() {
        let session = session(vec![
            lap("VER", 1, 85_000, vec![sample(1., 36., 10., 0.)]),
            lap("VER", 2, 82_000, vec![sample(1., 72., 90., 0.), sample(2., 72., 95., 0.)]),
            lap("LEC", 2, 83_000, vec![sample(1., 36., 80., 1.)]),
        ]);

        let comparison = compare(&session, "VER", "LEC");

        let close = |actual: &[(f64, f64)], expected: &[(f64, f64)]| {
            actual.len() == expected.len()
                && actual
                    .iter()
                    .zip(expected)
                    .all(|(a, e)| (a.0 - e.0).abs() < 1e-9 && (a.1 - e.1).abs() < 1e-9)
        };

        assert_eq!(comparison.speed.first.driver, "VER");
        assert!(close(&comparison.speed.first.points, &[(20., 72.), (40., 72.)]));
        assert!(close(&comparison.throttle.first.points, &[(20., 90.), (40., 95.)]));
        // native samples of the second driver are kept as they are
        assert!(close(&comparison.brake.second.points, &[(10., 1.)]));
        assert_eq!(comparison.brake.second.driver, "LEC");
    }

    #[test]
    fn test_compare_driver_without_laps() {
        let session = session(vec![lap("VER", 1, 85_000, vec![sample(1., 36., 10., 0.)])]);

        let comparison = compare(&session, "VER", "SAR");

        assert!(comparison.is_empty());
        assert!(comparison.speed.first.points.is_empty());
        assert!(comparison.speed.second.points.is_empty());
        assert!(comparison.throttle.is_empty());
        assert!(comparison.brake.is_empty());
        assert_eq!(comparison, TelemetryComparison::empty("VER", "SAR"));
    }

    #[test]
    fn test_compare_lap_without_telemetry() {
        let session = session(vec![
            lap("VER", 1, 85_000, Vec::new()),
            lap("LEC", 1, 86_000, Vec::new()),
        ]);

        assert!(compare(&session, "VER", "LEC").is_empty());
    }
}
