use std::path::PathBuf;

use clap::{Parser, Subcommand};
use log::{error, warn};
use serde::Serialize;

use paddock::{EngineConfig, Paddock, PaddockError, SessionType};

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
#[command(propagate_version = true)]
struct Args {
    /// Alternative config file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Events of a season
    Schedule {
        #[arg(short, long)]
        year: i32,
    },
    /// Drivers classified in an event's race
    Drivers {
        #[arg(short, long)]
        year: i32,
        #[arg(short, long)]
        event: String,
    },
    /// Lap times of a driver over one or more races
    Laps {
        #[arg(short, long)]
        year: i32,
        #[arg(short, long)]
        driver: String,
        /// Races to include, defaults to the season opener
        #[arg(short, long, num_args = 1..)]
        races: Vec<String>,
    },
    /// Lap times at a circuit across seasons
    Circuit {
        #[arg(short, long)]
        circuit: String,
        #[arg(short, long, num_args = 1.., required = true)]
        years: Vec<i32>,
    },
    /// Tyre stints of a race
    Stints {
        #[arg(short, long)]
        year: i32,
        #[arg(short, long)]
        event: String,
    },
    /// Team points over a season
    TeamPoints {
        #[arg(short, long)]
        year: i32,
    },
    /// Speed, throttle and brake over the fastest laps of two drivers
    Telemetry {
        #[arg(short, long)]
        year: i32,
        #[arg(short, long)]
        event: String,
        #[arg(short, long, default_value = "R")]
        session: SessionType,
        driver_a: String,
        driver_b: String,
    },
    /// Profile of a driver
    Profile {
        #[arg(short, long)]
        year: i32,
        #[arg(short, long)]
        driver: String,
    },
}

fn load_config(path: Option<&PathBuf>) -> Result<EngineConfig, PaddockError> {
    match path {
        Some(path) => {
            EngineConfig::from_file(path)?.ok_or_else(|| PaddockError::ConfigNotFound {
                path: path.display().to_string(),
            })
        }
        None => Ok(EngineConfig::from_local_file()?.unwrap_or_default()),
    }
}

fn print_json<T: Serialize>(value: &T) {
    match serde_json::to_string_pretty(value) {
        Ok(json) => println!("{}", json),
        Err(e) => error!("Could not serialize output: {}", e),
    }
}

fn run(args: Args) -> Result<(), PaddockError> {
    let config = load_config(args.config.as_ref())?;
    let paddock = Paddock::from_config(&config)?;
    let analysis = paddock.analysis();

    match args.command {
        Commands::Schedule { year } => print_json(&analysis.season_events(year)),
        Commands::Drivers { year, event } => print_json(&analysis.event_drivers(year, &event)),
        Commands::Laps {
            year,
            driver,
            mut races,
        } => {
            if races.is_empty() {
                match analysis.season_events(year).into_iter().next() {
                    Some(opener) => races.push(opener.name),
                    None => warn!("No events found for {}", year),
                }
            }
            print_json(&analysis.driver_lap_times(year, &driver.to_uppercase(), &races))
        }
        Commands::Circuit { circuit, years } => {
            print_json(&analysis.circuit_lap_times(&circuit, &years))
        }
        Commands::Stints { year, event } => print_json(&analysis.tyre_stints(year, &event)),
        Commands::TeamPoints { year } => print_json(&analysis.team_points(year).ranked()),
        Commands::Telemetry {
            year,
            event,
            session,
            driver_a,
            driver_b,
        } => print_json(&analysis.compare_fastest_laps(
            year,
            &event,
            session,
            &driver_a.to_uppercase(),
            &driver_b.to_uppercase(),
        )),
        Commands::Profile { year, driver } => {
            print_json(&paddock.driver_profile(year, &driver.to_uppercase()))
        }
    }
    Ok(())
}

fn main() {
    #[cfg(debug_assertions)]
    colog::init();

    let args = Args::parse();
    ctrlc::set_handler(move || {
        println!("Exiting...");
        std::process::exit(0);
    })
    .expect("Could not set Ctrl-C handler");

    if let Err(e) = run(args) {
        error!("{}", e);
        std::process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;
    use tempfile::TempDir;

    #[test]
    fn test_cli_definition() {
        Args::command().debug_assert();
    }

    #[test]
    fn test_circuit_flags_with_config() {
        let args = Args::try_parse_from([
            "paddock",
            "circuit",
            "-c",
            "Monza",
            "-y",
            "2022",
            "2023",
            "--config",
            "paddock.json",
        ])
        .unwrap();

        assert_eq!(args.config, Some(PathBuf::from("paddock.json")));
        match args.command {
            Commands::Circuit { circuit, years } => {
                assert_eq!(circuit, "Monza");
                assert_eq!(years, vec![2022, 2023]);
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_telemetry_session_type() {
        let args = Args::try_parse_from([
            "paddock", "telemetry", "-y", "2023", "-e", "Monza", "-s", "Q", "ver", "lec",
        ])
        .unwrap();

        match args.command {
            Commands::Telemetry { session, .. } => assert_eq!(session, SessionType::Qualifying),
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_named_config_must_exist() {
        let temp_dir = TempDir::new().unwrap();
        let missing = temp_dir.path().join("missing.json");

        assert!(matches!(
            load_config(Some(&missing)),
            Err(PaddockError::ConfigNotFound { .. })
        ));
    }

    #[test]
    fn test_named_config_is_loaded() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("paddock.json");
        std::fs::write(&path, r#"{"fetch_workers": 2}"#).unwrap();

        let config = load_config(Some(&path)).unwrap();
        assert_eq!(config.fetch_workers, 2);
    }
}
