//! Compiled-in driver facts used as the last step of profile resolution.
//!
//! The table is built on first access and then only read; it lives for the
//! rest of the process and needs no teardown.

use std::{collections::HashMap, sync::LazyLock};

use chrono::NaiveDate;

use super::{ProfilePatch, ResolverStep};
use crate::errors::PaddockError;

#[derive(Debug, Clone)]
pub struct StaticDriver {
    pub name: &'static str,
    pub nationality: &'static str,
    /// (year, month, day)
    pub date_of_birth: (i32, u32, u32),
    /// Team as of the 2024 season
    pub team: &'static str,
}

static DRIVERS: LazyLock<HashMap<&'static str, StaticDriver>> = LazyLock::new(|| {
    HashMap::from([
        (
            "VER",
            StaticDriver {
                name: "Max Verstappen",
                nationality: "Dutch",
                date_of_birth: (1997, 9, 30),
                team: "Red Bull Racing",
            },
        ),
        (
            "PER",
            StaticDriver {
                name: "Sergio Pérez",
                nationality: "Mexican",
                date_of_birth: (1990, 1, 26),
                team: "Red Bull Racing",
            },
        ),
        (
            "HAM",
            StaticDriver {
                name: "Lewis Hamilton",
                nationality: "British",
                date_of_birth: (1985, 1, 7),
                team: "Mercedes",
            },
        ),
        (
            "RUS",
            StaticDriver {
                name: "George Russell",
                nationality: "British",
                date_of_birth: (1998, 2, 15),
                team: "Mercedes",
            },
        ),
        (
            "LEC",
            StaticDriver {
                name: "Charles Leclerc",
                nationality: "Monegasque",
                date_of_birth: (1997, 10, 16),
                team: "Ferrari",
            },
        ),
        (
            "SAI",
            StaticDriver {
                name: "Carlos Sainz",
                nationality: "Spanish",
                date_of_birth: (1994, 9, 1),
                team: "Ferrari",
            },
        ),
        (
            "NOR",
            StaticDriver {
                name: "Lando Norris",
                nationality: "British",
                date_of_birth: (1999, 11, 13),
                team: "McLaren",
            },
        ),
        (
            "PIA",
            StaticDriver {
                name: "Oscar Piastri",
                nationality: "Australian",
                date_of_birth: (2001, 4, 6),
                team: "McLaren",
            },
        ),
        (
            "ALO",
            StaticDriver {
                name: "Fernando Alonso",
                nationality: "Spanish",
                date_of_birth: (1981, 7, 29),
                team: "Aston Martin",
            },
        ),
    ])
});

pub fn lookup(abbreviation: &str) -> Option<&'static StaticDriver> {
    DRIVERS.get(abbreviation.to_ascii_uppercase().as_str())
}

/// Resolver step backed by the static table.
pub struct StaticTable;

impl ResolverStep for StaticTable {
    fn name(&self) -> &'static str {
        "static table"
    }

    fn resolve(
        &self,
        _year: i32,
        abbreviation: &str,
        _resolved: &ProfilePatch,
    ) -> Result<ProfilePatch, PaddockError> {
        let Some(driver) = lookup(abbreviation) else {
            return Ok(ProfilePatch::default());
        };
        let (y, m, d) = driver.date_of_birth;
        Ok(ProfilePatch {
            name: Some(driver.name.to_string()),
            team: Some(driver.team.to_string()),
            nationality: Some(driver.nationality.to_string()),
            date_of_birth: NaiveDate::from_ymd_opt(y, m, d),
            image: None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_is_case_insensitive() {
        assert_eq!(lookup("ham").unwrap().name, "Lewis Hamilton");
        assert!(lookup("XYZ").is_none());
    }

    #[test]
    fn test_static_step_fills_known_driver() {
        let patch = StaticTable
            .resolve(2023, "LEC", &ProfilePatch::default())
            .unwrap();
        assert_eq!(patch.name.as_deref(), Some("Charles Leclerc"));
        assert_eq!(patch.date_of_birth, NaiveDate::from_ymd_opt(1997, 10, 16));
        assert_eq!(patch.image, None);
    }

    #[test]
    fn test_every_entry_has_a_valid_birth_date() {
        for (code, driver) in DRIVERS.iter() {
            let (y, m, d) = driver.date_of_birth;
            assert!(
                NaiveDate::from_ymd_opt(y, m, d).is_some(),
                "invalid date of birth for {}",
                code
            );
        }
    }
}
