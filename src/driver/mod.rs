// Driver profile resolution.
//
// A profile is assembled from an ordered list of resolver steps. Every step
// returns a partial profile; partials are merged left to right and the first
// non-empty value of each field wins. A failing step contributes nothing.

pub mod fallback;

use std::sync::Arc;

use chrono::NaiveDate;
use log::{debug, warn};
use serde::{Deserialize, Serialize};

use crate::{
    errors::PaddockError,
    session::{ScheduleResolver, SessionCache, SessionKey},
};

pub use fallback::StaticTable;

/// Partial driver profile produced by one resolver step.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfilePatch {
    pub name: Option<String>,
    pub team: Option<String>,
    pub nationality: Option<String>,
    pub date_of_birth: Option<NaiveDate>,
    pub image: Option<String>,
}

impl ProfilePatch {
    /// Keeps every field already set and takes the rest from `later`.
    pub fn merge(self, later: ProfilePatch) -> ProfilePatch {
        ProfilePatch {
            name: self.name.or(later.name),
            team: self.team.or(later.team),
            nationality: self.nationality.or(later.nationality),
            date_of_birth: self.date_of_birth.or(later.date_of_birth),
            image: self.image.or(later.image),
        }
    }

    pub fn is_complete(&self) -> bool {
        self.name.is_some()
            && self.team.is_some()
            && self.nationality.is_some()
            && self.date_of_birth.is_some()
            && self.image.is_some()
    }

    pub fn into_profile(self, year: i32) -> DriverProfile {
        DriverProfile {
            age: self.date_of_birth.and_then(|dob| age_at_season_end(dob, year)),
            name: self.name,
            image: self.image,
            nationality: self.nationality,
            team: self.team,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DriverProfile {
    pub name: Option<String>,
    pub image: Option<String>,
    pub age: Option<u32>,
    pub nationality: Option<String>,
    pub team: Option<String>,
}

/// Whole 365-day periods between `dob` and December 31st of `year`.
///
/// Leap days are not accounted for, so the result can be a year above the
/// calendar age for birthdays close to the new year. Birth dates after the end
/// of the season give no age.
pub fn age_at_season_end(dob: NaiveDate, year: i32) -> Option<u32> {
    let season_end = NaiveDate::from_ymd_opt(year, 12, 31)?;
    let days = (season_end - dob).num_days();
    u32::try_from(days.div_euclid(365)).ok()
}

/// One source in the profile fallback chain.
pub trait ResolverStep: Send + Sync {
    fn name(&self) -> &'static str;

    /// Looks up what this source knows about the driver. `resolved` holds the
    /// fields filled by earlier steps.
    fn resolve(
        &self,
        year: i32,
        abbreviation: &str,
        resolved: &ProfilePatch,
    ) -> Result<ProfilePatch, PaddockError>;
}

/// Remote driver metadata keyed by driver abbreviation.
pub trait MetadataSource: Send + Sync {
    fn name(&self) -> &'static str;
    fn lookup(&self, year: i32, abbreviation: &str) -> Result<ProfilePatch, PaddockError>;
}

/// Remote portrait lookup keyed by driver name.
pub trait ImageSource: Send + Sync {
    fn name(&self) -> &'static str;
    fn image_for(&self, driver_name: &str) -> Result<Option<String>, PaddockError>;
}

/// Name and team from the driver's classification at the season opener.
pub struct SeasonOpenerStep {
    schedule: Arc<ScheduleResolver>,
    cache: Arc<SessionCache>,
}

impl SeasonOpenerStep {
    pub fn new(schedule: Arc<ScheduleResolver>, cache: Arc<SessionCache>) -> Self {
        Self { schedule, cache }
    }
}

impl ResolverStep for SeasonOpenerStep {
    fn name(&self) -> &'static str {
        "season opener results"
    }

    fn resolve(
        &self,
        year: i32,
        abbreviation: &str,
        _resolved: &ProfilePatch,
    ) -> Result<ProfilePatch, PaddockError> {
        let Some(event) = self.schedule.first_event(year)? else {
            return Ok(ProfilePatch::default());
        };
        let session = self.cache.get(&SessionKey::race(year, event.name))?;
        let Some(result) = session.result_for(abbreviation) else {
            return Ok(ProfilePatch::default());
        };
        Ok(ProfilePatch {
            name: result.full_name.clone(),
            team: Some(result.team_name.clone()).filter(|t| !t.is_empty()),
            ..ProfilePatch::default()
        })
    }
}

/// Nationality, date of birth and name from a metadata service.
pub struct MetadataServiceStep(pub Arc<dyn MetadataSource>);

impl ResolverStep for MetadataServiceStep {
    fn name(&self) -> &'static str {
        self.0.name()
    }

    fn resolve(
        &self,
        year: i32,
        abbreviation: &str,
        _resolved: &ProfilePatch,
    ) -> Result<ProfilePatch, PaddockError> {
        let patch = self.0.lookup(year, abbreviation)?;
        Ok(ProfilePatch {
            name: patch.name,
            nationality: patch.nationality,
            date_of_birth: patch.date_of_birth,
            ..ProfilePatch::default()
        })
    }
}

/// Portrait for the name resolved so far. Needs a name from an earlier step.
pub struct ImageLookupStep(pub Arc<dyn ImageSource>);

impl ResolverStep for ImageLookupStep {
    fn name(&self) -> &'static str {
        self.0.name()
    }

    fn resolve(
        &self,
        _year: i32,
        _abbreviation: &str,
        resolved: &ProfilePatch,
    ) -> Result<ProfilePatch, PaddockError> {
        let Some(name) = resolved.name.as_deref() else {
            return Ok(ProfilePatch::default());
        };
        Ok(ProfilePatch {
            image: self.0.image_for(name)?,
            ..ProfilePatch::default()
        })
    }
}

pub struct DriverMetadataResolver {
    steps: Vec<Box<dyn ResolverStep>>,
}

impl DriverMetadataResolver {
    /// Resolver consulting `steps` in order.
    pub fn new(steps: Vec<Box<dyn ResolverStep>>) -> Self {
        Self { steps }
    }

    /// The standard chain: season opener results, metadata service, image
    /// lookup, then the static table.
    pub fn standard(
        schedule: Arc<ScheduleResolver>,
        cache: Arc<SessionCache>,
        metadata: Arc<dyn MetadataSource>,
        images: Arc<dyn ImageSource>,
    ) -> Self {
        Self::new(vec![
            Box::new(SeasonOpenerStep::new(schedule, cache)),
            Box::new(MetadataServiceStep(metadata)),
            Box::new(ImageLookupStep(images)),
            Box::new(StaticTable),
        ])
    }

    pub fn step_names(&self) -> Vec<&'static str> {
        self.steps.iter().map(|s| s.name()).collect()
    }

    /// Builds the profile of `abbreviation` for `year`. Never fails: fields no
    /// source could resolve are left empty.
    pub fn resolve(&self, year: i32, abbreviation: &str) -> DriverProfile {
        let mut resolved = ProfilePatch::default();
        for step in &self.steps {
            if resolved.is_complete() {
                break;
            }
            match step.resolve(year, abbreviation, &resolved) {
                Ok(patch) => {
                    debug!("{} resolved {:?} for {}", step.name(), patch, abbreviation);
                    resolved = resolved.merge(patch);
                }
                Err(e) => warn!(
                    "Ignoring {} for {} {}: {}",
                    step.name(),
                    year,
                    abbreviation,
                    e
                ),
            }
        }
        resolved.into_profile(year)
    }
}
