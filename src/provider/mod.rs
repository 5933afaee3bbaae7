// Session data providers and the remote sources used for driver metadata

pub mod ergast;
pub mod http;
pub mod openf1;
pub mod wikipedia;

use crate::errors::ProviderError;
use crate::session::{EventInfo, Session, SessionKey};

pub use ergast::{ErgastDriverDirectory, ErgastProvider};
pub use http::{HttpClient, ReqwestClient};
pub use openf1::OpenF1Enrichment;
pub use wikipedia::WikipediaImageLookup;

/// Source of season schedules and session data.
///
/// Implementations perform blocking network I/O and are shared between the
/// fetch workers, so they must be `Send + Sync`.
pub trait SessionProvider: Send + Sync {
    /// Events of a season in chronological order.
    fn event_schedule(
        &self,
        year: i32,
        include_testing: bool,
    ) -> Result<Vec<EventInfo>, ProviderError>;

    /// Loads laps, results and telemetry for one session.
    fn load_session(&self, key: &SessionKey) -> Result<Session, ProviderError>;
}

/// Matches an event by round number, exact name, or a case-insensitive
/// fragment of its name, country or locality.
pub(crate) fn find_event<'a>(schedule: &'a [EventInfo], event: &str) -> Option<&'a EventInfo> {
    let needle = event.trim().to_lowercase();
    if let Ok(round) = needle.parse::<u32>() {
        return schedule.iter().find(|e| e.round == round);
    }
    schedule
        .iter()
        .find(|e| e.name.to_lowercase() == needle)
        .or_else(|| {
            schedule.iter().find(|e| {
                e.name.to_lowercase().contains(&needle)
                    || e.country
                        .as_ref()
                        .is_some_and(|c| c.to_lowercase().contains(&needle))
                    || e.location
                        .as_ref()
                        .is_some_and(|l| l.to_lowercase().contains(&needle))
            })
        })
}
