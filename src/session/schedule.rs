use std::sync::Arc;

use log::warn;

use super::EventInfo;
use crate::{errors::PaddockError, provider::SessionProvider};

/// Resolves a season to its chronologically ordered events.
pub struct ScheduleResolver {
    provider: Arc<dyn SessionProvider>,
}

impl ScheduleResolver {
    pub fn new(provider: Arc<dyn SessionProvider>) -> Self {
        Self { provider }
    }

    /// Championship events of `year`, testing excluded, sorted by round.
    pub fn events_for(&self, year: i32) -> Result<Vec<EventInfo>, PaddockError> {
        let mut events = self
            .provider
            .event_schedule(year, false)
            .map_err(|e| {
                warn!("Unable to load the {} event schedule: {}", year, e);
                PaddockError::ScheduleUnavailable { year, source: e }
            })?;
        events.sort_by_key(|e| e.round);
        Ok(events)
    }

    /// The opening event of the season, if the season has any.
    pub fn first_event(&self, year: i32) -> Result<Option<EventInfo>, PaddockError> {
        Ok(self.events_for(year)?.into_iter().next())
    }
}
