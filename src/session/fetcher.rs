//! Concurrent loading of many sessions through the shared cache.

use std::{
    panic::{self, AssertUnwindSafe},
    sync::{Arc, mpsc},
};

use log::{debug, warn};
use rayon::{ThreadPool, ThreadPoolBuilder};

use super::{Session, SessionCache, SessionKey};
use crate::errors::{PaddockError, ProviderError};

pub const DEFAULT_FETCH_WORKERS: usize = 4;

/// Result of loading one requested key.
#[derive(Debug, Clone)]
pub struct FetchOutcome {
    pub key: SessionKey,
    pub result: Result<Arc<Session>, ProviderError>,
}

impl FetchOutcome {
    pub fn session(&self) -> Option<&Arc<Session>> {
        self.result.as_ref().ok()
    }

    /// The key together with the session, or `None` when loading it failed.
    pub fn into_pair(self) -> (SessionKey, Option<Arc<Session>>) {
        (self.key, self.result.ok())
    }
}

/// Loads sessions on a fixed-size worker pool.
///
/// Each key becomes one task. Tasks report `(position, result)` over a channel
/// and the outcomes are slotted back by position, so the output lines up with
/// the input no matter which task finishes first. A failing key only affects
/// its own slot.
pub struct ParallelFetcher {
    cache: Arc<SessionCache>,
    pool: ThreadPool,
}

impl ParallelFetcher {
    pub fn new(cache: Arc<SessionCache>, workers: usize) -> Result<Self, PaddockError> {
        let pool = ThreadPoolBuilder::new()
            .num_threads(workers.max(1))
            .thread_name(|i| format!("session-fetch-{}", i))
            .build()
            .map_err(|e| PaddockError::WorkerPool {
                reason: e.to_string(),
            })?;
        Ok(Self { cache, pool })
    }

    pub fn cache(&self) -> &Arc<SessionCache> {
        &self.cache
    }

    pub fn fetch_many(&self, keys: &[SessionKey]) -> Vec<FetchOutcome> {
        let (tx, rx) = mpsc::channel::<(usize, Result<Arc<Session>, ProviderError>)>();

        self.pool.scope(|scope| {
            for (position, key) in keys.iter().enumerate() {
                let tx = tx.clone();
                let cache = &self.cache;
                scope.spawn(move |_| {
                    // a panicking provider costs only this key's slot
                    let result = panic::catch_unwind(AssertUnwindSafe(|| cache.get(key)))
                        .unwrap_or_else(|_| {
                            Err(ProviderError::WorkerLost {
                                key: key.to_string(),
                            })
                        });
                    // receiver outlives the scope
                    let _ = tx.send((position, result));
                });
            }
        });
        drop(tx);

        let mut slots: Vec<Option<Result<Arc<Session>, ProviderError>>> =
            (0..keys.len()).map(|_| None).collect();
        for (position, result) in rx {
            slots[position] = Some(result);
        }

        let outcomes: Vec<FetchOutcome> = keys
            .iter()
            .zip(slots)
            .map(|(key, slot)| {
                let result = slot.unwrap_or_else(|| {
                    Err(ProviderError::WorkerLost {
                        key: key.to_string(),
                    })
                });
                if let Err(e) = &result {
                    warn!("Skipping {}: {}", key, e);
                }
                FetchOutcome {
                    key: key.clone(),
                    result,
                }
            })
            .collect();

        debug!(
            "Fetched {} of {} sessions",
            outcomes.iter().filter(|o| o.result.is_ok()).count(),
            outcomes.len()
        );
        outcomes
    }

    /// Loaded sessions only, in input order, failures dropped.
    pub fn fetch_loaded(&self, keys: &[SessionKey]) -> Vec<Arc<Session>> {
        self.fetch_many(keys)
            .into_iter()
            .filter_map(|o| o.result.ok())
            .collect()
    }
}
