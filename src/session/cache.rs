//! Memoized session loader.
//!
//! Loaded sessions are kept in a bounded `moka` cache with least-recently-used
//! eviction. Populating goes through `try_get_with`, which coalesces concurrent
//! requests for the same key into a single provider call: the first caller runs
//! the load, later callers block until it finishes and share its result. Failed
//! loads are not cached, so the next request retries from scratch.

use std::sync::{
    Arc,
    atomic::{AtomicU64, Ordering},
};

use log::{debug, warn};
use moka::{policy::EvictionPolicy, sync::Cache};

use super::{Session, SessionKey};
use crate::{errors::ProviderError, provider::SessionProvider};

pub const DEFAULT_CACHE_CAPACITY: u64 = 32;

/// Counters describing how the cache has been used so far.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    /// Number of times the provider was actually asked for a session
    pub provider_loads: u64,
}

pub struct SessionCache {
    provider: Arc<dyn SessionProvider>,
    entries: Cache<SessionKey, Arc<Session>>,
    hits: AtomicU64,
    misses: AtomicU64,
    provider_loads: AtomicU64,
}

impl SessionCache {
    pub fn new(provider: Arc<dyn SessionProvider>, capacity: u64) -> Self {
        let entries = Cache::builder()
            .max_capacity(capacity)
            .eviction_policy(EvictionPolicy::lru())
            .build();
        Self {
            provider,
            entries,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            provider_loads: AtomicU64::new(0),
        }
    }

    pub fn provider(&self) -> &Arc<dyn SessionProvider> {
        &self.provider
    }

    /// Returns the session for `key`, loading it on first use.
    pub fn get(&self, key: &SessionKey) -> Result<Arc<Session>, ProviderError> {
        if let Some(session) = self.entries.get(key) {
            self.hits.fetch_add(1, Ordering::Relaxed);
            return Ok(session);
        }
        self.misses.fetch_add(1, Ordering::Relaxed);
        debug!("Session cache miss for {}", key);
        self.entries
            .try_get_with(key.clone(), || self.populate(key))
            .map_err(Arc::unwrap_or_clone)
    }

    /// Forces a fresh provider call for `key`, replacing any memoized session.
    pub fn load(&self, key: &SessionKey) -> Result<Arc<Session>, ProviderError> {
        self.entries.invalidate(key);
        self.misses.fetch_add(1, Ordering::Relaxed);
        self.entries
            .try_get_with(key.clone(), || self.populate(key))
            .map_err(Arc::unwrap_or_clone)
    }

    fn populate(&self, key: &SessionKey) -> Result<Arc<Session>, ProviderError> {
        self.provider_loads.fetch_add(1, Ordering::Relaxed);
        match self.provider.load_session(key) {
            Ok(session) => {
                debug!(
                    "Loaded {}: {} laps, {} results",
                    key,
                    session.laps.len(),
                    session.results.len()
                );
                Ok(Arc::new(session))
            }
            Err(e) => {
                warn!("Could not load {}: {}", key, e);
                Err(e)
            }
        }
    }

    pub fn contains(&self, key: &SessionKey) -> bool {
        self.entries.contains_key(key)
    }

    /// Number of cached sessions, after applying any pending evictions.
    pub fn len(&self) -> u64 {
        self.entries.run_pending_tasks();
        self.entries.entry_count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            provider_loads: self.provider_loads.load(Ordering::Relaxed),
        }
    }
}
