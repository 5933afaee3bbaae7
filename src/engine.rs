// Wiring of the provider, cache, fetcher, analytics and driver resolver

use std::{sync::Arc, time::Duration};

use log::info;

use crate::{
    PaddockError,
    analysis::SessionAnalysis,
    config::EngineConfig,
    driver::{DriverMetadataResolver, DriverProfile, ImageSource, MetadataSource},
    provider::{
        ErgastDriverDirectory, ErgastProvider, HttpClient, OpenF1Enrichment, ReqwestClient,
        SessionProvider, WikipediaImageLookup,
    },
    session::{ParallelFetcher, ScheduleResolver, SessionCache},
};

/// Everything a front end needs: chart data through [`SessionAnalysis`] and
/// driver profiles through [`DriverMetadataResolver`], sharing one session cache.
pub struct Paddock {
    cache: Arc<SessionCache>,
    analysis: SessionAnalysis,
    drivers: DriverMetadataResolver,
}

impl Paddock {
    /// Builds the engine against the remote services named in `config`.
    pub fn from_config(config: &EngineConfig) -> Result<Self, PaddockError> {
        let provider_client: Arc<dyn HttpClient> = Arc::new(ReqwestClient::with_timeout(
            Duration::from_secs(config.provider_timeout_s),
            &config.user_agent,
        )?);
        let metadata_client: Arc<dyn HttpClient> = Arc::new(ReqwestClient::with_timeout(
            Duration::from_secs(config.metadata_timeout_s),
            &config.user_agent,
        )?);

        info!(
            "Using session provider at {}, cache capacity {}, {} fetch workers",
            config.provider_base_url, config.cache_capacity, config.fetch_workers
        );
        let ergast: Arc<dyn SessionProvider> = Arc::new(ErgastProvider::new(
            provider_client.clone(),
            config.provider_base_url.as_str(),
        ));
        let provider: Arc<dyn SessionProvider> = match &config.enrichment_base_url {
            Some(url) => {
                info!("Adding tyre stints and car data from {}", url);
                Arc::new(OpenF1Enrichment::new(ergast, provider_client, url.as_str()))
            }
            None => ergast,
        };

        Self::with_sources(
            provider,
            Arc::new(ErgastDriverDirectory::new(
                metadata_client.clone(),
                config.metadata_base_url.as_str(),
            )),
            Arc::new(WikipediaImageLookup::new(
                metadata_client,
                config.image_base_url.as_str(),
            )),
            config,
        )
    }

    /// Builds the engine around explicit sources.
    pub fn with_sources(
        provider: Arc<dyn SessionProvider>,
        metadata: Arc<dyn MetadataSource>,
        images: Arc<dyn ImageSource>,
        config: &EngineConfig,
    ) -> Result<Self, PaddockError> {
        let cache = Arc::new(SessionCache::new(provider.clone(), config.cache_capacity));
        let schedule = Arc::new(ScheduleResolver::new(provider));
        let fetcher = Arc::new(ParallelFetcher::new(cache.clone(), config.fetch_workers)?);

        Ok(Self {
            analysis: SessionAnalysis::new(fetcher, schedule.clone()),
            drivers: DriverMetadataResolver::standard(schedule, cache.clone(), metadata, images),
            cache,
        })
    }

    pub fn analysis(&self) -> &SessionAnalysis {
        &self.analysis
    }

    pub fn cache(&self) -> &Arc<SessionCache> {
        &self.cache
    }

    pub fn driver_profile(&self, year: i32, abbreviation: &str) -> DriverProfile {
        self.drivers.resolve(year, abbreviation)
    }
}
