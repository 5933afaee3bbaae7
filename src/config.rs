use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::PaddockError;
use crate::provider::ergast::DEFAULT_ERGAST_BASE_URL;
use crate::provider::openf1::DEFAULT_OPENF1_BASE_URL;
use crate::provider::wikipedia::DEFAULT_WIKIPEDIA_SUMMARY_URL;
use crate::session::{DEFAULT_CACHE_CAPACITY, fetcher::DEFAULT_FETCH_WORKERS};

const CONFIG_FILE_NAME: &str = "config.json";

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct EngineConfig {
    /// Maximum number of loaded sessions kept in memory
    pub cache_capacity: u64,
    /// Size of the worker pool used for multi-session fetches
    pub fetch_workers: usize,
    pub provider_base_url: String,
    /// Source of tyre stints and car data, `null` to load sessions without them
    pub enrichment_base_url: Option<String>,
    pub provider_timeout_s: u64,
    pub metadata_base_url: String,
    pub image_base_url: String,
    /// Upper bound for each metadata or image request
    pub metadata_timeout_s: u64,
    pub user_agent: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            cache_capacity: DEFAULT_CACHE_CAPACITY,
            fetch_workers: DEFAULT_FETCH_WORKERS,
            provider_base_url: DEFAULT_ERGAST_BASE_URL.to_string(),
            enrichment_base_url: Some(DEFAULT_OPENF1_BASE_URL.to_string()),
            provider_timeout_s: 30,
            metadata_base_url: DEFAULT_ERGAST_BASE_URL.to_string(),
            image_base_url: DEFAULT_WIKIPEDIA_SUMMARY_URL.to_string(),
            metadata_timeout_s: 5,
            user_agent: format!("paddock/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

impl EngineConfig {
    pub fn default_path() -> Option<PathBuf> {
        Some(dirs::config_dir()?.join("paddock").join(CONFIG_FILE_NAME))
    }

    /// Reads the config from the user's config directory, if one was saved.
    pub fn from_local_file() -> Result<Option<Self>, PaddockError> {
        match Self::default_path() {
            Some(path) => Self::from_file(&path),
            None => Ok(None),
        }
    }

    pub fn from_file(config_path: &Path) -> Result<Option<Self>, PaddockError> {
        if !config_path.exists() {
            return Ok(None);
        }
        let file = std::fs::File::open(config_path)
            .map_err(|e| PaddockError::ConfigIOError { source: e })?;
        serde_json::from_reader(file)
            .map(Some)
            .map_err(|e| PaddockError::ConfigSerializeError { source: e })
    }

    pub fn save(&self) -> Result<(), PaddockError> {
        let config_path = Self::default_path().ok_or(PaddockError::NoConfigDir)?;
        self.save_to(&config_path)
    }

    pub fn save_to(&self, config_path: &Path) -> Result<(), PaddockError> {
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| PaddockError::ConfigIOError { source: e })?;
        }

        let file = std::fs::File::create(config_path)
            .map_err(|e| PaddockError::ConfigIOError { source: e })?;
        serde_json::to_writer_pretty(file, self)
            .map_err(|e| PaddockError::ConfigSerializeError { source: e })
    }
}
