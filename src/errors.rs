// Error types for paddock

use crate::session::SessionType;
use snafu::Snafu;
use std::io;

/// Failures raised while talking to a session data provider.
///
/// The type is cloneable because a single failed load is handed to every
/// caller that was waiting on the same in-flight request.
#[derive(Debug, Clone, PartialEq, Snafu)]
pub enum ProviderError {
    // Transport errors
    #[snafu(display("Request to {url} failed: {reason}"))]
    Http { url: String, reason: String },
    #[snafu(display("HTTP {status} from {url}"))]
    HttpStatus { url: String, status: u16 },
    #[snafu(display("Could not decode response from {url}: {reason}"))]
    Decode { url: String, reason: String },

    // Lookup errors
    #[snafu(display("No event named '{event}' in the {year} season"))]
    UnknownEvent { year: i32, event: String },
    #[snafu(display("Session type {session_type} is not published by this provider"))]
    UnsupportedSession { session_type: SessionType },

    // Worker pool errors
    #[snafu(display("Fetch worker panicked while loading {key}"))]
    WorkerLost { key: String },
}

#[derive(Debug, Snafu)]
pub enum PaddockError {
    // Errors for the session provider
    #[snafu(display("Session provider error"))]
    Provider { source: ProviderError },
    #[snafu(display("Unable to load the {year} event schedule"))]
    ScheduleUnavailable { year: i32, source: ProviderError },

    // Errors for the driver metadata sources
    #[snafu(display("Driver metadata unavailable from {source_name}: {reason}"))]
    MetadataUnavailable { source_name: String, reason: String },

    // Errors while building the fetch worker pool
    #[snafu(display("Could not start fetch worker pool: {reason}"))]
    WorkerPool { reason: String },

    // Config management errors
    #[snafu(display("Could not find application config directory to save config file"))]
    NoConfigDir,
    #[snafu(display("Config file {path} does not exist"))]
    ConfigNotFound { path: String },
    #[snafu(display("Error reading or writing config file"))]
    ConfigIOError { source: io::Error },
    #[snafu(display("Error serializing config file"))]
    ConfigSerializeError { source: serde_json::Error },
}

impl From<ProviderError> for PaddockError {
    fn from(value: ProviderError) -> Self {
        PaddockError::Provider { source: value }
    }
}
