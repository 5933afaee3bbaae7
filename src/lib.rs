// Library interface for paddock
// This allows integration tests to access internal modules

pub mod analysis;
pub mod config;
pub mod driver;
pub mod engine;
pub mod errors;
pub mod provider;
pub mod session;

// Re-export commonly used types
pub use analysis::{
    LapTimeSeries, SessionAnalysis, StintRange, TeamPoints, TelemetryComparison,
};
pub use config::EngineConfig;
pub use driver::{DriverMetadataResolver, DriverProfile, ProfilePatch};
pub use engine::Paddock;
pub use errors::{PaddockError, ProviderError};
pub use provider::SessionProvider;
pub use session::{
    DriverResult, EventInfo, FetchOutcome, Lap, ParallelFetcher, ScheduleResolver, Session,
    SessionCache, SessionKey, SessionType,
};
