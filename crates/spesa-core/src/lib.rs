pub mod app_config;
pub mod config;
pub mod directory;
pub mod matching;
pub mod products;
pub mod stores;

use thiserror::Error;

pub use app_config::{AppConfig, Environment};
pub use config::{load_app_config, load_app_config_from_env};
pub use directory::{
    DirectoryError, HarvestTarget, ResolutionRequest, StoreDirectory, StoreEntry,
    StreetDirectory, StreetEntry,
};
pub use matching::{
    CandidateScore, MatchResult, ResolutionOutcome, ResolutionPath, UnresolvedReason,
};
pub use products::{Catalog, PricedProduct, ProductMap, Promotion, RawProduct};
pub use stores::{
    Candidate, Coordinates, DriveId, ServiceFlags, ServiceMode, StoreContext, StoreRef, StreetId,
};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("invalid value for {var}: {reason}")]
    InvalidEnvVar { var: String, reason: String },
}
