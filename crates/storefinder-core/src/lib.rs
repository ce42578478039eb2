pub mod app_config;
pub mod config;
pub mod directions;
pub mod geo;
pub mod stores;
pub mod wire;

pub use app_config::{AppConfig, ClientConfig, Environment};
pub use config::{load_app_config, load_app_config_from_env, load_client_config};
pub use directions::directions_url;
pub use geo::{Coordinate, DEFAULT_CENTER};
pub use stores::{Provenance, StoreRecord};
pub use wire::{GeoPoint, NewStore, PlaceGeometry, PlaceResult, StoreDocument};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("invalid value for {var}: {reason}")]
    InvalidEnvVar { var: String, reason: String },
}
