use std::net::SocketAddr;
use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Environment {
    Development,
    Test,
    Production,
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Environment::Development => write!(f, "development"),
            Environment::Test => write!(f, "test"),
            Environment::Production => write!(f, "production"),
        }
    }
}

/// Settings for the backend store service.
#[derive(Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub env: Environment,
    pub bind_addr: SocketAddr,
    pub log_level: String,
    pub google_maps_api_key: Option<String>,
    pub db_max_connections: u32,
    pub db_min_connections: u32,
    pub db_acquire_timeout_secs: u64,
    pub places_base_url: String,
    pub places_keyword: String,
    pub places_radius_m: u32,
    pub places_cache_ttl_secs: u64,
    pub places_timeout_secs: u64,
    pub places_max_retries: u32,
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("env", &self.env)
            .field("bind_addr", &self.bind_addr)
            .field("log_level", &self.log_level)
            .field("database_url", &"[redacted]")
            .field(
                "google_maps_api_key",
                &self.google_maps_api_key.as_ref().map(|_| "[redacted]"),
            )
            .field("db_max_connections", &self.db_max_connections)
            .field("db_min_connections", &self.db_min_connections)
            .field("db_acquire_timeout_secs", &self.db_acquire_timeout_secs)
            .field("places_base_url", &self.places_base_url)
            .field("places_keyword", &self.places_keyword)
            .field("places_radius_m", &self.places_radius_m)
            .field("places_cache_ttl_secs", &self.places_cache_ttl_secs)
            .field("places_timeout_secs", &self.places_timeout_secs)
            .field("places_max_retries", &self.places_max_retries)
            .finish()
    }
}

/// Settings for the store finder client (aggregator, cache, tracker host).
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub backend_url: String,
    pub log_level: String,
    pub result_limit: u32,
    pub max_distance_m: u32,
    pub cache_ttl_secs: u64,
    pub debounce_ms: u64,
    pub request_timeout_secs: u64,
    pub cache_dir: PathBuf,
}
