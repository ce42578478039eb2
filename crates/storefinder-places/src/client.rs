//! HTTP client for the Google Places nearby-search endpoint.
//!
//! Wraps `reqwest` with the provider's status envelope, an in-process result
//! cache and retry on transient failures. Use [`PlacesClient::new`] for
//! production or [`PlacesClient::with_base_url`] to point at a mock server.

use std::time::Duration;

use reqwest::{Client, Url};
use serde::Deserialize;
use storefinder_core::{AppConfig, Coordinate, PlaceResult};

use crate::cache::TtlCache;
use crate::error::PlacesError;
use crate::retry::retry_with_backoff;

const DEFAULT_BASE_URL: &str = "https://maps.googleapis.com/maps/api/place/";
const DEFAULT_BACKOFF_BASE_MS: u64 = 500;

/// Search and transport settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlacesOptions {
    pub keyword: String,
    pub radius_m: u32,
    pub cache_ttl: Duration,
    pub timeout_secs: u64,
    pub max_retries: u32,
    pub backoff_base_ms: u64,
}

impl Default for PlacesOptions {
    fn default() -> Self {
        Self {
            keyword: "guitar".to_owned(),
            radius_m: 5000,
            cache_ttl: Duration::from_secs(600),
            timeout_secs: 30,
            max_retries: 2,
            backoff_base_ms: DEFAULT_BACKOFF_BASE_MS,
        }
    }
}

impl From<&AppConfig> for PlacesOptions {
    fn from(config: &AppConfig) -> Self {
        Self {
            keyword: config.places_keyword.clone(),
            radius_m: config.places_radius_m,
            cache_ttl: Duration::from_secs(config.places_cache_ttl_secs),
            timeout_secs: config.places_timeout_secs,
            max_retries: config.places_max_retries,
            backoff_base_ms: DEFAULT_BACKOFF_BASE_MS,
        }
    }
}

#[derive(Debug, Deserialize)]
struct NearbySearchResponse {
    status: String,
    #[serde(default)]
    results: Vec<serde_json::Value>,
    #[serde(default)]
    error_message: Option<String>,
}

/// Client for the places nearby search.
pub struct PlacesClient {
    client: Client,
    api_key: String,
    base_url: Url,
    options: PlacesOptions,
    cache: TtlCache<Vec<PlaceResult>>,
}

impl std::fmt::Debug for PlacesClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PlacesClient")
            .field("base_url", &self.base_url.as_str())
            .field("api_key", &"[redacted]")
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

impl PlacesClient {
    /// Creates a client pointed at the production Places API.
    ///
    /// # Errors
    ///
    /// Returns [`PlacesError::Http`] if the underlying `reqwest::Client`
    /// cannot be constructed.
    pub fn new(api_key: &str, options: PlacesOptions) -> Result<Self, PlacesError> {
        Self::with_base_url(api_key, DEFAULT_BASE_URL, options)
    }

    /// Creates a client with a custom base URL (for testing with wiremock).
    ///
    /// # Errors
    ///
    /// Returns [`PlacesError::Http`] if the underlying `reqwest::Client`
    /// cannot be constructed, or [`PlacesError::InvalidBaseUrl`] if
    /// `base_url` is not a valid URL.
    pub fn with_base_url(
        api_key: &str,
        base_url: &str,
        options: PlacesOptions,
    ) -> Result<Self, PlacesError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(options.timeout_secs))
            .connect_timeout(Duration::from_secs(10))
            .user_agent(concat!("storefinder/", env!("CARGO_PKG_VERSION")))
            .build()?;

        // Exactly one trailing slash so `join` appends to the path.
        let normalised = format!("{}/", base_url.trim_end_matches('/'));
        let base_url = Url::parse(&normalised).map_err(|e| PlacesError::InvalidBaseUrl {
            url: base_url.to_owned(),
            reason: e.to_string(),
        })?;

        Ok(Self {
            client,
            api_key: api_key.to_owned(),
            base_url,
            cache: TtlCache::new(options.cache_ttl),
            options,
        })
    }

    /// Builds a client from server configuration.
    ///
    /// Returns `Ok(None)` when no API key is configured.
    ///
    /// # Errors
    ///
    /// See [`PlacesClient::with_base_url`].
    pub fn from_app_config(config: &AppConfig) -> Result<Option<Self>, PlacesError> {
        let Some(api_key) = config.google_maps_api_key.as_deref() else {
            return Ok(None);
        };
        Self::with_base_url(api_key, &config.places_base_url, PlacesOptions::from(config)).map(Some)
    }

    #[must_use]
    pub fn options(&self) -> &PlacesOptions {
        &self.options
    }

    /// Places matching the configured keyword around `location`.
    ///
    /// Served from the cache when a live entry exists for the same location
    /// and keyword. `ZERO_RESULTS` is an empty list.
    ///
    /// # Errors
    ///
    /// - [`PlacesError::UnexpectedStatus`] on a non-2xx response.
    /// - [`PlacesError::ApiStatus`] when the provider rejects the search.
    /// - [`PlacesError::Http`] on network failure.
    /// - [`PlacesError::Deserialize`] if the body is not a search response.
    pub async fn nearby(&self, location: Coordinate) -> Result<Vec<PlaceResult>, PlacesError> {
        let cache_key = format!("{location},{}", self.options.keyword);
        if let Some(cached) = self.cache.get(&cache_key) {
            tracing::debug!(key = %cache_key, count = cached.len(), "places cache hit");
            return Ok(cached);
        }

        let url = self.nearby_url(location)?;
        let results = retry_with_backoff(
            self.options.max_retries,
            self.options.backoff_base_ms,
            || self.search(&url),
        )
        .await?;

        tracing::info!(key = %cache_key, count = results.len(), "places search complete");
        self.cache.insert(cache_key, results.clone());
        Ok(results)
    }

    fn nearby_url(&self, location: Coordinate) -> Result<Url, PlacesError> {
        let mut url = self
            .base_url
            .join("nearbysearch/json")
            .map_err(|e| PlacesError::InvalidBaseUrl {
                url: self.base_url.to_string(),
                reason: e.to_string(),
            })?;
        url.query_pairs_mut()
            .append_pair("location", &location.to_string())
            .append_pair("radius", &self.options.radius_m.to_string())
            .append_pair("keyword", &self.options.keyword)
            .append_pair("key", &self.api_key);
        Ok(url)
    }

    async fn search(&self, url: &Url) -> Result<Vec<PlaceResult>, PlacesError> {
        let response = self.client.get(url.clone()).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(PlacesError::UnexpectedStatus {
                status: status.as_u16(),
            });
        }

        let body = response.text().await?;
        let envelope: NearbySearchResponse =
            serde_json::from_str(&body).map_err(|e| PlacesError::Deserialize {
                context: "nearbysearch".to_owned(),
                source: e,
            })?;

        match envelope.status.as_str() {
            "OK" => Ok(envelope
                .results
                .into_iter()
                .filter_map(|value| match serde_json::from_value::<PlaceResult>(value) {
                    Ok(place) => Some(place),
                    Err(e) => {
                        tracing::debug!(error = %e, "skipping malformed place result");
                        None
                    }
                })
                .collect()),
            "ZERO_RESULTS" => Ok(Vec::new()),
            _ => {
                tracing::error!(
                    status = %envelope.status,
                    message = envelope.error_message.as_deref().unwrap_or_default(),
                    "places API error"
                );
                Err(PlacesError::ApiStatus {
                    status: envelope.status,
                    message: envelope.error_message.unwrap_or_default(),
                })
            }
        }
    }
}
