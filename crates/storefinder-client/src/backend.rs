//! HTTP client for the store finder backend.
//!
//! Covers the three endpoints the client core consumes: the places proxy
//! (`/api/nearbyStores`), the saved-store geo query (`/api/stores/nearby`) and
//! the save endpoint (`POST /api/stores`).

use std::time::Duration;

use reqwest::{Client, StatusCode, Url};
use storefinder_core::{Coordinate, NewStore, PlaceResult, StoreDocument};

use crate::error::ClientError;
use crate::fetch::fetch_array;

/// Result of a save request.
#[derive(Debug, Clone, PartialEq)]
pub enum SaveOutcome {
    /// The store was created.
    Saved(StoreDocument),
    /// A store with the same `placeId` already exists. Carries the stored
    /// document when the backend returned one.
    AlreadySaved(Option<StoreDocument>),
}

impl SaveOutcome {
    #[must_use]
    pub fn is_new(&self) -> bool {
        matches!(self, Self::Saved(_))
    }
}

/// Client for the backend service.
///
/// Cheap to clone; clones share the connection pool.
#[derive(Debug, Clone)]
pub struct BackendClient {
    client: Client,
    base_url: Url,
}

impl BackendClient {
    /// Creates a client for the backend at `base_url`.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Http`] if the underlying `reqwest::Client`
    /// cannot be constructed, or [`ClientError::InvalidBaseUrl`] if
    /// `base_url` is not a valid URL.
    pub fn new(base_url: &str, timeout_secs: u64) -> Result<Self, ClientError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .connect_timeout(Duration::from_secs(10))
            .user_agent(concat!("storefinder/", env!("CARGO_PKG_VERSION")))
            .build()?;

        // Exactly one trailing slash so relative joins append to the path.
        let normalised = format!("{}/", base_url.trim_end_matches('/'));
        let base_url = Url::parse(&normalised).map_err(|e| ClientError::InvalidBaseUrl {
            url: base_url.to_owned(),
            reason: e.to_string(),
        })?;

        Ok(Self { client, base_url })
    }

    #[must_use]
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Places-provider results near `location`, at most `limit` of them.
    ///
    /// # Errors
    ///
    /// See [`ClientError`]; a body that is not an array is an empty result.
    pub async fn nearby_places(
        &self,
        location: Coordinate,
        limit: u32,
    ) -> Result<Vec<PlaceResult>, ClientError> {
        let url = self.nearby_places_url(location, limit)?;
        tracing::debug!(url = %url, "fetching nearby places");
        fetch_array(&self.client, &url).await
    }

    /// Saved stores within `max_distance_m` metres of `location`.
    ///
    /// # Errors
    ///
    /// See [`ClientError`]; a body that is not an array is an empty result.
    pub async fn nearby_saved(
        &self,
        location: Coordinate,
        max_distance_m: u32,
    ) -> Result<Vec<StoreDocument>, ClientError> {
        let url = self.nearby_saved_url(location, max_distance_m)?;
        tracing::debug!(url = %url, "fetching nearby saved stores");
        fetch_array(&self.client, &url).await
    }

    /// All saved stores, newest first.
    ///
    /// # Errors
    ///
    /// See [`ClientError`].
    pub async fn saved_stores(&self, limit: Option<u32>) -> Result<Vec<StoreDocument>, ClientError> {
        let params = limit.map(|l| ("limit", l.to_string()));
        let url = self.endpoint("api/stores", params.as_slice())?;
        fetch_array(&self.client, &url).await
    }

    /// Persists `store`.
    ///
    /// # Errors
    ///
    /// - [`ClientError::Http`] on transport failure.
    /// - [`ClientError::UnexpectedStatus`] for any status other than 200, 201
    ///   or 409.
    /// - [`ClientError::Deserialize`] when a 201 body is not a store document.
    pub async fn save_store(&self, store: &NewStore) -> Result<SaveOutcome, ClientError> {
        let url = self.endpoint("api/stores", &[])?;
        let response = self.client.post(url.clone()).json(store).send().await?;
        let status = response.status();
        let body = response.text().await?;

        match status {
            StatusCode::CREATED => {
                let doc = serde_json::from_str(&body).map_err(|e| ClientError::Deserialize {
                    context: url.to_string(),
                    source: e,
                })?;
                tracing::info!(place_id = %store.place_id, "store saved");
                Ok(SaveOutcome::Saved(doc))
            }
            StatusCode::OK | StatusCode::CONFLICT => {
                tracing::info!(place_id = %store.place_id, "store already saved");
                Ok(SaveOutcome::AlreadySaved(serde_json::from_str(&body).ok()))
            }
            other => Err(ClientError::UnexpectedStatus {
                status: other.as_u16(),
                url: url.to_string(),
            }),
        }
    }

    fn nearby_places_url(&self, location: Coordinate, limit: u32) -> Result<Url, ClientError> {
        self.endpoint(
            "api/nearbyStores",
            &[
                ("lat", location.lat.to_string()),
                ("lng", location.lng.to_string()),
                ("limit", limit.to_string()),
            ],
        )
    }

    fn nearby_saved_url(&self, location: Coordinate, max_distance_m: u32) -> Result<Url, ClientError> {
        self.endpoint(
            "api/stores/nearby",
            &[
                ("lat", location.lat.to_string()),
                ("lng", location.lng.to_string()),
                ("maxDistance", max_distance_m.to_string()),
            ],
        )
    }

    fn endpoint(&self, path: &str, params: &[(&str, String)]) -> Result<Url, ClientError> {
        let mut url = self
            .base_url
            .join(path)
            .map_err(|e| ClientError::InvalidBaseUrl {
                url: self.base_url.to_string(),
                reason: e.to_string(),
            })?;
        if !params.is_empty() {
            let mut pairs = url.query_pairs_mut();
            for (k, v) in params {
                pairs.append_pair(k, v);
            }
        }
        Ok(url)
    }
}
