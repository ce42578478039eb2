//! Merges places-provider results with saved stores into one list.
//!
//! The external branch is served from the [`StoreCache`] when fresh and from
//! the backend otherwise; the saved-store branch always goes to the backend.
//! Both branches run concurrently and a failure in one never blocks the other.

use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;

use storefinder_core::{ClientConfig, Coordinate, StoreRecord};
use tokio::sync::watch;

use crate::backend::{BackendClient, SaveOutcome};
use crate::cache::{KeyValueStore, StoreCache};
use crate::debounce::Debounce;
use crate::error::ClientError;

/// Observable aggregator state.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AggregatorState {
    /// Saved stores first, then provider results not already saved.
    pub stores: Vec<StoreRecord>,
    /// `true` once any fetch has completed.
    pub stores_fetched: bool,
    pub loading: bool,
    /// Message of the most recent branch failure in the last fetch.
    pub error: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AggregatorOptions {
    /// Maximum number of provider results requested.
    pub limit: u32,
    /// Radius for the saved-store query, in metres.
    pub max_distance_m: u32,
    pub debounce: Duration,
}

impl Default for AggregatorOptions {
    fn default() -> Self {
        Self {
            limit: 10,
            max_distance_m: 5000,
            debounce: Duration::from_millis(1000),
        }
    }
}

impl From<&ClientConfig> for AggregatorOptions {
    fn from(config: &ClientConfig) -> Self {
        Self {
            limit: config.result_limit,
            max_distance_m: config.max_distance_m,
            debounce: Duration::from_millis(config.debounce_ms),
        }
    }
}

struct Inner {
    backend: BackendClient,
    cache: StoreCache,
    options: AggregatorOptions,
    state: watch::Sender<AggregatorState>,
    debounce: Debounce<Coordinate>,
    /// Ticket of the most recently started fetch.
    generation: AtomicU64,
}

impl Inner {
    fn is_latest(&self, ticket: u64) -> bool {
        self.generation.load(Ordering::SeqCst) == ticket
    }
}

/// Resolves nearby stores for a position.
///
/// Cloning yields another handle to the same state, cache and debouncer.
#[derive(Clone)]
pub struct StoreAggregator {
    inner: Arc<Inner>,
}

impl std::fmt::Debug for StoreAggregator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StoreAggregator")
            .field("backend", &self.inner.backend.base_url().as_str())
            .field("cache", &self.inner.cache)
            .field("options", &self.inner.options)
            .finish_non_exhaustive()
    }
}

impl StoreAggregator {
    #[must_use]
    pub fn new(backend: BackendClient, cache: StoreCache, options: AggregatorOptions) -> Self {
        let (state, _) = watch::channel(AggregatorState::default());
        let inner = Arc::new_cyclic(|weak: &Weak<Inner>| {
            let weak = weak.clone();
            let debounce = Debounce::new(options.debounce, move |location: Coordinate| {
                let weak = weak.clone();
                async move {
                    if let Some(inner) = weak.upgrade() {
                        StoreAggregator { inner }.fetch_nearby(location).await;
                    }
                }
            });
            Inner {
                backend,
                cache,
                options,
                state,
                debounce,
                generation: AtomicU64::new(0),
            }
        });
        Self { inner }
    }

    /// Wires an aggregator from client configuration, caching provider
    /// results in `store`.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError`] when the backend client cannot be built.
    pub fn from_config(
        config: &ClientConfig,
        store: Arc<dyn KeyValueStore>,
    ) -> Result<Self, ClientError> {
        let backend = BackendClient::new(&config.backend_url, config.request_timeout_secs)?;
        let cache = StoreCache::new(store, config.result_limit)
            .with_ttl(Duration::from_secs(config.cache_ttl_secs));
        Ok(Self::new(backend, cache, AggregatorOptions::from(config)))
    }

    #[must_use]
    pub fn state(&self) -> AggregatorState {
        self.inner.state.borrow().clone()
    }

    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<AggregatorState> {
        self.inner.state.subscribe()
    }

    #[must_use]
    pub fn options(&self) -> AggregatorOptions {
        self.inner.options
    }

    /// Fetches both sources for `location` and publishes the merged list.
    ///
    /// Never fails: branch errors land in [`AggregatorState::error`] and the
    /// failed branch contributes no stores.
    ///
    /// When fetches overlap only the most recently started one publishes its
    /// result or writes the cache; `loading` stays set until it settles.
    pub async fn fetch_nearby(&self, location: Coordinate) {
        let ticket = self.inner.generation.fetch_add(1, Ordering::SeqCst) + 1;
        self.inner.state.send_modify(|state| {
            state.loading = true;
            state.error = None;
        });

        let (external, internal) = tokio::join!(
            self.external_stores(location, ticket),
            self.internal_stores(location)
        );

        let mut error = None;
        let external = match external {
            Ok(records) => records,
            Err(e) => {
                tracing::warn!(error = %e, "error fetching nearby places");
                error = Some(e.to_string());
                Vec::new()
            }
        };
        let internal = match internal {
            Ok(records) => records,
            Err(e) => {
                tracing::warn!(error = %e, "error fetching saved stores");
                error = Some(e.to_string());
                Vec::new()
            }
        };

        let stores = merge_stores(internal, external);
        let count = stores.len();
        let published = self.inner.state.send_if_modified(|state| {
            if !self.inner.is_latest(ticket) {
                return false;
            }
            state.stores = stores;
            state.stores_fetched = true;
            state.loading = false;
            state.error = error;
            true
        });

        if published {
            tracing::info!(
                lat = location.lat,
                lng = location.lng,
                count,
                "nearby stores resolved"
            );
        } else {
            tracing::debug!(
                lat = location.lat,
                lng = location.lng,
                ticket,
                "discarding result superseded by a newer fetch"
            );
        }
    }

    /// Schedules [`StoreAggregator::fetch_nearby`] after the configured quiet
    /// period, superseding any fetch still waiting to start.
    pub fn debounced_fetch_nearby(&self, location: Coordinate) {
        self.inner.debounce.call(location);
    }

    /// Saves a provider-discovered store.
    ///
    /// Saved stores are returned as [`SaveOutcome::AlreadySaved`] without a
    /// request.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError`] when the backend request fails.
    pub async fn save_store(&self, record: &StoreRecord) -> Result<SaveOutcome, ClientError> {
        if !record.is_saveable() {
            tracing::debug!(place_id = %record.place_id, "store is already saved");
            return Ok(SaveOutcome::AlreadySaved(None));
        }
        self.inner.backend.save_store(&record.to_new_store()).await
    }

    async fn external_stores(
        &self,
        location: Coordinate,
        ticket: u64,
    ) -> Result<Vec<StoreRecord>, ClientError> {
        if let Some(cached) = self.inner.cache.read() {
            tracing::debug!(count = cached.len(), "using cached nearby places");
            return Ok(cached);
        }

        let places = self
            .inner
            .backend
            .nearby_places(location, self.inner.options.limit)
            .await?;
        let records: Vec<StoreRecord> = places.into_iter().map(StoreRecord::from_place).collect();
        if self.inner.is_latest(ticket) {
            self.inner.cache.write(&records);
        }
        Ok(records)
    }

    async fn internal_stores(&self, location: Coordinate) -> Result<Vec<StoreRecord>, ClientError> {
        let docs = self
            .inner
            .backend
            .nearby_saved(location, self.inner.options.max_distance_m)
            .await?;
        Ok(docs.into_iter().filter_map(StoreRecord::from_document).collect())
    }
}

/// Saved stores first, then provider results whose `place_id` is new.
///
/// Order within each source is kept; a repeated `place_id` keeps its first
/// occurrence.
#[must_use]
pub fn merge_stores(internal: Vec<StoreRecord>, external: Vec<StoreRecord>) -> Vec<StoreRecord> {
    let mut seen = HashSet::with_capacity(internal.len() + external.len());
    internal
        .into_iter()
        .chain(external)
        .filter(|record| seen.insert(record.place_id.clone()))
        .collect()
}

#[cfg(test)]
#[path = "aggregator_test.rs"]
mod tests;
