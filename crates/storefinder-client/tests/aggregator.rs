//! End-to-end aggregator behaviour against a mocked backend.

use std::sync::Arc;
use std::time::Duration;

use serde_json::json;
use storefinder_client::{
    AggregatorOptions, BackendClient, KeyValueStore, MemoryStore, SaveOutcome, StoreAggregator,
    StoreCache,
};
use storefinder_core::{Coordinate, Provenance, DEFAULT_CENTER};
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const MINUTE_MS: i64 = 60 * 1000;

struct Harness {
    server: MockServer,
    store: Arc<MemoryStore>,
    aggregator: StoreAggregator,
}

impl Harness {
    async fn start() -> Self {
        Self::with_debounce(Duration::from_millis(1000)).await
    }

    async fn with_debounce(debounce: Duration) -> Self {
        let server = MockServer::start().await;
        let store = Arc::new(MemoryStore::new());
        let aggregator = StoreAggregator::new(
            BackendClient::new(&server.uri(), 5).expect("backend client"),
            StoreCache::new(store.clone(), 10),
            AggregatorOptions {
                debounce,
                ..AggregatorOptions::default()
            },
        );
        Self {
            server,
            store,
            aggregator,
        }
    }

    fn cache(&self) -> StoreCache {
        StoreCache::new(self.store.clone(), 10)
    }

    async fn mount_places(&self, body: serde_json::Value, expected_calls: u64) {
        Mock::given(method("GET"))
            .and(path("/api/nearbyStores"))
            .respond_with(ResponseTemplate::new(200).set_body_json(&body))
            .expect(expected_calls)
            .mount(&self.server)
            .await;
    }

    async fn mount_saved(&self, body: serde_json::Value) {
        Mock::given(method("GET"))
            .and(path("/api/stores/nearby"))
            .respond_with(ResponseTemplate::new(200).set_body_json(&body))
            .mount(&self.server)
            .await;
    }
}

fn place(place_id: &str, name: &str) -> serde_json::Value {
    json!({
        "place_id": place_id,
        "name": name,
        "vicinity": "1 Main St",
        "geometry": { "location": { "lat": 37.7751, "lng": -122.4183 } },
        "opening_hours": { "open_now": true }
    })
}

fn saved(id: &str, place_id: &str, name: &str) -> serde_json::Value {
    json!({
        "id": id,
        "placeId": place_id,
        "name": name,
        "address": "2 Side St",
        "location": { "type": "Point", "coordinates": [-122.4180, 37.7760] },
        "createdAt": "2024-05-01T10:00:00Z",
        "updatedAt": "2024-05-01T10:00:00Z"
    })
}

#[tokio::test]
async fn single_external_store_near_default_center() {
    let h = Harness::start().await;
    Mock::given(method("GET"))
        .and(path("/api/nearbyStores"))
        .and(query_param("lat", "37.7749"))
        .and(query_param("lng", "-122.4194"))
        .and(query_param("limit", "10"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([place("p1", "Guitar Center")])))
        .expect(1)
        .mount(&h.server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/stores/nearby"))
        .and(query_param("maxDistance", "5000"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(1)
        .mount(&h.server)
        .await;

    h.aggregator.fetch_nearby(DEFAULT_CENTER).await;

    let state = h.aggregator.state();
    assert_eq!(state.stores.len(), 1);
    let store = &state.stores[0];
    assert_eq!(store.id, "p1");
    assert_eq!(store.name, "Guitar Center");
    assert_eq!(store.provenance, Provenance::External);
    assert_eq!(store.open_now, Some(true));
    assert!(state.stores_fetched);
    assert!(!state.loading);
    assert!(state.error.is_none());

    let cached = h.cache().read().expect("external results are cached");
    assert_eq!(cached, state.stores);
}

#[tokio::test]
async fn external_failure_keeps_internal_stores() {
    let h = Harness::start().await;
    Mock::given(method("GET"))
        .and(path("/api/nearbyStores"))
        .respond_with(ResponseTemplate::new(500).set_body_json(json!({
            "error": "Error fetching nearby stores",
            "details": "boom"
        })))
        .mount(&h.server)
        .await;
    h.mount_saved(json!([saved("db-1", "p9", "Saved Store")])).await;

    h.aggregator.fetch_nearby(DEFAULT_CENTER).await;

    let state = h.aggregator.state();
    assert_eq!(state.stores.len(), 1);
    assert_eq!(state.stores[0].provenance, Provenance::Internal);
    assert_eq!(state.stores[0].position, Coordinate::new(37.7760, -122.4180));
    let error = state.error.expect("error is reported");
    assert!(error.contains("500"), "unexpected error: {error}");
    assert!(!state.loading);
    assert!(state.stores_fetched);
    assert!(h.cache().read().is_none(), "failures are not cached");
}

#[tokio::test]
async fn internal_failure_keeps_external_stores() {
    let h = Harness::start().await;
    h.mount_places(json!([place("p1", "Guitar Center")]), 1).await;
    Mock::given(method("GET"))
        .and(path("/api/stores/nearby"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&h.server)
        .await;

    h.aggregator.fetch_nearby(DEFAULT_CENTER).await;

    let state = h.aggregator.state();
    assert_eq!(state.stores.len(), 1);
    assert_eq!(state.stores[0].provenance, Provenance::External);
    assert!(state.error.is_some());
}

#[tokio::test]
async fn stale_cache_triggers_live_fetch() {
    let h = Harness::start().await;
    let stale = vec![storefinder_core::StoreRecord::from_place(
        serde_json::from_value(place("old", "Closed Shop")).unwrap(),
    )];
    let now = chrono::Utc::now().timestamp_millis();
    h.cache().write_at(&stale, now - 20 * MINUTE_MS);

    h.mount_places(json!([place("p1", "Guitar Center")]), 1).await;
    h.mount_saved(json!([])).await;

    h.aggregator.fetch_nearby(DEFAULT_CENTER).await;

    let ids: Vec<_> = h.aggregator.state().stores.into_iter().map(|s| s.id).collect();
    assert_eq!(ids, ["p1"]);
}

#[tokio::test]
async fn fresh_cache_skips_the_places_request() {
    let h = Harness::start().await;
    let cached = vec![storefinder_core::StoreRecord::from_place(
        serde_json::from_value(place("cached", "Cached Guitars")).unwrap(),
    )];
    h.cache().write(&cached);

    h.mount_places(json!([place("p1", "Guitar Center")]), 0).await;
    h.mount_saved(json!([])).await;

    h.aggregator.fetch_nearby(DEFAULT_CENTER).await;

    let state = h.aggregator.state();
    assert_eq!(state.stores, cached);
    assert!(state.error.is_none());
}

#[tokio::test]
async fn saved_store_wins_over_matching_place() {
    let h = Harness::start().await;
    h.mount_places(
        json!([place("p1", "Guitar Center"), place("p2", "Fret Shop")]),
        1,
    )
    .await;
    h.mount_saved(json!([saved("db-7", "p2", "Fret Shop (saved)")])).await;

    h.aggregator.fetch_nearby(DEFAULT_CENTER).await;

    let stores = h.aggregator.state().stores;
    let summary: Vec<_> = stores
        .iter()
        .map(|s| (s.place_id.as_str(), s.provenance))
        .collect();
    assert_eq!(
        summary,
        [("p2", Provenance::Internal), ("p1", Provenance::External)]
    );
    assert_eq!(stores[0].id, "db-7");
}

#[tokio::test]
async fn non_array_bodies_and_bad_items_are_tolerated() {
    let h = Harness::start().await;
    h.mount_places(json!({ "results": [] }), 1).await;
    h.mount_saved(json!([
        saved("db-1", "p1", "Good"),
        { "id": "db-2", "name": "No place id" },
        { "id": "db-3", "placeId": "p3", "name": "No location", "location": null }
    ]))
    .await;

    h.aggregator.fetch_nearby(DEFAULT_CENTER).await;

    let state = h.aggregator.state();
    assert!(state.error.is_none());
    let ids: Vec<_> = state.stores.iter().map(|s| s.id.as_str()).collect();
    assert_eq!(ids, ["db-1"]);
}

#[tokio::test]
async fn debounced_fetch_uses_only_the_last_location() {
    let h = Harness::with_debounce(Duration::from_millis(100)).await;
    Mock::given(method("GET"))
        .and(path("/api/nearbyStores"))
        .and(query_param("lat", "2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([place("p1", "Guitar Center")])))
        .expect(1)
        .mount(&h.server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/nearbyStores"))
        .and(query_param("lat", "1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(0)
        .mount(&h.server)
        .await;
    h.mount_saved(json!([])).await;

    let mut updates = h.aggregator.subscribe();
    h.aggregator.debounced_fetch_nearby(Coordinate::new(1.0, 1.0));
    tokio::time::sleep(Duration::from_millis(20)).await;
    h.aggregator.debounced_fetch_nearby(Coordinate::new(2.0, 2.0));

    tokio::time::timeout(
        Duration::from_secs(5),
        updates.wait_for(|state| state.stores_fetched && !state.loading),
    )
    .await
    .expect("debounced fetch completes")
    .expect("aggregator alive");

    assert_eq!(h.aggregator.state().stores.len(), 1);
}

#[tokio::test]
async fn late_result_for_an_older_location_is_discarded() {
    let h = Harness::with_debounce(Duration::from_millis(100)).await;
    Mock::given(method("GET"))
        .and(path("/api/nearbyStores"))
        .and(query_param("lat", "1"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!([place("old", "Old Town Guitars")]))
                .set_delay(Duration::from_millis(800)),
        )
        .expect(1)
        .mount(&h.server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/nearbyStores"))
        .and(query_param("lat", "2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([place("new", "New Town Guitars")])))
        .expect(1)
        .mount(&h.server)
        .await;
    h.mount_saved(json!([])).await;

    let mut updates = h.aggregator.subscribe();
    h.aggregator.debounced_fetch_nearby(Coordinate::new(1.0, 1.0));
    // Past the quiet period: the first fetch is now in flight.
    tokio::time::sleep(Duration::from_millis(150)).await;
    assert!(h.aggregator.state().loading);
    h.aggregator.debounced_fetch_nearby(Coordinate::new(2.0, 2.0));

    tokio::time::timeout(
        Duration::from_secs(5),
        updates.wait_for(|state| state.stores_fetched && !state.loading),
    )
    .await
    .expect("newer fetch completes")
    .expect("aggregator alive");

    // Let the delayed response for the first location arrive.
    tokio::time::sleep(Duration::from_millis(1000)).await;

    let state = h.aggregator.state();
    let ids: Vec<_> = state.stores.iter().map(|s| s.id.as_str()).collect();
    assert_eq!(ids, ["new"]);
    assert!(!state.loading);
    let cached = h.cache().read().expect("newer results are cached");
    assert_eq!(cached[0].id, "new");
}

#[tokio::test]
async fn both_branches_are_requested_concurrently() {
    let h = Harness::start().await;
    Mock::given(method("GET"))
        .and(path("/api/nearbyStores"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!([place("p1", "Guitar Center")]))
                .set_delay(Duration::from_millis(500)),
        )
        .mount(&h.server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/stores/nearby"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!([saved("db-1", "p9", "Saved Store")]))
                .set_delay(Duration::from_millis(500)),
        )
        .mount(&h.server)
        .await;

    let started = std::time::Instant::now();
    h.aggregator.fetch_nearby(DEFAULT_CENTER).await;
    let elapsed = started.elapsed();

    assert!(
        elapsed < Duration::from_millis(900),
        "branches ran one after the other: {elapsed:?}"
    );
    assert_eq!(h.aggregator.state().stores.len(), 2);
}

#[tokio::test]
async fn when_both_branches_fail_the_saved_store_error_is_reported() {
    let h = Harness::start().await;
    Mock::given(method("GET"))
        .and(path("/api/nearbyStores"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&h.server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/stores/nearby"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&h.server)
        .await;

    h.aggregator.fetch_nearby(DEFAULT_CENTER).await;

    let state = h.aggregator.state();
    let error = state.error.expect("error is set");
    assert!(error.contains("503"), "unexpected error: {error}");
    assert!(error.contains("/api/stores/nearby"), "unexpected error: {error}");
    assert!(state.stores.is_empty());
    assert!(state.stores_fetched);
    assert!(!state.loading);
}

#[tokio::test]
async fn saving_reports_new_and_existing_stores() {
    let h = Harness::start().await;
    let record = storefinder_core::StoreRecord::from_place(
        serde_json::from_value(place("p1", "Guitar Center")).unwrap(),
    );

    Mock::given(method("POST"))
        .and(path("/api/stores"))
        .respond_with(ResponseTemplate::new(201).set_body_json(saved("db-1", "p1", "Guitar Center")))
        .up_to_n_times(1)
        .mount(&h.server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/stores"))
        .respond_with(ResponseTemplate::new(200).set_body_json(saved("db-1", "p1", "Guitar Center")))
        .mount(&h.server)
        .await;

    let first = h.aggregator.save_store(&record).await.expect("save");
    match first {
        SaveOutcome::Saved(doc) => assert_eq!(doc.place_id, "p1"),
        other => panic!("expected Saved, got {other:?}"),
    }

    let second = h.aggregator.save_store(&record).await.expect("save again");
    match second {
        SaveOutcome::AlreadySaved(Some(doc)) => assert_eq!(doc.id, "db-1"),
        other => panic!("expected AlreadySaved, got {other:?}"),
    }
}

#[tokio::test]
async fn conflict_is_already_saved_and_server_error_is_an_error() {
    let h = Harness::start().await;
    let record = storefinder_core::StoreRecord::from_place(
        serde_json::from_value(place("p1", "Guitar Center")).unwrap(),
    );

    Mock::given(method("POST"))
        .and(path("/api/stores"))
        .respond_with(ResponseTemplate::new(409))
        .up_to_n_times(1)
        .mount(&h.server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/stores"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&h.server)
        .await;

    assert_eq!(
        h.aggregator.save_store(&record).await.expect("conflict"),
        SaveOutcome::AlreadySaved(None)
    );
    let err = h.aggregator.save_store(&record).await.unwrap_err();
    assert!(matches!(
        err,
        storefinder_client::ClientError::UnexpectedStatus { status: 500, .. }
    ));
}

#[tokio::test]
async fn cache_is_shared_through_the_key_value_store() {
    let h = Harness::start().await;
    h.mount_places(json!([place("p1", "Guitar Center")]), 1).await;
    h.mount_saved(json!([])).await;

    h.aggregator.fetch_nearby(DEFAULT_CENTER).await;
    h.aggregator.fetch_nearby(DEFAULT_CENTER).await;

    let raw = h.store.get("nearbyStores:limit=10").expect("entry written");
    let entry: serde_json::Value = serde_json::from_str(&raw).unwrap();
    assert!(entry["timestamp"].is_i64());
    assert_eq!(entry["data"].as_array().map(Vec::len), Some(1));
}
