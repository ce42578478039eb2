use axum::{
    extract::{rejection::JsonRejection, Query, State},
    http::StatusCode,
    Extension, Json,
};
use serde::Deserialize;
use storefinder_core::{NewStore, StoreDocument};

use crate::middleware::RequestId;

use super::{map_db_error, normalize_limit, ApiError, AppState, MAX_LIMIT};

const DEFAULT_MAX_DISTANCE_M: f64 = 5000.0;

/// The geo query is bounded by distance, so it returns up to the cap unless
/// the caller asks for fewer.
pub(super) fn nearby_limit(limit: Option<i64>) -> i64 {
    normalize_limit(Some(limit.unwrap_or(MAX_LIMIT)))
}

#[derive(Debug, Deserialize)]
pub(super) struct ListStoresQuery {
    pub limit: Option<i64>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct NearbyStoresQuery {
    pub lat: Option<f64>,
    pub lng: Option<f64>,
    pub max_distance: Option<f64>,
    pub limit: Option<i64>,
}

/// `GET /api/stores`: saved stores, newest first.
pub(super) async fn list_stores(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Query(query): Query<ListStoresQuery>,
) -> Result<Json<Vec<StoreDocument>>, ApiError> {
    let rows = storefinder_db::list_stores(&state.pool, normalize_limit(query.limit))
        .await
        .map_err(|e| map_db_error(req_id.0, &storefinder_db::DbError::from(e)))?;

    Ok(Json(rows.into_iter().map(|row| row.into_document()).collect()))
}

/// `GET /api/stores/nearby`: saved stores within `maxDistance` metres,
/// nearest first.
pub(super) async fn list_nearby_stores(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Query(query): Query<NearbyStoresQuery>,
) -> Result<Json<Vec<StoreDocument>>, ApiError> {
    let (Some(lat), Some(lng)) = (query.lat, query.lng) else {
        return Err(ApiError::new(
            req_id.0,
            "validation_error",
            "lat and lng are required",
        ));
    };
    if !(-90.0..=90.0).contains(&lat) || !(-180.0..=180.0).contains(&lng) {
        return Err(ApiError::new(
            req_id.0,
            "validation_error",
            format!("coordinates out of range: {lat},{lng}"),
        ));
    }

    let max_distance = query.max_distance.unwrap_or(DEFAULT_MAX_DISTANCE_M);
    if !max_distance.is_finite() || max_distance <= 0.0 {
        return Err(ApiError::new(
            req_id.0,
            "validation_error",
            "maxDistance must be a positive number of metres",
        ));
    }

    let rows = storefinder_db::list_stores_near(
        &state.pool,
        lat,
        lng,
        max_distance,
        nearby_limit(query.limit),
    )
    .await
    .map_err(|e| map_db_error(req_id.0, &storefinder_db::DbError::from(e)))?;

    Ok(Json(
        rows.into_iter()
            .map(|row| row.store.into_document())
            .collect(),
    ))
}

/// `POST /api/stores`: 201 with the new document, or 200 with the refreshed
/// one when the `placeId` was already saved.
pub(super) async fn create_store(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    body: Result<Json<NewStore>, JsonRejection>,
) -> Result<(StatusCode, Json<StoreDocument>), ApiError> {
    let Json(store) = body.map_err(|rejection| {
        ApiError::new(req_id.0.clone(), "validation_error", rejection.body_text())
    })?;
    if let Some(reason) = store.validation_error() {
        return Err(ApiError::new(req_id.0, "validation_error", reason));
    }

    let (row, is_new) = storefinder_db::upsert_store(&state.pool, &store)
        .await
        .map_err(|e| map_db_error(req_id.0, &storefinder_db::DbError::from(e)))?;

    tracing::info!(place_id = %row.place_id, is_new, "store saved");
    let status = if is_new {
        StatusCode::CREATED
    } else {
        StatusCode::OK
    };
    Ok((status, Json(row.into_document())))
}
