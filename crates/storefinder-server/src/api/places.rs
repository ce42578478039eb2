use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Extension, Json,
};
use serde::{Deserialize, Serialize};
use storefinder_core::Coordinate;

use crate::middleware::RequestId;

use super::{ApiError, AppState};

const INVALID_REQUEST_MESSAGE: &str = "Invalid parameters or API key";

/// Raw query values; parsed by hand so that bad input yields the API error
/// shape instead of an extractor rejection.
#[derive(Debug, Deserialize)]
pub(super) struct NearbyStoresQuery {
    pub lat: Option<String>,
    pub lng: Option<String>,
    pub limit: Option<String>,
}

#[derive(Debug, Serialize)]
pub(super) struct UpstreamFailure {
    pub error: &'static str,
    pub details: String,
}

/// `GET /api/nearbyStores`: places-provider results around `lat`/`lng`,
/// truncated to `limit` when given.
pub(super) async fn nearby_stores(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Query(query): Query<NearbyStoresQuery>,
) -> Response {
    let (Some(location), Some(places)) = (parse_location(&query), state.places.as_ref()) else {
        return ApiError::new(req_id.0, "bad_request", INVALID_REQUEST_MESSAGE).into_response();
    };

    let limit = match query.limit.as_deref().map(str::trim).filter(|l| !l.is_empty()) {
        None => None,
        Some(raw) => match raw.parse::<usize>() {
            Ok(limit) => Some(limit),
            Err(_) => {
                return ApiError::new(
                    req_id.0,
                    "validation_error",
                    format!("limit must be a non-negative integer, got '{raw}'"),
                )
                .into_response();
            }
        },
    };

    match places.nearby(location).await {
        Ok(mut results) => {
            if let Some(limit) = limit {
                results.truncate(limit);
            }
            Json(results).into_response()
        }
        Err(e) => {
            tracing::error!(
                error = %e,
                lat = location.lat,
                lng = location.lng,
                "error fetching nearby stores"
            );
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(UpstreamFailure {
                    error: "Error fetching nearby stores",
                    details: e.to_string(),
                }),
            )
                .into_response()
        }
    }
}

fn parse_location(query: &NearbyStoresQuery) -> Option<Coordinate> {
    let lat = query.lat.as_deref()?.trim().parse::<f64>().ok()?;
    let lng = query.lng.as_deref()?.trim().parse::<f64>().ok()?;
    let in_range = (-90.0..=90.0).contains(&lat) && (-180.0..=180.0).contains(&lng);
    in_range.then_some(Coordinate::new(lat, lng))
}
