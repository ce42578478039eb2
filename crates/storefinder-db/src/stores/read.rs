//! Read operations for the `stores` table.

use sqlx::PgPool;

use super::types::{NearbyStoreRow, StoreRow};

/// Mean Earth radius in metres, matching `Coordinate::distance_m`.
const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// List saved stores, newest first.
///
/// # Errors
///
/// Returns [`sqlx::Error`] if the query fails.
pub async fn list_stores(pool: &PgPool, limit: i64) -> Result<Vec<StoreRow>, sqlx::Error> {
    sqlx::query_as::<_, StoreRow>(
        "SELECT id, public_id, place_id, name, address, phone, website, \
                latitude, longitude, created_at, updated_at \
         FROM stores \
         ORDER BY created_at DESC, id DESC \
         LIMIT $1",
    )
    .bind(limit)
    .fetch_all(pool)
    .await
}

/// Stores within `max_distance_m` metres of (`lat`, `lng`), nearest first.
///
/// Distance is the haversine great-circle distance. Rows without coordinates
/// are never returned.
///
/// # Errors
///
/// Returns [`sqlx::Error`] if the query fails.
pub async fn list_stores_near(
    pool: &PgPool,
    lat: f64,
    lng: f64,
    max_distance_m: f64,
    limit: i64,
) -> Result<Vec<NearbyStoreRow>, sqlx::Error> {
    sqlx::query_as::<_, NearbyStoreRow>(
        "SELECT * FROM ( \
             SELECT id, public_id, place_id, name, address, phone, website, \
                    latitude, longitude, created_at, updated_at, \
                    2 * $5::float8 * ASIN(LEAST(1.0, SQRT( \
                        POWER(SIN(RADIANS(latitude - $1::float8) / 2), 2) \
                        + COS(RADIANS($1::float8)) * COS(RADIANS(latitude)) \
                          * POWER(SIN(RADIANS(longitude - $2::float8) / 2), 2) \
                    ))) AS distance_m \
             FROM stores \
             WHERE latitude IS NOT NULL AND longitude IS NOT NULL \
         ) nearby \
         WHERE distance_m <= $3 \
         ORDER BY distance_m, id \
         LIMIT $4",
    )
    .bind(lat)
    .bind(lng)
    .bind(max_distance_m)
    .bind(limit)
    .bind(EARTH_RADIUS_M)
    .fetch_all(pool)
    .await
}
