//! Write operations for the `stores` table.

use sqlx::PgPool;
use storefinder_core::NewStore;

use super::types::StoreRow;

#[derive(sqlx::FromRow)]
struct UpsertedStoreRow {
    #[sqlx(flatten)]
    store: StoreRow,
    is_new: bool,
}

/// Insert a store, or refresh the existing row with the same `place_id`.
///
/// Returns the stored row and whether it was newly inserted. Optional fields
/// missing from `store` keep their stored values on refresh.
///
/// # Errors
///
/// Returns [`sqlx::Error`] if the query fails.
pub async fn upsert_store(pool: &PgPool, store: &NewStore) -> Result<(StoreRow, bool), sqlx::Error> {
    let row = sqlx::query_as::<_, UpsertedStoreRow>(
        "INSERT INTO stores \
             (place_id, name, address, phone, website, latitude, longitude) \
         VALUES ($1, $2, $3, $4, $5, $6, $7) \
         ON CONFLICT (place_id) DO UPDATE SET \
             name       = EXCLUDED.name, \
             address    = COALESCE(EXCLUDED.address, stores.address), \
             phone      = COALESCE(EXCLUDED.phone, stores.phone), \
             website    = COALESCE(EXCLUDED.website, stores.website), \
             latitude   = COALESCE(EXCLUDED.latitude, stores.latitude), \
             longitude  = COALESCE(EXCLUDED.longitude, stores.longitude), \
             updated_at = NOW() \
         RETURNING id, public_id, place_id, name, address, phone, website, \
                   latitude, longitude, created_at, updated_at, (xmax = 0) AS is_new",
    )
    .bind(store.place_id.trim())
    .bind(store.name.trim())
    .bind(&store.address)
    .bind(&store.phone)
    .bind(&store.website)
    .bind(store.latitude)
    .bind(store.longitude)
    .fetch_one(pool)
    .await?;

    tracing::debug!(
        place_id = %row.store.place_id,
        is_new = row.is_new,
        "store upserted"
    );
    Ok((row.store, row.is_new))
}
