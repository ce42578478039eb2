//! Row types for the `stores` table.

use chrono::{DateTime, Utc};
use storefinder_core::{Coordinate, GeoPoint, StoreDocument};
use uuid::Uuid;

/// A row from the `stores` table.
#[derive(Debug, Clone, PartialEq, sqlx::FromRow)]
pub struct StoreRow {
    pub id: i64,
    pub public_id: Uuid,
    pub place_id: String,
    pub name: String,
    pub address: Option<String>,
    pub phone: Option<String>,
    pub website: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl StoreRow {
    #[must_use]
    pub fn coordinate(&self) -> Option<Coordinate> {
        match (self.latitude, self.longitude) {
            (Some(lat), Some(lng)) => Some(Coordinate::new(lat, lng)),
            _ => None,
        }
    }

    /// The API representation. `id` is the public UUID.
    #[must_use]
    pub fn into_document(self) -> StoreDocument {
        let location = self.coordinate().map(GeoPoint::from_coordinate);
        StoreDocument {
            id: self.public_id.to_string(),
            place_id: self.place_id,
            name: self.name,
            address: self.address,
            phone: self.phone,
            website: self.website,
            location,
            created_at: Some(self.created_at),
            updated_at: Some(self.updated_at),
        }
    }
}

/// A store with its great-circle distance from the query point.
#[derive(Debug, Clone, PartialEq, sqlx::FromRow)]
pub struct NearbyStoreRow {
    #[sqlx(flatten)]
    pub store: StoreRow,
    pub distance_m: f64,
}
