//! Provenance-tagged store records, normalized from either data source.

use serde::{Deserialize, Serialize};

use crate::geo::Coordinate;
use crate::wire::{NewStore, PlaceResult, StoreDocument};

/// Which source produced a [`StoreRecord`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provenance {
    /// The external places provider.
    External,
    /// The backend's own store collection.
    Internal,
}

impl std::fmt::Display for Provenance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Provenance::External => write!(f, "external"),
            Provenance::Internal => write!(f, "internal"),
        }
    }
}

/// A store ready for display.
///
/// `id` is scoped to the provenance. `place_id` is the places-provider
/// identifier and is always populated: for external records it equals `id`,
/// for internal records it is the identifier the store was saved under. The
/// aggregator deduplicates on `place_id`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoreRecord {
    pub id: String,
    pub place_id: String,
    pub name: String,
    pub address: Option<String>,
    pub phone: Option<String>,
    pub website: Option<String>,
    pub position: Coordinate,
    pub open_now: Option<bool>,
    pub provenance: Provenance,
}

impl StoreRecord {
    #[must_use]
    pub fn from_place(place: PlaceResult) -> Self {
        Self {
            id: place.place_id.clone(),
            place_id: place.place_id,
            name: place.name,
            address: place.vicinity,
            phone: place.formatted_phone_number,
            website: place.website,
            position: place.geometry.location,
            open_now: place.opening_hours.and_then(|h| h.open_now),
            provenance: Provenance::External,
        }
    }

    /// Normalizes a persisted document. Returns `None` when the document has
    /// no location, since such a store cannot be placed on a map.
    #[must_use]
    pub fn from_document(doc: StoreDocument) -> Option<Self> {
        let Some(location) = doc.location else {
            tracing::debug!(id = %doc.id, place_id = %doc.place_id, "stored store has no location; skipping");
            return None;
        };

        Some(Self {
            id: doc.id,
            place_id: doc.place_id,
            name: doc.name,
            address: doc.address,
            phone: doc.phone,
            website: doc.website,
            position: location.to_coordinate(),
            open_now: None,
            provenance: Provenance::Internal,
        })
    }

    /// Only stores discovered through the places provider can be saved.
    #[must_use]
    pub fn is_saveable(&self) -> bool {
        self.provenance == Provenance::External
    }

    /// Builds the save request for this store.
    #[must_use]
    pub fn to_new_store(&self) -> NewStore {
        NewStore {
            place_id: self.place_id.clone(),
            name: self.name.clone(),
            address: self.address.clone(),
            phone: self.phone.clone(),
            website: self.website.clone(),
            latitude: Some(self.position.lat),
            longitude: Some(self.position.lng),
        }
    }
}

#[cfg(test)]
#[path = "stores_test.rs"]
mod tests;
