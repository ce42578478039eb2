//! Database operations for the `stores` table.

mod read;
mod types;
mod write;

pub use read::{list_stores, list_stores_near};
pub use types::{NearbyStoreRow, StoreRow};
pub use write::upsert_store;
