//! Client-side store finder core.
//!
//! Tracks the device position, resolves nearby stores from the backend's two
//! sources (places provider and saved stores), caches the provider results
//! for a bounded time and merges everything into one deduplicated list.

pub mod aggregator;
pub mod backend;
pub mod cache;
pub mod debounce;
pub mod error;
mod fetch;
pub mod location;
pub mod messages;

pub use aggregator::{merge_stores, AggregatorOptions, AggregatorState, StoreAggregator};
pub use backend::{BackendClient, SaveOutcome};
pub use cache::{FileStore, KeyValueStore, MemoryStore, StoreCache};
pub use debounce::Debounce;
pub use error::{ClientError, LocationError};
pub use location::{
    significant_change, ChannelSource, GeolocationSource, LocationTrackState, LocationTracker,
    PositionEvent, PositionReading, PositionStream, TrackHandle, UnsupportedSource,
};
pub use messages::{status_message, NO_STORES_MESSAGE};
