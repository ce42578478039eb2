//! Google Places nearby-search client used by the backend.
//!
//! Results are cached in-process per `lat,lng,keyword` and transient failures
//! are retried with exponential back-off.

pub mod cache;
pub mod client;
pub mod error;
pub(crate) mod retry;

pub use cache::TtlCache;
pub use client::{PlacesClient, PlacesOptions};
pub use error::PlacesError;
