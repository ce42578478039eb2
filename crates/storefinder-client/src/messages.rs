use crate::aggregator::AggregatorState;
use crate::error::LocationError;

pub const NO_STORES_MESSAGE: &str =
    "No stores found near your location. Try adjusting your location or checking back later.";

/// Notice to show under the store list, if any.
///
/// An empty completed search reports "no stores" only when neither the
/// location nor the fetch failed. A fetch error is reported regardless of
/// the list contents.
#[must_use]
pub fn status_message(
    state: &AggregatorState,
    location_error: Option<&LocationError>,
) -> Option<String> {
    if state.stores_fetched
        && state.stores.is_empty()
        && location_error.is_none()
        && state.error.is_none()
    {
        return Some(NO_STORES_MESSAGE.to_string());
    }

    state
        .error
        .as_ref()
        .map(|error| format!("Error fetching stores: {error}. Please try again later."))
}
