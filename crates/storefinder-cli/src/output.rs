//! Plain-text rendering of store lists for the terminal.

use storefinder_client::{status_message, AggregatorState, LocationError, SaveOutcome};
use storefinder_core::{directions_url, Coordinate, StoreDocument, StoreRecord};

/// Metres below one kilometre, tenths of a kilometre above.
fn format_distance(metres: f64) -> String {
    if metres < 1000.0 {
        format!("{metres:.0} m")
    } else {
        format!("{:.1} km", metres / 1000.0)
    }
}

pub(crate) fn format_store(origin: Coordinate, store: &StoreRecord) -> String {
    let distance = format_distance(origin.distance_m(&store.position));
    let mut lines = vec![format!("{} [{}] {distance}", store.name, store.provenance)];
    if let Some(address) = &store.address {
        lines.push(format!("  Address: {address}"));
    }
    if let Some(phone) = &store.phone {
        lines.push(format!("  Phone: {phone}"));
    }
    if let Some(website) = &store.website {
        lines.push(format!("  Website: {website}"));
    }
    match store.open_now {
        Some(true) => lines.push("  Open now".to_string()),
        Some(false) => lines.push("  Closed".to_string()),
        None => {}
    }
    lines.push(format!("  Directions: {}", directions_url(origin, store)));
    lines.join("\n")
}

pub(crate) fn format_saved(doc: &StoreDocument) -> String {
    let mut line = format!("{} ({})", doc.name, doc.place_id);
    if let Some(address) = &doc.address {
        line.push_str(" - ");
        line.push_str(address);
    }
    line
}

pub(crate) fn format_save_outcome(name: &str, outcome: &SaveOutcome) -> String {
    match outcome {
        SaveOutcome::Saved(doc) => format!("Saved {} ({})", doc.name, doc.id),
        SaveOutcome::AlreadySaved(_) => format!("{name} is already saved"),
    }
}

pub(crate) fn render_state(
    origin: Coordinate,
    state: &AggregatorState,
    location_error: Option<&LocationError>,
) -> String {
    let mut blocks = Vec::new();
    if let Some(error) = location_error {
        blocks.push(error.to_string());
    }
    if state.loading {
        blocks.push("Loading stores...".to_string());
    }
    blocks.extend(state.stores.iter().map(|store| format_store(origin, store)));
    if let Some(message) = status_message(state, location_error) {
        blocks.push(message);
    }
    blocks.join("\n\n")
}

pub(crate) fn print_state(
    origin: Coordinate,
    state: &AggregatorState,
    location_error: Option<&LocationError>,
) {
    println!("{}", render_state(origin, state, location_error));
}

#[cfg(test)]
mod tests {
    use storefinder_client::NO_STORES_MESSAGE;
    use storefinder_core::Provenance;

    use super::*;

    fn store() -> StoreRecord {
        StoreRecord {
            id: "p1".to_string(),
            place_id: "p1".to_string(),
            name: "Guitar Center".to_string(),
            address: Some("1 Main St".to_string()),
            phone: None,
            website: None,
            position: Coordinate::new(37.7751, -122.4183),
            open_now: Some(true),
            provenance: Provenance::External,
        }
    }

    #[test]
    fn store_block_lists_known_fields() {
        let text = format_store(Coordinate::new(37.7749, -122.4194), &store());
        assert!(text.starts_with("Guitar Center [external] 99 m\n"));
        assert!(text.contains("Address: 1 Main St"));
        assert!(!text.contains("Phone:"));
        assert!(text.contains("Open now"));
        assert!(text.contains("https://www.google.com/maps/dir/?api=1"));
    }

    #[test]
    fn distance_switches_to_kilometres() {
        assert_eq!(format_distance(12.4), "12 m");
        assert_eq!(format_distance(999.0), "999 m");
        assert_eq!(format_distance(13_260.0), "13.3 km");
    }

    #[test]
    fn empty_completed_search_shows_no_stores_notice() {
        let state = AggregatorState {
            stores_fetched: true,
            ..AggregatorState::default()
        };
        let text = render_state(Coordinate::new(0.0, 0.0), &state, None);
        assert_eq!(text, NO_STORES_MESSAGE);
    }

    #[test]
    fn location_error_is_shown_without_no_stores_notice() {
        let state = AggregatorState {
            stores_fetched: true,
            ..AggregatorState::default()
        };
        let text = render_state(
            Coordinate::new(0.0, 0.0),
            &state,
            Some(&LocationError::PermissionDenied),
        );
        assert_eq!(
            text,
            "Location access denied. Please enable your location in the browser."
        );
    }

    #[test]
    fn saved_line_includes_address_when_present() {
        let doc = StoreDocument {
            id: "a".to_string(),
            place_id: "p1".to_string(),
            name: "Guitar Center".to_string(),
            address: Some("1 Main St".to_string()),
            phone: None,
            website: None,
            location: None,
            created_at: None,
            updated_at: None,
        };
        assert_eq!(format_saved(&doc), "Guitar Center (p1) - 1 Main St");
    }

    #[test]
    fn save_outcome_messages() {
        let doc = StoreDocument {
            id: "abc".to_string(),
            place_id: "p1".to_string(),
            name: "Guitar Center".to_string(),
            address: None,
            phone: None,
            website: None,
            location: None,
            created_at: None,
            updated_at: None,
        };
        assert_eq!(
            format_save_outcome("Guitar Center", &SaveOutcome::Saved(doc.clone())),
            "Saved Guitar Center (abc)"
        );
        assert_eq!(
            format_save_outcome("Guitar Center", &SaveOutcome::AlreadySaved(Some(doc))),
            "Guitar Center is already saved"
        );
        assert_eq!(
            format_save_outcome("Guitar Center", &SaveOutcome::AlreadySaved(None)),
            "Guitar Center is already saved"
        );
    }
}
