use serde_json::json;

use super::*;
use crate::wire::GeoPoint;

fn place(id: &str) -> PlaceResult {
    serde_json::from_value(json!({
        "place_id": id,
        "name": "Guitar Center",
        "vicinity": "1 Main St",
        "formatted_phone_number": "555-0100",
        "geometry": { "location": { "lat": 37.77, "lng": -122.41 } },
        "opening_hours": { "open_now": false }
    }))
    .expect("valid place fixture")
}

fn document(location: Option<GeoPoint>) -> StoreDocument {
    StoreDocument {
        id: "doc-1".to_string(),
        place_id: "p1".to_string(),
        name: "Saved Store".to_string(),
        address: Some("9 Elm St".to_string()),
        phone: None,
        website: Some("https://saved.example.com".to_string()),
        location,
        created_at: None,
        updated_at: None,
    }
}

#[test]
fn external_record_uses_place_id_for_both_identifiers() {
    let record = StoreRecord::from_place(place("p1"));
    assert_eq!(record.id, "p1");
    assert_eq!(record.place_id, "p1");
    assert_eq!(record.provenance, Provenance::External);
    assert_eq!(record.address.as_deref(), Some("1 Main St"));
    assert_eq!(record.phone.as_deref(), Some("555-0100"));
    assert_eq!(record.open_now, Some(false));
    assert_eq!(record.position, Coordinate::new(37.77, -122.41));
}

#[test]
fn internal_record_reverses_geo_point_order() {
    let doc = document(Some(GeoPoint::from_coordinate(Coordinate::new(37.5, -122.5))));
    let record = StoreRecord::from_document(doc).expect("has location");
    assert_eq!(record.id, "doc-1");
    assert_eq!(record.place_id, "p1");
    assert_eq!(record.provenance, Provenance::Internal);
    assert_eq!(record.position, Coordinate::new(37.5, -122.5));
    assert!(record.open_now.is_none());
}

#[test]
fn internal_record_without_location_is_dropped() {
    assert!(StoreRecord::from_document(document(None)).is_none());
}

#[test]
fn only_external_records_are_saveable() {
    let external = StoreRecord::from_place(place("p1"));
    let internal = StoreRecord::from_document(document(Some(GeoPoint::from_coordinate(
        Coordinate::new(1.0, 2.0),
    ))))
    .expect("has location");
    assert!(external.is_saveable());
    assert!(!internal.is_saveable());
}

#[test]
fn to_new_store_carries_position() {
    let new_store = StoreRecord::from_place(place("p9")).to_new_store();
    assert_eq!(new_store.place_id, "p9");
    assert_eq!(new_store.latitude, Some(37.77));
    assert_eq!(new_store.longitude, Some(-122.41));
    assert!(new_store.validation_error().is_none());
}

#[test]
fn provenance_serializes_lowercase() {
    assert_eq!(
        serde_json::to_value(Provenance::External).unwrap(),
        json!("external")
    );
    assert_eq!(Provenance::Internal.to_string(), "internal");
}
