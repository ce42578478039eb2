use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};

use crate::geo::Coordinate;
use crate::stores::StoreRecord;

/// Characters left intact by a URI component encoder.
const COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

/// Google Maps driving directions from `origin` to `store`.
#[must_use]
pub fn directions_url(origin: Coordinate, store: &StoreRecord) -> String {
    let destination = store.position;
    format!(
        "https://www.google.com/maps/dir/?api=1&origin={origin}&destination={destination}\
         &destination_place_id={}&destination_name={}&travelmode=driving",
        utf8_percent_encode(&store.place_id, COMPONENT),
        utf8_percent_encode(&store.name, COMPONENT),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stores::Provenance;

    #[test]
    fn builds_driving_link_with_encoded_name() {
        let store = StoreRecord {
            id: "p1".to_string(),
            place_id: "p1".to_string(),
            name: "Bob's Guitars & Amps".to_string(),
            address: None,
            phone: None,
            website: None,
            position: Coordinate::new(37.77, -122.41),
            open_now: None,
            provenance: Provenance::External,
        };
        let url = directions_url(Coordinate::new(37.7749, -122.4194), &store);
        assert_eq!(
            url,
            "https://www.google.com/maps/dir/?api=1&origin=37.7749,-122.4194\
             &destination=37.77,-122.41&destination_place_id=p1\
             &destination_name=Bob's%20Guitars%20%26%20Amps&travelmode=driving"
        );
    }
}
