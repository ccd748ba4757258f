//! Map positions of a message.
//!
//! `GeoJSON` positions are `[lng, lat]`; everything returned from here is a
//! [`Location`] with the axes named. Coordinate arrays are untyped at the
//! schema layer, so malformed ones are skipped rather than reported.

use civic_feed_message_models::{Feature, Geometry, IncomingMessage, Location};

/// Picks the single position used to place `message` on a map.
///
/// Priority, first match wins:
///
/// 1. first `Point` feature
/// 2. first vertex of the first `LineString` feature
/// 3. first vertex of the first ring of the first `Polygon` feature
/// 4. first address with coordinates
///
/// Returns `None` when the message has no usable position.
#[must_use]
pub fn resolve_location(message: &IncomingMessage) -> Option<Location> {
    let features = features(message);

    features
        .iter()
        .find_map(|feature| match &feature.geometry {
            Geometry::Point { coordinates } => position(coordinates),
            _ => None,
        })
        .or_else(|| {
            features.iter().find_map(|feature| match &feature.geometry {
                Geometry::LineString { coordinates } => {
                    coordinates.as_array()?.first().and_then(position)
                }
                _ => None,
            })
        })
        .or_else(|| {
            features.iter().find_map(|feature| match &feature.geometry {
                Geometry::Polygon { coordinates } => coordinates
                    .as_array()?
                    .first()?
                    .as_array()?
                    .first()
                    .and_then(position),
                _ => None,
            })
        })
        .or_else(|| {
            message
                .addresses
                .iter()
                .flatten()
                .find_map(|address| address.coordinates.map(Location::from))
        })
}

/// Collects every position `message` mentions, for multi-point rendering.
///
/// Order: `Point` features, every `LineString` vertex, address
/// coordinates, pin coordinates. Polygons are not included. Duplicates are
/// kept.
#[must_use]
pub fn collect_locations(message: &IncomingMessage) -> Vec<Location> {
    let features = features(message);
    let mut locations = Vec::new();

    locations.extend(features.iter().filter_map(|feature| match &feature.geometry {
        Geometry::Point { coordinates } => position(coordinates),
        _ => None,
    }));

    for feature in features {
        if let Geometry::LineString { coordinates } = &feature.geometry {
            locations.extend(
                coordinates
                    .as_array()
                    .into_iter()
                    .flatten()
                    .filter_map(position),
            );
        }
    }

    locations.extend(
        message
            .addresses
            .iter()
            .flatten()
            .filter_map(|address| address.coordinates.map(Location::from)),
    );

    locations.extend(
        message
            .pins
            .iter()
            .flatten()
            .map(|pin| Location::from(pin.coordinates)),
    );

    locations
}

fn features(message: &IncomingMessage) -> &[Feature] {
    message
        .geo_json
        .as_ref()
        .map(|collection| collection.features.as_slice())
        .unwrap_or_default()
}

/// Reads a `[lng, lat, ...]` position. Extra elements (altitude) are
/// ignored.
fn position(value: &serde_json::Value) -> Option<Location> {
    let pair = value.as_array()?;
    let lng = pair.first()?.as_f64()?;
    let lat = pair.get(1)?.as_f64()?;

    if !lng.is_finite() || !lat.is_finite() {
        return None;
    }

    Some(Location::new(lat, lng))
}
