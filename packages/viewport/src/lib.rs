#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Map viewport helpers.
//!
//! Converts a map region (center plus span) into north/south/east/west
//! bounds for upstream queries, estimates a zoom level from the span, and
//! filters news items down to the ones inside a viewport.

use civic_feed_message_models::{Location, NewsItem};
use geo::{Intersects as _, Point, Rect, coord};
use serde::{Deserialize, Serialize};

/// Smallest longitude span used for zoom estimation. Keeps `log2` away
/// from zero and negative spans.
pub const MIN_LONGITUDE_DELTA: f64 = 1e-6;

/// A visible map area: center plus full latitude/longitude span.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MapRegion {
    /// Center latitude.
    pub latitude: f64,
    /// Center longitude.
    pub longitude: f64,
    /// Full latitude span in degrees.
    pub latitude_delta: f64,
    /// Full longitude span in degrees.
    pub longitude_delta: f64,
}

/// A rectangular viewport in signed degrees.
///
/// `west > east` means the viewport wraps the antimeridian. Bounds are not
/// validated beyond that.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MapBounds {
    /// Northern latitude boundary.
    pub north: f64,
    /// Southern latitude boundary.
    pub south: f64,
    /// Eastern longitude boundary.
    pub east: f64,
    /// Western longitude boundary.
    pub west: f64,
}

impl MapBounds {
    /// Creates bounds from the four edges.
    #[must_use]
    pub const fn new(north: f64, south: f64, east: f64, west: f64) -> Self {
        Self {
            north,
            south,
            east,
            west,
        }
    }

    /// Whether the viewport crosses the antimeridian.
    #[must_use]
    pub fn wraps_antimeridian(&self) -> bool {
        self.west > self.east
    }

    /// Whether `location` lies inside the viewport. Edges are inclusive.
    #[must_use]
    pub fn contains(&self, location: &Location) -> bool {
        let point = Point::new(location.longitude, location.latitude);
        self.rects().iter().any(|rect| rect.intersects(&point))
    }

    /// One rectangle, or two when the viewport wraps the antimeridian.
    fn rects(&self) -> Vec<Rect<f64>> {
        if self.wraps_antimeridian() {
            vec![
                Rect::new(
                    coord! { x: self.west, y: self.south },
                    coord! { x: 180.0, y: self.north },
                ),
                Rect::new(
                    coord! { x: -180.0, y: self.south },
                    coord! { x: self.east, y: self.north },
                ),
            ]
        } else {
            vec![Rect::new(
                coord! { x: self.west, y: self.south },
                coord! { x: self.east, y: self.north },
            )]
        }
    }
}

/// Computes the bounds of `region` by applying half of each span around
/// the center.
///
/// Longitudes are wrapped into `[-180, 180]`, so a region whose span
/// crosses the antimeridian yields `west > east`. A span of a full turn or
/// more covers every longitude.
#[must_use]
pub fn bounds_from_region(region: &MapRegion) -> MapBounds {
    let half_lat = region.latitude_delta / 2.0;
    let half_lng = region.longitude_delta / 2.0;

    let (east, west) = if region.longitude_delta >= 360.0 {
        (180.0, -180.0)
    } else {
        (
            wrap_longitude(region.longitude + half_lng),
            wrap_longitude(region.longitude - half_lng),
        )
    };

    MapBounds {
        north: region.latitude + half_lat,
        south: region.latitude - half_lat,
        east,
        west,
    }
}

/// Maps a longitude into `[-180, 180]`. In-range values are returned as is.
fn wrap_longitude(longitude: f64) -> f64 {
    if (-180.0..=180.0).contains(&longitude) {
        longitude
    } else {
        (longitude + 180.0).rem_euclid(360.0) - 180.0
    }
}

/// Approximates a web-map zoom level from the longitude span:
/// `log2(360 / span)`.
#[must_use]
pub fn estimate_zoom(region: &MapRegion) -> f64 {
    (360.0 / region.longitude_delta.max(MIN_LONGITUDE_DELTA)).log2()
}

/// Keeps the items whose representative location is inside `bounds`.
/// Items without a location are dropped.
#[must_use]
pub fn filter_within_bounds(items: Vec<NewsItem>, bounds: &MapBounds) -> Vec<NewsItem> {
    let total = items.len();
    let kept: Vec<NewsItem> = items
        .into_iter()
        .filter(|item| item.location.is_some_and(|l| bounds.contains(&l)))
        .collect();

    log::debug!("Kept {}/{total} news items inside {bounds:?}", kept.len());

    kept
}
