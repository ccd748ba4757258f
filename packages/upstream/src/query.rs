//! Query strings for the message list endpoints.

use civic_feed_viewport::MapBounds;
use url::form_urlencoded::byte_serialize;

/// Filters for a message list request.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MessageQuery {
    /// Viewport to restrict messages to.
    pub bounds: Option<MapBounds>,
    /// Map zoom level. Only sent when finite.
    pub zoom: Option<f64>,
    /// Category slugs. Only sent when non-empty.
    pub categories: Vec<String>,
}

impl MessageQuery {
    /// Builds the query string (without the leading `?`).
    ///
    /// Bounds are sent as a complete `north`/`south`/`east`/`west` set.
    /// Categories are joined with a literal comma; the slugs themselves
    /// are percent-encoded but the separator is not.
    #[must_use]
    pub fn to_query_string(&self) -> String {
        let mut pairs: Vec<(&str, String)> = Vec::new();

        if let Some(bounds) = &self.bounds {
            pairs.push(("north", bounds.north.to_string()));
            pairs.push(("south", bounds.south.to_string()));
            pairs.push(("east", bounds.east.to_string()));
            pairs.push(("west", bounds.west.to_string()));
        }

        if let Some(zoom) = self.zoom.filter(|z| z.is_finite()) {
            pairs.push(("zoom", zoom.to_string()));
        }

        if !self.categories.is_empty() {
            let joined = self
                .categories
                .iter()
                .map(|slug| encode(slug))
                .collect::<Vec<_>>()
                .join(",");
            pairs.push(("categories", joined));
        }

        pairs
            .into_iter()
            .map(|(key, value)| format!("{key}={value}"))
            .collect::<Vec<_>>()
            .join("&")
    }

    /// Identifies this request for a given service, e.g. for cooldown
    /// bookkeeping.
    #[must_use]
    pub fn signature(&self, service_id: &str) -> String {
        format!("{service_id}?{}", self.to_query_string())
    }
}

/// Percent-encodes a single query value.
#[must_use]
pub fn encode(value: &str) -> String {
    byte_serialize(value.as_bytes()).collect()
}

/// Joins a base URL, an endpoint path and an optional query string.
#[must_use]
pub fn endpoint_url(base_url: &str, path: &str, query: &str) -> String {
    let base = base_url.trim_end_matches('/');
    let path = path.trim_start_matches('/');

    if query.is_empty() {
        format!("{base}/{path}")
    } else {
        format!("{base}/{path}?{query}")
    }
}
