#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! API request and response types for the civic feed news service.
//!
//! News items and sources are served in their normalized model shape;
//! this crate only adds the query parameters and the small envelopes the
//! server needs on top of them.

use civic_feed_message_models::{Dialect, Language};
use civic_feed_viewport::MapBounds;
use serde::{Deserialize, Serialize};

/// Query parameters for the news list endpoint.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewsQueryParams {
    /// Upstream service id. Defaults to the first enabled service.
    pub service: Option<String>,
    /// Northern viewport edge.
    pub north: Option<f64>,
    /// Southern viewport edge.
    pub south: Option<f64>,
    /// Eastern viewport edge.
    pub east: Option<f64>,
    /// Western viewport edge.
    pub west: Option<f64>,
    /// Map zoom level.
    pub zoom: Option<f64>,
    /// Comma-separated category slugs.
    pub categories: Option<String>,
    /// UI language tag (e.g., `bg`, `en-US`).
    pub lang: Option<String>,
    /// Drop items whose representative location is outside the bounds.
    #[serde(default)]
    pub clip: bool,
}

impl NewsQueryParams {
    /// The viewport, only when all four edges are given.
    #[must_use]
    pub fn bounds(&self) -> Option<MapBounds> {
        Some(MapBounds::new(self.north?, self.south?, self.east?, self.west?))
    }

    /// Category slugs, trimmed, with empty entries removed.
    #[must_use]
    pub fn category_slugs(&self) -> Vec<String> {
        self.categories
            .as_deref()
            .map(|s| {
                s.split(',')
                    .map(str::trim)
                    .filter(|c| !c.is_empty())
                    .map(ToString::to_string)
                    .collect()
            })
            .unwrap_or_default()
    }

    /// The requested display language.
    #[must_use]
    pub fn language(&self) -> Language {
        self.lang.as_deref().map(Language::from_tag).unwrap_or_default()
    }
}

/// Query parameters for the single news item endpoint.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewsItemQueryParams {
    /// Upstream service id.
    pub service: Option<String>,
    /// UI language tag.
    pub lang: Option<String>,
}

impl NewsItemQueryParams {
    /// The requested display language.
    #[must_use]
    pub fn language(&self) -> Language {
        self.lang.as_deref().map(Language::from_tag).unwrap_or_default()
    }
}

/// Query parameters for the sources endpoint.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SourcesQueryParams {
    /// Upstream service id.
    pub service: Option<String>,
}

/// An upstream service as listed by the API.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiService {
    /// Service id, usable as the `service` query parameter.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Payload dialect.
    pub dialect: Dialect,
    /// Whether single items can be looked up by id.
    pub supports_lookup: bool,
}

/// Bounds and zoom derived from a map region.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ApiViewport {
    /// Viewport edges.
    pub bounds: MapBounds,
    /// Estimated zoom level.
    pub zoom: f64,
}

/// Health check response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiHealth {
    /// Whether the server is healthy.
    pub healthy: bool,
    /// Server version.
    pub version: String,
}

/// Error body returned with every non-2xx response.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiError {
    /// Human-readable error message.
    pub error: String,
    /// Seconds until the same request may be retried.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retry_after_secs: Option<u64>,
}

impl ApiError {
    /// An error without retry information.
    #[must_use]
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            retry_after_secs: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(json: &str) -> NewsQueryParams {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn bounds_require_all_edges() {
        let full = params(r#"{"north":42.8,"south":42.6,"east":23.5,"west":23.1}"#);
        assert_eq!(full.bounds(), Some(MapBounds::new(42.8, 42.6, 23.5, 23.1)));

        let partial = params(r#"{"north":42.8,"south":42.6,"east":23.5}"#);
        assert_eq!(partial.bounds(), None);
    }

    #[test]
    fn splits_category_slugs() {
        let p = params(r#"{"categories":"water, heating,,roads "}"#);
        assert_eq!(p.category_slugs(), vec!["water", "heating", "roads"]);
        assert!(NewsQueryParams::default().category_slugs().is_empty());
    }

    #[test]
    fn language_defaults_to_english() {
        assert_eq!(NewsQueryParams::default().language(), Language::English);
        assert_eq!(params(r#"{"lang":"bg"}"#).language(), Language::Bulgarian);
        assert!(!params("{}").clip);
    }

    #[test]
    fn error_omits_missing_retry_after() {
        let json = serde_json::to_value(ApiError::new("boom")).unwrap();
        assert_eq!(json, serde_json::json!({"error": "boom"}));

        let json = serde_json::to_value(ApiError {
            error: "cooling down".to_string(),
            retry_after_secs: Some(12),
        })
        .unwrap();
        assert_eq!(json["retryAfterSecs"], 12);
    }
}
