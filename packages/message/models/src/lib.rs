#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Upstream civic message wire types and the normalized news item format.
//!
//! Both upstream services (OboApp and Updates) publish
//! [`IncomingMessage`] records with the same overall shape. They differ in
//! a handful of rules captured by [`Dialect`]. Every message is eventually
//! normalized into a [`NewsItem`], which is what the app renders.

use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

/// Topic assigned to news items whose message carries no categories.
pub const UNCATEGORIZED_TOPIC: &str = "uncategorized";

/// The upstream service family a payload came from.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum Dialect {
    /// The OboApp aggregation API.
    #[serde(rename = "oboapp")]
    #[strum(serialize = "oboapp")]
    OboApp,
    /// The Updates API. Every message is tied to a locality.
    Updates,
}

/// A message field that can supply the display date of a news item.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateField {
    /// When the upstream finalized the message.
    FinalizedAt,
    /// End of the message's relevance window.
    TimespanEnd,
    /// When the upstream first created the message.
    CreatedAt,
}

impl Dialect {
    /// Returns all variants of this enum.
    #[must_use]
    pub const fn all() -> &'static [Self] {
        &[Self::OboApp, Self::Updates]
    }

    /// Human-readable service name.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::OboApp => "OboApp",
            Self::Updates => "Updates",
        }
    }

    /// Error context used when a message list payload is rejected.
    #[must_use]
    pub const fn messages_context(self) -> &'static str {
        match self {
            Self::OboApp => "OboApp messages",
            Self::Updates => "Updates list",
        }
    }

    /// Error context used when a single-message payload is rejected.
    #[must_use]
    pub const fn message_context(self) -> &'static str {
        match self {
            Self::OboApp => "OboApp message",
            Self::Updates => "Updates message",
        }
    }

    /// Error context used when a sources payload is rejected.
    #[must_use]
    pub const fn sources_context(self) -> &'static str {
        match self {
            Self::OboApp => "OboApp sources",
            Self::Updates => "Updates sources",
        }
    }

    /// Whether every message must carry a `locality`.
    #[must_use]
    pub const fn requires_locality(self) -> bool {
        matches!(self, Self::Updates)
    }

    /// Candidate fields for the display date, in preference order.
    ///
    /// `createdAt` is always last since it is the only required instant.
    #[must_use]
    pub const fn date_preference(self) -> &'static [DateField] {
        match self {
            Self::OboApp => &[DateField::FinalizedAt, DateField::CreatedAt],
            Self::Updates => &[
                DateField::FinalizedAt,
                DateField::TimespanEnd,
                DateField::CreatedAt,
            ],
        }
    }
}

/// Display language of the app. Only Bulgarian and English are supported.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, Display, AsRefStr,
)]
pub enum Language {
    /// `bg-BG`
    #[strum(serialize = "bg-BG")]
    #[serde(rename = "bg")]
    Bulgarian,
    /// `en-US`
    #[default]
    #[strum(serialize = "en-US")]
    #[serde(rename = "en")]
    English,
}

impl Language {
    /// Picks the language for a tag such as `"bg"`, `"bg-BG"` or `"en"`.
    ///
    /// Anything that is not Bulgarian falls back to English.
    #[must_use]
    pub fn from_tag(tag: &str) -> Self {
        if tag.trim().to_ascii_lowercase().starts_with("bg") {
            Self::Bulgarian
        } else {
            Self::English
        }
    }

    /// BCP 47 locale tag used for date formatting.
    #[must_use]
    pub const fn locale_tag(self) -> &'static str {
        match self {
            Self::Bulgarian => "bg-BG",
            Self::English => "en-US",
        }
    }
}

// ── Upstream wire types ─────────────────────────────────────────────

/// A `{lat, lng}` coordinate pair as published upstream.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    /// Latitude (WGS84).
    pub lat: f64,
    /// Longitude (WGS84).
    pub lng: f64,
}

/// A geocoded (or not) address mentioned by a message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Address {
    /// Address text as it appeared in the source.
    pub original_text: String,
    /// Address text after upstream normalization.
    pub formatted_address: String,
    /// Resolved coordinates, if geocoding succeeded.
    pub coordinates: Option<Coordinates>,
}

/// A `{start, end}` window. The values are instants in string form and are
/// not validated at the schema layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Timespan {
    /// Window start.
    pub start: String,
    /// Window end.
    pub end: String,
}

/// A single point of interest with its own time windows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pin {
    /// Address text of the pin.
    pub address: String,
    /// Pin position.
    pub coordinates: Coordinates,
    /// When the pin applies.
    #[serde(default)]
    pub timespans: Vec<Timespan>,
}

/// A street segment between two cross streets.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Street {
    /// Street name.
    pub street: String,
    /// Cross street where the segment starts.
    pub from: String,
    /// Position of the starting cross street.
    pub from_coordinates: Option<Coordinates>,
    /// Cross street where the segment ends.
    pub to: String,
    /// Position of the ending cross street.
    pub to_coordinates: Option<Coordinates>,
    /// When the segment applies.
    #[serde(default)]
    pub timespans: Vec<Timespan>,
}

/// The literal `"FeatureCollection"` tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FeatureCollectionKind {
    /// `"FeatureCollection"`
    FeatureCollection,
}

/// The literal `"Feature"` tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FeatureKind {
    /// `"Feature"`
    Feature,
}

/// A `GeoJSON` geometry restricted to the three types upstream emits.
///
/// Coordinates stay untyped here; consumers interpret them according to the
/// tag, so a malformed nested array never rejects a whole payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Geometry {
    /// `[lng, lat]`
    Point {
        /// Raw coordinate value.
        coordinates: serde_json::Value,
    },
    /// `[[lng, lat], ...]`
    LineString {
        /// Raw coordinate value.
        coordinates: serde_json::Value,
    },
    /// `[[[lng, lat], ...], ...]`
    Polygon {
        /// Raw coordinate value.
        coordinates: serde_json::Value,
    },
}

/// A `GeoJSON` feature.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Feature {
    /// Always `"Feature"`.
    #[serde(rename = "type")]
    pub kind: FeatureKind,
    /// Feature geometry.
    pub geometry: Geometry,
    /// Arbitrary feature properties.
    #[serde(default)]
    pub properties: Option<serde_json::Map<String, serde_json::Value>>,
}

/// A `GeoJSON` feature collection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureCollection {
    /// Always `"FeatureCollection"`.
    #[serde(rename = "type")]
    pub kind: FeatureCollectionKind,
    /// Features in upstream order.
    pub features: Vec<Feature>,
}

/// One civic update as published by an upstream service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IncomingMessage {
    /// Upstream identifier. Messages without one are keyed by `created_at`.
    pub id: Option<String>,
    /// Raw message text.
    pub text: String,
    /// Pre-rendered plain text.
    pub plain_text: Option<String>,
    /// Pre-rendered markdown.
    pub markdown_text: Option<String>,
    /// Addresses mentioned by the message.
    pub addresses: Option<Vec<Address>>,
    /// Geometry attached to the message.
    pub geo_json: Option<FeatureCollection>,
    /// Creation instant.
    pub created_at: String,
    /// Finalization instant.
    pub finalized_at: Option<String>,
    /// Identifier of the publishing source.
    pub source: Option<String>,
    /// Link to the original publication.
    pub source_url: Option<String>,
    /// Category slugs.
    pub categories: Option<Vec<String>>,
    /// Start of the relevance window.
    pub timespan_start: Option<String>,
    /// End of the relevance window.
    pub timespan_end: Option<String>,
    /// Whether the message applies to the whole city.
    pub city_wide: Option<bool>,
    /// Entity responsible for the event (utility company, contractor...).
    pub responsible_entity: Option<String>,
    /// Points of interest.
    pub pins: Option<Vec<Pin>>,
    /// Affected street segments.
    pub streets: Option<Vec<Street>>,
    /// Affected public transport stops.
    pub bus_stops: Option<Vec<String>>,
    /// Locality the message belongs to. Required by [`Dialect::Updates`].
    pub locality: Option<String>,
}

/// A publisher of upstream messages.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Source {
    /// Identifier referenced by [`IncomingMessage::source`].
    pub id: String,
    /// Display name.
    pub name: String,
    /// Publisher homepage.
    pub url: String,
    /// Publisher logo.
    pub logo_url: Option<String>,
    /// Locality the publisher covers.
    pub locality: Option<String>,
}

/// `{messages: [...]}`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessagesEnvelope {
    /// Messages in upstream order.
    pub messages: Vec<IncomingMessage>,
}

/// `{message: {...}}`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessageEnvelope {
    /// The requested message.
    pub message: IncomingMessage,
}

/// `{sources: [...]}`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourcesEnvelope {
    /// All known sources.
    pub sources: Vec<Source>,
}

// ── Normalized output ───────────────────────────────────────────────

/// A map position.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Location {
    /// Latitude (WGS84).
    pub latitude: f64,
    /// Longitude (WGS84).
    pub longitude: f64,
}

impl Location {
    /// Creates a location from latitude and longitude.
    #[must_use]
    pub const fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }
}

impl From<Coordinates> for Location {
    fn from(value: Coordinates) -> Self {
        Self::new(value.lat, value.lng)
    }
}

/// Where a news item sits relative to its relevance window.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum TimespanStatus {
    /// The window has started (or has no start) and has not ended.
    Active,
    /// The window starts in the future.
    Upcoming,
    /// The window ended in the past.
    Ended,
}

/// A normalized address.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewsAddress {
    /// Address text as it appeared in the source.
    pub original_text: String,
    /// Address text after upstream normalization.
    pub formatted_address: String,
    /// Resolved position.
    pub location: Option<Location>,
}

/// A normalized time window. Unparseable instants become `None`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewsTimespan {
    /// ISO 8601 start.
    pub start: Option<String>,
    /// ISO 8601 end.
    pub end: Option<String>,
}

/// A normalized pin.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewsPin {
    /// Address text.
    pub address: String,
    /// Pin position.
    pub location: Location,
    /// When the pin applies.
    pub timespans: Vec<NewsTimespan>,
}

/// A normalized street segment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewsStreet {
    /// Street name.
    pub street: String,
    /// Starting cross street.
    pub from: String,
    /// Starting cross street position.
    pub from_location: Option<Location>,
    /// Ending cross street.
    pub to: String,
    /// Ending cross street position.
    pub to_location: Option<Location>,
    /// When the segment applies.
    pub timespans: Vec<NewsTimespan>,
}

/// A news card ready for rendering.
///
/// Built from exactly one [`IncomingMessage`]. Upstream messages have no
/// title, so `title` is always `None` for them and cards render the
/// snippet instead.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewsItem {
    /// Stable identifier.
    pub id: String,
    /// Card title.
    pub title: Option<String>,
    /// Short plain-text excerpt.
    pub snippet: String,
    /// Source name, raw source identifier or locality.
    pub description: Option<String>,
    /// Long-form localized date.
    pub date: String,
    /// First category or [`UNCATEGORIZED_TOPIC`].
    pub topic: String,
    /// Representative map position.
    pub location: Option<Location>,
    /// All category slugs.
    pub categories: Vec<String>,
    /// Raw source identifier.
    pub source_id: Option<String>,
    /// Source display name.
    pub source_name: Option<String>,
    /// Link to the original publication.
    pub source_url: Option<String>,
    /// Source logo.
    pub source_logo_url: Option<String>,
    /// Raw message text.
    pub text: String,
    /// Plain text variant.
    pub plain_text: Option<String>,
    /// Markdown variant.
    pub markdown_text: Option<String>,
    /// ISO 8601 window start.
    pub timespan_start: Option<String>,
    /// ISO 8601 window end.
    pub timespan_end: Option<String>,
    /// Window status relative to the mapping instant.
    pub timespan_status: Option<TimespanStatus>,
    /// Whether the message applies to the whole city.
    pub city_wide: bool,
    /// Responsible entity.
    pub responsible_entity: Option<String>,
    /// Locality of the message.
    pub locality: Option<String>,
    /// Normalized addresses.
    pub addresses: Vec<NewsAddress>,
    /// Normalized pins.
    pub pins: Vec<NewsPin>,
    /// Normalized street segments.
    pub streets: Vec<NewsStreet>,
    /// Affected public transport stops.
    pub bus_stops: Vec<String>,
    /// Every position found in the message.
    pub locations: Vec<Location>,
    /// ISO 8601 creation instant.
    pub created_at: Option<String>,
    /// ISO 8601 finalization instant.
    pub finalized_at: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dialect_parses_case_insensitively() {
        assert_eq!("OboApp".parse::<Dialect>().unwrap(), Dialect::OboApp);
        assert_eq!("updates".parse::<Dialect>().unwrap(), Dialect::Updates);
        assert_eq!(
            "payload".parse::<Dialect>(),
            Err(strum::ParseError::VariantNotFound)
        );
    }

    #[test]
    fn dialect_serde_names_match_strum() {
        for dialect in Dialect::all() {
            let json = serde_json::to_string(dialect).unwrap();
            assert_eq!(json, format!("\"{dialect}\""));
        }
    }

    #[test]
    fn only_updates_requires_locality() {
        assert!(!Dialect::OboApp.requires_locality());
        assert!(Dialect::Updates.requires_locality());
    }

    #[test]
    fn date_preference_ends_with_created_at() {
        for dialect in Dialect::all() {
            assert_eq!(
                dialect.date_preference().last(),
                Some(&DateField::CreatedAt)
            );
        }
        assert_eq!(
            Dialect::Updates.date_preference()[1],
            DateField::TimespanEnd
        );
    }

    #[test]
    fn language_from_tag_is_two_way() {
        assert_eq!(Language::from_tag("bg"), Language::Bulgarian);
        assert_eq!(Language::from_tag("BG-bg"), Language::Bulgarian);
        assert_eq!(Language::from_tag("en"), Language::English);
        assert_eq!(Language::from_tag("de-DE"), Language::English);
        assert_eq!(Language::Bulgarian.locale_tag(), "bg-BG");
        assert_eq!(Language::English.to_string(), "en-US");
    }

    #[test]
    fn coordinates_convert_to_location() {
        let location = Location::from(Coordinates {
            lat: 42.7,
            lng: 23.32,
        });
        assert_eq!(location, Location::new(42.7, 23.32));
    }

    #[test]
    fn timespan_status_serializes_lowercase() {
        assert_eq!(
            serde_json::to_string(&TimespanStatus::Upcoming).unwrap(),
            "\"upcoming\""
        );
    }
}
