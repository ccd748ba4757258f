//! Message → [`NewsItem`] mapping shared by both upstream dialects.
//!
//! The dialects only differ in which instant becomes the display date (see
//! [`Dialect::date_preference`]); everything else is identical.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use civic_feed_message_models::{
    DateField, Dialect, IncomingMessage, Language, Location, NewsAddress, NewsItem, NewsPin,
    NewsStreet, NewsTimespan, Source, Timespan, UNCATEGORIZED_TOPIC,
};

use crate::dates::{format_long_date, parse_instant, to_iso};
use crate::geometry::{collect_locations, resolve_location};
use crate::snippet::{DEFAULT_SNIPPET_LENGTH, extract_snippet};
use crate::timespan::classify_raw_timespan;

/// Sources keyed by identifier, used to enrich news items.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SourceIndex {
    by_id: BTreeMap<String, Source>,
}

impl SourceIndex {
    /// Indexes `sources` by id. Later duplicates replace earlier ones.
    #[must_use]
    pub fn new(sources: impl IntoIterator<Item = Source>) -> Self {
        Self {
            by_id: sources
                .into_iter()
                .map(|source| (source.id.clone(), source))
                .collect(),
        }
    }

    /// Looks up a source by id.
    #[must_use]
    pub fn get(&self, id: &str) -> Option<&Source> {
        self.by_id.get(id)
    }
}

impl FromIterator<Source> for SourceIndex {
    fn from_iter<T: IntoIterator<Item = Source>>(iter: T) -> Self {
        Self::new(iter)
    }
}

/// Everything a mapping needs besides the message itself.
#[derive(Debug, Clone, Copy)]
pub struct MappingContext<'a> {
    /// Upstream the message came from.
    pub dialect: Dialect,
    /// Language for the display date.
    pub language: Language,
    /// Optional source enrichment.
    pub sources: Option<&'a SourceIndex>,
    /// Reference instant for the timespan status.
    pub now: DateTime<Utc>,
}

impl<'a> MappingContext<'a> {
    /// Creates a context without source enrichment.
    #[must_use]
    pub const fn new(dialect: Dialect, language: Language, now: DateTime<Utc>) -> Self {
        Self {
            dialect,
            language,
            sources: None,
            now,
        }
    }

    /// Attaches a source index.
    #[must_use]
    pub const fn with_sources(mut self, sources: &'a SourceIndex) -> Self {
        self.sources = Some(sources);
        self
    }
}

/// Maps one validated message into a news card. Never fails.
#[must_use]
pub fn map_message(message: &IncomingMessage, ctx: &MappingContext<'_>) -> NewsItem {
    let source = message
        .source
        .as_deref()
        .and_then(|id| ctx.sources.and_then(|index| index.get(id)));

    let categories = message.categories.clone().unwrap_or_default();
    let topic = categories
        .first()
        .cloned()
        .unwrap_or_else(|| UNCATEGORIZED_TOPIC.to_string());

    let description = source
        .map(|s| s.name.clone())
        .or_else(|| message.source.clone())
        .or_else(|| message.locality.clone());

    NewsItem {
        id: message
            .id
            .clone()
            .unwrap_or_else(|| message.created_at.clone()),
        title: None,
        snippet: extract_snippet(snippet_text(message), DEFAULT_SNIPPET_LENGTH),
        description,
        date: display_date(message, ctx),
        topic,
        location: resolve_location(message),
        categories,
        source_id: message.source.clone(),
        source_name: source.map(|s| s.name.clone()),
        source_url: message
            .source_url
            .clone()
            .or_else(|| source.map(|s| s.url.clone())),
        source_logo_url: source.and_then(|s| s.logo_url.clone()),
        text: message.text.clone(),
        plain_text: message.plain_text.clone(),
        markdown_text: message.markdown_text.clone(),
        timespan_start: message.timespan_start.as_deref().and_then(to_iso),
        timespan_end: message.timespan_end.as_deref().and_then(to_iso),
        timespan_status: classify_raw_timespan(
            message.timespan_start.as_deref(),
            message.timespan_end.as_deref(),
            ctx.now,
        ),
        city_wide: message.city_wide.unwrap_or(false),
        responsible_entity: message.responsible_entity.clone(),
        locality: message.locality.clone(),
        addresses: message
            .addresses
            .iter()
            .flatten()
            .map(|address| NewsAddress {
                original_text: address.original_text.clone(),
                formatted_address: address.formatted_address.clone(),
                location: address.coordinates.map(Location::from),
            })
            .collect(),
        pins: message
            .pins
            .iter()
            .flatten()
            .map(|pin| NewsPin {
                address: pin.address.clone(),
                location: pin.coordinates.into(),
                timespans: normalize_timespans(&pin.timespans),
            })
            .collect(),
        streets: message
            .streets
            .iter()
            .flatten()
            .map(|street| NewsStreet {
                street: street.street.clone(),
                from: street.from.clone(),
                from_location: street.from_coordinates.map(Location::from),
                to: street.to.clone(),
                to_location: street.to_coordinates.map(Location::from),
                timespans: normalize_timespans(&street.timespans),
            })
            .collect(),
        bus_stops: message.bus_stops.clone().unwrap_or_default(),
        locations: collect_locations(message),
        created_at: to_iso(&message.created_at),
        finalized_at: message.finalized_at.as_deref().and_then(to_iso),
    }
}

/// Maps a batch of messages, preserving order.
#[must_use]
pub fn map_messages(messages: &[IncomingMessage], ctx: &MappingContext<'_>) -> Vec<NewsItem> {
    let items: Vec<NewsItem> = messages.iter().map(|m| map_message(m, ctx)).collect();

    let unplaced = items.iter().filter(|item| item.location.is_none()).count();
    if unplaced > 0 {
        log::debug!(
            "{}: {unplaced}/{} news items have no map position",
            ctx.dialect.label(),
            items.len()
        );
    }

    items
}

fn snippet_text(message: &IncomingMessage) -> &str {
    [&message.plain_text, &message.markdown_text]
        .into_iter()
        .flatten()
        .map(String::as_str)
        .find(|text| !text.trim().is_empty())
        .unwrap_or(&message.text)
}

/// Picks the first parseable instant in the dialect's preference order. If
/// none parse, the raw creation string is shown as-is.
fn display_date(message: &IncomingMessage, ctx: &MappingContext<'_>) -> String {
    ctx.dialect
        .date_preference()
        .iter()
        .find_map(|field| {
            let raw = match field {
                DateField::FinalizedAt => message.finalized_at.as_deref(),
                DateField::TimespanEnd => message.timespan_end.as_deref(),
                DateField::CreatedAt => Some(message.created_at.as_str()),
            }?;
            parse_instant(raw)
        })
        .map_or_else(
            || message.created_at.clone(),
            |instant| format_long_date(&instant, ctx.language),
        )
}

fn normalize_timespans(timespans: &[Timespan]) -> Vec<NewsTimespan> {
    timespans
        .iter()
        .map(|timespan| NewsTimespan {
            start: to_iso(&timespan.start),
            end: to_iso(&timespan.end),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone as _;
    use civic_feed_message_models::TimespanStatus;
    use serde_json::json;

    use super::*;
    use crate::schema::parse_messages;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 1, 12, 0, 0).unwrap()
    }

    fn parse(dialect: Dialect, extra: serde_json::Value) -> IncomingMessage {
        let mut message = json!({
            "text": "**Water outage** on Vitosha Blvd",
            "createdAt": "2025-01-05T08:00:00Z",
            "locality": "bg.sofia",
        });
        for (k, v) in extra.as_object().unwrap() {
            message[k] = v.clone();
        }
        parse_messages(json!({ "messages": [message] }), dialect)
            .unwrap()
            .remove(0)
    }

    fn sources() -> SourceIndex {
        SourceIndex::new([Source {
            id: "sofiyska-voda".to_string(),
            name: "Sofiyska Voda".to_string(),
            url: "https://example.org".to_string(),
            logo_url: Some("https://example.org/logo.png".to_string()),
            locality: Some("bg.sofia".to_string()),
        }])
    }

    #[test]
    fn maps_minimal_message_with_defaults() {
        let message = parse(Dialect::OboApp, json!({}));
        let item = map_message(
            &message,
            &MappingContext::new(Dialect::OboApp, Language::English, now()),
        );

        assert_eq!(item.id, "2025-01-05T08:00:00Z");
        assert!(item.title.is_none());
        assert_eq!(item.snippet, "Water outage on Vitosha Blvd");
        assert_eq!(item.topic, UNCATEGORIZED_TOPIC);
        assert_eq!(item.date, "January 5, 2025");
        assert_eq!(item.description.as_deref(), Some("bg.sofia"));
        assert!(item.location.is_none());
        assert!(item.timespan_status.is_none());
        assert!(!item.city_wide);
        assert!(item.addresses.is_empty() && item.pins.is_empty() && item.locations.is_empty());
        assert_eq!(item.created_at.as_deref(), Some("2025-01-05T08:00:00.000Z"));
    }

    #[test]
    fn enriches_from_source_index() {
        let message = parse(
            Dialect::OboApp,
            json!({ "id": "m1", "source": "sofiyska-voda", "categories": ["water", "utilities"] }),
        );
        let index = sources();
        let ctx = MappingContext::new(Dialect::OboApp, Language::English, now()).with_sources(&index);
        let item = map_message(&message, &ctx);

        assert_eq!(item.id, "m1");
        assert_eq!(item.topic, "water");
        assert_eq!(item.categories, vec!["water", "utilities"]);
        assert_eq!(item.description.as_deref(), Some("Sofiyska Voda"));
        assert_eq!(item.source_name.as_deref(), Some("Sofiyska Voda"));
        assert_eq!(item.source_url.as_deref(), Some("https://example.org"));
        assert_eq!(
            item.source_logo_url.as_deref(),
            Some("https://example.org/logo.png")
        );
    }

    #[test]
    fn unknown_source_falls_back_to_raw_id() {
        let message = parse(Dialect::OboApp, json!({ "source": "toplofikacia" }));
        let index = sources();
        let ctx = MappingContext::new(Dialect::OboApp, Language::English, now()).with_sources(&index);
        let item = map_message(&message, &ctx);
        assert_eq!(item.description.as_deref(), Some("toplofikacia"));
        assert!(item.source_name.is_none());
    }

    #[test]
    fn oboapp_prefers_finalized_then_created() {
        let message = parse(
            Dialect::OboApp,
            json!({ "finalizedAt": "2025-02-10T09:00:00Z", "timespanEnd": "2025-04-01T00:00:00Z" }),
        );
        let ctx = MappingContext::new(Dialect::OboApp, Language::English, now());
        assert_eq!(map_message(&message, &ctx).date, "February 10, 2025");

        let message = parse(Dialect::OboApp, json!({ "timespanEnd": "2025-04-01T00:00:00Z" }));
        assert_eq!(map_message(&message, &ctx).date, "January 5, 2025");
    }

    #[test]
    fn updates_prefers_finalized_then_timespan_end() {
        let ctx = MappingContext::new(Dialect::Updates, Language::English, now());

        let message = parse(Dialect::Updates, json!({ "timespanEnd": "2025-04-01T00:00:00Z" }));
        assert_eq!(map_message(&message, &ctx).date, "April 1, 2025");

        let message = parse(
            Dialect::Updates,
            json!({ "finalizedAt": "2025-02-10T09:00:00Z", "timespanEnd": "2025-04-01T00:00:00Z" }),
        );
        assert_eq!(map_message(&message, &ctx).date, "February 10, 2025");
    }

    #[test]
    fn unparseable_dates_fall_back_to_raw_created_at() {
        let message = parse(
            Dialect::OboApp,
            json!({ "createdAt": "sometime", "finalizedAt": "later" }),
        );
        let ctx = MappingContext::new(Dialect::OboApp, Language::English, now());
        let item = map_message(&message, &ctx);
        assert_eq!(item.date, "sometime");
        assert!(item.created_at.is_none());
        assert!(item.finalized_at.is_none());
    }

    #[test]
    fn derives_timespan_fields() {
        let message = parse(
            Dialect::Updates,
            json!({
                "timespanStart": "2025-02-28T00:00:00+02:00",
                "timespanEnd": "2025-03-02T00:00:00Z",
            }),
        );
        let ctx = MappingContext::new(Dialect::Updates, Language::English, now());
        let item = map_message(&message, &ctx);

        assert_eq!(item.timespan_status, Some(TimespanStatus::Active));
        assert_eq!(
            item.timespan_start.as_deref(),
            Some("2025-02-27T22:00:00.000Z")
        );
        assert_eq!(
            to_iso(item.timespan_start.as_deref().unwrap()).as_deref(),
            item.timespan_start.as_deref()
        );
    }

    #[test]
    fn normalizes_structured_locations() {
        let message = parse(
            Dialect::OboApp,
            json!({
                "cityWide": true,
                "busStops": ["0123", "0456"],
                "geoJson": {
                    "type": "FeatureCollection",
                    "features": [{ "type": "Feature", "geometry": { "type": "Point", "coordinates": [23.32, 42.70] } }]
                },
                "addresses": [{
                    "originalText": "ul. Shipka 5",
                    "formattedAddress": "Shipka St 5",
                    "coordinates": { "lat": 42.69, "lng": 23.33 }
                }],
                "pins": [{
                    "address": "Pin",
                    "coordinates": { "lat": 42.68, "lng": 23.34 },
                    "timespans": [{ "start": "2025-03-01", "end": "garbage" }]
                }],
                "streets": [{
                    "street": "Rakovski",
                    "from": "Shipka",
                    "fromCoordinates": { "lat": 42.67, "lng": 23.35 },
                    "to": "Tsar Osvoboditel"
                }],
            }),
        );
        let ctx = MappingContext::new(Dialect::OboApp, Language::English, now());
        let item = map_message(&message, &ctx);

        assert!(item.city_wide);
        assert_eq!(item.bus_stops, vec!["0123", "0456"]);
        assert_eq!(item.location, Some(Location::new(42.70, 23.32)));
        assert_eq!(item.locations.len(), 3);
        assert_eq!(item.addresses[0].location, Some(Location::new(42.69, 23.33)));
        assert_eq!(
            item.pins[0].timespans,
            vec![NewsTimespan {
                start: Some("2025-03-01T00:00:00.000Z".to_string()),
                end: None,
            }]
        );
        assert_eq!(item.streets[0].from_location, Some(Location::new(42.67, 23.35)));
        assert!(item.streets[0].to_location.is_none());
    }

    #[test]
    fn snippet_prefers_plain_text() {
        let message = parse(
            Dialect::OboApp,
            json!({ "plainText": "Plain version", "markdownText": "# Markdown version" }),
        );
        let ctx = MappingContext::new(Dialect::OboApp, Language::English, now());
        assert_eq!(map_message(&message, &ctx).snippet, "Plain version");

        let message = parse(
            Dialect::OboApp,
            json!({ "plainText": "  ", "markdownText": "# Markdown version" }),
        );
        assert_eq!(map_message(&message, &ctx).snippet, "Markdown version");
    }

    #[test]
    fn batch_mapping_preserves_order() {
        let messages = vec![
            parse(Dialect::OboApp, json!({ "id": "b" })),
            parse(Dialect::OboApp, json!({ "id": "a" })),
        ];
        let ctx = MappingContext::new(Dialect::OboApp, Language::Bulgarian, now());
        let ids: Vec<String> = map_messages(&messages, &ctx)
            .into_iter()
            .map(|item| item.id)
            .collect();
        assert_eq!(ids, vec!["b", "a"]);
    }
}
