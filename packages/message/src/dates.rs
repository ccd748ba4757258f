//! Parsing and rendering of upstream instants.
//!
//! Upstream instants are strings and are not validated by the schema, so
//! parsing is lenient and never fails loudly: anything unparseable is
//! `None`.

use chrono::{DateTime, Locale, NaiveDate, NaiveDateTime, SecondsFormat, Utc};
use civic_feed_message_models::Language;

/// Parses an upstream instant.
///
/// Accepts RFC 3339 (`2025-01-05T08:00:00+02:00`), a naive date-time
/// (`2025-01-05T08:00:00`, read as UTC) and a bare date (`2025-01-05`, UTC
/// midnight).
#[must_use]
pub fn parse_instant(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }

    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, format) {
            return Some(naive.and_utc());
        }
    }

    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

/// Renders an instant as `YYYY-MM-DDTHH:MM:SS.sssZ`.
#[must_use]
pub fn format_iso(instant: &DateTime<Utc>) -> String {
    instant.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Re-renders an upstream instant in ISO form. Applying it to its own
/// output yields the same string.
#[must_use]
pub fn to_iso(raw: &str) -> Option<String> {
    parse_instant(raw).map(|instant| format_iso(&instant))
}

/// Long-form date in the app language, e.g. `January 5, 2025` or
/// `5 януари 2025 г.`.
#[must_use]
pub fn format_long_date(instant: &DateTime<Utc>, language: Language) -> String {
    match language {
        Language::English => instant
            .format_localized("%B %-d, %Y", Locale::en_US)
            .to_string(),
        Language::Bulgarian => instant
            .format_localized("%-d %B %Y г.", Locale::bg_BG)
            .to_string(),
    }
}
