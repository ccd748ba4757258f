//! Classification of a relevance window against the current instant.

use chrono::{DateTime, Utc};
use civic_feed_message_models::TimespanStatus;

use crate::dates::parse_instant;

/// Classifies a `start`/`end` window relative to `now`.
///
/// Checked in order: an `end` before `now` is [`TimespanStatus::Ended`], a
/// `start` after `now` is [`TimespanStatus::Upcoming`], anything else is
/// [`TimespanStatus::Active`]. With neither bound there is no status.
#[must_use]
pub fn classify_timespan(
    start: Option<DateTime<Utc>>,
    end: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
) -> Option<TimespanStatus> {
    if start.is_none() && end.is_none() {
        return None;
    }

    if end.is_some_and(|end| end < now) {
        return Some(TimespanStatus::Ended);
    }

    if start.is_some_and(|start| start > now) {
        return Some(TimespanStatus::Upcoming);
    }

    Some(TimespanStatus::Active)
}

/// [`classify_timespan`] over raw upstream strings.
///
/// Presence is decided on the raw values: a bound that is present but
/// unparseable still yields a status, it just never compares as before or
/// after `now`.
#[must_use]
pub fn classify_raw_timespan(
    start: Option<&str>,
    end: Option<&str>,
    now: DateTime<Utc>,
) -> Option<TimespanStatus> {
    if start.is_none() && end.is_none() {
        return None;
    }

    classify_timespan(
        start.and_then(parse_instant),
        end.and_then(parse_instant),
        now,
    )
    .or(Some(TimespanStatus::Active))
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, TimeZone as _};

    use super::*;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn window_around_now_is_active() {
        let t = now();
        assert_eq!(
            classify_timespan(Some(t - Duration::days(1)), Some(t + Duration::days(1)), t),
            Some(TimespanStatus::Active)
        );
    }

    #[test]
    fn future_start_is_upcoming() {
        let t = now();
        assert_eq!(
            classify_timespan(Some(t + Duration::days(1)), None, t),
            Some(TimespanStatus::Upcoming)
        );
    }

    #[test]
    fn past_end_is_ended() {
        let t = now();
        assert_eq!(
            classify_timespan(None, Some(t - Duration::days(1)), t),
            Some(TimespanStatus::Ended)
        );
    }

    #[test]
    fn no_bounds_has_no_status() {
        assert_eq!(classify_timespan(None, None, now()), None);
    }

    #[test]
    fn boundaries_count_as_active() {
        let t = now();
        assert_eq!(classify_timespan(Some(t), None, t), Some(TimespanStatus::Active));
        assert_eq!(classify_timespan(None, Some(t), t), Some(TimespanStatus::Active));
    }

    #[test]
    fn ended_takes_precedence_over_upcoming() {
        let t = now();
        assert_eq!(
            classify_timespan(Some(t + Duration::days(2)), Some(t - Duration::days(1)), t),
            Some(TimespanStatus::Ended)
        );
    }

    #[test]
    fn unparseable_bounds_never_compare() {
        assert_eq!(
            classify_raw_timespan(Some("not a date"), Some("2025-02-01T00:00:00Z"), now()),
            Some(TimespanStatus::Ended)
        );
        assert_eq!(
            classify_raw_timespan(Some("2025-03-01 garbage"), None, now()),
            Some(TimespanStatus::Active)
        );
        assert_eq!(
            classify_raw_timespan(None, Some("soon"), now()),
            Some(TimespanStatus::Active)
        );
    }

    #[test]
    fn raw_bounds_absent_have_no_status() {
        assert_eq!(classify_raw_timespan(None, None, now()), None);
    }
}
