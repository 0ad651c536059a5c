use chrono::{DateTime, FixedOffset, NaiveDate, SecondsFormat, TimeZone, Timelike, Utc};
use serde::{Deserialize, Deserializer};

use crate::error::{MonitorError, Result};

// ── Request timestamps ────────────────────────────────────────────────────────

/// Format a timestamp for a query parameter: RFC 3339, second precision,
/// keeping the zone offset (`Z` when the offset is zero).
pub fn format_request_timestamp<Tz>(dt: &DateTime<Tz>) -> String
where
    Tz: TimeZone,
    Tz::Offset: std::fmt::Display,
{
    dt.to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// Parse an RFC 3339 timestamp, keeping its offset.
pub fn parse_rfc3339(s: &str) -> Result<DateTime<FixedOffset>> {
    DateTime::parse_from_rfc3339(s.trim())
        .map_err(|e| MonitorError::Config(format!("invalid timestamp \"{}\": {}", s, e)))
}

// ── Display timestamps ────────────────────────────────────────────────────────

/// Format a UTC timestamp as RFC 3339 with up to nanosecond precision.
///
/// Trailing zero digits of the fractional second are dropped and the
/// fraction is omitted entirely for whole seconds, e.g.
/// `2024-03-01T10:00:00.5Z`, `2024-03-01T10:00:00Z`.
pub fn format_rfc3339_nano(dt: &DateTime<Utc>) -> String {
    let mut out = dt.format("%Y-%m-%dT%H:%M:%S").to_string();

    let nanos = dt.nanosecond() % 1_000_000_000;
    if nanos > 0 {
        let fraction = format!("{:09}", nanos);
        out.push('.');
        out.push_str(fraction.trim_end_matches('0'));
    }

    out.push('Z');
    out
}

/// Format an optional timestamp; absent values become an empty string.
pub fn format_optional_rfc3339_nano(dt: Option<&DateTime<Utc>>) -> String {
    dt.map(format_rfc3339_nano).unwrap_or_default()
}

// ── Optional timestamps on the wire ───────────────────────────────────────────

/// `0001-01-01T00:00:00Z`, which the API emits for "never happened".
fn zero_time() -> Option<DateTime<Utc>> {
    NaiveDate::from_ymd_opt(1, 1, 1)
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

/// `true` when `dt` is the zero-date sentinel.
pub fn is_zero_time(dt: &DateTime<Utc>) -> bool {
    zero_time().is_some_and(|zero| *dt == zero)
}

/// Serde helper for timestamps that may be absent.
///
/// A missing field, `null`, an empty string and the zero-date sentinel all
/// decode to `None`. Use with `#[serde(default, deserialize_with = ...)]`.
pub fn deserialize_optional_timestamp<'de, D>(
    deserializer: D,
) -> std::result::Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    let Some(raw) = raw.filter(|s| !s.trim().is_empty()) else {
        return Ok(None);
    };

    let dt = DateTime::parse_from_rfc3339(raw.trim())
        .map_err(serde::de::Error::custom)?
        .with_timezone(&Utc);

    if is_zero_time(&dt) {
        Ok(None)
    } else {
        Ok(Some(dt))
    }
}

// ── Tests ──────────────────────────────────────────────────────────────────────
