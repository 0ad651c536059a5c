use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::time_utils::deserialize_optional_timestamp;

/// A location the monitoring service checks monitors from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Location {
    #[serde(rename = "locationId")]
    pub location_id: i64,
    #[serde(default)]
    pub continent: String,
    /// ISO country code as delivered by the API (case is not normalised).
    #[serde(rename = "countryCode", default)]
    pub country_code: String,
    #[serde(default)]
    pub city: String,
}

impl Location {
    /// Display name used as the series name, e.g. `"Berlin (DE)"`.
    pub fn display_name(&self) -> String {
        format!("{} ({})", self.city, self.country_code.to_uppercase())
    }
}

/// A configured uptime monitor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Monitor {
    #[serde(rename = "monitorId")]
    pub monitor_id: String,
    #[serde(rename = "type", default)]
    pub monitor_type: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub url: String,
}

/// One response-time sample of a monitor taken from one location.
///
/// The monitor is implied by the request filter and is not part of the record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonitorResult {
    #[serde(rename = "locationId")]
    pub location_id: i64,
    pub time: DateTime<Utc>,
    #[serde(default)]
    pub status: String,
    #[serde(rename = "responseTimeMs", default)]
    pub response_time_ms: i64,
}

/// An alarm raised for a monitor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Alarm {
    #[serde(rename = "monitorId")]
    pub monitor_id: String,
    #[serde(rename = "alarmType", default)]
    pub alarm_type: String,
    #[serde(rename = "foundAt")]
    pub found_at: DateTime<Utc>,
    /// `None` while the alarm is still open.
    #[serde(
        rename = "resolvedAt",
        default,
        deserialize_with = "deserialize_optional_timestamp"
    )]
    pub resolved_at: Option<DateTime<Utc>>,
    /// `None` while nobody acknowledged the alarm.
    #[serde(
        rename = "acknowledgedAt",
        default,
        deserialize_with = "deserialize_optional_timestamp"
    )]
    pub acknowledged_at: Option<DateTime<Utc>>,
    /// Opaque duration string as delivered by the API.
    #[serde(default)]
    pub duration: String,
    #[serde(rename = "alarmStatus", default)]
    pub status: String,
}

// ── Page envelopes ────────────────────────────────────────────────────────────

/// One decoded page: the items plus the cursor for the next request.
#[derive(Debug, Clone, PartialEq)]
pub struct Page<T> {
    pub items: Vec<T>,
    /// `None` (or empty on the wire) when no further page exists.
    pub continuation_token: Option<String>,
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>, continuation_token: Option<String>) -> Self {
        Self {
            items,
            continuation_token: continuation_token.filter(|t| !t.is_empty()),
        }
    }

    /// Page without a continuation token.
    pub fn last(items: Vec<T>) -> Self {
        Self::new(items, None)
    }
}

/// `GET /webMonitoring/monitors` response body.
#[derive(Debug, Deserialize)]
pub struct MonitorsResponse {
    #[serde(default)]
    pub monitors: Vec<Monitor>,
    #[serde(rename = "continuationToken", default)]
    pub continuation_token: Option<String>,
}

/// `GET /webMonitoring/monitorResults` response body.
#[derive(Debug, Deserialize)]
pub struct MonitorResultsResponse {
    #[serde(rename = "monitorResults", default)]
    pub monitor_results: Vec<MonitorResult>,
    #[serde(rename = "continuationToken", default)]
    pub continuation_token: Option<String>,
}

/// `GET /webMonitoring/alarms` response body.
#[derive(Debug, Deserialize)]
pub struct AlarmsResponse {
    #[serde(default)]
    pub alarms: Vec<Alarm>,
    #[serde(rename = "continuationToken", default)]
    pub continuation_token: Option<String>,
}

impl From<MonitorsResponse> for Page<Monitor> {
    fn from(r: MonitorsResponse) -> Self {
        Page::new(r.monitors, r.continuation_token)
    }
}

impl From<MonitorResultsResponse> for Page<MonitorResult> {
    fn from(r: MonitorResultsResponse) -> Self {
        Page::new(r.monitor_results, r.continuation_token)
    }
}

impl From<AlarmsResponse> for Page<Alarm> {
    fn from(r: AlarmsResponse) -> Self {
        Page::new(r.alarms, r.continuation_token)
    }
}

/// `GET /ping` response body.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct TokenStatus {
    #[serde(rename = "token_valid")]
    pub valid: bool,
}

// ── Tests ──────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone as _;

    #[test]
    fn test_location_display_name_uppercases_country() {
        let loc = Location {
            location_id: 1,
            continent: "Europe".to_string(),
            country_code: "de".to_string(),
            city: "Berlin".to_string(),
        };
        assert_eq!(loc.display_name(), "Berlin (DE)");
    }

    #[test]
    fn test_location_decodes_wire_names() {
        let json = r#"[{"locationId": 7, "continent": "Asia", "countryCode": "jp", "city": "Tokyo"}]"#;
        let locations: Vec<Location> = serde_json::from_str(json).unwrap();
        assert_eq!(locations.len(), 1);
        assert_eq!(locations[0].location_id, 7);
        assert_eq!(locations[0].country_code, "jp");
    }

    #[test]
    fn test_monitor_serializes_with_wire_names() {
        let monitor = Monitor {
            monitor_id: "m1".to_string(),
            monitor_type: "http".to_string(),
            name: "Site A".to_string(),
            url: "https://a.example".to_string(),
        };
        let value = serde_json::to_value(&monitor).unwrap();
        assert_eq!(value["monitorId"], "m1");
        assert_eq!(value["type"], "http");
        assert_eq!(value["name"], "Site A");
        assert_eq!(value["url"], "https://a.example");
    }

    #[test]
    fn test_monitor_results_page_without_token() {
        let json = r#"{"monitorResults": [
            {"locationId": 1, "time": "2024-03-01T10:00:00Z", "status": "up", "responseTimeMs": 50}
        ]}"#;
        let page: Page<MonitorResult> = serde_json::from_str::<MonitorResultsResponse>(json)
            .unwrap()
            .into();
        assert_eq!(page.items.len(), 1);
        assert_eq!(page.items[0].response_time_ms, 50);
        assert_eq!(
            page.items[0].time,
            Utc.with_ymd_and_hms(2024, 3, 1, 10, 0, 0).unwrap()
        );
        assert!(page.continuation_token.is_none());
    }

    #[test]
    fn test_empty_continuation_token_terminates() {
        let json = r#"{"monitors": [], "continuationToken": ""}"#;
        let page: Page<Monitor> = serde_json::from_str::<MonitorsResponse>(json)
            .unwrap()
            .into();
        assert!(page.continuation_token.is_none());
    }

    #[test]
    fn test_continuation_token_kept_verbatim() {
        let json = r#"{"alarms": [], "continuationToken": "abc+/= 1"}"#;
        let page: Page<Alarm> = serde_json::from_str::<AlarmsResponse>(json)
            .unwrap()
            .into();
        assert_eq!(page.continuation_token.as_deref(), Some("abc+/= 1"));
    }

    #[test]
    fn test_alarm_open_and_unacknowledged() {
        let json = r#"{
            "monitorId": "m1",
            "alarmType": "down",
            "foundAt": "2024-03-01T10:00:00Z",
            "resolvedAt": "0001-01-01T00:00:00Z",
            "duration": "00:05:00",
            "alarmStatus": "open"
        }"#;
        let alarm: Alarm = serde_json::from_str(json).unwrap();
        assert_eq!(alarm.alarm_type, "down");
        assert_eq!(alarm.status, "open");
        assert!(alarm.resolved_at.is_none());
        assert!(alarm.acknowledged_at.is_none());
    }

    #[test]
    fn test_token_status_decodes() {
        let status: TokenStatus = serde_json::from_str(r#"{"token_valid": true}"#).unwrap();
        assert!(status.valid);
    }
}
