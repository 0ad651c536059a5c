//! Fetchers for the four web monitoring collections.
//!
//! Every fetcher reports failures as [`MonitorError::Fetch`] tagged with its
//! [`Resource`]; the underlying transport or decode error is logged here and
//! not passed on. Cancellation is passed through unchanged.

use chrono::{DateTime, FixedOffset, Utc};
use tracing::{debug, error};

use webmon_core::error::Resource;
use webmon_core::models::{
    Alarm, AlarmsResponse, Location, Monitor, MonitorResult, MonitorResultsResponse,
    MonitorsResponse,
};
use webmon_core::time_utils::format_request_timestamp;
use webmon_core::{MonitorError, Result};

use crate::client::{ApiTransport, CallContext};
use crate::paginator::{decode_page, Paginator};

pub const LOCATIONS_PATH: &str = "/webMonitoring/locations";
pub const MONITORS_PATH: &str = "/webMonitoring/monitors";
pub const MONITOR_RESULTS_PATH: &str = "/webMonitoring/monitorResults";
pub const ALARMS_PATH: &str = "/webMonitoring/alarms";

/// All check locations (single request, bare JSON array).
pub async fn fetch_locations(
    transport: &dyn ApiTransport,
    ctx: &CallContext,
) -> Result<Vec<Location>> {
    let result = async {
        let body = transport.get(ctx, LOCATIONS_PATH, &[]).await?;
        let locations: Vec<Location> = serde_json::from_slice(&body)?;
        Ok::<_, MonitorError>(locations)
    }
    .await;

    let locations = result.map_err(|e| fetch_failed(Resource::Locations, e))?;
    debug!(count = locations.len(), "locations fetched");
    Ok(locations)
}

/// All configured monitors, across every page.
pub async fn fetch_monitors(
    transport: &dyn ApiTransport,
    ctx: &CallContext,
) -> Result<Vec<Monitor>> {
    let monitors = Paginator::new(
        transport,
        ctx,
        MONITORS_PATH,
        Vec::new(),
        decode_page::<MonitorsResponse, Monitor>,
    )
    .collect_all()
    .await
    .map_err(|e| fetch_failed(Resource::Monitors, e))?;

    debug!(count = monitors.len(), "monitors fetched");
    Ok(monitors)
}

/// Response-time samples of one monitor within `[from, to)`.
///
/// The range is sent with its own offset.
pub async fn fetch_monitor_results(
    transport: &dyn ApiTransport,
    ctx: &CallContext,
    monitor_id: &str,
    from: &DateTime<FixedOffset>,
    to: &DateTime<FixedOffset>,
) -> Result<Vec<MonitorResult>> {
    debug!(monitor_id, %from, %to, "requesting monitor results");

    let params = vec![
        ("monitorid", monitor_id.to_string()),
        ("start", format_request_timestamp(from)),
        ("end", format_request_timestamp(to)),
    ];

    let results = Paginator::new(
        transport,
        ctx,
        MONITOR_RESULTS_PATH,
        params,
        decode_page::<MonitorResultsResponse, MonitorResult>,
    )
    .collect_all()
    .await
    .map_err(|e| fetch_failed(Resource::MonitorResults, e))?;

    debug!(monitor_id, count = results.len(), "monitor results fetched");
    Ok(results)
}

/// Alarms raised within `[from, to)`; the range is sent in UTC.
pub async fn fetch_alarms(
    transport: &dyn ApiTransport,
    ctx: &CallContext,
    from: &DateTime<FixedOffset>,
    to: &DateTime<FixedOffset>,
) -> Result<Vec<Alarm>> {
    let from = from.with_timezone(&Utc);
    let to = to.with_timezone(&Utc);
    debug!(%from, %to, "requesting alarms");

    let params = vec![
        ("start", format_request_timestamp(&from)),
        ("end", format_request_timestamp(&to)),
    ];

    let alarms = Paginator::new(
        transport,
        ctx,
        ALARMS_PATH,
        params,
        decode_page::<AlarmsResponse, Alarm>,
    )
    .collect_all()
    .await
    .map_err(|e| fetch_failed(Resource::Alarms, e))?;

    debug!(count = alarms.len(), "alarms fetched");
    Ok(alarms)
}

/// Log the underlying cause and reduce it to the fetcher-level error.
fn fetch_failed(resource: Resource, err: MonitorError) -> MonitorError {
    if err.is_cancelled() {
        debug!(%resource, "fetch cancelled");
    } else {
        error!(%resource, error = %err, "fetch failed");
    }
    err.into_fetch_error(resource)
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::ScriptedTransport;
    use serde_json::json;
    use tokio_util::sync::CancellationToken;
    use webmon_core::error::FetchFailure;
    use webmon_core::time_utils::parse_rfc3339;

    fn ctx() -> CallContext {
        CallContext::new("tok", CancellationToken::new())
    }

    fn range() -> (DateTime<FixedOffset>, DateTime<FixedOffset>) {
        (
            parse_rfc3339("2024-03-01T12:00:00+02:00").unwrap(),
            parse_rfc3339("2024-03-02T12:00:00+02:00").unwrap(),
        )
    }

    #[tokio::test]
    async fn test_fetch_locations_decodes_bare_array() {
        let transport = ScriptedTransport::new().with_json(
            LOCATIONS_PATH,
            json!([
                {"locationId": 1, "continent": "Europe", "countryCode": "de", "city": "Berlin"},
                {"locationId": 2, "continent": "Europe", "countryCode": "fr", "city": "Paris"}
            ]),
        );

        let locations = fetch_locations(&transport, &ctx()).await.unwrap();
        assert_eq!(locations.len(), 2);
        assert_eq!(locations[1].city, "Paris");
        assert!(transport.requests()[0].params.is_empty());
    }

    #[tokio::test]
    async fn test_fetch_locations_failure_is_tagged() {
        let transport = ScriptedTransport::new().with_error(
            LOCATIONS_PATH,
            MonitorError::Transport("dns error: no such host".to_string()),
        );

        let err = fetch_locations(&transport, &ctx()).await.unwrap_err();
        assert!(matches!(
            err,
            MonitorError::Fetch {
                resource: Resource::Locations,
                failure: FetchFailure::ApiCall
            }
        ));
        // Transport details do not leak into the caller-facing message.
        assert!(!err.to_string().contains("dns"));
    }

    #[tokio::test]
    async fn test_fetch_monitors_follows_pages() {
        let transport = ScriptedTransport::new()
            .with_json(
                MONITORS_PATH,
                json!({"monitors": [{"monitorId": "m1", "type": "http", "name": "A", "url": "https://a"}],
                       "continuationToken": "next"}),
            )
            .with_json(
                MONITORS_PATH,
                json!({"monitors": [{"monitorId": "m2", "type": "ping", "name": "B", "url": "b"}]}),
            );

        let monitors = fetch_monitors(&transport, &ctx()).await.unwrap();
        let ids: Vec<&str> = monitors.iter().map(|m| m.monitor_id.as_str()).collect();
        assert_eq!(ids, vec!["m1", "m2"]);
        assert_eq!(transport.requests()[1].param("continuationToken"), Some("next"));
    }

    #[tokio::test]
    async fn test_fetch_monitors_parse_failure_is_tagged() {
        let transport = ScriptedTransport::new().with_body(MONITORS_PATH, b"not json".to_vec());

        let err = fetch_monitors(&transport, &ctx()).await.unwrap_err();
        assert!(matches!(
            err,
            MonitorError::Fetch {
                resource: Resource::Monitors,
                failure: FetchFailure::Parsing
            }
        ));
    }

    #[tokio::test]
    async fn test_fetch_monitor_results_sends_filter_with_offset() {
        let transport = ScriptedTransport::new().with_json(
            MONITOR_RESULTS_PATH,
            json!({"monitorResults": [
                {"locationId": 1, "time": "2024-03-01T10:00:00Z", "status": "up", "responseTimeMs": 50}
            ]}),
        );
        let (from, to) = range();

        let results = fetch_monitor_results(&transport, &ctx(), "m1", &from, &to)
            .await
            .unwrap();
        assert_eq!(results.len(), 1);

        let request = &transport.requests()[0];
        assert_eq!(request.param("monitorid"), Some("m1"));
        assert_eq!(request.param("start"), Some("2024-03-01T12:00:00+02:00"));
        assert_eq!(request.param("end"), Some("2024-03-02T12:00:00+02:00"));
    }

    #[tokio::test]
    async fn test_fetch_alarms_sends_utc_range() {
        let transport = ScriptedTransport::new().with_json(ALARMS_PATH, json!({"alarms": []}));
        let (from, to) = range();

        let alarms = fetch_alarms(&transport, &ctx(), &from, &to).await.unwrap();
        assert!(alarms.is_empty());

        let request = &transport.requests()[0];
        assert_eq!(request.param("start"), Some("2024-03-01T10:00:00Z"));
        assert_eq!(request.param("end"), Some("2024-03-02T10:00:00Z"));
        assert!(request.param("monitorid").is_none());
    }

    #[tokio::test]
    async fn test_fetch_alarms_cancellation_passes_through() {
        let cancel = CancellationToken::new();
        let transport = ScriptedTransport::new()
            .with_json(ALARMS_PATH, json!({"alarms": [], "continuationToken": "t1"}))
            .with_json(ALARMS_PATH, json!({"alarms": []}))
            .cancel_after(1, cancel.clone());
        let (from, to) = range();

        let err = fetch_alarms(&transport, &CallContext::new("tok", cancel), &from, &to)
            .await
            .unwrap_err();
        assert!(err.is_cancelled());
        assert_eq!(transport.request_count(), 1);
    }
}
