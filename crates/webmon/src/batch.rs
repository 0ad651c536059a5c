//! Turning `query` subcommand arguments into [`DataQuery`] values.
//!
//! A batch file looks like
//!
//! ```json
//! {
//!   "from": "2024-03-01T00:00:00Z",
//!   "to": "2024-03-02T00:00:00Z",
//!   "queries": [
//!     {"refId": "A", "queryProduct": "webmonitoring", "queryType": "alarms"},
//!     {"refId": "B", "maxDataPoints": 500, "queryProduct": "webmonitoring",
//!      "queryType": "monitorresults", "queryMonitorID": "m1"}
//!   ]
//! }
//! ```
//!
//! Every field besides `refId`, `maxDataPoints` and `intervalMs` is handed to
//! the data source untouched as the query payload.

use std::path::Path;

use anyhow::{bail, Context};
use chrono::{DateTime, Duration, Utc};
use serde::Deserialize;
use serde_json::{json, Map, Value};

use webmon_core::settings::QueryArgs;
use webmon_core::time_utils::parse_rfc3339;
use webmon_runtime::query::{DataQuery, TimeRange};

/// Span used when only `to` (or nothing) is given.
pub const DEFAULT_LOOKBACK_HOURS: i64 = 24;

#[derive(Debug, Deserialize)]
struct BatchFile {
    #[serde(default)]
    from: Option<String>,
    #[serde(default)]
    to: Option<String>,
    queries: Vec<BatchQuery>,
}

#[derive(Debug, Deserialize)]
struct BatchQuery {
    #[serde(rename = "refId")]
    ref_id: String,
    #[serde(rename = "maxDataPoints", default)]
    max_data_points: i64,
    #[serde(rename = "intervalMs", default)]
    interval_ms: Option<i64>,
    #[serde(flatten)]
    payload: Map<String, Value>,
}

/// Resolve the time range; `to` defaults to `now`, `from` to a day before `to`.
pub fn resolve_time_range(
    from: Option<&str>,
    to: Option<&str>,
    now: DateTime<Utc>,
) -> anyhow::Result<TimeRange> {
    let to = match to {
        Some(s) => parse_rfc3339(s)?,
        None => now.fixed_offset(),
    };
    let from = match from {
        Some(s) => parse_rfc3339(s)?,
        None => to - Duration::hours(DEFAULT_LOOKBACK_HOURS),
    };
    if from > to {
        bail!("time range starts after it ends ({from} > {to})");
    }
    Ok(TimeRange { from, to })
}

/// Sample spacing matching `max_data_points` over the range, or 0 without a hint.
pub fn interval_hint_ms(range: &TimeRange, max_data_points: i64) -> i64 {
    if max_data_points <= 0 {
        return 0;
    }
    (range.to - range.from).num_milliseconds() / max_data_points
}

/// Build the queries for one `query` invocation.
pub fn build_queries(args: &QueryArgs, now: DateTime<Utc>) -> anyhow::Result<Vec<DataQuery>> {
    if let Some(path) = &args.batch {
        return load_batch(path, now);
    }

    let time_range = resolve_time_range(args.from.as_deref(), args.to.as_deref(), now)?;
    Ok(vec![DataQuery {
        ref_id: args.ref_id.clone(),
        payload: json!({
            "queryProduct": args.product,
            "queryType": args.query_type,
            "queryMonitorID": args.monitor_id,
        }),
        time_range,
        max_data_points: args.max_data_points,
        interval_ms: interval_hint_ms(&time_range, args.max_data_points),
    }])
}

/// Read a batch file.
pub fn load_batch(path: &Path, now: DateTime<Utc>) -> anyhow::Result<Vec<DataQuery>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("reading batch file {}", path.display()))?;
    let batch: BatchFile = serde_json::from_str(&content)
        .with_context(|| format!("parsing batch file {}", path.display()))?;

    let time_range = resolve_time_range(batch.from.as_deref(), batch.to.as_deref(), now)?;
    tracing::debug!(
        queries = batch.queries.len(),
        from = %time_range.from,
        to = %time_range.to,
        "batch file loaded"
    );

    Ok(batch
        .queries
        .into_iter()
        .map(|q| DataQuery {
            interval_ms: q
                .interval_ms
                .unwrap_or_else(|| interval_hint_ms(&time_range, q.max_data_points)),
            ref_id: q.ref_id,
            payload: Value::Object(q.payload),
            time_range,
            max_data_points: q.max_data_points,
        })
        .collect())
}

// ── Tests ──────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 2, 12, 0, 0).unwrap()
    }

    fn args() -> QueryArgs {
        QueryArgs {
            product: "webmonitoring".to_string(),
            query_type: "monitorresults".to_string(),
            monitor_id: "m1".to_string(),
            from: None,
            to: None,
            ref_id: "A".to_string(),
            max_data_points: 0,
            batch: None,
        }
    }

    #[test]
    fn test_default_range_is_last_day() {
        let range = resolve_time_range(None, None, now()).unwrap();
        assert_eq!(range.to, now().fixed_offset());
        assert_eq!(range.to - range.from, Duration::hours(24));
    }

    #[test]
    fn test_explicit_range_keeps_offsets() {
        let range = resolve_time_range(
            Some("2024-03-01T08:00:00+02:00"),
            Some("2024-03-01T10:00:00+02:00"),
            now(),
        )
        .unwrap();
        assert_eq!(range.from.to_rfc3339(), "2024-03-01T08:00:00+02:00");
        assert_eq!(range.to - range.from, Duration::hours(2));
    }

    #[test]
    fn test_reversed_range_is_rejected() {
        assert!(resolve_time_range(
            Some("2024-03-02T00:00:00Z"),
            Some("2024-03-01T00:00:00Z"),
            now()
        )
        .is_err());
    }

    #[test]
    fn test_bad_timestamp_is_rejected() {
        assert!(resolve_time_range(Some("yesterday"), None, now()).is_err());
    }

    #[test]
    fn test_single_query_from_flags() {
        let mut args = args();
        args.max_data_points = 1440;

        let queries = build_queries(&args, now()).unwrap();
        assert_eq!(queries.len(), 1);

        let query = &queries[0];
        assert_eq!(query.ref_id, "A");
        assert_eq!(
            query.payload,
            json!({"queryProduct": "webmonitoring", "queryType": "monitorresults", "queryMonitorID": "m1"})
        );
        assert_eq!(query.max_data_points, 1440);
        assert_eq!(query.interval_ms, 60_000);
    }

    #[test]
    fn test_batch_file() {
        let mut file = NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{
                "from": "2024-03-01T00:00:00Z",
                "to": "2024-03-02T00:00:00Z",
                "queries": [
                    {{"refId": "A", "queryProduct": "webmonitoring", "queryType": "alarms"}},
                    {{"refId": "B", "maxDataPoints": 24, "intervalMs": 5,
                      "queryProduct": "webmonitoring", "queryType": "monitors", "extra": 1}}
                ]
            }}"#
        )
        .unwrap();

        let mut args = args();
        args.batch = Some(file.path().to_path_buf());
        let queries = build_queries(&args, now()).unwrap();

        assert_eq!(queries.len(), 2);
        assert_eq!(queries[0].ref_id, "A");
        assert_eq!(
            queries[0].payload,
            json!({"queryProduct": "webmonitoring", "queryType": "alarms"})
        );
        assert_eq!(queries[0].interval_ms, 0);
        assert_eq!(queries[1].max_data_points, 24);
        assert_eq!(queries[1].interval_ms, 5);
        assert_eq!(queries[1].payload["extra"], json!(1));
        assert!(queries[1].payload.get("refId").is_none());
        assert_eq!(queries[1].time_range.from.to_rfc3339(), "2024-03-01T00:00:00+00:00");
    }

    #[test]
    fn test_missing_batch_file() {
        let mut args = args();
        args.batch = Some("/nonexistent/batch.json".into());
        let err = build_queries(&args, now()).unwrap_err();
        assert!(err.to_string().contains("reading batch file"));
    }
}
