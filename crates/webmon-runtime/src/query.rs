//! Query decoding, validation and routing.
//!
//! A query payload is validated into a [`QueryKind`] before anything touches
//! the network; [`run_query`] then fetches what the kind needs and hands the
//! collections to the matching aggregation.

use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use webmon_core::frame::Frame;
use webmon_core::{MonitorError, Result};
use webmon_data::aggregator::FrameAggregator;
use webmon_data::client::{ApiTransport, CallContext};
use webmon_data::fetchers::{fetch_alarms, fetch_locations, fetch_monitor_results, fetch_monitors};

/// The only product this data source serves.
pub const PRODUCT_WEB_MONITORING: &str = "webmonitoring";

// ── Inbound types ─────────────────────────────────────────────────────────────

/// Requested time window `[from, to)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeRange {
    pub from: DateTime<FixedOffset>,
    pub to: DateTime<FixedOffset>,
}

/// One query of a batch as delivered by the host.
#[derive(Debug, Clone, PartialEq)]
pub struct DataQuery {
    /// Opaque id keying this query's response.
    pub ref_id: String,
    /// Query-specific JSON object (`queryProduct`, `queryType`, `queryMonitorID`).
    pub payload: serde_json::Value,
    pub time_range: TimeRange,
    /// Display hint; not used for downsampling.
    pub max_data_points: i64,
    /// Suggested sample spacing in milliseconds; logged only.
    pub interval_ms: i64,
}

/// Wire shape of the query payload. Unknown fields are ignored and missing
/// ones read as empty.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct QueryModel {
    #[serde(rename = "queryProduct")]
    pub product: String,
    #[serde(rename = "queryType")]
    pub query_type: String,
    #[serde(rename = "queryMonitorID")]
    pub monitor_id: String,
}

// ── QueryKind ─────────────────────────────────────────────────────────────────

/// Validated aggregation to run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryKind {
    /// Response times of one monitor, one series per location.
    MonitorResults { monitor_id: String },
    /// Alarm table joined with monitor names.
    Alarms,
    /// Flat monitor listing.
    Monitors,
}

impl QueryKind {
    /// Validate a decoded payload.
    pub fn from_model(model: &QueryModel) -> Result<Self> {
        if model.product != PRODUCT_WEB_MONITORING {
            return Err(MonitorError::InvalidProduct(model.product.clone()));
        }

        match model.query_type.as_str() {
            "monitorresults" => {
                if model.monitor_id.is_empty() {
                    return Err(MonitorError::InvalidMonitorId);
                }
                Ok(QueryKind::MonitorResults {
                    monitor_id: model.monitor_id.clone(),
                })
            }
            "alarms" => Ok(QueryKind::Alarms),
            "monitors" => Ok(QueryKind::Monitors),
            other => Err(MonitorError::InvalidQueryType(other.to_string())),
        }
    }

    /// Decode and validate a raw payload.
    pub fn from_payload(payload: &serde_json::Value) -> Result<Self> {
        let model = QueryModel::deserialize(payload)
            .map_err(|e| MonitorError::InvalidQuery(e.to_string()))?;
        Self::from_model(&model)
    }
}

// ── Routing ───────────────────────────────────────────────────────────────────

/// Resolve one query into its frames.
///
/// Validation errors are returned before any request is issued.
pub async fn run_query(
    transport: &dyn ApiTransport,
    ctx: &CallContext,
    query: &DataQuery,
) -> Result<Vec<Frame>> {
    debug!(
        ref_id = %query.ref_id,
        payload = %query.payload,
        max_data_points = query.max_data_points,
        interval_ms = query.interval_ms,
        from = %query.time_range.from,
        to = %query.time_range.to,
        "running query"
    );

    let kind = QueryKind::from_payload(&query.payload)?;
    let TimeRange { from, to } = query.time_range;

    match kind {
        QueryKind::MonitorResults { monitor_id } => {
            info!(ref_id = %query.ref_id, %monitor_id, "monitor results query");
            let locations = fetch_locations(transport, ctx).await?;
            let results = fetch_monitor_results(transport, ctx, &monitor_id, &from, &to).await?;
            FrameAggregator::monitor_results_frames(&locations, &results)
        }
        QueryKind::Alarms => {
            let monitors = fetch_monitors(transport, ctx).await?;
            let alarms = fetch_alarms(transport, ctx, &from, &to).await?;
            Ok(vec![FrameAggregator::alarms_frame(&monitors, &alarms)?])
        }
        QueryKind::Monitors => {
            let monitors = fetch_monitors(transport, ctx).await?;
            Ok(vec![FrameAggregator::monitors_frame(&monitors)?])
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
