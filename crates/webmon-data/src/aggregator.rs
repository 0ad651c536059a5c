//! Projection of fetched collections into output frames.
//!
//! Lookup maps are built per call and dropped with it.

use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, Utc};
use tracing::debug;

use webmon_core::frame::{Field, Frame, FRAME_NAME};
use webmon_core::models::{Alarm, Location, Monitor, MonitorResult};
use webmon_core::time_utils::{format_optional_rfc3339_nano, format_rfc3339_nano};
use webmon_core::Result;

/// Unit attached to response-time fields.
pub const RESPONSE_TIME_UNIT: &str = "ms";

// ── LocationSeries ────────────────────────────────────────────────────────────

/// Response-time samples of one location, in arrival order.
#[derive(Debug, Clone, Default)]
struct LocationSeries {
    name: String,
    times: Vec<DateTime<Utc>>,
    values: Vec<i64>,
}

impl LocationSeries {
    fn new(name: String) -> Self {
        Self {
            name,
            ..Default::default()
        }
    }

    fn push(&mut self, result: &MonitorResult) {
        self.times.push(result.time);
        self.values.push(result.response_time_ms);
    }

    fn into_frame(self) -> Result<Frame> {
        Frame::new(
            FRAME_NAME,
            vec![
                Field::time("time", self.times),
                Field::number(self.name, self.values).with_unit(RESPONSE_TIME_UNIT),
            ],
        )
    }
}

// ── FrameAggregator ───────────────────────────────────────────────────────────

/// Stateless helper turning fetched collections into frames.
pub struct FrameAggregator;

impl FrameAggregator {
    /// One time-series frame per location that has samples.
    ///
    /// Samples keep their original order within a location. Frames are
    /// sorted by the location display name; samples whose location is
    /// unknown are grouped under an empty name.
    ///
    /// Unknown locations are intentionally kept apart per location id: each
    /// distinct unknown id yields its own `""`-named frame. Those frames sort
    /// first and stay ordered by id among themselves.
    pub fn monitor_results_frames(
        locations: &[Location],
        results: &[MonitorResult],
    ) -> Result<Vec<Frame>> {
        let names: HashMap<i64, String> = locations
            .iter()
            .map(|l| (l.location_id, l.display_name()))
            .collect();

        let mut groups: BTreeMap<i64, LocationSeries> = BTreeMap::new();
        for result in results {
            groups
                .entry(result.location_id)
                .or_insert_with(|| {
                    LocationSeries::new(names.get(&result.location_id).cloned().unwrap_or_default())
                })
                .push(result);
        }

        let mut series: Vec<LocationSeries> = groups.into_values().collect();
        series.sort_by(|a, b| a.name.cmp(&b.name));

        for s in &series {
            debug!(location = %s.name, samples = s.times.len(), "location series");
        }

        series.into_iter().map(LocationSeries::into_frame).collect()
    }

    /// Alarm table joined with monitor names.
    ///
    /// Alarms of monitors missing from `monitors` are dropped; the rest keep
    /// their original order.
    pub fn alarms_frame(monitors: &[Monitor], alarms: &[Alarm]) -> Result<Frame> {
        let monitor_names: HashMap<&str, &str> = monitors
            .iter()
            .map(|m| (m.monitor_id.as_str(), m.name.as_str()))
            .collect();

        let mut names = Vec::new();
        let mut alarm_types = Vec::new();
        let mut statuses = Vec::new();
        let mut found = Vec::new();
        let mut resolved = Vec::new();
        let mut acknowledged = Vec::new();
        let mut durations = Vec::new();

        for alarm in alarms {
            let Some(name) = monitor_names.get(alarm.monitor_id.as_str()) else {
                continue;
            };

            names.push(name.to_string());
            alarm_types.push(alarm.alarm_type.clone());
            statuses.push(alarm.status.clone());
            found.push(format_rfc3339_nano(&alarm.found_at));
            resolved.push(format_optional_rfc3339_nano(alarm.resolved_at.as_ref()));
            acknowledged.push(format_optional_rfc3339_nano(alarm.acknowledged_at.as_ref()));
            durations.push(alarm.duration.clone());
        }

        debug!(
            received = alarms.len(),
            kept = names.len(),
            "alarms joined with monitors"
        );

        Frame::new(
            FRAME_NAME,
            vec![
                Field::string("Monitor Name", names),
                Field::string("Alarm Type", alarm_types),
                Field::string("Status", statuses),
                Field::string("Found", found),
                Field::string("Resolved", resolved),
                Field::string("Acknowledged", acknowledged),
                Field::string("Duration", durations),
            ],
        )
    }

    /// Flat monitor listing in fetch order.
    pub fn monitors_frame(monitors: &[Monitor]) -> Result<Frame> {
        let names = monitors.iter().map(|m| m.name.clone()).collect();
        let types = monitors.iter().map(|m| m.monitor_type.clone()).collect();
        let urls = monitors.iter().map(|m| m.url.clone()).collect();

        Frame::new(
            FRAME_NAME,
            vec![
                Field::string("Name", names),
                Field::string("Monitor Type", types),
                Field::string("URL", urls),
            ],
        )
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
