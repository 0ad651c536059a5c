//! Data source facade: batch queries, resource calls and health checks.
//!
//! Every entry point takes the caller's bearer token and cancellation token;
//! nothing is cached between calls.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use futures::future::join_all;
use serde::ser::SerializeStruct;
use serde::{Serialize, Serializer};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use webmon_core::frame::Frame;
use webmon_core::settings::ClientConfig;
use webmon_core::{MonitorError, Result};
use webmon_data::client::{ApiClient, ApiTransport, CallContext};
use webmon_data::fetchers::fetch_monitors;

use crate::health::{check_api_token, HealthCheckResult, HealthStatus};
use crate::query::{run_query, DataQuery};

/// Resource path listing every monitor.
pub const MONITORS_RESOURCE_PATH: &str = "rm/webmonitoring/monitors";

// ── Responses ─────────────────────────────────────────────────────────────────

/// Outcome of one query: its frames, or the error that stopped it.
#[derive(Debug, Default)]
pub struct DataResponse {
    pub frames: Vec<Frame>,
    pub error: Option<MonitorError>,
}

impl DataResponse {
    pub fn from_result(result: Result<Vec<Frame>>) -> Self {
        match result {
            Ok(frames) => Self {
                frames,
                error: None,
            },
            Err(e) => Self {
                frames: Vec::new(),
                error: Some(e),
            },
        }
    }
}

impl Serialize for DataResponse {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let len = if self.error.is_some() { 2 } else { 1 };
        let mut state = serializer.serialize_struct("DataResponse", len)?;
        state.serialize_field("frames", &self.frames)?;
        if let Some(error) = &self.error {
            state.serialize_field("error", &error.to_string())?;
        }
        state.end()
    }
}

/// Responses of a batch keyed by reference id.
#[derive(Debug, Default, Serialize)]
#[serde(transparent)]
pub struct QueryDataResponse {
    pub responses: HashMap<String, DataResponse>,
}

/// Raw answer to a resource call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceResponse {
    pub status: u16,
    pub body: Vec<u8>,
}

impl ResourceResponse {
    pub fn not_found() -> Self {
        Self {
            status: 404,
            body: Vec::new(),
        }
    }
}

// ── WebMonitoringDataSource ───────────────────────────────────────────────────

pub struct WebMonitoringDataSource {
    transport: Arc<dyn ApiTransport>,
}

impl WebMonitoringDataSource {
    pub fn new(transport: Arc<dyn ApiTransport>) -> Self {
        Self { transport }
    }

    /// Build a data source talking to the real API.
    pub fn from_config(config: &ClientConfig) -> Result<Self> {
        let client = ApiClient::new(config)?;
        Ok(Self::new(Arc::new(client)))
    }

    /// Resolve every query of a batch concurrently.
    ///
    /// Failures stay with the query that produced them. Only a missing token
    /// fails the batch as a whole, before any request is made.
    pub async fn query_data(
        &self,
        api_token: &str,
        queries: &[DataQuery],
        cancel: &CancellationToken,
    ) -> Result<QueryDataResponse> {
        let ctx = call_context(api_token, cancel)?;
        let started = Instant::now();
        info!(queries = queries.len(), "resolving query batch");

        let transport = self.transport.as_ref();
        let ctx = &ctx;
        let outcomes = join_all(queries.iter().map(|query| async move {
            let result = run_query(transport, ctx, query).await;
            if let Err(e) = &result {
                warn!(ref_id = %query.ref_id, error = %e, "query failed");
            }
            (query.ref_id.clone(), DataResponse::from_result(result))
        }))
        .await;

        let responses: HashMap<String, DataResponse> = outcomes.into_iter().collect();
        debug!(
            queries = queries.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "query batch resolved"
        );
        Ok(QueryDataResponse { responses })
    }

    /// Serve a resource path.
    ///
    /// A missing token fails the call whatever the path. Only
    /// [`MONITORS_RESOURCE_PATH`] is known; everything else is a 404.
    pub async fn call_resource(
        &self,
        api_token: &str,
        path: &str,
        cancel: &CancellationToken,
    ) -> Result<ResourceResponse> {
        let ctx = call_context(api_token, cancel)?;

        if path != MONITORS_RESOURCE_PATH {
            debug!(path, "unknown resource path");
            return Ok(ResourceResponse::not_found());
        }

        let monitors = fetch_monitors(self.transport.as_ref(), &ctx).await?;
        let body = serde_json::to_vec(&monitors)?;
        Ok(ResourceResponse { status: 200, body })
    }

    /// Check the caller's token against the API.
    pub async fn check_health(&self, api_token: &str, cancel: &CancellationToken) -> HealthCheckResult {
        match call_context(api_token, cancel) {
            Ok(ctx) => check_api_token(self.transport.as_ref(), &ctx).await,
            Err(e) => HealthCheckResult::new(HealthStatus::Error, e.to_string()),
        }
    }
}

fn call_context(api_token: &str, cancel: &CancellationToken) -> Result<CallContext> {
    if api_token.is_empty() {
        return Err(MonitorError::Config("missing API token".to_string()));
    }
    Ok(CallContext::new(api_token, cancel.clone()))
}

// ── Tests ─────────────────────────────────────────────────────────────────────
