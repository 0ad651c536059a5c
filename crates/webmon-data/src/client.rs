//! Authenticated GET access to the monitoring REST API.
//!
//! [`ApiTransport`] is the seam the paginator and fetchers are written
//! against; [`ApiClient`] is the `reqwest` implementation used in production.

use std::time::Instant;

use async_trait::async_trait;
use reqwest::{header, Client, StatusCode};
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace, warn};

use webmon_core::settings::ClientConfig;
use webmon_core::{MonitorError, Result};

// ── CallContext ───────────────────────────────────────────────────────────────

/// Everything one invoking call shares with the requests it issues: the
/// bearer token and the cancellation signal bounding their lifetime.
#[derive(Clone)]
pub struct CallContext {
    api_token: String,
    cancel: CancellationToken,
}

impl CallContext {
    pub fn new(api_token: impl Into<String>, cancel: CancellationToken) -> Self {
        Self {
            api_token: api_token.into(),
            cancel,
        }
    }

    pub fn api_token(&self) -> &str {
        &self.api_token
    }

    pub fn cancellation(&self) -> &CancellationToken {
        &self.cancel
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Fail with [`MonitorError::Cancelled`] once the call has been cancelled.
    pub fn check_cancelled(&self) -> Result<()> {
        if self.is_cancelled() {
            Err(MonitorError::Cancelled)
        } else {
            Ok(())
        }
    }
}

impl std::fmt::Debug for CallContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CallContext")
            .field("api_token", &"<redacted>")
            .field("cancelled", &self.is_cancelled())
            .finish()
    }
}

// ── ApiTransport ──────────────────────────────────────────────────────────────

/// Issues one GET request and returns the raw response body.
#[async_trait]
pub trait ApiTransport: Send + Sync {
    /// `path` is relative to the API base (e.g. `/webMonitoring/alarms`);
    /// `params` are URL-encoded into the query string in order.
    async fn get(&self, ctx: &CallContext, path: &str, params: &[(&str, String)])
        -> Result<Vec<u8>>;
}

// ── ApiClient ─────────────────────────────────────────────────────────────────

/// `reqwest`-backed [`ApiTransport`].
#[derive(Debug, Clone)]
pub struct ApiClient {
    client: Client,
    base_url: String,
}

impl ApiClient {
    pub fn new(config: &ClientConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| MonitorError::Config(format!("cannot build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Absolute URL for an API path (without query string).
    pub fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    async fn send(&self, ctx: &CallContext, path: &str, params: &[(&str, String)]) -> Result<Vec<u8>> {
        let url = self.url(path);
        debug!(%url, ?params, "starting request");
        let started = Instant::now();

        let response = self
            .client
            .get(&url)
            .query(params)
            .header(header::AUTHORIZATION, format!("Bearer {}", ctx.api_token()))
            .send()
            .await
            .map_err(|e| classify_transport_error(&url, e))?;

        let status = response.status();
        if status != StatusCode::OK {
            warn!(%url, %status, "HTTP request returned non-OK status");
            return Err(MonitorError::Status(status.to_string()));
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| classify_transport_error(&url, e))?;

        debug!(
            %url,
            bytes = body.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "request finished"
        );
        trace!(body = %String::from_utf8_lossy(&body), "response body");

        Ok(body.to_vec())
    }
}

#[async_trait]
impl ApiTransport for ApiClient {
    async fn get(
        &self,
        ctx: &CallContext,
        path: &str,
        params: &[(&str, String)],
    ) -> Result<Vec<u8>> {
        ctx.check_cancelled()?;

        tokio::select! {
            biased;
            _ = ctx.cancellation().cancelled() => {
                debug!(path, "request cancelled");
                Err(MonitorError::Cancelled)
            }
            result = self.send(ctx, path, params) => result,
        }
    }
}

/// Map a `reqwest` failure that produced no usable response.
fn classify_transport_error(url: &str, err: reqwest::Error) -> MonitorError {
    let detail = if err.is_timeout() {
        format!("request timed out: {}", err)
    } else if err.is_connect() {
        format!("connection failed: {}", err)
    } else {
        err.to_string()
    };
    warn!(%url, error = %detail, "HTTP request failed");
    MonitorError::Transport(detail)
}

// ── Tests ─────────────────────────────────────────────────────────────────────
