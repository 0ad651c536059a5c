//! API token health check.

use serde::Serialize;
use tracing::{debug, warn};

use webmon_core::models::TokenStatus;
use webmon_data::client::{ApiTransport, CallContext};

pub const PING_PATH: &str = "/ping";

pub const MESSAGE_WORKING: &str = "Data source is working";
pub const MESSAGE_INVALID_TOKEN: &str = "Invalid Token";
pub const MESSAGE_UNKNOWN: &str = "Couldn't check Token validity";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HealthStatus {
    Ok,
    Error,
    Unknown,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HealthCheckResult {
    pub status: HealthStatus,
    pub message: String,
}

impl HealthCheckResult {
    pub fn new(status: HealthStatus, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    pub fn is_ok(&self) -> bool {
        self.status == HealthStatus::Ok
    }
}

/// Ask the API whether the bearer token in `ctx` is accepted.
///
/// HTTP and transport failures report `Error` with the underlying error text;
/// a body that does not decode reports `Unknown`.
pub async fn check_api_token(transport: &dyn ApiTransport, ctx: &CallContext) -> HealthCheckResult {
    let body = match transport.get(ctx, PING_PATH, &[]).await {
        Ok(body) => body,
        Err(e) => {
            warn!(error = %e, "token check request failed");
            return HealthCheckResult::new(HealthStatus::Error, e.to_string());
        }
    };

    let status: TokenStatus = match serde_json::from_slice(&body) {
        Ok(status) => status,
        Err(e) => {
            warn!(error = %e, "token check response not understood");
            return HealthCheckResult::new(HealthStatus::Unknown, MESSAGE_UNKNOWN);
        }
    };

    debug!(token_valid = status.valid, "token checked");
    if status.valid {
        HealthCheckResult::new(HealthStatus::Ok, MESSAGE_WORKING)
    } else {
        HealthCheckResult::new(HealthStatus::Error, MESSAGE_INVALID_TOKEN)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
