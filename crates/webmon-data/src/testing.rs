//! In-memory [`ApiTransport`] replaying scripted responses.
//!
//! Available to this crate's tests and, through the `test-support` feature,
//! to dependent crates' tests.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use webmon_core::{MonitorError, Result};

use crate::client::{ApiTransport, CallContext};

/// One request as seen by the [`ScriptedTransport`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedRequest {
    pub path: String,
    pub params: Vec<(String, String)>,
    pub api_token: String,
}

impl RecordedRequest {
    /// Value of the first query parameter called `name`.
    pub fn param(&self, name: &str) -> Option<&str> {
        self.params
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }
}

/// Serves queued responses per path, in the order they were scripted.
///
/// A request for a path with nothing left in its queue fails with a
/// `404 Not Found` status error.
#[derive(Default)]
pub struct ScriptedTransport {
    responses: Mutex<HashMap<String, VecDeque<Result<Vec<u8>>>>>,
    requests: Mutex<Vec<RecordedRequest>>,
    cancel_after: Option<(usize, CancellationToken)>,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a raw body for `path`.
    pub fn with_body(self, path: &str, body: Vec<u8>) -> Self {
        self.push(path, Ok(body));
        self
    }

    /// Queue a JSON body for `path`.
    pub fn with_json(self, path: &str, value: serde_json::Value) -> Self {
        let body = value.to_string().into_bytes();
        self.with_body(path, body)
    }

    /// Queue a failure for `path`.
    pub fn with_error(self, path: &str, err: MonitorError) -> Self {
        self.push(path, Err(err));
        self
    }

    /// Cancel `token` right after the `n`-th request has been answered.
    pub fn cancel_after(mut self, n: usize, token: CancellationToken) -> Self {
        self.cancel_after = Some((n, token));
        self
    }

    /// Every request received so far, in arrival order.
    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().map(|r| r.clone()).unwrap_or_default()
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().map(|r| r.len()).unwrap_or_default()
    }

    /// Requests made against `path`.
    pub fn requests_for(&self, path: &str) -> Vec<RecordedRequest> {
        self.requests()
            .into_iter()
            .filter(|r| r.path == path)
            .collect()
    }

    fn push(&self, path: &str, response: Result<Vec<u8>>) {
        if let Ok(mut responses) = self.responses.lock() {
            responses
                .entry(path.to_string())
                .or_default()
                .push_back(response);
        }
    }
}

#[async_trait]
impl ApiTransport for ScriptedTransport {
    async fn get(
        &self,
        ctx: &CallContext,
        path: &str,
        params: &[(&str, String)],
    ) -> Result<Vec<u8>> {
        ctx.check_cancelled()?;

        let served = {
            let mut requests = self
                .requests
                .lock()
                .map_err(|_| MonitorError::Transport("request log poisoned".to_string()))?;
            requests.push(RecordedRequest {
                path: path.to_string(),
                params: params
                    .iter()
                    .map(|(k, v)| (k.to_string(), v.clone()))
                    .collect(),
                api_token: ctx.api_token().to_string(),
            });
            requests.len()
        };

        let response = self
            .responses
            .lock()
            .ok()
            .and_then(|mut responses| responses.get_mut(path).and_then(VecDeque::pop_front))
            .unwrap_or_else(|| Err(MonitorError::Status("404 Not Found".to_string())));

        if let Some((n, token)) = &self.cancel_after {
            if served >= *n {
                token.cancel();
            }
        }

        response
    }
}
