use std::fmt;

use thiserror::Error;

/// Remote collection a fetch was made against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resource {
    Locations,
    Monitors,
    MonitorResults,
    Alarms,
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Resource::Locations => "locations",
            Resource::Monitors => "monitors",
            Resource::MonitorResults => "monitor results",
            Resource::Alarms => "alarms",
        };
        f.write_str(name)
    }
}

/// Coarse failure class reported to callers of a resource fetch.
///
/// The detailed cause is logged where the failure happens and never
/// surfaced past the fetcher.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchFailure {
    /// Transport or HTTP status failure.
    ApiCall,
    /// The response body could not be decoded.
    Parsing,
}

impl fmt::Display for FetchFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FetchFailure::ApiCall => f.write_str("API call failed"),
            FetchFailure::Parsing => f.write_str("parsing failed"),
        }
    }
}

/// All errors produced by the web monitoring data source.
#[derive(Error, Debug)]
pub enum MonitorError {
    /// A configuration value is missing or invalid.
    #[error("Configuration error: {0}")]
    Config(String),

    /// The request never produced an HTTP response (DNS, connect, timeout).
    #[error("HTTP request failed: {0}")]
    Transport(String),

    /// The API answered with something other than `200 OK`.
    #[error("HTTP request returned {0}")]
    Status(String),

    /// A JSON document could not be parsed.
    #[error("Failed to parse JSON: {0}")]
    JsonParse(#[from] serde_json::Error),

    /// The invoking call was cancelled before the request finished.
    #[error("request cancelled")]
    Cancelled,

    /// A resource fetch failed; the cause has already been logged.
    #[error("{resource} fetch failed: {failure}")]
    Fetch {
        resource: Resource,
        failure: FetchFailure,
    },

    /// The per-query payload is not a usable query object.
    #[error("invalid query payload: {0}")]
    InvalidQuery(String),

    /// The query targets a product other than web monitoring.
    #[error("invalid product: '{0}'")]
    InvalidProduct(String),

    /// The query type is not one of the supported aggregations.
    #[error("invalid query type: '{0}'")]
    InvalidQueryType(String),

    /// A monitor results query was issued without a monitor id.
    #[error("invalid monitor id")]
    InvalidMonitorId,

    /// Fields of an output frame do not have the same number of rows.
    #[error("field '{field}' has {len} rows, expected {expected}")]
    RaggedFrame {
        field: String,
        len: usize,
        expected: usize,
    },
}

impl MonitorError {
    /// `true` for errors caused by cancelling the invoking call.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, MonitorError::Cancelled)
    }

    /// Collapse a lower-layer error into the failure class reported by a fetcher.
    ///
    /// Cancellation is passed through untouched so callers can tell it apart.
    pub fn into_fetch_error(self, resource: Resource) -> MonitorError {
        let failure = match self {
            MonitorError::Cancelled => return MonitorError::Cancelled,
            MonitorError::JsonParse(_) => FetchFailure::Parsing,
            _ => FetchFailure::ApiCall,
        };
        MonitorError::Fetch { resource, failure }
    }
}

/// Convenience alias used throughout the webmon crates.
pub type Result<T> = std::result::Result<T, MonitorError>;
