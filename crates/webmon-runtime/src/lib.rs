//! Query handling layer for the web monitoring data source.
//!
//! Validates and routes queries, resolves batches concurrently and serves
//! the resource and health endpoints on top of `webmon-data`.

pub mod datasource;
pub mod health;
pub mod query;

pub use webmon_core as core;
pub use webmon_data as data;

pub use datasource::{DataResponse, QueryDataResponse, ResourceResponse, WebMonitoringDataSource};
pub use health::{HealthCheckResult, HealthStatus};
pub use query::{DataQuery, QueryKind, TimeRange};
