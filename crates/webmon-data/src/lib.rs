//! Data access layer for the web monitoring data source.
//!
//! Talks to the monitoring REST API, walks its cursor-paginated collections,
//! and reshapes the fetched records into output frames.

pub mod aggregator;
pub mod client;
pub mod fetchers;
pub mod paginator;

#[cfg(any(test, feature = "test-support"))]
pub mod testing;

pub use webmon_core as core;
