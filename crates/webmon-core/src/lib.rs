//! Core types for the web monitoring data source.
//!
//! Holds the API data model, the column-oriented output frames, the shared
//! error type, command-line/persisted settings, and timestamp helpers.

pub mod error;
pub mod frame;
pub mod models;
pub mod settings;
pub mod time_utils;

pub use error::{MonitorError, Result};
