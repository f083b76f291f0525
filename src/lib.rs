//! Conflict Impact Dashboards
//!
//! Spreadsheet datasets on a conflict's humanitarian impact, loaded, cleaned,
//! filtered, aggregated and drawn as charts by one configurable pipeline.

pub mod charts;
pub mod config;
pub mod dashboard;
pub mod data;
pub mod error;
pub mod format;
pub mod gui;
pub mod stats;

pub use error::{DashboardError, Result};
