//! Cosmos Core - Shared settings and domain types for the COSMOS data source
//!
//! This crate provides:
//! - Data source settings as supplied by the dashboard host
//! - Time range and subscription window types
//! - The error type surfaced to the host

pub mod config;
pub mod domain;
pub mod error;

pub use config::DataSourceSettings;
pub use domain::*;
pub use error::{error_detail, error_detail_from_text, CosmosError, Result};
