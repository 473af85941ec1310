//! Cosmos Telemetry
//!
//! Log output for the data source runner: `tracing` events rendered by
//! `tracing-subscriber`, filtered through `RUST_LOG`.

mod config;
mod tracing_setup;

pub use config::TelemetryConfig;
pub use tracing_setup::init_tracing;

/// Initialize logging for a process using settings from the environment
pub fn init(service_name: &str) -> Result<(), TelemetryError> {
    let config = TelemetryConfig::from_env();
    init_tracing(service_name, &config)
}

#[derive(Debug, thiserror::Error)]
pub enum TelemetryError {
    #[error("Tracing initialization failed: {0}")]
    TracingInit(String),
}
