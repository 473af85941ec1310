//! COSMOS Data Source runner
//!
//! Checks connectivity with the settings from the environment, then streams
//! the items listed in `COSMOS_ITEMS` to the log until interrupted.

use std::sync::Arc;

use cosmos_core::DataSourceSettings;
use cosmos_datasource::{
    CosmosDataSource, CosmosError, QueryRequest, RenderSink, TelemetryQuery, TimeRange,
};
use cosmos_streaming_sdk::{FrameUpdate, SubscriptionError};
use tokio::signal;
use tracing::{error, info, warn};

const DEFAULT_WINDOW_SECS: i64 = 300;

/// Prints the newest row of every update
struct LogSink;

impl RenderSink for LogSink {
    fn render(&self, update: FrameUpdate<'_>) {
        let Some(latest) = update.frame.last() else {
            return;
        };
        let values: Vec<String> = update
            .frame
            .columns
            .iter()
            .zip(&latest.values)
            .map(|(name, value)| match value {
                Some(v) => format!("{}={}", name, v),
                None => format!("{}=null", name),
            })
            .collect();
        info!(
            ref_id = %update.ref_id,
            state = ?update.state,
            rows = update.frame.len(),
            time = latest.time_millis(),
            values = %values.join(" "),
            "Telemetry"
        );
    }

    fn fail(&self, ref_id: &str, error: &SubscriptionError) {
        error!(ref_id = %ref_id, error = %error, "Subscription ended");
    }
}

#[tokio::main]
async fn main() -> cosmos_core::Result<()> {
    cosmos_telemetry::init("cosmos-datasource").map_err(|e| CosmosError::Config(e.to_string()))?;

    info!("Starting COSMOS data source");

    let settings = DataSourceSettings::from_env()?;
    let datasource = CosmosDataSource::new(settings)?;

    let result = datasource.test_connection().await;
    info!(status = ?result.status, message = %result.message, "Connection test");
    if !result.is_success() {
        return Err(CosmosError::Config(result.message));
    }

    let query = match items_query()? {
        Some(query) => query,
        None => {
            info!("COSMOS_ITEMS not set, nothing to stream");
            return Ok(());
        }
    };
    let window_secs = std::env::var("COSMOS_WINDOW_SECS")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(DEFAULT_WINDOW_SECS);

    let request = QueryRequest {
        targets: vec![query],
        range: TimeRange::last_seconds(window_secs),
        live_streaming: true,
    };
    let handle = datasource.query(&request, Arc::new(LogSink));

    wait_for_shutdown().await;
    info!("Shutdown signal received, stopping subscriptions");
    handle.cancel();
    handle.join().await;

    info!("COSMOS data source stopped");
    Ok(())
}

/// Query built from `COSMOS_ITEMS=TARGET__PACKET__ITEM,...`
fn items_query() -> cosmos_core::Result<Option<TelemetryQuery>> {
    let raw = match std::env::var("COSMOS_ITEMS") {
        Ok(raw) if !raw.trim().is_empty() => raw,
        _ => return Ok(None),
    };

    let mut query = TelemetryQuery::new("A");
    for entry in raw.split(',').map(str::trim).filter(|e| !e.is_empty()) {
        let parts: Vec<&str> = entry.split("__").collect();
        let [target, packet, item] = parts.as_slice() else {
            return Err(CosmosError::Config(format!(
                "COSMOS_ITEMS entry {} is not TARGET__PACKET__ITEM",
                entry
            )));
        };
        query = query.select(target, packet, item);
        query.add_item()?;
    }
    if query.items.is_empty() {
        warn!("COSMOS_ITEMS has no usable entries");
        return Ok(None);
    }
    Ok(Some(query))
}

async fn wait_for_shutdown() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
