//! COSMOS Data Source
//!
//! Dashboard-facing entry point:
//! - `query`: one streaming subscription per query, merged into one sink
//! - `test_connection`: credential refresh plus a `get_target_list` call
//! - discovery and static option lists for the query editor

use std::sync::Arc;

use cosmos_auth_sdk::{CredentialProvider, CredentialStore, TokenProvider};
use cosmos_core::{DataSourceSettings, Result};
use cosmos_rpc_sdk::{Discovery, RpcClient};
use cosmos_streaming_sdk::{CableHub, PushChannel};
use tracing::info;

mod health;
mod options;
mod query;

pub use health::{TestResult, TestStatus};
pub use options::{SelectOption, aggregate_options, decimation_options, value_type_options};
pub use query::{QueryHandle, QueryRequest};

pub use cosmos_core::{CosmosError, TimeRange};
pub use cosmos_streaming_sdk::{
    Aggregate, Decimation, FrameData, LoadingState, QueryEvent, RenderSink, TelemetryQuery,
    ValueType, WireKey,
};

pub struct CosmosDataSource {
    settings: DataSourceSettings,
    credentials: Arc<CredentialProvider>,
    rpc: Arc<RpcClient>,
    channel: Arc<dyn PushChannel>,
}

impl CosmosDataSource {
    pub fn new(settings: DataSourceSettings) -> Result<Self> {
        settings.validate()?;

        let credentials = Arc::new(CredentialProvider::from_settings(
            &settings,
            CredentialStore::new(),
        )?);
        let auth: Arc<dyn TokenProvider> = credentials.clone();
        let rpc = Arc::new(RpcClient::from_settings(&settings, auth)?);
        let channel: Arc<dyn PushChannel> = Arc::new(CableHub::from_settings(&settings));

        info!(
            url = %settings.api_base_url(),
            scope = %settings.scope,
            password_grant = settings.uses_password_grant(),
            "COSMOS data source ready"
        );

        Ok(Self {
            settings,
            credentials,
            rpc,
            channel,
        })
    }

    /// Replace the push transport
    pub fn with_channel(mut self, channel: Arc<dyn PushChannel>) -> Self {
        self.channel = channel;
        self
    }

    pub fn settings(&self) -> &DataSourceSettings {
        &self.settings
    }

    pub fn credentials(&self) -> &CredentialStore {
        self.credentials.store()
    }

    pub fn rpc(&self) -> &RpcClient {
        &self.rpc
    }

    pub fn discovery(&self) -> Discovery {
        Discovery::new(self.rpc.clone())
    }
}
