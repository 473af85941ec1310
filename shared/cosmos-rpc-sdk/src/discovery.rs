//! Telemetry discovery
//!
//! Lists targets, packets and items for the query editor. Lookups that fail
//! produce empty lists, so a broken backend just shows empty pickers.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::{Result, RpcClient};

/// Item entry of a `get_telemetry` packet definition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemDefinition {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub units: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PacketDefinition {
    #[serde(default)]
    pub target_name: String,
    #[serde(default)]
    pub packet_name: String,
    #[serde(default)]
    pub items: Vec<ItemDefinition>,
}

impl RpcClient {
    pub async fn get_target_list(&self) -> Result<Vec<String>> {
        self.call_as::<Vec<String>, &str>("get_target_list", &[]).await
    }

    pub async fn get_all_telemetry_names(&self, target: &str) -> Result<Vec<String>> {
        self.call_as("get_all_telemetry_names", &[target]).await
    }

    pub async fn get_telemetry(&self, target: &str, packet: &str) -> Result<PacketDefinition> {
        self.call_as("get_telemetry", &[target, packet]).await
    }
}

/// Editor-facing lookups with graceful degradation
#[derive(Clone)]
pub struct Discovery {
    client: Arc<RpcClient>,
}

impl Discovery {
    pub fn new(client: Arc<RpcClient>) -> Self {
        Self { client }
    }

    pub async fn targets(&self) -> Vec<String> {
        self.client
            .get_target_list()
            .await
            .unwrap_or_else(|e| {
                warn!(error = %e, "Failed to list targets");
                Vec::new()
            })
    }

    /// Packets of `target`; nothing until a target is chosen
    pub async fn packets(&self, target: Option<&str>) -> Vec<String> {
        let Some(target) = target.filter(|t| !t.is_empty()) else {
            return Vec::new();
        };
        self.client
            .get_all_telemetry_names(target)
            .await
            .unwrap_or_else(|e| {
                warn!(error = %e, target = %target, "Failed to list packets");
                Vec::new()
            })
    }

    /// Item names of `target`/`packet`; nothing until both are chosen
    pub async fn items(&self, target: Option<&str>, packet: Option<&str>) -> Vec<String> {
        let (Some(target), Some(packet)) = (
            target.filter(|t| !t.is_empty()),
            packet.filter(|p| !p.is_empty()),
        ) else {
            return Vec::new();
        };
        match self.client.get_telemetry(target, packet).await {
            Ok(definition) => definition.items.into_iter().map(|item| item.name).collect(),
            Err(e) => {
                warn!(error = %e, target = %target, packet = %packet, "Failed to list items");
                Vec::new()
            }
        }
    }
}
