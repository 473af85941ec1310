//! JSON-RPC envelope used by the COSMOS API

use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct KeywordParams {
    pub scope: String,
}

/// Request body. Positional params are always strings for the calls we make.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RpcRequest {
    pub jsonrpc: String,
    pub method: String,
    pub params: Vec<String>,
    pub id: u64,
    pub keyword_params: KeywordParams,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RpcResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<RemoteErrorBody>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoteErrorBody {
    #[serde(default)]
    pub code: Option<i64>,
    #[serde(default)]
    pub message: String,
}

impl RpcRequest {
    pub fn new(id: u64, method: impl Into<String>, scope: impl Into<String>) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            method: method.into(),
            params: Vec::new(),
            id,
            keyword_params: KeywordParams { scope: scope.into() },
        }
    }

    pub fn with_params<S: AsRef<str>>(mut self, params: &[S]) -> Self {
        self.params = params.iter().map(|p| p.as_ref().to_string()).collect();
        self
    }
}
