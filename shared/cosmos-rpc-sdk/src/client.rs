//! COSMOS API client
//!
//! One POST per call, no retries. The caller decides whether to try again.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use cosmos_auth_sdk::TokenProvider;
use cosmos_core::{error_detail_from_text, DataSourceSettings};
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::debug;

use crate::protocol::{RpcRequest, RpcResponse};
use crate::{Result, RpcError};

const API_PATH: &str = "/openc3-api/api";
const JSON_RPC_CONTENT_TYPE: &str = "application/json-rpc";

pub struct RpcClient {
    http: Client,
    endpoint: String,
    scope: String,
    auth: Arc<dyn TokenProvider>,
    next_id: AtomicU64,
}

impl RpcClient {
    pub fn new(
        api_base_url: &str,
        scope: impl Into<String>,
        timeout: Duration,
        auth: Arc<dyn TokenProvider>,
    ) -> Result<Self> {
        let http = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            endpoint: format!("{}{}", api_base_url.trim_end_matches('/'), API_PATH),
            scope: scope.into(),
            auth,
            next_id: AtomicU64::new(1),
        })
    }

    pub fn from_settings(settings: &DataSourceSettings, auth: Arc<dyn TokenProvider>) -> Result<Self> {
        Self::new(
            &settings.api_base_url(),
            settings.scope.clone(),
            Duration::from_secs(settings.timeout_secs),
            auth,
        )
    }

    pub fn scope(&self) -> &str {
        &self.scope
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Call `method` and return the raw `result` member
    pub async fn call<S: AsRef<str>>(&self, method: &str, params: &[S]) -> Result<Value> {
        self.auth.ensure_fresh().await?;

        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let request = RpcRequest::new(id, method, self.scope.clone()).with_params(params);
        let body = serde_json::to_vec(&request)?;

        debug!(method = %method, id, scope = %self.scope, "Sending API request");

        let response = self
            .http
            .post(&self.endpoint)
            .header(AUTHORIZATION, self.auth.current_token())
            .header(CONTENT_TYPE, JSON_RPC_CONTENT_TYPE)
            .body(body)
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await?;

        if !status.is_success() {
            let reason = format!("Request failed with status code {}", status.as_u16());
            let message = match error_detail_from_text(&text) {
                Some(detail) => format!("{} - {}", reason, detail),
                None => reason,
            };
            return Err(RpcError::Http {
                status: Some(status.as_u16()),
                message,
            });
        }

        let envelope: RpcResponse = serde_json::from_str(&text)?;
        if let Some(error) = envelope.error {
            return Err(RpcError::Remote {
                message: error.message,
            });
        }
        Ok(envelope.result.unwrap_or(Value::Null))
    }

    /// Call `method` and deserialize its result
    pub async fn call_as<T: DeserializeOwned, S: AsRef<str>>(&self, method: &str, params: &[S]) -> Result<T> {
        let result = self.call(method, params).await?;
        serde_json::from_value(result).map_err(|e| RpcError::Decode(format!("{}: {}", method, e)))
    }
}


#[cfg(test)]
mod tests {
    use super::test_support::FixedToken;
    use super::*;
    use mockito::Matcher;
    use serde_json::json;

    fn client(url: &str, auth: Arc<FixedToken>) -> RpcClient {
        RpcClient::new(url, "DEFAULT", Duration::from_secs(5), auth).unwrap()
    }

    #[tokio::test]
    async fn test_call_sends_envelope_and_headers() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/openc3-api/api")
            .match_header("authorization", "secret-token")
            .match_header("content-type", "application/json-rpc")
            .match_body(Matcher::PartialJson(json!({
                "jsonrpc": "2.0",
                "method": "get_all_telemetry_names",
                "params": ["INST"],
                "id": 1,
                "keyword_params": { "scope": "DEFAULT" }
            })))
            .with_status(200)
            .with_body(r#"{"jsonrpc":"2.0","result":["HEALTH_STATUS","ADCS"],"id":1}"#)
            .create_async()
            .await;

        let auth = Arc::new(FixedToken::new("secret-token"));
        let client = client(&server.url(), auth.clone());
        let result = client.call("get_all_telemetry_names", &["INST"]).await.unwrap();

        mock.assert_async().await;
        assert_eq!(result, json!(["HEALTH_STATUS", "ADCS"]));
        assert_eq!(auth.refreshes.load(std::sync::atomic::Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_request_ids_increase() {
        let mut server = mockito::Server::new_async().await;
        let first = server
            .mock("POST", "/openc3-api/api")
            .match_body(Matcher::PartialJson(json!({ "id": 1 })))
            .with_body(r#"{"result":[]}"#)
            .create_async()
            .await;
        let second = server
            .mock("POST", "/openc3-api/api")
            .match_body(Matcher::PartialJson(json!({ "id": 2 })))
            .with_body(r#"{"result":[]}"#)
            .create_async()
            .await;

        let client = client(&server.url(), Arc::new(FixedToken::new("t")));
        client.call::<&str>("get_target_list", &[]).await.unwrap();
        client.call::<&str>("get_target_list", &[]).await.unwrap();

        first.assert_async().await;
        second.assert_async().await;
    }

    #[tokio::test]
    async fn test_remote_error_envelope() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/openc3-api/api")
            .with_status(200)
            .with_body(r#"{"jsonrpc":"2.0","error":{"code":-1,"message":"Packet 'NOPE' does not exist"},"id":1}"#)
            .create_async()
            .await;

        let client = client(&server.url(), Arc::new(FixedToken::new("t")));
        let err = client.call("get_telemetry", &["INST", "NOPE"]).await.unwrap_err();
        assert_eq!(
            err,
            RpcError::Remote {
                message: "Packet 'NOPE' does not exist".to_string()
            }
        );
    }

    #[tokio::test]
    async fn test_http_failure_carries_status_and_detail() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/openc3-api/api")
            .with_status(401)
            .with_body(r#"{"error":{"message":"Token is invalid for 'DEFAULT' scope"}}"#)
            .create_async()
            .await;

        let client = client(&server.url(), Arc::new(FixedToken::new("t")));
        let err = client.call::<&str>("get_target_list", &[]).await.unwrap_err();

        assert_eq!(err.status(), Some(401));
        assert_eq!(
            err.to_string(),
            "Request failed with status code 401 - Token is invalid for 'DEFAULT' scope"
        );
    }

    #[tokio::test]
    async fn test_refresh_failure_aborts_call() {
        let mut server = mockito::Server::new_async().await;
        let mock = server.mock("POST", "/openc3-api/api").expect(0).create_async().await;

        let mut token = FixedToken::new("stale");
        token.fail_refresh = true;
        let client = client(&server.url(), Arc::new(token));
        let err = client.call::<&str>("get_target_list", &[]).await.unwrap_err();

        mock.assert_async().await;
        assert!(matches!(err, RpcError::Auth(_)));
    }
}
