//! Connection test

use cosmos_core::CosmosError;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::CosmosDataSource;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TestStatus {
    Success,
    Error,
}

/// Outcome shown by the host's "test connection" action
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestResult {
    pub status: TestStatus,
    pub message: String,
}

impl TestResult {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            status: TestStatus::Success,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            status: TestStatus::Error,
            message: message.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == TestStatus::Success
    }
}

impl CosmosDataSource {
    /// Refresh credentials and list targets.
    ///
    /// Never fails: errors become an `error` result whose message carries the
    /// backend's own explanation when it sent one.
    pub async fn test_connection(&self) -> TestResult {
        match self.rpc.get_target_list().await {
            Ok(targets) => {
                info!(targets = targets.len(), "Connection test passed");
                TestResult::success(format!(
                    "OK: {} targets in scope {}",
                    targets.len(),
                    self.settings.scope
                ))
            }
            Err(e) => {
                let error = CosmosError::from(e);
                warn!(error = %error, code = error.error_code(), "Connection test failed");
                TestResult::error(error.to_string())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_result_wire_shape() {
        let result = TestResult::error("Request failed with status code 401 - Unauthorized");
        assert!(!result.is_success());
        assert_eq!(
            serde_json::to_value(&result).unwrap(),
            serde_json::json!({
                "status": "error",
                "message": "Request failed with status code 401 - Unauthorized",
            })
        );
        assert_eq!(
            serde_json::to_value(TestResult::success("OK")).unwrap()["status"],
            "success"
        );
    }
}
