use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::Value as JsonValue;
use std::collections::HashMap;

/// Common `Head` envelope present on every Solar API response.
#[derive(Debug, Clone, Deserialize)]
pub struct Head {
    #[serde(rename = "Timestamp")]
    pub timestamp: DateTime<Utc>,
    #[serde(rename = "RequestArguments", default)]
    pub request_arguments: HashMap<String, JsonValue>,
    #[serde(rename = "Status", default)]
    pub status: HeadStatus,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct HeadStatus {
    #[serde(rename = "Code", default)]
    pub code: i64,
    #[serde(rename = "Reason", default)]
    pub reason: String,
    #[serde(rename = "UserMessage", default)]
    pub user_message: String,
}

impl Head {
    /// Logs a non-zero device status. The body is still used; the logger sets
    /// a code for partial data as well as for outright failures.
    pub fn log_status(&self, endpoint: &str) {
        if self.status.code != 0 {
            tracing::warn!(
                endpoint,
                code = self.status.code,
                reason = %self.status.reason,
                user_message = %self.status.user_message,
                "device reported non-zero status"
            );
        }
    }
}
