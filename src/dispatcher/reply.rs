use chrono::Utc;
use serde::Serialize;
use serde_json::Value;

/// The JSON envelope returned by both transports, matching the original
/// implementation's `{status, message, timestamp, data}` shape so existing
/// clients do not need to know which transport they are talking to.
#[derive(Debug, Clone, Serialize)]
pub struct Reply {
    pub status: ReplyStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub timestamp: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ReplyStatus {
    Success,
    Error,
}

impl Reply {
    pub fn success(message: impl Into<String>, data: Option<Value>) -> Self {
        Self {
            status: ReplyStatus::Success,
            message: Some(message.into()),
            timestamp: Utc::now().to_rfc3339(),
            data,
        }
    }

    pub fn success_data(data: Value) -> Self {
        Self {
            status: ReplyStatus::Success,
            message: None,
            timestamp: Utc::now().to_rfc3339(),
            data: Some(data),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            status: ReplyStatus::Error,
            message: Some(message.into()),
            timestamp: Utc::now().to_rfc3339(),
            data: None,
        }
    }

    pub fn to_json_line(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| {
            r#"{"status":"error","message":"failed to serialize reply"}"#.to_string()
        })
    }
}
