pub mod client;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

pub use client::AskClient;

/// Path of the question endpoint, relative to the configured base URL.
pub const ASK_PATH: &str = "/api/ask";
pub const HEALTH_PATH: &str = "/api/health";

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct AskRequest {
    pub question: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct AskReply {
    #[serde(default)]
    pub answer: Option<String>,
    #[serde(default)]
    pub processing_time: Option<f64>,
    #[serde(default)]
    pub cached: Option<bool>,
}

impl AskReply {
    /// The answer text, treating an empty string as absent.
    pub fn answer(&self) -> Option<&str> {
        self.answer.as_deref().filter(|a| !a.trim().is_empty())
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct HealthStatus {
    pub status: String,
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub knowledge_base: Option<String>,
}

/// Anything that can answer a question; the HTTP client in production.
#[async_trait]
pub trait AnswerSource: Send + Sync {
    async fn ask(&self, request: &AskRequest) -> Result<AskReply, AskError>;
}

#[derive(Debug, thiserror::Error)]
pub enum AskError {
    #[error("HTTP client setup failed: {0}")]
    Build(reqwest::Error),
    #[error("Request timed out")]
    Timeout,
    #[error("Connection failed: {0}")]
    Connect(reqwest::Error),
    #[error("API error: {status}")]
    Status { status: u16, answer: Option<String> },
    #[error("Invalid response body (status {status}): {message}")]
    InvalidBody { status: u16, message: String },
}

impl AskError {
    pub(crate) fn from_transport(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            AskError::Timeout
        } else {
            AskError::Connect(e)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_omits_missing_api_key() {
        let req = AskRequest {
            question: "Hello".into(),
            api_key: None,
        };
        assert_eq!(serde_json::to_string(&req).unwrap(), r#"{"question":"Hello"}"#);

        let req = AskRequest {
            question: "Hello".into(),
            api_key: Some("k".into()),
        };
        assert_eq!(
            serde_json::to_string(&req).unwrap(),
            r#"{"question":"Hello","api_key":"k"}"#
        );
    }

    #[test]
    fn test_reply_tolerates_extra_and_missing_fields() {
        let reply: AskReply =
            serde_json::from_str(r#"{"answer":"","error":true,"processing_time":1.5}"#).unwrap();
        assert_eq!(reply.answer(), None);
        assert_eq!(reply.processing_time, Some(1.5));

        let reply: AskReply = serde_json::from_str("{}").unwrap();
        assert_eq!(reply.answer(), None);
    }
}
