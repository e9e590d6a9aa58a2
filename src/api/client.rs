use super::{AnswerSource, AskError, AskReply, AskRequest, HealthStatus, ASK_PATH, HEALTH_PATH};
use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;
use tracing::debug;

/// Bounds the startup health check even when questions have no timeout.
pub const HEALTH_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Clone)]
pub struct AskConfig {
    pub base_url: String,
    pub timeout: Option<Duration>,
}

/// HTTP client for the assistant backend.
#[derive(Debug, Clone)]
pub struct AskClient {
    client: Client,
    base_url: String,
}

impl AskClient {
    pub fn new(config: &AskConfig) -> Result<Self, AskError> {
        let mut builder = Client::builder();
        if let Some(timeout) = config.timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder.build().map_err(AskError::Build)?;
        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn endpoint(&self) -> String {
        format!("{}{}", self.base_url, ASK_PATH)
    }

    pub async fn health(&self) -> Result<HealthStatus, AskError> {
        let resp = self
            .client
            .get(format!("{}{}", self.base_url, HEALTH_PATH))
            .timeout(HEALTH_TIMEOUT)
            .send()
            .await
            .map_err(AskError::from_transport)?;

        let status = resp.status().as_u16();
        if !resp.status().is_success() {
            return Err(AskError::Status {
                status,
                answer: None,
            });
        }
        let text = resp.text().await.map_err(AskError::from_transport)?;
        serde_json::from_str(&text).map_err(|e| AskError::InvalidBody {
            status,
            message: e.to_string(),
        })
    }
}

#[async_trait]
impl AnswerSource for AskClient {
    async fn ask(&self, request: &AskRequest) -> Result<AskReply, AskError> {
        let resp = self
            .client
            .post(self.endpoint())
            .header("Content-Type", "application/json")
            .json(request)
            .send()
            .await
            .map_err(AskError::from_transport)?;

        let status = resp.status();
        let text = resp.text().await.map_err(AskError::from_transport)?;

        let reply: AskReply = serde_json::from_str(&text).map_err(|e| AskError::InvalidBody {
            status: status.as_u16(),
            message: e.to_string(),
        })?;

        if !status.is_success() {
            return Err(AskError::Status {
                status: status.as_u16(),
                answer: reply.answer().map(str::to_string),
            });
        }

        debug!(
            processing_time = reply.processing_time,
            cached = reply.cached,
            "Assistant replied"
        );
        Ok(reply)
    }
}
