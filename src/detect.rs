use reqwest::{Client, StatusCode};
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;
use tracing::debug;

use crate::config::{DEFAULT_ORG_ID, DEFAULT_STUDENT_ID};

/// Body of a `POST /detect_topic` call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DetectRequest {
    pub api_key: String,
    pub question: String,
    pub student_id: String,
    pub org_id: String,
}

impl DetectRequest {
    pub fn new(api_key: &str, question: &str) -> Self {
        Self {
            api_key: api_key.to_string(),
            question: question.to_string(),
            student_id: DEFAULT_STUDENT_ID.to_string(),
            org_id: DEFAULT_ORG_ID.to_string(),
        }
    }
}

/// A response that arrived and parsed as JSON, whatever its status.
#[derive(Debug, Clone)]
pub struct DetectResponse {
    pub status: StatusCode,
    pub body: Value,
}

impl DetectResponse {
    pub fn is_success(&self) -> bool {
        self.status == StatusCode::OK
    }

    /// `category` of a successful detection, if the server sent a non-empty one.
    pub fn category(&self) -> Option<&str> {
        self.string_field("category")
    }

    /// `detail` of a rejected request, if the server sent a non-empty one.
    pub fn detail(&self) -> Option<&str> {
        self.string_field("detail")
    }

    fn string_field(&self, name: &str) -> Option<&str> {
        self.body
            .get(name)
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
    }
}

#[derive(Debug, Error)]
pub enum DetectError {
    #[error("could not reach detect endpoint: {0}")]
    Transport(#[source] reqwest::Error),
    #[error("detect endpoint returned an unreadable body: {0}")]
    Body(#[source] reqwest::Error),
}

#[derive(Clone)]
pub struct DetectClient {
    client: Client,
    endpoint: String,
}

impl DetectClient {
    pub fn new(endpoint: &str) -> Self {
        Self {
            client: Client::new(),
            endpoint: endpoint.to_string(),
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Send one detect request. No timeout and no retry: the call settles
    /// whenever the transport does.
    pub async fn detect(&self, request: &DetectRequest) -> Result<DetectResponse, DetectError> {
        debug!(endpoint = %self.endpoint, "sending detect request");

        let response = self
            .client
            .post(&self.endpoint)
            .header("Content-Type", "application/json")
            .json(request)
            .send()
            .await
            .map_err(DetectError::Transport)?;

        let status = response.status();
        let body: Value = response.json().await.map_err(DetectError::Body)?;

        debug!(%status, "detect request settled");
        Ok(DetectResponse { status, body })
    }
}
