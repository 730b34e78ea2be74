use crate::types::{ChatReply, ChatRequest};
use async_trait::async_trait;
use thiserror::Error;
use url::Url;

#[derive(Error, Debug)]
pub enum TransportError {
    /// The server answered with a non-2xx status.
    #[error("server returned status {0}")]
    Status(u16),

    #[error("{0}")]
    Network(#[from] reqwest::Error),

    /// The body was not JSON, or had no `response` field.
    #[error("malformed reply: {0}")]
    Decode(#[from] serde_json::Error),
}

/// One request per turn, one attempt, no timeout.
#[async_trait]
pub trait ChatBackend: Send + Sync {
    async fn send(&self, request: &ChatRequest) -> Result<ChatReply, TransportError>;
}

#[derive(Debug, Clone)]
pub struct HttpBackend {
    endpoint: Url,
    http: reqwest::Client,
}

impl HttpBackend {
    pub fn new(endpoint: Url) -> Self {
        Self {
            endpoint,
            http: reqwest::Client::new(),
        }
    }

    pub fn with_client(endpoint: Url, http: reqwest::Client) -> Self {
        Self { endpoint, http }
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }
}

#[async_trait]
impl ChatBackend for HttpBackend {
    async fn send(&self, request: &ChatRequest) -> Result<ChatReply, TransportError> {
        log::debug!("POST {} ({} bytes)", self.endpoint, request.message().len());
        let response = self
            .http
            .post(self.endpoint.clone())
            .json(request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(TransportError::Status(status.as_u16()));
        }

        let body = response.text().await?;
        let reply: ChatReply = serde_json::from_str(&body)?;
        Ok(reply)
    }
}
