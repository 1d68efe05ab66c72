use async_trait::async_trait;
use thiserror::Error;

use crate::llm::ChatMessage;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderErrorKind {
    /// 429-class throttling.
    RateLimited,
    /// Could not reach the provider (DNS, connect, timeout).
    Connection,
    /// 5xx-class server failure.
    Server,
    /// Any other 4xx. Never retried.
    Client,
    Other,
}

#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct ProviderError {
    pub kind: ProviderErrorKind,
    pub message: String,
}

impl ProviderError {
    pub fn new(kind: ProviderErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn connection(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorKind::Connection, message)
    }

    pub fn from_status(status: u16, message: impl Into<String>) -> Self {
        let kind = match status {
            429 => ProviderErrorKind::RateLimited,
            500..=599 => ProviderErrorKind::Server,
            400..=499 => ProviderErrorKind::Client,
            _ => ProviderErrorKind::Other,
        };
        Self::new(kind, message)
    }

    pub fn is_transient(&self) -> bool {
        matches!(
            self.kind,
            ProviderErrorKind::RateLimited
                | ProviderErrorKind::Connection
                | ProviderErrorKind::Server
        )
    }
}

/// One chat request against a concrete model API. The gateway owns retry and
/// logging; implementations only translate the wire format.
#[async_trait]
pub trait ModelProvider: Send + Sync {
    /// Model name, used in request logs.
    fn model(&self) -> &str;

    /// When `json_mode` is set the provider must constrain the model to emit
    /// a single JSON object as its entire output.
    async fn chat(
        &self,
        messages: &[ChatMessage],
        max_tokens: u32,
        json_mode: bool,
    ) -> Result<String, ProviderError>;
}

#[async_trait]
impl ModelProvider for Box<dyn ModelProvider> {
    fn model(&self) -> &str {
        self.as_ref().model()
    }

    async fn chat(
        &self,
        messages: &[ChatMessage],
        max_tokens: u32,
        json_mode: bool,
    ) -> Result<String, ProviderError> {
        self.as_ref().chat(messages, max_tokens, json_mode).await
    }
}
