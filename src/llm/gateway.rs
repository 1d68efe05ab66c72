use std::time::Duration;

use serde_json::Value;
use tracing::{debug, warn};

use crate::{
    error::{Error, Result},
    llm::{
        ChatMessage,
        provider::{ModelProvider, ProviderError, ProviderErrorKind},
    },
    utils::StripCodeBlock,
};

const DEFAULT_MAX_ATTEMPTS: u32 = 3;
const BACKOFF_CAP_SECS: u64 = 60;

/// Gateway mediating all calls to the model provider. Owns retry with
/// exponential backoff for transient provider failures; stateless per call.
pub struct LlmGateway<P: ModelProvider> {
    provider: P,
    max_attempts: u32,
}

impl<P: ModelProvider> LlmGateway<P> {
    pub fn new(provider: P) -> Self {
        Self {
            provider,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
        }
    }

    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts.max(1);
        self
    }

    /// Send a chat prompt and return the completion text. Transient provider
    /// failures (rate limit, connection, 5xx) are retried with exponential
    /// backoff; client errors fail immediately.
    pub async fn complete(
        &self,
        messages: &[ChatMessage],
        max_tokens: u32,
        json_mode: bool,
    ) -> Result<String> {
        if messages.is_empty() {
            return Err(Error::InvalidInput("messages list cannot be empty".into()));
        }

        self.log_request(messages);

        let mut last_err: Option<ProviderError> = None;
        for attempt in 0..self.max_attempts {
            match self.provider.chat(messages, max_tokens, json_mode).await {
                Ok(text) => {
                    log_response(&text);
                    return Ok(text);
                }
                Err(err) => {
                    if !err.is_transient() {
                        return Err(Error::Provider(err));
                    }
                    let wait = backoff_delay(attempt);
                    if attempt + 1 < self.max_attempts {
                        warn!(
                            attempt = attempt + 1,
                            max_attempts = self.max_attempts,
                            wait_secs = wait.as_secs(),
                            "transient model error, backing off: {err}"
                        );
                        last_err = Some(err);
                        tokio::time::sleep(wait).await;
                    } else {
                        last_err = Some(err);
                    }
                }
            }
        }

        let source = last_err.unwrap_or_else(|| {
            ProviderError::new(ProviderErrorKind::Other, "no attempts were made")
        });
        Err(Error::GatewayExhausted {
            attempts: self.max_attempts,
            source,
        })
    }

    /// `complete` in JSON mode, parsed. A non-JSON answer (after stripping a
    /// possible markdown fence) is a `MalformedResponse`.
    pub async fn complete_json(&self, messages: &[ChatMessage], max_tokens: u32) -> Result<Value> {
        let text = self.complete(messages, max_tokens, true).await?;
        let cleaned = text.strip_code_block();
        serde_json::from_str(cleaned)
            .map_err(|e| Error::MalformedResponse(format!("failed to parse JSON response: {e}")))
    }

    fn log_request(&self, messages: &[ChatMessage]) {
        debug!(model = self.provider.model(), "LLM request");
        for (i, msg) in messages.iter().enumerate() {
            debug!("  [{i}] {:?}: {}", msg.role, truncate(&msg.content, 200));
        }
    }
}

fn log_response(text: &str) {
    debug!("LLM response: {}", truncate(text, 500));
}

/// wait = min(2^attempt, 60) seconds.
fn backoff_delay(attempt: u32) -> Duration {
    Duration::from_secs(2u64.saturating_pow(attempt).min(BACKOFF_CAP_SECS))
}

fn truncate(s: &str, max_chars: usize) -> String {
    if s.chars().count() <= max_chars {
        s.to_string()
    } else {
        let head: String = s.chars().take(max_chars).collect();
        format!("{head}...")
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use async_trait::async_trait;

    use super::*;

    struct ScriptedProvider {
        responses: Mutex<Vec<Result<String, ProviderError>>>,
        calls: Mutex<u32>,
    }

    impl ScriptedProvider {
        fn new(responses: Vec<Result<String, ProviderError>>) -> Self {
            Self {
                responses: Mutex::new(responses),
                calls: Mutex::new(0),
            }
        }

        fn calls(&self) -> u32 {
            *self.calls.lock().unwrap()
        }
    }

    #[async_trait]
    impl ModelProvider for ScriptedProvider {
        fn model(&self) -> &str {
            "scripted"
        }

        async fn chat(
            &self,
            _messages: &[ChatMessage],
            _max_tokens: u32,
            _json_mode: bool,
        ) -> Result<String, ProviderError> {
            *self.calls.lock().unwrap() += 1;
            let mut responses = self.responses.lock().unwrap();
            if responses.is_empty() {
                Ok("out of script".into())
            } else {
                responses.remove(0)
            }
        }
    }

    fn rate_limited() -> ProviderError {
        ProviderError::from_status(429, "rate limit exceeded")
    }

    #[tokio::test(start_paused = true)]
    async fn retries_transient_errors_with_backoff() {
        let provider = ScriptedProvider::new(vec![
            Err(rate_limited()),
            Err(ProviderError::connection("connection reset")),
            Ok("done".into()),
        ]);
        let gateway = LlmGateway::new(provider);

        let begin = tokio::time::Instant::now();
        let out = gateway
            .complete(&[ChatMessage::user("hi")], 100, false)
            .await
            .unwrap();
        assert_eq!(out, "done");
        assert_eq!(gateway.provider.calls(), 3);
        // backoff delays: 1s then 2s
        assert_eq!(begin.elapsed(), Duration::from_secs(3));
    }

    #[tokio::test(start_paused = true)]
    async fn client_error_fails_immediately() {
        let provider = ScriptedProvider::new(vec![Err(ProviderError::from_status(
            401,
            "invalid api key",
        ))]);
        let gateway = LlmGateway::new(provider);

        let begin = tokio::time::Instant::now();
        let err = gateway
            .complete(&[ChatMessage::user("hi")], 100, false)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Provider(_)));
        assert_eq!(gateway.provider.calls(), 1);
        assert_eq!(begin.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn exhaustion_carries_last_error() {
        let provider = ScriptedProvider::new(vec![
            Err(rate_limited()),
            Err(rate_limited()),
            Err(ProviderError::from_status(503, "service unavailable")),
        ]);
        let gateway = LlmGateway::new(provider);

        let err = gateway
            .complete(&[ChatMessage::user("hi")], 100, false)
            .await
            .unwrap_err();
        match err {
            Error::GatewayExhausted { attempts, source } => {
                assert_eq!(attempts, 3);
                assert!(source.message.contains("service unavailable"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(gateway.provider.calls(), 3);
    }

    #[tokio::test]
    async fn empty_messages_rejected() {
        let gateway = LlmGateway::new(ScriptedProvider::new(vec![]));
        let err = gateway.complete(&[], 100, false).await.unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)));
    }

    #[tokio::test]
    async fn complete_json_strips_fence_and_parses() {
        let provider =
            ScriptedProvider::new(vec![Ok("```json\n{\"answer\": 42}\n```".into())]);
        let gateway = LlmGateway::new(provider);
        let value = gateway
            .complete_json(&[ChatMessage::user("hi")], 100)
            .await
            .unwrap();
        assert_eq!(value["answer"], 42);
    }

    #[tokio::test]
    async fn complete_json_rejects_non_json() {
        let provider = ScriptedProvider::new(vec![Ok("sorry, I cannot do that".into())]);
        let gateway = LlmGateway::new(provider);
        let err = gateway
            .complete_json(&[ChatMessage::user("hi")], 100)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::MalformedResponse(_)));
    }

    #[test]
    fn backoff_is_capped() {
        assert_eq!(backoff_delay(0), Duration::from_secs(1));
        assert_eq!(backoff_delay(1), Duration::from_secs(2));
        assert_eq!(backoff_delay(5), Duration::from_secs(32));
        assert_eq!(backoff_delay(10), Duration::from_secs(60));
    }
}
