use std::time::Duration;

use serde::Deserialize;
use serde_json::json;

use crate::{
    error::Result,
    llm::{
        ChatMessage, ChatRole,
        openai::request_error,
        provider::{ModelProvider, ProviderError, ProviderErrorKind},
    },
};

const API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Google Gemini provider. Gemini has no chat-role array in this API, so the
/// message list is flattened into a single annotated prompt.
pub struct GeminiProvider {
    client: reqwest::Client,
    api_key: String,
    model: String,
    temperature: f64,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: CandidateContent,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Debug, Deserialize)]
struct CandidatePart {
    text: Option<String>,
}

impl GeminiProvider {
    pub fn new(
        api_key: impl Into<String>,
        model: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            api_key: api_key.into(),
            model: model.into(),
            temperature: 0.7,
        })
    }

    fn flatten_prompt(messages: &[ChatMessage], json_mode: bool) -> String {
        let mut parts: Vec<String> = messages
            .iter()
            .map(|m| match m.role {
                ChatRole::System => format!("Instructions: {}\n", m.content),
                ChatRole::User => format!("User: {}\n", m.content),
                ChatRole::Assistant => format!("Assistant: {}\n", m.content),
            })
            .collect();

        if json_mode {
            parts.push(
                "\nIMPORTANT: You MUST respond with valid JSON only. Do not include any text \
                 before or after the JSON. Start your response with { and end with }."
                    .to_string(),
            );
        }

        parts.join("\n")
    }
}

#[async_trait::async_trait]
impl ModelProvider for GeminiProvider {
    fn model(&self) -> &str {
        &self.model
    }

    async fn chat(
        &self,
        messages: &[ChatMessage],
        max_tokens: u32,
        json_mode: bool,
    ) -> Result<String, ProviderError> {
        let url = format!("{API_BASE}/models/{}:generateContent", self.model);

        let mut generation_config = json!({
            "temperature": self.temperature,
            "maxOutputTokens": max_tokens,
        });
        if json_mode {
            generation_config["responseMimeType"] = json!("application/json");
        }

        let body = json!({
            "contents": [{
                "parts": [{"text": Self::flatten_prompt(messages, json_mode)}]
            }],
            "generationConfig": generation_config,
        });

        let response = self
            .client
            .post(&url)
            .query(&[("key", self.api_key.as_str())])
            .json(&body)
            .send()
            .await
            .map_err(request_error)?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(ProviderError::from_status(
                status.as_u16(),
                format!("gemini api returned {status}: {text}"),
            ));
        }

        let payload: GenerateResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::new(ProviderErrorKind::Other, e.to_string()))?;

        payload
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content.parts.into_iter().next())
            .and_then(|p| p.text)
            .ok_or_else(|| {
                ProviderError::new(ProviderErrorKind::Other, "gemini api returned no completion")
            })
    }
}
