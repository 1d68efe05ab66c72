use std::{env, fmt, time::Duration};

use crate::error::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provider {
    OpenAi,
    Gemini,
}

impl Provider {
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "openai" => Some(Provider::OpenAi),
            "gemini" => Some(Provider::Gemini),
            _ => None,
        }
    }
}

/// Runtime configuration, read once at startup and passed down explicitly.
#[derive(Clone)]
pub struct Config {
    pub llm_provider: Provider,
    pub openai_api_key: Option<String>,
    pub openai_model: String,
    pub openai_base_url: Option<String>,
    pub gemini_api_key: Option<String>,
    pub gemini_model: String,
    pub github_token: Option<String>,
    pub openweather_api_key: Option<String>,
    pub log_level: String,
    pub max_retries: u32,
    pub request_timeout_secs: u64,
}

fn var(name: &str) -> Option<String> {
    env::var(name).ok().filter(|v| !v.trim().is_empty())
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let llm_provider = match var("LLM_PROVIDER") {
            Some(raw) => Provider::parse(&raw).ok_or_else(|| {
                Error::Config(format!(
                    "unknown LLM_PROVIDER '{raw}', expected 'openai' or 'gemini'"
                ))
            })?,
            None => Provider::OpenAi,
        };

        let max_retries = match var("MAX_RETRIES") {
            Some(raw) => raw
                .parse()
                .map_err(|_| Error::Config(format!("MAX_RETRIES must be a number, got '{raw}'")))?,
            None => 3,
        };
        let request_timeout_secs = match var("REQUEST_TIMEOUT_SECS") {
            Some(raw) => raw.parse().map_err(|_| {
                Error::Config(format!("REQUEST_TIMEOUT_SECS must be a number, got '{raw}'"))
            })?,
            None => 30,
        };

        Ok(Self {
            llm_provider,
            openai_api_key: var("OPENAI_API_KEY"),
            openai_model: var("OPENAI_MODEL").unwrap_or_else(|| "gpt-4".to_string()),
            openai_base_url: var("OPENAI_BASE_URL"),
            gemini_api_key: var("GEMINI_API_KEY"),
            gemini_model: var("GEMINI_MODEL").unwrap_or_else(|| "gemini-1.5-pro".to_string()),
            github_token: var("GITHUB_TOKEN"),
            openweather_api_key: var("OPENWEATHER_API_KEY"),
            log_level: var("LOG_LEVEL").unwrap_or_else(|| "info".to_string()),
            max_retries,
            request_timeout_secs,
        })
    }

    /// All problems reported at once, not just the first.
    pub fn validate(&self) -> Result<()> {
        let mut problems = Vec::new();

        match self.llm_provider {
            Provider::OpenAi if self.openai_api_key.is_none() => {
                problems.push("OPENAI_API_KEY is required when LLM_PROVIDER=openai");
            }
            Provider::Gemini if self.gemini_api_key.is_none() => {
                problems.push("GEMINI_API_KEY is required when LLM_PROVIDER=gemini");
            }
            _ => {}
        }
        if self.openweather_api_key.is_none() {
            problems.push("OPENWEATHER_API_KEY is required for the weather tool");
        }
        if self.max_retries == 0 {
            problems.push("MAX_RETRIES must be at least 1");
        }
        if self.request_timeout_secs == 0 {
            problems.push("REQUEST_TIMEOUT_SECS must be at least 1");
        }

        if problems.is_empty() {
            Ok(())
        } else {
            Err(Error::Config(problems.join("; ")))
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("llm_provider", &self.llm_provider)
            .field("openai_api_key", &self.openai_api_key.as_ref().map(|_| "***"))
            .field("openai_model", &self.openai_model)
            .field("openai_base_url", &self.openai_base_url)
            .field("gemini_api_key", &self.gemini_api_key.as_ref().map(|_| "***"))
            .field("gemini_model", &self.gemini_model)
            .field("github_token", &self.github_token.as_ref().map(|_| "***"))
            .field(
                "openweather_api_key",
                &self.openweather_api_key.as_ref().map(|_| "***"),
            )
            .field("log_level", &self.log_level)
            .field("max_retries", &self.max_retries)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .finish()
    }
}
