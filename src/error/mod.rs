pub mod tool_error;

use thiserror::Error as ThisError;

pub use tool_error::{ToolError, ToolErrorKind};

use crate::llm::provider::ProviderError;

#[derive(ThisError, Debug)]
pub enum Error {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("plan validation failed: {0}")]
    PlanValidation(String),

    #[error("malformed model response: {0}")]
    MalformedResponse(String),

    #[error("model call failed after {attempts} attempts: {source}")]
    GatewayExhausted {
        attempts: u32,
        #[source]
        source: ProviderError,
    },

    #[error("model provider error: {0}")]
    Provider(#[from] ProviderError),

    #[error("tool error: {0}")]
    Tool(#[from] ToolError),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("serde_json error: {0}")]
    SerdeJsonError(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T, E = Error> = core::result::Result<T, E>;
