pub mod agent;
pub mod config;
pub mod error;
pub mod llm;
pub mod plan;
pub mod prompt;
pub mod telemetry;
pub mod tools;
pub mod utils;

pub use agent::{Assistant, Executor, Planner, Toolset, Verifier};
pub use config::Config;
pub use error::{Error, Result};
pub use llm::LlmGateway;
