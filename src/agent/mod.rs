pub mod assistant;
pub mod executor;
pub mod planner;
pub mod types;
pub mod verifier;

pub use assistant::{Assistant, QueryOutcome};
pub use executor::{Executor, RetryPolicy, Toolset, retry_with_backoff};
pub use planner::Planner;
pub use types::{ExecutionResult, StepResult, StepStatus, VerificationResult};
pub use verifier::Verifier;
