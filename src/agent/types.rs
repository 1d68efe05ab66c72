use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StepStatus {
    Success,
    Failed,
}

/// Outcome of one plan step. Exactly one of `data`/`error` is meaningful,
/// depending on `status`.
#[derive(Debug, Clone, Serialize)]
pub struct StepResult {
    pub step_number: usize,
    pub status: StepStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub execution_time: f64,
}

impl StepResult {
    pub fn success(step_number: usize, data: Value, execution_time: f64) -> Self {
        Self {
            step_number,
            status: StepStatus::Success,
            data: Some(data),
            error: None,
            execution_time,
        }
    }

    pub fn failed(step_number: usize, error: impl Into<String>, execution_time: f64) -> Self {
        Self {
            step_number,
            status: StepStatus::Failed,
            data: None,
            error: Some(error.into()),
            execution_time,
        }
    }
}

/// Aggregate of a plan run. `success` follows the at-least-one-success
/// policy: true iff any step completed.
#[derive(Debug, Clone, Serialize)]
pub struct ExecutionResult {
    pub success: bool,
    pub steps_completed: usize,
    pub steps_failed: usize,
    pub results: Vec<StepResult>,
    pub execution_log: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct VerificationResult {
    pub is_complete: bool,
    pub is_correct: bool,
    pub confidence_score: f64,
    pub issues: Vec<String>,
    pub formatted_output: String,
    pub summary: String,
    pub recommendations: Vec<String>,
}

impl VerificationResult {
    /// Zero-confidence substitute used when verification itself fails; the
    /// pipeline result is still returned to the caller.
    pub fn degraded(error: &str) -> Self {
        Self {
            is_complete: false,
            is_correct: false,
            confidence_score: 0.0,
            issues: vec![format!("Verification failed: {error}")],
            formatted_output: "Verification unavailable".to_string(),
            summary: "Verification failed".to_string(),
            recommendations: Vec::new(),
        }
    }
}
