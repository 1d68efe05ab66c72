use std::sync::Arc;

use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::{
    agent::types::{ExecutionResult, StepResult, StepStatus, VerificationResult},
    error::{Error, Result},
    llm::{gateway::LlmGateway, provider::ModelProvider},
    plan::Plan,
    prompt::build_verifier_messages,
};

const VERIFY_TOKEN_BUDGET: u32 = 1500;

/// Plausible range for a surface temperature in Celsius; readings outside
/// it are flagged as anomalies.
const TEMP_RANGE_C: (f64, f64) = (-100.0, 60.0);

/// Stage three of the pipeline: checks completeness, scans for anomalies
/// and asks the model for formatting and a quality assessment. A model
/// failure degrades to a deterministic local report, never to an error.
pub struct Verifier<P: ModelProvider> {
    gateway: Arc<LlmGateway<P>>,
}

#[derive(Debug, Deserialize)]
struct LlmAssessment {
    #[serde(default)]
    formatted_output: String,
    #[serde(default)]
    summary: String,
    #[serde(default)]
    issues: Vec<String>,
    #[serde(default)]
    recommendations: Vec<String>,
    #[serde(default = "default_confidence")]
    confidence_score: f64,
}

fn default_confidence() -> f64 {
    0.5
}

impl<P: ModelProvider> Verifier<P> {
    pub fn new(gateway: Arc<LlmGateway<P>>) -> Self {
        Self { gateway }
    }

    pub async fn verify_results(
        &self,
        plan: &Plan,
        execution: &ExecutionResult,
    ) -> Result<VerificationResult> {
        if plan.steps.is_empty() {
            return Err(Error::InvalidInput("plan has no steps to verify".into()));
        }
        if execution.results.is_empty() {
            return Err(Error::InvalidInput(
                "execution produced no results to verify".into(),
            ));
        }
        info!(
            steps_completed = execution.steps_completed,
            steps_failed = execution.steps_failed,
            "verifying execution results"
        );

        let expected = plan.steps.len();
        let is_complete = execution.steps_completed == expected;

        let mut issues = Vec::new();
        if execution.steps_failed > 0 {
            issues.push(format!(
                "{} step(s) failed during execution",
                execution.steps_failed
            ));
        }
        if !is_complete {
            issues.push(format!(
                "Only {} of {expected} steps completed successfully",
                execution.steps_completed
            ));
        }
        issues.extend(scan_for_anomalies(&execution.results));

        let (formatted_output, summary, recommendations, mut confidence_score) =
            match self.assess_with_llm(plan, execution).await {
                Ok(assessment) => {
                    issues.extend(assessment.issues);
                    (
                        assessment.formatted_output,
                        assessment.summary,
                        assessment.recommendations,
                        assessment.confidence_score,
                    )
                }
                Err(err) => {
                    // Deterministic fallback: the pipeline still answers.
                    warn!("LLM verification failed, using basic formatting: {err}");
                    (
                        format_for_display(execution),
                        "Verification completed with basic formatting".to_string(),
                        Vec::new(),
                        0.5,
                    )
                }
            };

        confidence_score = confidence_score.clamp(0.0, 1.0);
        let is_correct = issues.is_empty() && execution.success;

        debug!(is_complete, is_correct, confidence_score, "verification done");
        Ok(VerificationResult {
            is_complete,
            is_correct,
            confidence_score,
            issues,
            formatted_output,
            summary,
            recommendations,
        })
    }

    async fn assess_with_llm(
        &self,
        plan: &Plan,
        execution: &ExecutionResult,
    ) -> Result<LlmAssessment> {
        let messages = build_verifier_messages(plan, execution);
        let raw = self
            .gateway
            .complete_json(&messages, VERIFY_TOKEN_BUDGET)
            .await?;
        serde_json::from_value(raw)
            .map_err(|e| Error::MalformedResponse(format!("invalid verifier response: {e}")))
    }
}

/// Cheap data sanity checks that do not need a model.
pub fn scan_for_anomalies(results: &[StepResult]) -> Vec<String> {
    let mut anomalies = Vec::new();

    for result in results {
        let Some(data) = &result.data else { continue };

        if let Some(temp) = data.get("temperature").and_then(Value::as_f64)
            && !(TEMP_RANGE_C.0..=TEMP_RANGE_C.1).contains(&temp)
        {
            anomalies.push(format!("Unusual temperature value: {temp}°C"));
        }

        if let Value::Array(items) = data
            && items.is_empty()
        {
            anomalies.push("Empty result set returned".to_string());
        }
    }

    anomalies
}

/// Plain-text report used when the model assessment is unavailable.
fn format_for_display(execution: &ExecutionResult) -> String {
    let rule = "=".repeat(60);
    let mut lines = vec![
        rule.clone(),
        "EXECUTION RESULTS".to_string(),
        rule.clone(),
        format!(
            "Overall Status: {}",
            if execution.success { "✓ Success" } else { "✗ Failed" }
        ),
        format!(
            "Steps: {} completed, {} failed",
            execution.steps_completed, execution.steps_failed
        ),
        String::new(),
    ];

    for result in &execution.results {
        match result.status {
            StepStatus::Success => {
                lines.push(format!("Step {}: ✓", result.step_number));
                if let Some(data) = &result.data {
                    lines.push(format!("  Data: {}", format_data(data)));
                }
            }
            StepStatus::Failed => {
                lines.push(format!("Step {}: ✗", result.step_number));
                lines.push(format!(
                    "  Error: {}",
                    result.error.as_deref().unwrap_or("unknown error")
                ));
            }
        }
    }

    lines.push(rule);
    lines.join("\n")
}

fn format_data(data: &Value) -> String {
    match data {
        Value::Array(items) => {
            let shown: Vec<String> = items.iter().take(3).map(format_item).collect();
            let mut text = format!("{} items", items.len());
            if !shown.is_empty() {
                text.push_str(&format!(" ({})", shown.join("; ")));
            }
            text
        }
        Value::Object(_) => format_item(data),
        other => other.to_string(),
    }
}

fn format_item(item: &Value) -> String {
    if let Value::Object(map) = item {
        if let (Some(city), Some(temp)) = (
            map.get("city").and_then(Value::as_str),
            map.get("temperature").and_then(Value::as_f64),
        ) {
            return format!("{city}: {temp}°");
        }
        if let Some(title) = map.get("title").and_then(Value::as_str) {
            return title.to_string();
        }
        if let Some(name) = map.get("full_name").or_else(|| map.get("name")).and_then(Value::as_str)
        {
            return name.to_string();
        }
    }
    let text = item.to_string();
    text.chars().take(60).collect()
}
