use std::sync::Arc;

use serde::Serialize;
use tokio::time::Instant;
use tracing::{error, info};
use uuid::Uuid;

use crate::{
    agent::{
        executor::{Executor, Toolset},
        planner::Planner,
        types::{ExecutionResult, VerificationResult},
        verifier::Verifier,
    },
    llm::{gateway::LlmGateway, provider::ModelProvider},
    plan::Plan,
};

const MAX_QUERY_CHARS: usize = 1000;

/// Everything one query produced. Stages that never ran stay `None`;
/// `error` holds a user-facing message when the pipeline stopped early.
#[derive(Debug, Serialize)]
pub struct QueryOutcome {
    pub query: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub plan: Option<Plan>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub execution: Option<ExecutionResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub verification: Option<VerificationResult>,
    pub total_time: f64,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl QueryOutcome {
    fn failed(query: &str, error: impl Into<String>, total_time: f64) -> Self {
        Self {
            query: query.to_string(),
            plan: None,
            execution: None,
            verification: None,
            total_time,
            success: false,
            error: Some(error.into()),
        }
    }
}

/// Front door of the pipeline: plan, execute, verify, strictly in that
/// order, with nothing shared between queries.
pub struct Assistant<P: ModelProvider> {
    planner: Planner<P>,
    executor: Executor,
    verifier: Verifier<P>,
}

impl<P: ModelProvider> Assistant<P> {
    pub fn new(gateway: LlmGateway<P>, tools: Toolset) -> Self {
        let gateway = Arc::new(gateway);
        Self {
            planner: Planner::new(Arc::clone(&gateway)),
            executor: Executor::new(tools),
            verifier: Verifier::new(gateway),
        }
    }

    pub fn with_executor(mut self, executor: Executor) -> Self {
        self.executor = executor;
        self
    }

    pub async fn process_query(&self, query: &str) -> QueryOutcome {
        let begin = Instant::now();
        let query = query.trim();

        if query.is_empty() {
            return QueryOutcome::failed(
                query,
                "Please enter a query. Your question cannot be empty.",
                begin.elapsed().as_secs_f64(),
            );
        }
        if query.chars().count() > MAX_QUERY_CHARS {
            let truncated: String = query.chars().take(MAX_QUERY_CHARS).collect();
            return QueryOutcome::failed(
                &truncated,
                "Your query is too long. Please keep it under 1000 characters.",
                begin.elapsed().as_secs_f64(),
            );
        }
        if !query.chars().any(|c| c.is_alphabetic()) {
            return QueryOutcome::failed(
                query,
                "Please enter a meaningful question with words, not just numbers or symbols.",
                begin.elapsed().as_secs_f64(),
            );
        }

        let query_id = Uuid::new_v4();
        info!(%query_id, "processing query: {query}");

        let plan = match self.planner.create_plan(query).await {
            Ok(plan) => plan,
            Err(err) => {
                error!(%query_id, "planning failed: {err}");
                return QueryOutcome::failed(
                    query,
                    describe_planning_error(&err.to_string()),
                    begin.elapsed().as_secs_f64(),
                );
            }
        };

        let execution = match self.executor.execute_plan(&plan).await {
            Ok(execution) => execution,
            Err(err) => {
                error!(%query_id, "execution failed: {err}");
                let mut outcome = QueryOutcome::failed(
                    query,
                    describe_execution_error(&err.to_string()),
                    begin.elapsed().as_secs_f64(),
                );
                outcome.plan = Some(plan);
                return outcome;
            }
        };

        // Verification never sinks the pipeline: a failure downgrades to a
        // zero-confidence placeholder.
        let verification = match self.verifier.verify_results(&plan, &execution).await {
            Ok(verification) => verification,
            Err(err) => {
                error!(%query_id, "verification failed: {err}");
                VerificationResult::degraded(&err.to_string())
            }
        };

        let success = execution.success && verification.is_complete;
        let total_time = begin.elapsed().as_secs_f64();
        info!(%query_id, success, total_time, "query finished");

        QueryOutcome {
            query: query.to_string(),
            plan: Some(plan),
            execution: Some(execution),
            verification: Some(verification),
            total_time,
            success,
            error: None,
        }
    }
}

/// Maps raw planning errors onto messages a user can act on.
fn describe_planning_error(raw: &str) -> String {
    let lowered = raw.to_lowercase();
    if lowered.contains("quota") || lowered.contains("rate limit") {
        "The AI service is currently busy. Please try again in a few minutes.".to_string()
    } else if lowered.contains("api key") || lowered.contains("authentication") {
        "There's a configuration issue with the AI service. Please check the API key.".to_string()
    } else if lowered.contains("network") || lowered.contains("connection") {
        "Unable to reach the AI service. Please check your internet connection.".to_string()
    } else {
        format!("Failed to create a plan for your query: {raw}")
    }
}

fn describe_execution_error(raw: &str) -> String {
    let lowered = raw.to_lowercase();
    if lowered.contains("not found") || lowered.contains("404") {
        format!("Some requested information could not be found: {raw}")
    } else if lowered.contains("timeout") {
        "The request took too long. Please try again.".to_string()
    } else if lowered.contains("rate limit") || lowered.contains("429") {
        "An external service is currently busy. Please try again later.".to_string()
    } else {
        format!("Failed to execute the plan: {raw}")
    }
}
