use std::sync::Arc;

use tracing::{debug, info};

use crate::{
    error::{Error, Result},
    llm::{gateway::LlmGateway, provider::ModelProvider},
    plan::{Plan, validate_plan},
    prompt::build_planner_messages,
};

const PLAN_TOKEN_BUDGET: u32 = 2000;

/// Stage one of the pipeline: turns a natural-language query into a
/// validated execution plan.
pub struct Planner<P: ModelProvider> {
    gateway: Arc<LlmGateway<P>>,
}

impl<P: ModelProvider> Planner<P> {
    pub fn new(gateway: Arc<LlmGateway<P>>) -> Self {
        Self { gateway }
    }

    pub async fn create_plan(&self, query: &str) -> Result<Plan> {
        let query = query.trim();
        if query.is_empty() {
            return Err(Error::InvalidInput("user query cannot be empty".into()));
        }

        // Advisory only: the model decides comparison_mode, this just gives
        // a heuristic signal for the logs.
        let comparison_hint = detect_comparison_intent(query);
        info!(comparison_hint, "creating plan for query: {query}");

        let messages = build_planner_messages(query);
        let raw = self
            .gateway
            .complete_json(&messages, PLAN_TOKEN_BUDGET)
            .await?;

        let plan = validate_plan(&raw)?;
        debug!(
            intent = ?plan.intent,
            steps = plan.steps.len(),
            comparison_mode = plan.comparison_mode,
            "plan validated"
        );
        Ok(plan)
    }
}

/// Heuristic comparison detection over the raw query. Never authoritative:
/// the validated plan's `comparison_mode` is what the pipeline acts on.
pub fn detect_comparison_intent(query: &str) -> bool {
    let lowered = query.to_lowercase();
    const KEYWORDS: &[&str] = &[
        "compare",
        "comparison",
        "vs",
        "versus",
        "difference between",
        "differences between",
        "which is better",
        "better than",
        "contrast",
    ];
    if KEYWORDS.iter().any(|k| lowered.contains(k)) {
        return true;
    }
    // "X and Y" / "X or Y" with a comma elsewhere usually lists entities
    // being compared.
    (lowered.contains(" and ") || lowered.contains(" or ")) && lowered.contains(',')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_explicit_comparison_keywords() {
        assert!(detect_comparison_intent("compare tokio and async-std"));
        assert!(detect_comparison_intent("rust VS go for web servers"));
        assert!(detect_comparison_intent(
            "what is the difference between Paris and Lyon weather"
        ));
        assert!(detect_comparison_intent("which is better, vim or emacs"));
    }

    #[test]
    fn detects_comma_separated_entity_lists() {
        assert!(detect_comparison_intent(
            "weather in London, Paris and Tokyo"
        ));
        assert!(detect_comparison_intent("tell me about cats, dogs or birds"));
    }

    #[test]
    fn plain_queries_are_not_comparisons() {
        assert!(!detect_comparison_intent("what's the weather in London?"));
        assert!(!detect_comparison_intent("summarize quantum computing"));
        assert!(!detect_comparison_intent("find popular rust repositories"));
    }
}
