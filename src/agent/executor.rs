use std::{future::Future, sync::Arc, time::Duration};

use serde_json::Value;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::{
    agent::types::{ExecutionResult, StepResult, StepStatus},
    error::{Error, Result, ToolError},
    plan::{Plan, PlanStep, ToolOp},
    tools::{EncyclopediaApi, RepoSearchApi, WeatherApi},
};

/// Adapters available to the executor. A plan step whose tool has no
/// adapter fails cleanly instead of aborting the run.
#[derive(Default, Clone)]
pub struct Toolset {
    pub repo: Option<Arc<dyn RepoSearchApi>>,
    pub weather: Option<Arc<dyn WeatherApi>>,
    pub encyclopedia: Option<Arc<dyn EncyclopediaApi>>,
}

/// Retry schedule for tool calls: delays grow by `backoff_factor` starting
/// from `initial_delay_secs`, only transient failures are retried.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub initial_delay_secs: f64,
    pub backoff_factor: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_delay_secs: 1.0,
            backoff_factor: 2.0,
        }
    }
}

/// Stage two of the pipeline: runs plan steps strictly in order, tallying
/// per-step outcomes. A failed step never stops the run.
pub struct Executor {
    tools: Toolset,
    retry: RetryPolicy,
}

impl Executor {
    pub fn new(tools: Toolset) -> Self {
        Self {
            tools,
            retry: RetryPolicy::default(),
        }
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub async fn execute_plan(&self, plan: &Plan) -> Result<ExecutionResult> {
        if plan.steps.is_empty() {
            return Err(Error::InvalidInput("plan has no steps to execute".into()));
        }
        info!(steps = plan.steps.len(), "executing plan: {}", plan.task_description);

        let mut results = Vec::with_capacity(plan.steps.len());
        let mut execution_log = Vec::with_capacity(plan.steps.len());

        for step in &plan.steps {
            let result = self.run_step(step).await;
            let stamp = chrono::Local::now().format("%Y-%m-%d %H:%M:%S");
            match result.status {
                StepStatus::Success => {
                    let summary = result
                        .data
                        .as_ref()
                        .map(summarize_result)
                        .unwrap_or_else(|| "no data".to_string());
                    execution_log
                        .push(format!("[{stamp}] Step {}: SUCCESS - {summary}", step.step_number));
                }
                StepStatus::Failed => {
                    let error = result.error.as_deref().unwrap_or("unknown error");
                    execution_log
                        .push(format!("[{stamp}] Step {}: FAILED - {error}", step.step_number));
                }
            }
            results.push(result);
        }

        let steps_completed = results
            .iter()
            .filter(|r| r.status == StepStatus::Success)
            .count();
        let steps_failed = results.len() - steps_completed;

        // Partial results are still results: the run counts as successful
        // when at least one step produced data.
        let success = steps_completed > 0;
        info!(steps_completed, steps_failed, success, "plan execution finished");

        Ok(ExecutionResult {
            success,
            steps_completed,
            steps_failed,
            results,
            execution_log,
        })
    }

    async fn run_step(&self, step: &PlanStep) -> StepResult {
        info!(step = step.step_number, tool = %step.tool, "running step: {}", step.action);
        let begin = Instant::now();

        if !self.has_tool(&step.op) {
            let message = format!("tool '{}' not found in available tools", step.tool);
            warn!(step = step.step_number, "{message}");
            return StepResult::failed(step.step_number, message, begin.elapsed().as_secs_f64());
        }

        let outcome = retry_with_backoff(self.retry, || self.dispatch(&step.op)).await;
        let elapsed = begin.elapsed().as_secs_f64();

        match outcome {
            Ok(data) => {
                debug!(step = step.step_number, elapsed, "step succeeded");
                StepResult::success(step.step_number, data, elapsed)
            }
            Err(err) => {
                warn!(step = step.step_number, elapsed, "step failed: {err}");
                StepResult::failed(step.step_number, err.to_string(), elapsed)
            }
        }
    }

    fn has_tool(&self, op: &ToolOp) -> bool {
        match op {
            ToolOp::RepoSearch { .. } => self.tools.repo.is_some(),
            ToolOp::WeatherCurrent { .. } | ToolOp::WeatherCompare { .. } => {
                self.tools.weather.is_some()
            }
            ToolOp::ArticleSummary { .. }
            | ToolOp::ArticleSearch { .. }
            | ToolOp::TopicCompare { .. } => self.tools.encyclopedia.is_some(),
        }
    }

    async fn dispatch(&self, op: &ToolOp) -> Result<Value, ToolError> {
        match op {
            ToolOp::RepoSearch { query, sort, limit } => {
                let repo = self.tools.repo.as_ref().ok_or_else(missing_adapter)?;
                let found = repo.search(query, *sort, *limit).await?;
                to_value(&found)
            }
            ToolOp::WeatherCurrent { city, units } => {
                let weather = self.tools.weather.as_ref().ok_or_else(missing_adapter)?;
                let reading = weather.current(city, *units).await?;
                to_value(&reading)
            }
            ToolOp::WeatherCompare { cities, units } => {
                let weather = self.tools.weather.as_ref().ok_or_else(missing_adapter)?;
                let readings = weather.compare(cities, *units).await?;
                to_value(&readings)
            }
            ToolOp::ArticleSummary { topic, sentences } => {
                let wiki = self.tools.encyclopedia.as_ref().ok_or_else(missing_adapter)?;
                let article = wiki.summary(topic, *sentences).await?;
                to_value(&article)
            }
            ToolOp::ArticleSearch { query, limit } => {
                let wiki = self.tools.encyclopedia.as_ref().ok_or_else(missing_adapter)?;
                let titles = wiki.search(query, *limit).await?;
                to_value(&titles)
            }
            ToolOp::TopicCompare { topics } => {
                let wiki = self.tools.encyclopedia.as_ref().ok_or_else(missing_adapter)?;
                let articles = wiki.compare(topics).await?;
                to_value(&articles)
            }
        }
    }
}

fn missing_adapter() -> ToolError {
    ToolError::other("tool adapter is not configured")
}

fn to_value<T: serde::Serialize>(data: &T) -> Result<Value, ToolError> {
    serde_json::to_value(data)
        .map_err(|e| ToolError::other(format!("failed to serialize tool result: {e}")))
}

/// Retry `call` on transient errors up to `policy.max_retries` times,
/// sleeping between attempts. Non-transient errors return immediately.
pub async fn retry_with_backoff<T, F, Fut>(policy: RetryPolicy, mut call: F) -> Result<T, ToolError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, ToolError>>,
{
    let mut delay = policy.initial_delay_secs;
    let mut attempt = 0u32;

    loop {
        match call().await {
            Ok(value) => return Ok(value),
            Err(err) => {
                if !err.is_transient() || attempt >= policy.max_retries {
                    return Err(err);
                }
                attempt += 1;
                debug!(
                    attempt,
                    max_retries = policy.max_retries,
                    delay_secs = delay,
                    "transient tool error, retrying: {err}"
                );
                tokio::time::sleep(Duration::from_secs_f64(delay)).await;
                delay *= policy.backoff_factor;
            }
        }
    }
}

/// Short human line for the execution log.
fn summarize_result(data: &Value) -> String {
    match data {
        Value::Array(items) => format!("Retrieved {} items", items.len()),
        Value::Object(map) => {
            if let Some(city) = map.get("city").and_then(Value::as_str) {
                format!("Weather data for {city}")
            } else if let Some(title) = map.get("title").and_then(Value::as_str) {
                format!("Article: {title}")
            } else if let Some(name) = map.get("name").and_then(Value::as_str) {
                format!("Data for {name}")
            } else {
                format!("Object with {} fields", map.len())
            }
        }
        other => {
            let text = other.to_string();
            let prefix: String = text.chars().take(50).collect();
            prefix
        }
    }
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use serde_json::json;

    use super::*;
    use crate::{
        plan::{Intent, Plan, PlanStep, SortBy, ToolName, Units},
        tools::{RepoSummary, WeatherReading},
    };

    struct StaticWeather {
        fail_city: Option<String>,
        transient: bool,
    }

    #[async_trait]
    impl WeatherApi for StaticWeather {
        async fn current(&self, city: &str, units: Units) -> Result<WeatherReading, ToolError> {
            if self.fail_city.as_deref() == Some(city) {
                return Err(if self.transient {
                    ToolError::network("connection timeout")
                } else {
                    ToolError::not_found(format!("city '{city}' not found"))
                });
            }
            Ok(WeatherReading {
                city: city.to_string(),
                country: Some("GB".to_string()),
                temperature: 18.0,
                feels_like: 17.0,
                conditions: "clear sky".to_string(),
                humidity: 60,
                wind_speed: 3.2,
                timestamp: 0,
                units,
                error: None,
            })
        }

        async fn compare(
            &self,
            cities: &[String],
            units: Units,
        ) -> Result<Vec<WeatherReading>, ToolError> {
            let mut out = Vec::new();
            for city in cities {
                out.push(self.current(city, units).await?);
            }
            Ok(out)
        }
    }

    fn weather_step(number: usize, city: &str) -> PlanStep {
        PlanStep {
            step_number: number,
            action: format!("Get weather for {city}"),
            tool: ToolName::Weather,
            parameters: json!({ "city": city }),
            expected_output: "Current weather".to_string(),
            op: ToolOp::WeatherCurrent {
                city: city.to_string(),
                units: Units::Metric,
            },
        }
    }

    fn plan_with(steps: Vec<PlanStep>) -> Plan {
        Plan {
            task_description: "test plan".to_string(),
            intent: Intent::Search,
            steps,
            comparison_mode: false,
            entities: Vec::new(),
        }
    }

    fn toolset_with_weather(api: StaticWeather) -> Toolset {
        Toolset {
            weather: Some(Arc::new(api)),
            ..Toolset::default()
        }
    }

    #[tokio::test]
    async fn executes_steps_in_order_and_tallies() {
        let executor = Executor::new(toolset_with_weather(StaticWeather {
            fail_city: None,
            transient: false,
        }));
        let plan = plan_with(vec![weather_step(1, "London"), weather_step(2, "Paris")]);

        let result = executor.execute_plan(&plan).await.unwrap();
        assert!(result.success);
        assert_eq!(result.steps_completed, 2);
        assert_eq!(result.steps_failed, 0);
        assert_eq!(result.results.len(), 2);
        assert_eq!(result.results[0].step_number, 1);
        assert_eq!(result.results[1].step_number, 2);
        assert!(result.execution_log[0].contains("SUCCESS"));
    }

    #[tokio::test]
    async fn one_success_is_enough() {
        let executor = Executor::new(toolset_with_weather(StaticWeather {
            fail_city: Some("Atlantis".to_string()),
            transient: false,
        }));
        let plan = plan_with(vec![weather_step(1, "Atlantis"), weather_step(2, "Paris")]);

        let result = executor.execute_plan(&plan).await.unwrap();
        assert!(result.success);
        assert_eq!(result.steps_completed, 1);
        assert_eq!(result.steps_failed, 1);
        assert!(result.execution_log[0].contains("FAILED"));
        assert!(result.results[0].error.as_deref().unwrap().contains("Atlantis"));
    }

    #[tokio::test]
    async fn all_failures_is_not_success() {
        let executor = Executor::new(toolset_with_weather(StaticWeather {
            fail_city: Some("Atlantis".to_string()),
            transient: false,
        }));
        let plan = plan_with(vec![weather_step(1, "Atlantis")]);

        let result = executor.execute_plan(&plan).await.unwrap();
        assert!(!result.success);
        assert_eq!(result.steps_completed, 0);
        assert_eq!(result.steps_failed, 1);
    }

    #[tokio::test]
    async fn empty_plan_is_rejected() {
        let executor = Executor::new(Toolset::default());
        let err = executor.execute_plan(&plan_with(vec![])).await.unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)));
    }

    #[tokio::test(start_paused = true)]
    async fn missing_tool_fails_without_retrying() {
        let executor = Executor::new(Toolset::default());
        let plan = plan_with(vec![weather_step(1, "London")]);

        let begin = Instant::now();
        let result = executor.execute_plan(&plan).await.unwrap();
        assert!(!result.success);
        assert!(
            result.results[0]
                .error
                .as_deref()
                .unwrap()
                .contains("tool 'weather' not found in available tools")
        );
        assert_eq!(begin.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn transient_errors_are_retried_with_backoff() {
        use std::sync::atomic::{AtomicU32, Ordering};
        let calls = Arc::new(AtomicU32::new(0));
        let calls_seen = Arc::clone(&calls);

        let begin = Instant::now();
        let out = retry_with_backoff(RetryPolicy::default(), move || {
            let calls = Arc::clone(&calls_seen);
            async move {
                let n = calls.fetch_add(1, Ordering::SeqCst);
                if n < 2 {
                    Err(ToolError::network("connection timeout"))
                } else {
                    Ok(json!({"ok": true}))
                }
            }
        })
        .await
        .unwrap();

        assert_eq!(out, json!({"ok": true}));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        // delays: 1s + 2s
        assert_eq!(begin.elapsed(), Duration::from_secs(3));
    }

    #[tokio::test(start_paused = true)]
    async fn exhausted_retries_surface_the_last_error() {
        let begin = Instant::now();
        let err = retry_with_backoff(RetryPolicy::default(), || async {
            Err::<Value, _>(ToolError::rate_limited("rate limit exceeded"))
        })
        .await
        .unwrap_err();

        assert!(err.is_transient());
        assert!(err.to_string().contains("rate limit"));
        // 4 attempts total, delays 1s + 2s + 4s
        assert_eq!(begin.elapsed(), Duration::from_secs(7));
    }

    #[tokio::test(start_paused = true)]
    async fn non_transient_errors_are_not_retried() {
        let begin = Instant::now();
        let err = retry_with_backoff(RetryPolicy::default(), || async {
            Err::<Value, _>(ToolError::invalid("bad parameters"))
        })
        .await
        .unwrap_err();

        assert!(!err.is_transient());
        assert_eq!(begin.elapsed(), Duration::ZERO);
    }

    #[test]
    fn summaries_match_result_shapes() {
        assert_eq!(
            summarize_result(&json!([1, 2, 3])),
            "Retrieved 3 items"
        );
        assert_eq!(
            summarize_result(&json!({"city": "London", "temperature": 18.0})),
            "Weather data for London"
        );
        assert_eq!(
            summarize_result(&json!({"title": "Rust"})),
            "Article: Rust"
        );
        assert_eq!(
            summarize_result(&json!({"name": "tokio"})),
            "Data for tokio"
        );
        assert_eq!(
            summarize_result(&json!({"a": 1, "b": 2})),
            "Object with 2 fields"
        );
    }

    #[tokio::test]
    async fn repo_results_serialize_as_arrays() {
        struct OneRepo;

        #[async_trait]
        impl RepoSearchApi for OneRepo {
            async fn search(
                &self,
                _query: &str,
                _sort: SortBy,
                _limit: u32,
            ) -> Result<Vec<RepoSummary>, ToolError> {
                Ok(vec![RepoSummary {
                    name: "tokio".to_string(),
                    full_name: "tokio-rs/tokio".to_string(),
                    description: None,
                    stars: 1,
                    forks: 1,
                    language: Some("Rust".to_string()),
                    url: String::new(),
                    updated_at: None,
                    error: None,
                }])
            }

            async fn compare(&self, _items: &[String]) -> Result<Vec<RepoSummary>, ToolError> {
                Ok(Vec::new())
            }
        }

        let executor = Executor::new(Toolset {
            repo: Some(Arc::new(OneRepo)),
            ..Toolset::default()
        });
        let plan = plan_with(vec![PlanStep {
            step_number: 1,
            action: "Search repositories".to_string(),
            tool: ToolName::RepositorySearch,
            parameters: json!({ "query": "async runtime" }),
            expected_output: "Repository list".to_string(),
            op: ToolOp::RepoSearch {
                query: "async runtime".to_string(),
                sort: SortBy::Stars,
                limit: 5,
            },
        }]);

        let result = executor.execute_plan(&plan).await.unwrap();
        assert!(result.results[0].data.as_ref().unwrap().is_array());
        assert!(result.execution_log[0].contains("Retrieved 1 items"));
    }
}
