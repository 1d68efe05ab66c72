use serde_json::{Map, Value};
use tracing::warn;

use crate::{
    error::{Error, Result},
    plan::{Intent, Plan, PlanStep, SortBy, ToolName, ToolOp, Units},
};

const DEFAULT_SEARCH_LIMIT: u32 = 5;
const DEFAULT_SENTENCES: u32 = 3;

/// Validate a model-produced plan object and build the typed `Plan`.
///
/// Fails when a required field is missing, the intent or a tool name is
/// unknown, `steps` is empty or not a sequence, step numbers are not the
/// exact run `1..=N`, or a step's parameters fit no tool operation.
/// `comparison_mode` without entities only logs a warning.
pub fn validate_plan(value: &Value) -> Result<Plan> {
    let obj = value
        .as_object()
        .ok_or_else(|| invalid("plan must be a JSON object"))?;

    let task_description = required_str(obj, "task_description")?.to_string();

    let intent_raw = required_str(obj, "intent")?;
    let intent =
        Intent::parse(intent_raw).ok_or_else(|| invalid(format!("invalid intent: {intent_raw}")))?;

    let steps_value = obj
        .get("steps")
        .ok_or_else(|| invalid("missing required field: steps"))?;
    let raw_steps = steps_value
        .as_array()
        .ok_or_else(|| invalid("steps must be a sequence"))?;
    if raw_steps.is_empty() {
        return Err(invalid("plan must have at least one step"));
    }

    let mut steps = Vec::with_capacity(raw_steps.len());
    for (index, raw_step) in raw_steps.iter().enumerate() {
        steps.push(validate_step(index, raw_step)?);
    }

    let comparison_mode = obj
        .get("comparison_mode")
        .and_then(Value::as_bool)
        .unwrap_or(false);
    let entities: Vec<String> = obj
        .get("entities")
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default();

    if comparison_mode && entities.is_empty() {
        warn!("comparison mode is set but the entities list is missing or empty");
    }

    Ok(Plan {
        task_description,
        intent,
        steps,
        comparison_mode,
        entities,
    })
}

fn validate_step(index: usize, value: &Value) -> Result<PlanStep> {
    let obj = value
        .as_object()
        .ok_or_else(|| invalid(format!("step {} must be a JSON object", index + 1)))?;

    let step_number = obj
        .get("step_number")
        .and_then(Value::as_u64)
        .ok_or_else(|| step_missing(index, "step_number"))? as usize;
    let expected = index + 1;
    if step_number != expected {
        return Err(invalid(format!(
            "step numbers must run 1..N without gaps: expected {expected}, got {step_number}"
        )));
    }

    let action = step_str(obj, index, "action")?.to_string();
    let expected_output = step_str(obj, index, "expected_output")?.to_string();

    let tool_raw = step_str(obj, index, "tool")?;
    let tool = ToolName::parse(tool_raw)
        .ok_or_else(|| invalid(format!("step {}: unknown tool: {tool_raw}", index + 1)))?;

    let parameters = obj
        .get("parameters")
        .ok_or_else(|| step_missing(index, "parameters"))?;
    let params = parameters
        .as_object()
        .ok_or_else(|| invalid(format!("step {}: parameters must be a mapping", index + 1)))?;

    let op = map_parameters(tool, params)?;

    Ok(PlanStep {
        step_number,
        action,
        tool,
        parameters: parameters.clone(),
        expected_output,
        op,
    })
}

/// Map a step's raw parameters onto a tool operation, applying the fixed
/// per-tool precedence rules and parameter defaults.
pub fn map_parameters(tool: ToolName, params: &Map<String, Value>) -> Result<ToolOp> {
    match tool {
        ToolName::RepositorySearch => {
            if let Some(query) = str_param(params, "query") {
                Ok(ToolOp::RepoSearch {
                    query,
                    sort: enum_param(params, "sort", SortBy::parse),
                    limit: num_param(params, "limit", DEFAULT_SEARCH_LIMIT),
                })
            } else {
                Err(invalid("repository-search step requires a 'query' parameter"))
            }
        }
        ToolName::Weather => {
            if let Some(city) = str_param(params, "city") {
                Ok(ToolOp::WeatherCurrent {
                    city,
                    units: enum_param(params, "units", Units::parse),
                })
            } else if let Some(cities) = list_param(params, "cities") {
                Ok(ToolOp::WeatherCompare {
                    cities,
                    units: enum_param(params, "units", Units::parse),
                })
            } else {
                Err(invalid("weather step requires a 'city' or 'cities' parameter"))
            }
        }
        ToolName::Encyclopedia => {
            if let Some(topic) = str_param(params, "topic") {
                Ok(ToolOp::ArticleSummary {
                    topic,
                    sentences: num_param(params, "sentences", DEFAULT_SENTENCES),
                })
            } else if let Some(query) = str_param(params, "query") {
                Ok(ToolOp::ArticleSearch {
                    query,
                    limit: num_param(params, "limit", DEFAULT_SEARCH_LIMIT),
                })
            } else if let Some(topics) = list_param(params, "topics") {
                Ok(ToolOp::TopicCompare { topics })
            } else {
                Err(invalid(
                    "encyclopedia step requires a 'topic', 'query', or 'topics' parameter",
                ))
            }
        }
    }
}

fn invalid(message: impl Into<String>) -> Error {
    Error::PlanValidation(message.into())
}

fn required_str<'a>(obj: &'a Map<String, Value>, field: &str) -> Result<&'a str> {
    obj.get(field)
        .and_then(Value::as_str)
        .ok_or_else(|| invalid(format!("missing required field: {field}")))
}

fn step_missing(index: usize, field: &str) -> Error {
    invalid(format!("step {} missing required field: {field}", index + 1))
}

fn step_str<'a>(obj: &'a Map<String, Value>, index: usize, field: &str) -> Result<&'a str> {
    obj.get(field)
        .and_then(Value::as_str)
        .ok_or_else(|| step_missing(index, field))
}

fn str_param(params: &Map<String, Value>, key: &str) -> Option<String> {
    params.get(key).and_then(Value::as_str).map(str::to_string)
}

fn list_param(params: &Map<String, Value>, key: &str) -> Option<Vec<String>> {
    params.get(key).and_then(Value::as_array).map(|items| {
        items
            .iter()
            .filter_map(Value::as_str)
            .map(str::to_string)
            .collect()
    })
}

fn num_param(params: &Map<String, Value>, key: &str, default: u32) -> u32 {
    params
        .get(key)
        .and_then(Value::as_u64)
        .map(|n| n as u32)
        .unwrap_or(default)
}

fn enum_param<T: Default>(
    params: &Map<String, Value>,
    key: &str,
    parse: fn(&str) -> Option<T>,
) -> T {
    match params.get(key).and_then(Value::as_str) {
        Some(raw) => parse(raw).unwrap_or_else(|| {
            warn!("unrecognized {key} value '{raw}', using the default");
            T::default()
        }),
        None => T::default(),
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn weather_step(step_number: u64, city: &str) -> Value {
        json!({
            "step_number": step_number,
            "action": format!("Fetch current weather for {city}"),
            "tool": "weather",
            "parameters": {"city": city, "units": "metric"},
            "expected_output": "Weather data"
        })
    }

    fn plan_with_steps(steps: Value) -> Value {
        json!({
            "task_description": "Check some weather",
            "intent": "search",
            "steps": steps,
            "comparison_mode": false
        })
    }

    #[test]
    fn accepts_valid_single_step_plan() {
        let plan = validate_plan(&plan_with_steps(json!([weather_step(1, "Paris")]))).unwrap();
        assert_eq!(plan.intent, Intent::Search);
        assert_eq!(plan.steps.len(), 1);
        assert_eq!(
            plan.steps[0].op,
            ToolOp::WeatherCurrent {
                city: "Paris".into(),
                units: Units::Metric
            }
        );
    }

    #[test]
    fn rejects_missing_top_level_field() {
        let value = json!({"intent": "search", "steps": [weather_step(1, "Paris")]});
        let err = validate_plan(&value).unwrap_err();
        assert!(err.to_string().contains("task_description"));
    }

    #[test]
    fn rejects_invalid_intent() {
        let mut value = plan_with_steps(json!([weather_step(1, "Paris")]));
        value["intent"] = json!("investigate");
        let err = validate_plan(&value).unwrap_err();
        assert!(err.to_string().contains("invalid intent"));
    }

    #[test]
    fn rejects_empty_steps() {
        let err = validate_plan(&plan_with_steps(json!([]))).unwrap_err();
        assert!(err.to_string().contains("at least one step"));
    }

    #[test]
    fn rejects_non_sequence_steps() {
        let err = validate_plan(&plan_with_steps(json!("not steps"))).unwrap_err();
        assert!(err.to_string().contains("sequence"));
    }

    #[test]
    fn rejects_step_number_gap() {
        let steps = json!([weather_step(1, "Paris"), weather_step(3, "Oslo")]);
        let err = validate_plan(&plan_with_steps(steps)).unwrap_err();
        assert!(err.to_string().contains("expected 2, got 3"));
    }

    #[test]
    fn rejects_out_of_order_step_numbers() {
        let steps = json!([weather_step(2, "Paris"), weather_step(1, "Oslo")]);
        assert!(validate_plan(&plan_with_steps(steps)).is_err());
    }

    #[test]
    fn rejects_duplicate_step_numbers() {
        let steps = json!([weather_step(1, "Paris"), weather_step(1, "Oslo")]);
        assert!(validate_plan(&plan_with_steps(steps)).is_err());
    }

    #[test]
    fn rejects_unknown_tool() {
        let step = json!({
            "step_number": 1,
            "action": "Do something",
            "tool": "calculator",
            "parameters": {},
            "expected_output": "A number"
        });
        let err = validate_plan(&plan_with_steps(json!([step]))).unwrap_err();
        assert!(err.to_string().contains("unknown tool"));
    }

    #[test]
    fn rejects_non_mapping_parameters() {
        let step = json!({
            "step_number": 1,
            "action": "Fetch weather",
            "tool": "weather",
            "parameters": "Paris",
            "expected_output": "Weather data"
        });
        let err = validate_plan(&plan_with_steps(json!([step]))).unwrap_err();
        assert!(err.to_string().contains("mapping"));
    }

    #[test]
    fn comparison_mode_without_entities_is_soft() {
        let mut value = plan_with_steps(json!([weather_step(1, "Paris")]));
        value["comparison_mode"] = json!(true);
        let plan = validate_plan(&value).unwrap();
        assert!(plan.comparison_mode);
        assert!(plan.entities.is_empty());
    }

    #[test]
    fn repo_search_defaults() {
        let params = json!({"query": "rust web framework"});
        let op = map_parameters(ToolName::RepositorySearch, params.as_object().unwrap()).unwrap();
        assert_eq!(
            op,
            ToolOp::RepoSearch {
                query: "rust web framework".into(),
                sort: SortBy::Stars,
                limit: 5
            }
        );
    }

    #[test]
    fn repo_search_requires_query() {
        let params = json!({"sort": "forks"});
        let err =
            map_parameters(ToolName::RepositorySearch, params.as_object().unwrap()).unwrap_err();
        assert!(err.to_string().contains("query"));
    }

    #[test]
    fn weather_cities_maps_to_compare() {
        let params = json!({"cities": ["London", "Tokyo"], "units": "imperial"});
        let op = map_parameters(ToolName::Weather, params.as_object().unwrap()).unwrap();
        assert_eq!(
            op,
            ToolOp::WeatherCompare {
                cities: vec!["London".into(), "Tokyo".into()],
                units: Units::Imperial
            }
        );
    }

    #[test]
    fn weather_city_takes_precedence_over_cities() {
        let params = json!({"city": "London", "cities": ["Oslo"]});
        let op = map_parameters(ToolName::Weather, params.as_object().unwrap()).unwrap();
        assert!(matches!(op, ToolOp::WeatherCurrent { city, .. } if city == "London"));
    }

    #[test]
    fn unknown_units_fall_back_to_metric() {
        let params = json!({"city": "London", "units": "kelvinish"});
        let op = map_parameters(ToolName::Weather, params.as_object().unwrap()).unwrap();
        assert!(matches!(op, ToolOp::WeatherCurrent { units: Units::Metric, .. }));
    }

    #[test]
    fn encyclopedia_precedence_topic_query_topics() {
        let topic = json!({"topic": "Rust", "query": "rust", "topics": ["Rust"]});
        let op = map_parameters(ToolName::Encyclopedia, topic.as_object().unwrap()).unwrap();
        assert!(matches!(op, ToolOp::ArticleSummary { sentences: 3, .. }));

        let query = json!({"query": "rust"});
        let op = map_parameters(ToolName::Encyclopedia, query.as_object().unwrap()).unwrap();
        assert!(matches!(op, ToolOp::ArticleSearch { limit: 5, .. }));

        let topics = json!({"topics": ["Rust", "Go"]});
        let op = map_parameters(ToolName::Encyclopedia, topics.as_object().unwrap()).unwrap();
        assert!(matches!(op, ToolOp::TopicCompare { .. }));
    }

    #[test]
    fn encyclopedia_requires_some_parameter() {
        let params = json!({"sentences": 5});
        assert!(map_parameters(ToolName::Encyclopedia, params.as_object().unwrap()).is_err());
    }
}
