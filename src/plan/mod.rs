pub mod validate;

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

pub use validate::validate_plan;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Intent {
    Search,
    Compare,
    Summarize,
    Mixed,
}

impl Intent {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "search" => Some(Intent::Search),
            "compare" => Some(Intent::Compare),
            "summarize" => Some(Intent::Summarize),
            "mixed" => Some(Intent::Mixed),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ToolName {
    #[serde(rename = "repository-search")]
    RepositorySearch,
    #[serde(rename = "weather")]
    Weather,
    #[serde(rename = "encyclopedia")]
    Encyclopedia,
}

impl ToolName {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "repository-search" => Some(ToolName::RepositorySearch),
            "weather" => Some(ToolName::Weather),
            "encyclopedia" => Some(ToolName::Encyclopedia),
            _ => None,
        }
    }
}

impl fmt::Display for ToolName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ToolName::RepositorySearch => write!(f, "repository-search"),
            ToolName::Weather => write!(f, "weather"),
            ToolName::Encyclopedia => write!(f, "encyclopedia"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Units {
    #[default]
    Metric,
    Imperial,
    Standard,
}

impl Units {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "metric" => Some(Units::Metric),
            "imperial" => Some(Units::Imperial),
            "standard" => Some(Units::Standard),
            _ => None,
        }
    }
}

impl fmt::Display for Units {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Units::Metric => write!(f, "metric"),
            Units::Imperial => write!(f, "imperial"),
            Units::Standard => write!(f, "standard"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortBy {
    #[default]
    Stars,
    Forks,
    Updated,
}

impl SortBy {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "stars" => Some(SortBy::Stars),
            "forks" => Some(SortBy::Forks),
            "updated" => Some(SortBy::Updated),
            _ => None,
        }
    }
}

impl fmt::Display for SortBy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SortBy::Stars => write!(f, "stars"),
            SortBy::Forks => write!(f, "forks"),
            SortBy::Updated => write!(f, "updated"),
        }
    }
}

/// Closed set of tool operations. Produced by plan validation, so the
/// executor never inspects raw parameter maps to decide what to call.
#[derive(Debug, Clone, PartialEq)]
pub enum ToolOp {
    RepoSearch {
        query: String,
        sort: SortBy,
        limit: u32,
    },
    WeatherCurrent {
        city: String,
        units: Units,
    },
    WeatherCompare {
        cities: Vec<String>,
        units: Units,
    },
    ArticleSummary {
        topic: String,
        sentences: u32,
    },
    ArticleSearch {
        query: String,
        limit: u32,
    },
    TopicCompare {
        topics: Vec<String>,
    },
}

impl ToolOp {
    pub fn tool(&self) -> ToolName {
        match self {
            ToolOp::RepoSearch { .. } => ToolName::RepositorySearch,
            ToolOp::WeatherCurrent { .. } | ToolOp::WeatherCompare { .. } => ToolName::Weather,
            ToolOp::ArticleSummary { .. }
            | ToolOp::ArticleSearch { .. }
            | ToolOp::TopicCompare { .. } => ToolName::Encyclopedia,
        }
    }
}

/// One tool invocation within a plan. `parameters` keeps the model's raw
/// object for display; `op` is the validated operation the executor runs.
#[derive(Debug, Clone, Serialize)]
pub struct PlanStep {
    pub step_number: usize,
    pub action: String,
    pub tool: ToolName,
    pub parameters: Value,
    pub expected_output: String,
    #[serde(skip)]
    pub op: ToolOp,
}

/// Validated, ordered list of tool invocations. Immutable once built.
#[derive(Debug, Clone, Serialize)]
pub struct Plan {
    pub task_description: String,
    pub intent: Intent,
    pub steps: Vec<PlanStep>,
    pub comparison_mode: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub entities: Vec<String>,
}
