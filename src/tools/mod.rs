pub mod encyclopedia;
pub mod repo;
pub mod weather;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

pub use encyclopedia::WikipediaClient;
pub use repo::GithubRepoSearch;
pub use weather::OpenWeatherClient;

use crate::{
    error::ToolError,
    plan::{SortBy, Units},
};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RepoSummary {
    pub name: String,
    pub full_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub stars: u64,
    pub forks: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    pub url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
    /// Set when this entry stands in for a failed item of a compare batch.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl RepoSummary {
    pub fn placeholder(name: impl Into<String>, error: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            full_name: name.clone(),
            name,
            description: None,
            stars: 0,
            forks: 0,
            language: None,
            url: String::new(),
            updated_at: None,
            error: Some(error.into()),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeatherReading {
    pub city: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
    pub temperature: f64,
    pub feels_like: f64,
    pub conditions: String,
    pub humidity: u64,
    pub wind_speed: f64,
    pub timestamp: i64,
    pub units: Units,
    /// Set when this entry stands in for a failed item of a compare batch.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl WeatherReading {
    pub fn placeholder(city: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            city: city.into(),
            country: None,
            temperature: 0.0,
            feels_like: 0.0,
            conditions: String::new(),
            humidity: 0,
            wind_speed: 0.0,
            timestamp: 0,
            units: Units::Metric,
            error: Some(error.into()),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArticleSummary {
    pub title: String,
    pub summary: String,
    pub extract: String,
    pub url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Set when this entry stands in for a failed item of a compare batch.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ArticleSummary {
    pub fn placeholder(title: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            summary: String::new(),
            extract: String::new(),
            url: String::new(),
            description: None,
            error: Some(error.into()),
        }
    }
}

#[async_trait]
pub trait RepoSearchApi: Send + Sync {
    async fn search(
        &self,
        query: &str,
        sort: SortBy,
        limit: u32,
    ) -> Result<Vec<RepoSummary>, ToolError>;

    /// Resolve each item (`owner/repo` or a search query); per-item failures
    /// become placeholder entries, never abort the batch.
    async fn compare(&self, items: &[String]) -> Result<Vec<RepoSummary>, ToolError>;
}

#[async_trait]
pub trait WeatherApi: Send + Sync {
    async fn current(&self, city: &str, units: Units) -> Result<WeatherReading, ToolError>;

    async fn compare(
        &self,
        cities: &[String],
        units: Units,
    ) -> Result<Vec<WeatherReading>, ToolError>;
}

#[async_trait]
pub trait EncyclopediaApi: Send + Sync {
    async fn summary(&self, topic: &str, sentences: u32) -> Result<ArticleSummary, ToolError>;

    async fn search(&self, query: &str, limit: u32) -> Result<Vec<String>, ToolError>;

    async fn compare(&self, topics: &[String]) -> Result<Vec<ArticleSummary>, ToolError>;
}

pub(crate) const USER_AGENT: &str = "ops-assistant/0.1";

pub(crate) fn request_error(e: reqwest::Error) -> ToolError {
    if e.is_timeout() {
        ToolError::network(format!("request timeout: {e}"))
    } else if e.is_connect() {
        ToolError::network(format!("connection error: {e}"))
    } else {
        ToolError::other(e.to_string())
    }
}
