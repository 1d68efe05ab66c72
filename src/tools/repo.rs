use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, info};

use crate::{
    error::{Result, ToolError},
    plan::SortBy,
    tools::{RepoSearchApi, RepoSummary, USER_AGENT, request_error},
};

const API_BASE: &str = "https://api.github.com";

/// Repository search backed by the GitHub REST API. A token is optional but
/// raises the unauthenticated rate limit considerably.
pub struct GithubRepoSearch {
    client: reqwest::Client,
    token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    items: Vec<RawRepo>,
}

#[derive(Debug, Deserialize)]
struct RawRepo {
    name: String,
    full_name: String,
    description: Option<String>,
    #[serde(default)]
    stargazers_count: u64,
    #[serde(default)]
    forks_count: u64,
    language: Option<String>,
    html_url: String,
    updated_at: Option<String>,
}

impl From<RawRepo> for RepoSummary {
    fn from(raw: RawRepo) -> Self {
        Self {
            name: raw.name,
            full_name: raw.full_name,
            description: raw.description,
            stars: raw.stargazers_count,
            forks: raw.forks_count,
            language: raw.language,
            url: raw.html_url,
            updated_at: raw.updated_at,
            error: None,
        }
    }
}

impl GithubRepoSearch {
    pub fn new(token: Option<String>, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()?;
        Ok(Self { client, token })
    }

    async fn get_json<T: serde::de::DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T, ToolError> {
        let mut request = self
            .client
            .get(format!("{API_BASE}{path}"))
            .header("Accept", "application/vnd.github+json")
            .query(query);
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await.map_err(request_error)?;
        let status = response.status();

        if status.is_success() {
            response
                .json()
                .await
                .map_err(|e| ToolError::other(format!("failed to decode github response: {e}")))
        } else if status.as_u16() == 403 || status.as_u16() == 429 {
            Err(ToolError::rate_limited(
                "github api rate limit exceeded, retry later",
            ))
        } else if status.as_u16() == 404 {
            Err(ToolError::not_found(format!(
                "github resource not found: {path}"
            )))
        } else if status.is_server_error() {
            Err(ToolError::network(format!("github api server error: {status}")))
        } else {
            Err(ToolError::other(format!("github api error: {status}")))
        }
    }
}

#[async_trait]
impl RepoSearchApi for GithubRepoSearch {
    async fn search(
        &self,
        query: &str,
        sort: SortBy,
        limit: u32,
    ) -> Result<Vec<RepoSummary>, ToolError> {
        if query.trim().is_empty() {
            return Err(ToolError::invalid("search query cannot be empty"));
        }
        info!(query, %sort, limit, "searching repositories");

        let response: SearchResponse = self
            .get_json(
                "/search/repositories",
                &[
                    ("q", query.to_string()),
                    ("sort", sort.to_string()),
                    ("order", "desc".to_string()),
                    ("per_page", limit.clamp(1, 100).to_string()),
                ],
            )
            .await?;

        debug!(count = response.items.len(), "repository search results");
        Ok(response.items.into_iter().map(RepoSummary::from).collect())
    }

    async fn compare(&self, items: &[String]) -> Result<Vec<RepoSummary>, ToolError> {
        info!(count = items.len(), "comparing repositories");
        let mut results = Vec::with_capacity(items.len());

        for item in items {
            // "owner/repo" goes straight to the detail endpoint, anything
            // else is resolved through search.
            let fetched = if item.contains('/') {
                self.get_json::<RawRepo>(&format!("/repos/{item}"), &[])
                    .await
                    .map(RepoSummary::from)
            } else {
                self.search(item, SortBy::Stars, 1).await.and_then(|mut r| {
                    if r.is_empty() {
                        Err(ToolError::not_found(format!(
                            "no repository found for '{item}'"
                        )))
                    } else {
                        Ok(r.remove(0))
                    }
                })
            };

            match fetched {
                Ok(summary) => results.push(summary),
                Err(err) => {
                    debug!("compare item '{item}' failed: {err}");
                    results.push(RepoSummary::placeholder(item, err.to_string()));
                }
            }
        }

        Ok(results)
    }
}
