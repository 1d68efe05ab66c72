use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::{
    error::{Result, ToolError},
    tools::{ArticleSummary, EncyclopediaApi, USER_AGENT, request_error},
};

const REST_BASE: &str = "https://en.wikipedia.org/api/rest_v1";
const ACTION_API: &str = "https://en.wikipedia.org/w/api.php";
const MAX_SEARCH_RESULTS: u32 = 10;

/// Article summaries and search backed by the Wikipedia REST API. No
/// authentication required.
pub struct WikipediaClient {
    client: reqwest::Client,
}

#[derive(Debug, Deserialize)]
struct PageSummary {
    title: String,
    #[serde(default)]
    extract: String,
    description: Option<String>,
    #[serde(rename = "type")]
    page_type: Option<String>,
    content_urls: Option<ContentUrls>,
}

#[derive(Debug, Deserialize)]
struct ContentUrls {
    desktop: Option<PageUrls>,
}

#[derive(Debug, Deserialize)]
struct PageUrls {
    page: Option<String>,
}

impl PageSummary {
    fn is_disambiguation(&self) -> bool {
        self.page_type.as_deref() == Some("disambiguation")
    }

    fn into_article(self, sentences: u32) -> ArticleSummary {
        let url = self
            .content_urls
            .and_then(|u| u.desktop)
            .and_then(|d| d.page)
            .unwrap_or_default();
        ArticleSummary {
            title: self.title,
            extract: first_sentences(&self.extract, sentences),
            summary: self.extract,
            url,
            description: self.description,
            error: None,
        }
    }
}

impl WikipediaClient {
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()?;
        Ok(Self { client })
    }

    async fn fetch_page(&self, topic: &str) -> Result<PageSummary, ToolError> {
        let url = format!("{REST_BASE}/page/summary/{}", encode_title(topic));
        let response = self.client.get(&url).send().await.map_err(request_error)?;
        let status = response.status();

        if status.is_success() {
            response
                .json()
                .await
                .map_err(|e| ToolError::other(format!("failed to decode article response: {e}")))
        } else if status.as_u16() == 404 {
            // Offer the closest search hit as a suggestion.
            let hint = match self.search(topic, 1).await {
                Ok(hits) if !hits.is_empty() => {
                    format!("article '{topic}' not found, did you mean '{}'?", hits[0])
                }
                _ => format!("article '{topic}' not found, check the spelling"),
            };
            Err(ToolError::not_found(hint))
        } else if status.as_u16() == 429 {
            Err(ToolError::rate_limited("wikipedia api rate limit exceeded"))
        } else if status.is_server_error() {
            Err(ToolError::network(format!(
                "wikipedia api server error: {status}"
            )))
        } else {
            Err(ToolError::other(format!("wikipedia api error: {status}")))
        }
    }

    /// Pick the first search hit that differs from the topic itself, to
    /// steer away from a disambiguation page.
    async fn disambiguation_alternative(&self, topic: &str) -> Option<String> {
        let hits = self.search(topic, 5).await.ok()?;
        hits.into_iter()
            .find(|hit| !hit.eq_ignore_ascii_case(topic))
    }
}

#[async_trait]
impl EncyclopediaApi for WikipediaClient {
    async fn summary(&self, topic: &str, sentences: u32) -> Result<ArticleSummary, ToolError> {
        let topic = topic.trim();
        if topic.is_empty() {
            return Err(ToolError::invalid("topic cannot be empty"));
        }
        info!(topic, "fetching article summary");

        let mut page = self.fetch_page(topic).await?;

        if page.is_disambiguation() {
            warn!(topic, "topic resolves to a disambiguation page");
            if let Some(alternative) = self.disambiguation_alternative(topic).await {
                info!(topic, alternative, "retrying with search suggestion");
                let retried = self.fetch_page(&alternative).await?;
                if !retried.is_disambiguation() {
                    return Ok(retried.into_article(sentences));
                }
                page = retried;
            }
            // Still ambiguous: return what we have, tagged as such.
            let mut article = page.into_article(sentences);
            article.description = Some("Disambiguation page".to_string());
            return Ok(article);
        }

        Ok(page.into_article(sentences))
    }

    async fn search(&self, query: &str, limit: u32) -> Result<Vec<String>, ToolError> {
        let query = query.trim();
        if query.is_empty() {
            return Err(ToolError::invalid("search query cannot be empty"));
        }
        info!(query, limit, "searching articles");

        let response = self
            .client
            .get(ACTION_API)
            .query(&[
                ("action", "opensearch"),
                ("search", query),
                ("limit", &limit.clamp(1, MAX_SEARCH_RESULTS).to_string()),
                ("namespace", "0"),
                ("format", "json"),
            ])
            .send()
            .await
            .map_err(request_error)?;

        let status = response.status();
        if !status.is_success() {
            return Err(ToolError::other(format!(
                "wikipedia search error: {status}"
            )));
        }

        // Opensearch returns [query, [titles], [descriptions], [urls]].
        let payload: Value = response
            .json()
            .await
            .map_err(|e| ToolError::other(format!("failed to decode search response: {e}")))?;
        let titles = payload
            .get(1)
            .and_then(Value::as_array)
            .map(|items| {
                items
                    .iter()
                    .filter_map(Value::as_str)
                    .map(str::to_string)
                    .collect::<Vec<_>>()
            })
            .unwrap_or_default();

        debug!(count = titles.len(), "article search results");
        Ok(titles)
    }

    async fn compare(&self, topics: &[String]) -> Result<Vec<ArticleSummary>, ToolError> {
        info!(count = topics.len(), "comparing topics");
        let mut results = Vec::with_capacity(topics.len());

        for topic in topics {
            match self.summary(topic, 3).await {
                Ok(article) => results.push(article),
                Err(err) => {
                    debug!("summary for '{topic}' failed: {err}");
                    results.push(ArticleSummary::placeholder(topic, err.to_string()));
                }
            }
        }

        Ok(results)
    }
}

/// Wikipedia titles use underscores for spaces; everything outside the
/// unreserved set is percent-encoded.
fn encode_title(topic: &str) -> String {
    let mut encoded = String::with_capacity(topic.len());
    for byte in topic.replace(' ', "_").bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' | b'(' | b')'
            | b',' | b':' => encoded.push(byte as char),
            _ => encoded.push_str(&format!("%{byte:02X}")),
        }
    }
    encoded
}

fn first_sentences(text: &str, count: u32) -> String {
    if count == 0 {
        return String::new();
    }
    let mut taken = 0u32;
    let mut end = text.len();
    for (i, _) in text.match_indices(". ") {
        taken += 1;
        if taken >= count {
            end = i + 1;
            break;
        }
    }
    text[..end].trim_end().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encodes_spaces_and_specials() {
        assert_eq!(
            encode_title("Python (programming language)"),
            "Python_(programming_language)"
        );
        assert_eq!(encode_title("AT&T"), "AT%26T");
    }

    #[test]
    fn takes_first_sentences() {
        let text = "One. Two. Three. Four.";
        assert_eq!(first_sentences(text, 2), "One. Two.");
        assert_eq!(first_sentences(text, 10), "One. Two. Three. Four.");
        assert_eq!(first_sentences("No breaks here", 3), "No breaks here");
    }
}
