//! Similar-article lookup over a Serper-style web search API.
//!
//! Returns the top results as plain (title, link, snippet) tuples; failures
//! are reported to the user by the caller and never touch loaded records or
//! map state.

use anyhow::{bail, Result};
use std::time::Duration;

use crate::config::RelatedConfig;

/// How many search results to surface.
const MAX_RESULTS: usize = 5;

#[derive(Debug, Clone, serde::Serialize)]
pub struct RelatedArticle {
    pub title: String,
    pub link: String,
    pub snippet: String,
}

pub struct SerperClient {
    client: reqwest::Client,
    endpoint: String,
}

impl SerperClient {
    /// Requires the `SERPER_API_KEY` environment variable.
    pub fn new(config: &RelatedConfig) -> Result<Self> {
        if std::env::var("SERPER_API_KEY").is_err() {
            bail!("SERPER_API_KEY environment variable not set");
        }
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self {
            client,
            endpoint: config.endpoint.clone(),
        })
    }

    /// Search for articles related to the keyword. Top results only.
    pub async fn search(&self, keyword: &str) -> Result<Vec<RelatedArticle>> {
        let api_key = std::env::var("SERPER_API_KEY")
            .map_err(|_| anyhow::anyhow!("SERPER_API_KEY not set"))?;

        let body = serde_json::json!({
            "q": keyword,
            "gl": "us",
            "hl": "ko",
        });

        let response = self
            .client
            .post(&self.endpoint)
            .header("X-API-KEY", api_key)
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body_text = response.text().await.unwrap_or_default();
            bail!("search API error {}: {}", status, body_text);
        }

        let json: serde_json::Value = response.json().await?;
        Ok(parse_organic_results(&json))
    }
}

/// Extract the top organic results; entries missing a field get an empty
/// string rather than being dropped.
fn parse_organic_results(json: &serde_json::Value) -> Vec<RelatedArticle> {
    let Some(organic) = json.get("organic").and_then(|o| o.as_array()) else {
        return Vec::new();
    };
    organic
        .iter()
        .take(MAX_RESULTS)
        .map(|item| RelatedArticle {
            title: item
                .get("title")
                .and_then(|v| v.as_str())
                .unwrap_or_default()
                .to_string(),
            link: item
                .get("link")
                .and_then(|v| v.as_str())
                .unwrap_or_default()
                .to_string(),
            snippet: item
                .get("snippet")
                .and_then(|v| v.as_str())
                .unwrap_or_default()
                .to_string(),
        })
        .collect()
}
