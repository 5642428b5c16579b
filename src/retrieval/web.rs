//! HTTP client for the web-search collaborator (social_media tradition).

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde::Serialize;
use tracing::debug;

use super::WebHit;
use super::WebSearcher;
use crate::config::WebSearchConfig;
use crate::Result;
use crate::SolaceError;

pub struct HttpWebSearcher {
    endpoint: String,
    api_key: String,
    client: Client,
}

#[derive(Debug, Serialize)]
struct WebSearchRequest<'a> {
    query: &'a str,
}

#[derive(Debug, Deserialize)]
struct WebSearchResponse {
    results: Vec<WebSearchResult>,
}

#[derive(Debug, Deserialize)]
struct WebSearchResult {
    #[serde(default)]
    title: String,
    content: String,
    url: String,
    score: Option<f32>,
}

impl HttpWebSearcher {
    /// Create a client for the configured web-search service.
    ///
    /// # Errors
    /// - HTTP client build errors (invalid configuration)
    pub fn new(config: &WebSearchConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| SolaceError::HttpError(e.to_string()))?;

        Ok(Self {
            endpoint: config.endpoint.clone(),
            api_key: config.api_key.clone(),
            client,
        })
    }
}

#[async_trait]
impl WebSearcher for HttpWebSearcher {
    async fn search(&self, query: &str) -> Result<Vec<WebHit>> {
        debug!("Web search: {}", query);

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&WebSearchRequest { query })
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(SolaceError::HttpError(format!(
                "web search returned {}",
                response.status()
            )));
        }

        let body: WebSearchResponse = response.json().await?;

        Ok(body
            .results
            .into_iter()
            .map(|r| WebHit {
                source: if r.title.is_empty() {
                    r.url.clone()
                } else {
                    r.title
                },
                text: r.content,
                url: r.url,
                score: r.score,
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_result_without_title_uses_url_as_source() {
        let json = r#"{"results":[{"content":"hang in there","url":"https://s.example/p/9"}]}"#;
        let parsed: WebSearchResponse = serde_json::from_str(json).unwrap();
        let r = &parsed.results[0];
        assert!(r.title.is_empty());
        assert!(r.score.is_none());
        assert_eq!(r.url, "https://s.example/p/9");
    }
}
