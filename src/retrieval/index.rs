//! HTTP client for the managed semantic index service.
//!
//! The service embeds query text server-side and answers filtered
//! nearest-neighbor searches with scored, labeled matches.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde::Serialize;
use tracing::debug;

use super::IndexStats;
use super::SemanticIndex;
use crate::config::RetrievalConfig;
use crate::models::Candidate;
use crate::models::SourcePartition;
use crate::Result;
use crate::SolaceError;

pub struct HttpSemanticIndex {
    endpoint: String,
    api_key: String,
    client: Client,
}

#[derive(Debug, Serialize)]
struct SearchRequest<'a> {
    query: &'a str,
    top_k: usize,
    filter: SearchFilter,
}

#[derive(Debug, Serialize)]
struct SearchFilter {
    partition: PartitionPredicate,
}

#[derive(Debug, Serialize)]
struct PartitionPredicate {
    #[serde(rename = "$in")]
    any_of: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    matches: Vec<IndexMatch>,
}

#[derive(Debug, Deserialize)]
struct IndexMatch {
    id: String,
    score: f32,
    text: String,
    #[serde(default)]
    metadata: MatchMetadata,
}

#[derive(Debug, Deserialize, Default)]
struct MatchMetadata {
    #[serde(default)]
    reference: String,
    #[serde(default)]
    partition: String,
}

#[derive(Debug, Deserialize)]
struct DescribeResponse {
    total_count: u64,
}

impl HttpSemanticIndex {
    /// Create a client for the configured index service.
    ///
    /// # Errors
    /// - HTTP client build errors (invalid configuration)
    pub fn new(config: &RetrievalConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| SolaceError::HttpError(e.to_string()))?;

        Ok(Self {
            endpoint: config.index_endpoint.trim_end_matches('/').to_string(),
            api_key: config.index_api_key.clone(),
            client,
        })
    }
}

#[async_trait]
impl SemanticIndex for HttpSemanticIndex {
    async fn search(
        &self,
        query: &str,
        partitions: &[SourcePartition],
        k: usize,
    ) -> Result<Vec<Candidate>> {
        let request = SearchRequest {
            query,
            top_k: k,
            filter: SearchFilter {
                partition: PartitionPredicate {
                    any_of: partitions.iter().map(|p| p.as_str().to_string()).collect(),
                },
            },
        };

        let url = format!("{}/search", self.endpoint);
        debug!("Index search: top_k={} partitions={:?}", k, partitions);

        let response = self
            .client
            .post(&url)
            .header("Api-Key", &self.api_key)
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(SolaceError::HttpError(format!(
                "index search returned {}",
                response.status()
            )));
        }

        let body: SearchResponse = response.json().await?;

        Ok(body
            .matches
            .into_iter()
            .map(|m| {
                let reference = if m.metadata.reference.is_empty() {
                    m.id.clone()
                } else {
                    m.metadata.reference
                };
                Candidate {
                    id: m.id,
                    source_label: reference,
                    text: m.text,
                    origin_tag: m.metadata.partition,
                    raw_score: m.score,
                    url: None,
                }
            })
            .collect())
    }

    async fn describe(&self) -> Result<IndexStats> {
        let url = format!("{}/describe", self.endpoint);
        let response = self
            .client
            .get(&url)
            .header("Api-Key", &self.api_key)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(SolaceError::HttpError(format!(
                "index describe returned {}",
                response.status()
            )));
        }

        let body: DescribeResponse = response.json().await?;
        Ok(IndexStats {
            total_count: body.total_count,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filter_serializes_to_in_predicate() {
        let request = SearchRequest {
            query: "q",
            top_k: 50,
            filter: SearchFilter {
                partition: PartitionPredicate {
                    any_of: vec!["OT".to_string(), "NT".to_string()],
                },
            },
        };
        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(value["filter"]["partition"]["$in"][0], "OT");
        assert_eq!(value["filter"]["partition"]["$in"][1], "NT");
        assert_eq!(value["top_k"], 50);
    }

    #[test]
    fn test_match_without_metadata_falls_back_to_id() {
        let json = r#"{"matches":[{"id":"ps-23-1","score":0.88,"text":"The Lord is my shepherd"}]}"#;
        let parsed: SearchResponse = serde_json::from_str(json).unwrap();
        let m = &parsed.matches[0];
        assert!(m.metadata.reference.is_empty());
        assert_eq!(m.id, "ps-23-1");
    }
}
