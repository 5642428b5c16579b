//! Rerank stage: cross-encoder re-scoring with graceful degradation.
//!
//! Reranking improves relevance but is not required for correctness, so a
//! collaborator failure never fails the run. The caller gets an explicit
//! two-state `Ranking` instead of an error.

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde::Serialize;
use tracing::debug;
use tracing::warn;

use super::RerankScore;
use super::RerankService;
use crate::config::RerankConfig;
use crate::models::Candidate;
use crate::models::Ranking;
use crate::models::RerankedCandidate;
use crate::Result;
use crate::SolaceError;

/// HTTP client for the managed rerank service.
pub struct HttpRerankService {
    endpoint: String,
    api_key: String,
    client: Client,
}

#[derive(Debug, Serialize)]
struct RerankRequest<'a> {
    query: &'a str,
    documents: &'a [String],
}

#[derive(Debug, Deserialize)]
struct RerankResponse {
    results: Vec<RerankResult>,
}

#[derive(Debug, Deserialize)]
struct RerankResult {
    index: usize,
    relevance_score: f32,
}

impl HttpRerankService {
    /// Create a client for the configured rerank service.
    ///
    /// # Errors
    /// - HTTP client build errors (invalid configuration)
    pub fn new(config: &RerankConfig) -> Result<Self> {
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
impl RerankService for HttpRerankService {
    async fn rerank(&self, query: &str, documents: &[String]) -> Result<Vec<RerankScore>> {
        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&RerankRequest { query, documents })
            .send()
            .await?;

        if !response.status().is_success() {
            // 429 quota exhaustion lands here too; callers degrade the same way
            return Err(SolaceError::HttpError(format!(
                "rerank returned {}",
                response.status()
            )));
        }

        let body: RerankResponse = response.json().await?;

        Ok(body
            .results
            .into_iter()
            .map(|r| RerankScore {
                index: r.index,
                score: r.relevance_score,
            })
            .collect())
    }
}

/// The pipeline's rerank stage. Holds an optional collaborator; absent or
/// failing collaborators both degrade to the raw retrieval ordering.
pub struct RerankStage {
    service: Option<Arc<dyn RerankService>>,
}

impl RerankStage {
    pub fn new(service: Option<Arc<dyn RerankService>>) -> Self {
        Self { service }
    }

    /// Disabled stage that always passes candidates through unreranked.
    #[must_use]
    pub fn disabled() -> Self {
        Self { service: None }
    }

    /// Re-score candidates against the query.
    ///
    /// Never fails: on collaborator error or quota exhaustion the original
    /// retrieval ordering is kept, sorted by raw score descending, and the
    /// result is tagged `Unreranked`.
    pub async fn rank(&self, query: &str, candidates: Vec<Candidate>) -> Ranking {
        let Some(service) = &self.service else {
            debug!("Reranking disabled, keeping retrieval order");
            return Self::fallback(candidates);
        };

        let documents: Vec<String> = candidates.iter().map(|c| c.text.clone()).collect();

        match service.rerank(query, &documents).await {
            Ok(scores) => {
                let mut reranked: Vec<RerankedCandidate> = scores
                    .into_iter()
                    .filter(|s| s.index < candidates.len())
                    .map(|s| RerankedCandidate {
                        candidate: candidates[s.index].clone(),
                        rerank_score: s.score,
                    })
                    .collect();

                if reranked.is_empty() {
                    warn!("Rerank service returned no usable scores, falling back");
                    return Self::fallback(candidates);
                }

                reranked.sort_by(|a, b| {
                    b.rerank_score
                        .partial_cmp(&a.rerank_score)
                        .unwrap_or(std::cmp::Ordering::Equal)
                });
                debug!("Reranked {} candidates", reranked.len());
                Ranking::Reranked(reranked)
            }
            Err(e) => {
                warn!("Rerank collaborator failed ({}), keeping retrieval order", e);
                Self::fallback(candidates)
            }
        }
    }

    fn fallback(mut candidates: Vec<Candidate>) -> Ranking {
        candidates.sort_by(|a, b| {
            b.raw_score
                .partial_cmp(&a.raw_score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        Ranking::Unreranked(candidates)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidate(id: &str, raw_score: f32) -> Candidate {
        Candidate {
            id: id.to_string(),
            source_label: id.to_string(),
            text: format!("text {id}"),
            origin_tag: "OT".to_string(),
            raw_score,
            url: None,
        }
    }

    struct ReversingService;

    #[async_trait]
    impl RerankService for ReversingService {
        async fn rerank(&self, _query: &str, documents: &[String]) -> Result<Vec<RerankScore>> {
            // Scores that invert the input order
            Ok(documents
                .iter()
                .enumerate()
                .map(|(i, _)| RerankScore {
                    index: i,
                    score: i as f32,
                })
                .collect())
        }
    }

    struct FailingService;

    #[async_trait]
    impl RerankService for FailingService {
        async fn rerank(&self, _query: &str, _documents: &[String]) -> Result<Vec<RerankScore>> {
            Err(SolaceError::HttpError("rerank returned 429".into()))
        }
    }

    #[tokio::test]
    async fn test_success_sorts_by_rerank_score() {
        let stage = RerankStage::new(Some(Arc::new(ReversingService)));
        let ranking = stage
            .rank("q", vec![candidate("a", 0.9), candidate("b", 0.8), candidate("c", 0.7)])
            .await;
        match ranking {
            Ranking::Reranked(items) => {
                assert_eq!(items[0].candidate.id, "c");
                assert_eq!(items[2].candidate.id, "a");
            }
            Ranking::Unreranked(_) => panic!("expected reranked result"),
        }
    }

    #[tokio::test]
    async fn test_failure_falls_back_to_raw_order() {
        let stage = RerankStage::new(Some(Arc::new(FailingService)));
        let ranking = stage
            .rank("q", vec![candidate("low", 0.1), candidate("high", 0.9)])
            .await;
        match ranking {
            Ranking::Unreranked(items) => {
                assert_eq!(items[0].id, "high");
                assert_eq!(items[1].id, "low");
            }
            Ranking::Reranked(_) => panic!("expected fallback"),
        }
    }

    #[tokio::test]
    async fn test_disabled_stage_keeps_raw_order() {
        let stage = RerankStage::disabled();
        let ranking = stage
            .rank("q", vec![candidate("low", 0.2), candidate("high", 0.8)])
            .await;
        assert!(matches!(ranking, Ranking::Unreranked(ref v) if v[0].id == "high"));
    }
}
