//! Retrieval module: semantic index and web-search collaborators plus the
//! candidate retriever facade.

pub mod index;
pub mod rerank;
pub mod web;

use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use crate::models::Candidate;
use crate::models::FilterSpec;
use crate::models::SourcePartition;
use crate::Result;
use crate::SolaceError;

pub use index::HttpSemanticIndex;
pub use rerank::HttpRerankService;
pub use rerank::RerankStage;
pub use web::HttpWebSearcher;

/// Relevance assigned to web results when the search service reports none.
const DEFAULT_WEB_SCORE: f32 = 0.5;

/// Basic index metadata for the readiness endpoint.
#[derive(Debug, Clone, Copy, Default)]
pub struct IndexStats {
    pub total_count: u64,
}

/// Managed semantic search service: embeds the query text itself and runs
/// a filtered nearest-neighbor search.
#[async_trait]
pub trait SemanticIndex: Send + Sync {
    async fn search(
        &self,
        query: &str,
        partitions: &[SourcePartition],
        k: usize,
    ) -> Result<Vec<Candidate>>;

    /// Index size metadata used by the health endpoint.
    async fn describe(&self) -> Result<IndexStats>;
}

/// One hit from the web-search collaborator.
#[derive(Debug, Clone)]
pub struct WebHit {
    /// Title or account handle of the source
    pub source: String,
    pub text: String,
    pub url: String,
    pub score: Option<f32>,
}

/// Web-search collaborator used only by the social_media tradition.
#[async_trait]
pub trait WebSearcher: Send + Sync {
    async fn search(&self, query: &str) -> Result<Vec<WebHit>>;
}

/// Cross-encoder rerank collaborator. Returns per-document scores keyed by
/// input position.
#[async_trait]
pub trait RerankService: Send + Sync {
    async fn rerank(&self, query: &str, documents: &[String]) -> Result<Vec<RerankScore>>;
}

/// Score for one reranked document.
#[derive(Debug, Clone, Copy)]
pub struct RerankScore {
    pub index: usize,
    pub score: f32,
}

/// Candidate retriever: routes a prepared query to the right collaborator
/// and enforces the retrieval error contract.
pub struct Retriever {
    index: Arc<dyn SemanticIndex>,
    web: Arc<dyn WebSearcher>,
    query_instruction: String,
    top_k: usize,
}

impl Retriever {
    pub fn new(
        index: Arc<dyn SemanticIndex>,
        web: Arc<dyn WebSearcher>,
        query_instruction: impl Into<String>,
        top_k: usize,
    ) -> Self {
        Self {
            index,
            web,
            query_instruction: query_instruction.into(),
            top_k,
        }
    }

    /// Fetch up to `top_k` candidates matching the filter.
    ///
    /// This stage has no fallback: a collaborator failure is terminal for
    /// the run. A reachable service returning zero results is the distinct,
    /// client-actionable `NoPassagesFound`.
    ///
    /// # Errors
    /// - `RetrievalUnavailable` on collaborator timeout/quota/5xx
    /// - `NoPassagesFound` when the service answers with zero results
    pub async fn fetch(&self, query: &str, filter: &FilterSpec) -> Result<Vec<Candidate>> {
        let candidates = match filter {
            FilterSpec::Partitions(partitions) => {
                let instructed = format!("{} {}", self.query_instruction, query);
                debug!("Semantic search over partitions {:?}", partitions);
                self.index
                    .search(&instructed, partitions, self.top_k)
                    .await
                    .map_err(|e| SolaceError::RetrievalUnavailable(e.to_string()))?
            }
            FilterSpec::WebSearch => {
                debug!("Routing retrieval to web search");
                let hits = self
                    .web
                    .search(query)
                    .await
                    .map_err(|e| SolaceError::RetrievalUnavailable(e.to_string()))?;
                hits.into_iter()
                    .take(self.top_k)
                    .enumerate()
                    .map(|(idx, hit)| Candidate {
                        id: format!("web-{idx}"),
                        source_label: hit.source,
                        text: hit.text,
                        origin_tag: "social".to_string(),
                        raw_score: hit.score.unwrap_or(DEFAULT_WEB_SCORE),
                        url: Some(hit.url),
                    })
                    .collect()
            }
        };

        if candidates.is_empty() {
            return Err(SolaceError::NoPassagesFound);
        }

        debug!("Retrieved {} candidates", candidates.len());
        Ok(candidates)
    }
}
