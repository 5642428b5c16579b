//! API request types and the pipeline-event wire encoder.

use axum::response::sse::Event;
use serde::Deserialize;
use serde::Serialize;

use crate::models::PipelineEvent;
use crate::models::Tradition;

/// Recommendation request body.
#[derive(Debug, Deserialize)]
pub struct RecommendRequest {
    pub issue: String,
    /// Omitted means christian, matching clients of the original
    /// single-tradition service.
    #[serde(default)]
    pub tradition: Tradition,
}

/// Health check response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub ok: bool,
    pub version: String,
    pub index_ready: bool,
    pub db_chunks: u64,
    pub reranker_enabled: bool,
}

/// Service info for the root endpoint
#[derive(Debug, Serialize)]
pub struct ServiceInfo {
    pub name: String,
    pub version: String,
    pub endpoints: Vec<String>,
}

/// Encode one pipeline event as an SSE frame (`data: <json>`).
///
/// Serialization of a pre-built JSON value cannot fail, so the frame is
/// produced infallibly and flushed by axum without batching.
#[must_use]
pub fn encode_event(event: &PipelineEvent) -> Event {
    Event::default().data(event.wire_json().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recommend_request_defaults_tradition() {
        let req: RecommendRequest = serde_json::from_str(r#"{"issue":"I feel alone"}"#).unwrap();
        assert_eq!(req.tradition, Tradition::Christian);

        let req: RecommendRequest =
            serde_json::from_str(r#"{"issue":"I feel alone","tradition":"jewish"}"#).unwrap();
        assert_eq!(req.tradition, Tradition::Jewish);
    }

    #[test]
    fn test_missing_issue_is_rejected_at_parse() {
        let parsed = serde_json::from_str::<RecommendRequest>(r#"{"tradition":"jewish"}"#);
        assert!(parsed.is_err());
    }
}
