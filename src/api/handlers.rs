//! API request handlers.

use std::convert::Infallible;
use std::sync::Arc;

use axum::extract::State;
use axum::response::sse::Event;
use axum::response::sse::Sse;
use axum::Json;
use futures::stream::Stream;
use futures::StreamExt;
use tracing::info;
use tracing::warn;

use crate::api::types::encode_event;
use crate::api::types::HealthResponse;
use crate::api::types::RecommendRequest;
use crate::api::types::ServiceInfo;
use crate::config::AppConfig;
use crate::pipeline::Pipeline;

/// Shared application state. Immutable after startup; runs never mutate it.
#[derive(Clone)]
pub struct AppState {
    pub pipeline: Arc<Pipeline>,
    pub config: Arc<AppConfig>,
}

/// Recommendation endpoint (POST /api/recommend).
///
/// Responds with a server-sent event stream in strict emission order: one
/// crisis frame, OR a verses frame then explanation chunks then done, OR a
/// terminal error frame. The connection closes after the terminal frame.
pub async fn recommend(
    State(state): State<AppState>,
    Json(req): Json<RecommendRequest>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    info!("POST /api/recommend: tradition={}", req.tradition);

    let events = state.pipeline.stream_run(req.issue, req.tradition);

    // Encoder guard: nothing is ever emitted past the terminal event, even
    // if a buggy producer kept sending.
    let frames = events.scan(false, |terminated, event| {
        if *terminated {
            return futures::future::ready(None);
        }
        if event.is_terminal() {
            *terminated = true;
        }
        futures::future::ready(Some(Ok::<_, Infallible>(encode_event(&event))))
    });

    Sse::new(frames)
}

/// Health check handler (GET /api/health). Readiness plus index size
/// metadata; an unreachable index reports not-ready rather than an error.
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    let (index_ready, db_chunks) = match state.pipeline.index_stats().await {
        Ok(stats) => (true, stats.total_count),
        Err(e) => {
            warn!("Health check: index describe failed: {}", e);
            (false, 0)
        }
    };

    Json(HealthResponse {
        ok: index_ready,
        version: env!("CARGO_PKG_VERSION").to_string(),
        index_ready,
        db_chunks,
        reranker_enabled: state.config.rerank_enabled(),
    })
}

/// Root endpoint with API info
pub async fn root() -> Json<ServiceInfo> {
    Json(ServiceInfo {
        name: "Solace API".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        endpoints: vec![
            "GET  /api/health".to_string(),
            "POST /api/recommend".to_string(),
        ],
    })
}
