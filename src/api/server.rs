//! HTTP server implementation

use std::sync::Arc;

use axum::Router;
use tower_http::compression::CompressionLayer;
use tower_http::cors::Any;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::api::handlers::AppState;
use crate::api::routes;
use crate::config::AppConfig;
use crate::pipeline::Pipeline;
use crate::Result;

/// Start the API server
pub async fn serve_api(
    config: &AppConfig,
    host: String,
    port: u16,
    enable_cors: bool,
) -> Result<()> {
    info!("🚀 Starting Solace API server...");

    // Initialize collaborators once; runs share this state immutably
    let pipeline = Arc::new(Pipeline::from_config(config)?);

    let state = AppState {
        pipeline,
        config: Arc::new(config.clone()),
    };

    let api_router = routes::api_routes(state);

    let mut app = Router::new().nest("/api", api_router);

    // Add middleware layers
    app = app
        .layer(TraceLayer::new_for_http())
        .layer(CompressionLayer::new());

    // Add CORS if enabled
    if enable_cors {
        info!("✅ CORS enabled");
        let cors = CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any);
        app = app.layer(cors);
    }

    // Start server
    let addr = format!("{host}:{port}");
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    info!("🌐 API server listening on http://{}", addr);
    info!("Available endpoints:");
    info!("  GET  /api/           - Service info");
    info!("  GET  /api/health     - Health check");
    info!("  POST /api/recommend  - Passage recommendation (SSE stream)");

    axum::serve(listener, app).await?;

    Ok(())
}
