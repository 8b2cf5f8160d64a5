pub mod handlers;
pub mod types;

use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::pipeline::ClaimPipeline;

#[derive(Clone)]
pub struct AppState {
    pub pipeline: Arc<ClaimPipeline>,
}

pub fn router(pipeline: Arc<ClaimPipeline>) -> Router {
    let state = Arc::new(AppState { pipeline });

    Router::new()
        .route("/api/health", get(handlers::health))
        .route("/api/predict", post(handlers::predict))
        .route("/api/analytics", get(handlers::analytics))
        .route("/api/claims/{id}", get(handlers::claim_detail))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

pub async fn serve(
    pipeline: Arc<ClaimPipeline>,
    host: &str,
    port: u16,
    shutdown: CancellationToken,
) -> eyre::Result<()> {
    let app = router(pipeline);
    let addr = format!("{}:{}", host, port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(%addr, "API server listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown.cancelled_owned())
        .await?;
    Ok(())
}
