use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde_json::Value;
use std::sync::Arc;

use crate::analytics::AnalyticsSnapshot;
use crate::pipeline::SubmitError;
use crate::store::{ClaimId, StoreError};

use super::types::*;
use super::AppState;

type ApiError = (StatusCode, Json<ErrorResponse>);
type ApiResult<T> = Result<Json<T>, ApiError>;

fn api_error(status: StatusCode, msg: impl Into<String>) -> ApiError {
    (status, Json(ErrorResponse::message(msg)))
}

fn submit_error(err: SubmitError) -> ApiError {
    match err {
        SubmitError::Validation(e) => (
            StatusCode::UNPROCESSABLE_ENTITY,
            Json(ErrorResponse {
                error: "invalid claim".to_string(),
                fields: e.errors,
                prediction: None,
            }),
        ),
        // Logged with context by the pipeline.
        SubmitError::Feature(_) => api_error(
            StatusCode::UNPROCESSABLE_ENTITY,
            "claim could not be processed",
        ),
        SubmitError::Store { prediction, .. } => (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(ErrorResponse {
                error: "claim was scored but could not be recorded".to_string(),
                fields: Vec::new(),
                prediction: Some(PredictionBody::from(&prediction)),
            }),
        ),
    }
}

fn store_error(err: StoreError) -> ApiError {
    match err {
        StoreError::NotFound(id) => api_error(StatusCode::NOT_FOUND, format!("claim {} not found", id)),
        other => {
            tracing::error!(error = %other, "Claim lookup failed");
            api_error(StatusCode::INTERNAL_SERVER_ERROR, "claim store unavailable")
        }
    }
}

// ============================================================
// Health
// ============================================================

pub async fn health(State(state): State<Arc<AppState>>) -> ApiResult<HealthResponse> {
    let claims_stored = state.pipeline.claims_stored().await.map_err(store_error)?;
    Ok(Json(HealthResponse {
        status: "ok".to_string(),
        claims_stored,
        aggregator_contention: state.pipeline.aggregator_contention(),
    }))
}

// ============================================================
// Claims
// ============================================================

pub async fn predict(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<Value>,
) -> ApiResult<PredictResponse> {
    let submission = state.pipeline.submit(&payload).await.map_err(submit_error)?;
    Ok(Json(PredictResponse {
        claim_id: submission.claim_id,
        received_at: submission.received_at,
        prediction: PredictionBody::from(&submission.prediction),
    }))
}

pub async fn claim_detail(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<ClaimResponse> {
    let id: ClaimId = id
        .parse()
        .map_err(|e| api_error(StatusCode::BAD_REQUEST, format!("Invalid claim id: {}", e)))?;
    state
        .pipeline
        .get_claim(id)
        .await
        .map(|stored| Json(ClaimResponse::from(stored)))
        .map_err(store_error)
}

// ============================================================
// Analytics
// ============================================================

pub async fn analytics(State(state): State<Arc<AppState>>) -> Json<AnalyticsSnapshot> {
    Json(state.pipeline.analytics().await)
}
