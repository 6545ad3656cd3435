use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde_json::json;
use service_core::error::AppError;

use crate::startup::AppState;

/// Liveness probe.
pub async fn health_check() -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(json!({
            "status": "ok",
            "service": "botanist-service",
            "version": env!("CARGO_PKG_VERSION")
        })),
    )
}

/// Readiness probe: both upstream providers must be reachable.
pub async fn readiness_check(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    state.guide.health_check().await.map_err(|e| {
        tracing::warn!(error = %e, "Readiness check failed");
        AppError::ServiceUnavailable(e.to_string())
    })?;

    Ok((StatusCode::OK, Json(json!({ "status": "ready" }))))
}
