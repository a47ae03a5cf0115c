//! Health check handler

use axum::{Json, extract::State, http::StatusCode};
use serde::Serialize;
use utoipa::ToSchema;

use super::super::state::AppState;
use super::super::types::{ApiResponse, error_codes};

/// Health check response data
#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    #[schema(example = "ok")]
    pub status: String,
    /// Backing store in use
    #[schema(example = "postgres")]
    pub store: String,
    #[schema(example = 3600_u64)]
    pub uptime_secs: u64,
    #[schema(example = "0.1.0")]
    pub version: String,
    /// Short git hash of the build
    pub build: String,
}

/// Health check endpoint
///
/// - Healthy: 200 + `{success: true, data: {...}}`
/// - Store unreachable: 503 + `{success: false, error: "SERVICE_UNAVAILABLE"}`
#[utoipa::path(
    get,
    path = "/api/v1/health",
    responses(
        (status = 200, description = "Service healthy", body = HealthResponse, content_type = "application/json"),
        (status = 503, description = "Store unavailable")
    ),
    tag = "System"
)]
pub async fn health_check(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<HealthResponse>>, (StatusCode, Json<ApiResponse<()>>)> {
    let store = state.store();
    if let Err(e) = store.health_check().await {
        tracing::error!(store = store.name(), error = %e, "[HEALTH] store ping failed");
        return Err((
            StatusCode::SERVICE_UNAVAILABLE,
            Json(ApiResponse::error(
                error_codes::SERVICE_UNAVAILABLE,
                "unavailable",
            )),
        ));
    }

    Ok(Json(ApiResponse::success(HealthResponse {
        status: "ok".to_string(),
        store: store.name().to_string(),
        uptime_secs: state.started_at.elapsed().as_secs(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        build: env!("GIT_HASH").to_string(),
    })))
}
