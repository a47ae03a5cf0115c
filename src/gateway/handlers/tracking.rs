//! GPS tracking handlers

use axum::extract::{Path, State};

use crate::lifecycle::{IngestReport, TrackingSummary};

use super::super::state::AppState;
use super::super::types::{ApiResult, JsonBody, TrackingBatchRequest, ok};
use super::parse_id;

/// Ingest a batch of GPS points for an IN_TRANSIT shipment
#[utoipa::path(
    post,
    path = "/api/v1/tracking/batch",
    request_body(content = String, description = "shipment_id, points[{latitude, longitude, speed?, heading?, altitude?, battery_level?, timestamp?}] (max 1000)", content_type = "application/json"),
    responses(
        (status = 200, description = "Points stored; statistics and alerts returned", content_type = "application/json"),
        (status = 400, description = "Empty or oversized batch, or shipment not in transit"),
        (status = 404, description = "Shipment not found")
    ),
    tag = "Tracking"
)]
pub async fn ingest_tracking(
    State(state): State<AppState>,
    JsonBody(req): JsonBody<TrackingBatchRequest>,
) -> ApiResult<IngestReport> {
    ok(state
        .service
        .ingest_tracking(req.shipment_id, &req.points)
        .await?)
}

/// Latest position and route statistics for a shipment
#[utoipa::path(
    get,
    path = "/api/v1/tracking/shipments/{id}",
    params(("id" = String, Path, description = "Shipment id (ULID)")),
    responses(
        (status = 200, description = "Tracking summary", content_type = "application/json"),
        (status = 404, description = "Shipment not found")
    ),
    tag = "Tracking"
)]
pub async fn get_shipment_tracking(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<TrackingSummary> {
    ok(state.service.shipment_tracking(parse_id(&id)?).await?)
}
