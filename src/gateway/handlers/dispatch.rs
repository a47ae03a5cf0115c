//! Dispatch handlers

use axum::{
    extract::{Path, Query, State},
    http::HeaderMap,
};

use crate::lifecycle::DispatchDetail;
use crate::models::Dispatch;

use super::super::state::AppState;
use super::super::types::{
    ApiResult, CreateDispatchRequest, DispatchListQuery, UpdateDispatchStatusRequest,
    ValidatedJson, created, ok,
};
use super::{actor, parse_id};

/// Schedule a dispatch for CONFIRMED orders
///
/// One shipment per order, in request order. Vehicle and driver are
/// reserved immediately; orders move to IN_TRANSIT on departure.
#[utoipa::path(
    post,
    path = "/api/v1/dispatches",
    request_body(content = String, description = "order_ids[], vehicle_id, driver_id, planned_departure?, estimated_duration? (hours), estimated_distance? (km)", content_type = "application/json"),
    responses(
        (status = 201, description = "Dispatch scheduled", content_type = "application/json"),
        (status = 400, description = "Order not dispatchable, resource unavailable or capacity exceeded"),
        (status = 404, description = "Order, vehicle or driver not found"),
        (status = 409, description = "Concurrent update")
    ),
    tag = "Dispatch"
)]
pub async fn create_dispatch(
    State(state): State<AppState>,
    ValidatedJson(req): ValidatedJson<CreateDispatchRequest>,
) -> ApiResult<DispatchDetail> {
    let draft = req.into_draft()?;
    created(state.service.create_dispatch(draft).await?)
}

/// List dispatches, newest first
#[utoipa::path(
    get,
    path = "/api/v1/dispatches",
    params(
        ("status" = Option<String>, Query, description = "Filter by status"),
        ("vehicle_id" = Option<String>, Query, description = "Filter by vehicle"),
        ("driver_id" = Option<String>, Query, description = "Filter by driver"),
        ("limit" = Option<u32>, Query, description = "Page size (1-200, default 50)"),
        ("offset" = Option<u32>, Query, description = "Rows to skip")
    ),
    responses(
        (status = 200, description = "Dispatches", content_type = "application/json"),
        (status = 400, description = "Unknown status or malformed id")
    ),
    tag = "Dispatch"
)]
pub async fn list_dispatches(
    State(state): State<AppState>,
    Query(query): Query<DispatchListQuery>,
) -> ApiResult<Vec<Dispatch>> {
    let filter = query.into_filter()?;
    ok(state.service.list_dispatches(&filter).await?)
}

#[utoipa::path(
    get,
    path = "/api/v1/dispatches/{id}",
    params(("id" = String, Path, description = "Dispatch id (ULID)")),
    responses(
        (status = 200, description = "Dispatch with its shipments", content_type = "application/json"),
        (status = 404, description = "Dispatch not found")
    ),
    tag = "Dispatch"
)]
pub async fn get_dispatch(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<DispatchDetail> {
    ok(state.service.get_dispatch(parse_id(&id)?).await?)
}

/// Change dispatch status
///
/// CANCELLED requires a non-blank `reason`. ARRIVED accepts actual
/// distance and duration.
#[utoipa::path(
    put,
    path = "/api/v1/dispatches/{id}/status",
    params(("id" = String, Path, description = "Dispatch id (ULID)")),
    request_body(content = String, description = "status, reason?, actual_distance?, actual_duration?", content_type = "application/json"),
    responses(
        (status = 200, description = "Status changed (or already in that status)", content_type = "application/json"),
        (status = 400, description = "Transition not allowed or reason missing"),
        (status = 404, description = "Dispatch not found"),
        (status = 409, description = "Concurrent update")
    ),
    tag = "Dispatch"
)]
pub async fn update_dispatch_status(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
    ValidatedJson(req): ValidatedJson<UpdateDispatchStatusRequest>,
) -> ApiResult<DispatchDetail> {
    let id = parse_id(&id)?;
    let cmd = req.into_command()?;
    ok(state
        .service
        .change_dispatch_status(id, cmd, actor(&headers))
        .await?)
}
