//! Driver handlers

use axum::extract::{Path, Query, State};

use crate::models::Driver;

use super::super::state::AppState;
use super::super::types::{
    ApiResult, CreateDriverRequest, DriverListQuery, UpdateDriverRequest, ValidatedJson,
    created, ok,
};
use super::parse_id;

#[utoipa::path(
    post,
    path = "/api/v1/drivers",
    request_body(content = String, description = "name, phone, license_number", content_type = "application/json"),
    responses(
        (status = 201, description = "Driver registered", content_type = "application/json"),
        (status = 400, description = "Invalid parameters")
    ),
    tag = "Fleet"
)]
pub async fn create_driver(
    State(state): State<AppState>,
    ValidatedJson(req): ValidatedJson<CreateDriverRequest>,
) -> ApiResult<Driver> {
    created(state.service.register_driver(req.into()).await?)
}

#[utoipa::path(
    get,
    path = "/api/v1/drivers",
    params(
        ("status" = Option<String>, Query, description = "Filter by status"),
        ("limit" = Option<u32>, Query, description = "Page size (1-200, default 50)"),
        ("offset" = Option<u32>, Query, description = "Rows to skip")
    ),
    responses(
        (status = 200, description = "Drivers by name", content_type = "application/json"),
        (status = 400, description = "Unknown status")
    ),
    tag = "Fleet"
)]
pub async fn list_drivers(
    State(state): State<AppState>,
    Query(query): Query<DriverListQuery>,
) -> ApiResult<Vec<Driver>> {
    let filter = query.into_filter()?;
    ok(state.service.list_drivers(&filter).await?)
}

#[utoipa::path(
    get,
    path = "/api/v1/drivers/{id}",
    params(("id" = String, Path, description = "Driver id (ULID)")),
    responses(
        (status = 200, description = "Driver", content_type = "application/json"),
        (status = 404, description = "Driver not found")
    ),
    tag = "Fleet"
)]
pub async fn get_driver(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Driver> {
    ok(state.service.get_driver(parse_id(&id)?).await?)
}

/// Edit a driver. ON_DUTY is reserved for dispatches.
#[utoipa::path(
    put,
    path = "/api/v1/drivers/{id}",
    params(("id" = String, Path, description = "Driver id (ULID)")),
    request_body(content = String, description = "name?, phone?, license_number?, status?", content_type = "application/json"),
    responses(
        (status = 200, description = "Driver updated", content_type = "application/json"),
        (status = 400, description = "Invalid parameters or status"),
        (status = 404, description = "Driver not found")
    ),
    tag = "Fleet"
)]
pub async fn update_driver(
    State(state): State<AppState>,
    Path(id): Path<String>,
    ValidatedJson(req): ValidatedJson<UpdateDriverRequest>,
) -> ApiResult<Driver> {
    let id = parse_id(&id)?;
    let patch = req.into_patch()?;
    ok(state.service.update_driver(id, patch).await?)
}

/// Delete a driver that is not ON_DUTY and has no open shipment
#[utoipa::path(
    delete,
    path = "/api/v1/drivers/{id}",
    params(("id" = String, Path, description = "Driver id (ULID)")),
    responses(
        (status = 200, description = "Driver deleted", content_type = "application/json"),
        (status = 404, description = "Driver not found"),
        (status = 409, description = "Driver is on duty or has a scheduled or in-transit shipment")
    ),
    tag = "Fleet"
)]
pub async fn delete_driver(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<serde_json::Value> {
    let id = parse_id(&id)?;
    state.service.delete_driver(id).await?;
    ok(serde_json::json!({ "id": id }))
}
