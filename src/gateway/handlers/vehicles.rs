//! Vehicle handlers

use axum::extract::{Path, Query, State};

use crate::models::Vehicle;

use super::super::state::AppState;
use super::super::types::{
    ApiResult, CreateVehicleRequest, UpdateVehicleRequest, ValidatedJson, VehicleListQuery,
    created, ok,
};
use super::parse_id;

/// Register a vehicle
#[utoipa::path(
    post,
    path = "/api/v1/vehicles",
    request_body(content = String, description = "license_plate, vehicle_type (TRUCK|VAN|TRAILER), max_load, max_volume, driver_id?", content_type = "application/json"),
    responses(
        (status = 201, description = "Vehicle registered", content_type = "application/json"),
        (status = 400, description = "Invalid parameters"),
        (status = 409, description = "License plate already registered")
    ),
    tag = "Fleet"
)]
pub async fn create_vehicle(
    State(state): State<AppState>,
    ValidatedJson(req): ValidatedJson<CreateVehicleRequest>,
) -> ApiResult<Vehicle> {
    created(state.service.register_vehicle(req.into()).await?)
}

/// List vehicles by licence plate
#[utoipa::path(
    get,
    path = "/api/v1/vehicles",
    params(
        ("status" = Option<String>, Query, description = "Filter by status"),
        ("vehicle_type" = Option<String>, Query, description = "TRUCK, VAN or TRAILER"),
        ("limit" = Option<u32>, Query, description = "Page size (1-200, default 50)"),
        ("offset" = Option<u32>, Query, description = "Rows to skip")
    ),
    responses(
        (status = 200, description = "Vehicles", content_type = "application/json"),
        (status = 400, description = "Unknown status or type")
    ),
    tag = "Fleet"
)]
pub async fn list_vehicles(
    State(state): State<AppState>,
    Query(query): Query<VehicleListQuery>,
) -> ApiResult<Vec<Vehicle>> {
    let filter = query.into_filter()?;
    ok(state.service.list_vehicles(&filter).await?)
}

/// Active vehicles in AVAILABLE status
#[utoipa::path(
    get,
    path = "/api/v1/vehicles/available",
    responses((status = 200, description = "Available vehicles", content_type = "application/json")),
    tag = "Fleet"
)]
pub async fn available_vehicles(State(state): State<AppState>) -> ApiResult<Vec<Vehicle>> {
    ok(state.service.available_vehicles().await?)
}

#[utoipa::path(
    get,
    path = "/api/v1/vehicles/{id}",
    params(("id" = String, Path, description = "Vehicle id (ULID)")),
    responses(
        (status = 200, description = "Vehicle", content_type = "application/json"),
        (status = 404, description = "Vehicle not found")
    ),
    tag = "Fleet"
)]
pub async fn get_vehicle(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Vehicle> {
    ok(state.service.get_vehicle(parse_id(&id)?).await?)
}

/// Edit a vehicle
///
/// Status may only be set to AVAILABLE or MAINTENANCE, and only while no
/// shipment is open on the vehicle. `driver_id: null` unassigns the driver.
#[utoipa::path(
    put,
    path = "/api/v1/vehicles/{id}",
    params(("id" = String, Path, description = "Vehicle id (ULID)")),
    request_body(content = String, description = "license_plate?, vehicle_type?, max_load?, max_volume?, status?, driver_id?", content_type = "application/json"),
    responses(
        (status = 200, description = "Vehicle updated", content_type = "application/json"),
        (status = 400, description = "Invalid parameters or status"),
        (status = 404, description = "Vehicle or driver not found"),
        (status = 409, description = "Plate taken or vehicle has open shipments")
    ),
    tag = "Fleet"
)]
pub async fn update_vehicle(
    State(state): State<AppState>,
    Path(id): Path<String>,
    ValidatedJson(req): ValidatedJson<UpdateVehicleRequest>,
) -> ApiResult<Vehicle> {
    let id = parse_id(&id)?;
    let patch = req.into_patch()?;
    ok(state.service.update_vehicle(id, patch).await?)
}

/// Soft delete: the vehicle goes INACTIVE and leaves the available pool
#[utoipa::path(
    delete,
    path = "/api/v1/vehicles/{id}",
    params(("id" = String, Path, description = "Vehicle id (ULID)")),
    responses(
        (status = 200, description = "Vehicle retired", content_type = "application/json"),
        (status = 404, description = "Vehicle not found")
    ),
    tag = "Fleet"
)]
pub async fn retire_vehicle(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Vehicle> {
    ok(state.service.retire_vehicle(parse_id(&id)?).await?)
}
