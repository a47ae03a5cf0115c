//! HTTP handlers, one module per resource
//!
//! Handlers parse and validate the request, call [`LifecycleService`], and
//! wrap the result in the response envelope. No business rules live here.
//!
//! [`LifecycleService`]: crate::lifecycle::LifecycleService

pub mod customers;
pub mod dispatch;
pub mod drivers;
pub mod health;
pub mod orders;
pub mod pod;
pub mod tracking;
pub mod vehicles;

pub use customers::{
    create_customer, customer_statistics, delete_customer, get_customer, list_customers,
    update_customer, update_customer_status,
};
pub use dispatch::{create_dispatch, get_dispatch, list_dispatches, update_dispatch_status};
pub use drivers::{create_driver, delete_driver, get_driver, list_drivers, update_driver};
pub use health::{HealthResponse, health_check};
pub use orders::{
    create_order, delete_order, get_order, list_orders, order_statistics, update_order_status,
};
pub use pod::{get_pod, review_pod, upload_pod};
pub use tracking::{get_shipment_tracking, ingest_tracking};
pub use vehicles::{
    available_vehicles, create_vehicle, get_vehicle, list_vehicles, retire_vehicle,
    update_vehicle,
};

use axum::http::HeaderMap;

use crate::core_types::EntityId;

use super::types::ApiError;

/// Header naming the operator behind a request
pub const ACTOR_HEADER: &str = "x-user-id";

/// Operator id for audit fields, if the caller sent one
pub(crate) fn actor(headers: &HeaderMap) -> Option<String> {
    headers
        .get(ACTOR_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

pub(crate) fn parse_id(raw: &str) -> Result<EntityId, ApiError> {
    raw.parse()
        .map_err(|_| ApiError::bad_request(format!("Invalid id: {raw}")))
}
