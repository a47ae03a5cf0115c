//! Order handlers

use axum::{
    extract::{Path, Query, State},
    http::HeaderMap,
};

use crate::lifecycle::{OrderDetail, OrderTransitionOutcome};
use crate::models::Order;
use crate::reports::OrderStatistics;

use super::super::state::AppState;
use super::super::types::{
    ApiResult, CreateOrderRequest, OrderListQuery, StatisticsQuery, UpdateOrderStatusRequest,
    ValidatedJson, created, ok,
};
use super::{actor, parse_id};

/// Create an order
///
/// The order starts PENDING with its price computed from distance, cargo and
/// priority.
#[utoipa::path(
    post,
    path = "/api/v1/orders",
    request_body(content = String, description = "customer_id, cargo{name, weight, volume}, origin_address, destination_address, priority?, distance_km?, expected_time?, notes?", content_type = "application/json"),
    responses(
        (status = 201, description = "Order created", content_type = "application/json"),
        (status = 400, description = "Invalid parameters")
    ),
    tag = "Orders"
)]
pub async fn create_order(
    State(state): State<AppState>,
    headers: HeaderMap,
    ValidatedJson(req): ValidatedJson<CreateOrderRequest>,
) -> ApiResult<Order> {
    let draft = req.into_draft()?;
    let order = state.service.create_order(draft, actor(&headers)).await?;
    created(order)
}

/// List orders, newest first
#[utoipa::path(
    get,
    path = "/api/v1/orders",
    params(
        ("status" = Option<String>, Query, description = "Filter by status"),
        ("customer_id" = Option<String>, Query, description = "Filter by customer"),
        ("limit" = Option<u32>, Query, description = "Page size (1-200, default 50)"),
        ("offset" = Option<u32>, Query, description = "Rows to skip")
    ),
    responses(
        (status = 200, description = "Orders", content_type = "application/json"),
        (status = 400, description = "Unknown status")
    ),
    tag = "Orders"
)]
pub async fn list_orders(
    State(state): State<AppState>,
    Query(query): Query<OrderListQuery>,
) -> ApiResult<Vec<Order>> {
    let filter = query.into_filter()?;
    ok(state.service.list_orders(&filter).await?)
}

/// Order totals over a creation-time window
#[utoipa::path(
    get,
    path = "/api/v1/orders/statistics",
    params(
        ("start_date" = Option<String>, Query, description = "RFC 3339, inclusive"),
        ("end_date" = Option<String>, Query, description = "RFC 3339, inclusive")
    ),
    responses(
        (status = 200, description = "Order statistics", content_type = "application/json"),
        (status = 400, description = "start_date after end_date")
    ),
    tag = "Orders"
)]
pub async fn order_statistics(
    State(state): State<AppState>,
    Query(query): Query<StatisticsQuery>,
) -> ApiResult<OrderStatistics> {
    ok(state
        .service
        .order_statistics(query.start_date, query.end_date)
        .await?)
}

/// Get an order with the statuses it may move to
#[utoipa::path(
    get,
    path = "/api/v1/orders/{id}",
    params(("id" = String, Path, description = "Order id (ULID)")),
    responses(
        (status = 200, description = "Order detail", content_type = "application/json"),
        (status = 404, description = "Order not found")
    ),
    tag = "Orders"
)]
pub async fn get_order(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<OrderDetail> {
    let id = parse_id(&id)?;
    ok(state.service.get_order(id).await?)
}

/// Change order status
///
/// CONFIRMED -> IN_TRANSIT needs `vehicle_id`; it creates a shipment and
/// occupies the vehicle in the same transaction.
#[utoipa::path(
    put,
    path = "/api/v1/orders/{id}/status",
    params(("id" = String, Path, description = "Order id (ULID)")),
    request_body(content = String, description = "status, vehicle_id?, driver_id?", content_type = "application/json"),
    responses(
        (status = 200, description = "Status changed (or already in that status)", content_type = "application/json"),
        (status = 400, description = "Transition not allowed"),
        (status = 404, description = "Order, vehicle or driver not found"),
        (status = 409, description = "Concurrent update")
    ),
    tag = "Orders"
)]
pub async fn update_order_status(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
    ValidatedJson(req): ValidatedJson<UpdateOrderStatusRequest>,
) -> ApiResult<OrderTransitionOutcome> {
    let id = parse_id(&id)?;
    let cmd = req.into_command()?;
    let outcome = state
        .service
        .change_order_status(id, cmd, actor(&headers))
        .await?;
    ok(outcome)
}

/// Delete a PENDING order
#[utoipa::path(
    delete,
    path = "/api/v1/orders/{id}",
    params(("id" = String, Path, description = "Order id (ULID)")),
    responses(
        (status = 200, description = "Order deleted", content_type = "application/json"),
        (status = 400, description = "Order is past PENDING"),
        (status = 404, description = "Order not found")
    ),
    tag = "Orders"
)]
pub async fn delete_order(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<serde_json::Value> {
    let id = parse_id(&id)?;
    state.service.delete_order(id).await?;
    ok(serde_json::json!({ "id": id }))
}
