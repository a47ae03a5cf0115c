//! Customer handlers

use axum::{
    extract::{Path, Query, State},
    http::HeaderMap,
};

use crate::lifecycle::CustomerDetail;
use crate::models::Customer;
use crate::reports::CustomerStatistics;

use super::super::state::AppState;
use super::super::types::{
    ApiResult, CreateCustomerRequest, CustomerListQuery, CustomerStatusRequest,
    UpdateCustomerRequest, ValidatedJson, created, ok,
};
use super::{actor, parse_id};

/// Register a customer
///
/// Companies need `company_name`; individuals need `first_name` and
/// `last_name`. Email is unique regardless of case.
#[utoipa::path(
    post,
    path = "/api/v1/customers",
    request_body(content = String, description = "customer_type (COMPANY|INDIVIDUAL), company_name?, first_name?, last_name?, email, phone, address, city, province, postal_code?, credit_rating? (0-100), credit_limit?, notes?", content_type = "application/json"),
    responses(
        (status = 201, description = "Customer registered", content_type = "application/json"),
        (status = 400, description = "Invalid parameters"),
        (status = 409, description = "Email already registered")
    ),
    tag = "Customers"
)]
pub async fn create_customer(
    State(state): State<AppState>,
    headers: HeaderMap,
    ValidatedJson(req): ValidatedJson<CreateCustomerRequest>,
) -> ApiResult<Customer> {
    let draft = req.into_draft()?;
    created(state.service.create_customer(draft, actor(&headers)).await?)
}

/// List customers, newest first
#[utoipa::path(
    get,
    path = "/api/v1/customers",
    params(
        ("customer_type" = Option<String>, Query, description = "COMPANY or INDIVIDUAL"),
        ("status" = Option<String>, Query, description = "Filter by status"),
        ("search" = Option<String>, Query, description = "Matches number, names, email or phone"),
        ("limit" = Option<u32>, Query, description = "Page size (1-200, default 50)"),
        ("offset" = Option<u32>, Query, description = "Rows to skip")
    ),
    responses(
        (status = 200, description = "Customers", content_type = "application/json"),
        (status = 400, description = "Unknown status or type")
    ),
    tag = "Customers"
)]
pub async fn list_customers(
    State(state): State<AppState>,
    Query(query): Query<CustomerListQuery>,
) -> ApiResult<Vec<Customer>> {
    let filter = query.into_filter()?;
    ok(state.service.list_customers(&filter).await?)
}

#[utoipa::path(
    get,
    path = "/api/v1/customers/stats",
    responses((status = 200, description = "Customer statistics", content_type = "application/json")),
    tag = "Customers"
)]
pub async fn customer_statistics(State(state): State<AppState>) -> ApiResult<CustomerStatistics> {
    ok(state.service.customer_statistics().await?)
}

/// Customer with order totals and the statuses it may move to
#[utoipa::path(
    get,
    path = "/api/v1/customers/{id}",
    params(("id" = String, Path, description = "Customer id (ULID)")),
    responses(
        (status = 200, description = "Customer detail", content_type = "application/json"),
        (status = 404, description = "Customer not found")
    ),
    tag = "Customers"
)]
pub async fn get_customer(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<CustomerDetail> {
    ok(state.service.get_customer(parse_id(&id)?).await?)
}

#[utoipa::path(
    put,
    path = "/api/v1/customers/{id}",
    params(("id" = String, Path, description = "Customer id (ULID)")),
    request_body(content = String, description = "Any registration field except customer_type", content_type = "application/json"),
    responses(
        (status = 200, description = "Customer updated", content_type = "application/json"),
        (status = 400, description = "Invalid parameters"),
        (status = 404, description = "Customer not found"),
        (status = 409, description = "Email already registered")
    ),
    tag = "Customers"
)]
pub async fn update_customer(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
    ValidatedJson(req): ValidatedJson<UpdateCustomerRequest>,
) -> ApiResult<Customer> {
    let id = parse_id(&id)?;
    let patch = req.into_patch()?;
    ok(state
        .service
        .update_customer(id, patch, actor(&headers))
        .await?)
}

/// Change customer status
///
/// A non-blank `reason` is appended to the customer's notes with a timestamp.
#[utoipa::path(
    put,
    path = "/api/v1/customers/{id}/status",
    params(("id" = String, Path, description = "Customer id (ULID)")),
    request_body(content = String, description = "status, reason?", content_type = "application/json"),
    responses(
        (status = 200, description = "Status changed (or already in that status)", content_type = "application/json"),
        (status = 400, description = "Transition not allowed"),
        (status = 404, description = "Customer not found"),
        (status = 409, description = "Concurrent update")
    ),
    tag = "Customers"
)]
pub async fn update_customer_status(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
    ValidatedJson(req): ValidatedJson<CustomerStatusRequest>,
) -> ApiResult<Customer> {
    let id = parse_id(&id)?;
    let status = req.parse_status()?;
    ok(state
        .service
        .change_customer_status(id, status, req.reason.as_deref(), actor(&headers))
        .await?)
}

/// Delete a customer that has never placed an order
#[utoipa::path(
    delete,
    path = "/api/v1/customers/{id}",
    params(("id" = String, Path, description = "Customer id (ULID)")),
    responses(
        (status = 200, description = "Customer deleted", content_type = "application/json"),
        (status = 404, description = "Customer not found"),
        (status = 409, description = "Customer has orders")
    ),
    tag = "Customers"
)]
pub async fn delete_customer(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<serde_json::Value> {
    let id = parse_id(&id)?;
    state.service.delete_customer(id).await?;
    ok(serde_json::json!({ "id": id }))
}
