//! Proof-of-delivery handlers

use axum::{
    extract::{Path, State},
    http::HeaderMap,
};

use crate::models::Pod;
use crate::pod::PodReview;

use super::super::state::AppState;
use super::super::types::{ApiResult, JsonBody, UploadPodRequest, ValidatedJson, created, ok};
use super::{actor, parse_id};

/// Upload a POD for an IN_TRANSIT or DELIVERED order
///
/// The file travels base64-encoded in `content`. An IN_TRANSIT order moves
/// to DELIVERED.
#[utoipa::path(
    post,
    path = "/api/v1/pods",
    request_body(content = String, description = "order_id, file_name, mime_type, content (base64, max 10 MiB decoded), receiver_name?, receiver_signature?, delivery_photo?, delivery_time?, notes?", content_type = "application/json"),
    responses(
        (status = 201, description = "POD stored", content_type = "application/json"),
        (status = 400, description = "Invalid file or order not deliverable"),
        (status = 404, description = "Order not found")
    ),
    tag = "POD"
)]
pub async fn upload_pod(
    State(state): State<AppState>,
    headers: HeaderMap,
    ValidatedJson(req): ValidatedJson<UploadPodRequest>,
) -> ApiResult<Pod> {
    let upload = req.into_upload()?;
    created(state.service.upload_pod(upload, actor(&headers)).await?)
}

#[utoipa::path(
    get,
    path = "/api/v1/pods/{id}",
    params(("id" = String, Path, description = "POD id (ULID)")),
    responses(
        (status = 200, description = "POD", content_type = "application/json"),
        (status = 404, description = "POD not found")
    ),
    tag = "POD"
)]
pub async fn get_pod(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<Pod> {
    ok(state.service.get_pod(parse_id(&id)?).await?)
}

/// Verify or reject an uploaded POD
///
/// Verification checks receiver, signature, photo and age; any failure
/// rejects the POD with the reasons recorded.
#[utoipa::path(
    post,
    path = "/api/v1/pods/{id}/review",
    params(("id" = String, Path, description = "POD id (ULID)")),
    request_body(content = String, description = r#"{"action":"VERIFY","verified_by":"...","signature_waived":false,"photo_waived":false} or {"action":"REJECT","rejected_by":"...","reason":"..."}"#, content_type = "application/json"),
    responses(
        (status = 200, description = "POD reviewed", content_type = "application/json"),
        (status = 400, description = "POD already reviewed or reviewer missing"),
        (status = 404, description = "POD not found")
    ),
    tag = "POD"
)]
pub async fn review_pod(
    State(state): State<AppState>,
    Path(id): Path<String>,
    JsonBody(review): JsonBody<PodReview>,
) -> ApiResult<Pod> {
    ok(state.service.review_pod(parse_id(&id)?, review).await?)
}
