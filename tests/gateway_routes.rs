//! In-process tests for the HTTP gateway.
//!
//! The router is built over the in-memory store and driven with
//! `tower::ServiceExt::oneshot`; no socket is bound.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use axum::body::Body;
use axum::http::{Request, StatusCode};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use http_body_util::BodyExt;
use serde_json::{Value, json};
use tms_core::gateway::{AppState, build_router};
use tms_core::lifecycle::LifecycleService;
use tms_core::pod::PodFileStore;
use tms_core::store::MemoryStore;
use tower::ServiceExt; // oneshot

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

struct Gateway {
    router: axum::Router,
    _uploads: tempfile::TempDir,
}

fn gateway() -> Gateway {
    let uploads = tempfile::tempdir().unwrap();
    let service = LifecycleService::new(
        Arc::new(MemoryStore::new()),
        PodFileStore::new(uploads.path(), "/api/tms/pod/files"),
    );
    Gateway {
        router: build_router(AppState::new(service)),
        _uploads: uploads,
    }
}

impl Gateway {
    async fn call(&self, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        self.call_as(method, uri, body, None).await
    }

    async fn call_as(
        &self,
        method: &str,
        uri: &str,
        body: Option<Value>,
        actor: Option<&str>,
    ) -> (StatusCode, Value) {
        let mut req = Request::builder().method(method).uri(uri);
        if let Some(actor) = actor {
            req = req.header("X-User-ID", actor);
        }
        let req = match body {
            Some(body) => req
                .header("content-type", "application/json")
                .body(Body::from(body.to_string())),
            None => req.body(Body::empty()),
        }
        .unwrap();
        self.send(req).await
    }

    async fn send(&self, req: Request<Body>) -> (StatusCode, Value) {
        let resp = self.router.clone().oneshot(req).await.expect("oneshot failed");
        let status = resp.status();
        let bytes = resp.into_body().collect().await.unwrap().to_bytes();
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).expect("body is not valid JSON")
        };
        (status, json)
    }

    /// Register a company customer with a unique email; returns its id
    async fn customer(&self) -> String {
        static SEQ: AtomicUsize = AtomicUsize::new(0);
        let n = SEQ.fetch_add(1, Ordering::Relaxed);
        let (status, body) = self
            .call(
                "POST",
                "/api/v1/customers",
                Some(json!({
                    "customer_type": "COMPANY",
                    "company_name": format!("Shipper {n}"),
                    "email": format!("ops{n}@shipper.example"),
                    "phone": "555-0100",
                    "address": "9 Quay St",
                    "city": "Ningbo",
                    "province": "Zhejiang",
                    "credit_rating": 80
                })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "{body}");
        body["data"]["id"].as_str().unwrap().to_string()
    }

    /// Create an order and move it to CONFIRMED; returns its id
    async fn confirmed_order(&self, weight: &str) -> String {
        let customer = self.customer().await;
        let (status, body) = self
            .call(
                "POST",
                "/api/v1/orders",
                Some(json!({
                    "customer_id": customer,
                    "cargo": {"name": "crates", "weight": weight, "volume": "2"},
                    "origin_address": "Dock 4",
                    "destination_address": "Mall West",
                    "distance_km": "10"
                })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "{body}");
        let id = body["data"]["id"].as_str().unwrap().to_string();
        let (status, _) = self
            .call(
                "PUT",
                &format!("/api/v1/orders/{id}/status"),
                Some(json!({"status": "CONFIRMED"})),
            )
            .await;
        assert_eq!(status, StatusCode::OK);
        id
    }

    async fn vehicle(&self, plate: &str) -> String {
        let (status, body) = self
            .call(
                "POST",
                "/api/v1/vehicles",
                Some(json!({
                    "license_plate": plate,
                    "vehicle_type": "TRUCK",
                    "max_load": "8000",
                    "max_volume": "40"
                })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "{body}");
        body["data"]["id"].as_str().unwrap().to_string()
    }

    async fn driver(&self) -> String {
        let (status, body) = self
            .call(
                "POST",
                "/api/v1/drivers",
                Some(json!({"name": "Kim", "phone": "555-0142", "license_number": "B-991"})),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "{body}");
        body["data"]["id"].as_str().unwrap().to_string()
    }

    async fn dispatch(&self, orders: &[&str], vehicle: &str, driver: &str) -> Value {
        let (status, body) = self
            .call(
                "POST",
                "/api/v1/dispatches",
                Some(json!({
                    "order_ids": orders,
                    "vehicle_id": vehicle,
                    "driver_id": driver,
                    "estimated_duration": "5"
                })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "{body}");
        body["data"].clone()
    }
}

// ---------------------------------------------------------------------------
// System
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_health_reports_store() {
    let gw = gateway();
    let (status, body) = gw.call("GET", "/api/v1/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["status"], "ok");
    assert_eq!(body["data"]["store"], "memory");
}

#[tokio::test]
async fn test_openapi_document_served() {
    let gw = gateway();
    let (status, body) = gw.call("GET", "/api-docs/openapi.json", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["info"]["title"], "TMS Core API");
    assert!(body["paths"]["/api/v1/dispatches/{id}/status"].is_object());
}

// ---------------------------------------------------------------------------
// Orders
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_create_and_fetch_order() {
    let gw = gateway();
    let customer = gw.customer().await;
    let (status, body) = gw
        .call_as(
            "POST",
            "/api/v1/orders",
            Some(json!({
                "customer_id": customer,
                "cargo": {"name": "paper", "weight": "100", "volume": "2"},
                "origin_address": "A",
                "destination_address": "B",
                "priority": "URGENT",
                "distance_km": "10"
            })),
            Some("clerk-9"),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    let order = &body["data"];
    assert_eq!(order["status"], "PENDING");
    assert_eq!(order["payment_status"], "PENDING");
    assert_eq!(order["updated_by"], "clerk-9");
    // (50 + 50 + 4) x 1.5
    assert_eq!(order["total_amount"], "156.00");
    assert!(order["order_number"].as_str().unwrap().starts_with("ORD"));

    let id = order["id"].as_str().unwrap();
    let (status, body) = gw.call("GET", &format!("/api/v1/orders/{id}"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["can_update"], json!(["CONFIRMED", "CANCELLED"]));

    let (status, body) = gw
        .call(
            "GET",
            &format!("/api/v1/orders?status=pending&customer_id={customer}"),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"].as_array().unwrap().len(), 1);

    let (status, _) = gw
        .call("GET", "/api/v1/orders?customer_id=CUST-1", None)
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_order_statistics_route() {
    let gw = gateway();
    gw.confirmed_order("100").await;
    gw.confirmed_order("100").await;

    let (status, body) = gw.call("GET", "/api/v1/orders/statistics", None).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["data"]["total_orders"], 2);
    assert_eq!(body["data"]["by_status"]["CONFIRMED"], 2);
    assert_eq!(body["data"]["completion_rate"], "0");

    let (status, body) = gw
        .call(
            "GET",
            "/api/v1/orders/statistics?start_date=2030-01-02T00:00:00Z&end_date=2030-01-01T00:00:00Z",
            None,
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
}

#[tokio::test]
async fn test_malformed_and_invalid_bodies_use_envelope() {
    let gw = gateway();
    let req = Request::builder()
        .method("POST")
        .uri("/api/v1/orders")
        .header("content-type", "application/json")
        .body(Body::from("{not json"))
        .unwrap();
    let (status, body) = gw.send(req).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
    assert_eq!(body["error"], "INVALID_PARAMETER");

    let (status, body) = gw
        .call(
            "POST",
            "/api/v1/orders",
            Some(json!({
                "customer_id": "01ARZ3NDEKTSV4RRFFQ69G5FAV",
                "cargo": {"name": "paper", "weight": "0", "volume": "2"},
                "origin_address": "A",
                "destination_address": "B"
            })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
}

#[tokio::test]
async fn test_unknown_and_malformed_ids() {
    let gw = gateway();
    let (status, body) = gw
        .call("GET", "/api/v1/orders/01ARZ3NDEKTSV4RRFFQ69G5FAV", None)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "NOT_FOUND");

    let (status, _) = gw.call("GET", "/api/v1/orders/nope", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_invalid_transition_and_delete_rules() {
    let gw = gateway();
    let id = gw.confirmed_order("100").await;

    let (status, body) = gw
        .call(
            "PUT",
            &format!("/api/v1/orders/{id}/status"),
            Some(json!({"status": "DELIVERED"})),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "INVALID_TRANSITION");

    let (status, body) = gw
        .call(
            "PUT",
            &format!("/api/v1/orders/{id}/status"),
            Some(json!({"status": "SHIPPED"})),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);

    let (status, body) = gw.call("DELETE", &format!("/api/v1/orders/{id}"), None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "ILLEGAL_DELETE");

    // Same status is accepted without changes
    let (status, body) = gw
        .call(
            "PUT",
            &format!("/api/v1/orders/{id}/status"),
            Some(json!({"status": "confirmed"})),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["changed"], false);
}

// ---------------------------------------------------------------------------
// Fleet
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_vehicle_retirement_and_duplicate_plate() {
    let gw = gateway();
    let id = gw.vehicle("GW-100").await;

    let (status, body) = gw
        .call(
            "POST",
            "/api/v1/vehicles",
            Some(json!({
                "license_plate": "GW-100",
                "vehicle_type": "VAN",
                "max_load": "800",
                "max_volume": "8"
            })),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "DUPLICATE");

    let (status, body) = gw.call("GET", "/api/v1/vehicles/available", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"].as_array().unwrap().len(), 1);

    let (status, body) = gw.call("DELETE", &format!("/api/v1/vehicles/{id}"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["status"], "INACTIVE");
    assert_eq!(body["data"]["is_active"], false);

    let (_, body) = gw.call("GET", "/api/v1/vehicles/available", None).await;
    assert!(body["data"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_vehicle_and_driver_edits() {
    let gw = gateway();
    let first = gw.vehicle("GW-110").await;
    gw.vehicle("GW-111").await;
    let driver = gw.driver().await;

    let (status, body) = gw
        .call(
            "PUT",
            &format!("/api/v1/vehicles/{first}"),
            Some(json!({"status": "MAINTENANCE", "driver_id": driver, "max_load": "9000"})),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["data"]["status"], "MAINTENANCE");
    assert_eq!(body["data"]["driver_id"], driver.as_str());
    assert_eq!(body["data"]["max_load"], "9000");

    let (status, body) = gw
        .call(
            "PUT",
            &format!("/api/v1/vehicles/{first}"),
            Some(json!({"license_plate": "GW-111"})),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "DUPLICATE");

    let (status, body) = gw
        .call(
            "PUT",
            &format!("/api/v1/vehicles/{first}"),
            Some(json!({"status": "IN_TRANSIT"})),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);

    let (status, body) = gw
        .call("GET", "/api/v1/vehicles?status=maintenance", None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"].as_array().unwrap().len(), 1);
    let (_, body) = gw.call("GET", "/api/v1/vehicles?vehicle_type=truck", None).await;
    assert_eq!(body["data"].as_array().unwrap().len(), 2);

    let (status, body) = gw
        .call(
            "PUT",
            &format!("/api/v1/drivers/{driver}"),
            Some(json!({"status": "OFF_DUTY", "phone": "555-0199"})),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["data"]["status"], "OFF_DUTY");
    assert_eq!(body["data"]["phone"], "555-0199");

    let (status, body) = gw.call("GET", "/api/v1/drivers?status=off_duty", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"].as_array().unwrap().len(), 1);
}

// ---------------------------------------------------------------------------
// Customers
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_customer_routes() {
    let gw = gateway();
    let id = gw.customer().await;

    let (status, body) = gw.call("GET", &format!("/api/v1/customers/{id}"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["customer"]["status"], "ACTIVE");
    assert_eq!(body["data"]["orders"]["total_orders"], 0);

    let (status, body) = gw
        .call(
            "POST",
            "/api/v1/customers",
            Some(json!({
                "customer_type": "INDIVIDUAL",
                "first_name": "Lee",
                "email": "lee@home.example",
                "phone": "555-0177",
                "address": "3 Elm Row",
                "city": "Hangzhou",
                "province": "Zhejiang"
            })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST, "{body}");

    let (status, body) = gw
        .call_as(
            "PUT",
            &format!("/api/v1/customers/{id}/status"),
            Some(json!({"status": "SUSPENDED", "reason": "overdue invoices"})),
            Some("credit-desk"),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["data"]["status"], "SUSPENDED");
    assert!(
        body["data"]["notes"]
            .as_str()
            .unwrap()
            .contains("overdue invoices")
    );

    // Suspended customers cannot place orders
    let (status, body) = gw
        .call(
            "POST",
            "/api/v1/orders",
            Some(json!({
                "customer_id": id,
                "cargo": {"name": "paper", "weight": "10", "volume": "1"},
                "origin_address": "A",
                "destination_address": "B"
            })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "CUSTOMER_NOT_ACTIVE");

    let (status, body) = gw
        .call(
            "GET",
            "/api/v1/customers?status=suspended&search=SHIPPER",
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"].as_array().unwrap().len(), 1);

    let (status, body) = gw.call("GET", "/api/v1/customers/stats", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["total_customers"], 1);
    assert_eq!(body["data"]["by_status"]["SUSPENDED"], 1);

    let (status, _) = gw.call("DELETE", &format!("/api/v1/customers/{id}"), None).await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = gw.call("GET", &format!("/api/v1/customers/{id}"), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_customer_with_orders_cannot_be_deleted() {
    let gw = gateway();
    let order = gw.confirmed_order("10").await;
    let (_, body) = gw.call("GET", &format!("/api/v1/orders/{order}"), None).await;
    let customer = body["data"]["order"]["customer_id"].as_str().unwrap().to_string();

    let (status, body) = gw
        .call("DELETE", &format!("/api/v1/customers/{customer}"), None)
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "CUSTOMER_HAS_ORDERS");
}

// ---------------------------------------------------------------------------
// Dispatch, POD and tracking
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_dispatch_pod_and_tracking_flow() {
    let gw = gateway();
    let order = gw.confirmed_order("250").await;
    let vehicle = gw.vehicle("GW-200").await;
    let driver = gw.driver().await;

    let detail = gw.dispatch(&[&order], &vehicle, &driver).await;
    assert_eq!(detail["dispatch"]["status"], "SCHEDULED");
    let dispatch_id = detail["dispatch"]["id"].as_str().unwrap().to_string();
    let shipment_id = detail["shipments"][0]["id"].as_str().unwrap().to_string();

    // Driver is on duty from the moment the dispatch is scheduled
    let (status, body) = gw.call("DELETE", &format!("/api/v1/drivers/{driver}"), None).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "ACTIVE_ASSIGNMENT_EXISTS");

    // The dispatch owns the order's status now
    let (status, body) = gw
        .call(
            "PUT",
            &format!("/api/v1/orders/{order}/status"),
            Some(json!({"status": "CANCELLED"})),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "ORDER_IN_DISPATCH");

    let (status, body) = gw
        .call("GET", &format!("/api/v1/dispatches?driver_id={driver}"), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"].as_array().unwrap().len(), 1);

    let (status, body) = gw
        .call(
            "PUT",
            &format!("/api/v1/dispatches/{dispatch_id}/status"),
            Some(json!({"status": "DEPARTED"})),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["data"]["shipments"][0]["status"], "IN_TRANSIT");

    let (status, body) = gw.call("DELETE", &format!("/api/v1/drivers/{driver}"), None).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "ACTIVE_ASSIGNMENT_EXISTS");

    let (status, body) = gw
        .call(
            "POST",
            "/api/v1/tracking/batch",
            Some(json!({
                "shipment_id": shipment_id,
                "points": [
                    {"latitude": 40.71, "longitude": -74.00, "speed": 55.0},
                    {"latitude": 95.0, "longitude": -74.01, "speed": 900.0, "battery_level": 12.0}
                ]
            })),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["data"]["accepted"], 2);
    // Clamped to 300 km/h, still speeding; plus low battery
    assert_eq!(body["data"]["statistics"]["max_speed"], 300.0);
    assert_eq!(body["data"]["alerts"].as_array().unwrap().len(), 2);

    let (status, body) = gw
        .call("GET", &format!("/api/v1/tracking/shipments/{shipment_id}"), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["statistics"]["total_points"], 2);
    assert_eq!(body["data"]["latest"]["latitude"], 90.0);

    let (status, body) = gw
        .call_as(
            "POST",
            "/api/v1/pods",
            Some(json!({
                "order_id": order,
                "file_name": "pod.png",
                "mime_type": "image/png",
                "content": STANDARD.encode(b"\x89PNG fake"),
                "receiver_name": "Front desk"
            })),
            Some("driver-kim"),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    assert_eq!(body["data"]["uploaded_by"], "driver-kim");
    let pod_id = body["data"]["id"].as_str().unwrap().to_string();

    let (_, body) = gw.call("GET", &format!("/api/v1/orders/{order}"), None).await;
    assert_eq!(body["data"]["order"]["status"], "DELIVERED");

    // No signature or photo: verification turns into rejection
    let (status, body) = gw
        .call(
            "POST",
            &format!("/api/v1/pods/{pod_id}/review"),
            Some(json!({"action": "VERIFY", "verified_by": "auditor"})),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["data"]["status"], "REJECTED");
    assert!(
        body["data"]["rejection_reason"]
            .as_str()
            .unwrap()
            .contains("signature")
    );

    let (status, body) = gw
        .call(
            "POST",
            &format!("/api/v1/pods/{pod_id}/review"),
            Some(json!({"action": "VERIFY", "verified_by": "auditor", "signature_waived": true, "photo_waived": true})),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "INVALID_TRANSITION");
}

#[tokio::test]
async fn test_dispatch_cancel_needs_reason() {
    let gw = gateway();
    let order = gw.confirmed_order("250").await;
    let vehicle = gw.vehicle("GW-300").await;
    let driver = gw.driver().await;
    let detail = gw.dispatch(&[&order], &vehicle, &driver).await;
    let uri = format!(
        "/api/v1/dispatches/{}/status",
        detail["dispatch"]["id"].as_str().unwrap()
    );

    let (status, body) = gw
        .call("PUT", &uri, Some(json!({"status": "CANCELLED"})))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "REASON_REQUIRED");

    let (status, body) = gw
        .call(
            "PUT",
            &uri,
            Some(json!({"status": "CANCELLED", "reason": "customer request"})),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["dispatch"]["status"], "CANCELLED");
    assert_eq!(body["data"]["shipments"][0]["status"], "CANCELLED");

    // Cancelled before departure: the order is still CONFIRMED
    let (_, body) = gw.call("GET", &format!("/api/v1/orders/{order}"), None).await;
    assert_eq!(body["data"]["order"]["status"], "CONFIRMED");
}

#[tokio::test]
async fn test_large_pod_fits_body_limit() {
    let gw = gateway();
    let order = gw.confirmed_order("250").await;
    let vehicle = gw.vehicle("GW-400").await;
    let driver = gw.driver().await;
    let detail = gw.dispatch(&[&order], &vehicle, &driver).await;
    let (status, _) = gw
        .call(
            "PUT",
            &format!(
                "/api/v1/dispatches/{}/status",
                detail["dispatch"]["id"].as_str().unwrap()
            ),
            Some(json!({"status": "DEPARTED"})),
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    // Well above axum's 2 MB default once base64-encoded
    let mut scan = b"%PDF-1.4\n".to_vec();
    scan.resize(9 * 1024 * 1024 + 512 * 1024, b'0');
    let (status, body) = gw
        .call(
            "POST",
            "/api/v1/pods",
            Some(json!({
                "order_id": order,
                "file_name": "scan.pdf",
                "mime_type": "application/pdf",
                "content": STANDARD.encode(&scan),
                "receiver_name": "Front desk"
            })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    assert_eq!(body["data"]["file_size"], scan.len());

    // Over the file limit is an INVALID_FILE error, not a transport failure
    let too_big = vec![b'0'; tms_core::pod::MAX_FILE_SIZE + 1];
    let (status, body) = gw
        .call(
            "POST",
            "/api/v1/pods",
            Some(json!({
                "order_id": order,
                "file_name": "huge.pdf",
                "mime_type": "application/pdf",
                "content": STANDARD.encode(&too_big)
            })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "INVALID_FILE");
}

#[tokio::test]
async fn test_tracking_for_unknown_shipment() {
    let gw = gateway();
    let (status, body) = gw
        .call(
            "POST",
            "/api/v1/tracking/batch",
            Some(json!({
                "shipment_id": "01ARZ3NDEKTSV4RRFFQ69G5FAV",
                "points": [{"latitude": 1.0, "longitude": 1.0}]
            })),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "NOT_FOUND");
}
