//! HTTP gateway
//!
//! axum router over [`LifecycleService`](crate::lifecycle::LifecycleService).
//! All resource routes live under `/api/v1`; Swagger UI is served at `/docs`.

pub mod handlers;
pub mod openapi;
pub mod state;
pub mod types;

use axum::{
    Router,
    extract::DefaultBodyLimit,
    routing::{get, post, put},
};
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

pub use state::AppState;

/// Request body cap for POD uploads: a maximum-size file after base64
/// inflation plus room for the JSON fields around it
pub const POD_BODY_LIMIT: usize = crate::pod::MAX_FILE_SIZE * 4 / 3 + 64 * 1024;

/// Build the complete router. Split from [`run_server`] so tests can drive it
/// in-process.
pub fn build_router(state: AppState) -> Router {
    let api = Router::new()
        .route("/health", get(handlers::health_check))
        // Orders
        .route(
            "/orders",
            post(handlers::create_order).get(handlers::list_orders),
        )
        .route(
            "/orders/{id}",
            get(handlers::get_order).delete(handlers::delete_order),
        )
        .route("/orders/statistics", get(handlers::order_statistics))
        .route("/orders/{id}/status", put(handlers::update_order_status))
        // Customers
        .route(
            "/customers",
            post(handlers::create_customer).get(handlers::list_customers),
        )
        .route("/customers/stats", get(handlers::customer_statistics))
        .route(
            "/customers/{id}",
            get(handlers::get_customer)
                .put(handlers::update_customer)
                .delete(handlers::delete_customer),
        )
        .route(
            "/customers/{id}/status",
            put(handlers::update_customer_status),
        )
        // Fleet
        .route(
            "/vehicles",
            post(handlers::create_vehicle).get(handlers::list_vehicles),
        )
        .route("/vehicles/available", get(handlers::available_vehicles))
        .route(
            "/vehicles/{id}",
            get(handlers::get_vehicle)
                .put(handlers::update_vehicle)
                .delete(handlers::retire_vehicle),
        )
        .route(
            "/drivers",
            post(handlers::create_driver).get(handlers::list_drivers),
        )
        .route(
            "/drivers/{id}",
            get(handlers::get_driver)
                .put(handlers::update_driver)
                .delete(handlers::delete_driver),
        )
        // Dispatch
        .route(
            "/dispatches",
            post(handlers::create_dispatch).get(handlers::list_dispatches),
        )
        .route("/dispatches/{id}", get(handlers::get_dispatch))
        .route(
            "/dispatches/{id}/status",
            put(handlers::update_dispatch_status),
        )
        // Proof of delivery
        .route(
            "/pods",
            post(handlers::upload_pod).layer(DefaultBodyLimit::max(POD_BODY_LIMIT)),
        )
        .route("/pods/{id}", get(handlers::get_pod))
        .route("/pods/{id}/review", post(handlers::review_pod))
        // Tracking
        .route("/tracking/batch", post(handlers::ingest_tracking))
        .route(
            "/tracking/shipments/{id}",
            get(handlers::get_shipment_tracking),
        );

    Router::new()
        .nest("/api/v1", api)
        .with_state(state)
        .merge(SwaggerUi::new("/docs").url("/api-docs/openapi.json", openapi::ApiDoc::openapi()))
        .layer(TraceLayer::new_for_http())
}

/// Bind and serve until ctrl-c
pub async fn run_server(host: &str, port: u16, state: AppState) -> anyhow::Result<()> {
    let addr = format!("{host}:{port}");
    let listener = TcpListener::bind(&addr)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to bind to {addr}: {e} (port {port} may already be in use)"))?;

    tracing::info!(addr = %addr, store = state.store().name(), "Gateway listening");
    tracing::info!("API Docs: http://{addr}/docs");

    axum::serve(listener, build_router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Gateway stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for ctrl-c");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
