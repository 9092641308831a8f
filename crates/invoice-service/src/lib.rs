//! Invoice service: emits each order's invoice exactly once.
//!
//! Sellers upload an invoice PDF per order over HTTP. When the order
//! service marks an order shipped, the `order.shipped` event arrives on
//! this service's durable queue and triggers the send. Delivery is
//! at-least-once, so the send use case is idempotent: duplicates of an
//! already-sent invoice are a no-op.

pub mod config;
pub mod consumer;
pub mod error;
pub mod postgres;
pub mod publish;
pub mod repository;
pub mod routes;
pub mod service;
pub mod storage;

use std::sync::Arc;

use axum::Router;
use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use metrics_exporter_prometheus::PrometheusHandle;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

pub use config::Config;
pub use consumer::OrderShippedConsumer;
pub use repository::{InMemoryInvoiceRepository, InvoiceRepository};
pub use routes::invoices::AppState;
pub use service::InvoiceService;
pub use storage::{FileStorage, LocalFileStorage};

/// Largest accepted invoice upload, in bytes.
const MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

/// Creates the Axum application router with all routes and shared state.
pub fn create_app<R, S>(state: Arc<AppState<R, S>>, metrics_handle: PrometheusHandle) -> Router
where
    R: InvoiceRepository + 'static,
    S: FileStorage + 'static,
{
    let metrics_router = Router::new()
        .route("/metrics", get(routes::metrics::get))
        .with_state(metrics_handle);

    Router::new()
        .route("/health", get(routes::health::check))
        .route("/invoices", post(routes::invoices::upload::<R, S>))
        .route("/invoices/{order_id}", get(routes::invoices::get::<R, S>))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .with_state(state)
        .merge(metrics_router)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
}
