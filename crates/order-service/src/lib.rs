//! Order service: owns the order lifecycle.
//!
//! Exposes REST endpoints for creating orders, listing them, and moving
//! them through the status state machine. Every committed state change
//! publishes the aggregate's domain events to the shared stream; the
//! invoice service reacts to `order.shipped` on its own schedule. No
//! synchronous call ever crosses the service boundary.

pub mod config;
pub mod error;
pub mod postgres;
pub mod publish;
pub mod repository;
pub mod routes;
pub mod service;

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, patch, post};
use broker::MessageBroker;
use metrics_exporter_prometheus::PrometheusHandle;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

pub use config::Config;
pub use repository::{InMemoryOrderRepository, OrderRepository};
pub use routes::orders::AppState;
pub use service::OrderService;

/// Creates the Axum application router with all routes and shared state.
pub fn create_app<R, B>(state: Arc<AppState<R, B>>, metrics_handle: PrometheusHandle) -> Router
where
    R: OrderRepository + 'static,
    B: MessageBroker + 'static,
{
    let metrics_router = Router::new()
        .route("/metrics", get(routes::metrics::get))
        .with_state(metrics_handle);

    Router::new()
        .route("/health", get(routes::health::check))
        .route("/orders", post(routes::orders::create::<R, B>))
        .route("/orders", get(routes::orders::list::<R, B>))
        .route("/orders/{id}", get(routes::orders::get::<R, B>))
        .route(
            "/orders/{id}/status",
            patch(routes::orders::update_status::<R, B>),
        )
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
