//! Order HTTP endpoints.

use std::str::FromStr;
use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use broker::MessageBroker;
use chrono::{DateTime, Utc};
use common::OrderId;
use domain::{Order, OrderStatus};
use serde::{Deserialize, Serialize};

use crate::error::ApiError;
use crate::publish;
use crate::repository::{OrderFilters, OrderRepository};
use crate::service::{CreateOrder, OrderService};

/// Shared application state accessible from all handlers.
pub struct AppState<R, B> {
    pub orders: OrderService<R>,
    pub broker: B,
}

// -- Request types --

#[derive(Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct CreateOrderRequest {
    pub product_id: String,
    pub customer_id: String,
    pub seller_id: String,
    /// Unit price in cents.
    pub price: i64,
    pub quantity: i64,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct UpdateOrderStatusRequest {
    pub status: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ListOrdersQuery {
    pub seller_id: Option<String>,
    pub customer_id: Option<String>,
    pub status: Option<String>,
}

// -- Response types --

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderResponse {
    pub id: String,
    pub product_id: String,
    pub customer_id: String,
    pub seller_id: String,
    /// Unit price in cents.
    pub price: i64,
    pub quantity: u32,
    pub status: String,
    /// Total price in cents.
    pub total_price: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<&Order> for OrderResponse {
    fn from(order: &Order) -> Self {
        Self {
            id: order.id().to_string(),
            product_id: order.product_id().to_string(),
            customer_id: order.customer_id().to_string(),
            seller_id: order.seller_id().to_string(),
            price: order.price().cents(),
            quantity: order.quantity(),
            status: order.status().to_string(),
            total_price: order.total_price().cents(),
            created_at: order.created_at(),
            updated_at: order.updated_at(),
        }
    }
}

// -- Handlers --

/// POST /orders — create a new order.
#[tracing::instrument(skip(state, req))]
pub async fn create<R, B>(
    State(state): State<Arc<AppState<R, B>>>,
    Json(req): Json<CreateOrderRequest>,
) -> Result<(StatusCode, Json<OrderResponse>), ApiError>
where
    R: OrderRepository + 'static,
    B: MessageBroker + 'static,
{
    let mut order = state
        .orders
        .create_order(CreateOrder {
            product_id: req.product_id,
            customer_id: req.customer_id,
            seller_id: req.seller_id,
            price_cents: req.price,
            quantity: req.quantity,
        })
        .await?;

    publish::publish_events(&state.broker, order.take_domain_events()).await;

    Ok((StatusCode::CREATED, Json(OrderResponse::from(&order))))
}

/// GET /orders — list orders with optional filters.
#[tracing::instrument(skip(state))]
pub async fn list<R, B>(
    State(state): State<Arc<AppState<R, B>>>,
    Query(query): Query<ListOrdersQuery>,
) -> Result<Json<Vec<OrderResponse>>, ApiError>
where
    R: OrderRepository + 'static,
    B: MessageBroker + 'static,
{
    let status = query
        .status
        .as_deref()
        .map(OrderStatus::from_str)
        .transpose()
        .map_err(|e| ApiError::BadRequest(e.to_string()))?;

    let orders = state
        .orders
        .list_orders(OrderFilters {
            seller_id: query.seller_id,
            customer_id: query.customer_id,
            status,
        })
        .await?;

    Ok(Json(orders.iter().map(OrderResponse::from).collect()))
}

/// GET /orders/{id} — load an order by ID.
#[tracing::instrument(skip(state))]
pub async fn get<R, B>(
    State(state): State<Arc<AppState<R, B>>>,
    Path(id): Path<String>,
) -> Result<Json<OrderResponse>, ApiError>
where
    R: OrderRepository + 'static,
    B: MessageBroker + 'static,
{
    let order_id = parse_order_id(&id)?;
    let order = state.orders.get_order(order_id).await?;
    Ok(Json(OrderResponse::from(&order)))
}

/// PATCH /orders/{id}/status — move an order to a new status.
#[tracing::instrument(skip(state, req))]
pub async fn update_status<R, B>(
    State(state): State<Arc<AppState<R, B>>>,
    Path(id): Path<String>,
    Json(req): Json<UpdateOrderStatusRequest>,
) -> Result<Json<OrderResponse>, ApiError>
where
    R: OrderRepository + 'static,
    B: MessageBroker + 'static,
{
    let order_id = parse_order_id(&id)?;
    let mut order = state.orders.update_status(order_id, &req.status).await?;

    publish::publish_events(&state.broker, order.take_domain_events()).await;

    Ok(Json(OrderResponse::from(&order)))
}

fn parse_order_id(id: &str) -> Result<OrderId, ApiError> {
    let uuid = uuid::Uuid::parse_str(id)
        .map_err(|e| ApiError::BadRequest(format!("Invalid order id: {e}")))?;
    Ok(OrderId::from_uuid(uuid))
}
