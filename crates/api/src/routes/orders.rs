//! Checkout, order history and state-transition endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use axum::http::{StatusCode, header};
use axum::response::IntoResponse;
use common::{Order, OrderId, OrderLine, OrderStatus};
use domain::{CheckoutRequest, ShopError};
use serde::{Deserialize, Serialize};
use store::ShopStore;
use uuid::Uuid;

use crate::AppState;
use crate::auth::CurrentUser;
use crate::error::ApiError;
use crate::ticket;

// -- Request types --

#[derive(Deserialize)]
pub struct CheckoutRequestBody {
    pub payment_method: String,
    #[serde(default)]
    pub delivery_address: String,
    pub delivery_type: String,
}

#[derive(Deserialize)]
pub struct SetStatusRequest {
    pub status: String,
}

// -- Response types --

#[derive(Serialize)]
pub struct CheckoutResponse {
    pub success: bool,
    pub order_id: String,
    pub subtotal_cents: i64,
    pub tax_cents: i64,
    pub total_cents: i64,
}

#[derive(Serialize)]
pub struct OrderResponse {
    pub id: String,
    pub user_id: String,
    pub total_cents: i64,
    pub payment_method: String,
    pub delivery_address: String,
    pub delivery_type: String,
    pub status: OrderStatus,
    pub created_at: String,
}

impl From<&Order> for OrderResponse {
    fn from(order: &Order) -> Self {
        Self {
            id: order.id.to_string(),
            user_id: order.user_id.to_string(),
            total_cents: order.total.cents(),
            payment_method: order.payment_method.clone(),
            delivery_address: order.delivery_address.clone(),
            delivery_type: order.delivery_type.clone(),
            status: order.status,
            created_at: order.created_at.to_rfc3339(),
        }
    }
}

#[derive(Serialize)]
pub struct OrderLineResponse {
    pub product_id: String,
    pub product_name: String,
    pub quantity: u32,
    pub unit_price_cents: i64,
    pub line_total_cents: i64,
}

impl From<&OrderLine> for OrderLineResponse {
    fn from(line: &OrderLine) -> Self {
        Self {
            product_id: line.product_id.to_string(),
            product_name: line.product_name.clone(),
            quantity: line.quantity,
            unit_price_cents: line.unit_price.cents(),
            line_total_cents: line.line_total().cents(),
        }
    }
}

#[derive(Serialize)]
pub struct OrderDetailsResponse {
    pub order: OrderResponse,
    pub lines: Vec<OrderLineResponse>,
}

// -- Handlers --

/// POST /orders/checkout — turn the caller's cart into an order.
#[tracing::instrument(skip(state, user, req))]
pub async fn checkout<S: ShopStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    user: CurrentUser,
    Json(req): Json<CheckoutRequestBody>,
) -> Result<(StatusCode, Json<CheckoutResponse>), ApiError> {
    let receipt = state
        .checkout
        .checkout(
            user.0,
            CheckoutRequest {
                payment_method: req.payment_method,
                delivery_address: req.delivery_address,
                delivery_type: req.delivery_type,
            },
        )
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(CheckoutResponse {
            success: true,
            order_id: receipt.order_id.to_string(),
            subtotal_cents: receipt.subtotal.cents(),
            tax_cents: receipt.tax.cents(),
            total_cents: receipt.total.cents(),
        }),
    ))
}

/// GET /orders — order history: all orders for admins, own for customers.
#[tracing::instrument(skip(state, user))]
pub async fn list<S: ShopStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    user: CurrentUser,
) -> Result<Json<Vec<OrderResponse>>, ApiError> {
    let orders = state.orders.list_orders(user.0).await?;
    Ok(Json(orders.iter().map(OrderResponse::from).collect()))
}

/// GET /orders/:id — one order with its line items.
#[tracing::instrument(skip(state, user))]
pub async fn get<S: ShopStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    user: CurrentUser,
    Path(id): Path<Uuid>,
) -> Result<Json<OrderDetailsResponse>, ApiError> {
    let details = state
        .orders
        .order_details(user.0, OrderId::from_uuid(id))
        .await?;
    Ok(Json(OrderDetailsResponse {
        order: OrderResponse::from(&details.order),
        lines: details.lines.iter().map(OrderLineResponse::from).collect(),
    }))
}

/// GET /orders/:id/ticket — printable plain-text ticket.
#[tracing::instrument(skip(state, user))]
pub async fn ticket<S: ShopStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    user: CurrentUser,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let order_id = OrderId::from_uuid(id);
    let details = state.orders.order_details(user.0, order_id).await?;
    let customer = state
        .store
        .get_user(details.order.user_id)
        .await
        .map_err(ShopError::from)?
        .ok_or(ShopError::NotFound("user"))?;

    let doc = ticket::render(&details.order, &details.lines, &customer);
    Ok((
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, "text/plain; charset=utf-8".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("inline; filename=ticket-order-{order_id}.txt"),
            ),
        ],
        doc,
    ))
}

/// POST /orders/:id/cancel — customer cancel with stock restore.
#[tracing::instrument(skip(state, user))]
pub async fn cancel<S: ShopStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    user: CurrentUser,
    Path(id): Path<Uuid>,
) -> Result<Json<serde_json::Value>, ApiError> {
    state.orders.cancel(user.0, OrderId::from_uuid(id)).await?;
    Ok(Json(serde_json::json!({
        "success": true,
        "message": format!("Order {id} cancelled"),
    })))
}

/// PUT /orders/:id/status — admin status override.
#[tracing::instrument(skip(state, user, req))]
pub async fn set_status<S: ShopStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    user: CurrentUser,
    Path(id): Path<Uuid>,
    Json(req): Json<SetStatusRequest>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let status: OrderStatus = req
        .status
        .parse()
        .map_err(|_| ShopError::InvalidStatus(req.status.clone()))?;
    state
        .orders
        .set_status(user.0, OrderId::from_uuid(id), status)
        .await?;
    Ok(Json(serde_json::json!({
        "success": true,
        "message": format!("Order {id} status updated to {status}"),
    })))
}
