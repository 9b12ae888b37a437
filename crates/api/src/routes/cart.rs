//! Cart endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use common::{CartEntry, CartLineId, ProductId};
use serde::{Deserialize, Serialize};
use store::ShopStore;
use uuid::Uuid;

use crate::AppState;
use crate::auth::CurrentUser;
use crate::error::ApiError;

// -- Request types --

#[derive(Deserialize)]
pub struct AddToCartRequest {
    pub product_id: Uuid,
    pub quantity: u32,
}

#[derive(Deserialize)]
pub struct UpdateQuantityRequest {
    pub quantity: u32,
}

// -- Response types --

#[derive(Serialize)]
pub struct CartItemResponse {
    pub line_id: String,
    pub product_id: String,
    pub product_name: String,
    pub quantity: u32,
    pub unit_price_cents: i64,
    pub line_total_cents: i64,
}

impl From<&CartEntry> for CartItemResponse {
    fn from(entry: &CartEntry) -> Self {
        Self {
            line_id: entry.line.id.to_string(),
            product_id: entry.line.product_id.to_string(),
            product_name: entry.product_name.clone(),
            quantity: entry.line.quantity,
            unit_price_cents: entry.unit_price.cents(),
            line_total_cents: entry.line_total().cents(),
        }
    }
}

#[derive(Serialize)]
pub struct CartResponse {
    pub items: Vec<CartItemResponse>,
    pub subtotal_cents: i64,
}

#[derive(Serialize)]
pub struct CartCountResponse {
    pub success: bool,
    pub cart_count: u32,
}

// -- Handlers --

/// GET /cart — the caller's cart with its subtotal.
#[tracing::instrument(skip(state, user))]
pub async fn view<S: ShopStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    user: CurrentUser,
) -> Result<Json<CartResponse>, ApiError> {
    let view = state.cart.view_cart(user.0).await?;
    Ok(Json(CartResponse {
        items: view.entries.iter().map(CartItemResponse::from).collect(),
        subtotal_cents: view.subtotal.cents(),
    }))
}

/// POST /cart/items — add a product, merging with an existing line.
#[tracing::instrument(skip(state, user, req))]
pub async fn add<S: ShopStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    user: CurrentUser,
    Json(req): Json<AddToCartRequest>,
) -> Result<Json<CartCountResponse>, ApiError> {
    let cart_count = state
        .cart
        .add_to_cart(user.0, ProductId::from_uuid(req.product_id), req.quantity)
        .await?;
    Ok(Json(CartCountResponse {
        success: true,
        cart_count,
    }))
}

/// PUT /cart/items/:id — overwrite a line's quantity.
#[tracing::instrument(skip(state, user, req))]
pub async fn update<S: ShopStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    user: CurrentUser,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateQuantityRequest>,
) -> Result<Json<serde_json::Value>, ApiError> {
    state
        .cart
        .update_quantity(user.0, CartLineId::from_uuid(id), req.quantity)
        .await?;
    Ok(Json(serde_json::json!({ "success": true })))
}

/// DELETE /cart/items/:id — remove a line.
#[tracing::instrument(skip(state, user))]
pub async fn remove<S: ShopStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    user: CurrentUser,
    Path(id): Path<Uuid>,
) -> Result<Json<CartCountResponse>, ApiError> {
    let cart_count = state
        .cart
        .remove_line(user.0, CartLineId::from_uuid(id))
        .await?;
    Ok(Json(CartCountResponse {
        success: true,
        cart_count,
    }))
}
