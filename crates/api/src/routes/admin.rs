//! Admin panel endpoints: dashboard and product management.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use common::{Money, ProductId};
use serde::{Deserialize, Serialize};
use store::{NewProduct, ProductUpdate, ShopStore};
use uuid::Uuid;

use crate::AppState;
use crate::auth::CurrentUser;
use crate::error::ApiError;
use crate::routes::orders::OrderResponse;
use crate::routes::products::ProductResponse;

// -- Request types --

#[derive(Deserialize)]
pub struct ProductBody {
    pub name: String,
    pub description: Option<String>,
    pub brand: Option<String>,
    pub category: Option<String>,
    pub image_url: Option<String>,
    pub price_cents: i64,
    pub stock: u32,
    #[serde(default = "default_active")]
    pub active: bool,
}

fn default_active() -> bool {
    true
}

// -- Response types --

#[derive(Serialize)]
pub struct DashboardResponse {
    pub product_count: u64,
    pub user_count: u64,
    pub order_count: u64,
    pub recent_orders: Vec<OrderResponse>,
}

#[derive(Serialize)]
pub struct ProductCreatedResponse {
    pub success: bool,
    pub product_id: String,
}

// -- Handlers --

/// GET /admin/dashboard — entity counts and recent orders.
#[tracing::instrument(skip(state, user))]
pub async fn dashboard<S: ShopStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    user: CurrentUser,
) -> Result<Json<DashboardResponse>, ApiError> {
    let summary = state.catalog.dashboard(user.0).await?;
    Ok(Json(DashboardResponse {
        product_count: summary.product_count,
        user_count: summary.user_count,
        order_count: summary.order_count,
        recent_orders: summary.recent_orders.iter().map(OrderResponse::from).collect(),
    }))
}

/// GET /admin/products — every product, inactive ones included.
#[tracing::instrument(skip(state, user))]
pub async fn list_products<S: ShopStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    user: CurrentUser,
) -> Result<Json<Vec<ProductResponse>>, ApiError> {
    let products = state.catalog.list_all_products(user.0).await?;
    Ok(Json(products.iter().map(ProductResponse::from).collect()))
}

/// POST /admin/products — add a product to the catalog.
#[tracing::instrument(skip(state, user, body))]
pub async fn create_product<S: ShopStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    user: CurrentUser,
    Json(body): Json<ProductBody>,
) -> Result<(StatusCode, Json<ProductCreatedResponse>), ApiError> {
    let product_id = state
        .catalog
        .create_product(
            user.0,
            NewProduct {
                name: body.name,
                description: body.description,
                brand: body.brand,
                category: body.category,
                image_url: body.image_url,
                price: Money::from_cents(body.price_cents),
                stock: body.stock,
                active: body.active,
            },
        )
        .await?;
    Ok((
        StatusCode::CREATED,
        Json(ProductCreatedResponse {
            success: true,
            product_id: product_id.to_string(),
        }),
    ))
}

/// PUT /admin/products/:id — overwrite a product's fields.
#[tracing::instrument(skip(state, user, body))]
pub async fn update_product<S: ShopStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    user: CurrentUser,
    Path(id): Path<Uuid>,
    Json(body): Json<ProductBody>,
) -> Result<Json<serde_json::Value>, ApiError> {
    state
        .catalog
        .update_product(
            user.0,
            ProductId::from_uuid(id),
            ProductUpdate {
                name: body.name,
                description: body.description,
                brand: body.brand,
                category: body.category,
                image_url: body.image_url,
                price: Money::from_cents(body.price_cents),
                stock: body.stock,
                active: body.active,
            },
        )
        .await?;
    Ok(Json(serde_json::json!({ "success": true })))
}

/// DELETE /admin/products/:id — remove a product.
#[tracing::instrument(skip(state, user))]
pub async fn delete_product<S: ShopStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    user: CurrentUser,
    Path(id): Path<Uuid>,
) -> Result<Json<serde_json::Value>, ApiError> {
    state
        .catalog
        .delete_product(user.0, ProductId::from_uuid(id))
        .await?;
    Ok(Json(serde_json::json!({ "success": true })))
}

/// POST /admin/products/:id/toggle — flip the active flag.
#[tracing::instrument(skip(state, user))]
pub async fn toggle_product<S: ShopStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    user: CurrentUser,
    Path(id): Path<Uuid>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let active = state
        .catalog
        .toggle_active(user.0, ProductId::from_uuid(id))
        .await?;
    Ok(Json(serde_json::json!({ "success": true, "active": active })))
}
