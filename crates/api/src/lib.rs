//! HTTP API server for the ChrisShop storefront.
//!
//! JSON endpoints over the core services, with session-token auth,
//! structured logging (tracing) and Prometheus metrics.

pub mod auth;
pub mod config;
pub mod error;
pub mod routes;
pub mod ticket;

use std::sync::Arc;

use axum::Router;
use axum::extract::FromRef;
use axum::routing::{get, post, put};
use domain::{CartService, CatalogService, CheckoutEngine, OrderService, SettlementScheduler};
use metrics_exporter_prometheus::PrometheusHandle;
use store::ShopStore;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use auth::Sessions;

/// Shared application state accessible from all handlers.
pub struct AppState<S: ShopStore> {
    pub store: S,
    pub catalog: CatalogService<S>,
    pub cart: CartService<S>,
    pub checkout: CheckoutEngine<S>,
    pub orders: OrderService<S>,
    pub sessions: Sessions,
}

impl<S: ShopStore> FromRef<Arc<AppState<S>>> for Sessions {
    fn from_ref(state: &Arc<AppState<S>>) -> Self {
        state.sessions.clone()
    }
}

/// Wires the services over one store and scheduler.
pub fn create_state<S: ShopStore + Clone + 'static>(
    store: S,
    scheduler: Arc<dyn SettlementScheduler>,
) -> Arc<AppState<S>> {
    Arc::new(AppState {
        catalog: CatalogService::new(store.clone()),
        cart: CartService::new(store.clone()),
        checkout: CheckoutEngine::new(store.clone(), scheduler),
        orders: OrderService::new(store.clone()),
        sessions: Sessions::new(),
        store,
    })
}

/// Creates the Axum application router with all routes and shared state.
pub fn create_app<S: ShopStore + Clone + 'static>(
    state: Arc<AppState<S>>,
    metrics_handle: PrometheusHandle,
) -> Router {
    let metrics_router = Router::new()
        .route("/metrics", get(routes::metrics::scrape))
        .with_state(metrics_handle);

    Router::new()
        .route("/health", get(routes::health::check))
        .route("/auth/register", post(routes::auth::register::<S>))
        .route("/auth/login", post(routes::auth::login::<S>))
        .route("/auth/logout", post(routes::auth::logout::<S>))
        .route("/products", get(routes::products::list::<S>))
        .route("/products/{id}", get(routes::products::get::<S>))
        .route("/cart", get(routes::cart::view::<S>))
        .route("/cart/items", post(routes::cart::add::<S>))
        .route(
            "/cart/items/{id}",
            put(routes::cart::update::<S>).delete(routes::cart::remove::<S>),
        )
        .route("/orders/checkout", post(routes::orders::checkout::<S>))
        .route("/orders", get(routes::orders::list::<S>))
        .route("/orders/{id}", get(routes::orders::get::<S>))
        .route("/orders/{id}/ticket", get(routes::orders::ticket::<S>))
        .route("/orders/{id}/cancel", post(routes::orders::cancel::<S>))
        .route("/orders/{id}/status", put(routes::orders::set_status::<S>))
        .route("/admin/dashboard", get(routes::admin::dashboard::<S>))
        .route(
            "/admin/products",
            get(routes::admin::list_products::<S>).post(routes::admin::create_product::<S>),
        )
        .route(
            "/admin/products/{id}",
            put(routes::admin::update_product::<S>).delete(routes::admin::delete_product::<S>),
        )
        .route(
            "/admin/products/{id}/toggle",
            post(routes::admin::toggle_product::<S>),
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
