//! Core services for the storefront.
//!
//! This crate owns the business rules: converting carts into priced
//! orders, keeping cart quantities inside stock, admin catalog
//! management, and controlled order status transitions. Persistence is
//! delegated to the [`store`] adapter; HTTP concerns live above.

mod access;
pub mod cart;
pub mod catalog;
pub mod checkout;
pub mod error;
pub mod orders;

pub use cart::{CartService, CartView};
pub use catalog::{CatalogService, DashboardSummary};
pub use checkout::{
    CheckoutEngine, CheckoutReceipt, CheckoutRequest, NoopScheduler, SettlementScheduler,
    TAX_RATE_PERCENT,
};
pub use error::ShopError;
pub use orders::{OrderDetails, OrderService};
