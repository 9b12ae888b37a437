//! The storage-adapter interface.

use async_trait::async_trait;
use common::{
    CartEntry, CartLine, CartLineId, Money, Order, OrderId, OrderLine, OrderStatus, Product,
    ProductId, Role, User, UserId,
};

use crate::error::Result;

/// Input for creating a product.
#[derive(Debug, Clone)]
pub struct NewProduct {
    pub name: String,
    pub description: Option<String>,
    pub brand: Option<String>,
    pub category: Option<String>,
    pub image_url: Option<String>,
    pub price: Money,
    pub stock: u32,
    pub active: bool,
}

/// Full set of mutable product fields for an admin edit.
#[derive(Debug, Clone)]
pub struct ProductUpdate {
    pub name: String,
    pub description: Option<String>,
    pub brand: Option<String>,
    pub category: Option<String>,
    pub image_url: Option<String>,
    pub price: Money,
    pub stock: u32,
    pub active: bool,
}

/// Input for registering a user.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub role: Role,
}

/// Order header fields computed by the checkout engine.
#[derive(Debug, Clone)]
pub struct OrderDraft {
    pub user_id: UserId,
    pub total: Money,
    pub payment_method: String,
    pub delivery_address: String,
    pub delivery_type: String,
}

/// One order line carrying its price and name snapshot.
#[derive(Debug, Clone)]
pub struct OrderLineDraft {
    pub product_id: ProductId,
    pub product_name: String,
    pub quantity: u32,
    pub unit_price: Money,
}

/// Filter for order listings.
#[derive(Debug, Clone, Copy, Default)]
pub struct OrderFilter {
    /// Restrict to one user's orders; `None` lists everything.
    pub user_id: Option<UserId>,
}

/// Filter for product listings.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProductFilter {
    pub active_only: bool,
}

/// Core trait for storefront persistence.
///
/// All implementations must be thread-safe (Send + Sync). Listings are
/// returned newest-first for orders and name-ordered for cart entries,
/// so both backends paginate and render identically.
#[async_trait]
pub trait ShopStore: Send + Sync {
    // -- users --

    /// Inserts a user; fails with `DuplicateEmail` when the email is
    /// already registered.
    async fn insert_user(&self, user: NewUser) -> Result<UserId>;

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>>;

    async fn get_user(&self, id: UserId) -> Result<Option<User>>;

    async fn count_users(&self) -> Result<u64>;

    // -- catalog --

    async fn insert_product(&self, product: NewProduct) -> Result<ProductId>;

    /// Overwrites every mutable product field. Returns false when the
    /// product does not exist.
    async fn update_product(&self, id: ProductId, update: ProductUpdate) -> Result<bool>;

    async fn delete_product(&self, id: ProductId) -> Result<bool>;

    async fn set_product_active(&self, id: ProductId, active: bool) -> Result<bool>;

    async fn get_product(&self, id: ProductId) -> Result<Option<Product>>;

    async fn list_products(&self, filter: ProductFilter) -> Result<Vec<Product>>;

    async fn count_products(&self) -> Result<u64>;

    // -- cart --

    /// Lists the user's cart joined with current product data.
    async fn list_cart(&self, user_id: UserId) -> Result<Vec<CartEntry>>;

    async fn find_cart_line(
        &self,
        user_id: UserId,
        product_id: ProductId,
    ) -> Result<Option<CartLine>>;

    /// Looks up one cart line by id, scoped to its owner, joined with
    /// product data.
    async fn find_cart_entry(
        &self,
        user_id: UserId,
        line_id: CartLineId,
    ) -> Result<Option<CartEntry>>;

    async fn insert_cart_line(
        &self,
        user_id: UserId,
        product_id: ProductId,
        quantity: u32,
    ) -> Result<CartLineId>;

    async fn set_cart_line_quantity(&self, line_id: CartLineId, quantity: u32) -> Result<bool>;

    /// Deletes a line owned by `user_id`. Returns false when no such
    /// line exists.
    async fn delete_cart_line(&self, user_id: UserId, line_id: CartLineId) -> Result<bool>;

    async fn clear_cart(&self, user_id: UserId) -> Result<()>;

    /// Total quantity across the user's cart (the badge count).
    async fn cart_quantity(&self, user_id: UserId) -> Result<u32>;

    // -- orders --

    /// Atomically turns priced drafts into a persisted order: inserts
    /// the order in `processing` status, inserts every line, decrements
    /// each product's stock conditionally (`stock >= quantity`), and
    /// clears the user's cart. Either everything is applied or nothing
    /// is; a failed decrement rolls the whole operation back and
    /// surfaces `InsufficientStock`.
    async fn commit_checkout(
        &self,
        draft: OrderDraft,
        lines: Vec<OrderLineDraft>,
    ) -> Result<OrderId>;

    async fn get_order(&self, id: OrderId) -> Result<Option<Order>>;

    /// Lists orders newest-first, optionally restricted to one user.
    async fn list_orders(&self, filter: OrderFilter) -> Result<Vec<Order>>;

    async fn recent_orders(&self, limit: u32) -> Result<Vec<Order>>;

    async fn count_orders(&self) -> Result<u64>;

    async fn order_lines(&self, order_id: OrderId) -> Result<Vec<OrderLine>>;

    /// Conditionally moves an order from `from` to `to`. Returns false
    /// when the row no longer holds `from` (lost a race or never did).
    async fn set_order_status(
        &self,
        id: OrderId,
        from: OrderStatus,
        to: OrderStatus,
    ) -> Result<bool>;

    /// Conditionally completes an order still in `pending` or
    /// `processing`. The false return is the settlement idempotency
    /// guard: repeated attempts and attempts against cancelled orders
    /// are no-ops.
    async fn complete_order(&self, id: OrderId) -> Result<bool>;

    /// Atomically cancels an order still in `pending` or `processing`
    /// and restores every line's quantity onto its product's stock.
    /// Returns false when the order was not cancellable.
    async fn cancel_order(&self, id: OrderId) -> Result<bool>;
}
