//! In-memory store implementation for tests and development.

use std::sync::Arc;

use chrono::Utc;
use common::{
    CartEntry, CartLine, CartLineId, Order, OrderId, OrderLine, OrderStatus, Product, ProductId,
    User, UserId,
};
use tokio::sync::RwLock;

use crate::error::{Result, StoreError};
use crate::store::{
    NewProduct, NewUser, OrderDraft, OrderFilter, OrderLineDraft, ProductFilter, ProductUpdate,
    ShopStore,
};
use async_trait::async_trait;

#[derive(Default)]
struct Inner {
    users: Vec<User>,
    products: Vec<Product>,
    cart_lines: Vec<CartLine>,
    orders: Vec<Order>,
    order_lines: Vec<OrderLine>,
    fail_completes: u32,
}

/// In-memory store with the same semantics as the PostgreSQL
/// implementation. The multi-step operations hold the single write
/// lock for their whole duration, which gives them the atomicity the
/// SQL backend gets from a transaction.
#[derive(Clone, Default)]
pub struct MemoryStore {
    inner: Arc<RwLock<Inner>>,
}

impl MemoryStore {
    /// Creates a new empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes the next `n` calls to `complete_order` fail with a storage
    /// error. Test hook for exercising settlement retries.
    pub async fn fail_next_completes(&self, n: u32) {
        self.inner.write().await.fail_completes = n;
    }
}

fn join_entry(inner: &Inner, line: &CartLine) -> Option<CartEntry> {
    // A product deleted after being carted drops out of the join,
    // mirroring the SQL backend.
    let product = inner.products.iter().find(|p| p.id == line.product_id)?;
    Some(CartEntry {
        line: *line,
        product_name: product.name.clone(),
        unit_price: product.price,
        stock: product.stock,
        active: product.active,
    })
}

#[async_trait]
impl ShopStore for MemoryStore {
    async fn insert_user(&self, user: NewUser) -> Result<UserId> {
        let mut inner = self.inner.write().await;
        if inner.users.iter().any(|u| u.email == user.email) {
            return Err(StoreError::DuplicateEmail);
        }
        let id = UserId::new();
        inner.users.push(User {
            id,
            name: user.name,
            email: user.email,
            password_hash: user.password_hash,
            phone: user.phone,
            address: user.address,
            role: user.role,
            created_at: Utc::now(),
        });
        Ok(id)
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>> {
        let inner = self.inner.read().await;
        Ok(inner.users.iter().find(|u| u.email == email).cloned())
    }

    async fn get_user(&self, id: UserId) -> Result<Option<User>> {
        let inner = self.inner.read().await;
        Ok(inner.users.iter().find(|u| u.id == id).cloned())
    }

    async fn count_users(&self) -> Result<u64> {
        Ok(self.inner.read().await.users.len() as u64)
    }

    async fn insert_product(&self, product: NewProduct) -> Result<ProductId> {
        let mut inner = self.inner.write().await;
        let id = ProductId::new();
        inner.products.push(Product {
            id,
            name: product.name,
            description: product.description,
            brand: product.brand,
            category: product.category,
            image_url: product.image_url,
            price: product.price,
            stock: product.stock,
            active: product.active,
            created_at: Utc::now(),
        });
        Ok(id)
    }

    async fn update_product(&self, id: ProductId, update: ProductUpdate) -> Result<bool> {
        let mut inner = self.inner.write().await;
        let Some(product) = inner.products.iter_mut().find(|p| p.id == id) else {
            return Ok(false);
        };
        product.name = update.name;
        product.description = update.description;
        product.brand = update.brand;
        product.category = update.category;
        product.image_url = update.image_url;
        product.price = update.price;
        product.stock = update.stock;
        product.active = update.active;
        Ok(true)
    }

    async fn delete_product(&self, id: ProductId) -> Result<bool> {
        let mut inner = self.inner.write().await;
        let before = inner.products.len();
        inner.products.retain(|p| p.id != id);
        let removed = inner.products.len() < before;
        if removed {
            // ON DELETE CASCADE on cart lines
            inner.cart_lines.retain(|l| l.product_id != id);
        }
        Ok(removed)
    }

    async fn set_product_active(&self, id: ProductId, active: bool) -> Result<bool> {
        let mut inner = self.inner.write().await;
        match inner.products.iter_mut().find(|p| p.id == id) {
            Some(product) => {
                product.active = active;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn get_product(&self, id: ProductId) -> Result<Option<Product>> {
        let inner = self.inner.read().await;
        Ok(inner.products.iter().find(|p| p.id == id).cloned())
    }

    async fn list_products(&self, filter: ProductFilter) -> Result<Vec<Product>> {
        let inner = self.inner.read().await;
        let mut products: Vec<Product> = inner
            .products
            .iter()
            .filter(|p| !filter.active_only || p.active)
            .cloned()
            .collect();
        products.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(a.name.cmp(&b.name)));
        Ok(products)
    }

    async fn count_products(&self) -> Result<u64> {
        Ok(self.inner.read().await.products.len() as u64)
    }

    async fn list_cart(&self, user_id: UserId) -> Result<Vec<CartEntry>> {
        let inner = self.inner.read().await;
        let mut entries: Vec<CartEntry> = inner
            .cart_lines
            .iter()
            .filter(|l| l.user_id == user_id)
            .filter_map(|l| join_entry(&inner, l))
            .collect();
        entries.sort_by(|a, b| a.product_name.cmp(&b.product_name));
        Ok(entries)
    }

    async fn find_cart_line(
        &self,
        user_id: UserId,
        product_id: ProductId,
    ) -> Result<Option<CartLine>> {
        let inner = self.inner.read().await;
        Ok(inner
            .cart_lines
            .iter()
            .find(|l| l.user_id == user_id && l.product_id == product_id)
            .copied())
    }

    async fn find_cart_entry(
        &self,
        user_id: UserId,
        line_id: CartLineId,
    ) -> Result<Option<CartEntry>> {
        let inner = self.inner.read().await;
        Ok(inner
            .cart_lines
            .iter()
            .find(|l| l.user_id == user_id && l.id == line_id)
            .and_then(|l| join_entry(&inner, l)))
    }

    async fn insert_cart_line(
        &self,
        user_id: UserId,
        product_id: ProductId,
        quantity: u32,
    ) -> Result<CartLineId> {
        let mut inner = self.inner.write().await;
        let id = CartLineId::new();
        inner.cart_lines.push(CartLine {
            id,
            user_id,
            product_id,
            quantity,
        });
        Ok(id)
    }

    async fn set_cart_line_quantity(&self, line_id: CartLineId, quantity: u32) -> Result<bool> {
        let mut inner = self.inner.write().await;
        match inner.cart_lines.iter_mut().find(|l| l.id == line_id) {
            Some(line) => {
                line.quantity = quantity;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete_cart_line(&self, user_id: UserId, line_id: CartLineId) -> Result<bool> {
        let mut inner = self.inner.write().await;
        let before = inner.cart_lines.len();
        inner
            .cart_lines
            .retain(|l| !(l.id == line_id && l.user_id == user_id));
        Ok(inner.cart_lines.len() < before)
    }

    async fn clear_cart(&self, user_id: UserId) -> Result<()> {
        let mut inner = self.inner.write().await;
        inner.cart_lines.retain(|l| l.user_id != user_id);
        Ok(())
    }

    async fn cart_quantity(&self, user_id: UserId) -> Result<u32> {
        let inner = self.inner.read().await;
        Ok(inner
            .cart_lines
            .iter()
            .filter(|l| l.user_id == user_id)
            .map(|l| l.quantity)
            .sum())
    }

    async fn commit_checkout(
        &self,
        draft: OrderDraft,
        lines: Vec<OrderLineDraft>,
    ) -> Result<OrderId> {
        let mut inner = self.inner.write().await;

        // Validate every decrement before applying any of them, so a
        // late failure leaves no partial state behind.
        for line in &lines {
            let available = inner
                .products
                .iter()
                .find(|p| p.id == line.product_id)
                .map(|p| p.stock)
                .unwrap_or(0);
            if available < line.quantity {
                return Err(StoreError::InsufficientStock {
                    product_id: line.product_id,
                });
            }
        }

        let order_id = OrderId::new();
        for line in &lines {
            if let Some(product) = inner.products.iter_mut().find(|p| p.id == line.product_id) {
                product.stock -= line.quantity;
            }
            inner.order_lines.push(OrderLine {
                order_id,
                product_id: line.product_id,
                product_name: line.product_name.clone(),
                quantity: line.quantity,
                unit_price: line.unit_price,
            });
        }
        let user_id = draft.user_id;
        inner.orders.push(Order {
            id: order_id,
            user_id,
            total: draft.total,
            payment_method: draft.payment_method,
            delivery_address: draft.delivery_address,
            delivery_type: draft.delivery_type,
            status: OrderStatus::Processing,
            created_at: Utc::now(),
        });
        inner.cart_lines.retain(|l| l.user_id != user_id);

        Ok(order_id)
    }

    async fn get_order(&self, id: OrderId) -> Result<Option<Order>> {
        let inner = self.inner.read().await;
        Ok(inner.orders.iter().find(|o| o.id == id).cloned())
    }

    async fn list_orders(&self, filter: OrderFilter) -> Result<Vec<Order>> {
        let inner = self.inner.read().await;
        // Insertion order is creation order; reverse for newest-first.
        Ok(inner
            .orders
            .iter()
            .rev()
            .filter(|o| filter.user_id.is_none_or(|u| o.user_id == u))
            .cloned()
            .collect())
    }

    async fn recent_orders(&self, limit: u32) -> Result<Vec<Order>> {
        let inner = self.inner.read().await;
        Ok(inner
            .orders
            .iter()
            .rev()
            .take(limit as usize)
            .cloned()
            .collect())
    }

    async fn count_orders(&self) -> Result<u64> {
        Ok(self.inner.read().await.orders.len() as u64)
    }

    async fn order_lines(&self, order_id: OrderId) -> Result<Vec<OrderLine>> {
        let inner = self.inner.read().await;
        Ok(inner
            .order_lines
            .iter()
            .filter(|l| l.order_id == order_id)
            .cloned()
            .collect())
    }

    async fn set_order_status(
        &self,
        id: OrderId,
        from: OrderStatus,
        to: OrderStatus,
    ) -> Result<bool> {
        let mut inner = self.inner.write().await;
        match inner
            .orders
            .iter_mut()
            .find(|o| o.id == id && o.status == from)
        {
            Some(order) => {
                order.status = to;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn complete_order(&self, id: OrderId) -> Result<bool> {
        let mut inner = self.inner.write().await;
        if inner.fail_completes > 0 {
            inner.fail_completes -= 1;
            return Err(StoreError::Database(sqlx::Error::PoolClosed));
        }
        match inner.orders.iter_mut().find(|o| {
            o.id == id && matches!(o.status, OrderStatus::Pending | OrderStatus::Processing)
        }) {
            Some(order) => {
                order.status = OrderStatus::Completed;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn cancel_order(&self, id: OrderId) -> Result<bool> {
        let mut inner = self.inner.write().await;
        let Some(idx) = inner
            .orders
            .iter()
            .position(|o| o.id == id && o.status.can_cancel())
        else {
            return Ok(false);
        };
        inner.orders[idx].status = OrderStatus::Cancelled;

        let restores: Vec<(ProductId, u32)> = inner
            .order_lines
            .iter()
            .filter(|l| l.order_id == id)
            .map(|l| (l.product_id, l.quantity))
            .collect();
        for (product_id, quantity) in restores {
            if let Some(product) = inner.products.iter_mut().find(|p| p.id == product_id) {
                product.stock += quantity;
            }
        }
        Ok(true)
    }
}
