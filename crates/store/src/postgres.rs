//! PostgreSQL-backed store implementation.

use async_trait::async_trait;
use common::{
    CartEntry, CartLine, CartLineId, Money, Order, OrderId, OrderLine, OrderStatus, Product,
    ProductId, User, UserId,
};
use sqlx::{PgPool, Row, postgres::PgRow};
use uuid::Uuid;

use crate::error::{Result, StoreError};
use crate::store::{
    NewProduct, NewUser, OrderDraft, OrderFilter, OrderLineDraft, ProductFilter, ProductUpdate,
    ShopStore,
};

const PRODUCT_COLUMNS: &str =
    "id, name, description, brand, category, image_url, price_cents, stock, active, created_at";
const ORDER_COLUMNS: &str =
    "id, user_id, total_cents, payment_method, delivery_address, delivery_type, status, created_at";
const USER_COLUMNS: &str =
    "id, name, email, password_hash, phone, address, role, created_at";
const CART_ENTRY_COLUMNS: &str =
    "c.id, c.user_id, c.product_id, c.quantity, p.name, p.price_cents, p.stock, p.active";

/// PostgreSQL store.
#[derive(Clone)]
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    /// Creates a new store over an existing connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Gets a reference to the underlying connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Runs the database migrations.
    pub async fn run_migrations(&self) -> std::result::Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("../../migrations").run(&self.pool).await
    }

    fn row_to_product(row: PgRow) -> Result<Product> {
        Ok(Product {
            id: ProductId::from_uuid(row.try_get::<Uuid, _>("id")?),
            name: row.try_get("name")?,
            description: row.try_get("description")?,
            brand: row.try_get("brand")?,
            category: row.try_get("category")?,
            image_url: row.try_get("image_url")?,
            price: Money::from_cents(row.try_get("price_cents")?),
            stock: row.try_get::<i32, _>("stock")? as u32,
            active: row.try_get("active")?,
            created_at: row.try_get("created_at")?,
        })
    }

    fn row_to_user(row: PgRow) -> Result<User> {
        Ok(User {
            id: UserId::from_uuid(row.try_get::<Uuid, _>("id")?),
            name: row.try_get("name")?,
            email: row.try_get("email")?,
            password_hash: row.try_get("password_hash")?,
            phone: row.try_get("phone")?,
            address: row.try_get("address")?,
            role: row
                .try_get::<String, _>("role")?
                .parse()
                .map_err(StoreError::CorruptRow)?,
            created_at: row.try_get("created_at")?,
        })
    }

    fn row_to_order(row: PgRow) -> Result<Order> {
        Ok(Order {
            id: OrderId::from_uuid(row.try_get::<Uuid, _>("id")?),
            user_id: UserId::from_uuid(row.try_get::<Uuid, _>("user_id")?),
            total: Money::from_cents(row.try_get("total_cents")?),
            payment_method: row.try_get("payment_method")?,
            delivery_address: row.try_get("delivery_address")?,
            delivery_type: row.try_get("delivery_type")?,
            status: row
                .try_get::<String, _>("status")?
                .parse()
                .map_err(|e: common::ParseStatusError| StoreError::CorruptRow(e.to_string()))?,
            created_at: row.try_get("created_at")?,
        })
    }

    fn row_to_cart_entry(row: PgRow) -> Result<CartEntry> {
        Ok(CartEntry {
            line: CartLine {
                id: CartLineId::from_uuid(row.try_get::<Uuid, _>("id")?),
                user_id: UserId::from_uuid(row.try_get::<Uuid, _>("user_id")?),
                product_id: ProductId::from_uuid(row.try_get::<Uuid, _>("product_id")?),
                quantity: row.try_get::<i32, _>("quantity")? as u32,
            },
            product_name: row.try_get("name")?,
            unit_price: Money::from_cents(row.try_get("price_cents")?),
            stock: row.try_get::<i32, _>("stock")? as u32,
            active: row.try_get("active")?,
        })
    }
}

#[async_trait]
impl ShopStore for PostgresStore {
    async fn insert_user(&self, user: NewUser) -> Result<UserId> {
        let id = UserId::new();
        sqlx::query(
            "INSERT INTO users (id, name, email, password_hash, phone, address, role) \
             VALUES ($1, $2, $3, $4, $5, $6, $7)",
        )
        .bind(id.as_uuid())
        .bind(&user.name)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(&user.phone)
        .bind(&user.address)
        .bind(user.role.as_str())
        .execute(&self.pool)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(ref db_err) = e
                && db_err.constraint() == Some("users_email_key")
            {
                return StoreError::DuplicateEmail;
            }
            StoreError::Database(e)
        })?;
        Ok(id)
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>> {
        let row = sqlx::query(&format!("SELECT {USER_COLUMNS} FROM users WHERE email = $1"))
            .bind(email)
            .fetch_optional(&self.pool)
            .await?;
        row.map(Self::row_to_user).transpose()
    }

    async fn get_user(&self, id: UserId) -> Result<Option<User>> {
        let row = sqlx::query(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1"))
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await?;
        row.map(Self::row_to_user).transpose()
    }

    async fn count_users(&self) -> Result<u64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users")
            .fetch_one(&self.pool)
            .await?;
        Ok(count as u64)
    }

    async fn insert_product(&self, product: NewProduct) -> Result<ProductId> {
        let id = ProductId::new();
        sqlx::query(
            "INSERT INTO products (id, name, description, brand, category, image_url, price_cents, stock, active) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)",
        )
        .bind(id.as_uuid())
        .bind(&product.name)
        .bind(&product.description)
        .bind(&product.brand)
        .bind(&product.category)
        .bind(&product.image_url)
        .bind(product.price.cents())
        .bind(product.stock as i32)
        .bind(product.active)
        .execute(&self.pool)
        .await?;
        Ok(id)
    }

    async fn update_product(&self, id: ProductId, update: ProductUpdate) -> Result<bool> {
        let result = sqlx::query(
            "UPDATE products SET name = $2, description = $3, brand = $4, category = $5, \
             image_url = $6, price_cents = $7, stock = $8, active = $9 WHERE id = $1",
        )
        .bind(id.as_uuid())
        .bind(&update.name)
        .bind(&update.description)
        .bind(&update.brand)
        .bind(&update.category)
        .bind(&update.image_url)
        .bind(update.price.cents())
        .bind(update.stock as i32)
        .bind(update.active)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete_product(&self, id: ProductId) -> Result<bool> {
        let result = sqlx::query("DELETE FROM products WHERE id = $1")
            .bind(id.as_uuid())
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn set_product_active(&self, id: ProductId, active: bool) -> Result<bool> {
        let result = sqlx::query("UPDATE products SET active = $2 WHERE id = $1")
            .bind(id.as_uuid())
            .bind(active)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn get_product(&self, id: ProductId) -> Result<Option<Product>> {
        let row = sqlx::query(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products WHERE id = $1"
        ))
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await?;
        row.map(Self::row_to_product).transpose()
    }

    async fn list_products(&self, filter: ProductFilter) -> Result<Vec<Product>> {
        let sql = if filter.active_only {
            format!(
                "SELECT {PRODUCT_COLUMNS} FROM products WHERE active = TRUE \
                 ORDER BY created_at DESC, name ASC"
            )
        } else {
            format!("SELECT {PRODUCT_COLUMNS} FROM products ORDER BY created_at DESC, name ASC")
        };
        let rows = sqlx::query(&sql).fetch_all(&self.pool).await?;
        rows.into_iter().map(Self::row_to_product).collect()
    }

    async fn count_products(&self) -> Result<u64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM products")
            .fetch_one(&self.pool)
            .await?;
        Ok(count as u64)
    }

    async fn list_cart(&self, user_id: UserId) -> Result<Vec<CartEntry>> {
        let rows = sqlx::query(&format!(
            "SELECT {CART_ENTRY_COLUMNS} FROM cart_lines c \
             JOIN products p ON p.id = c.product_id \
             WHERE c.user_id = $1 ORDER BY p.name"
        ))
        .bind(user_id.as_uuid())
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(Self::row_to_cart_entry).collect()
    }

    async fn find_cart_line(
        &self,
        user_id: UserId,
        product_id: ProductId,
    ) -> Result<Option<CartLine>> {
        let row = sqlx::query(
            "SELECT id, user_id, product_id, quantity FROM cart_lines \
             WHERE user_id = $1 AND product_id = $2",
        )
        .bind(user_id.as_uuid())
        .bind(product_id.as_uuid())
        .fetch_optional(&self.pool)
        .await?;
        Ok(row
            .map(|row| -> Result<CartLine> {
                Ok(CartLine {
                    id: CartLineId::from_uuid(row.try_get::<Uuid, _>("id")?),
                    user_id: UserId::from_uuid(row.try_get::<Uuid, _>("user_id")?),
                    product_id: ProductId::from_uuid(row.try_get::<Uuid, _>("product_id")?),
                    quantity: row.try_get::<i32, _>("quantity")? as u32,
                })
            })
            .transpose()?)
    }

    async fn find_cart_entry(
        &self,
        user_id: UserId,
        line_id: CartLineId,
    ) -> Result<Option<CartEntry>> {
        let row = sqlx::query(&format!(
            "SELECT {CART_ENTRY_COLUMNS} FROM cart_lines c \
             JOIN products p ON p.id = c.product_id \
             WHERE c.user_id = $1 AND c.id = $2"
        ))
        .bind(user_id.as_uuid())
        .bind(line_id.as_uuid())
        .fetch_optional(&self.pool)
        .await?;
        row.map(Self::row_to_cart_entry).transpose()
    }

    async fn insert_cart_line(
        &self,
        user_id: UserId,
        product_id: ProductId,
        quantity: u32,
    ) -> Result<CartLineId> {
        let id = CartLineId::new();
        sqlx::query(
            "INSERT INTO cart_lines (id, user_id, product_id, quantity) VALUES ($1, $2, $3, $4)",
        )
        .bind(id.as_uuid())
        .bind(user_id.as_uuid())
        .bind(product_id.as_uuid())
        .bind(quantity as i32)
        .execute(&self.pool)
        .await?;
        Ok(id)
    }

    async fn set_cart_line_quantity(&self, line_id: CartLineId, quantity: u32) -> Result<bool> {
        let result = sqlx::query("UPDATE cart_lines SET quantity = $2 WHERE id = $1")
            .bind(line_id.as_uuid())
            .bind(quantity as i32)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete_cart_line(&self, user_id: UserId, line_id: CartLineId) -> Result<bool> {
        let result = sqlx::query("DELETE FROM cart_lines WHERE id = $1 AND user_id = $2")
            .bind(line_id.as_uuid())
            .bind(user_id.as_uuid())
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn clear_cart(&self, user_id: UserId) -> Result<()> {
        sqlx::query("DELETE FROM cart_lines WHERE user_id = $1")
            .bind(user_id.as_uuid())
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn cart_quantity(&self, user_id: UserId) -> Result<u32> {
        let total: i64 = sqlx::query_scalar(
            "SELECT COALESCE(SUM(quantity), 0) FROM cart_lines WHERE user_id = $1",
        )
        .bind(user_id.as_uuid())
        .fetch_one(&self.pool)
        .await?;
        Ok(total as u32)
    }

    async fn commit_checkout(
        &self,
        draft: OrderDraft,
        lines: Vec<OrderLineDraft>,
    ) -> Result<OrderId> {
        let mut tx = self.pool.begin().await?;

        let order_id = OrderId::new();
        sqlx::query(
            "INSERT INTO orders (id, user_id, total_cents, payment_method, delivery_address, delivery_type, status) \
             VALUES ($1, $2, $3, $4, $5, $6, $7)",
        )
        .bind(order_id.as_uuid())
        .bind(draft.user_id.as_uuid())
        .bind(draft.total.cents())
        .bind(&draft.payment_method)
        .bind(&draft.delivery_address)
        .bind(&draft.delivery_type)
        .bind(OrderStatus::Processing.as_str())
        .execute(&mut *tx)
        .await?;

        for line in &lines {
            sqlx::query(
                "INSERT INTO order_lines (id, order_id, product_id, product_name, quantity, unit_price_cents) \
                 VALUES ($1, $2, $3, $4, $5, $6)",
            )
            .bind(Uuid::new_v4())
            .bind(order_id.as_uuid())
            .bind(line.product_id.as_uuid())
            .bind(&line.product_name)
            .bind(line.quantity as i32)
            .bind(line.unit_price.cents())
            .execute(&mut *tx)
            .await?;

            // Conditional decrement: zero rows means the stock check
            // lost a race, and dropping the transaction rolls every
            // prior step back.
            let updated =
                sqlx::query("UPDATE products SET stock = stock - $2 WHERE id = $1 AND stock >= $2")
                    .bind(line.product_id.as_uuid())
                    .bind(line.quantity as i32)
                    .execute(&mut *tx)
                    .await?;
            if updated.rows_affected() == 0 {
                return Err(StoreError::InsufficientStock {
                    product_id: line.product_id,
                });
            }
        }

        sqlx::query("DELETE FROM cart_lines WHERE user_id = $1")
            .bind(draft.user_id.as_uuid())
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(order_id)
    }

    async fn get_order(&self, id: OrderId) -> Result<Option<Order>> {
        let row = sqlx::query(&format!("SELECT {ORDER_COLUMNS} FROM orders WHERE id = $1"))
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await?;
        row.map(Self::row_to_order).transpose()
    }

    async fn list_orders(&self, filter: OrderFilter) -> Result<Vec<Order>> {
        let rows = match filter.user_id {
            Some(user_id) => {
                sqlx::query(&format!(
                    "SELECT {ORDER_COLUMNS} FROM orders WHERE user_id = $1 ORDER BY created_at DESC"
                ))
                .bind(user_id.as_uuid())
                .fetch_all(&self.pool)
                .await?
            }
            None => {
                sqlx::query(&format!(
                    "SELECT {ORDER_COLUMNS} FROM orders ORDER BY created_at DESC"
                ))
                .fetch_all(&self.pool)
                .await?
            }
        };
        rows.into_iter().map(Self::row_to_order).collect()
    }

    async fn recent_orders(&self, limit: u32) -> Result<Vec<Order>> {
        let rows = sqlx::query(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders ORDER BY created_at DESC LIMIT $1"
        ))
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(Self::row_to_order).collect()
    }

    async fn count_orders(&self) -> Result<u64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM orders")
            .fetch_one(&self.pool)
            .await?;
        Ok(count as u64)
    }

    async fn order_lines(&self, order_id: OrderId) -> Result<Vec<OrderLine>> {
        let rows = sqlx::query(
            "SELECT order_id, product_id, product_name, quantity, unit_price_cents \
             FROM order_lines WHERE order_id = $1",
        )
        .bind(order_id.as_uuid())
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter()
            .map(|row| -> Result<OrderLine> {
                Ok(OrderLine {
                    order_id: OrderId::from_uuid(row.try_get::<Uuid, _>("order_id")?),
                    product_id: ProductId::from_uuid(row.try_get::<Uuid, _>("product_id")?),
                    product_name: row.try_get("product_name")?,
                    quantity: row.try_get::<i32, _>("quantity")? as u32,
                    unit_price: Money::from_cents(row.try_get("unit_price_cents")?),
                })
            })
            .collect()
    }

    async fn set_order_status(
        &self,
        id: OrderId,
        from: OrderStatus,
        to: OrderStatus,
    ) -> Result<bool> {
        let result = sqlx::query("UPDATE orders SET status = $3 WHERE id = $1 AND status = $2")
            .bind(id.as_uuid())
            .bind(from.as_str())
            .bind(to.as_str())
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn complete_order(&self, id: OrderId) -> Result<bool> {
        let result =
            sqlx::query("UPDATE orders SET status = $2 WHERE id = $1 AND status IN ($3, $4)")
                .bind(id.as_uuid())
                .bind(OrderStatus::Completed.as_str())
                .bind(OrderStatus::Pending.as_str())
                .bind(OrderStatus::Processing.as_str())
                .execute(&self.pool)
                .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn cancel_order(&self, id: OrderId) -> Result<bool> {
        let mut tx = self.pool.begin().await?;

        let updated =
            sqlx::query("UPDATE orders SET status = $2 WHERE id = $1 AND status IN ($3, $4)")
                .bind(id.as_uuid())
                .bind(OrderStatus::Cancelled.as_str())
                .bind(OrderStatus::Pending.as_str())
                .bind(OrderStatus::Processing.as_str())
                .execute(&mut *tx)
                .await?;
        if updated.rows_affected() == 0 {
            return Ok(false);
        }

        // Inverse of checkout's decrement; products deleted since the
        // order was placed simply drop out of the join.
        sqlx::query(
            "UPDATE products p SET stock = p.stock + l.quantity \
             FROM order_lines l WHERE l.order_id = $1 AND p.id = l.product_id",
        )
        .bind(id.as_uuid())
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(true)
    }
}
