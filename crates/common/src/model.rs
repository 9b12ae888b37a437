//! Entity records persisted by the store.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ids::{CartLineId, OrderId, ProductId, UserId};
use crate::money::Money;
use crate::principal::Role;
use crate::status::OrderStatus;

/// A catalog product.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    pub description: Option<String>,
    pub brand: Option<String>,
    pub category: Option<String>,
    pub image_url: Option<String>,
    pub price: Money,
    pub stock: u32,
    pub active: bool,
    pub created_at: DateTime<Utc>,
}

/// A registered account. The password is stored only as an argon2 hash.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub role: Role,
    pub created_at: DateTime<Utc>,
}

/// One (user, product) row of an unchecked-out cart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartLine {
    pub id: CartLineId,
    pub user_id: UserId,
    pub product_id: ProductId,
    pub quantity: u32,
}

/// A cart line joined with the product fields cart logic needs:
/// display name, current price for totals, stock and active for the
/// quantity ceiling.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CartEntry {
    pub line: CartLine,
    pub product_name: String,
    pub unit_price: Money,
    pub stock: u32,
    pub active: bool,
}

impl CartEntry {
    /// Returns quantity × current unit price.
    pub fn line_total(&self) -> Money {
        self.unit_price.multiply(self.line.quantity)
    }
}

/// A finalized purchase. The total is tax-inclusive and never changes
/// after creation; only `status` moves, through the state machine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub user_id: UserId,
    pub total: Money,
    pub payment_method: String,
    pub delivery_address: String,
    pub delivery_type: String,
    pub status: OrderStatus,
    pub created_at: DateTime<Utc>,
}

/// A line of an order. `unit_price` and `product_name` are snapshots
/// taken at checkout, so later catalog edits never alter history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderLine {
    pub order_id: OrderId,
    pub product_id: ProductId,
    pub product_name: String,
    pub quantity: u32,
    pub unit_price: Money,
}

impl OrderLine {
    /// Returns quantity × snapshot unit price.
    pub fn line_total(&self) -> Money {
        self.unit_price.multiply(self.quantity)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cart_entry_line_total() {
        let entry = CartEntry {
            line: CartLine {
                id: CartLineId::new(),
                user_id: UserId::new(),
                product_id: ProductId::new(),
                quantity: 3,
            },
            product_name: "Widget".to_string(),
            unit_price: Money::from_cents(1000),
            stock: 10,
            active: true,
        };
        assert_eq!(entry.line_total().cents(), 3000);
    }

    #[test]
    fn order_line_total_uses_snapshot_price() {
        let line = OrderLine {
            order_id: OrderId::new(),
            product_id: ProductId::new(),
            product_name: "Widget".to_string(),
            quantity: 2,
            unit_price: Money::from_cents(10000),
        };
        assert_eq!(line.line_total().cents(), 20000);
    }
}
