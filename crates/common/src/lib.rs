//! Shared data model for the ChrisShop storefront.
//!
//! This crate holds everything the other workspace members agree on:
//! typed identifiers, money amounts, the order status state machine,
//! the request principal, and the entity records persisted by the store.

pub mod ids;
pub mod model;
pub mod money;
pub mod principal;
pub mod status;

pub use ids::{CartLineId, OrderId, ProductId, UserId};
pub use model::{CartEntry, CartLine, Order, OrderLine, Product, User};
pub use money::Money;
pub use principal::{Principal, Role};
pub use status::{OrderStatus, ParseStatusError};
