//! Cart maintenance: line merging and the stock ceiling.

use common::{CartEntry, CartLineId, Money, Principal, ProductId};
use store::ShopStore;

use crate::error::ShopError;

/// A user's cart with its running subtotal (tax is applied at
/// checkout, not here).
#[derive(Debug, Clone)]
pub struct CartView {
    pub entries: Vec<CartEntry>,
    pub subtotal: Money,
}

/// Maintains the cart invariants: one line per (user, product), and no
/// line quantity above the product's current stock.
pub struct CartService<S> {
    store: S,
}

impl<S: ShopStore> CartService<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Adds a product to the caller's cart, merging with an existing
    /// line. Returns the user's total cart quantity for the UI badge.
    #[tracing::instrument(skip(self), fields(user_id = %principal.user_id))]
    pub async fn add_to_cart(
        &self,
        principal: Principal,
        product_id: ProductId,
        quantity: u32,
    ) -> Result<u32, ShopError> {
        if quantity < 1 {
            return Err(ShopError::InvalidQuantity { quantity });
        }

        let product = self
            .store
            .get_product(product_id)
            .await?
            .ok_or(ShopError::ProductUnavailable { product_id })?;
        if !product.active || product.stock == 0 {
            return Err(ShopError::ProductUnavailable { product_id });
        }

        match self
            .store
            .find_cart_line(principal.user_id, product_id)
            .await?
        {
            Some(line) => {
                let merged = line.quantity + quantity;
                if merged > product.stock {
                    // the existing line is left unchanged
                    return Err(ShopError::InsufficientStock { product_id });
                }
                self.store.set_cart_line_quantity(line.id, merged).await?;
            }
            None => {
                if quantity > product.stock {
                    return Err(ShopError::InsufficientStock { product_id });
                }
                self.store
                    .insert_cart_line(principal.user_id, product_id, quantity)
                    .await?;
            }
        }

        Ok(self.store.cart_quantity(principal.user_id).await?)
    }

    /// Overwrites a line's quantity, still subject to the stock ceiling.
    #[tracing::instrument(skip(self), fields(user_id = %principal.user_id))]
    pub async fn update_quantity(
        &self,
        principal: Principal,
        line_id: CartLineId,
        quantity: u32,
    ) -> Result<(), ShopError> {
        if quantity < 1 {
            return Err(ShopError::InvalidQuantity { quantity });
        }

        let entry = self
            .store
            .find_cart_entry(principal.user_id, line_id)
            .await?
            .ok_or(ShopError::NotFound("cart line"))?;
        if quantity > entry.stock {
            return Err(ShopError::InsufficientStock {
                product_id: entry.line.product_id,
            });
        }

        self.store.set_cart_line_quantity(line_id, quantity).await?;
        Ok(())
    }

    /// Removes a line owned by the caller. Returns the remaining cart
    /// quantity.
    #[tracing::instrument(skip(self), fields(user_id = %principal.user_id))]
    pub async fn remove_line(
        &self,
        principal: Principal,
        line_id: CartLineId,
    ) -> Result<u32, ShopError> {
        if !self
            .store
            .delete_cart_line(principal.user_id, line_id)
            .await?
        {
            return Err(ShopError::NotFound("cart line"));
        }
        Ok(self.store.cart_quantity(principal.user_id).await?)
    }

    /// The caller's cart with its subtotal.
    pub async fn view_cart(&self, principal: Principal) -> Result<CartView, ShopError> {
        let entries = self.store.list_cart(principal.user_id).await?;
        let subtotal: Money = entries.iter().map(|e| e.line_total()).sum();
        Ok(CartView { entries, subtotal })
    }
}

#[cfg(test)]
mod tests {
    use common::{Role, UserId};
    use store::{MemoryStore, NewProduct, ShopStore};

    use super::*;

    async fn seed_product(store: &MemoryStore, stock: u32, active: bool) -> ProductId {
        store
            .insert_product(NewProduct {
                name: "Widget".to_string(),
                description: None,
                brand: None,
                category: None,
                image_url: None,
                price: Money::from_cents(1000),
                stock,
                active,
            })
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn add_merges_existing_line() {
        let store = MemoryStore::new();
        let service = CartService::new(store.clone());
        let principal = Principal::customer(UserId::new());
        let product_id = seed_product(&store, 10, true).await;

        assert_eq!(
            service.add_to_cart(principal, product_id, 2).await.unwrap(),
            2
        );
        assert_eq!(
            service.add_to_cart(principal, product_id, 3).await.unwrap(),
            5
        );

        let view = service.view_cart(principal).await.unwrap();
        assert_eq!(view.entries.len(), 1);
        assert_eq!(view.entries[0].line.quantity, 5);
        assert_eq!(view.subtotal.cents(), 5000);
    }

    #[tokio::test]
    async fn merge_beyond_stock_leaves_line_unchanged() {
        let store = MemoryStore::new();
        let service = CartService::new(store.clone());
        let principal = Principal::customer(UserId::new());
        let product_id = seed_product(&store, 5, true).await;

        service.add_to_cart(principal, product_id, 3).await.unwrap();
        let err = service
            .add_to_cart(principal, product_id, 3)
            .await
            .unwrap_err();
        assert!(matches!(err, ShopError::InsufficientStock { .. }));

        let view = service.view_cart(principal).await.unwrap();
        assert_eq!(view.entries[0].line.quantity, 3);
    }

    #[tokio::test]
    async fn inactive_or_out_of_stock_products_are_unavailable() {
        let store = MemoryStore::new();
        let service = CartService::new(store.clone());
        let principal = Principal::customer(UserId::new());

        let inactive = seed_product(&store, 10, false).await;
        let sold_out = seed_product(&store, 0, true).await;

        for product_id in [inactive, sold_out] {
            let err = service
                .add_to_cart(principal, product_id, 1)
                .await
                .unwrap_err();
            assert!(matches!(err, ShopError::ProductUnavailable { .. }));
        }
    }

    #[tokio::test]
    async fn zero_quantity_is_invalid() {
        let store = MemoryStore::new();
        let service = CartService::new(store.clone());
        let principal = Principal::customer(UserId::new());
        let product_id = seed_product(&store, 10, true).await;

        let err = service
            .add_to_cart(principal, product_id, 0)
            .await
            .unwrap_err();
        assert!(matches!(err, ShopError::InvalidQuantity { quantity: 0 }));

        service.add_to_cart(principal, product_id, 1).await.unwrap();
        let line_id = service.view_cart(principal).await.unwrap().entries[0].line.id;
        let err = service
            .update_quantity(principal, line_id, 0)
            .await
            .unwrap_err();
        assert!(matches!(err, ShopError::InvalidQuantity { quantity: 0 }));
    }

    #[tokio::test]
    async fn update_respects_stock_ceiling() {
        let store = MemoryStore::new();
        let service = CartService::new(store.clone());
        let principal = Principal::customer(UserId::new());
        let product_id = seed_product(&store, 4, true).await;

        service.add_to_cart(principal, product_id, 1).await.unwrap();
        let line_id = service.view_cart(principal).await.unwrap().entries[0].line.id;

        service.update_quantity(principal, line_id, 4).await.unwrap();
        let err = service
            .update_quantity(principal, line_id, 5)
            .await
            .unwrap_err();
        assert!(matches!(err, ShopError::InsufficientStock { .. }));
    }

    #[tokio::test]
    async fn lines_are_scoped_to_their_owner() {
        let store = MemoryStore::new();
        let service = CartService::new(store.clone());
        let owner = Principal::customer(UserId::new());
        let intruder = Principal {
            user_id: UserId::new(),
            role: Role::Customer,
        };
        let product_id = seed_product(&store, 10, true).await;

        service.add_to_cart(owner, product_id, 2).await.unwrap();
        let line_id = service.view_cart(owner).await.unwrap().entries[0].line.id;

        let err = service
            .update_quantity(intruder, line_id, 1)
            .await
            .unwrap_err();
        assert!(matches!(err, ShopError::NotFound(_)));
        let err = service.remove_line(intruder, line_id).await.unwrap_err();
        assert!(matches!(err, ShopError::NotFound(_)));

        // the owner can remove it, and a second removal reports NotFound
        assert_eq!(service.remove_line(owner, line_id).await.unwrap(), 0);
        let err = service.remove_line(owner, line_id).await.unwrap_err();
        assert!(matches!(err, ShopError::NotFound(_)));
    }
}
