//! Order queries and controlled status transitions.

use common::{Order, OrderId, OrderLine, OrderStatus, Principal};
use store::{OrderFilter, ShopStore};

use crate::access::{require_admin, require_customer};
use crate::error::ShopError;

/// An order together with its line items.
#[derive(Debug, Clone)]
pub struct OrderDetails {
    pub order: Order,
    pub lines: Vec<OrderLine>,
}

/// Read access to orders plus the two state-transition paths: the
/// admin status override and the customer cancel.
pub struct OrderService<S> {
    store: S,
}

impl<S: ShopStore> OrderService<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Admins see every order; customers see their own.
    pub async fn list_orders(&self, principal: Principal) -> Result<Vec<Order>, ShopError> {
        let filter = if principal.role.is_admin() {
            OrderFilter::default()
        } else {
            OrderFilter {
                user_id: Some(principal.user_id),
            }
        };
        Ok(self.store.list_orders(filter).await?)
    }

    /// Loads one order the caller may see. Another customer's order is
    /// reported as not found rather than forbidden, so order ids leak
    /// nothing.
    pub async fn get_order(
        &self,
        principal: Principal,
        id: OrderId,
    ) -> Result<Order, ShopError> {
        let order = self
            .store
            .get_order(id)
            .await?
            .ok_or(ShopError::NotFound("order"))?;
        if !principal.role.is_admin() && order.user_id != principal.user_id {
            return Err(ShopError::NotFound("order"));
        }
        Ok(order)
    }

    /// The order plus its snapshot line items.
    pub async fn order_details(
        &self,
        principal: Principal,
        id: OrderId,
    ) -> Result<OrderDetails, ShopError> {
        let order = self.get_order(principal, id).await?;
        let lines = self.store.order_lines(id).await?;
        Ok(OrderDetails { order, lines })
    }

    /// Admin status override. The transition table is enforced; stock
    /// is never touched on this path.
    #[tracing::instrument(skip(self))]
    pub async fn set_status(
        &self,
        principal: Principal,
        id: OrderId,
        new_status: OrderStatus,
    ) -> Result<(), ShopError> {
        require_admin(principal)?;

        let order = self
            .store
            .get_order(id)
            .await?
            .ok_or(ShopError::NotFound("order"))?;
        if !order.status.can_transition_to(new_status) {
            return Err(ShopError::IllegalTransition {
                from: order.status,
                to: new_status,
            });
        }

        // Conditional on the status we just checked; a lost race shows
        // up as an illegal transition rather than a silent overwrite.
        if !self
            .store
            .set_order_status(id, order.status, new_status)
            .await?
        {
            return Err(ShopError::IllegalTransition {
                from: order.status,
                to: new_status,
            });
        }

        metrics::counter!("order_status_changes_total").increment(1);
        tracing::info!(order_id = %id, status = %new_status, "order status changed");
        Ok(())
    }

    /// Customer cancel, restricted to the order's owner and to the
    /// pending/processing statuses. Restores every line's quantity onto
    /// product stock, atomically with the status change.
    #[tracing::instrument(skip(self), fields(user_id = %principal.user_id))]
    pub async fn cancel(&self, principal: Principal, id: OrderId) -> Result<(), ShopError> {
        require_customer(principal)?;

        let order = self
            .store
            .get_order(id)
            .await?
            .ok_or(ShopError::NotFound("order"))?;
        if order.user_id != principal.user_id {
            return Err(ShopError::NotFound("order"));
        }
        if !order.status.can_cancel() {
            return Err(ShopError::NotCancellable {
                status: order.status,
            });
        }

        if !self.store.cancel_order(id).await? {
            // settled (or cancelled) between the check and the update
            return Err(ShopError::NotCancellable {
                status: order.status,
            });
        }

        metrics::counter!("orders_cancelled_total").increment(1);
        tracing::info!(order_id = %id, "order cancelled, stock restored");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use common::{Money, UserId};
    use store::{MemoryStore, NewProduct, OrderDraft, OrderLineDraft, ShopStore};

    use super::*;

    async fn place_order(store: &MemoryStore, user_id: UserId, quantity: u32) -> OrderId {
        let product_id = store
            .insert_product(NewProduct {
                name: "Widget".to_string(),
                description: None,
                brand: None,
                category: None,
                image_url: None,
                price: Money::from_cents(1000),
                stock: 10,
                active: true,
            })
            .await
            .unwrap();
        store
            .commit_checkout(
                OrderDraft {
                    user_id,
                    total: Money::from_cents(i64::from(quantity) * 1160),
                    payment_method: "card".to_string(),
                    delivery_address: "123 Main St".to_string(),
                    delivery_type: "delivery".to_string(),
                },
                vec![OrderLineDraft {
                    product_id,
                    product_name: "Widget".to_string(),
                    quantity,
                    unit_price: Money::from_cents(1000),
                }],
            )
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn listings_are_scoped_by_role() {
        let store = MemoryStore::new();
        let service = OrderService::new(store.clone());
        let ana = UserId::new();
        let bob = UserId::new();
        place_order(&store, ana, 1).await;
        place_order(&store, bob, 1).await;

        let admin = Principal::admin(UserId::new());
        assert_eq!(service.list_orders(admin).await.unwrap().len(), 2);
        assert_eq!(
            service
                .list_orders(Principal::customer(ana))
                .await
                .unwrap()
                .len(),
            1
        );
    }

    #[tokio::test]
    async fn foreign_orders_read_as_not_found() {
        let store = MemoryStore::new();
        let service = OrderService::new(store.clone());
        let owner = UserId::new();
        let order_id = place_order(&store, owner, 1).await;

        let err = service
            .get_order(Principal::customer(UserId::new()), order_id)
            .await
            .unwrap_err();
        assert!(matches!(err, ShopError::NotFound(_)));

        // admins can read anything
        let order = service
            .get_order(Principal::admin(UserId::new()), order_id)
            .await
            .unwrap();
        assert_eq!(order.user_id, owner);
    }

    #[tokio::test]
    async fn set_status_enforces_the_transition_table() {
        let store = MemoryStore::new();
        let service = OrderService::new(store.clone());
        let admin = Principal::admin(UserId::new());
        let order_id = place_order(&store, UserId::new(), 1).await;

        // processing -> pending is not a legal move
        let err = service
            .set_status(admin, order_id, OrderStatus::Pending)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ShopError::IllegalTransition {
                from: OrderStatus::Processing,
                to: OrderStatus::Pending
            }
        ));

        service
            .set_status(admin, order_id, OrderStatus::Completed)
            .await
            .unwrap();
        let order = store.get_order(order_id).await.unwrap().unwrap();
        assert_eq!(order.status, OrderStatus::Completed);

        // terminal: nothing further is allowed
        let err = service
            .set_status(admin, order_id, OrderStatus::Processing)
            .await
            .unwrap_err();
        assert!(matches!(err, ShopError::IllegalTransition { .. }));
    }

    #[tokio::test]
    async fn set_status_requires_admin() {
        let store = MemoryStore::new();
        let service = OrderService::new(store.clone());
        let order_id = place_order(&store, UserId::new(), 1).await;

        let err = service
            .set_status(
                Principal::customer(UserId::new()),
                order_id,
                OrderStatus::Completed,
            )
            .await
            .unwrap_err();
        assert!(matches!(err, ShopError::Unauthorized(_)));
    }

    #[tokio::test]
    async fn cancel_is_owner_only_and_status_gated() {
        let store = MemoryStore::new();
        let service = OrderService::new(store.clone());
        let owner = UserId::new();
        let order_id = place_order(&store, owner, 2).await;

        // not the owner: not found
        let err = service
            .cancel(Principal::customer(UserId::new()), order_id)
            .await
            .unwrap_err();
        assert!(matches!(err, ShopError::NotFound(_)));

        // admins use set_status, not the cancel path
        let err = service
            .cancel(Principal::admin(UserId::new()), order_id)
            .await
            .unwrap_err();
        assert!(matches!(err, ShopError::Unauthorized(_)));

        service.cancel(Principal::customer(owner), order_id).await.unwrap();
        let order = store.get_order(order_id).await.unwrap().unwrap();
        assert_eq!(order.status, OrderStatus::Cancelled);
    }

    #[tokio::test]
    async fn completed_orders_are_not_cancellable() {
        let store = MemoryStore::new();
        let service = OrderService::new(store.clone());
        let owner = UserId::new();
        let order_id = place_order(&store, owner, 2).await;
        store.complete_order(order_id).await.unwrap();
        let stock_before = {
            let lines = store.order_lines(order_id).await.unwrap();
            store
                .get_product(lines[0].product_id)
                .await
                .unwrap()
                .unwrap()
                .stock
        };

        let err = service
            .cancel(Principal::customer(owner), order_id)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ShopError::NotCancellable {
                status: OrderStatus::Completed
            }
        ));

        // stock and status are untouched
        let order = store.get_order(order_id).await.unwrap().unwrap();
        assert_eq!(order.status, OrderStatus::Completed);
        let lines = store.order_lines(order_id).await.unwrap();
        let stock_after = store
            .get_product(lines[0].product_id)
            .await
            .unwrap()
            .unwrap()
            .stock;
        assert_eq!(stock_after, stock_before);
    }
}
