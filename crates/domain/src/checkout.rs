//! Cart-to-order conversion.

use std::sync::Arc;

use common::{Money, OrderId, Principal};
use store::{OrderDraft, OrderLineDraft, ShopStore};

use crate::access::require_customer;
use crate::error::ShopError;

/// Sales tax (IVA) applied on top of the cart subtotal, in percent.
pub const TAX_RATE_PERCENT: i64 = 16;

/// Seam for scheduling the deferred payment-settlement step.
///
/// Checkout must not block on settlement, so the engine only hands the
/// order id to a scheduler and returns. The worker behind the scheduler
/// owns retries; its failures are logged, never surfaced to the caller.
pub trait SettlementScheduler: Send + Sync {
    /// Enqueues an order for settlement. Must not block.
    fn schedule(&self, order_id: OrderId);
}

/// Scheduler that drops every request, for contexts without a worker.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopScheduler;

impl SettlementScheduler for NoopScheduler {
    fn schedule(&self, _order_id: OrderId) {}
}

/// Checkout fields supplied by the customer.
#[derive(Debug, Clone)]
pub struct CheckoutRequest {
    pub payment_method: String,
    pub delivery_address: String,
    pub delivery_type: String,
}

/// Priced summary returned to the caller immediately; settlement
/// continues in the background.
#[derive(Debug, Clone, Copy)]
pub struct CheckoutReceipt {
    pub order_id: OrderId,
    pub subtotal: Money,
    pub tax: Money,
    pub total: Money,
}

/// Converts a user's cart into a priced, stock-adjusted order.
pub struct CheckoutEngine<S> {
    store: S,
    scheduler: Arc<dyn SettlementScheduler>,
}

impl<S: ShopStore> CheckoutEngine<S> {
    pub fn new(store: S, scheduler: Arc<dyn SettlementScheduler>) -> Self {
        Self { store, scheduler }
    }

    /// Places an order from the caller's cart.
    ///
    /// Prices and names are snapshotted into the order lines at this
    /// moment; the store applies the order insert, stock decrements and
    /// cart clearing as one atomic unit, so a failure leaves nothing
    /// behind.
    #[tracing::instrument(skip(self, request), fields(user_id = %principal.user_id))]
    pub async fn checkout(
        &self,
        principal: Principal,
        request: CheckoutRequest,
    ) -> Result<CheckoutReceipt, ShopError> {
        let started = std::time::Instant::now();
        require_customer(principal)?;

        if request.payment_method.trim().is_empty() {
            return Err(ShopError::Validation("payment method is required".into()));
        }
        if request.delivery_type.trim().is_empty() {
            return Err(ShopError::Validation("delivery type is required".into()));
        }

        let entries = self.store.list_cart(principal.user_id).await?;
        if entries.is_empty() {
            return Err(ShopError::EmptyCart);
        }

        let subtotal: Money = entries.iter().map(|e| e.line_total()).sum();
        let tax = subtotal.percentage(TAX_RATE_PERCENT);
        let total = subtotal + tax;

        let lines: Vec<OrderLineDraft> = entries
            .iter()
            .map(|e| OrderLineDraft {
                product_id: e.line.product_id,
                product_name: e.product_name.clone(),
                quantity: e.line.quantity,
                unit_price: e.unit_price,
            })
            .collect();

        let draft = OrderDraft {
            user_id: principal.user_id,
            total,
            payment_method: request.payment_method,
            delivery_address: request.delivery_address,
            delivery_type: request.delivery_type,
        };

        let order_id = match self.store.commit_checkout(draft, lines).await {
            Ok(id) => id,
            Err(e) => {
                metrics::counter!("checkout_failures_total").increment(1);
                return Err(e.into());
            }
        };

        self.scheduler.schedule(order_id);

        metrics::counter!("checkout_completed_total").increment(1);
        metrics::histogram!("checkout_duration_seconds").record(started.elapsed().as_secs_f64());
        tracing::info!(%order_id, total_cents = total.cents(), "order placed");

        Ok(CheckoutReceipt {
            order_id,
            subtotal,
            tax,
            total,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use common::{Money, Role, UserId};
    use store::{MemoryStore, NewProduct, ShopStore};

    use super::*;

    /// Scheduler that records every scheduled order id.
    #[derive(Default)]
    struct RecordingScheduler {
        scheduled: Mutex<Vec<OrderId>>,
    }

    impl SettlementScheduler for RecordingScheduler {
        fn schedule(&self, order_id: OrderId) {
            self.scheduled.lock().unwrap().push(order_id);
        }
    }

    fn request() -> CheckoutRequest {
        CheckoutRequest {
            payment_method: "card".to_string(),
            delivery_address: "123 Main St".to_string(),
            delivery_type: "delivery".to_string(),
        }
    }

    async fn seed_product(store: &MemoryStore, price_cents: i64, stock: u32) -> common::ProductId {
        store
            .insert_product(NewProduct {
                name: "Widget".to_string(),
                description: None,
                brand: None,
                category: None,
                image_url: None,
                price: Money::from_cents(price_cents),
                stock,
                active: true,
            })
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn totals_apply_sixteen_percent_tax() {
        let store = MemoryStore::new();
        let user_id = UserId::new();
        let product_id = seed_product(&store, 10000, 5).await;
        store.insert_cart_line(user_id, product_id, 2).await.unwrap();

        let engine = CheckoutEngine::new(store, Arc::new(NoopScheduler));
        let receipt = engine
            .checkout(Principal::customer(user_id), request())
            .await
            .unwrap();

        assert_eq!(receipt.subtotal.cents(), 20000);
        assert_eq!(receipt.tax.cents(), 3200);
        assert_eq!(receipt.total.cents(), 23200);
    }

    #[tokio::test]
    async fn empty_cart_is_rejected_without_persisting() {
        let store = MemoryStore::new();
        let engine = CheckoutEngine::new(store.clone(), Arc::new(NoopScheduler));

        let err = engine
            .checkout(Principal::customer(UserId::new()), request())
            .await
            .unwrap_err();
        assert!(matches!(err, ShopError::EmptyCart));
        assert_eq!(store.count_orders().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn admins_cannot_check_out() {
        let store = MemoryStore::new();
        let engine = CheckoutEngine::new(store, Arc::new(NoopScheduler));

        let err = engine
            .checkout(
                Principal {
                    user_id: UserId::new(),
                    role: Role::Admin,
                },
                request(),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, ShopError::Unauthorized(_)));
    }

    #[tokio::test]
    async fn missing_payment_method_is_rejected() {
        let store = MemoryStore::new();
        let engine = CheckoutEngine::new(store, Arc::new(NoopScheduler));

        let err = engine
            .checkout(
                Principal::customer(UserId::new()),
                CheckoutRequest {
                    payment_method: "  ".to_string(),
                    ..request()
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, ShopError::Validation(_)));
    }

    #[tokio::test]
    async fn settlement_is_scheduled_for_the_new_order() {
        let store = MemoryStore::new();
        let user_id = UserId::new();
        let product_id = seed_product(&store, 1000, 5).await;
        store.insert_cart_line(user_id, product_id, 1).await.unwrap();

        let scheduler = Arc::new(RecordingScheduler::default());
        let engine = CheckoutEngine::new(store, scheduler.clone());
        let receipt = engine
            .checkout(Principal::customer(user_id), request())
            .await
            .unwrap();

        assert_eq!(*scheduler.scheduled.lock().unwrap(), vec![receipt.order_id]);
    }
}
