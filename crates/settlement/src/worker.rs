//! The settlement queue and its background worker.

use std::time::Duration;

use common::OrderId;
use domain::SettlementScheduler;
use store::ShopStore;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::task::{JoinHandle, JoinSet};

/// Tuning for the settlement worker.
#[derive(Debug, Clone)]
pub struct SettlementConfig {
    /// Simulated payment-gateway round-trip time.
    pub delay: Duration,
    /// Retries after a storage failure before giving up on an order.
    pub max_retries: u32,
    /// Pause between retries.
    pub retry_backoff: Duration,
}

impl Default for SettlementConfig {
    fn default() -> Self {
        Self {
            delay: Duration::from_millis(2000),
            max_retries: 3,
            retry_backoff: Duration::from_millis(500),
        }
    }
}

/// Cloneable handle used to enqueue orders for settlement.
#[derive(Clone)]
pub struct SettlementQueue {
    tx: UnboundedSender<OrderId>,
}

impl SettlementScheduler for SettlementQueue {
    fn schedule(&self, order_id: OrderId) {
        // The worker holds the receiver until every queue handle is
        // gone, so a failed send only happens during shutdown.
        if self.tx.send(order_id).is_err() {
            tracing::warn!(%order_id, "settlement queue closed, dropping request");
        }
    }
}

/// Background task that completes orders after the settlement delay.
///
/// Each order settles on its own timer; a burst of checkouts does not
/// serialize behind one delay.
pub struct SettlementWorker<S> {
    store: S,
    config: SettlementConfig,
    rx: UnboundedReceiver<OrderId>,
}

impl<S: ShopStore + Clone + 'static> SettlementWorker<S> {
    /// Creates the queue/worker pair and spawns the worker task.
    ///
    /// The task drains in-flight settlements and exits once every
    /// [`SettlementQueue`] handle has been dropped.
    pub fn spawn(store: S, config: SettlementConfig) -> (SettlementQueue, JoinHandle<()>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let worker = SettlementWorker { store, config, rx };
        let handle = tokio::spawn(worker.run());
        (SettlementQueue { tx }, handle)
    }

    async fn run(mut self) {
        let mut in_flight = JoinSet::new();
        loop {
            tokio::select! {
                msg = self.rx.recv() => match msg {
                    Some(order_id) => {
                        let store = self.store.clone();
                        let config = self.config.clone();
                        in_flight.spawn(async move {
                            tokio::time::sleep(config.delay).await;
                            settle(&store, &config, order_id).await;
                        });
                    }
                    None => break,
                },
                Some(_) = in_flight.join_next(), if !in_flight.is_empty() => {}
            }
        }
        while in_flight.join_next().await.is_some() {}
        tracing::debug!("settlement queue closed, worker exiting");
    }
}

/// Attempts the conditional completion, retrying storage failures.
async fn settle<S: ShopStore>(store: &S, config: &SettlementConfig, order_id: OrderId) {
    for attempt in 0..=config.max_retries {
        match store.complete_order(order_id).await {
            Ok(true) => {
                metrics::counter!("orders_settled_total").increment(1);
                tracing::info!(%order_id, "order settled");
                return;
            }
            Ok(false) => {
                // Cancelled or already completed; nothing to do.
                tracing::info!(%order_id, "order no longer settleable, skipping");
                return;
            }
            Err(e) if attempt < config.max_retries => {
                metrics::counter!("settlement_retries_total").increment(1);
                tracing::warn!(%order_id, attempt, error = %e, "settlement attempt failed, retrying");
                tokio::time::sleep(config.retry_backoff).await;
            }
            Err(e) => {
                metrics::counter!("settlement_failures_total").increment(1);
                tracing::error!(%order_id, error = %e, "settlement failed after retries, giving up");
                return;
            }
        }
    }
}
