//! Per-order status tracking.

use async_trait::async_trait;

use kitchenflow_core::{DomainError, OrderId};
use kitchenflow_kitchen::{KitchenBoard, Order, OrderEvent};
use kitchenflow_events::EventBus;

use crate::config::SyncConfig;
use crate::error::FetchError;
use crate::service::{Subscription, SyncService};
use crate::source::SnapshotSource;

/// Reading straight from an in-process board.
#[async_trait]
impl<B> SnapshotSource for KitchenBoard<B>
where
    B: EventBus<OrderEvent> + 'static,
{
    type Key = OrderId;
    type Snapshot = Order;

    async fn fetch(&self, key: &OrderId) -> Result<Order, FetchError> {
        self.get(*key).map_err(|e| match e {
            DomainError::NotFound => FetchError::NotFound,
            other => FetchError::Unavailable(other.to_string()),
        })
    }
}

/// Order-by-id subscriptions on a short polling interval.
pub struct OrderTracker<S>
where
    S: SnapshotSource<Key = OrderId, Snapshot = Order>,
{
    service: SyncService<S>,
}

impl<S> OrderTracker<S>
where
    S: SnapshotSource<Key = OrderId, Snapshot = Order>,
{
    pub fn new(source: S) -> Self {
        Self::with_config(source, SyncConfig::orders())
    }

    pub fn with_config(source: S, config: SyncConfig) -> Self {
        Self {
            service: SyncService::new(source, config),
        }
    }

    /// Call `callback` with the order now and whenever it changes.
    pub fn subscribe_to_order<F>(&self, order_id: OrderId, callback: F) -> Subscription
    where
        F: Fn(&Order) + Send + Sync + 'static,
    {
        self.service.subscribe(order_id, callback)
    }

    /// Push the current state to subscribers right after a local mutation
    /// instead of waiting for the next tick.
    pub async fn refresh(&self, order_id: OrderId) -> Result<(), FetchError> {
        self.service.refresh(&order_id).await
    }

    pub fn service(&self) -> &SyncService<S> {
        &self.service
    }
}
