//! Broadcast inventory alert monitoring.
//!
//! Every tick reads the inventory snapshot and re-derives alerts through one
//! shared [`AlertEngine`], so acknowledgements survive re-derivation.

use std::sync::{Mutex, MutexGuard, PoisonError, RwLock};

use async_trait::async_trait;
use chrono::Utc;

use kitchenflow_inventory::{AlertEngine, AlertId, InventoryAlert, InventoryItem};

use crate::config::SyncConfig;
use crate::error::{FetchError, SyncError};
use crate::service::{Subscription, SyncService};
use crate::source::SnapshotSource;

/// Where inventory snapshots come from and acknowledgements go to.
#[async_trait]
pub trait InventorySource: Send + Sync + 'static {
    async fn inventory_items(&self) -> Result<Vec<InventoryItem>, FetchError>;

    /// Forward an acknowledgement to the remote, if it keeps one.
    async fn acknowledge_alert(&self, _alert_id: &AlertId) -> Result<(), FetchError> {
        Ok(())
    }
}

/// In-process inventory snapshot.
#[derive(Debug, Default)]
pub struct InventoryStore {
    items: RwLock<Vec<InventoryItem>>,
}

impl InventoryStore {
    pub fn new(items: Vec<InventoryItem>) -> Self {
        Self {
            items: RwLock::new(items),
        }
    }

    pub fn items(&self) -> Vec<InventoryItem> {
        self.items
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Replace the whole snapshot (stands in for external stock movements).
    pub fn replace(&self, items: Vec<InventoryItem>) {
        *self.items.write().unwrap_or_else(PoisonError::into_inner) = items;
    }

    /// Upsert one item by id.
    pub fn upsert(&self, item: InventoryItem) {
        let mut items = self.items.write().unwrap_or_else(PoisonError::into_inner);
        match items.iter_mut().find(|i| i.id == item.id) {
            Some(existing) => *existing = item,
            None => items.push(item),
        }
    }
}

#[async_trait]
impl InventorySource for InventoryStore {
    async fn inventory_items(&self) -> Result<Vec<InventoryItem>, FetchError> {
        Ok(self.items())
    }
}

#[async_trait]
impl<I> InventorySource for std::sync::Arc<I>
where
    I: InventorySource + ?Sized,
{
    async fn inventory_items(&self) -> Result<Vec<InventoryItem>, FetchError> {
        (**self).inventory_items().await
    }

    async fn acknowledge_alert(&self, alert_id: &AlertId) -> Result<(), FetchError> {
        (**self).acknowledge_alert(alert_id).await
    }
}

/// The single key of the broadcast alert subject.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AlertStream;

impl std::fmt::Display for AlertStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("broadcast")
    }
}

/// Inventory reads turned into alert sets.
pub struct AlertSource<I> {
    inventory: I,
    engine: Mutex<AlertEngine>,
}

impl<I: InventorySource> AlertSource<I> {
    pub fn new(inventory: I) -> Self {
        Self {
            inventory,
            engine: Mutex::new(AlertEngine::new()),
        }
    }

    pub fn inventory(&self) -> &I {
        &self.inventory
    }

    fn engine(&self) -> MutexGuard<'_, AlertEngine> {
        self.engine.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl<I: InventorySource> SnapshotSource for AlertSource<I> {
    type Key = AlertStream;
    type Snapshot = Vec<InventoryAlert>;

    async fn fetch(&self, _key: &AlertStream) -> Result<Vec<InventoryAlert>, FetchError> {
        let items = self.inventory.inventory_items().await?;
        Ok(self.engine().refresh(&items, Utc::now()).to_vec())
    }
}

/// Alert subscriptions on a long polling interval.
pub struct AlertMonitor<I: InventorySource> {
    service: SyncService<AlertSource<I>>,
}

impl<I: InventorySource> AlertMonitor<I> {
    pub fn new(inventory: I) -> Self {
        Self::with_config(inventory, SyncConfig::alerts())
    }

    pub fn with_config(inventory: I, config: SyncConfig) -> Self {
        Self {
            service: SyncService::new(AlertSource::new(inventory), config),
        }
    }

    /// Call `callback` with the alert set now and whenever it changes.
    pub fn subscribe_to_alerts<F>(&self, callback: F) -> Subscription
    where
        F: Fn(&Vec<InventoryAlert>) + Send + Sync + 'static,
    {
        self.service.subscribe(AlertStream, callback)
    }

    /// Current alerts as of the last derivation.
    pub fn alerts(&self) -> Vec<InventoryAlert> {
        self.service.source().engine().alerts().to_vec()
    }

    /// Current alerts, most severe first.
    pub fn ranked(&self) -> Vec<InventoryAlert> {
        self.service
            .source()
            .engine()
            .ranked()
            .into_iter()
            .cloned()
            .collect()
    }

    /// Unacknowledged alerts of severity `high` or worse.
    pub fn critical(&self) -> Vec<InventoryAlert> {
        self.service
            .source()
            .engine()
            .critical()
            .into_iter()
            .cloned()
            .collect()
    }

    /// Re-read inventory and notify subscribers if the alert set moved.
    pub async fn refresh(&self) -> Result<Vec<InventoryAlert>, FetchError> {
        self.service.refresh(&AlertStream).await?;
        Ok(self.alerts())
    }

    /// Acknowledge locally, forward to the remote, then refresh subscribers.
    ///
    /// The local acknowledgement stands even if the remote call fails.
    pub async fn acknowledge(&self, alert_id: &AlertId) -> Result<(), SyncError> {
        self.service.source().engine().acknowledge(alert_id)?;
        tracing::info!(alert_id = %alert_id, "alert acknowledged");

        self.service
            .source()
            .inventory()
            .acknowledge_alert(alert_id)
            .await?;
        self.service.refresh(&AlertStream).await?;
        Ok(())
    }

    pub fn service(&self) -> &SyncService<AlertSource<I>> {
        &self.service
    }
}
