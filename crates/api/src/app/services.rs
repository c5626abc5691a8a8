//! Service wiring: the kitchen board, the inventory snapshot and its alert
//! monitor, plus the optional on-disk inventory cache.

use std::sync::Arc;

use kitchenflow_inventory::{InventoryAlert, InventoryItem};
use kitchenflow_kitchen::{ActivityFeed, KitchenBoard};
use kitchenflow_sync::{AlertMonitor, FetchError, InventoryStore, SnapshotCache, SqliteCache};

use crate::config::ApiConfig;

const INVENTORY_SNAPSHOT_KEY: &str = "current";
const ACTIVITY_CAPACITY: usize = 500;

pub type InventoryCache = SqliteCache<String, Vec<InventoryItem>>;

pub struct AppServices {
    pub board: Arc<KitchenBoard>,
    pub inventory: Arc<InventoryStore>,
    pub alerts: AlertMonitor<Arc<InventoryStore>>,
    pub activity: ActivityFeed,
    inventory_cache: Option<InventoryCache>,
}

impl AppServices {
    /// Everything in memory; nothing survives a restart.
    pub fn in_memory() -> Arc<Self> {
        Arc::new(Self::build())
    }

    /// Wire services per `config`, restoring the cached inventory snapshot if
    /// a cache file is configured.
    pub async fn from_config(config: &ApiConfig) -> anyhow::Result<Arc<Self>> {
        let mut services = Self::build();

        if let Some(path) = &config.cache_path {
            let cache: InventoryCache = SqliteCache::open(path, "inventory").await?;
            if let Some(items) = cache.load(&INVENTORY_SNAPSHOT_KEY.to_string()).await? {
                tracing::info!(items = items.len(), path = ?path, "restored inventory snapshot");
                services.inventory.replace(items);
            }
            services.inventory_cache = Some(cache);
        }

        Ok(Arc::new(services))
    }

    fn build() -> Self {
        let inventory = Arc::new(InventoryStore::default());
        let board = Arc::new(KitchenBoard::new());
        Self {
            activity: board.activity_feed(ACTIVITY_CAPACITY),
            board,
            alerts: AlertMonitor::new(Arc::clone(&inventory)),
            inventory,
            inventory_cache: None,
        }
    }

    /// Replace the inventory snapshot and re-derive alerts.
    pub async fn replace_inventory(
        &self,
        items: Vec<InventoryItem>,
    ) -> Result<Vec<InventoryAlert>, FetchError> {
        self.inventory.replace(items.clone());

        if let Some(cache) = &self.inventory_cache {
            if let Err(e) = cache.store(&INVENTORY_SNAPSHOT_KEY.to_string(), &items).await {
                tracing::warn!(error = ?e, "failed to persist inventory snapshot");
            }
        }

        self.alerts.refresh().await
    }

    /// Alerts re-derived from the current snapshot; falls back to the last
    /// derivation if the read fails.
    pub async fn current_alerts(&self) -> Vec<InventoryAlert> {
        match self.alerts.refresh().await {
            Ok(alerts) => alerts,
            Err(e) => {
                tracing::warn!(error = %e, "alert refresh failed; using last derivation");
                self.alerts.alerts()
            }
        }
    }
}
