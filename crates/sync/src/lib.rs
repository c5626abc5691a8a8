//! Status synchronization: periodic remote reads turned into change-driven
//! callbacks.
//!
//! [`SyncService`] is the generic subscribe/poll/diff/notify primitive. It is
//! instantiated per subject kind: [`OrderTracker`] for orders by id and
//! [`AlertMonitor`] for the broadcast inventory alert set.

pub mod alerts;
pub mod cache;
pub mod config;
pub mod connectivity;
pub mod error;
pub mod fallback;
#[cfg(feature = "http")]
pub mod http;
pub mod orders;
pub mod service;
pub mod source;

pub use alerts::{AlertMonitor, AlertSource, AlertStream, InventorySource, InventoryStore};
pub use cache::{MemoryCache, SnapshotCache, SqliteCache, default_cache_path};
pub use config::SyncConfig;
pub use connectivity::ConnectivityState;
pub use error::{FetchError, SyncError};
pub use fallback::FallbackSource;
#[cfg(feature = "http")]
pub use http::{ApiClient, HttpInventorySource, HttpOrderSource};
pub use orders::OrderTracker;
pub use service::{Subscription, SyncService};
pub use source::SnapshotSource;
