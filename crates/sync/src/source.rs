//! What the synchronization service polls.

use std::fmt::Debug;
use std::hash::Hash;
use std::sync::Arc;

use async_trait::async_trait;

use crate::error::FetchError;

/// A readable subject kind: orders by id, the broadcast alert set, ...
///
/// `fetch` must be idempotent and side-effect free as far as subscribers can
/// tell; it is called once per subscribed key per tick.
#[async_trait]
pub trait SnapshotSource: Send + Sync + 'static {
    type Key: Clone + Eq + Hash + Debug + Send + Sync + 'static;
    type Snapshot: Clone + PartialEq + Send + Sync + 'static;

    async fn fetch(&self, key: &Self::Key) -> Result<Self::Snapshot, FetchError>;
}

#[async_trait]
impl<S> SnapshotSource for Arc<S>
where
    S: SnapshotSource + ?Sized,
{
    type Key = S::Key;
    type Snapshot = S::Snapshot;

    async fn fetch(&self, key: &Self::Key) -> Result<Self::Snapshot, FetchError> {
        (**self).fetch(key).await
    }
}
