//! Serve the last cached snapshot when the remote read fails.

use async_trait::async_trait;
use chrono::Utc;

use crate::cache::SnapshotCache;
use crate::error::FetchError;
use crate::source::SnapshotSource;

/// Wraps a source: successful reads are written through to the cache,
/// transient failures fall back to it.
pub struct FallbackSource<S, C> {
    inner: S,
    cache: C,
}

impl<S, C> FallbackSource<S, C>
where
    S: SnapshotSource,
    C: SnapshotCache<S::Key, S::Snapshot>,
{
    pub fn new(inner: S, cache: C) -> Self {
        Self { inner, cache }
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }

    pub fn cache(&self) -> &C {
        &self.cache
    }
}

#[async_trait]
impl<S, C> SnapshotSource for FallbackSource<S, C>
where
    S: SnapshotSource,
    C: SnapshotCache<S::Key, S::Snapshot>,
{
    type Key = S::Key;
    type Snapshot = S::Snapshot;

    async fn fetch(&self, key: &Self::Key) -> Result<Self::Snapshot, FetchError> {
        match self.inner.fetch(key).await {
            Ok(snapshot) => {
                if let Err(e) = self.cache.store(key, &snapshot).await {
                    tracing::warn!(key = ?key, error = ?e, "failed to write snapshot cache");
                }
                Ok(snapshot)
            }
            Err(err) if err.is_transient() => match self.cache.load(key).await {
                Ok(Some(cached)) => {
                    let age_secs = match self.cache.cached_at(key).await {
                        Ok(Some(at)) => Some((Utc::now() - at).num_seconds()),
                        _ => None,
                    };
                    tracing::warn!(
                        key = ?key,
                        error = %err,
                        age_secs = ?age_secs,
                        "remote read failed; serving cached snapshot"
                    );
                    Ok(cached)
                }
                Ok(None) => Err(err),
                Err(e) => {
                    tracing::warn!(key = ?key, error = ?e, "failed to read snapshot cache");
                    Err(err)
                }
            },
            Err(err) => Err(err),
        }
    }
}
