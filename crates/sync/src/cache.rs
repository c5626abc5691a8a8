//! Last-known snapshot cache for when the remote read fails.

use std::collections::HashMap;
use std::fmt::Display;
use std::hash::Hash;
use std::marker::PhantomData;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use anyhow::Context;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde::de::DeserializeOwned;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Row, SqlitePool};

#[async_trait]
pub trait SnapshotCache<K, V>: Send + Sync + 'static {
    async fn store(&self, key: &K, value: &V) -> anyhow::Result<()>;

    async fn load(&self, key: &K) -> anyhow::Result<Option<V>>;

    /// When `key` was last written, if the cache keeps track.
    async fn cached_at(&self, _key: &K) -> anyhow::Result<Option<DateTime<Utc>>> {
        Ok(None)
    }
}

/// Process-local cache; lost on restart.
#[derive(Debug)]
pub struct MemoryCache<K, V> {
    entries: Mutex<HashMap<K, (V, DateTime<Utc>)>>,
}

impl<K, V> MemoryCache<K, V> {
    pub fn new() -> Self {
        Self::default()
    }
}

impl<K, V> Default for MemoryCache<K, V> {
    fn default() -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
        }
    }
}

#[async_trait]
impl<K, V> SnapshotCache<K, V> for MemoryCache<K, V>
where
    K: Clone + Eq + Hash + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    async fn store(&self, key: &K, value: &V) -> anyhow::Result<()> {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key.clone(), (value.clone(), Utc::now()));
        Ok(())
    }

    async fn load(&self, key: &K) -> anyhow::Result<Option<V>> {
        Ok(self
            .entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .map(|(value, _)| value.clone()))
    }

    async fn cached_at(&self, key: &K) -> anyhow::Result<Option<DateTime<Utc>>> {
        Ok(self
            .entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .map(|(_, at)| *at))
    }
}

/// SQLite-backed cache, one row per `(kind, key)`, value stored as JSON.
#[derive(Debug)]
pub struct SqliteCache<K, V> {
    pool: SqlitePool,
    kind: String,
    _marker: PhantomData<fn() -> (K, V)>,
}

impl<K, V> Clone for SqliteCache<K, V> {
    fn clone(&self) -> Self {
        Self {
            pool: self.pool.clone(),
            kind: self.kind.clone(),
            _marker: PhantomData,
        }
    }
}

/// Default on-disk location: `<local data dir>/kitchenflow/cache.db`.
pub fn default_cache_path() -> anyhow::Result<PathBuf> {
    let base = dirs::data_local_dir().context("no local data directory on this platform")?;
    Ok(base.join("kitchenflow").join("cache.db"))
}

impl<K, V> SqliteCache<K, V> {
    /// Open (or create) the cache file at `path`.
    pub async fn open(path: &Path, kind: impl Into<String>) -> anyhow::Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("failed to create cache directory at {parent:?}"))?;
        }

        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true);
        let pool = SqlitePoolOptions::new()
            .connect_with(options)
            .await
            .with_context(|| format!("failed to open snapshot cache at {path:?}"))?;

        Self::with_pool(pool, kind).await
    }

    /// Private in-memory database; a single connection so every query sees
    /// the same data.
    pub async fn in_memory(kind: impl Into<String>) -> anyhow::Result<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .context("failed to open in-memory snapshot cache")?;

        Self::with_pool(pool, kind).await
    }

    /// Share an existing pool; `kind` namespaces the rows.
    pub async fn with_pool(pool: SqlitePool, kind: impl Into<String>) -> anyhow::Result<Self> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS snapshots (
                kind       TEXT NOT NULL,
                key        TEXT NOT NULL,
                data       TEXT NOT NULL,
                cached_at  TEXT NOT NULL,
                PRIMARY KEY (kind, key)
            )
            "#,
        )
        .execute(&pool)
        .await
        .context("failed to create snapshots table")?;

        Ok(Self {
            pool,
            kind: kind.into(),
            _marker: PhantomData,
        })
    }
}

#[async_trait]
impl<K, V> SnapshotCache<K, V> for SqliteCache<K, V>
where
    K: Display + Send + Sync + 'static,
    V: Serialize + DeserializeOwned + Send + Sync + 'static,
{
    async fn store(&self, key: &K, value: &V) -> anyhow::Result<()> {
        let data = serde_json::to_string(value).context("failed to serialize snapshot")?;

        sqlx::query(
            r#"
            INSERT INTO snapshots (kind, key, data, cached_at)
            VALUES (?1, ?2, ?3, ?4)
            ON CONFLICT (kind, key) DO UPDATE SET
                data = excluded.data,
                cached_at = excluded.cached_at
            "#,
        )
        .bind(self.kind.as_str())
        .bind(key.to_string())
        .bind(data)
        .bind(Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await
        .context("failed to upsert snapshot")?;

        Ok(())
    }

    async fn load(&self, key: &K) -> anyhow::Result<Option<V>> {
        let row = sqlx::query("SELECT data FROM snapshots WHERE kind = ?1 AND key = ?2")
            .bind(self.kind.as_str())
            .bind(key.to_string())
            .fetch_optional(&self.pool)
            .await
            .context("failed to fetch snapshot from cache")?;

        let Some(row) = row else {
            return Ok(None);
        };
        let data: String = row.try_get("data")?;
        let value = serde_json::from_str(&data).context("failed to deserialize cached snapshot")?;
        Ok(Some(value))
    }

    async fn cached_at(&self, key: &K) -> anyhow::Result<Option<DateTime<Utc>>> {
        let row = sqlx::query("SELECT cached_at FROM snapshots WHERE kind = ?1 AND key = ?2")
            .bind(self.kind.as_str())
            .bind(key.to_string())
            .fetch_optional(&self.pool)
            .await
            .context("failed to read snapshot timestamp")?;

        let Some(row) = row else {
            return Ok(None);
        };
        let raw: String = row.try_get("cached_at")?;
        let at = DateTime::parse_from_rfc3339(&raw)
            .map(|dt| dt.with_timezone(&Utc))
            .context("invalid cached_at timestamp in cache")?;
        Ok(Some(at))
    }
}
