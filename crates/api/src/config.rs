//! Process configuration from the environment.

use std::ffi::OsString;
use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::Context;

/// `KITCHENFLOW_CACHE_PATH` value that selects the per-user data directory.
const DEFAULT_CACHE_KEYWORD: &str = "default";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiConfig {
    pub bind_addr: SocketAddr,
    /// SQLite file holding the last inventory snapshot across restarts.
    pub cache_path: Option<PathBuf>,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 8080)),
            cache_path: None,
        }
    }
}

impl ApiConfig {
    /// Reads `KITCHENFLOW_BIND_ADDR` and `KITCHENFLOW_CACHE_PATH`.
    pub fn from_env() -> anyhow::Result<Self> {
        let mut config = Self::default();

        if let Ok(raw) = std::env::var("KITCHENFLOW_BIND_ADDR") {
            config.bind_addr = raw
                .parse()
                .with_context(|| format!("invalid KITCHENFLOW_BIND_ADDR: {raw}"))?;
        }

        config.cache_path = resolve_cache_path(std::env::var_os("KITCHENFLOW_CACHE_PATH"))?;

        Ok(config)
    }
}

/// Unset or empty disables the cache; `default` means
/// `<local data dir>/kitchenflow/cache.db`; anything else is a file path.
fn resolve_cache_path(raw: Option<OsString>) -> anyhow::Result<Option<PathBuf>> {
    let Some(raw) = raw.filter(|p| !p.is_empty()) else {
        return Ok(None);
    };
    if raw == DEFAULT_CACHE_KEYWORD {
        let path = kitchenflow_sync::default_cache_path()
            .context("KITCHENFLOW_CACHE_PATH=default needs a local data directory")?;
        return Ok(Some(path));
    }
    Ok(Some(PathBuf::from(raw)))
}
