//! Polling configuration.

use std::time::Duration;

/// Configuration for one synchronization service instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncConfig {
    /// Name used in log fields (e.g. "orders", "alerts").
    pub name: String,
    /// Time between two polling ticks.
    pub poll_interval: Duration,
    /// Upper bound for a single subject fetch.
    pub fetch_timeout: Duration,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            name: "sync".to_string(),
            poll_interval: Duration::from_secs(5),
            fetch_timeout: Duration::from_secs(10),
        }
    }
}

impl SyncConfig {
    /// Per-order tracking: short interval.
    pub fn orders() -> Self {
        Self {
            name: "orders".to_string(),
            poll_interval: Duration::from_secs(3),
            fetch_timeout: Duration::from_secs(5),
        }
    }

    /// Broadcast inventory alerts: longer interval.
    pub fn alerts() -> Self {
        Self {
            name: "alerts".to_string(),
            poll_interval: Duration::from_secs(30),
            fetch_timeout: Duration::from_secs(10),
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn with_fetch_timeout(mut self, timeout: Duration) -> Self {
        self.fetch_timeout = timeout;
        self
    }
}
