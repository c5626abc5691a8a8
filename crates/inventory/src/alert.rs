//! Inventory alert derivation.
//!
//! Alerts are derived facts: the set is recomputed from every fresh inventory
//! snapshot. The only state that survives a re-derivation is carried by alert
//! id (`acknowledged` and the first-seen `timestamp`), so an alert whose
//! underlying condition clears disappears together with its acknowledgement.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use kitchenflow_core::{DomainError, DomainResult, InventoryItemId};

use crate::item::InventoryItem;

/// Items expiring within this many days raise `expiring_soon`.
pub const EXPIRY_WINDOW_DAYS: i64 = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertType {
    LowStock,
    OutOfStock,
    ExpiringSoon,
    Expired,
}

impl AlertType {
    pub fn as_str(&self) -> &'static str {
        match self {
            AlertType::LowStock => "low_stock",
            AlertType::OutOfStock => "out_of_stock",
            AlertType::ExpiringSoon => "expiring_soon",
            AlertType::Expired => "expired",
        }
    }

    /// Stock alerts (as opposed to expiry alerts) feed availability checks.
    pub fn is_stock(&self) -> bool {
        matches!(self, AlertType::LowStock | AlertType::OutOfStock)
    }
}

/// Alert severity, ordered from least to most severe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

/// Deterministic alert identifier: `"{type}-{item_id}"`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AlertId(String);

impl AlertId {
    pub fn for_item(alert_type: AlertType, item_id: InventoryItemId) -> Self {
        Self(format!("{}-{}", alert_type.as_str(), item_id))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for AlertId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&str> for AlertId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl core::fmt::Display for AlertId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InventoryAlert {
    pub id: AlertId,
    #[serde(rename = "type")]
    pub alert_type: AlertType,
    pub item_id: InventoryItemId,
    pub item_name: String,
    pub severity: Severity,
    pub message: String,
    pub timestamp: DateTime<Utc>,
    pub acknowledged: bool,
}

impl InventoryAlert {
    fn new(
        alert_type: AlertType,
        item: &InventoryItem,
        severity: Severity,
        message: String,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: AlertId::for_item(alert_type, item.id),
            alert_type,
            item_id: item.id,
            item_name: item.name.clone(),
            severity,
            message,
            timestamp: now,
            acknowledged: false,
        }
    }

    /// Unacknowledged and `high` or worse.
    pub fn is_critical(&self) -> bool {
        !self.acknowledged && self.severity >= Severity::High
    }
}

/// Derive the alert set for a snapshot.
///
/// For each item, in order:
/// - zero stock: `out_of_stock` (critical)
/// - otherwise at or below `min_stock`: `low_stock` (high at or below half of
///   `min_stock`, else medium)
/// - expiring within [`EXPIRY_WINDOW_DAYS`]: `expiring_soon` (high within a
///   day, else medium); already past expiry: `expired` (critical)
///
/// `acknowledged` and `timestamp` are carried over from `previous` for every
/// alert id that is still present.
pub fn derive_alerts(
    items: &[InventoryItem],
    previous: &[InventoryAlert],
    now: DateTime<Utc>,
) -> Vec<InventoryAlert> {
    let carried: HashMap<&AlertId, &InventoryAlert> =
        previous.iter().map(|a| (&a.id, a)).collect();

    let mut alerts = Vec::new();
    for item in items {
        if let Some(alert) = stock_alert(item, now) {
            alerts.push(alert);
        }
        if let Some(alert) = expiry_alert(item, now) {
            alerts.push(alert);
        }
    }

    for alert in &mut alerts {
        if let Some(prev) = carried.get(&alert.id) {
            alert.acknowledged = prev.acknowledged;
            alert.timestamp = prev.timestamp;
        }
    }

    alerts
}

fn stock_alert(item: &InventoryItem, now: DateTime<Utc>) -> Option<InventoryAlert> {
    if item.is_out_of_stock() {
        return Some(InventoryAlert::new(
            AlertType::OutOfStock,
            item,
            Severity::Critical,
            format!("{} is completely out of stock", item.name),
            now,
        ));
    }

    if item.is_low_stock() {
        let severity = if item.current_stock <= item.min_stock * 0.5 {
            Severity::High
        } else {
            Severity::Medium
        };
        return Some(InventoryAlert::new(
            AlertType::LowStock,
            item,
            severity,
            format!(
                "{} is running low - only {} {} remaining",
                item.name, item.current_stock, item.unit
            ),
            now,
        ));
    }

    None
}

fn expiry_alert(item: &InventoryItem, now: DateTime<Utc>) -> Option<InventoryAlert> {
    let days = item.days_until_expiry(now)?;

    if days <= 0 {
        return Some(InventoryAlert::new(
            AlertType::Expired,
            item,
            Severity::Critical,
            format!("{} has expired", item.name),
            now,
        ));
    }

    if days <= EXPIRY_WINDOW_DAYS {
        let severity = if days <= 1 {
            Severity::High
        } else {
            Severity::Medium
        };
        let plural = if days == 1 { "" } else { "s" };
        return Some(InventoryAlert::new(
            AlertType::ExpiringSoon,
            item,
            severity,
            format!("{} expires in {days} day{plural}", item.name),
            now,
        ));
    }

    None
}

/// Holds the current alert set between refreshes.
#[derive(Debug, Clone, Default)]
pub struct AlertEngine {
    alerts: Vec<InventoryAlert>,
}

impl AlertEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Re-derive from a fresh snapshot, keeping acknowledgements by id.
    pub fn refresh(&mut self, items: &[InventoryItem], now: DateTime<Utc>) -> &[InventoryAlert] {
        let next = derive_alerts(items, &self.alerts, now);
        debug!(
            items = items.len(),
            before = self.alerts.len(),
            after = next.len(),
            "alerts re-derived"
        );
        self.alerts = next;
        &self.alerts
    }

    pub fn acknowledge(&mut self, alert_id: &AlertId) -> DomainResult<()> {
        let alert = self
            .alerts
            .iter_mut()
            .find(|a| &a.id == alert_id)
            .ok_or_else(DomainError::not_found)?;
        alert.acknowledged = true;
        Ok(())
    }

    pub fn alerts(&self) -> &[InventoryAlert] {
        &self.alerts
    }

    pub fn unacknowledged(&self) -> Vec<&InventoryAlert> {
        self.alerts.iter().filter(|a| !a.acknowledged).collect()
    }

    pub fn critical(&self) -> Vec<&InventoryAlert> {
        self.alerts.iter().filter(|a| a.is_critical()).collect()
    }

    pub fn by_type(&self, alert_type: AlertType) -> Vec<&InventoryAlert> {
        self.alerts
            .iter()
            .filter(|a| a.alert_type == alert_type)
            .collect()
    }

    /// Most severe first; derivation order among equals.
    pub fn ranked(&self) -> Vec<&InventoryAlert> {
        let mut ranked: Vec<&InventoryAlert> = self.alerts.iter().collect();
        ranked.sort_by(|a, b| b.severity.cmp(&a.severity));
        ranked
    }
}
