use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use kitchenflow_core::{Entity, InventoryItemId};

/// A trackable stock unit, as read from the inventory backend.
///
/// Stock movements (restock, consumption, adjustment) happen elsewhere; this
/// crate only derives facts from snapshots of these values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InventoryItem {
    pub id: InventoryItemId,
    pub name: String,
    pub current_stock: f64,
    pub min_stock: f64,
    pub unit: String,
    #[serde(default)]
    pub expiry_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub usage_rate_per_day: f64,
}

impl InventoryItem {
    pub fn new(name: impl Into<String>, current_stock: f64, min_stock: f64) -> Self {
        Self {
            id: InventoryItemId::new(),
            name: name.into(),
            current_stock,
            min_stock,
            unit: "units".to_string(),
            expiry_date: None,
            usage_rate_per_day: 0.0,
        }
    }

    pub fn with_id(mut self, id: InventoryItemId) -> Self {
        self.id = id;
        self
    }

    pub fn with_unit(mut self, unit: impl Into<String>) -> Self {
        self.unit = unit.into();
        self
    }

    pub fn with_expiry(mut self, expiry_date: DateTime<Utc>) -> Self {
        self.expiry_date = Some(expiry_date);
        self
    }

    pub fn with_usage_rate(mut self, per_day: f64) -> Self {
        self.usage_rate_per_day = per_day;
        self
    }

    pub fn is_out_of_stock(&self) -> bool {
        self.current_stock <= 0.0
    }

    pub fn is_low_stock(&self) -> bool {
        !self.is_out_of_stock() && self.current_stock <= self.min_stock
    }

    /// Whole days until expiry, rounded up (`None` without an expiry date).
    ///
    /// Anything that expires later today counts as one day; a date in the past
    /// yields zero or a negative number.
    pub fn days_until_expiry(&self, now: DateTime<Utc>) -> Option<i64> {
        let expiry = self.expiry_date?;
        let secs = (expiry - now).num_seconds() as f64;
        Some((secs / 86_400.0).ceil() as i64)
    }
}

impl Entity for InventoryItem {
    type Id = InventoryItemId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn days_until_expiry_rounds_up() {
        let now = Utc::now();
        let item = InventoryItem::new("Milk", 4.0, 2.0).with_expiry(now + Duration::hours(30));
        assert_eq!(item.days_until_expiry(now), Some(2));

        let item = item.with_expiry(now + Duration::hours(3));
        assert_eq!(item.days_until_expiry(now), Some(1));

        let item = item.with_expiry(now - Duration::hours(3));
        assert_eq!(item.days_until_expiry(now), Some(0));
    }

    #[test]
    fn stock_classification() {
        assert!(InventoryItem::new("Rice", 0.0, 20.0).is_out_of_stock());
        assert!(InventoryItem::new("Rice", 20.0, 20.0).is_low_stock());
        assert!(!InventoryItem::new("Rice", 21.0, 20.0).is_low_stock());
    }
}
