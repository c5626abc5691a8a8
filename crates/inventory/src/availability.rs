//! Availability and delay estimates for a candidate order.
//!
//! Order lines and alerts share no identifier, so matching is by name: a line
//! matches an alert when either name contains the other, ignoring case.

use serde::{Deserialize, Serialize};

use crate::alert::{AlertType, InventoryAlert};

/// Flat delay applied when any requested line hits a stock alert.
pub const STOCK_DELAY_MINUTES: u32 = 15;

/// Anything that can be checked against alerts by display name.
pub trait LineItem {
    fn display_name(&self) -> &str;
}

/// A bare requested line (name + quantity), e.g. from a cart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestedItem {
    pub name: String,
    pub quantity: u32,
}

impl RequestedItem {
    pub fn new(name: impl Into<String>, quantity: u32) -> Self {
        Self {
            name: name.into(),
            quantity,
        }
    }
}

impl LineItem for RequestedItem {
    fn display_name(&self) -> &str {
        &self.name
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AvailabilityReport {
    pub available: bool,
    pub unavailable_items: Vec<String>,
    pub low_stock_warnings: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DelayEstimate {
    pub has_delay: bool,
    pub minutes: u32,
    pub reason: String,
}

impl DelayEstimate {
    pub fn none() -> Self {
        Self {
            has_delay: false,
            minutes: 0,
            reason: String::new(),
        }
    }
}

fn names_match(line_name: &str, alert_name: &str) -> bool {
    let line = line_name.trim().to_lowercase();
    let alert = alert_name.trim().to_lowercase();
    if line.is_empty() || alert.is_empty() {
        return false;
    }
    line.contains(&alert) || alert.contains(&line)
}

fn matches_any(line: &str, alerts: &[InventoryAlert], alert_type: AlertType) -> bool {
    alerts
        .iter()
        .filter(|a| a.alert_type == alert_type)
        .any(|a| names_match(line, &a.item_name))
}

/// Classify each requested line against the current alert set.
///
/// A line matching an `out_of_stock` alert is unavailable; a line matching only
/// `low_stock` alerts is a warning. Expiry alerts do not affect availability.
pub fn check_availability<L: LineItem>(lines: &[L], alerts: &[InventoryAlert]) -> AvailabilityReport {
    let mut unavailable_items = Vec::new();
    let mut low_stock_warnings = Vec::new();

    for line in lines {
        let name = line.display_name();
        if matches_any(name, alerts, AlertType::OutOfStock) {
            unavailable_items.push(name.to_string());
        } else if matches_any(name, alerts, AlertType::LowStock) {
            low_stock_warnings.push(name.to_string());
        }
    }

    AvailabilityReport {
        available: unavailable_items.is_empty(),
        unavailable_items,
        low_stock_warnings,
    }
}

/// Flat, non-compounding delay: [`STOCK_DELAY_MINUTES`] if any line matches a
/// stock alert, otherwise none.
pub fn estimate_delay<L: LineItem>(lines: &[L], alerts: &[InventoryAlert]) -> DelayEstimate {
    let affected: Vec<&str> = lines
        .iter()
        .map(|l| l.display_name())
        .filter(|name| {
            alerts
                .iter()
                .filter(|a| a.alert_type.is_stock())
                .any(|a| names_match(name, &a.item_name))
        })
        .collect();

    if affected.is_empty() {
        return DelayEstimate::none();
    }

    DelayEstimate {
        has_delay: true,
        minutes: STOCK_DELAY_MINUTES,
        reason: format!("Limited ingredient stock for: {}", affected.join(", ")),
    }
}
