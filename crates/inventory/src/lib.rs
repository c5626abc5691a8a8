//! Inventory alerting and availability (pure domain logic, no IO).
//!
//! - [`item`]: the read-only stock snapshot this crate consumes
//! - [`alert`]: severity-ranked alerts derived from a snapshot
//! - [`availability`]: per-order availability and delay estimates from alerts

pub mod alert;
pub mod availability;
pub mod item;

pub use alert::{AlertEngine, AlertId, AlertType, InventoryAlert, Severity, derive_alerts};
pub use availability::{
    AvailabilityReport, DelayEstimate, LineItem, RequestedItem, STOCK_DELAY_MINUTES,
    check_availability, estimate_delay,
};
pub use item::InventoryItem;
