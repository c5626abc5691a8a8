//! Customer-facing tracking helpers and kitchen queue ordering.

use core::cmp::Ordering;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::order::{Order, OrderStatus};

pub fn progress_percentage(status: OrderStatus) -> u8 {
    match status {
        OrderStatus::Pending => 10,
        OrderStatus::Confirmed => 25,
        OrderStatus::Preparing => 60,
        OrderStatus::Ready => 90,
        OrderStatus::Completed | OrderStatus::Served => 100,
        OrderStatus::Cancelled => 0,
    }
}

pub fn status_message(status: OrderStatus) -> &'static str {
    match status {
        OrderStatus::Pending => "Order received and being reviewed",
        OrderStatus::Confirmed => "Order confirmed and sent to kitchen",
        OrderStatus::Preparing => "Chef is preparing your order",
        OrderStatus::Ready => "Order is ready for pickup/serving",
        OrderStatus::Served => "Order has been served",
        OrderStatus::Completed => "Order completed successfully",
        OrderStatus::Cancelled => "Order has been cancelled",
    }
}

/// How long a customer should expect to wait.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum WaitEstimate {
    /// Rough window before the kitchen has started.
    Range { min_minutes: u32, max_minutes: u32 },
    /// Minutes left until `estimated_completion` (never negative).
    Minutes { minutes: i64 },
    ReadyNow,
    Finished,
    Cancelled,
}

impl core::fmt::Display for WaitEstimate {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            WaitEstimate::Range {
                min_minutes,
                max_minutes,
            } => write!(f, "{min_minutes}-{max_minutes} minutes"),
            WaitEstimate::Minutes { minutes } => write!(f, "{minutes} minutes"),
            WaitEstimate::ReadyNow => f.write_str("Ready now!"),
            WaitEstimate::Finished => f.write_str("Completed"),
            WaitEstimate::Cancelled => f.write_str("Cancelled"),
        }
    }
}

pub fn estimated_wait(order: &Order, now: DateTime<Utc>) -> WaitEstimate {
    match order.status() {
        OrderStatus::Pending => WaitEstimate::Range {
            min_minutes: 5,
            max_minutes: 10,
        },
        OrderStatus::Confirmed => WaitEstimate::Range {
            min_minutes: 15,
            max_minutes: 25,
        },
        OrderStatus::Preparing => {
            let left = order.estimated_completion() - now;
            // Round partial minutes up.
            let minutes = (left.num_seconds().max(0) + 59) / 60;
            WaitEstimate::Minutes { minutes }
        }
        OrderStatus::Ready => WaitEstimate::ReadyNow,
        OrderStatus::Completed | OrderStatus::Served => WaitEstimate::Finished,
        OrderStatus::Cancelled => WaitEstimate::Cancelled,
    }
}

/// True when cooking started and has run past the longest preparation time.
pub fn is_overdue(order: &Order, now: DateTime<Utc>) -> bool {
    if order.is_terminal() {
        return false;
    }

    let Some(started) = order.items().iter().filter_map(|i| i.started_at).min() else {
        return false;
    };
    let longest = order
        .items()
        .iter()
        .map(|i| i.preparation_time_minutes)
        .max()
        .unwrap_or(0);

    (now - started).num_minutes() > i64::from(longest)
}

/// Kitchen queue order: higher priority first, then oldest first.
pub fn queue_order(a: &Order, b: &Order) -> Ordering {
    b.priority()
        .cmp(&a.priority())
        .then_with(|| a.created_at().cmp(&b.created_at()))
}
