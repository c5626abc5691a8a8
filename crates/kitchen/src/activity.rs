//! Recent kitchen activity, fed from the board's event stream.

use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Utc};
use serde::Serialize;

use kitchenflow_core::OrderId;
use kitchenflow_events::{Event, Subscription};

use crate::order::{OrderEvent, Priority};

/// One line of the activity log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ActivityEntry {
    pub order_id: OrderId,
    pub event_type: &'static str,
    pub occurred_at: DateTime<Utc>,
    pub summary: String,
}

impl ActivityEntry {
    pub fn from_event(event: &OrderEvent) -> Self {
        let summary = match event {
            OrderEvent::OrderPlaced(e) => {
                format!("{} placed with {} item(s)", e.order_number, e.items.len())
            }
            OrderEvent::OrderConfirmed(_) => "order confirmed".to_string(),
            OrderEvent::ItemStatusChanged(e) => {
                format!("item {} -> {}, order now {}", e.from, e.to, e.order_status)
            }
            OrderEvent::OrderCompleted(_) => "order completed".to_string(),
            OrderEvent::OrderCancelled(e) => match &e.reason {
                Some(reason) => format!("order cancelled: {reason}"),
                None => "order cancelled".to_string(),
            },
            OrderEvent::PriorityChanged(e) => {
                let label = match e.priority {
                    Priority::Normal => "normal",
                    Priority::High => "high",
                    Priority::Urgent => "urgent",
                };
                format!("priority set to {label}")
            }
            OrderEvent::ChefAssigned(e) => format!("{} assigned", e.chef),
        };

        Self {
            order_id: event.order_id(),
            event_type: event.event_type(),
            occurred_at: event.occurred_at(),
            summary,
        }
    }
}

struct FeedState {
    events: Subscription<OrderEvent>,
    entries: VecDeque<ActivityEntry>,
}

/// Bounded log of the most recent order events.
///
/// Events are pulled off the subscription lazily on read, so the feed needs
/// no task of its own. Once `capacity` entries are held the oldest go first.
pub struct ActivityFeed {
    state: Mutex<FeedState>,
    capacity: usize,
}

impl ActivityFeed {
    pub fn new(events: Subscription<OrderEvent>, capacity: usize) -> Self {
        Self {
            state: Mutex::new(FeedState {
                events,
                entries: VecDeque::with_capacity(capacity),
            }),
            capacity: capacity.max(1),
        }
    }

    fn catch_up(&self) -> MutexGuard<'_, FeedState> {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        for event in state.events.drain() {
            if state.entries.len() == self.capacity {
                state.entries.pop_front();
            }
            state.entries.push_back(ActivityEntry::from_event(&event));
        }
        state
    }

    /// Up to `limit` entries, newest first.
    pub fn recent(&self, limit: usize) -> Vec<ActivityEntry> {
        self.catch_up()
            .entries
            .iter()
            .rev()
            .take(limit)
            .cloned()
            .collect()
    }

    /// Every retained entry for one order, oldest first.
    pub fn for_order(&self, order_id: OrderId) -> Vec<ActivityEntry> {
        self.catch_up()
            .entries
            .iter()
            .filter(|e| e.order_id == order_id)
            .cloned()
            .collect()
    }
}
