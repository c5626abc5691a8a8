//! Kitchen board: the owner of every live order.
//!
//! Each mutation goes through the aggregate's `handle`/`apply` pair under a
//! single lock, so readers always see a fully-applied order. Accepted events
//! are then published on the bus.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::Utc;
use serde::{Deserialize, Serialize};

use kitchenflow_core::{Aggregate, DomainError, DomainResult, OrderId, OrderItemId};
use kitchenflow_events::{Event, EventBus, InMemoryEventBus, Subscription};
use kitchenflow_inventory::{
    AvailabilityReport, DelayEstimate, InventoryAlert, check_availability, estimate_delay,
};

use crate::activity::ActivityFeed;
use crate::order::{
    AssignChef, CancelOrder, ChangePriority, CompleteOrder, ConfirmOrder, ItemStatus, Order,
    OrderCommand, OrderEvent, OrderItemDraft, PlaceOrder, Priority, TransitionItem,
};
use crate::tracking::queue_order;

/// Input for placing an order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderRequest {
    pub items: Vec<OrderItemDraft>,
    #[serde(default)]
    pub priority: Priority,
    #[serde(default)]
    pub special_instructions: Option<String>,
}

impl OrderRequest {
    pub fn new(items: Vec<OrderItemDraft>) -> Self {
        Self {
            items,
            priority: Priority::Normal,
            special_instructions: None,
        }
    }

    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_instructions(mut self, instructions: impl Into<String>) -> Self {
        self.special_instructions = Some(instructions.into());
        self
    }
}

/// Result of placing an order with an inventory check.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Placement {
    pub order: Order,
    pub availability: AvailabilityReport,
    pub delay: DelayEstimate,
}

/// In-memory store of orders plus the event fan-out.
pub struct KitchenBoard<B = InMemoryEventBus<OrderEvent>> {
    orders: Mutex<HashMap<OrderId, Order>>,
    next_number: AtomicU64,
    bus: Arc<B>,
}

impl KitchenBoard<InMemoryEventBus<OrderEvent>> {
    pub fn new() -> Self {
        Self::with_bus(Arc::new(InMemoryEventBus::new()))
    }
}

impl Default for KitchenBoard<InMemoryEventBus<OrderEvent>> {
    fn default() -> Self {
        Self::new()
    }
}

impl<B> KitchenBoard<B>
where
    B: EventBus<OrderEvent>,
{
    pub fn with_bus(bus: Arc<B>) -> Self {
        Self {
            orders: Mutex::new(HashMap::new()),
            next_number: AtomicU64::new(1),
            bus,
        }
    }

    /// Subscribe to every event accepted from now on.
    pub fn subscribe_events(&self) -> Subscription<OrderEvent> {
        self.bus.subscribe()
    }

    /// A bounded activity log fed by this board's events from now on.
    pub fn activity_feed(&self, capacity: usize) -> ActivityFeed {
        ActivityFeed::new(self.subscribe_events(), capacity)
    }

    fn orders(&self) -> MutexGuard<'_, HashMap<OrderId, Order>> {
        self.orders.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Place an order with default priority and no delay.
    pub fn place_order(&self, items: Vec<OrderItemDraft>) -> DomainResult<Order> {
        self.place(OrderRequest::new(items), 0)
    }

    /// Place an order after checking it against the current inventory alerts.
    ///
    /// Out-of-stock lines do not block placement; they are reported so the
    /// caller can decide. Any stock-related delay is added to the estimate.
    pub fn place_order_with_alerts(
        &self,
        request: OrderRequest,
        alerts: &[InventoryAlert],
    ) -> DomainResult<Placement> {
        let availability = check_availability(&request.items, alerts);
        let delay = estimate_delay(&request.items, alerts);

        if !availability.available {
            tracing::warn!(
                unavailable = ?availability.unavailable_items,
                "placing order with unavailable items"
            );
        }

        let order = self.place(request, delay.minutes)?;
        Ok(Placement {
            order,
            availability,
            delay,
        })
    }

    /// Place an order from a full request.
    pub fn place_request(&self, request: OrderRequest) -> DomainResult<Order> {
        self.place(request, 0)
    }

    fn place(&self, request: OrderRequest, delay_minutes: u32) -> DomainResult<Order> {
        let order_id = OrderId::new();
        let mut order = Order::empty(order_id);

        let mut place = PlaceOrder {
            order_id,
            order_number: String::new(),
            items: request
                .items
                .into_iter()
                .map(|draft| (OrderItemId::new(), draft))
                .collect(),
            priority: request.priority,
            special_instructions: request.special_instructions,
            delay_minutes,
            occurred_at: Utc::now(),
        };

        // Validate before consuming an order number.
        order.handle(&OrderCommand::PlaceOrder(place.clone()))?;

        let number = self.next_number.fetch_add(1, Ordering::SeqCst);
        place.order_number = format!("ORD-{number:04}");
        let cmd = OrderCommand::PlaceOrder(place);

        let events = order.handle(&cmd)?;
        for event in &events {
            order.apply(event);
        }

        self.orders().insert(order_id, order.clone());
        tracing::info!(
            order_id = %order_id,
            order_number = order.order_number(),
            items = order.items().len(),
            "order placed"
        );
        self.publish(events);

        Ok(order)
    }

    pub fn confirm_order(&self, order_id: OrderId) -> DomainResult<Order> {
        self.execute(OrderCommand::ConfirmOrder(ConfirmOrder {
            order_id,
            occurred_at: Utc::now(),
        }))
    }

    /// Move one item to `status`; the order status is re-derived as part of
    /// the same mutation.
    pub fn transition_item(
        &self,
        order_id: OrderId,
        item_id: OrderItemId,
        status: ItemStatus,
    ) -> DomainResult<Order> {
        self.execute(OrderCommand::TransitionItem(TransitionItem {
            order_id,
            item_id,
            status,
            occurred_at: Utc::now(),
        }))
    }

    pub fn complete_order(&self, order_id: OrderId) -> DomainResult<Order> {
        self.execute(OrderCommand::CompleteOrder(CompleteOrder {
            order_id,
            occurred_at: Utc::now(),
        }))
    }

    pub fn cancel_order(&self, order_id: OrderId, reason: Option<String>) -> DomainResult<Order> {
        self.execute(OrderCommand::CancelOrder(CancelOrder {
            order_id,
            reason,
            occurred_at: Utc::now(),
        }))
    }

    pub fn change_priority(&self, order_id: OrderId, priority: Priority) -> DomainResult<Order> {
        self.execute(OrderCommand::ChangePriority(ChangePriority {
            order_id,
            priority,
            occurred_at: Utc::now(),
        }))
    }

    pub fn assign_chef(
        &self,
        order_id: OrderId,
        item_id: OrderItemId,
        chef: impl Into<String>,
    ) -> DomainResult<Order> {
        self.execute(OrderCommand::AssignChef(AssignChef {
            order_id,
            item_id,
            chef: chef.into(),
            occurred_at: Utc::now(),
        }))
    }

    pub fn get(&self, order_id: OrderId) -> DomainResult<Order> {
        self.orders()
            .get(&order_id)
            .cloned()
            .ok_or_else(DomainError::not_found)
    }

    /// All orders, oldest first.
    pub fn all(&self) -> Vec<Order> {
        let mut orders: Vec<Order> = self.orders().values().cloned().collect();
        orders.sort_by_key(|o| o.created_at());
        orders
    }

    /// Non-terminal orders, most urgent first, then oldest first.
    pub fn active_queue(&self) -> Vec<Order> {
        let mut orders: Vec<Order> = self
            .orders()
            .values()
            .filter(|o| !o.is_terminal())
            .cloned()
            .collect();
        orders.sort_by(queue_order);
        orders
    }

    fn execute(&self, cmd: OrderCommand) -> DomainResult<Order> {
        let order_id = cmd.order_id();
        let (order, events) = {
            let mut orders = self.orders();
            let order = orders.get_mut(&order_id).ok_or_else(DomainError::not_found)?;

            let events = order.handle(&cmd).inspect_err(|e| {
                tracing::debug!(order_id = %order_id, error = %e, "order command rejected");
            })?;
            for event in &events {
                order.apply(event);
            }
            (order.clone(), events)
        };

        for event in &events {
            tracing::info!(
                order_id = %order_id,
                event_type = event.event_type(),
                status = %order.status(),
                "order updated"
            );
        }
        self.publish(events);

        Ok(order)
    }

    fn publish(&self, events: Vec<OrderEvent>) {
        for event in events {
            if let Err(e) = self.bus.publish(event) {
                tracing::warn!(error = ?e, "failed to publish order event");
            }
        }
    }
}
