use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use kitchenflow_core::{Aggregate, AggregateRoot, DomainError, Entity, OrderId, OrderItemId};
use kitchenflow_events::Event;
use kitchenflow_inventory::LineItem;

/// Order status lifecycle.
///
/// `pending`/`confirmed` are pre-kitchen; `preparing`/`ready` are derived from
/// the items; `served`, `completed` and `cancelled` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    Pending,
    Confirmed,
    Preparing,
    Ready,
    Completed,
    Cancelled,
    Served,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "pending",
            OrderStatus::Confirmed => "confirmed",
            OrderStatus::Preparing => "preparing",
            OrderStatus::Ready => "ready",
            OrderStatus::Completed => "completed",
            OrderStatus::Cancelled => "cancelled",
            OrderStatus::Served => "served",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            OrderStatus::Completed | OrderStatus::Cancelled | OrderStatus::Served
        )
    }

    pub fn is_cancellable(&self) -> bool {
        matches!(self, OrderStatus::Pending | OrderStatus::Confirmed)
    }
}

impl core::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Item status: strictly linear `pending → preparing → ready → served`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemStatus {
    Pending,
    Preparing,
    Ready,
    Served,
}

impl ItemStatus {
    pub const ALL: [ItemStatus; 4] = [
        ItemStatus::Pending,
        ItemStatus::Preparing,
        ItemStatus::Ready,
        ItemStatus::Served,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ItemStatus::Pending => "pending",
            ItemStatus::Preparing => "preparing",
            ItemStatus::Ready => "ready",
            ItemStatus::Served => "served",
        }
    }

    /// The only legal target from this status.
    pub fn next(&self) -> Option<ItemStatus> {
        match self {
            ItemStatus::Pending => Some(ItemStatus::Preparing),
            ItemStatus::Preparing => Some(ItemStatus::Ready),
            ItemStatus::Ready => Some(ItemStatus::Served),
            ItemStatus::Served => None,
        }
    }

    pub fn is_done(&self) -> bool {
        matches!(self, ItemStatus::Ready | ItemStatus::Served)
    }
}

impl core::fmt::Display for ItemStatus {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    #[default]
    Normal,
    High,
    Urgent,
}

/// What a customer asks for; becomes an [`OrderItem`] once placed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderItemDraft {
    pub name: String,
    pub quantity: i64,
    #[serde(default)]
    pub preparation_time_minutes: u32,
    #[serde(default)]
    pub special_instructions: Option<String>,
}

impl OrderItemDraft {
    pub fn new(name: impl Into<String>, quantity: i64) -> Self {
        Self {
            name: name.into(),
            quantity,
            preparation_time_minutes: 10,
            special_instructions: None,
        }
    }

    pub fn with_preparation_time(mut self, minutes: u32) -> Self {
        self.preparation_time_minutes = minutes;
        self
    }

    pub fn with_instructions(mut self, instructions: impl Into<String>) -> Self {
        self.special_instructions = Some(instructions.into());
        self
    }
}

impl LineItem for OrderItemDraft {
    fn display_name(&self) -> &str {
        &self.name
    }
}

/// One line within an order, owned exclusively by it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderItem {
    pub id: OrderItemId,
    pub name: String,
    pub quantity: i64,
    pub status: ItemStatus,
    pub assigned_chef: Option<String>,
    pub preparation_time_minutes: u32,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub special_instructions: Option<String>,
}

impl OrderItem {
    fn from_draft(id: OrderItemId, draft: &OrderItemDraft) -> Self {
        Self {
            id,
            name: draft.name.trim().to_string(),
            quantity: draft.quantity,
            status: ItemStatus::Pending,
            assigned_chef: None,
            preparation_time_minutes: draft.preparation_time_minutes,
            started_at: None,
            completed_at: None,
            special_instructions: draft.special_instructions.clone(),
        }
    }
}

impl Entity for OrderItem {
    type Id = OrderItemId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

impl LineItem for OrderItem {
    fn display_name(&self) -> &str {
        &self.name
    }
}

/// Order-level status as a fold over item statuses.
///
/// 1. every item served → `served`
/// 2. every item ready or served → `ready`
/// 3. any item preparing → `preparing`
/// 4. otherwise the current status stands
pub fn derive_status(current: OrderStatus, items: &[OrderItem]) -> OrderStatus {
    if items.is_empty() {
        return current;
    }
    if items.iter().all(|i| i.status == ItemStatus::Served) {
        OrderStatus::Served
    } else if items.iter().all(|i| i.status.is_done()) {
        OrderStatus::Ready
    } else if items.iter().any(|i| i.status == ItemStatus::Preparing) {
        OrderStatus::Preparing
    } else {
        current
    }
}

/// Aggregate root: Order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    id: OrderId,
    order_number: String,
    status: OrderStatus,
    priority: Priority,
    items: Vec<OrderItem>,
    created_at: DateTime<Utc>,
    estimated_completion: DateTime<Utc>,
    completed_at: Option<DateTime<Utc>>,
    special_instructions: Option<String>,
    version: u64,
}

impl Order {
    /// Create an empty, not-yet-placed aggregate instance.
    pub fn empty(id: OrderId) -> Self {
        Self {
            id,
            order_number: String::new(),
            status: OrderStatus::Pending,
            priority: Priority::Normal,
            items: Vec::new(),
            created_at: DateTime::<Utc>::UNIX_EPOCH,
            estimated_completion: DateTime::<Utc>::UNIX_EPOCH,
            completed_at: None,
            special_instructions: None,
            version: 0,
        }
    }

    pub fn id_typed(&self) -> OrderId {
        self.id
    }

    pub fn order_number(&self) -> &str {
        &self.order_number
    }

    pub fn status(&self) -> OrderStatus {
        self.status
    }

    pub fn priority(&self) -> Priority {
        self.priority
    }

    pub fn items(&self) -> &[OrderItem] {
        &self.items
    }

    pub fn item(&self, item_id: OrderItemId) -> Option<&OrderItem> {
        self.items.iter().find(|i| i.id == item_id)
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn estimated_completion(&self) -> DateTime<Utc> {
        self.estimated_completion
    }

    pub fn completed_at(&self) -> Option<DateTime<Utc>> {
        self.completed_at
    }

    pub fn special_instructions(&self) -> Option<&str> {
        self.special_instructions.as_deref()
    }

    pub fn is_placed(&self) -> bool {
        self.version > 0
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }
}

impl AggregateRoot for Order {
    type Id = OrderId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn version(&self) -> u64 {
        self.version
    }
}

/// Command: PlaceOrder.
///
/// Item ids are chosen by the caller so that `handle` stays deterministic.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlaceOrder {
    pub order_id: OrderId,
    pub order_number: String,
    pub items: Vec<(OrderItemId, OrderItemDraft)>,
    pub priority: Priority,
    pub special_instructions: Option<String>,
    /// Extra minutes on top of the longest preparation time.
    pub delay_minutes: u32,
    pub occurred_at: DateTime<Utc>,
}

/// Command: ConfirmOrder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfirmOrder {
    pub order_id: OrderId,
    pub occurred_at: DateTime<Utc>,
}

/// Command: TransitionItem.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransitionItem {
    pub order_id: OrderId,
    pub item_id: OrderItemId,
    pub status: ItemStatus,
    pub occurred_at: DateTime<Utc>,
}

/// Command: CompleteOrder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompleteOrder {
    pub order_id: OrderId,
    pub occurred_at: DateTime<Utc>,
}

/// Command: CancelOrder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CancelOrder {
    pub order_id: OrderId,
    pub reason: Option<String>,
    pub occurred_at: DateTime<Utc>,
}

/// Command: ChangePriority.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangePriority {
    pub order_id: OrderId,
    pub priority: Priority,
    pub occurred_at: DateTime<Utc>,
}

/// Command: AssignChef.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssignChef {
    pub order_id: OrderId,
    pub item_id: OrderItemId,
    pub chef: String,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderCommand {
    PlaceOrder(PlaceOrder),
    ConfirmOrder(ConfirmOrder),
    TransitionItem(TransitionItem),
    CompleteOrder(CompleteOrder),
    CancelOrder(CancelOrder),
    ChangePriority(ChangePriority),
    AssignChef(AssignChef),
}

impl OrderCommand {
    pub fn order_id(&self) -> OrderId {
        match self {
            OrderCommand::PlaceOrder(c) => c.order_id,
            OrderCommand::ConfirmOrder(c) => c.order_id,
            OrderCommand::TransitionItem(c) => c.order_id,
            OrderCommand::CompleteOrder(c) => c.order_id,
            OrderCommand::CancelOrder(c) => c.order_id,
            OrderCommand::ChangePriority(c) => c.order_id,
            OrderCommand::AssignChef(c) => c.order_id,
        }
    }
}

/// Event: OrderPlaced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderPlaced {
    pub order_id: OrderId,
    pub order_number: String,
    pub items: Vec<OrderItem>,
    pub priority: Priority,
    pub special_instructions: Option<String>,
    pub estimated_completion: DateTime<Utc>,
    pub occurred_at: DateTime<Utc>,
}

/// Event: OrderConfirmed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderConfirmed {
    pub order_id: OrderId,
    pub occurred_at: DateTime<Utc>,
}

/// Event: ItemStatusChanged (carries the order status derived afterwards).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemStatusChanged {
    pub order_id: OrderId,
    pub item_id: OrderItemId,
    pub from: ItemStatus,
    pub to: ItemStatus,
    pub order_status: OrderStatus,
    pub occurred_at: DateTime<Utc>,
}

/// Event: OrderCompleted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderCompleted {
    pub order_id: OrderId,
    pub occurred_at: DateTime<Utc>,
}

/// Event: OrderCancelled.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderCancelled {
    pub order_id: OrderId,
    pub reason: Option<String>,
    pub occurred_at: DateTime<Utc>,
}

/// Event: PriorityChanged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriorityChanged {
    pub order_id: OrderId,
    pub priority: Priority,
    pub occurred_at: DateTime<Utc>,
}

/// Event: ChefAssigned.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChefAssigned {
    pub order_id: OrderId,
    pub item_id: OrderItemId,
    pub chef: String,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderEvent {
    OrderPlaced(OrderPlaced),
    OrderConfirmed(OrderConfirmed),
    ItemStatusChanged(ItemStatusChanged),
    OrderCompleted(OrderCompleted),
    OrderCancelled(OrderCancelled),
    PriorityChanged(PriorityChanged),
    ChefAssigned(ChefAssigned),
}

impl OrderEvent {
    pub fn order_id(&self) -> OrderId {
        match self {
            OrderEvent::OrderPlaced(e) => e.order_id,
            OrderEvent::OrderConfirmed(e) => e.order_id,
            OrderEvent::ItemStatusChanged(e) => e.order_id,
            OrderEvent::OrderCompleted(e) => e.order_id,
            OrderEvent::OrderCancelled(e) => e.order_id,
            OrderEvent::PriorityChanged(e) => e.order_id,
            OrderEvent::ChefAssigned(e) => e.order_id,
        }
    }
}

impl Event for OrderEvent {
    fn event_type(&self) -> &'static str {
        match self {
            OrderEvent::OrderPlaced(_) => "kitchen.order.placed",
            OrderEvent::OrderConfirmed(_) => "kitchen.order.confirmed",
            OrderEvent::ItemStatusChanged(_) => "kitchen.order.item_status_changed",
            OrderEvent::OrderCompleted(_) => "kitchen.order.completed",
            OrderEvent::OrderCancelled(_) => "kitchen.order.cancelled",
            OrderEvent::PriorityChanged(_) => "kitchen.order.priority_changed",
            OrderEvent::ChefAssigned(_) => "kitchen.order.chef_assigned",
        }
    }

    fn version(&self) -> u32 {
        1
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            OrderEvent::OrderPlaced(e) => e.occurred_at,
            OrderEvent::OrderConfirmed(e) => e.occurred_at,
            OrderEvent::ItemStatusChanged(e) => e.occurred_at,
            OrderEvent::OrderCompleted(e) => e.occurred_at,
            OrderEvent::OrderCancelled(e) => e.occurred_at,
            OrderEvent::PriorityChanged(e) => e.occurred_at,
            OrderEvent::ChefAssigned(e) => e.occurred_at,
        }
    }
}

impl Aggregate for Order {
    type Command = OrderCommand;
    type Event = OrderEvent;
    type Error = DomainError;

    fn apply(&mut self, event: &Self::Event) {
        match event {
            OrderEvent::OrderPlaced(e) => {
                self.id = e.order_id;
                self.order_number = e.order_number.clone();
                self.status = OrderStatus::Pending;
                self.priority = e.priority;
                self.items = e.items.clone();
                self.created_at = e.occurred_at;
                self.estimated_completion = e.estimated_completion;
                self.completed_at = None;
                self.special_instructions = e.special_instructions.clone();
            }
            OrderEvent::OrderConfirmed(_) => {
                self.status = OrderStatus::Confirmed;
            }
            OrderEvent::ItemStatusChanged(e) => {
                if let Some(item) = self.items.iter_mut().find(|i| i.id == e.item_id) {
                    item.status = e.to;
                    match e.to {
                        ItemStatus::Preparing => item.started_at = Some(e.occurred_at),
                        ItemStatus::Ready => item.completed_at = Some(e.occurred_at),
                        ItemStatus::Pending | ItemStatus::Served => {}
                    }
                }
                self.status = derive_status(self.status, &self.items);
                if self.status == OrderStatus::Served {
                    self.completed_at = Some(e.occurred_at);
                }
            }
            OrderEvent::OrderCompleted(e) => {
                self.status = OrderStatus::Completed;
                self.completed_at = Some(e.occurred_at);
            }
            OrderEvent::OrderCancelled(_) => {
                self.status = OrderStatus::Cancelled;
            }
            OrderEvent::PriorityChanged(e) => {
                self.priority = e.priority;
            }
            OrderEvent::ChefAssigned(e) => {
                if let Some(item) = self.items.iter_mut().find(|i| i.id == e.item_id) {
                    item.assigned_chef = Some(e.chef.clone());
                }
            }
        }

        // Deterministic version tracking: +1 per applied event.
        self.version += 1;
    }

    fn handle(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error> {
        match command {
            OrderCommand::PlaceOrder(cmd) => self.handle_place(cmd),
            OrderCommand::ConfirmOrder(cmd) => self.handle_confirm(cmd),
            OrderCommand::TransitionItem(cmd) => self.handle_transition_item(cmd),
            OrderCommand::CompleteOrder(cmd) => self.handle_complete(cmd),
            OrderCommand::CancelOrder(cmd) => self.handle_cancel(cmd),
            OrderCommand::ChangePriority(cmd) => self.handle_change_priority(cmd),
            OrderCommand::AssignChef(cmd) => self.handle_assign_chef(cmd),
        }
    }
}

impl Order {
    fn ensure_placed(&self, order_id: OrderId) -> Result<(), DomainError> {
        if !self.is_placed() {
            return Err(DomainError::not_found());
        }
        if self.id != order_id {
            return Err(DomainError::validation("order_id mismatch"));
        }
        Ok(())
    }

    fn ensure_not_terminal(&self) -> Result<(), DomainError> {
        if self.status.is_terminal() {
            return Err(DomainError::illegal_transition(format!(
                "order {} is {} and can no longer change",
                self.order_number, self.status
            )));
        }
        Ok(())
    }

    fn find_item(&self, item_id: OrderItemId) -> Result<&OrderItem, DomainError> {
        self.item(item_id).ok_or_else(DomainError::not_found)
    }

    fn handle_place(&self, cmd: &PlaceOrder) -> Result<Vec<OrderEvent>, DomainError> {
        if self.is_placed() {
            return Err(DomainError::conflict("order already exists"));
        }

        if cmd.items.is_empty() {
            return Err(DomainError::validation("order must contain at least one item"));
        }

        for (_, draft) in &cmd.items {
            if draft.name.trim().is_empty() {
                return Err(DomainError::validation("item name cannot be empty"));
            }
            if draft.quantity <= 0 {
                return Err(DomainError::validation(format!(
                    "quantity for {} must be positive",
                    draft.name
                )));
            }
        }

        let items: Vec<OrderItem> = cmd
            .items
            .iter()
            .map(|(id, draft)| OrderItem::from_draft(*id, draft))
            .collect();

        let longest = items
            .iter()
            .map(|i| i.preparation_time_minutes)
            .max()
            .unwrap_or(0);
        let estimated_completion =
            cmd.occurred_at + Duration::minutes(i64::from(longest) + i64::from(cmd.delay_minutes));

        Ok(vec![OrderEvent::OrderPlaced(OrderPlaced {
            order_id: cmd.order_id,
            order_number: cmd.order_number.clone(),
            items,
            priority: cmd.priority,
            special_instructions: cmd.special_instructions.clone(),
            estimated_completion,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_confirm(&self, cmd: &ConfirmOrder) -> Result<Vec<OrderEvent>, DomainError> {
        self.ensure_placed(cmd.order_id)?;

        if self.status != OrderStatus::Pending {
            return Err(DomainError::illegal_transition(format!(
                "only pending orders can be confirmed (order is {})",
                self.status
            )));
        }

        Ok(vec![OrderEvent::OrderConfirmed(OrderConfirmed {
            order_id: cmd.order_id,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_transition_item(&self, cmd: &TransitionItem) -> Result<Vec<OrderEvent>, DomainError> {
        self.ensure_placed(cmd.order_id)?;
        self.ensure_not_terminal()?;

        let item = self.find_item(cmd.item_id)?;
        if item.status.next() != Some(cmd.status) {
            return Err(DomainError::illegal_transition(format!(
                "item {} cannot move from {} to {}",
                item.name, item.status, cmd.status
            )));
        }

        // Preview the derived order status for the event payload; `apply`
        // recomputes it from the same fold.
        let mut preview = self.items.clone();
        if let Some(i) = preview.iter_mut().find(|i| i.id == cmd.item_id) {
            i.status = cmd.status;
        }
        let order_status = derive_status(self.status, &preview);

        Ok(vec![OrderEvent::ItemStatusChanged(ItemStatusChanged {
            order_id: cmd.order_id,
            item_id: cmd.item_id,
            from: item.status,
            to: cmd.status,
            order_status,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_complete(&self, cmd: &CompleteOrder) -> Result<Vec<OrderEvent>, DomainError> {
        self.ensure_placed(cmd.order_id)?;
        self.ensure_not_terminal()?;

        let waiting: Vec<&str> = self
            .items
            .iter()
            .filter(|i| !i.status.is_done())
            .map(|i| i.name.as_str())
            .collect();
        if !waiting.is_empty() {
            return Err(DomainError::precondition(format!(
                "items not ready yet: {}",
                waiting.join(", ")
            )));
        }

        Ok(vec![OrderEvent::OrderCompleted(OrderCompleted {
            order_id: cmd.order_id,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_cancel(&self, cmd: &CancelOrder) -> Result<Vec<OrderEvent>, DomainError> {
        self.ensure_placed(cmd.order_id)?;

        if !self.status.is_cancellable() {
            return Err(DomainError::illegal_transition(format!(
                "order {} is {} and can no longer be cancelled",
                self.order_number, self.status
            )));
        }

        Ok(vec![OrderEvent::OrderCancelled(OrderCancelled {
            order_id: cmd.order_id,
            reason: cmd.reason.clone(),
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_change_priority(&self, cmd: &ChangePriority) -> Result<Vec<OrderEvent>, DomainError> {
        self.ensure_placed(cmd.order_id)?;
        self.ensure_not_terminal()?;

        if self.priority == cmd.priority {
            return Ok(Vec::new());
        }

        Ok(vec![OrderEvent::PriorityChanged(PriorityChanged {
            order_id: cmd.order_id,
            priority: cmd.priority,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_assign_chef(&self, cmd: &AssignChef) -> Result<Vec<OrderEvent>, DomainError> {
        self.ensure_placed(cmd.order_id)?;
        self.ensure_not_terminal()?;

        if cmd.chef.trim().is_empty() {
            return Err(DomainError::validation("chef name cannot be empty"));
        }

        let item = self.find_item(cmd.item_id)?;
        if item.status == ItemStatus::Served {
            return Err(DomainError::illegal_transition(format!(
                "item {} has already been served",
                item.name
            )));
        }

        Ok(vec![OrderEvent::ChefAssigned(ChefAssigned {
            order_id: cmd.order_id,
            item_id: cmd.item_id,
            chef: cmd.chef.trim().to_string(),
            occurred_at: cmd.occurred_at,
        })])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn test_order_id() -> OrderId {
        OrderId::new()
    }

    fn test_time() -> DateTime<Utc> {
        Utc::now()
    }

    fn place_cmd(order_id: OrderId, drafts: Vec<OrderItemDraft>) -> PlaceOrder {
        PlaceOrder {
            order_id,
            order_number: "ORD-0001".to_string(),
            items: drafts.into_iter().map(|d| (OrderItemId::new(), d)).collect(),
            priority: Priority::Normal,
            special_instructions: None,
            delay_minutes: 0,
            occurred_at: test_time(),
        }
    }

    fn placed_order(drafts: Vec<OrderItemDraft>) -> Order {
        let order_id = test_order_id();
        let mut order = Order::empty(order_id);
        let events = order
            .handle(&OrderCommand::PlaceOrder(place_cmd(order_id, drafts)))
            .unwrap();
        order.apply(&events[0]);
        order
    }

    fn run(order: &mut Order, cmd: OrderCommand) -> Result<(), DomainError> {
        let events = order.handle(&cmd)?;
        for e in &events {
            order.apply(e);
        }
        Ok(())
    }

    fn transition(order: &mut Order, item_id: OrderItemId, status: ItemStatus) -> Result<(), DomainError> {
        let cmd = OrderCommand::TransitionItem(TransitionItem {
            order_id: order.id_typed(),
            item_id,
            status,
            occurred_at: test_time(),
        });
        run(order, cmd)
    }

    #[test]
    fn place_order_emits_order_placed_with_pending_items() {
        let order_id = test_order_id();
        let order = Order::empty(order_id);
        let cmd = place_cmd(
            order_id,
            vec![
                OrderItemDraft::new("Burger", 2).with_preparation_time(12),
                OrderItemDraft::new("Fries", 1).with_preparation_time(5),
            ],
        );

        let events = order.handle(&OrderCommand::PlaceOrder(cmd.clone())).unwrap();
        assert_eq!(events.len(), 1);

        match &events[0] {
            OrderEvent::OrderPlaced(e) => {
                assert_eq!(e.order_id, order_id);
                assert_eq!(e.items.len(), 2);
                assert!(e.items.iter().all(|i| i.status == ItemStatus::Pending));
                assert_eq!(e.estimated_completion, cmd.occurred_at + Duration::minutes(12));
            }
            _ => panic!("Expected OrderPlaced event"),
        }
    }

    #[test]
    fn place_order_rejects_empty_and_non_positive_quantities() {
        let order_id = test_order_id();
        let order = Order::empty(order_id);

        let err = order
            .handle(&OrderCommand::PlaceOrder(place_cmd(order_id, vec![])))
            .unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));

        let err = order
            .handle(&OrderCommand::PlaceOrder(place_cmd(
                order_id,
                vec![OrderItemDraft::new("Soup", 1), OrderItemDraft::new("Bread", 0)],
            )))
            .unwrap_err();
        match err {
            DomainError::Validation(msg) if msg.contains("Bread") => {}
            other => panic!("Expected Validation for zero quantity, got {other:?}"),
        }

        let err = order
            .handle(&OrderCommand::PlaceOrder(place_cmd(
                order_id,
                vec![OrderItemDraft::new("Bread", -2)],
            )))
            .unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }

    #[test]
    fn item_transitions_stamp_started_and_completed_once() {
        let mut order = placed_order(vec![OrderItemDraft::new("Pasta", 1)]);
        let item_id = order.items()[0].id;

        transition(&mut order, item_id, ItemStatus::Preparing).unwrap();
        let started = order.items()[0].started_at;
        assert!(started.is_some());
        assert!(order.items()[0].completed_at.is_none());

        transition(&mut order, item_id, ItemStatus::Ready).unwrap();
        assert_eq!(order.items()[0].started_at, started);
        let completed = order.items()[0].completed_at;
        assert!(completed.is_some());

        transition(&mut order, item_id, ItemStatus::Served).unwrap();
        assert_eq!(order.items()[0].started_at, started);
        assert_eq!(order.items()[0].completed_at, completed);
        assert_eq!(order.status(), OrderStatus::Served);
        assert!(order.completed_at().is_some());
    }

    #[test]
    fn skipping_or_reversing_item_status_is_illegal() {
        let mut order = placed_order(vec![OrderItemDraft::new("Pasta", 1)]);
        let item_id = order.items()[0].id;

        let err = transition(&mut order, item_id, ItemStatus::Ready).unwrap_err();
        assert!(matches!(err, DomainError::IllegalTransition(_)));

        transition(&mut order, item_id, ItemStatus::Preparing).unwrap();
        let err = transition(&mut order, item_id, ItemStatus::Pending).unwrap_err();
        assert!(matches!(err, DomainError::IllegalTransition(_)));
        assert_eq!(order.items()[0].status, ItemStatus::Preparing);
    }

    #[test]
    fn two_items_scenario_derives_preparing_then_ready() {
        let mut order = placed_order(vec![
            OrderItemDraft::new("Steak", 1),
            OrderItemDraft::new("Salad", 1),
        ]);
        let first = order.items()[0].id;
        let second = order.items()[1].id;

        transition(&mut order, first, ItemStatus::Preparing).unwrap();
        assert_eq!(order.status(), OrderStatus::Preparing);
        transition(&mut order, first, ItemStatus::Ready).unwrap();
        assert_eq!(order.status(), OrderStatus::Preparing);

        transition(&mut order, second, ItemStatus::Preparing).unwrap();
        assert_eq!(order.status(), OrderStatus::Preparing);
        transition(&mut order, second, ItemStatus::Ready).unwrap();
        assert_eq!(order.status(), OrderStatus::Ready);
    }

    #[test]
    fn complete_requires_every_item_ready() {
        let mut order = placed_order(vec![
            OrderItemDraft::new("Steak", 1),
            OrderItemDraft::new("Salad", 1),
        ]);
        let first = order.items()[0].id;
        transition(&mut order, first, ItemStatus::Preparing).unwrap();
        transition(&mut order, first, ItemStatus::Ready).unwrap();

        let before = order.clone();
        let order_id = order.id_typed();
        let err = run(
            &mut order,
            OrderCommand::CompleteOrder(CompleteOrder {
                order_id: order_id,
                occurred_at: test_time(),
            }),
        )
        .unwrap_err();
        match err {
            DomainError::Precondition(msg) if msg.contains("Salad") => {}
            other => panic!("Expected Precondition, got {other:?}"),
        }
        assert_eq!(order, before);

        let second = order.items()[1].id;
        transition(&mut order, second, ItemStatus::Preparing).unwrap();
        transition(&mut order, second, ItemStatus::Ready).unwrap();
        let order_id = order.id_typed();
        run(
            &mut order,
            OrderCommand::CompleteOrder(CompleteOrder {
                order_id: order_id,
                occurred_at: test_time(),
            }),
        )
        .unwrap();
        assert_eq!(order.status(), OrderStatus::Completed);
        assert!(order.completed_at().is_some());

        let err = transition(&mut order, second, ItemStatus::Served).unwrap_err();
        assert!(matches!(err, DomainError::IllegalTransition(_)));
    }

    #[test]
    fn cancel_only_before_kitchen_starts() {
        let mut order = placed_order(vec![OrderItemDraft::new("Soup", 1)]);
        let order_id = order.id_typed();
        run(
            &mut order,
            OrderCommand::ConfirmOrder(ConfirmOrder {
                order_id: order_id,
                occurred_at: test_time(),
            }),
        )
        .unwrap();
        assert_eq!(order.status(), OrderStatus::Confirmed);

        let mut started = order.clone();
        let item_id = started.items()[0].id;
        transition(&mut started, item_id, ItemStatus::Preparing).unwrap();
        let order_id = started.id_typed();
        let err = run(
            &mut started,
            OrderCommand::CancelOrder(CancelOrder {
                order_id: order_id,
                reason: None,
                occurred_at: test_time(),
            }),
        )
        .unwrap_err();
        assert!(matches!(err, DomainError::IllegalTransition(_)));

        let order_id = order.id_typed();

        run(
            &mut order,
            OrderCommand::CancelOrder(CancelOrder {
                order_id: order_id,
                reason: Some("customer left".to_string()),
                occurred_at: test_time(),
            }),
        )
        .unwrap();
        assert_eq!(order.status(), OrderStatus::Cancelled);

        let err = transition(&mut order, item_id, ItemStatus::Preparing).unwrap_err();
        assert!(matches!(err, DomainError::IllegalTransition(_)));
    }

    #[test]
    fn confirm_is_only_legal_from_pending() {
        let mut order = placed_order(vec![OrderItemDraft::new("Soup", 1)]);
        let confirm = OrderCommand::ConfirmOrder(ConfirmOrder {
            order_id: order.id_typed(),
            occurred_at: test_time(),
        });
        run(&mut order, confirm.clone()).unwrap();
        let err = run(&mut order, confirm).unwrap_err();
        assert!(matches!(err, DomainError::IllegalTransition(_)));
    }

    #[test]
    fn priority_change_and_chef_assignment() {
        let mut order = placed_order(vec![OrderItemDraft::new("Curry", 1)]);
        let item_id = order.items()[0].id;

        let order_id = order.id_typed();

        run(
            &mut order,
            OrderCommand::ChangePriority(ChangePriority {
                order_id: order_id,
                priority: Priority::Urgent,
                occurred_at: test_time(),
            }),
        )
        .unwrap();
        assert_eq!(order.priority(), Priority::Urgent);

        let version = order.version();
        let same = order
            .handle(&OrderCommand::ChangePriority(ChangePriority {
                order_id: order.id_typed(),
                priority: Priority::Urgent,
                occurred_at: test_time(),
            }))
            .unwrap();
        assert!(same.is_empty());
        assert_eq!(order.version(), version);

        let order_id = order.id_typed();

        run(
            &mut order,
            OrderCommand::AssignChef(AssignChef {
                order_id: order_id,
                item_id,
                chef: " Chef Maria ".to_string(),
                occurred_at: test_time(),
            }),
        )
        .unwrap();
        assert_eq!(order.items()[0].assigned_chef.as_deref(), Some("Chef Maria"));
    }

    #[test]
    fn commands_on_unplaced_order_are_not_found() {
        let order = Order::empty(test_order_id());
        let err = order
            .handle(&OrderCommand::ConfirmOrder(ConfirmOrder {
                order_id: order.id_typed(),
                occurred_at: test_time(),
            }))
            .unwrap_err();
        assert_eq!(err, DomainError::NotFound);
    }

    #[test]
    fn handle_does_not_mutate_state() {
        let order = placed_order(vec![OrderItemDraft::new("Pasta", 1)]);
        let cmd = OrderCommand::TransitionItem(TransitionItem {
            order_id: order.id_typed(),
            item_id: order.items()[0].id,
            status: ItemStatus::Preparing,
            occurred_at: test_time(),
        });

        let before = order.clone();
        let events1 = order.handle(&cmd).unwrap();
        let events2 = order.handle(&cmd).unwrap();

        assert_eq!(order, before);
        assert_eq!(events1, events2);
    }

    #[test]
    fn version_increments_on_apply() {
        let mut order = placed_order(vec![OrderItemDraft::new("Pasta", 1)]);
        assert_eq!(order.version(), 1);
        let item_id = order.items()[0].id;
        transition(&mut order, item_id, ItemStatus::Preparing).unwrap();
        assert_eq!(order.version(), 2);
    }

    #[test]
    fn item_status_event_reports_derived_order_status() {
        let order = placed_order(vec![OrderItemDraft::new("Pasta", 1)]);
        let events = order
            .handle(&OrderCommand::TransitionItem(TransitionItem {
                order_id: order.id_typed(),
                item_id: order.items()[0].id,
                status: ItemStatus::Preparing,
                occurred_at: test_time(),
            }))
            .unwrap();
        match &events[0] {
            OrderEvent::ItemStatusChanged(e) => {
                assert_eq!(e.from, ItemStatus::Pending);
                assert_eq!(e.order_status, OrderStatus::Preparing);
            }
            _ => panic!("Expected ItemStatusChanged event"),
        }
    }

    proptest! {
        #![proptest_config(ProptestConfig {
            cases: 256,
            ..ProptestConfig::default()
        })]

        /// Property: after any sequence of attempted item transitions, the order
        /// status equals a fresh fold over the items, and every rejected attempt
        /// was a non-successor move.
        #[test]
        fn order_status_matches_fresh_derivation(
            item_count in 1usize..5,
            attempts in prop::collection::vec((0usize..5, 0usize..4), 0..40),
        ) {
            let drafts = (0..item_count)
                .map(|n| OrderItemDraft::new(format!("Dish {n}"), 1))
                .collect();
            let mut order = placed_order(drafts);

            for (idx, target) in attempts {
                let item = order.items()[idx % item_count].clone();
                let target = ItemStatus::ALL[target];
                let before_status = order.status();
                let result = transition(&mut order, item.id, target);

                if before_status.is_terminal() {
                    prop_assert!(result.is_err());
                    continue;
                }
                match result {
                    Ok(()) => prop_assert_eq!(item.status.next(), Some(target)),
                    Err(DomainError::IllegalTransition(_)) => {
                        prop_assert_ne!(item.status.next(), Some(target));
                    }
                    Err(other) => prop_assert!(false, "unexpected error {:?}", other),
                }

                let fresh = derive_status(before_status, order.items());
                prop_assert_eq!(order.status(), fresh);
            }
        }
    }
}
