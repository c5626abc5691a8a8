//! Kitchen order state machine (event-sourced aggregate + in-memory board).
//!
//! Item statuses move strictly forward and the order status is derived from
//! them on every item transition. [`KitchenBoard`] owns the live orders and
//! publishes one [`OrderEvent`] per accepted mutation.

pub mod activity;
pub mod board;
pub mod order;
pub mod tracking;

pub use activity::{ActivityEntry, ActivityFeed};
pub use board::{KitchenBoard, OrderRequest, Placement};
pub use order::{
    AssignChef, CancelOrder, ChangePriority, ChefAssigned, CompleteOrder, ConfirmOrder, ItemStatus,
    ItemStatusChanged, Order, OrderCancelled, OrderCommand, OrderCompleted, OrderConfirmed,
    OrderEvent, OrderItem, OrderItemDraft, OrderPlaced, OrderStatus, PlaceOrder, Priority,
    PriorityChanged, TransitionItem, derive_status,
};
pub use tracking::{
    WaitEstimate, estimated_wait, is_overdue, progress_percentage, queue_order, status_message,
};
