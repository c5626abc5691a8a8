use serde::{Deserialize, Serialize};

use kitchenflow_core::{OrderId, OrderItemId};
use kitchenflow_inventory::{AvailabilityReport, DelayEstimate, RequestedItem};
use kitchenflow_kitchen::{ItemStatus, OrderStatus, Priority};

use crate::app::errors;

// -------------------------
// Request DTOs
// -------------------------

#[derive(Debug, Default, Deserialize)]
pub struct CancelOrderRequest {
    pub reason: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ChangePriorityRequest {
    pub priority: Priority,
}

#[derive(Debug, Deserialize)]
pub struct TransitionItemRequest {
    pub status: ItemStatus,
}

#[derive(Debug, Deserialize)]
pub struct AssignChefRequest {
    pub chef: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct ActivityQuery {
    pub limit: Option<usize>,
}

#[derive(Debug, Deserialize)]
pub struct AvailabilityRequest {
    pub items: Vec<RequestedItem>,
}

// -------------------------
// Response DTOs
// -------------------------

#[derive(Debug, Serialize)]
pub struct AvailabilityResponse {
    pub availability: AvailabilityReport,
    pub delay: DelayEstimate,
}

#[derive(Debug, Serialize)]
pub struct TrackingResponse {
    pub order_id: OrderId,
    pub order_number: String,
    pub status: OrderStatus,
    pub progress: u8,
    pub message: &'static str,
    pub estimated_wait: String,
    pub overdue: bool,
}

// -------------------------
// Path parsing
// -------------------------

pub fn parse_order_id(raw: &str) -> Result<OrderId, axum::response::Response> {
    raw.parse().map_err(|_| {
        errors::json_error(
            axum::http::StatusCode::BAD_REQUEST,
            "invalid_id",
            "invalid order id",
        )
    })
}

pub fn parse_item_id(raw: &str) -> Result<OrderItemId, axum::response::Response> {
    raw.parse().map_err(|_| {
        errors::json_error(
            axum::http::StatusCode::BAD_REQUEST,
            "invalid_id",
            "invalid item id",
        )
    })
}
