use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Extension, Path, Query},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};
use chrono::Utc;

use kitchenflow_core::DomainResult;
use kitchenflow_kitchen::{
    Order, OrderRequest, estimated_wait, is_overdue, progress_percentage, status_message,
};

use crate::app::services::AppServices;
use crate::app::{dto, errors};

pub fn router() -> Router {
    Router::new()
        .route("/", post(place_order).get(list_active))
        .route("/all", get(list_all))
        .route("/activity", get(recent_activity))
        .route("/:id", get(get_order))
        .route("/:id/tracking", get(track_order))
        .route("/:id/activity", get(order_activity))
        .route("/:id/confirm", post(confirm_order))
        .route("/:id/complete", post(complete_order))
        .route("/:id/cancel", post(cancel_order))
        .route("/:id/priority", post(change_priority))
        .route("/:id/items/:item_id/transition", post(transition_item))
        .route("/:id/items/:item_id/chef", post(assign_chef))
}

fn order_response(result: DomainResult<Order>) -> axum::response::Response {
    match result {
        Ok(order) => (StatusCode::OK, Json(order)).into_response(),
        Err(e) => errors::domain_error_to_response(e),
    }
}

/// Place an order, checking it against freshly derived inventory alerts.
pub async fn place_order(
    Extension(services): Extension<Arc<AppServices>>,
    Json(body): Json<OrderRequest>,
) -> axum::response::Response {
    let alerts = services.current_alerts().await;

    match services.board.place_order_with_alerts(body, &alerts) {
        Ok(placement) => (StatusCode::CREATED, Json(placement)).into_response(),
        Err(e) => errors::domain_error_to_response(e),
    }
}

/// Non-terminal orders in kitchen queue order.
pub async fn list_active(
    Extension(services): Extension<Arc<AppServices>>,
) -> impl IntoResponse {
    Json(services.board.active_queue())
}

pub async fn list_all(Extension(services): Extension<Arc<AppServices>>) -> impl IntoResponse {
    Json(services.board.all())
}

/// Latest board events across all orders, newest first.
pub async fn recent_activity(
    Extension(services): Extension<Arc<AppServices>>,
    Query(query): Query<dto::ActivityQuery>,
) -> impl IntoResponse {
    Json(services.activity.recent(query.limit.unwrap_or(50)))
}

pub async fn order_activity(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let order_id = match dto::parse_order_id(&id) {
        Ok(id) => id,
        Err(resp) => return resp,
    };
    if let Err(e) = services.board.get(order_id) {
        return errors::domain_error_to_response(e);
    }
    (StatusCode::OK, Json(services.activity.for_order(order_id))).into_response()
}

pub async fn get_order(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let order_id = match dto::parse_order_id(&id) {
        Ok(id) => id,
        Err(resp) => return resp,
    };
    order_response(services.board.get(order_id))
}

/// Customer-facing view: progress, message, wait estimate.
pub async fn track_order(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let order_id = match dto::parse_order_id(&id) {
        Ok(id) => id,
        Err(resp) => return resp,
    };
    let order = match services.board.get(order_id) {
        Ok(order) => order,
        Err(e) => return errors::domain_error_to_response(e),
    };

    let now = Utc::now();
    let body = dto::TrackingResponse {
        order_id: order.id_typed(),
        order_number: order.order_number().to_string(),
        status: order.status(),
        progress: progress_percentage(order.status()),
        message: status_message(order.status()),
        estimated_wait: estimated_wait(&order, now).to_string(),
        overdue: is_overdue(&order, now),
    };
    (StatusCode::OK, Json(body)).into_response()
}

pub async fn confirm_order(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let order_id = match dto::parse_order_id(&id) {
        Ok(id) => id,
        Err(resp) => return resp,
    };
    order_response(services.board.confirm_order(order_id))
}

pub async fn complete_order(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let order_id = match dto::parse_order_id(&id) {
        Ok(id) => id,
        Err(resp) => return resp,
    };
    order_response(services.board.complete_order(order_id))
}

pub async fn cancel_order(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
    body: Option<Json<dto::CancelOrderRequest>>,
) -> axum::response::Response {
    let order_id = match dto::parse_order_id(&id) {
        Ok(id) => id,
        Err(resp) => return resp,
    };
    let reason = body.and_then(|Json(b)| b.reason);
    order_response(services.board.cancel_order(order_id, reason))
}

pub async fn change_priority(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
    Json(body): Json<dto::ChangePriorityRequest>,
) -> axum::response::Response {
    let order_id = match dto::parse_order_id(&id) {
        Ok(id) => id,
        Err(resp) => return resp,
    };
    order_response(services.board.change_priority(order_id, body.priority))
}

pub async fn transition_item(
    Extension(services): Extension<Arc<AppServices>>,
    Path((id, item_id)): Path<(String, String)>,
    Json(body): Json<dto::TransitionItemRequest>,
) -> axum::response::Response {
    let order_id = match dto::parse_order_id(&id) {
        Ok(id) => id,
        Err(resp) => return resp,
    };
    let item_id = match dto::parse_item_id(&item_id) {
        Ok(id) => id,
        Err(resp) => return resp,
    };
    order_response(services.board.transition_item(order_id, item_id, body.status))
}

pub async fn assign_chef(
    Extension(services): Extension<Arc<AppServices>>,
    Path((id, item_id)): Path<(String, String)>,
    Json(body): Json<dto::AssignChefRequest>,
) -> axum::response::Response {
    let order_id = match dto::parse_order_id(&id) {
        Ok(id) => id,
        Err(resp) => return resp,
    };
    let item_id = match dto::parse_item_id(&item_id) {
        Ok(id) => id,
        Err(resp) => return resp,
    };
    order_response(services.board.assign_chef(order_id, item_id, body.chef))
}
