use std::sync::Arc;

use axum::{
    Json, Router,
    extract::Extension,
    http::StatusCode,
    response::IntoResponse,
    routing::get,
};

use kitchenflow_inventory::{InventoryItem, check_availability as availability_of, estimate_delay};

use crate::app::services::AppServices;
use crate::app::{dto, errors};

pub fn router() -> Router {
    Router::new().route("/items", get(list_items).put(replace_items))
}

pub async fn list_items(Extension(services): Extension<Arc<AppServices>>) -> impl IntoResponse {
    Json(services.inventory.items())
}

/// Replace the stock snapshot; responds with the re-derived alert set.
pub async fn replace_items(
    Extension(services): Extension<Arc<AppServices>>,
    Json(items): Json<Vec<InventoryItem>>,
) -> axum::response::Response {
    tracing::info!(items = items.len(), "inventory snapshot replaced");
    match services.replace_inventory(items).await {
        Ok(alerts) => (StatusCode::OK, Json(alerts)).into_response(),
        Err(e) => errors::fetch_error_to_response(e),
    }
}

/// Availability and stock delay for a prospective order; nothing is placed.
pub async fn check_availability(
    Extension(services): Extension<Arc<AppServices>>,
    Json(body): Json<dto::AvailabilityRequest>,
) -> impl IntoResponse {
    let alerts = services.current_alerts().await;
    Json(dto::AvailabilityResponse {
        availability: availability_of(&body.items, &alerts),
        delay: estimate_delay(&body.items, &alerts),
    })
}
