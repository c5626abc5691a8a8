use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Extension, Path},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};

use kitchenflow_inventory::AlertId;

use crate::app::errors;
use crate::app::services::AppServices;

pub fn router() -> Router {
    Router::new()
        .route("/", get(list_alerts))
        .route("/critical", get(list_critical))
        .route("/:id/acknowledge", post(acknowledge_alert))
}

/// Alerts derived from the current inventory snapshot, most urgent first.
pub async fn list_alerts(Extension(services): Extension<Arc<AppServices>>) -> impl IntoResponse {
    services.current_alerts().await;
    Json(services.alerts.ranked())
}

pub async fn list_critical(
    Extension(services): Extension<Arc<AppServices>>,
) -> impl IntoResponse {
    services.current_alerts().await;
    Json(services.alerts.critical())
}

pub async fn acknowledge_alert(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let alert_id = AlertId::from(id);

    // Alerts are only derived on read; make sure a fresh id is known.
    if !services.alerts.alerts().iter().any(|a| a.id == alert_id) {
        services.current_alerts().await;
    }

    match services.alerts.acknowledge(&alert_id).await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => errors::sync_error_to_response(e),
    }
}
