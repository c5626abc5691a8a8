use axum::{Router, routing::post};

pub mod alerts;
pub mod inventory;
pub mod orders;
pub mod system;

/// Router for every endpoint except `/health`.
pub fn router() -> Router {
    Router::new()
        .nest("/orders", orders::router())
        .nest("/inventory", inventory::router())
        .nest("/alerts", alerts::router())
        .route("/availability/check", post(inventory::check_availability))
}
