use axum::{Router, routing::get};

use crate::{AppState, controllers::health_controller};

pub fn app(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_controller::health))
        .route("/health/db", get(health_controller::health_db))
        .route("/health/monitor", get(health_controller::health_monitor))
        .with_state(state)
}
