//! Route table.

use std::sync::Arc;

use axum::{
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::{get, patch, post},
    Json, Router,
};
use serde_json::json;

use crate::api::{drones, missions, sites, telemetry};
use crate::state::AppState;

pub fn create_router() -> Router<Arc<AppState>> {
    let v1 = Router::new()
        // Drones
        .route("/drones", post(drones::create_drone).get(drones::list_drones))
        .route("/drones/:id", get(drones::get_drone).delete(drones::delete_drone))
        .route("/drones/:id/status", patch(drones::update_drone_status))
        // Sites
        .route("/sites", post(sites::create_site).get(sites::list_sites))
        .route("/sites/:id", get(sites::get_site).delete(sites::delete_site))
        // Missions
        .route("/missions", post(missions::create_mission).get(missions::list_missions))
        .route("/missions/:id", get(missions::get_mission))
        .route("/missions/:id/start", post(missions::start_mission))
        .route("/missions/:id/complete", post(missions::complete_mission))
        .route("/missions/:id/abort", post(missions::abort_mission))
        // Telemetry stream
        .route("/missions/:id/telemetry", get(telemetry::telemetry_ws));

    Router::new()
        .route("/", get(welcome))
        .route("/health", get(health))
        .nest("/api/v1", v1)
}

async fn welcome() -> Json<serde_json::Value> {
    Json(json!({ "message": "Welcome to the drone survey mission API" }))
}

async fn health(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let active_sessions = state.sessions.active_count();
    match state.store.ping().await {
        Ok(()) => (
            StatusCode::OK,
            Json(json!({ "status": "healthy", "active_sessions": active_sessions })),
        ),
        Err(err) => {
            tracing::warn!("Health check failed: {}", err);
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({ "status": "unhealthy", "active_sessions": active_sessions })),
            )
        }
    }
}
