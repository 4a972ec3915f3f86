//! Drone fleet endpoints.

use std::sync::Arc;

use axum::{extract::State, http::StatusCode, Json};
use survey_core::models::{CreateDroneRequest, Drone, DroneStatusUpdate};
use uuid::Uuid;

use crate::api::extract::{ApiJson, ApiPath};
use crate::error::ApiResult;
use crate::state::AppState;

/// Register a drone. Status defaults to AVAILABLE.
pub async fn create_drone(
    State(state): State<Arc<AppState>>,
    ApiJson(req): ApiJson<CreateDroneRequest>,
) -> ApiResult<(StatusCode, Json<Drone>)> {
    let drone = state.store.create_drone(req).await?;
    Ok((StatusCode::CREATED, Json(drone)))
}

pub async fn list_drones(State(state): State<Arc<AppState>>) -> ApiResult<Json<Vec<Drone>>> {
    Ok(Json(state.store.list_drones().await?))
}

pub async fn get_drone(
    State(state): State<Arc<AppState>>,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<Json<Drone>> {
    Ok(Json(state.store.get_drone(id).await?))
}

/// Move a drone in or out of maintenance.
pub async fn update_drone_status(
    State(state): State<Arc<AppState>>,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(req): ApiJson<DroneStatusUpdate>,
) -> ApiResult<Json<Drone>> {
    Ok(Json(state.store.set_drone_status(id, req.status).await?))
}

pub async fn delete_drone(
    State(state): State<Arc<AppState>>,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<StatusCode> {
    state.store.delete_drone(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
