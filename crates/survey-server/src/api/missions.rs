//! Mission lifecycle endpoints.

use std::sync::Arc;

use axum::{extract::State, http::StatusCode, Json};
use survey_core::lifecycle::Transition;
use survey_core::models::{CreateMissionRequest, Mission};
use uuid::Uuid;

use crate::api::extract::{ApiJson, ApiPath};
use crate::error::ApiResult;
use crate::state::AppState;

/// Plan a mission. The drone is claimed immediately.
pub async fn create_mission(
    State(state): State<Arc<AppState>>,
    ApiJson(req): ApiJson<CreateMissionRequest>,
) -> ApiResult<(StatusCode, Json<Mission>)> {
    let mission = state.store.create_mission(req).await?;
    Ok((StatusCode::CREATED, Json(mission)))
}

pub async fn list_missions(State(state): State<Arc<AppState>>) -> ApiResult<Json<Vec<Mission>>> {
    Ok(Json(state.store.list_missions().await?))
}

pub async fn get_mission(
    State(state): State<Arc<AppState>>,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<Json<Mission>> {
    Ok(Json(state.store.get_mission(id).await?))
}

pub async fn start_mission(
    State(state): State<Arc<AppState>>,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<Json<Mission>> {
    Ok(Json(state.store.transition(id, Transition::Start).await?))
}

pub async fn complete_mission(
    State(state): State<Arc<AppState>>,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<Json<Mission>> {
    Ok(Json(state.store.transition(id, Transition::Complete).await?))
}

pub async fn abort_mission(
    State(state): State<Arc<AppState>>,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<Json<Mission>> {
    Ok(Json(state.store.transition(id, Transition::Abort).await?))
}
