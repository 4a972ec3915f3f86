//! Survey site endpoints.

use std::sync::Arc;

use axum::{extract::State, http::StatusCode, Json};
use survey_core::models::{CreateSiteRequest, Site};
use uuid::Uuid;

use crate::api::extract::{ApiJson, ApiPath};
use crate::error::ApiResult;
use crate::state::AppState;

/// Create a site. Polygon sites get their area computed from the outer ring.
pub async fn create_site(
    State(state): State<Arc<AppState>>,
    ApiJson(req): ApiJson<CreateSiteRequest>,
) -> ApiResult<(StatusCode, Json<Site>)> {
    let site = state.store.create_site(req).await?;
    Ok((StatusCode::CREATED, Json(site)))
}

pub async fn list_sites(State(state): State<Arc<AppState>>) -> ApiResult<Json<Vec<Site>>> {
    Ok(Json(state.store.list_sites().await?))
}

pub async fn get_site(
    State(state): State<Arc<AppState>>,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<Json<Site>> {
    Ok(Json(state.store.get_site(id).await?))
}

pub async fn delete_site(
    State(state): State<Arc<AppState>>,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<StatusCode> {
    state.store.delete_site(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
