//! HTTP and WebSocket surface of the survey server.

pub mod drones;
pub mod extract;
pub mod missions;
pub mod request_id;
mod routes;
pub mod sites;
pub mod telemetry;

use std::sync::Arc;

use axum::Router;

use crate::state::AppState;

/// Build the full application router with its middleware stack.
pub fn router(state: Arc<AppState>) -> Router {
    request_id::layer(routes::create_router())
        .with_state(state)
}
