//! WebSocket endpoint for mission telemetry.

use std::sync::Arc;

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::Response,
};
use survey_core::models::TelemetryReply;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::api::extract::ApiPath;
use crate::session::{CloseReason, Step, TelemetrySession, MISSION_NOT_FOUND};
use crate::state::AppState;

/// Upgrade to a telemetry session. Refusals, including ids that are not
/// UUIDs, are sent as close frames after the upgrade.
pub async fn telemetry_ws(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
    ApiPath(raw_id): ApiPath<String>,
) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, state, raw_id))
}

async fn handle_socket(mut socket: WebSocket, state: Arc<AppState>, raw_id: String) {
    let Ok(mission_id) = Uuid::parse_str(&raw_id) else {
        info!("Refused telemetry session for malformed mission id {:?}", raw_id);
        let _ = socket
            .send(CloseReason::policy(MISSION_NOT_FOUND).into_message())
            .await;
        return;
    };

    let session = match TelemetrySession::open(&state, mission_id).await {
        Ok(session) => session,
        Err(close) => {
            info!("Refused telemetry session for mission {}: {}", mission_id, close.reason);
            let _ = socket.send(close.into_message()).await;
            return;
        }
    };
    info!("Telemetry session opened for mission {}", mission_id);

    let idle_timeout = state.config().telemetry_idle_timeout();

    loop {
        let incoming = match idle_timeout {
            Some(limit) => match tokio::time::timeout(limit, socket.recv()).await {
                Ok(incoming) => incoming,
                Err(_) => {
                    info!("Telemetry session for mission {} idle, closing", mission_id);
                    let _ = socket.send(CloseReason::idle().into_message()).await;
                    break;
                }
            },
            None => socket.recv().await,
        };

        let step = match incoming {
            Some(Ok(Message::Text(text))) => session.handle_text(&text).await,
            Some(Ok(Message::Binary(_))) => Step::Reply(TelemetryReply::Rejected {
                reason: "frame: expected a JSON text frame".to_string(),
            }),
            Some(Ok(Message::Ping(payload))) => {
                if socket.send(Message::Pong(payload)).await.is_err() {
                    break;
                }
                continue;
            }
            Some(Ok(Message::Pong(_))) => continue,
            Some(Ok(Message::Close(_))) | None => break,
            Some(Err(err)) => {
                warn!("Telemetry socket error for mission {}: {}", mission_id, err);
                break;
            }
        };

        match step {
            Step::Reply(reply) => {
                let payload = match serde_json::to_string(&reply) {
                    Ok(payload) => payload,
                    Err(err) => {
                        error!("Failed to encode telemetry reply: {}", err);
                        let _ = socket.send(CloseReason::store_failure().into_message()).await;
                        break;
                    }
                };
                if socket.send(Message::Text(payload)).await.is_err() {
                    break;
                }
            }
            Step::Close(close) => {
                warn!(
                    "Closing telemetry session for mission {} ({}): {}",
                    mission_id, close.code, close.reason
                );
                let _ = socket.send(close.into_message()).await;
                break;
            }
        }
    }

    info!("Telemetry session closed for mission {}", session.mission_id());
}
