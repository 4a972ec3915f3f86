//! Telemetry ingestion session.
//!
//! A session is bound to one IN_PROGRESS mission. Each inbound text frame is
//! one report; reports are appended strictly in arrival order and answered
//! with an ACK carrying the new progress, or a REJECTED frame when the report
//! is malformed. Store faults and missions leaving IN_PROGRESS end the
//! session. Ending a session never changes the mission.

use std::borrow::Cow;

use axum::extract::ws::{close_code, CloseFrame, Message};
use chrono::Utc;
use survey_core::models::{MissionStatus, TelemetryReply, TelemetryReport};
use survey_core::{telemetry, SurveyError};
use tracing::{debug, error};
use uuid::Uuid;

use crate::error::ApiError;
use crate::state::{AppState, SessionGuard};
use crate::store::SurveyStore;

pub const MISSION_NOT_FOUND: &str = "mission not found";
pub const MISSION_NOT_IN_PROGRESS: &str = "mission not in progress";
pub const SESSION_ALREADY_ACTIVE: &str = "telemetry session already active";

/// Why a session was refused or ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CloseReason {
    pub code: u16,
    pub reason: Cow<'static, str>,
}

impl CloseReason {
    pub fn policy(reason: &'static str) -> Self {
        Self {
            code: close_code::POLICY,
            reason: Cow::Borrowed(reason),
        }
    }

    pub fn store_failure() -> Self {
        Self {
            code: close_code::ERROR,
            reason: Cow::Borrowed("telemetry store failure"),
        }
    }

    pub fn idle() -> Self {
        Self {
            code: close_code::AWAY,
            reason: Cow::Borrowed("telemetry session idle"),
        }
    }

    pub fn into_message(self) -> Message {
        Message::Close(Some(CloseFrame {
            code: self.code,
            reason: self.reason,
        }))
    }
}

/// Outcome of one inbound frame.
#[derive(Debug, Clone, PartialEq)]
pub enum Step {
    Reply(TelemetryReply),
    Close(CloseReason),
}

pub struct TelemetrySession {
    store: SurveyStore,
    guard: SessionGuard,
}

impl TelemetrySession {
    /// Bind a session to a mission.
    ///
    /// Refused when the mission is missing, not IN_PROGRESS, or already has a
    /// session attached.
    pub async fn open(state: &AppState, mission_id: Uuid) -> Result<Self, CloseReason> {
        let mission = match state.store.get_mission(mission_id).await {
            Ok(mission) => mission,
            Err(ApiError::Domain(SurveyError::NotFound { .. })) => {
                return Err(CloseReason::policy(MISSION_NOT_FOUND));
            }
            Err(err) => {
                error!("Failed to load mission {} for telemetry: {}", mission_id, err);
                return Err(CloseReason::store_failure());
            }
        };

        if mission.status != MissionStatus::InProgress {
            return Err(CloseReason::policy(MISSION_NOT_IN_PROGRESS));
        }

        let guard = state
            .sessions
            .try_register(mission_id)
            .ok_or(CloseReason::policy(SESSION_ALREADY_ACTIVE))?;

        Ok(Self {
            store: state.store.clone(),
            guard,
        })
    }

    pub fn mission_id(&self) -> Uuid {
        self.guard.mission_id()
    }

    /// Process one text frame.
    pub async fn handle_text(&self, text: &str) -> Step {
        let report: TelemetryReport = match serde_json::from_str(text) {
            Ok(report) => report,
            Err(err) => return Step::Reply(rejected("report", err)),
        };
        if let Err(err) = telemetry::validate_report(&report) {
            return Step::Reply(rejected_domain(err));
        }

        match self
            .store
            .append_telemetry(self.mission_id(), &report, Utc::now())
            .await
        {
            Ok(progress) => {
                debug!("Mission {} progress {:.1}%", self.mission_id(), progress);
                Step::Reply(TelemetryReply::Ack { progress })
            }
            Err(ApiError::Domain(SurveyError::InvalidArgument { field, message })) => {
                Step::Reply(rejected(&field, message))
            }
            Err(ApiError::Domain(SurveyError::NotFound { .. })) => {
                Step::Close(CloseReason::policy(MISSION_NOT_FOUND))
            }
            Err(ApiError::Domain(SurveyError::InvalidState(_))) => {
                Step::Close(CloseReason::policy(MISSION_NOT_IN_PROGRESS))
            }
            Err(err) => {
                error!("Telemetry append failed for mission {}: {}", self.mission_id(), err);
                Step::Close(CloseReason::store_failure())
            }
        }
    }
}

fn rejected(field: &str, message: impl std::fmt::Display) -> TelemetryReply {
    TelemetryReply::Rejected {
        reason: format!("{field}: {message}"),
    }
}

fn rejected_domain(err: SurveyError) -> TelemetryReply {
    match err {
        SurveyError::InvalidArgument { field, message } => rejected(&field, message),
        other => TelemetryReply::Rejected {
            reason: other.to_string(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::persistence::init_database;
    use serde_json::json;
    use survey_core::lifecycle::Transition;
    use survey_core::models::{
        CreateDroneRequest, CreateMissionRequest, CreateSiteRequest, LineString, Mission, Position,
    };

    async fn state() -> AppState {
        let path = std::env::temp_dir().join(format!("survey-session-{}.db", Uuid::new_v4()));
        let db = init_database(&path.to_string_lossy(), 4).await.unwrap();
        AppState::new(db, Config::from_env())
    }

    async fn mission(state: &AppState) -> Mission {
        let drone = state
            .store
            .create_drone(CreateDroneRequest {
                model: "Mavic 3E".into(),
                status: None,
                battery_level: None,
            })
            .await
            .unwrap();
        let site = state
            .store
            .create_site(CreateSiteRequest {
                name: "Quarry".into(),
                location: json!({"type": "Point", "coordinates": [7.1, 50.7]}),
                area: 2500.0,
            })
            .await
            .unwrap();
        state
            .store
            .create_mission(CreateMissionRequest {
                drone_id: drone.id,
                site_id: site.id,
                planned_path: LineString::new(vec![
                    Position::new(7.100, 50.700),
                    Position::new(7.101, 50.700),
                ]),
            })
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn open_is_refused_unless_in_progress() {
        let state = state().await;
        let m = mission(&state).await;

        let refused = TelemetrySession::open(&state, Uuid::new_v4()).await.err();
        assert_eq!(refused, Some(CloseReason::policy(MISSION_NOT_FOUND)));

        let refused = TelemetrySession::open(&state, m.id).await.err();
        assert_eq!(refused, Some(CloseReason::policy(MISSION_NOT_IN_PROGRESS)));

        state.store.transition(m.id, Transition::Start).await.unwrap();
        let session = TelemetrySession::open(&state, m.id).await.unwrap();

        let refused = TelemetrySession::open(&state, m.id).await.err();
        assert_eq!(refused, Some(CloseReason::policy(SESSION_ALREADY_ACTIVE)));

        drop(session);
        assert!(TelemetrySession::open(&state, m.id).await.is_ok());
    }

    #[tokio::test]
    async fn malformed_reports_do_not_end_the_session() {
        let state = state().await;
        let m = mission(&state).await;
        state.store.transition(m.id, Transition::Start).await.unwrap();
        let session = TelemetrySession::open(&state, m.id).await.unwrap();

        for frame in ["not json", r#"{"lng": 7.1}"#, r#"{"lat": 95.0, "lng": 7.1}"#] {
            match session.handle_text(frame).await {
                Step::Reply(TelemetryReply::Rejected { reason }) => assert!(!reason.is_empty()),
                other => panic!("expected rejection for {frame}, got {other:?}"),
            }
        }

        let step = session.handle_text(r#"{"lat": 50.7, "lng": 7.1}"#).await;
        assert_eq!(step, Step::Reply(TelemetryReply::Ack { progress: 50.0 }));

        let stored = state.store.get_mission(m.id).await.unwrap();
        assert_eq!(stored.actual_len(), 1);
    }

    #[tokio::test]
    async fn odd_vehicle_fields_still_record_the_position() {
        let state = state().await;
        let m = mission(&state).await;
        state.store.transition(m.id, Transition::Start).await.unwrap();
        let session = TelemetrySession::open(&state, m.id).await.unwrap();

        let step = session
            .handle_text(r#"{"lat": 50.7, "lng": 7.1, "timestamp": "2024-05-01T10:00:00"}"#)
            .await;
        assert_eq!(step, Step::Reply(TelemetryReply::Ack { progress: 50.0 }));

        let step = session
            .handle_text(r#"{"lat": 50.7, "lng": 7.101, "battery": 100.5, "speed": "n/a"}"#)
            .await;
        assert_eq!(step, Step::Reply(TelemetryReply::Ack { progress: 100.0 }));

        let stored = state.store.get_mission(m.id).await.unwrap();
        assert_eq!(stored.actual_len(), 2);

        let drone = state.store.get_drone(m.drone_id).await.unwrap();
        assert_eq!(drone.battery_level, None);
        assert!(drone.last_heartbeat.is_some());
    }

    #[tokio::test]
    async fn leaving_in_progress_closes_the_session() {
        let state = state().await;
        let m = mission(&state).await;
        state.store.transition(m.id, Transition::Start).await.unwrap();
        let session = TelemetrySession::open(&state, m.id).await.unwrap();

        state.store.transition(m.id, Transition::Abort).await.unwrap();

        let step = session.handle_text(r#"{"lat": 50.7, "lng": 7.1}"#).await;
        assert_eq!(step, Step::Close(CloseReason::policy(MISSION_NOT_IN_PROGRESS)));

        let stored = state.store.get_mission(m.id).await.unwrap();
        assert_eq!(stored.status, MissionStatus::Aborted);
        assert!(stored.actual_path.is_none());
    }
}
