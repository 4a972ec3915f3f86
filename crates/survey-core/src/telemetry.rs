//! Applying telemetry reports to a mission's actual path.

use chrono::{DateTime, Utc};

use crate::error::{SurveyError, SurveyResult};
use crate::models::{Drone, LineString, Mission, MissionStatus, TelemetryReport};

/// Progress as the ratio of reported points to planned waypoints, capped at 100.
///
/// This tracks report count, not distance flown along the planned route.
pub fn progress(actual_points: usize, planned_points: usize) -> f64 {
    if planned_points == 0 {
        return 0.0;
    }
    (actual_points as f64 / planned_points as f64 * 100.0).min(100.0)
}

/// Reject reports that cannot be placed on the map.
///
/// Vehicle fields (battery, timestamp, speed, heading) never fail a report.
pub fn validate_report(report: &TelemetryReport) -> SurveyResult<()> {
    if !report.lat.is_finite() || !(-90.0..=90.0).contains(&report.lat) {
        return Err(SurveyError::invalid_argument(
            "lat",
            format!("{} is outside -90..90", report.lat),
        ));
    }
    if !report.lng.is_finite() || !(-180.0..=180.0).contains(&report.lng) {
        return Err(SurveyError::invalid_argument(
            "lng",
            format!("{} is outside -180..180", report.lng),
        ));
    }
    if let Some(alt) = report.alt {
        if !alt.is_finite() {
            return Err(SurveyError::invalid_argument("alt", "must be a finite number"));
        }
    }
    Ok(())
}

/// Append a report to the mission and recompute progress.
///
/// Only IN_PROGRESS missions accept telemetry. Existing points are never
/// reordered or dropped. Returns the new progress value.
pub fn append_report(mission: &mut Mission, report: &TelemetryReport) -> SurveyResult<f64> {
    validate_report(report)?;

    if mission.status != MissionStatus::InProgress {
        return Err(SurveyError::InvalidState(format!(
            "mission {} is {}, telemetry requires IN_PROGRESS",
            mission.id, mission.status
        )));
    }

    let path = mission.actual_path.get_or_insert_with(LineString::default);
    path.coordinates.push(report.position());

    mission.progress = progress(path.len(), mission.planned_path.len());
    Ok(mission.progress)
}

/// Fold the report's vehicle fields into the drone record.
///
/// An out-of-range battery leaves the stored level alone. An unreadable
/// timestamp falls back to the receipt time.
pub fn record_heartbeat(drone: &Drone, report: &TelemetryReport, received_at: DateTime<Utc>) -> Drone {
    let mut updated = drone.clone();
    if let Some(level) = report.battery_level() {
        updated.battery_level = Some(level);
    }
    updated.last_heartbeat = Some(report.sent_at().unwrap_or(received_at));
    updated
}
