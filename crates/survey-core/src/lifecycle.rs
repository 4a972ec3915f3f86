//! Mission lifecycle state machine.
//!
//! ```text
//! PENDING ──start──▶ IN_PROGRESS ──complete──▶ COMPLETED
//!    │                    │
//!    └──────abort─────────┴────────abort─────▶ ABORTED
//! ```
//!
//! Every function here is pure: it validates a transition against the
//! records it is given and returns the records to write. Applying those
//! writes atomically is the store's job.

use uuid::Uuid;

use crate::error::{SurveyError, SurveyResult};
use crate::geometry::path_distance;
use crate::models::{Drone, DroneStatus, LineString, Mission, MissionStatus, Site};

/// Minimum number of points in a planned path.
pub const MIN_PLANNED_POINTS: usize = 2;

/// Transitions available on an existing mission.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    Start,
    Complete,
    Abort,
}

impl Transition {
    pub fn target(self) -> MissionStatus {
        match self {
            Self::Start => MissionStatus::InProgress,
            Self::Complete => MissionStatus::Completed,
            Self::Abort => MissionStatus::Aborted,
        }
    }

    pub fn allowed_from(self, status: MissionStatus) -> bool {
        match self {
            Self::Start => status == MissionStatus::Pending,
            Self::Complete => status == MissionStatus::InProgress,
            Self::Abort => status.is_active(),
        }
    }

    /// Whether the mission's drone goes back to AVAILABLE.
    pub fn releases_drone(self) -> bool {
        matches!(self, Self::Complete | Self::Abort)
    }

    pub fn verb(self) -> &'static str {
        match self {
            Self::Start => "start",
            Self::Complete => "complete",
            Self::Abort => "abort",
        }
    }

    fn rule(self) -> &'static str {
        match self {
            Self::Start => "missions can only be started from PENDING",
            Self::Complete => "missions must be IN_PROGRESS to complete",
            Self::Abort => "only PENDING or IN_PROGRESS missions can be aborted",
        }
    }
}

pub fn validate_planned_path(path: &LineString) -> SurveyResult<()> {
    if path.len() < MIN_PLANNED_POINTS {
        return Err(SurveyError::invalid_argument(
            "planned_path",
            format!(
                "needs at least {MIN_PLANNED_POINTS} coordinates, got {}",
                path.len()
            ),
        ));
    }
    if path
        .coordinates
        .iter()
        .any(|p| !p.lng.is_finite() || !p.lat.is_finite())
    {
        return Err(SurveyError::invalid_argument(
            "planned_path",
            "coordinates must be finite numbers",
        ));
    }
    Ok(())
}

/// Validate a new mission and build the records to write.
///
/// Returns the PENDING mission together with the drone as it must be
/// persisted (claimed, IN_MISSION).
pub fn create_mission(
    drone: &Drone,
    site: &Site,
    planned_path: LineString,
) -> SurveyResult<(Mission, Drone)> {
    validate_planned_path(&planned_path)?;
    claim_drone(drone)?;

    let mission = Mission {
        id: Uuid::new_v4(),
        drone_id: drone.id,
        site_id: site.id,
        status: MissionStatus::Pending,
        progress: 0.0,
        distance: None,
        planned_path,
        actual_path: None,
        revision: 0,
    };

    let mut claimed = drone.clone();
    claimed.status = DroneStatus::InMission;

    Ok((mission, claimed))
}

/// A drone can only be assigned when it is AVAILABLE.
pub fn claim_drone(drone: &Drone) -> SurveyResult<()> {
    if drone.status != DroneStatus::Available {
        return Err(SurveyError::Conflict(format!(
            "drone {} is {}, not AVAILABLE",
            drone.id, drone.status
        )));
    }
    Ok(())
}

/// Apply a transition, returning the updated mission.
///
/// Completing computes the ground-track distance of the actual path
/// (zero when no telemetry was received).
pub fn apply(mission: &Mission, transition: Transition) -> SurveyResult<Mission> {
    if !transition.allowed_from(mission.status) {
        return Err(SurveyError::InvalidState(format!(
            "cannot {} mission {} in {}: {}",
            transition.verb(),
            mission.id,
            mission.status,
            transition.rule()
        )));
    }

    let mut next = mission.clone();
    next.status = transition.target();

    if transition == Transition::Complete {
        let distance = mission
            .actual_path
            .as_ref()
            .map_or(0.0, |path| path_distance(&path.coordinates));
        next.distance = Some(distance);
    }

    Ok(next)
}

/// Return a drone to service after its mission ended.
pub fn release_drone(drone: &Drone) -> Drone {
    let mut released = drone.clone();
    released.status = DroneStatus::Available;
    released
}

/// Manual status changes are limited to the maintenance toggle.
pub fn set_maintenance_status(drone: &Drone, status: DroneStatus) -> SurveyResult<Drone> {
    if status == DroneStatus::InMission {
        return Err(SurveyError::invalid_argument(
            "status",
            "IN_MISSION is assigned by mission creation",
        ));
    }
    if drone.status == DroneStatus::InMission {
        return Err(SurveyError::Conflict(format!(
            "drone {} is on a mission; abort or complete it first",
            drone.id
        )));
    }
    let mut updated = drone.clone();
    updated.status = status;
    Ok(updated)
}

/// Drones and sites can only be deleted once no mission is using them.
pub fn ensure_deletable(entity: &'static str, id: Uuid, active_missions: i64) -> SurveyResult<()> {
    if active_missions > 0 {
        return Err(SurveyError::Conflict(format!(
            "cannot delete {entity} {id} with {active_missions} active mission(s)"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Location, Position};

    const ALL: [MissionStatus; 4] = [
        MissionStatus::Pending,
        MissionStatus::InProgress,
        MissionStatus::Completed,
        MissionStatus::Aborted,
    ];

    fn drone(status: DroneStatus) -> Drone {
        Drone {
            id: Uuid::new_v4(),
            model: "Matrice 350".into(),
            status,
            battery_level: Some(90.0),
            last_heartbeat: None,
        }
    }

    fn site() -> Site {
        Site {
            id: Uuid::new_v4(),
            name: "North field".into(),
            location: Location::Point {
                coordinates: Position::new(8.54, 47.37),
            },
            area: 1_000.0,
        }
    }

    fn path(n: usize) -> LineString {
        LineString::new(
            (0..n)
                .map(|i| Position::new(8.54 + i as f64 * 0.001, 47.37))
                .collect(),
        )
    }

    fn mission_in(status: MissionStatus) -> Mission {
        let (mut mission, _) =
            create_mission(&drone(DroneStatus::Available), &site(), path(3)).unwrap();
        mission.status = status;
        mission
    }

    #[test]
    fn create_claims_the_drone() {
        let d = drone(DroneStatus::Available);
        let s = site();
        let (mission, claimed) = create_mission(&d, &s, path(2)).unwrap();

        assert_eq!(mission.status, MissionStatus::Pending);
        assert_eq!(mission.drone_id, d.id);
        assert_eq!(mission.site_id, s.id);
        assert_eq!(mission.progress, 0.0);
        assert!(mission.distance.is_none());
        assert!(mission.actual_path.is_none());
        assert_eq!(claimed.status, DroneStatus::InMission);
    }

    #[test]
    fn create_rejects_busy_drones() {
        for status in [DroneStatus::InMission, DroneStatus::Maintenance] {
            let err = create_mission(&drone(status), &site(), path(3)).unwrap_err();
            assert!(matches!(err, SurveyError::Conflict(_)), "{status}");
        }
    }

    #[test]
    fn create_rejects_degenerate_paths() {
        for n in [0, 1] {
            let err = create_mission(&drone(DroneStatus::Available), &site(), path(n)).unwrap_err();
            assert!(
                matches!(err, SurveyError::InvalidArgument { ref field, .. } if field == "planned_path")
            );
        }
    }

    #[test]
    fn transition_table() {
        for status in ALL {
            assert_eq!(
                Transition::Start.allowed_from(status),
                status == MissionStatus::Pending
            );
            assert_eq!(
                Transition::Complete.allowed_from(status),
                status == MissionStatus::InProgress
            );
            assert_eq!(
                Transition::Abort.allowed_from(status),
                matches!(status, MissionStatus::Pending | MissionStatus::InProgress)
            );
        }
    }

    #[test]
    fn terminal_states_reject_every_transition() {
        for status in [MissionStatus::Completed, MissionStatus::Aborted] {
            for transition in [Transition::Start, Transition::Complete, Transition::Abort] {
                let err = apply(&mission_in(status), transition).unwrap_err();
                assert!(matches!(err, SurveyError::InvalidState(_)));
            }
        }
    }

    #[test]
    fn complete_records_distance_of_actual_path() {
        let mut mission = mission_in(MissionStatus::InProgress);
        let track = vec![
            Position::with_alt(8.540, 47.370, 0.0),
            Position::with_alt(8.541, 47.371, 0.0),
            Position::with_alt(8.543, 47.371, 0.0),
        ];
        mission.actual_path = Some(LineString::new(track.clone()));

        let done = apply(&mission, Transition::Complete).unwrap();
        assert_eq!(done.status, MissionStatus::Completed);
        assert_eq!(done.distance, Some(path_distance(&track)));
    }

    #[test]
    fn complete_without_telemetry_records_zero() {
        let done = apply(&mission_in(MissionStatus::InProgress), Transition::Complete).unwrap();
        assert_eq!(done.distance, Some(0.0));
    }

    #[test]
    fn abort_never_sets_distance() {
        for status in [MissionStatus::Pending, MissionStatus::InProgress] {
            let aborted = apply(&mission_in(status), Transition::Abort).unwrap();
            assert_eq!(aborted.status, MissionStatus::Aborted);
            assert!(aborted.distance.is_none());
        }
    }

    #[test]
    fn maintenance_toggle_respects_missions() {
        let flying = drone(DroneStatus::InMission);
        assert!(matches!(
            set_maintenance_status(&flying, DroneStatus::Maintenance),
            Err(SurveyError::Conflict(_))
        ));

        let idle = drone(DroneStatus::Available);
        assert!(matches!(
            set_maintenance_status(&idle, DroneStatus::InMission),
            Err(SurveyError::InvalidArgument { .. })
        ));
        let parked = set_maintenance_status(&idle, DroneStatus::Maintenance).unwrap();
        assert_eq!(parked.status, DroneStatus::Maintenance);
    }

    #[test]
    fn deletion_guard() {
        let id = Uuid::new_v4();
        assert!(ensure_deletable("drone", id, 0).is_ok());
        assert!(matches!(
            ensure_deletable("site", id, 2),
            Err(SurveyError::Conflict(_))
        ));
    }
}
