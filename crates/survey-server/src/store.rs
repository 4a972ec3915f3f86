//! Record store gateway.
//!
//! Wraps the persistence layer with the transactional batches the mission
//! lifecycle needs. Each operation reads the current records, lets
//! `survey_core` compute the records to write, then applies them in one
//! transaction whose statements carry their preconditions (mission revision,
//! drone status). A transaction dropped on an error path rolls back.

use chrono::{DateTime, Utc};
use survey_core::lifecycle::{self, Transition};
use survey_core::models::{
    CreateDroneRequest, CreateMissionRequest, CreateSiteRequest, Drone, DroneStatus, Mission, Site,
    TelemetryReport,
};
use survey_core::{telemetry, SurveyError};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::ApiResult;
use crate::persistence::{drones, missions, sites, Database};

/// Attempts before a write that keeps losing revision races gives up.
const MAX_WRITE_ATTEMPTS: usize = 3;

#[derive(Clone)]
pub struct SurveyStore {
    db: Database,
}

impl SurveyStore {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    pub async fn ping(&self) -> ApiResult<()> {
        Ok(self.db.ping().await?)
    }

    // ========== DRONES ==========

    pub async fn create_drone(&self, request: CreateDroneRequest) -> ApiResult<Drone> {
        let drone = request.into_drone()?;
        drones::insert_drone(self.db.pool(), &drone).await?;
        info!("Created drone {} ({})", drone.id, drone.model);
        Ok(drone)
    }

    pub async fn list_drones(&self) -> ApiResult<Vec<Drone>> {
        Ok(drones::list_drones(self.db.pool()).await?)
    }

    pub async fn get_drone(&self, id: Uuid) -> ApiResult<Drone> {
        drones::get_drone(self.db.pool(), id)
            .await?
            .ok_or_else(|| SurveyError::not_found("drone", id).into())
    }

    /// Maintenance toggle. Drones on a mission are left alone.
    pub async fn set_drone_status(&self, id: Uuid, status: DroneStatus) -> ApiResult<Drone> {
        let drone = self.get_drone(id).await?;
        let updated = lifecycle::set_maintenance_status(&drone, status)?;

        let mut conn = self.db.pool().acquire().await?;
        if !drones::update_drone(&mut conn, &updated, drone.status).await? {
            return Err(SurveyError::Conflict(format!(
                "drone {id} changed while updating its status"
            ))
            .into());
        }

        info!("Drone {} status {} -> {}", id, drone.status, updated.status);
        Ok(updated)
    }

    pub async fn delete_drone(&self, id: Uuid) -> ApiResult<()> {
        for _ in 0..MAX_WRITE_ATTEMPTS {
            if drones::delete_idle_drone(self.db.pool(), id).await? {
                info!("Deleted drone {}", id);
                return Ok(());
            }
            self.get_drone(id).await?;
            let active = missions::count_active_for_drone(self.db.pool(), id).await?;
            lifecycle::ensure_deletable("drone", id, active)?;
        }
        Err(SurveyError::Conflict(format!("drone {id} kept changing while deleting")).into())
    }

    // ========== SITES ==========

    pub async fn create_site(&self, request: CreateSiteRequest) -> ApiResult<Site> {
        let site = request.into_site()?;
        sites::insert_site(self.db.pool(), &site).await?;
        info!("Created site {} ({}, {:.1} m2)", site.id, site.name, site.area);
        Ok(site)
    }

    pub async fn list_sites(&self) -> ApiResult<Vec<Site>> {
        Ok(sites::list_sites(self.db.pool()).await?)
    }

    pub async fn get_site(&self, id: Uuid) -> ApiResult<Site> {
        sites::get_site(self.db.pool(), id)
            .await?
            .ok_or_else(|| SurveyError::not_found("site", id).into())
    }

    pub async fn delete_site(&self, id: Uuid) -> ApiResult<()> {
        for _ in 0..MAX_WRITE_ATTEMPTS {
            if sites::delete_idle_site(self.db.pool(), id).await? {
                info!("Deleted site {}", id);
                return Ok(());
            }
            self.get_site(id).await?;
            let active = missions::count_active_for_site(self.db.pool(), id).await?;
            lifecycle::ensure_deletable("site", id, active)?;
        }
        Err(SurveyError::Conflict(format!("site {id} kept changing while deleting")).into())
    }

    // ========== MISSIONS ==========

    pub async fn list_missions(&self) -> ApiResult<Vec<Mission>> {
        Ok(missions::list_missions(self.db.pool()).await?)
    }

    pub async fn get_mission(&self, id: Uuid) -> ApiResult<Mission> {
        missions::get_mission(self.db.pool(), id)
            .await?
            .ok_or_else(|| SurveyError::not_found("mission", id).into())
    }

    /// Create a PENDING mission and claim its drone in one transaction.
    pub async fn create_mission(&self, request: CreateMissionRequest) -> ApiResult<Mission> {
        let drone = self.get_drone(request.drone_id).await?;
        let site = self.get_site(request.site_id).await?;
        let (mission, claimed) = lifecycle::create_mission(&drone, &site, request.planned_path)?;

        let mut tx = self.db.pool().begin().await?;

        // Only one creator can flip AVAILABLE -> IN_MISSION.
        if !drones::update_drone(&mut tx, &claimed, DroneStatus::Available).await? {
            return Err(SurveyError::Conflict(format!(
                "drone {} is no longer AVAILABLE",
                drone.id
            ))
            .into());
        }
        if !missions::insert_mission(&mut tx, &mission).await? {
            return Err(SurveyError::not_found("site", site.id).into());
        }

        tx.commit().await?;
        info!(
            "Created mission {} for drone {} at site {}",
            mission.id, mission.drone_id, mission.site_id
        );
        Ok(mission)
    }

    /// Start, complete or abort a mission.
    ///
    /// Completing and aborting return the drone to AVAILABLE in the same
    /// transaction as the mission update.
    pub async fn transition(&self, id: Uuid, transition: Transition) -> ApiResult<Mission> {
        for attempt in 1..=MAX_WRITE_ATTEMPTS {
            let current = self.get_mission(id).await?;
            let mut next = lifecycle::apply(&current, transition)?;
            let drone = if transition.releases_drone() {
                drones::get_drone(self.db.pool(), current.drone_id).await?
            } else {
                None
            };

            let mut tx = self.db.pool().begin().await?;
            if !missions::update_mission(&mut tx, &next, current.revision).await? {
                debug!("Mission {} moved during {} (attempt {})", id, transition.verb(), attempt);
                continue;
            }

            match drone {
                Some(drone) => {
                    let released = lifecycle::release_drone(&drone);
                    if !drones::update_drone(&mut tx, &released, drone.status).await? {
                        warn!("Drone {} changed while releasing it from mission {}", drone.id, id);
                    }
                }
                None if transition.releases_drone() => {
                    warn!("Mission {} references missing drone {}", id, current.drone_id);
                }
                None => {}
            }

            tx.commit().await?;
            next.revision = current.revision + 1;
            info!("Mission {} {} -> {}", id, current.status, next.status);
            return Ok(next);
        }

        Err(SurveyError::InvalidState(format!(
            "mission {id} kept changing during {}; retry",
            transition.verb()
        ))
        .into())
    }

    /// Append one telemetry report to an IN_PROGRESS mission.
    ///
    /// The path append, the progress update and the drone heartbeat commit
    /// together. Returns the new progress.
    pub async fn append_telemetry(
        &self,
        id: Uuid,
        report: &TelemetryReport,
        received_at: DateTime<Utc>,
    ) -> ApiResult<f64> {
        for attempt in 1..=MAX_WRITE_ATTEMPTS {
            let current = self.get_mission(id).await?;
            let mut next = current.clone();
            let progress = telemetry::append_report(&mut next, report)?;
            let drone = drones::get_drone(self.db.pool(), current.drone_id).await?;

            let mut tx = self.db.pool().begin().await?;
            if !missions::update_mission(&mut tx, &next, current.revision).await? {
                debug!("Mission {} moved during telemetry append (attempt {})", id, attempt);
                continue;
            }

            if let Some(drone) = drone {
                let beat = telemetry::record_heartbeat(&drone, report, received_at);
                if !drones::update_drone(&mut tx, &beat, drone.status).await? {
                    debug!("Skipped heartbeat for drone {}: status changed", drone.id);
                }
            }

            tx.commit().await?;
            return Ok(progress);
        }

        Err(SurveyError::InvalidState(format!(
            "mission {id} kept changing during telemetry append; retry"
        ))
        .into())
    }
}
