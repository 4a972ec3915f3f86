//! Drone persistence operations.

use anyhow::Result;
use sqlx::sqlite::SqliteConnection;
use sqlx::SqlitePool;
use survey_core::models::{Drone, DroneStatus};
use uuid::Uuid;

use super::{parse_id, parse_timestamp};

const SELECT_DRONE: &str = "SELECT id, model, status, battery_level, last_heartbeat FROM drones";

/// Insert a new drone.
pub async fn insert_drone(pool: &SqlitePool, drone: &Drone) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO drones (id, model, status, battery_level, last_heartbeat)
        VALUES (?1, ?2, ?3, ?4, ?5)
        "#,
    )
    .bind(drone.id.to_string())
    .bind(&drone.model)
    .bind(drone.status.as_str())
    .bind(drone.battery_level)
    .bind(drone.last_heartbeat.map(|t| t.to_rfc3339()))
    .execute(pool)
    .await?;

    Ok(())
}

/// Load a single drone by ID.
pub async fn get_drone(pool: &SqlitePool, id: Uuid) -> Result<Option<Drone>> {
    let row = sqlx::query_as::<_, DroneRow>(&format!("{SELECT_DRONE} WHERE id = ?1"))
        .bind(id.to_string())
        .fetch_optional(pool)
        .await?;

    row.map(Drone::try_from).transpose()
}

/// Load all drones.
pub async fn list_drones(pool: &SqlitePool) -> Result<Vec<Drone>> {
    let rows = sqlx::query_as::<_, DroneRow>(&format!("{SELECT_DRONE} ORDER BY rowid"))
        .fetch_all(pool)
        .await?;

    rows.into_iter().map(Drone::try_from).collect()
}

/// Replace a drone record, provided its stored status is still `expected`.
///
/// Returns `false` when the precondition did not hold (or the drone is gone).
pub async fn update_drone(
    conn: &mut SqliteConnection,
    drone: &Drone,
    expected: DroneStatus,
) -> Result<bool> {
    let result = sqlx::query(
        r#"
        UPDATE drones
        SET model = ?2, status = ?3, battery_level = ?4, last_heartbeat = ?5
        WHERE id = ?1 AND status = ?6
        "#,
    )
    .bind(drone.id.to_string())
    .bind(&drone.model)
    .bind(drone.status.as_str())
    .bind(drone.battery_level)
    .bind(drone.last_heartbeat.map(|t| t.to_rfc3339()))
    .bind(expected.as_str())
    .execute(&mut *conn)
    .await?;

    Ok(result.rows_affected() > 0)
}

/// Delete a drone unless a pending or in-progress mission still uses it.
///
/// The check and the delete are one statement, so a mission created
/// concurrently cannot slip in between.
pub async fn delete_idle_drone(pool: &SqlitePool, id: Uuid) -> Result<bool> {
    let result = sqlx::query(
        r#"
        DELETE FROM drones
        WHERE id = ?1
          AND NOT EXISTS (
              SELECT 1 FROM missions
              WHERE drone_id = ?1 AND status IN ('PENDING', 'IN_PROGRESS')
          )
        "#,
    )
    .bind(id.to_string())
    .execute(pool)
    .await?;

    Ok(result.rows_affected() > 0)
}

// Internal row type for SQLx
#[derive(sqlx::FromRow)]
struct DroneRow {
    id: String,
    model: String,
    status: String,
    battery_level: Option<f64>,
    last_heartbeat: Option<String>,
}

impl TryFrom<DroneRow> for Drone {
    type Error = anyhow::Error;

    fn try_from(row: DroneRow) -> Result<Self> {
        Ok(Drone {
            id: parse_id(&row.id)?,
            model: row.model,
            status: row.status.parse()?,
            battery_level: row.battery_level,
            last_heartbeat: parse_timestamp(row.last_heartbeat.as_deref())?,
        })
    }
}
