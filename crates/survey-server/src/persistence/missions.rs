//! Mission persistence operations.
//!
//! Every mission write bumps `revision`; updates only apply when the caller
//! saw the current revision, which turns each read-modify-write into an
//! atomic compare-and-swap.

use anyhow::Result;
use sqlx::sqlite::SqliteConnection;
use sqlx::SqlitePool;
use survey_core::models::{LineString, Mission};
use uuid::Uuid;

use super::parse_id;

const SELECT_MISSION: &str = "SELECT id, drone_id, site_id, status, progress, distance, planned_path, actual_path, revision FROM missions";

/// Insert a new mission, provided its site still exists.
pub async fn insert_mission(conn: &mut SqliteConnection, mission: &Mission) -> Result<bool> {
    let planned_json = serde_json::to_string(&mission.planned_path)?;
    let actual_json = match &mission.actual_path {
        Some(path) => Some(serde_json::to_string(path)?),
        None => None,
    };

    let result = sqlx::query(
        r#"
        INSERT INTO missions (id, drone_id, site_id, status, progress, distance, planned_path, actual_path, revision)
        SELECT ?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9
        WHERE EXISTS (SELECT 1 FROM sites WHERE id = ?3)
        "#,
    )
    .bind(mission.id.to_string())
    .bind(mission.drone_id.to_string())
    .bind(mission.site_id.to_string())
    .bind(mission.status.as_str())
    .bind(mission.progress)
    .bind(mission.distance)
    .bind(&planned_json)
    .bind(&actual_json)
    .bind(mission.revision)
    .execute(&mut *conn)
    .await?;

    Ok(result.rows_affected() > 0)
}

/// Load a single mission by ID.
pub async fn get_mission(pool: &SqlitePool, id: Uuid) -> Result<Option<Mission>> {
    let row = sqlx::query_as::<_, MissionRow>(&format!("{SELECT_MISSION} WHERE id = ?1"))
        .bind(id.to_string())
        .fetch_optional(pool)
        .await?;

    row.map(Mission::try_from).transpose()
}

/// Load all missions.
pub async fn list_missions(pool: &SqlitePool) -> Result<Vec<Mission>> {
    let rows = sqlx::query_as::<_, MissionRow>(&format!("{SELECT_MISSION} ORDER BY rowid"))
        .fetch_all(pool)
        .await?;

    rows.into_iter().map(Mission::try_from).collect()
}

/// Replace a mission record if it is still at `expected_revision`.
///
/// Every column is written and the stored revision moves to
/// `expected_revision + 1`.
pub async fn update_mission(
    conn: &mut SqliteConnection,
    mission: &Mission,
    expected_revision: i64,
) -> Result<bool> {
    let planned_json = serde_json::to_string(&mission.planned_path)?;
    let actual_json = match &mission.actual_path {
        Some(path) => Some(serde_json::to_string(path)?),
        None => None,
    };

    let result = sqlx::query(
        r#"
        UPDATE missions
        SET drone_id = ?2, site_id = ?3, status = ?4, progress = ?5, distance = ?6,
            planned_path = ?7, actual_path = ?8, revision = revision + 1
        WHERE id = ?1 AND revision = ?9
        "#,
    )
    .bind(mission.id.to_string())
    .bind(mission.drone_id.to_string())
    .bind(mission.site_id.to_string())
    .bind(mission.status.as_str())
    .bind(mission.progress)
    .bind(mission.distance)
    .bind(&planned_json)
    .bind(&actual_json)
    .bind(expected_revision)
    .execute(&mut *conn)
    .await?;

    Ok(result.rows_affected() > 0)
}

/// Delete a mission. Returns false if there was nothing to delete.
pub async fn delete_mission(conn: &mut SqliteConnection, id: Uuid) -> Result<bool> {
    let result = sqlx::query("DELETE FROM missions WHERE id = ?1")
        .bind(id.to_string())
        .execute(&mut *conn)
        .await?;

    Ok(result.rows_affected() > 0)
}

/// Count PENDING/IN_PROGRESS missions flown by a drone.
pub async fn count_active_for_drone(pool: &SqlitePool, drone_id: Uuid) -> Result<i64> {
    let (count,): (i64,) = sqlx::query_as(
        "SELECT COUNT(*) FROM missions WHERE drone_id = ?1 AND status IN ('PENDING', 'IN_PROGRESS')",
    )
    .bind(drone_id.to_string())
    .fetch_one(pool)
    .await?;

    Ok(count)
}

/// Count PENDING/IN_PROGRESS missions surveying a site.
pub async fn count_active_for_site(pool: &SqlitePool, site_id: Uuid) -> Result<i64> {
    let (count,): (i64,) = sqlx::query_as(
        "SELECT COUNT(*) FROM missions WHERE site_id = ?1 AND status IN ('PENDING', 'IN_PROGRESS')",
    )
    .bind(site_id.to_string())
    .fetch_one(pool)
    .await?;

    Ok(count)
}

// Internal row type for SQLx
#[derive(sqlx::FromRow)]
struct MissionRow {
    id: String,
    drone_id: String,
    site_id: String,
    status: String,
    progress: f64,
    distance: Option<f64>,
    planned_path: String,
    actual_path: Option<String>,
    revision: i64,
}

impl TryFrom<MissionRow> for Mission {
    type Error = anyhow::Error;

    fn try_from(row: MissionRow) -> Result<Self> {
        let planned_path: LineString = serde_json::from_str(&row.planned_path)?;
        let actual_path: Option<LineString> = match row.actual_path {
            Some(raw) => Some(serde_json::from_str(&raw)?),
            None => None,
        };

        Ok(Mission {
            id: parse_id(&row.id)?,
            drone_id: parse_id(&row.drone_id)?,
            site_id: parse_id(&row.site_id)?,
            status: row.status.parse()?,
            progress: row.progress,
            distance: row.distance,
            planned_path,
            actual_path,
            revision: row.revision,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::persistence::{init_database, sites};
    use survey_core::models::{Location, MissionStatus, Position, Site};

    async fn seed_site(pool: &SqlitePool) -> Site {
        let site = Site {
            id: Uuid::new_v4(),
            name: "Harbour".into(),
            location: Location::Point {
                coordinates: Position::new(10.0, 53.5),
            },
            area: 500.0,
        };
        sites::insert_site(pool, &site).await.unwrap();
        site
    }

    fn mission(site_id: Uuid) -> Mission {
        Mission {
            id: Uuid::new_v4(),
            drone_id: Uuid::new_v4(),
            site_id,
            status: MissionStatus::Pending,
            progress: 0.0,
            distance: None,
            planned_path: LineString::new(vec![
                Position::new(10.0, 53.5),
                Position::new(10.01, 53.5),
            ]),
            actual_path: None,
            revision: 0,
        }
    }

    #[tokio::test]
    async fn insert_requires_existing_site() {
        let db = init_database(":memory:", 1).await.unwrap();
        let site = seed_site(db.pool()).await;
        let mut conn = db.pool().acquire().await.unwrap();

        let orphan = mission(Uuid::new_v4());
        assert!(!insert_mission(&mut conn, &orphan).await.unwrap());

        let m = mission(site.id);
        assert!(insert_mission(&mut conn, &m).await.unwrap());
        drop(conn);

        assert_eq!(get_mission(db.pool(), m.id).await.unwrap(), Some(m));
        assert_eq!(count_active_for_site(db.pool(), site.id).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn stale_revision_is_refused() {
        let db = init_database(":memory:", 1).await.unwrap();
        let site = seed_site(db.pool()).await;
        let m = mission(site.id);

        let mut conn = db.pool().acquire().await.unwrap();
        insert_mission(&mut conn, &m).await.unwrap();

        let mut started = m.clone();
        started.status = MissionStatus::InProgress;
        assert!(update_mission(&mut conn, &started, 0).await.unwrap());
        assert!(!update_mission(&mut conn, &started, 0).await.unwrap());
        drop(conn);

        let stored = get_mission(db.pool(), m.id).await.unwrap().unwrap();
        assert_eq!(stored.status, MissionStatus::InProgress);
        assert_eq!(stored.revision, 1);
        assert_eq!(count_active_for_drone(db.pool(), m.drone_id).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn update_replaces_the_whole_record() {
        let db = init_database(":memory:", 1).await.unwrap();
        let site = seed_site(db.pool()).await;
        let other_site = seed_site(db.pool()).await;
        let m = mission(site.id);

        let mut conn = db.pool().acquire().await.unwrap();
        insert_mission(&mut conn, &m).await.unwrap();

        let mut replaced = mission(other_site.id);
        replaced.id = m.id;
        replaced.status = MissionStatus::Completed;
        replaced.progress = 100.0;
        replaced.distance = Some(712.5);
        replaced.planned_path = LineString::new(vec![
            Position::new(10.0, 53.5),
            Position::new(10.005, 53.505),
            Position::new(10.01, 53.5),
        ]);
        replaced.actual_path = Some(LineString::new(vec![Position::with_alt(10.0, 53.5, 80.0)]));
        assert!(update_mission(&mut conn, &replaced, 0).await.unwrap());
        drop(conn);

        let stored = get_mission(db.pool(), m.id).await.unwrap().unwrap();
        assert_eq!(stored, Mission { revision: 1, ..replaced });
    }

    #[tokio::test]
    async fn delete_removes_only_the_named_mission() {
        let db = init_database(":memory:", 1).await.unwrap();
        let site = seed_site(db.pool()).await;
        let keep = mission(site.id);
        let gone = mission(site.id);

        let mut conn = db.pool().acquire().await.unwrap();
        insert_mission(&mut conn, &keep).await.unwrap();
        insert_mission(&mut conn, &gone).await.unwrap();

        assert!(delete_mission(&mut conn, gone.id).await.unwrap());
        assert!(!delete_mission(&mut conn, gone.id).await.unwrap());
        drop(conn);

        assert!(get_mission(db.pool(), gone.id).await.unwrap().is_none());
        assert_eq!(list_missions(db.pool()).await.unwrap(), vec![keep]);
    }
}
