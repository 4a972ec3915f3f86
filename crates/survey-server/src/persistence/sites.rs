//! Site persistence operations.

use anyhow::Result;
use sqlx::SqlitePool;
use survey_core::models::{Location, Site};
use uuid::Uuid;

use super::parse_id;

const SELECT_SITE: &str = "SELECT id, name, location, area FROM sites";

/// Insert a new site.
pub async fn insert_site(pool: &SqlitePool, site: &Site) -> Result<()> {
    let location_json = serde_json::to_string(&site.location)?;

    sqlx::query("INSERT INTO sites (id, name, location, area) VALUES (?1, ?2, ?3, ?4)")
        .bind(site.id.to_string())
        .bind(&site.name)
        .bind(&location_json)
        .bind(site.area)
        .execute(pool)
        .await?;

    Ok(())
}

/// Load a single site by ID.
pub async fn get_site(pool: &SqlitePool, id: Uuid) -> Result<Option<Site>> {
    let row = sqlx::query_as::<_, SiteRow>(&format!("{SELECT_SITE} WHERE id = ?1"))
        .bind(id.to_string())
        .fetch_optional(pool)
        .await?;

    row.map(Site::try_from).transpose()
}

/// Load all sites.
pub async fn list_sites(pool: &SqlitePool) -> Result<Vec<Site>> {
    let rows = sqlx::query_as::<_, SiteRow>(&format!("{SELECT_SITE} ORDER BY rowid"))
        .fetch_all(pool)
        .await?;

    rows.into_iter().map(Site::try_from).collect()
}

/// Replace a site's name, location and area. Returns false if it is gone.
pub async fn update_site(pool: &SqlitePool, site: &Site) -> Result<bool> {
    let location_json = serde_json::to_string(&site.location)?;

    let result = sqlx::query("UPDATE sites SET name = ?2, location = ?3, area = ?4 WHERE id = ?1")
        .bind(site.id.to_string())
        .bind(&site.name)
        .bind(&location_json)
        .bind(site.area)
        .execute(pool)
        .await?;

    Ok(result.rows_affected() > 0)
}

/// Delete a site unless a pending or in-progress mission still surveys it.
pub async fn delete_idle_site(pool: &SqlitePool, id: Uuid) -> Result<bool> {
    let result = sqlx::query(
        r#"
        DELETE FROM sites
        WHERE id = ?1
          AND NOT EXISTS (
              SELECT 1 FROM missions
              WHERE site_id = ?1 AND status IN ('PENDING', 'IN_PROGRESS')
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
struct SiteRow {
    id: String,
    name: String,
    location: String,
    area: f64,
}

impl TryFrom<SiteRow> for Site {
    type Error = anyhow::Error;

    fn try_from(row: SiteRow) -> Result<Self> {
        let location: Location = serde_json::from_str(&row.location)?;
        Ok(Site {
            id: parse_id(&row.id)?,
            name: row.name,
            location,
            area: row.area,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::persistence::init_database;
    use survey_core::models::Position;

    #[tokio::test]
    async fn polygon_location_survives_storage() {
        let db = init_database(":memory:", 1).await.unwrap();
        let site = Site {
            id: Uuid::new_v4(),
            name: "Gravel pit".into(),
            location: Location::Polygon {
                coordinates: vec![vec![
                    Position::new(0.0, 0.0),
                    Position::new(4.0, 0.0),
                    Position::new(4.0, 3.0),
                    Position::new(0.0, 3.0),
                ]],
            },
            area: 12.0,
        };
        insert_site(db.pool(), &site).await.unwrap();

        assert_eq!(get_site(db.pool(), site.id).await.unwrap(), Some(site.clone()));
        assert_eq!(list_sites(db.pool()).await.unwrap().len(), 1);

        assert!(delete_idle_site(db.pool(), site.id).await.unwrap());
        assert!(get_site(db.pool(), site.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn update_replaces_every_field() {
        let db = init_database(":memory:", 1).await.unwrap();
        let site = Site {
            id: Uuid::new_v4(),
            name: "Rail yard".into(),
            location: Location::Point {
                coordinates: Position::new(13.4, 52.5),
            },
            area: 900.0,
        };
        insert_site(db.pool(), &site).await.unwrap();

        let replaced = Site {
            id: site.id,
            name: "Rail yard east".into(),
            location: Location::Polygon {
                coordinates: vec![vec![
                    Position::new(0.0, 0.0),
                    Position::new(2.0, 0.0),
                    Position::new(2.0, 2.0),
                ]],
            },
            area: 2.0,
        };
        assert!(update_site(db.pool(), &replaced).await.unwrap());
        assert_eq!(get_site(db.pool(), site.id).await.unwrap(), Some(replaced.clone()));

        let missing = Site {
            id: Uuid::new_v4(),
            ..replaced
        };
        assert!(!update_site(db.pool(), &missing).await.unwrap());
        assert_eq!(list_sites(db.pool()).await.unwrap().len(), 1);
    }
}
