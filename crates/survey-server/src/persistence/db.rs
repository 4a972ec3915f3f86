//! Database connection and initialization.

use std::path::Path;
use std::time::Duration;

use anyhow::Result;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::SqlitePool;
use tracing::{info, warn};

const MIGRATION_SQL: &str = include_str!("../../migrations/001_init.sql");
const BUSY_TIMEOUT_SECS: u64 = 5;

/// Database connection wrapper.
#[derive(Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Get the underlying connection pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Round-trip a trivial query to confirm the store is reachable.
    pub async fn ping(&self) -> Result<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

/// Initialize the SQLite database.
///
/// Creates the database file if it doesn't exist, runs migrations,
/// and returns a connection pool. `":memory:"` gives a private in-memory
/// database on a single connection.
pub async fn init_database(db_path: &str, max_connections: u32) -> Result<Database> {
    let in_memory = db_path == ":memory:";

    let pool = if in_memory {
        info!("Opening in-memory database");
        let options = SqliteConnectOptions::new()
            .in_memory(true)
            .busy_timeout(Duration::from_secs(BUSY_TIMEOUT_SECS));
        // Every connection would get its own empty database, so keep exactly one alive.
        SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await?
    } else {
        if let Some(parent) = Path::new(db_path).parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        info!("Connecting to database: {}", db_path);
        let options = SqliteConnectOptions::new()
            .filename(db_path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .busy_timeout(Duration::from_secs(BUSY_TIMEOUT_SECS));
        SqlitePoolOptions::new()
            .max_connections(max_connections.max(1))
            .connect_with(options)
            .await?
    };

    run_migrations(&pool).await?;

    Ok(Database { pool })
}

/// Run database migrations.
async fn run_migrations(pool: &SqlitePool) -> Result<()> {
    info!("Running database migrations...");

    for statement in MIGRATION_SQL.split(';') {
        let statement: String = statement
            .lines()
            .filter(|line| !line.trim().starts_with("--"))
            .collect::<Vec<_>>()
            .join("\n");
        let statement = statement.trim();
        if statement.is_empty() {
            continue;
        }

        if let Err(e) = sqlx::query(statement).execute(pool).await {
            if e.to_string().contains("already exists") {
                continue;
            }
            if statement.to_uppercase().starts_with("CREATE") {
                anyhow::bail!("Migration failed on CREATE statement: {}", e);
            }
            warn!("Migration statement failed: {}", e);
        }
    }

    info!("Database migrations complete");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_init_database() {
        let db = init_database(":memory:", 1).await.unwrap();

        for table in ["drones", "sites", "missions"] {
            let result: (i32,) = sqlx::query_as(
                "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name=?1",
            )
            .bind(table)
            .fetch_one(db.pool())
            .await
            .unwrap();
            assert_eq!(result.0, 1, "missing table {table}");
        }

        db.ping().await.unwrap();
    }

    #[tokio::test]
    async fn migrations_are_rerunnable() {
        let path = std::env::temp_dir().join(format!("survey-db-{}.db", uuid::Uuid::new_v4()));
        let path = path.to_string_lossy().to_string();

        init_database(&path, 2).await.unwrap();
        init_database(&path, 2).await.unwrap();
    }

    #[tokio::test]
    async fn schema_rejects_short_planned_paths() {
        let db = init_database(":memory:", 1).await.unwrap();
        let result = sqlx::query(
            "INSERT INTO missions (id, drone_id, site_id, planned_path) VALUES ('m', 'd', 's', ?1)",
        )
        .bind(r#"{"type":"LineString","coordinates":[[0.0,0.0]]}"#)
        .execute(db.pool())
        .await;
        assert!(result.is_err());
    }
}
