//! Persistence layer for the survey server.
//!
//! SQLite-backed record store for drones, sites and missions. Reads take the
//! pool; writes take a connection so callers can batch them into one
//! transaction.

pub mod db;
pub mod drones;
pub mod missions;
pub mod sites;

pub use db::{init_database, Database};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use uuid::Uuid;

pub(crate) fn parse_id(raw: &str) -> Result<Uuid> {
    Uuid::parse_str(raw).with_context(|| format!("corrupt id {raw:?}"))
}

pub(crate) fn parse_timestamp(raw: Option<&str>) -> Result<Option<DateTime<Utc>>> {
    raw.map(|s| {
        DateTime::parse_from_rfc3339(s)
            .map(|dt| dt.with_timezone(&Utc))
            .with_context(|| format!("corrupt timestamp {s:?}"))
    })
    .transpose()
}
