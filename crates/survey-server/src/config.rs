//! Server configuration from environment.

use std::env;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct Config {
    pub server_port: u16,
    pub database_path: String,
    pub database_max_connections: u32,
    /// Seconds a telemetry session may sit silent before it is closed; 0 disables.
    pub telemetry_idle_timeout_secs: u64,
}

impl Config {
    pub fn from_env() -> Self {
        Self {
            server_port: env::var("SURVEY_PORT")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(8000),
            database_path: env::var("SURVEY_DB_PATH")
                .unwrap_or_else(|_| "data/survey.db".to_string()),
            database_max_connections: env::var("SURVEY_DB_MAX_CONNECTIONS")
                .ok()
                .and_then(|s| s.parse().ok())
                .filter(|n| *n > 0)
                .unwrap_or(5),
            telemetry_idle_timeout_secs: env::var("SURVEY_TELEMETRY_IDLE_TIMEOUT_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(300),
        }
    }

    pub fn telemetry_idle_timeout(&self) -> Option<Duration> {
        match self.telemetry_idle_timeout_secs {
            0 => None,
            secs => Some(Duration::from_secs(secs)),
        }
    }
}
