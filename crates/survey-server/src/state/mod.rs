//! Shared application state.

mod sessions;

pub use sessions::{SessionGuard, SessionRegistry};

use crate::config::Config;
use crate::persistence::Database;
use crate::store::SurveyStore;

/// State handed to every request and telemetry session.
///
/// The store is the single source of truth. The session registry only tracks
/// which missions currently have a telemetry sender attached.
pub struct AppState {
    pub store: SurveyStore,
    pub sessions: SessionRegistry,
    config: Config,
}

impl AppState {
    pub fn new(db: Database, config: Config) -> Self {
        Self {
            store: SurveyStore::new(db),
            sessions: SessionRegistry::default(),
            config,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }
}
