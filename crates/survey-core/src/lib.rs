//! Core logic for drone survey missions: lifecycle rules, telemetry
//! ingestion and the geometry used to derive mission metrics.

pub mod error;
pub mod geometry;
pub mod lifecycle;
pub mod models;
pub mod telemetry;

pub use error::{SurveyError, SurveyResult};
pub use geometry::{haversine_distance, path_distance, polygon_area};
pub use lifecycle::Transition;
pub use models::{
    CreateDroneRequest, CreateMissionRequest, CreateSiteRequest, Drone, DroneStatus,
    DroneStatusUpdate, LineString, Location, Mission, MissionStatus, Position, Site,
    TelemetryReply, TelemetryReport,
};
