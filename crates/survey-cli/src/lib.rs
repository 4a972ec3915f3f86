//! Survey CLI - client library and command line tools for the survey server.
//!
//! Binaries:
//! - send_telemetry: stream a straight-line track to a mission
//! - demo_mission: run a full survey mission end to end

pub mod client;
pub mod track;

pub use client::{SurveyClient, TelemetryStream};
pub use track::{report_period, StraightTrack};
