//! Drone survey mission server: REST lifecycle API, WebSocket telemetry
//! ingestion and the SQLite record store behind them.

pub mod api;
pub mod config;
pub mod error;
pub mod persistence;
pub mod session;
pub mod state;
pub mod store;
