//! Vehicle Counter Library
//!
//! Polls a raw vehicle counter, keeps only stable readings, stores them in
//! SQLite and serves them over HTTP.
//!
//! ## Architecture
//!
//! 1. RawSourceClient - fetch one integer reading from the sensor endpoint
//! 2. StabilityFilter - run-length stability over raw samples
//! 3. ErrorStreakTracker - consecutive error counting and log suppression
//! 4. PollingOrchestrator - fixed-rate, non-overlapping poll loop
//! 5. VehicleLogService - vehicle_logs table (SQLite)
//! 6. WebAPI - REST API endpoints
//!
//! Data flow: RawSourceClient -> StabilityFilter -> PollingOrchestrator -> VehicleLogService

pub mod error;
pub mod error_streak_tracker;
pub mod models;
pub mod polling_orchestrator;
pub mod raw_source_client;
pub mod stability_filter;
pub mod state;
pub mod vehicle_log_service;
pub mod web_api;

pub use error::{Error, Result};
pub use state::AppState;
