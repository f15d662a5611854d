//! Application state
//!
//! Holds all shared components and state

use crate::polling_orchestrator::{
    PollerConfig, PollingOrchestrator, DEFAULT_POLL_INTERVAL_MS, DEFAULT_START_DELAY_MS,
};
use crate::raw_source_client::DEFAULT_FETCH_TIMEOUT_MS;
use crate::stability_filter::DEFAULT_STABLE_THRESHOLD;
use crate::vehicle_log_service::VehicleLogService;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Application configuration
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// SQLite database file
    pub database_file: PathBuf,
    /// Raw count endpoint
    pub raw_source_url: String,
    /// Poll interval (ms)
    pub poll_interval_ms: u64,
    /// Identical samples required for a stable value
    pub stable_threshold: i64,
    /// Camera tag for persisted entries
    pub camera_id: i64,
    /// Raw source request timeout (ms)
    pub fetch_timeout_ms: u64,
    /// Delay before the first poll (ms)
    pub poll_start_delay_ms: u64,
    /// Run the poller (false = API only)
    pub poller_enabled: bool,
    /// Server port
    pub port: u16,
    /// Server host
    pub host: String,
}

fn env_or<T: FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database_file: std::env::var("DATABASE_FILE")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("data/vehicle_counter.db")),
            raw_source_url: std::env::var("RAW_SOURCE_URL")
                .unwrap_or_else(|_| "http://127.0.0.1:5000/count".to_string()),
            poll_interval_ms: env_or("POLL_INTERVAL_MS", DEFAULT_POLL_INTERVAL_MS),
            stable_threshold: env_or("STABLE_THRESHOLD", DEFAULT_STABLE_THRESHOLD as i64),
            camera_id: env_or("CAMERA_ID", 1),
            fetch_timeout_ms: env_or("FETCH_TIMEOUT_MS", DEFAULT_FETCH_TIMEOUT_MS),
            poll_start_delay_ms: env_or("POLL_START_DELAY_MS", DEFAULT_START_DELAY_MS),
            poller_enabled: env_or("POLLER_ENABLED", true),
            port: env_or("PORT", 3001),
            host: std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
        }
    }
}

impl AppConfig {
    /// Poller settings derived from this config
    pub fn poller_config(&self) -> PollerConfig {
        PollerConfig {
            camera_id: self.camera_id,
            interval: Duration::from_millis(self.poll_interval_ms),
            stable_threshold: self.stable_threshold,
            start_delay: Duration::from_millis(self.poll_start_delay_ms),
        }
    }

    /// Raw source request timeout
    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_millis(self.fetch_timeout_ms)
    }
}

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    /// Application config
    pub config: AppConfig,
    /// Vehicle log store (shared with the poller)
    pub vehicle_logs: Arc<VehicleLogService>,
    /// Stable count poller, absent in API-only mode
    pub polling: Option<Arc<PollingOrchestrator>>,
    /// Process start, for uptime
    pub started_at: Instant,
}
