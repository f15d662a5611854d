//! Shared API payloads

use crate::polling_orchestrator::PollerStats;
use crate::vehicle_log_service::VehicleLogEntry;
use serde::{Deserialize, Serialize};

/// Health check response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub uptime_sec: u64,
    pub db_connected: bool,
    #[serde(skip_deserializing)]
    pub poller: Option<PollerStats>,
}

/// `GET /vehicle-count` body; zeroed when nothing has been logged
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LatestCountResponse {
    pub count: i64,
    pub camera_id: Option<i64>,
    pub timestamp: Option<String>,
}

impl From<Option<VehicleLogEntry>> for LatestCountResponse {
    fn from(entry: Option<VehicleLogEntry>) -> Self {
        match entry {
            Some(e) => Self {
                count: e.count,
                camera_id: Some(e.camera_id),
                timestamp: Some(e.timestamp),
            },
            None => Self {
                count: 0,
                camera_id: None,
                timestamp: None,
            },
        }
    }
}

/// `GET /history` body
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryResponse {
    pub history: Vec<VehicleLogEntry>,
}

/// `POST /vehicle-count` body
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreatedResponse {
    pub success: bool,
    pub id: i64,
}
