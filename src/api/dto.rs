//! Data Transfer Objects
//!
//! Response types for the API endpoints that are not plain entries.

use serde::{Deserialize, Serialize};

/// Full health status
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    /// "healthy" or "unhealthy"
    pub status: String,
    /// "ok" or "error"
    pub database: String,
    /// Number of stored entries, if the database answered
    pub entries: Option<usize>,
    /// Open change feed connections
    pub websocket_connections: usize,
    pub uptime_seconds: u64,
    pub version: String,
}
