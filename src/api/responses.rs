//! API request and response structures

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::state::CountdownSnapshot;

/// Body of `POST /timer/start` and `POST /timer/button`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DurationRequest {
    /// Picked countdown duration; ignored by the button unless idle
    #[serde(default)]
    pub duration_seconds: i64,
}

/// API response structure for countdown commands
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResponse {
    pub status: String,
    pub message: String,
    pub timestamp: DateTime<Utc>,
    pub countdown: CountdownSnapshot,
}

impl ApiResponse {
    /// Create a new API response
    pub fn new(status: String, message: String, countdown: CountdownSnapshot) -> Self {
        Self {
            status,
            message,
            timestamp: Utc::now(),
            countdown,
        }
    }

    /// Create a response reporting the resulting phase
    pub fn ok(message: String, countdown: CountdownSnapshot) -> Self {
        Self::new(countdown.phase.to_string(), message, countdown)
    }

    /// Create a response for a command that went through with a collaborator failure
    pub fn warning(message: String, countdown: CountdownSnapshot) -> Self {
        Self::new("warning".to_string(), message, countdown)
    }

    /// Create an error response
    pub fn error(message: String, countdown: CountdownSnapshot) -> Self {
        Self::new("error".to_string(), message, countdown)
    }
}

/// Status response with clock and countdown information
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusResponse {
    pub clock: String,
    pub countdown: CountdownSnapshot,
    pub uptime: String,
    pub port: u16,
    pub host: String,
    pub last_action: Option<String>,
    pub last_action_time: Option<DateTime<Utc>>,
}

/// Health check response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: DateTime<Utc>,
    pub version: String,
}

impl HealthResponse {
    /// Create a new health response
    pub fn ok() -> Self {
        Self {
            status: "ok".to_string(),
            timestamp: Utc::now(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}
