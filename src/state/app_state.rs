//! Main application state management

use std::{
    sync::Mutex,
    time::Instant,
};
use chrono::{DateTime, Utc};
use tokio::sync::watch;

use crate::tasks::CountdownHandle;

/// Shared state behind the HTTP handlers
#[derive(Debug)]
pub struct AppState {
    /// Handle to the countdown controller task
    pub countdown: CountdownHandle,
    /// Latest clock text from the clock task
    pub clock_rx: watch::Receiver<String>,
    /// Server metadata
    pub start_time: Instant,
    pub port: u16,
    pub host: String,
    /// Last action tracking
    pub last_action: Mutex<Option<String>>,
    pub last_action_time: Mutex<Option<DateTime<Utc>>>,
}

impl AppState {
    pub fn new(
        countdown: CountdownHandle,
        clock_rx: watch::Receiver<String>,
        port: u16,
        host: String,
    ) -> Self {
        Self {
            countdown,
            clock_rx,
            start_time: Instant::now(),
            port,
            host,
            last_action: Mutex::new(None),
            last_action_time: Mutex::new(None),
        }
    }

    /// Remember the most recent user command
    pub fn record_action(&self, action: &str) {
        if let Ok(mut last_action) = self.last_action.lock() {
            *last_action = Some(action.to_string());
        }
        if let Ok(mut last_time) = self.last_action_time.lock() {
            *last_time = Some(Utc::now());
        }
    }

    /// Get last action information
    pub fn get_last_action(&self) -> (Option<String>, Option<DateTime<Utc>>) {
        let last_action = self.last_action.lock().ok().and_then(|a| a.clone());
        let last_action_time = self.last_action_time.lock().ok().and_then(|t| *t);
        (last_action, last_action_time)
    }

    /// Current clock display text
    pub fn clock_text(&self) -> String {
        self.clock_rx.borrow().clone()
    }

    /// Calculate server uptime as a formatted string
    pub fn get_uptime(&self) -> String {
        format_uptime(self.start_time.elapsed().as_secs())
    }
}

fn format_uptime(total_seconds: u64) -> String {
    let hours = total_seconds / 3600;
    let minutes = (total_seconds % 3600) / 60;
    let seconds = total_seconds % 60;

    if hours > 0 {
        format!("{}h {}m {}s", hours, minutes, seconds)
    } else if minutes > 0 {
        format!("{}m {}s", minutes, seconds)
    } else {
        format!("{}s", seconds)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_uptime() {
        assert_eq!(format_uptime(7), "7s");
        assert_eq!(format_uptime(125), "2m 5s");
        assert_eq!(format_uptime(3725), "1h 2m 5s");
    }
}
