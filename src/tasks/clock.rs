//! Live clock background task

use std::time::Duration;
use chrono::{DateTime, Local, TimeZone};
use tokio::{sync::watch, time::interval};
use tracing::{debug, info};

/// Medium date and medium time, e.g. `Nov 6, 2024 at 3:04:05 PM`
const CLOCK_FORMAT: &str = "%b %-d, %Y at %-I:%M:%S %p";

/// Format a point in time for the clock display
pub fn format_clock<Tz>(now: &DateTime<Tz>) -> String
where
    Tz: TimeZone,
    Tz::Offset: std::fmt::Display,
{
    now.format(CLOCK_FORMAT).to_string()
}

/// Current local time, formatted for the clock display
pub fn local_clock_text() -> String {
    format_clock(&Local::now())
}

/// Background task that refreshes the clock display once per second
pub async fn clock_task(clock_tx: watch::Sender<String>) {
    info!("Starting clock task");

    let mut interval = interval(Duration::from_secs(1));

    loop {
        interval.tick().await;

        if clock_tx.send(local_clock_text()).is_err() {
            debug!("No clock display left, stopping clock task");
            break;
        }
    }
}
