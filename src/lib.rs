//! Countdown Alarm - a countdown timer service with a live clock
//! 
//! This library provides the countdown/alarm state machine, the tasks that drive it once per
//! second, the looping alarm sound and an HTTP surface to start, stop and reset it.

pub mod api;
pub mod config;
pub mod error;
pub mod services;
pub mod state;
pub mod tasks;
pub mod utils;

// Re-export commonly used types
pub use api::create_router;
pub use config::Config;
pub use error::CountdownError;
pub use state::{AppState, CountdownController, Phase};
pub use tasks::{spawn_countdown, CountdownHandle};
pub use utils::signals::shutdown_signal;
