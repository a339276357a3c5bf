//! Background tasks module
//! 
//! This module contains the tasks that run alongside the HTTP server: the countdown
//! controller, its tick source and the live clock.

pub mod clock;
pub mod countdown;
pub mod scheduler;

// Re-export main types and functions
pub use clock::{clock_task, local_clock_text};
pub use countdown::{spawn_countdown, CommandOutcome, CountdownCommand, CountdownHandle};
pub use scheduler::{TickScheduler, TokioTickScheduler};
