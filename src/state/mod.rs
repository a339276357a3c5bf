//! State management module
//! 
//! This module contains the countdown state machine and the shared application state.

pub mod app_state;
pub mod controller;
pub mod countdown_state;

// Re-export main types
pub use app_state::AppState;
pub use controller::CountdownController;
pub use countdown_state::{
    format_hms, parse_hms, ButtonAction, CountdownSnapshot, CountdownState, Phase,
};
