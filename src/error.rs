//! Error types for countdown operations

use thiserror::Error;

use crate::state::Phase;

/// Errors reported by the countdown controller and its collaborators
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CountdownError {
    #[error("invalid countdown duration {0}s: duration must not be negative")]
    InvalidDuration(i64),

    /// Non-fatal: the state machine has already moved on when this is reported
    #[error("alarm playback unavailable: {reason}")]
    PlaybackUnavailable { reason: String },

    #[error("tick scheduling unavailable: {reason}")]
    SchedulingUnavailable { reason: String },

    #[error("no alarm to stop: countdown is {phase}")]
    NotAlarming { phase: Phase },

    #[error("countdown controller is no longer running")]
    ControllerGone,
}

impl CountdownError {
    /// Whether the requested command was carried out despite this error
    pub fn is_non_fatal(&self) -> bool {
        matches!(self, CountdownError::PlaybackUnavailable { .. })
    }
}
