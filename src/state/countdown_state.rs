//! Countdown state structure and its derived display

use std::fmt;

use serde::{Deserialize, Serialize};

/// Prefix of the remaining-time label shown under the picker
pub const LABEL_PREFIX: &str = "Time remaining: ";

/// Discrete state of the countdown/alarm lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    Idle,
    Running,
    Alarming,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Phase::Idle => "idle",
            Phase::Running => "running",
            Phase::Alarming => "alarming",
        };
        f.write_str(name)
    }
}

/// The single start/stop button and what pressing it does in each phase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ButtonAction {
    #[serde(rename = "Start Timer")]
    StartTimer,
    #[serde(rename = "Stop Timer")]
    StopTimer,
    #[serde(rename = "Stop Music")]
    StopMusic,
}

impl ButtonAction {
    pub fn for_phase(phase: Phase) -> Self {
        match phase {
            Phase::Idle => ButtonAction::StartTimer,
            Phase::Running => ButtonAction::StopTimer,
            Phase::Alarming => ButtonAction::StopMusic,
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            ButtonAction::StartTimer => "Start Timer",
            ButtonAction::StopTimer => "Stop Timer",
            ButtonAction::StopMusic => "Stop Music",
        }
    }
}

/// Countdown state owned by the controller
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CountdownState {
    pub phase: Phase,
    /// Seconds left; always zero while idle
    pub remaining_seconds: u64,
    /// Duration picked before the countdown was started
    pub configured_duration_seconds: u64,
}

impl CountdownState {
    /// Create an idle state with nothing configured
    pub fn new() -> Self {
        Self {
            phase: Phase::Idle,
            remaining_seconds: 0,
            configured_duration_seconds: 0,
        }
    }

    pub fn is_idle(&self) -> bool {
        self.phase == Phase::Idle
    }

    pub fn is_running(&self) -> bool {
        self.phase == Phase::Running
    }

    pub fn is_alarming(&self) -> bool {
        self.phase == Phase::Alarming
    }

    /// Remaining time as `HH:MM:SS`
    pub fn formatted_remaining(&self) -> String {
        format_hms(self.remaining_seconds)
    }
}

impl Default for CountdownState {
    fn default() -> Self {
        Self::new()
    }
}

/// Display refresh payload published after every state mutation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CountdownSnapshot {
    pub phase: Phase,
    pub remaining_seconds: u64,
    pub configured_duration_seconds: u64,
    /// Remaining time as `HH:MM:SS`
    pub remaining: String,
    /// Full label text, e.g. `Time remaining: 00:05:00`
    pub label: String,
    pub button: ButtonAction,
    /// The duration picker only accepts input while idle
    pub picker_enabled: bool,
    /// False after the tick source could not be created
    pub start_enabled: bool,
    /// Collaborator failures since the last start or reset
    pub errors: Vec<String>,
}

impl CountdownSnapshot {
    pub fn new(state: &CountdownState, start_enabled: bool, errors: Vec<String>) -> Self {
        let remaining = state.formatted_remaining();
        Self {
            phase: state.phase,
            remaining_seconds: state.remaining_seconds,
            configured_duration_seconds: state.configured_duration_seconds,
            label: format!("{}{}", LABEL_PREFIX, remaining),
            remaining,
            button: ButtonAction::for_phase(state.phase),
            picker_enabled: state.is_idle(),
            start_enabled,
            errors,
        }
    }
}

impl Default for CountdownSnapshot {
    fn default() -> Self {
        Self::new(&CountdownState::new(), true, Vec::new())
    }
}

/// Format seconds as zero-padded `HH:MM:SS`
pub fn format_hms(total_seconds: u64) -> String {
    let hours = total_seconds / 3600;
    let minutes = (total_seconds % 3600) / 60;
    let seconds = total_seconds % 60;
    format!("{:02}:{:02}:{:02}", hours, minutes, seconds)
}

/// Parse `HH:MM:SS` back into seconds
///
/// Minutes and seconds must be below 60. Hours may exceed two digits.
pub fn parse_hms(text: &str) -> Option<u64> {
    let mut parts = text.split(':');
    let hours: u64 = parts.next()?.parse().ok()?;
    let minutes: u64 = parts.next()?.parse().ok()?;
    let seconds: u64 = parts.next()?.parse().ok()?;
    if parts.next().is_some() || minutes >= 60 || seconds >= 60 {
        return None;
    }
    hours.checked_mul(3600)?.checked_add(minutes * 60 + seconds)
}
