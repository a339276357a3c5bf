//! HTTP endpoint handlers

use std::sync::Arc;
use axum::{
    extract::State,
    http::StatusCode,
    response::Json,
};
use tracing::{error, info, warn};

use crate::{
    error::CountdownError,
    state::{AppState, CountdownSnapshot},
    tasks::CommandOutcome,
};
use super::responses::{ApiResponse, DurationRequest, HealthResponse, StatusResponse};

type CommandReply = (StatusCode, Json<ApiResponse>);

/// Handle POST /timer/start - Start or restart the countdown
pub async fn start_handler(
    State(state): State<Arc<AppState>>,
    Json(request): Json<DurationRequest>,
) -> CommandReply {
    state.record_action("start");
    let outcome = state.countdown.start(request.duration_seconds).await;
    reply(&state, "start", outcome, |snapshot| {
        if snapshot.configured_duration_seconds > 0 {
            format!("Countdown started for {}", snapshot.remaining)
        } else {
            "Zero duration, countdown not started".to_string()
        }
    })
}

/// Handle POST /timer/button - Press the start/stop button
pub async fn button_handler(
    State(state): State<Arc<AppState>>,
    Json(request): Json<DurationRequest>,
) -> CommandReply {
    let pressed = state.countdown.snapshot().button;
    state.record_action(pressed.title());
    let outcome = state.countdown.press(request.duration_seconds).await;
    reply(&state, "button", outcome, |_| format!("{} pressed", pressed.title()))
}

/// Handle POST /alarm/stop - Dismiss the sounding alarm
pub async fn stop_alarm_handler(State(state): State<Arc<AppState>>) -> CommandReply {
    state.record_action("stop-alarm");
    let outcome = state.countdown.stop_alarm().await;
    reply(&state, "stop-alarm", outcome, |_| "Alarm stopped".to_string())
}

/// Handle POST /timer/reset - Return to idle from any phase
pub async fn reset_handler(State(state): State<Arc<AppState>>) -> CommandReply {
    state.record_action("reset");
    let outcome = state.countdown.reset().await;
    reply(&state, "reset", outcome, |_| "Countdown reset".to_string())
}

/// Handle GET /status - Return clock and countdown status
pub async fn status_handler(State(state): State<Arc<AppState>>) -> Json<StatusResponse> {
    let (last_action, last_action_time) = state.get_last_action();

    Json(StatusResponse {
        clock: state.clock_text(),
        countdown: state.countdown.snapshot(),
        uptime: state.get_uptime(),
        port: state.port,
        host: state.host.clone(),
        last_action,
        last_action_time,
    })
}

/// Handle GET /health - Health check endpoint
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse::ok())
}

/// Turn a command outcome into a status code and response body
fn reply<F>(
    state: &AppState,
    action: &str,
    outcome: Result<CommandOutcome, CountdownError>,
    message: F,
) -> CommandReply
where
    F: FnOnce(&CountdownSnapshot) -> String,
{
    let (snapshot, result) = match outcome {
        Ok(CommandOutcome { snapshot, result }) => (snapshot, result),
        Err(e) => (state.countdown.snapshot(), Err(e)),
    };

    match result {
        Ok(()) => {
            info!("{} command applied, countdown is {}", action, snapshot.phase);
            let message = message(&snapshot);
            (StatusCode::OK, Json(ApiResponse::ok(message, snapshot)))
        }
        Err(e) if e.is_non_fatal() => {
            warn!("{} command applied with warning: {}", action, e);
            (StatusCode::OK, Json(ApiResponse::warning(e.to_string(), snapshot)))
        }
        Err(e) => {
            let status = status_for(&e);
            if status.is_server_error() {
                error!("{} command failed: {}", action, e);
            } else {
                warn!("{} command rejected: {}", action, e);
            }
            (status, Json(ApiResponse::error(e.to_string(), snapshot)))
        }
    }
}

fn status_for(error: &CountdownError) -> StatusCode {
    match error {
        CountdownError::InvalidDuration(_) => StatusCode::BAD_REQUEST,
        CountdownError::NotAlarming { .. } => StatusCode::CONFLICT,
        CountdownError::PlaybackUnavailable { .. } => StatusCode::OK,
        CountdownError::SchedulingUnavailable { .. } | CountdownError::ControllerGone => {
            StatusCode::SERVICE_UNAVAILABLE
        }
    }
}
