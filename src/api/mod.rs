//! HTTP API module
//! 
//! This module contains the HTTP endpoints that drive the countdown, standing in for the
//! on-screen controls.

pub mod handlers;
pub mod responses;

use std::sync::Arc;
use axum::{
    routing::{get, post},
    Router,
};
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::state::AppState;
use handlers::*;

/// Create the HTTP router with all endpoints
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/timer/start", post(start_handler))
        .route("/timer/button", post(button_handler))
        .route("/timer/reset", post(reset_handler))
        .route("/alarm/stop", post(stop_alarm_handler))
        .route("/status", get(status_handler))
        .route("/health", get(health_handler))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive()),
        )
        .with_state(state)
}
