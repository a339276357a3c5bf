//! Countdown Alarm - a countdown timer service with a live clock
//! 
//! This is the main entry point for the countdown-alarm application.

use std::{sync::Arc, time::Duration};
use tokio::{net::TcpListener, sync::watch};
use tracing::{info, warn};

use countdown_alarm::{
    api::create_router,
    config::Config,
    services::{check_player_available, CommandSoundPlayer},
    state::AppState,
    tasks::{clock_task, local_clock_text, spawn_countdown},
    utils::shutdown_signal,
};

const TICK_PERIOD: Duration = Duration::from_secs(1);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::parse();

    // Initialize tracing with appropriate log level
    tracing_subscriber::fmt()
        .with_env_filter(format!("countdown_alarm={},tower_http=info", config.log_level()))
        .init();

    info!("Starting countdown-alarm server v{}", env!("CARGO_PKG_VERSION"));
    info!("Configuration: host={}, port={}, sound={}, player={}",
          config.host, config.port, config.sound_file.display(), config.player);

    // A missing player only silences the alarm
    if let Err(e) = check_player_available(&config.player).await {
        warn!("{}", e);
    }
    if !config.sound_file.is_file() {
        warn!("Sound file {} not found, the alarm will be silent", config.sound_file.display());
    }

    let player = CommandSoundPlayer::new(
        config.player.clone(),
        config.player_args.clone(),
        config.sound_file.clone(),
    );
    let countdown = spawn_countdown(player, TICK_PERIOD);

    // Start the clock background task
    let (clock_tx, clock_rx) = watch::channel(local_clock_text());
    tokio::spawn(clock_task(clock_tx));

    let state = Arc::new(AppState::new(countdown, clock_rx, config.port, config.host.clone()));

    // Create HTTP router with all endpoints
    let app = create_router(state);

    // Bind to the specified address
    let addr = config.address();
    let listener = TcpListener::bind(&addr).await?;

    info!("Server running on http://{}", addr);
    info!("Endpoints:");
    info!("  POST /timer/start  - Start the countdown ({{\"duration_seconds\": N}})");
    info!("  POST /timer/button - Press the start/stop button");
    info!("  POST /timer/reset  - Reset the countdown");
    info!("  POST /alarm/stop   - Stop the alarm");
    info!("  GET  /status       - Clock and countdown status");
    info!("  GET  /health       - Health check");

    // Setup graceful shutdown
    let server = axum::serve(listener, app);

    tokio::select! {
        result = server => {
            if let Err(e) = result {
                tracing::error!("Server error: {}", e);
            }
        }
        _ = shutdown_signal() => {
            info!("Shutdown signal received");
        }
    }

    info!("Server shutdown complete");
    Ok(())
}
