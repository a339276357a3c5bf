//! System checks for external commands

use tokio::process::Command;
use tracing::info;

/// Check if the audio player command can be executed
pub async fn check_player_available(program: &str) -> Result<(), String> {
    let output = Command::new(program)
        .arg("--version")
        .output()
        .await
        .map_err(|e| format!("{} is not available: {}. The alarm will be silent.", program, e))?;

    let version = String::from_utf8_lossy(&output.stdout);
    info!(
        "{} is available: {}",
        program,
        version.lines().next().unwrap_or("unknown version")
    );
    Ok(())
}
