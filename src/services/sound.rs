//! Looping alarm playback through an external player command

use std::{
    path::PathBuf,
    process::Stdio,
    time::{Duration, Instant},
};
use tokio::{process::Command, runtime::Handle, task::JoinHandle};
use tracing::{debug, info, warn};

use crate::error::CountdownError;

/// A play-through shorter than this means the player is not really playing anything
const MIN_PLAYBACK: Duration = Duration::from_millis(250);

/// Plays the alarm sound on command
pub trait SoundPlayer {
    /// Begin looping playback until [`SoundPlayer::stop`] is called
    fn start_loop(&mut self) -> Result<(), CountdownError>;

    /// Stop playback; stopping a silent player is not an error
    fn stop(&mut self) -> Result<(), CountdownError>;

    fn is_playing(&self) -> bool;
}

/// Runs `<program> <args...> <sound_file>` over and over until stopped
#[derive(Debug)]
pub struct CommandSoundPlayer {
    program: String,
    args: Vec<String>,
    sound_file: PathBuf,
    loop_task: Option<JoinHandle<()>>,
}

impl CommandSoundPlayer {
    pub fn new(
        program: impl Into<String>,
        args: Vec<String>,
        sound_file: impl Into<PathBuf>,
    ) -> Self {
        Self {
            program: program.into(),
            args,
            sound_file: sound_file.into(),
            loop_task: None,
        }
    }

    fn command(&self) -> Command {
        let mut command = Command::new(&self.program);
        command
            .args(&self.args)
            .arg(&self.sound_file)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true);
        command
    }
}

impl SoundPlayer for CommandSoundPlayer {
    fn start_loop(&mut self) -> Result<(), CountdownError> {
        self.stop()?;

        if !self.sound_file.is_file() {
            return Err(CountdownError::PlaybackUnavailable {
                reason: format!("sound file {} not found", self.sound_file.display()),
            });
        }
        let runtime = Handle::try_current().map_err(|e| CountdownError::PlaybackUnavailable {
            reason: format!("no runtime to play on: {}", e),
        })?;

        let mut command = self.command();
        let program = self.program.clone();
        info!("Looping alarm sound {} with {}", self.sound_file.display(), program);

        self.loop_task = Some(runtime.spawn(async move {
            loop {
                let started = Instant::now();
                match command.status().await {
                    Ok(status) if status.success() => {
                        if started.elapsed() < MIN_PLAYBACK {
                            warn!("{} finished immediately, giving up on alarm sound", program);
                            break;
                        }
                        debug!("Alarm sound finished, replaying");
                    }
                    Ok(status) => {
                        warn!("{} exited with {}, alarm is silent", program, status);
                        break;
                    }
                    Err(e) => {
                        warn!("Failed to run {}: {}, alarm is silent", program, e);
                        break;
                    }
                }
            }
        }));
        Ok(())
    }

    fn stop(&mut self) -> Result<(), CountdownError> {
        if let Some(task) = self.loop_task.take() {
            // Dropping the in-flight child kills the player process
            task.abort();
            debug!("Alarm sound stopped");
        }
        Ok(())
    }

    fn is_playing(&self) -> bool {
        self.loop_task.as_ref().is_some_and(|task| !task.is_finished())
    }
}

impl Drop for CommandSoundPlayer {
    fn drop(&mut self) {
        if let Some(task) = self.loop_task.take() {
            task.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_missing_sound_file_is_unavailable() {
        let mut player =
            CommandSoundPlayer::new("mpg123", vec!["-q".to_string()], "/nonexistent/London.mp3");

        let err = player.start_loop().unwrap_err();
        assert!(matches!(err, CountdownError::PlaybackUnavailable { .. }));
        assert!(err.to_string().contains("/nonexistent/London.mp3"));
        assert!(!player.is_playing());
    }

    #[test]
    fn test_stop_when_silent_is_ok() {
        let mut player = CommandSoundPlayer::new("mpg123", Vec::new(), "London.mp3");
        assert!(player.stop().is_ok());
        assert!(!player.is_playing());
    }

    #[tokio::test]
    async fn test_loops_until_stopped() {
        // `sleep <file>` is not a valid duration, so use a shell that ignores its argument
        let sound_file = std::env::temp_dir().join("countdown-alarm-test-sound");
        std::fs::write(&sound_file, b"").unwrap();
        let mut player = CommandSoundPlayer::new(
            "sh",
            vec!["-c".to_string(), "sleep 5".to_string()],
            &sound_file,
        );

        player.start_loop().unwrap();
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(player.is_playing());

        player.stop().unwrap();
        assert!(!player.is_playing());
    }

    #[tokio::test]
    async fn test_unspawnable_player_goes_silent() {
        let sound_file = std::env::temp_dir().join("countdown-alarm-test-sound-missing-player");
        std::fs::write(&sound_file, b"").unwrap();
        let mut player =
            CommandSoundPlayer::new("countdown-alarm-no-such-player", Vec::new(), &sound_file);

        player.start_loop().unwrap();
        for _ in 0..100 {
            if !player.is_playing() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert!(!player.is_playing());
    }
}
