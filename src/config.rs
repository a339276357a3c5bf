//! Configuration and CLI argument handling

use std::path::PathBuf;
use clap::Parser;

/// CLI argument parsing structure
#[derive(Debug, Parser)]
#[command(name = "countdown-alarm")]
#[command(about = "A countdown timer service with a live clock and a looping alarm sound")]
#[command(version)]
pub struct Config {
    /// Port to bind the server to
    #[arg(short, long, default_value = "20554")]
    pub port: u16,

    /// Host address to bind to
    #[arg(long, default_value = "127.0.0.1")]
    pub host: String,

    /// Sound file looped when the countdown reaches zero
    #[arg(short, long, default_value = "London.mp3")]
    pub sound_file: PathBuf,

    /// Command used to play the sound file
    #[arg(long, default_value = "mpg123")]
    pub player: String,

    /// Extra argument passed to the player before the sound file (repeatable)
    #[arg(long = "player-arg", allow_hyphen_values = true)]
    pub player_args: Vec<String>,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,
}

impl Config {
    /// Parse configuration from command line arguments
    pub fn parse() -> Self {
        Parser::parse()
    }

    /// Get the server address as a formatted string
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Get the appropriate log level based on verbose flag
    pub fn log_level(&self) -> &'static str {
        if self.verbose { "debug" } else { "info" }
    }
}
