//! External services module
//! 
//! This module wraps the processes the alarm relies on: the audio player command.

pub mod sound;
pub mod system;

// Re-export main types and functions
pub use sound::{CommandSoundPlayer, SoundPlayer};
pub use system::check_player_available;
