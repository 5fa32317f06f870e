use serde::{Deserialize, Serialize};

use crate::engine::{GameEvent, Track};
use crate::synth::SoundKind;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CommandSource {
    Keyboard,
    Autopilot,
}

impl CommandSource {
    pub fn name(&self) -> &'static str {
        match self {
            CommandSource::Keyboard => "key",
            CommandSource::Autopilot => "auto",
        }
    }
}

/// One call into the engine's public API
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Command {
    Init,

    // Transport
    StartMusic { track: Track, difficulty: f32 },
    StopMusic,

    // Game signals
    UpdateDifficulty { difficulty: f32, score: u64 },
    GameEvent(GameEvent),

    // One-shots
    PlaySound(SoundKind),

    // Preferences
    SetMusicVolume(f32),
    SetSfxVolume(f32),
    ToggleMute,
}

impl Command {
    /// Returns true if this command should be logged to event log
    pub fn is_loggable(&self) -> bool {
        // Sent every frame by the game loop
        !matches!(self, Command::UpdateDifficulty { .. })
    }

    /// Human-readable description of the command
    pub fn description(&self) -> String {
        match self {
            Command::Init => "Init audio".to_string(),
            Command::StartMusic { track, difficulty } => {
                format!("Start {} music at difficulty {:.1}", track.name(), difficulty)
            }
            Command::StopMusic => "Stop music".to_string(),
            Command::UpdateDifficulty { difficulty, score } => {
                format!("Difficulty {:.1}, score {}", difficulty, score)
            }
            Command::GameEvent(event) => match event {
                GameEvent::Killstreak { streak } => format!("Killstreak x{}", streak),
                GameEvent::FrenzyStart { tier } | GameEvent::FrenzyExtend { tier } => {
                    format!("{} tier {}", event.name(), tier)
                }
                _ => event.name().to_string(),
            },
            Command::PlaySound(kind) => format!("Play {}", kind.name()),
            Command::SetMusicVolume(v) => format!("Set music volume to {:.2}", v),
            Command::SetSfxVolume(v) => format!("Set SFX volume to {:.2}", v),
            Command::ToggleMute => "Toggle mute".to_string(),
        }
    }
}
