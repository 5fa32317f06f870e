use serde::{Deserialize, Serialize};

/// Selectable soundtrack
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Track {
    #[default]
    Gameplay,
    Menu,
}

impl Track {
    /// Unknown names fall back to the gameplay track
    pub fn from_name(name: &str) -> Track {
        match name.trim().to_ascii_lowercase().as_str() {
            "menu" => Track::Menu,
            "gameplay" => Track::Gameplay,
            other => {
                tracing::debug!("Unknown track '{}', using gameplay", other);
                Track::Gameplay
            }
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Track::Gameplay => "gameplay",
            Track::Menu => "menu",
        }
    }

    pub fn base_tempo(&self) -> f32 {
        match self {
            Track::Gameplay => 140.0,
            Track::Menu => 100.0,
        }
    }

    /// Whether difficulty and events may move the tempo
    pub fn tempo_scaling(&self) -> bool {
        matches!(self, Track::Gameplay)
    }

    /// How many patterns, from the start of a catalog of `len`, this track plays
    pub fn pattern_pool(&self, len: usize) -> usize {
        match self {
            Track::Gameplay => len,
            Track::Menu => len.min(2),
        }
    }
}

/// Observable engine state.
///
/// Mutated only by `SoundEngine`; hosts read it through `SoundEngine::state`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineState {
    pub music_playing: bool,
    pub muted: bool,
    pub music_volume: f32,
    pub sfx_volume: f32,
    /// BPM
    pub current_tempo: f32,
    pub current_pattern_index: usize,
    /// Index of the step sounding now, counted since playback began
    pub step_index: u64,
    pub game_difficulty: f32,
    pub track: Track,
}

impl Default for EngineState {
    fn default() -> Self {
        Self {
            music_playing: false,
            muted: false,
            music_volume: 0.5,
            sfx_volume: 0.7,
            current_tempo: Track::Gameplay.base_tempo(),
            current_pattern_index: 0,
            step_index: 0,
            game_difficulty: 1.0,
            track: Track::Gameplay,
        }
    }
}
