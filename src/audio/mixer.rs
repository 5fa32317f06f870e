use serde::{Deserialize, Serialize};

/// Routing destination of a voice.
///
/// The first five are the music channels; `Effects` carries one-shot sounds
/// and is governed by the SFX volume instead of the music volume.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Bus {
    Lead,
    Bass,
    Harmony,
    Percussion,
    Arpeggio,
    Effects,
}

impl Bus {
    pub const MUSIC: [Bus; 5] = [Bus::Lead, Bus::Bass, Bus::Harmony, Bus::Percussion, Bus::Arpeggio];

    pub fn name(&self) -> &'static str {
        match self {
            Bus::Lead => "lead",
            Bus::Bass => "bass",
            Bus::Harmony => "harmony",
            Bus::Percussion => "percussion",
            Bus::Arpeggio => "arpeggio",
            Bus::Effects => "effects",
        }
    }

    pub fn is_music(&self) -> bool {
        !matches!(self, Bus::Effects)
    }
}

/// Gain weight of each music bus
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BusWeights {
    pub lead: f32,
    pub bass: f32,
    pub harmony: f32,
    pub percussion: f32,
    pub arpeggio: f32,
}

impl Default for BusWeights {
    fn default() -> Self {
        Self {
            lead: 0.3,
            bass: 0.4,
            harmony: 0.15,
            percussion: 0.5,
            arpeggio: 0.2,
        }
    }
}

impl BusWeights {
    pub fn weight(&self, bus: Bus) -> f32 {
        match bus {
            Bus::Lead => self.lead,
            Bus::Bass => self.bass,
            Bus::Harmony => self.harmony,
            Bus::Percussion => self.percussion,
            Bus::Arpeggio => self.arpeggio,
            Bus::Effects => 1.0,
        }
    }
}

/// One music bus of a playback session
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChannelBus {
    pub bus: Bus,
    pub gain_weight: f32,
}

impl ChannelBus {
    /// The five buses of a fresh playback session
    pub fn session(weights: &BusWeights) -> Vec<ChannelBus> {
        Bus::MUSIC
            .iter()
            .map(|&bus| ChannelBus {
                bus,
                gain_weight: weights.weight(bus).clamp(0.0, 1.0),
            })
            .collect()
    }
}

/// Render-side gain stage: music gate plus the two master volumes
pub struct Mixer {
    open: bool,
    music_volume: f32,
    sfx_volume: f32,
}

impl Mixer {
    pub fn new() -> Self {
        Self {
            open: false,
            music_volume: 1.0,
            sfx_volume: 1.0,
        }
    }

    pub fn open(&mut self) {
        self.open = true;
    }

    pub fn close(&mut self) {
        self.open = false;
    }

    pub fn is_open(&self) -> bool {
        self.open
    }

    pub fn set_music_volume(&mut self, volume: f32) {
        self.music_volume = volume.clamp(0.0, 1.0);
    }

    pub fn set_sfx_volume(&mut self, volume: f32) {
        self.sfx_volume = volume.clamp(0.0, 1.0);
    }

    /// Final gain for a voice on `bus`
    pub fn gain(&self, bus: Bus) -> f32 {
        if !bus.is_music() {
            self.sfx_volume
        } else if self.open {
            self.music_volume
        } else {
            0.0
        }
    }
}

impl Default for Mixer {
    fn default() -> Self {
        Self::new()
    }
}

/// Soft clipping function to prevent harsh digital clipping
pub fn soft_clip(x: f32) -> f32 {
    if x > 1.0 {
        1.0 - (-x + 1.0).exp() * 0.5
    } else if x < -1.0 {
        -1.0 + (x + 1.0).exp() * 0.5
    } else {
        x
    }
}
