use serde::{Deserialize, Serialize};

use crate::audio::Bus;

use super::voice::{Envelope, Sweep, Voice, Waveform};

/// Percussion sound produced by a drum event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DrumKind {
    Kick,
    Snare,
    HiHat,
}

/// Drum hit strength: the only knobs a recipe exposes
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DrumHit {
    /// Seconds
    pub duration: f32,
    pub peak: f32,
}

impl DrumHit {
    pub fn new(duration: f32, peak: f32) -> Self {
        Self { duration, peak }
    }

    /// Same length, scaled strength
    pub fn louder(self, factor: f32) -> Self {
        Self {
            duration: self.duration,
            peak: self.peak * factor,
        }
    }
}

impl DrumKind {
    pub fn name(&self) -> &'static str {
        match self {
            DrumKind::Kick => "kick",
            DrumKind::Snare => "snare",
            DrumKind::HiHat => "hihat",
        }
    }

    /// Hit used for sequenced drum events
    pub fn default_hit(&self) -> DrumHit {
        match self {
            DrumKind::Kick => DrumHit::new(0.25, 1.0),
            DrumKind::Snare => DrumHit::new(0.12, 0.6),
            DrumKind::HiHat => DrumHit::new(0.05, 0.35),
        }
    }

    // Recipes are fixed: pitch path, tone color and decay steepness never vary per hit
    fn waveform(&self) -> Waveform {
        match self {
            DrumKind::Kick => Waveform::Sine,
            DrumKind::Snare => Waveform::Sawtooth,
            DrumKind::HiHat => Waveform::Square,
        }
    }

    fn sweep(&self) -> Sweep {
        match self {
            DrumKind::Kick => Sweep::new(150.0, 40.0),
            DrumKind::Snare => Sweep::new(240.0, 90.0),
            DrumKind::HiHat => Sweep::new(6000.0, 9500.0),
        }
    }

    fn steepness(&self) -> f32 {
        match self {
            DrumKind::Kick => 5.0,
            DrumKind::Snare => 7.0,
            DrumKind::HiHat => 8.0,
        }
    }

    /// Build the voice for one hit starting at `at` on the output clock
    pub fn voice(&self, hit: DrumHit, at: f64) -> Voice {
        Voice::new(
            Bus::Percussion,
            self.waveform(),
            self.sweep(),
            Envelope::struck(hit.duration, self.steepness()),
            hit.peak,
            at,
            hit.duration,
        )
    }
}
