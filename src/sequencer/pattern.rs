use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::audio::Bus;
use crate::synth::{
    arpeggio_speed, arpeggio_voices, drum_voice, note_voice, DrumKind, Voice, Waveform,
};

/// Steps in one pattern loop (sixteenth notes)
pub const STEPS: usize = 16;

/// A sustained note on the lead, bass or harmony channel
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NoteEvent {
    pub freq: f32,
    pub start: usize,
    /// Length in steps
    pub duration: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DrumEvent {
    #[serde(rename = "type")]
    pub kind: DrumKind,
    pub start: usize,
}

/// A chord played as a fast burst across `duration` steps
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArpeggioEvent {
    pub freqs: Vec<f32>,
    pub start: usize,
    pub duration: f32,
}

/// The five instrument roles of a pattern
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Channel {
    Lead,
    Bass,
    Harmony,
    Drums,
    Arp,
}

impl Channel {
    pub const ALL: [Channel; 5] = [
        Channel::Lead,
        Channel::Bass,
        Channel::Harmony,
        Channel::Drums,
        Channel::Arp,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Channel::Lead => "lead",
            Channel::Bass => "bass",
            Channel::Harmony => "harmony",
            Channel::Drums => "drums",
            Channel::Arp => "arp",
        }
    }

    pub fn bus(&self) -> Bus {
        match self {
            Channel::Lead => Bus::Lead,
            Channel::Bass => Bus::Bass,
            Channel::Harmony => Bus::Harmony,
            Channel::Drums => Bus::Percussion,
            Channel::Arp => Bus::Arpeggio,
        }
    }

    /// Tone color of the channel's notes (drums use their own recipes)
    pub fn waveform(&self) -> Waveform {
        match self {
            Channel::Lead | Channel::Arp => Waveform::Square,
            Channel::Bass => Waveform::Sawtooth,
            Channel::Harmony | Channel::Drums => Waveform::Triangle,
        }
    }
}

#[derive(Debug, Error)]
pub enum PatternError {
    #[error("pattern '{pattern}': {channel} event at step {start} is outside 0..{STEPS}")]
    StartOutOfRange {
        pattern: String,
        channel: &'static str,
        start: usize,
    },
    #[error("pattern '{pattern}': two {channel} events start at step {start}")]
    DuplicateStart {
        pattern: String,
        channel: &'static str,
        start: usize,
    },
    #[error("pattern '{pattern}': {channel} event at step {start} has a non-positive duration")]
    InvalidDuration {
        pattern: String,
        channel: &'static str,
        start: usize,
    },
    #[error("pattern '{pattern}': {channel} event at step {start} has an invalid frequency")]
    InvalidFrequency {
        pattern: String,
        channel: &'static str,
        start: usize,
    },
    #[error("pattern catalog is empty")]
    EmptyCatalog,
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Parse(#[from] serde_json::Error),
}

/// One fixed 16-step multi-channel arrangement
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pattern {
    pub name: String,
    #[serde(default)]
    pub lead: Vec<NoteEvent>,
    #[serde(default)]
    pub bass: Vec<NoteEvent>,
    #[serde(default)]
    pub harmony: Vec<NoteEvent>,
    #[serde(default)]
    pub drums: Vec<DrumEvent>,
    #[serde(default)]
    pub arp: Vec<ArpeggioEvent>,
}

impl Pattern {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            lead: Vec::new(),
            bass: Vec::new(),
            harmony: Vec::new(),
            drums: Vec::new(),
            arp: Vec::new(),
        }
    }

    fn notes(&self, channel: Channel) -> &[NoteEvent] {
        match channel {
            Channel::Lead => &self.lead,
            Channel::Bass => &self.bass,
            Channel::Harmony => &self.harmony,
            Channel::Drums | Channel::Arp => &[],
        }
    }

    /// Start steps of every event on `channel`, in authoring order
    pub fn starts(&self, channel: Channel) -> Vec<usize> {
        match channel {
            Channel::Drums => self.drums.iter().map(|d| d.start).collect(),
            Channel::Arp => self.arp.iter().map(|a| a.start).collect(),
            _ => self.notes(channel).iter().map(|n| n.start).collect(),
        }
    }

    /// Returns true if `channel` has an event starting on `step`
    pub fn has_event(&self, channel: Channel, step: usize) -> bool {
        self.starts(channel).contains(&step)
    }

    /// Drum played on `step`, if any
    pub fn drum_at(&self, step: usize) -> Option<DrumKind> {
        self.drums.iter().find(|d| d.start == step).map(|d| d.kind)
    }

    /// Total number of events across all channels
    pub fn density(&self) -> usize {
        Channel::ALL.iter().map(|&c| self.starts(c).len()).sum()
    }

    /// Mean lead frequency, a rough measure of the pattern's register
    pub fn register(&self) -> f32 {
        if self.lead.is_empty() {
            return 0.0;
        }
        self.lead.iter().map(|n| n.freq).sum::<f32>() / self.lead.len() as f32
    }

    /// Check the authoring invariants: starts in range, one event per start
    /// step within a channel, positive durations and frequencies.
    pub fn validate(&self) -> Result<(), PatternError> {
        for channel in Channel::ALL {
            let mut seen = [false; STEPS];
            for start in self.starts(channel) {
                if start >= STEPS {
                    return Err(PatternError::StartOutOfRange {
                        pattern: self.name.clone(),
                        channel: channel.name(),
                        start,
                    });
                }
                if seen[start] {
                    return Err(PatternError::DuplicateStart {
                        pattern: self.name.clone(),
                        channel: channel.name(),
                        start,
                    });
                }
                seen[start] = true;
            }
        }

        let bad_freq = |f: f32| !f.is_finite() || f <= 0.0;
        let bad_duration = |d: f32| !d.is_finite() || d <= 0.0;

        for channel in [Channel::Lead, Channel::Bass, Channel::Harmony] {
            for note in self.notes(channel) {
                if bad_freq(note.freq) {
                    return Err(self.invalid_frequency(channel, note.start));
                }
                if bad_duration(note.duration) {
                    return Err(self.invalid_duration(channel, note.start));
                }
            }
        }
        for arp in &self.arp {
            if arp.freqs.is_empty() || arp.freqs.iter().any(|&f| bad_freq(f)) {
                return Err(self.invalid_frequency(Channel::Arp, arp.start));
            }
            if bad_duration(arp.duration) {
                return Err(self.invalid_duration(Channel::Arp, arp.start));
            }
        }
        Ok(())
    }

    fn invalid_frequency(&self, channel: Channel, start: usize) -> PatternError {
        PatternError::InvalidFrequency {
            pattern: self.name.clone(),
            channel: channel.name(),
            start,
        }
    }

    fn invalid_duration(&self, channel: Channel, start: usize) -> PatternError {
        PatternError::InvalidDuration {
            pattern: self.name.clone(),
            channel: channel.name(),
            start,
        }
    }

    /// Voices for every event starting on `step`, all sharing the start time `at`
    pub fn voices_at(&self, step: usize, at: f64, step_secs: f32, tempo: f32) -> Vec<Voice> {
        let mut voices = Vec::new();

        for channel in [Channel::Lead, Channel::Bass, Channel::Harmony] {
            for note in self.notes(channel).iter().filter(|n| n.start == step) {
                voices.push(note_voice(
                    note.freq,
                    note.duration,
                    step_secs,
                    channel.bus(),
                    channel.waveform(),
                    at,
                ));
            }
        }

        for drum in self.drums.iter().filter(|d| d.start == step) {
            voices.push(drum_voice(drum.kind, drum.kind.default_hit(), at));
        }

        let speed = arpeggio_speed(tempo);
        for arp in self.arp.iter().filter(|a| a.start == step) {
            voices.extend(arpeggio_voices(
                &arp.freqs,
                arp.duration,
                step_secs,
                Channel::Arp.bus(),
                Channel::Arp.waveform(),
                at,
                speed,
            ));
        }

        voices
    }
}
