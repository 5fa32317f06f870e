use crate::synth::VoiceState;

use super::mixer::{soft_clip, Mixer};
use super::OutputCommand;

/// Upper bound on simultaneously sounding voices; the oldest is stolen beyond it
pub const MAX_VOICES: usize = 256;

/// How often (in samples) finished voices are swept out
const CLEANUP_INTERVAL: u64 = 64;

/// Sample generator shared by the device callback and offline rendering
pub struct Renderer {
    sample_rate: f32,
    /// Absolute sample index of the next sample to produce
    clock: u64,
    voices: Vec<VoiceState>,
    mixer: Mixer,
}

impl Renderer {
    pub fn new(sample_rate: f32) -> Self {
        Self {
            sample_rate,
            clock: 0,
            voices: Vec::with_capacity(MAX_VOICES),
            mixer: Mixer::new(),
        }
    }

    pub fn sample_rate(&self) -> f32 {
        self.sample_rate
    }

    pub fn clock(&self) -> u64 {
        self.clock
    }

    /// Output clock in seconds
    pub fn now(&self) -> f64 {
        self.clock as f64 / self.sample_rate as f64
    }

    pub fn active_voices(&self) -> usize {
        self.voices.len()
    }

    pub fn mixer(&self) -> &Mixer {
        &self.mixer
    }

    /// Apply a command from the engine
    pub fn handle(&mut self, cmd: OutputCommand) {
        match cmd {
            OutputCommand::OpenBuses => self.mixer.open(),
            OutputCommand::CloseBuses => {
                self.mixer.close();
                self.voices.retain(|v| !v.bus().is_music());
            }
            OutputCommand::Play(voice) => {
                // Music arriving after teardown belongs to a dead session
                if voice.bus.is_music() && !self.mixer.is_open() {
                    return;
                }
                if self.voices.len() >= MAX_VOICES {
                    self.voices.remove(0);
                }
                self.voices.push(VoiceState::new(voice, self.sample_rate));
            }
            OutputCommand::Release(ids) => {
                self.voices.retain(|v| !ids.contains(&v.id()));
            }
            OutputCommand::SetMusicVolume(volume) => self.mixer.set_music_volume(volume),
            OutputCommand::SetSfxVolume(volume) => self.mixer.set_sfx_volume(volume),
        }
    }

    /// Generate the next mono sample
    pub fn next_sample(&mut self) -> f32 {
        let clock = self.clock;
        let mut mix = 0.0f32;
        for voice in &mut self.voices {
            mix += voice.next_sample(clock) * self.mixer.gain(voice.bus());
        }

        self.clock += 1;
        if self.clock % CLEANUP_INTERVAL == 0 {
            let clock = self.clock;
            self.voices.retain(|v| !v.is_finished(clock));
        }

        soft_clip(mix)
    }
}
