use crate::audio::Bus;

use super::voice::{Voice, VoiceId};

/// Render-side state of one voice
pub struct VoiceState {
    voice: Voice,
    sample_rate: f32,
    /// Absolute sample index at which the voice begins
    start_sample: u64,
    /// Total duration in samples
    duration_samples: u64,
    /// Accumulated oscillator phase (0.0 to 1.0)
    osc_phase: f32,
}

impl VoiceState {
    pub fn new(voice: Voice, sample_rate: f32) -> Self {
        let start_sample = (voice.start.max(0.0) * sample_rate as f64).round() as u64;
        let duration_samples = ((voice.duration.max(0.0) * sample_rate) as u64).max(1);
        Self {
            voice,
            sample_rate,
            start_sample,
            duration_samples,
            osc_phase: 0.0,
        }
    }

    pub fn id(&self) -> VoiceId {
        self.voice.id
    }

    pub fn bus(&self) -> Bus {
        self.voice.bus
    }

    /// True once the voice has played out by sample index `clock`
    pub fn is_finished(&self, clock: u64) -> bool {
        clock >= self.start_sample + self.duration_samples
    }

    /// Generate the sample for absolute sample index `clock`
    pub fn next_sample(&mut self, clock: u64) -> f32 {
        if clock < self.start_sample {
            return 0.0;
        }
        let index = clock - self.start_sample;
        if index >= self.duration_samples {
            return 0.0;
        }

        let t = index as f32 / self.sample_rate;
        let progress = index as f32 / self.duration_samples as f32;

        // Accumulate phase incrementally so sweeps stay continuous
        let freq = self.voice.sweep.at(progress);
        self.osc_phase += freq / self.sample_rate;
        if self.osc_phase >= 1.0 {
            self.osc_phase -= self.osc_phase.floor();
        }

        let osc = self.voice.waveform.sample(self.osc_phase);
        let amp = self.voice.envelope.level(t, self.voice.duration);

        osc * amp * self.voice.peak
    }
}
