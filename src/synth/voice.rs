use std::f32::consts::TAU;

use serde::{Deserialize, Serialize};

use crate::audio::Bus;

/// Attack length as a fraction of a sustained note's duration
pub const ATTACK_RATIO: f32 = 0.008;
/// Decay length as a fraction of a sustained note's duration
pub const DECAY_RATIO: f32 = 0.035;
/// Release length as a fraction of a sustained note's duration
pub const RELEASE_RATIO: f32 = 0.08;
/// Hold level after the decay stage, relative to peak
pub const SUSTAIN_LEVEL: f32 = 0.7;

/// Identifier assigned to every voice handed to an output
pub type VoiceId = u64;

/// Tone color of a synthesized voice
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Waveform {
    Sine,
    Square,
    Triangle,
    Sawtooth,
}

impl Waveform {
    /// Sample the waveform at a phase in [0, 1)
    pub fn sample(&self, phase: f32) -> f32 {
        match self {
            Waveform::Sine => (phase * TAU).sin(),
            Waveform::Square => {
                if phase < 0.5 {
                    1.0
                } else {
                    -1.0
                }
            }
            Waveform::Triangle => 1.0 - 4.0 * (phase - 0.5).abs(),
            Waveform::Sawtooth => phase * 2.0 - 1.0,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Waveform::Sine => "sine",
            Waveform::Square => "square",
            Waveform::Triangle => "triangle",
            Waveform::Sawtooth => "sawtooth",
        }
    }
}

/// Oscillator frequency path: an exponential ramp from `from` to `to` over the voice
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sweep {
    pub from: f32,
    pub to: f32,
}

impl Sweep {
    pub fn fixed(freq: f32) -> Self {
        Self {
            from: freq,
            to: freq,
        }
    }

    pub fn new(from: f32, to: f32) -> Self {
        Self { from, to }
    }

    /// Frequency at `progress` (0.0 = start, 1.0 = end of the voice)
    pub fn at(&self, progress: f32) -> f32 {
        if self.from <= 0.0 || self.to <= 0.0 || self.from == self.to {
            return self.from;
        }
        self.from * (self.to / self.from).powf(progress.clamp(0.0, 1.0))
    }

    pub fn is_rising(&self) -> bool {
        self.to > self.from
    }

    pub fn is_falling(&self) -> bool {
        self.to < self.from
    }
}

/// Amplitude shape applied to a voice
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Envelope {
    /// attack -> decay -> sustain hold -> release (seconds; sustain relative to peak)
    Adsr {
        attack: f32,
        decay: f32,
        sustain: f32,
        release: f32,
    },
    /// Instant attack followed by exponential decay (`rate` per second)
    Percussive { rate: f32 },
}

impl Envelope {
    /// Sustained-note envelope with stage lengths proportional to `duration`
    pub fn for_note(duration: f32) -> Self {
        Envelope::Adsr {
            attack: duration * ATTACK_RATIO,
            decay: duration * DECAY_RATIO,
            sustain: SUSTAIN_LEVEL,
            release: duration * RELEASE_RATIO,
        }
    }

    /// Struck envelope that has decayed by roughly `steepness` e-folds at `duration`
    pub fn struck(duration: f32, steepness: f32) -> Self {
        Envelope::Percussive {
            rate: steepness / duration.max(1e-4),
        }
    }

    /// Level in [0, 1] at `t` seconds into a voice lasting `duration` seconds
    pub fn level(&self, t: f32, duration: f32) -> f32 {
        if t < 0.0 || t >= duration {
            return 0.0;
        }
        match *self {
            Envelope::Adsr {
                attack,
                decay,
                sustain,
                release,
            } => {
                let release_start = (duration - release).max(0.0);
                let held = if attack > 0.0 && t < attack {
                    t / attack
                } else if decay > 0.0 && t < attack + decay {
                    1.0 - (1.0 - sustain) * (t - attack) / decay
                } else {
                    sustain
                };
                if release > 0.0 && t >= release_start {
                    held.min(sustain) * (duration - t) / release
                } else {
                    held
                }
            }
            Envelope::Percussive { rate } => (-t * rate).exp(),
        }
    }
}

/// A fully specified, self-terminating synthesis request.
///
/// Voices are built on the control side with an absolute start time on the
/// output clock, then handed to an output which renders them autonomously.
#[derive(Debug, Clone, PartialEq)]
pub struct Voice {
    pub id: VoiceId,
    pub bus: Bus,
    pub waveform: Waveform,
    pub sweep: Sweep,
    pub envelope: Envelope,
    /// Peak gain after bus weighting, before master volume
    pub peak: f32,
    /// Start time on the output clock, in seconds
    pub start: f64,
    /// Length in seconds
    pub duration: f32,
}

impl Voice {
    pub fn new(
        bus: Bus,
        waveform: Waveform,
        sweep: Sweep,
        envelope: Envelope,
        peak: f32,
        start: f64,
        duration: f32,
    ) -> Self {
        Self {
            id: 0,
            bus,
            waveform,
            sweep,
            envelope,
            peak,
            start,
            duration,
        }
    }

    /// Time on the output clock at which this voice has fully terminated
    pub fn end(&self) -> f64 {
        self.start + self.duration as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn note_envelope_shape() {
        let duration = 1.0;
        let env = Envelope::for_note(duration);
        assert_eq!(env.level(0.0, duration), 0.0);
        // Peak at the end of the attack stage
        let peak = env.level(ATTACK_RATIO * duration - 1e-5, duration);
        assert!(peak > 0.99, "peak was {}", peak);
        // Holding sustain in the middle
        assert!((env.level(0.5, duration) - SUSTAIN_LEVEL).abs() < 1e-5);
        // Releasing toward zero at the end
        assert!(env.level(0.99, duration) < 0.1);
        assert_eq!(env.level(1.0, duration), 0.0);
    }

    #[test]
    fn stage_ratios_are_within_bounds() {
        assert!((0.005..=0.01).contains(&ATTACK_RATIO));
        assert!((0.02..=0.05).contains(&DECAY_RATIO));
        assert!((0.05..=0.10).contains(&RELEASE_RATIO));
    }

    #[test]
    fn struck_envelope_decays() {
        let env = Envelope::struck(0.2, 5.0);
        assert!((env.level(0.0, 0.2) - 1.0).abs() < 1e-6);
        assert!(env.level(0.1, 0.2) < env.level(0.05, 0.2));
        assert!(env.level(0.199, 0.2) < 0.01);
    }

    #[test]
    fn sweep_endpoints() {
        let sweep = Sweep::new(150.0, 40.0);
        assert!((sweep.at(0.0) - 150.0).abs() < 1e-3);
        assert!((sweep.at(1.0) - 40.0).abs() < 1e-3);
        assert!(sweep.is_falling());
        assert!(Sweep::new(6000.0, 9000.0).is_rising());
        assert_eq!(Sweep::fixed(220.0).at(0.7), 220.0);
    }

    #[test]
    fn waveforms_stay_in_range() {
        for waveform in [
            Waveform::Sine,
            Waveform::Square,
            Waveform::Triangle,
            Waveform::Sawtooth,
        ] {
            for i in 0..100 {
                let s = waveform.sample(i as f32 / 100.0);
                assert!((-1.0..=1.0).contains(&s), "{} gave {}", waveform.name(), s);
            }
        }
    }
}
