//! Synthesis primitives: pure constructors turning sequencer events into voices.
//!
//! Nothing here touches an output. The engine stamps ids on the returned voices,
//! applies bus weighting and hands them to whatever output is connected.

use crate::audio::Bus;

use super::drums::{DrumHit, DrumKind};
use super::voice::{Envelope, Sweep, Voice, Waveform};

/// Peak gain of a sequenced note before bus weighting
pub const NOTE_PEAK: f32 = 0.8;

/// Tempo at which arpeggio notes fill their whole slot
pub const ARP_REFERENCE_TEMPO: f32 = 140.0;

/// Shortest arpeggio note as a fraction of its slot
pub const ARP_MIN_SPEED: f32 = 0.35;

/// A sustained note lasting `duration_steps` sequencer steps
pub fn note_voice(
    freq: f32,
    duration_steps: f32,
    step_secs: f32,
    bus: Bus,
    waveform: Waveform,
    at: f64,
) -> Voice {
    let duration = (duration_steps * step_secs).max(0.0);
    Voice::new(
        bus,
        waveform,
        Sweep::fixed(freq),
        Envelope::for_note(duration),
        NOTE_PEAK,
        at,
        duration,
    )
}

/// One percussive hit
pub fn drum_voice(kind: DrumKind, hit: DrumHit, at: f64) -> Voice {
    kind.voice(hit, at)
}

/// Length multiplier for arpeggio notes at `tempo` (1.0 = fill the slot)
pub fn arpeggio_speed(tempo: f32) -> f32 {
    if tempo <= 0.0 {
        return 1.0;
    }
    (ARP_REFERENCE_TEMPO / tempo).clamp(ARP_MIN_SPEED, 1.0)
}

/// A chord played as a fast burst.
///
/// The event's span is divided evenly between `freqs`; `speed` (see
/// [`arpeggio_speed`]) compresses both note length and spacing so bursts get
/// quicker as the tempo rises.
pub fn arpeggio_voices(
    freqs: &[f32],
    duration_steps: f32,
    step_secs: f32,
    bus: Bus,
    waveform: Waveform,
    at: f64,
    speed: f32,
) -> Vec<Voice> {
    if freqs.is_empty() {
        return Vec::new();
    }
    let span = (duration_steps * step_secs).max(0.0);
    let slot = span / freqs.len() as f32 * speed.clamp(ARP_MIN_SPEED, 1.0);

    freqs
        .iter()
        .enumerate()
        .map(|(i, &freq)| {
            Voice::new(
                bus,
                waveform,
                Sweep::fixed(freq),
                Envelope::for_note(slot),
                NOTE_PEAK,
                at + (i as f32 * slot) as f64,
                slot,
            )
        })
        .collect()
}
