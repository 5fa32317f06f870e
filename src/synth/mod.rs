pub mod drums;
pub mod effects;
pub mod notes;
pub mod oscillator;
pub mod primitives;
pub mod voice;

pub use drums::{DrumHit, DrumKind};
pub use effects::SoundKind;
pub use notes::{freq_to_midi, midi_to_freq, note_name};
pub use oscillator::VoiceState;
pub use primitives::{arpeggio_speed, arpeggio_voices, drum_voice, note_voice};
pub use voice::{Envelope, Sweep, Voice, VoiceId, Waveform};
