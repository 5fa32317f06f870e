/// Convert MIDI note number to frequency in Hz
/// A4 (69) = 440 Hz
pub fn midi_to_freq(note: u8) -> f32 {
    440.0 * 2.0f32.powf((note as f32 - 69.0) / 12.0)
}

/// Note name from MIDI note number (e.g., 60 -> "C4", 61 -> "C#4")
pub fn note_name(note: u8) -> String {
    let names = ["C", "C#", "D", "D#", "E", "F", "F#", "G", "G#", "A", "A#", "B"];
    let octave = (note / 12) as i32 - 1;
    format!("{}{}", names[note as usize % 12], octave)
}

/// Nearest MIDI note for a frequency (used for display only)
pub fn freq_to_midi(freq: f32) -> u8 {
    if freq <= 0.0 {
        return 0;
    }
    (69.0 + 12.0 * (freq / 440.0).log2()).round().clamp(0.0, 127.0) as u8
}

// Pitches used by the built-in catalog (A natural minor, plus a few passing tones)
pub const A2: u8 = 45;
pub const C3: u8 = 48;
pub const D3: u8 = 50;
pub const E3: u8 = 52;
pub const F3: u8 = 53;
pub const G3: u8 = 55;
pub const A3: u8 = 57;
pub const C4: u8 = 60;
pub const D4: u8 = 62;
pub const E4: u8 = 64;
pub const F4: u8 = 65;
pub const G4: u8 = 67;
pub const A4: u8 = 69;
pub const B4: u8 = 71;
pub const C5: u8 = 72;
pub const D5: u8 = 74;
pub const E5: u8 = 76;
pub const F5: u8 = 77;
pub const G5: u8 = 79;
pub const A5: u8 = 81;
pub const B5: u8 = 83;
pub const C6: u8 = 84;
pub const D6: u8 = 86;
pub const E6: u8 = 88;
pub const G6: u8 = 91;
pub const A6: u8 = 93;

// Bass register
pub const F2: u8 = 41;
pub const G2: u8 = 43;
