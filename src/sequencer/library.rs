use std::fs;
use std::path::Path;

use crate::synth::notes::*;
use crate::synth::{midi_to_freq, DrumKind};

use super::pattern::{ArpeggioEvent, DrumEvent, NoteEvent, Pattern, PatternError};

/// The ordered pattern catalog, calmest first
#[derive(Debug, Clone)]
pub struct PatternLibrary {
    patterns: Vec<Pattern>,
}

impl PatternLibrary {
    /// Build a library from already composed patterns, validating each one
    pub fn from_patterns(patterns: Vec<Pattern>) -> Result<Self, PatternError> {
        if patterns.is_empty() {
            return Err(PatternError::EmptyCatalog);
        }
        for pattern in &patterns {
            pattern.validate()?;
        }
        Ok(Self { patterns })
    }

    /// Load a catalog from a JSON array of patterns
    pub fn load(path: &Path) -> Result<Self, PatternError> {
        let json = fs::read_to_string(path)?;
        let patterns: Vec<Pattern> = serde_json::from_str(&json)?;
        let library = Self::from_patterns(patterns)?;
        tracing::info!(
            "Loaded {} patterns from {}",
            library.len(),
            path.display()
        );
        Ok(library)
    }

    /// The six hand-composed patterns, rising in register and density
    pub fn builtin() -> Self {
        let patterns = vec![drift(), pulse(), climb(), surge(), rush(), frenzy()];
        debug_assert!(patterns.iter().all(|p| p.validate().is_ok()));
        Self { patterns }
    }

    /// Pattern at `index`, clamped to the last one
    pub fn get(&self, index: usize) -> &Pattern {
        &self.patterns[index.min(self.patterns.len() - 1)]
    }

    pub fn len(&self) -> usize {
        self.patterns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    pub fn patterns(&self) -> &[Pattern] {
        &self.patterns
    }
}

impl Default for PatternLibrary {
    fn default() -> Self {
        Self::builtin()
    }
}

fn notes(events: &[(u8, usize, f32)]) -> Vec<NoteEvent> {
    events
        .iter()
        .map(|&(note, start, duration)| NoteEvent {
            freq: midi_to_freq(note),
            start,
            duration,
        })
        .collect()
}

/// Lead line with one note every `spacing` steps
fn line(notes_in_order: &[u8], spacing: usize, duration: f32) -> Vec<NoteEvent> {
    notes_in_order
        .iter()
        .enumerate()
        .map(|(i, &note)| NoteEvent {
            freq: midi_to_freq(note),
            start: i * spacing,
            duration,
        })
        .collect()
}

fn drums(kinds: &[(DrumKind, usize)]) -> Vec<DrumEvent> {
    kinds
        .iter()
        .map(|&(kind, start)| DrumEvent { kind, start })
        .collect()
}

/// Sixteen hits, one per step, from a compact string (k = kick, s = snare, h = hihat)
fn drum_line(hits: &str) -> Vec<DrumEvent> {
    hits.chars()
        .enumerate()
        .filter_map(|(start, c)| {
            let kind = match c {
                'k' => DrumKind::Kick,
                's' => DrumKind::Snare,
                'h' => DrumKind::HiHat,
                _ => return None,
            };
            Some(DrumEvent { kind, start })
        })
        .collect()
}

fn arps(chords: &[(&[u8], usize, f32)]) -> Vec<ArpeggioEvent> {
    chords
        .iter()
        .map(|&(chord, start, duration)| ArpeggioEvent {
            freqs: chord.iter().map(|&n| midi_to_freq(n)).collect(),
            start,
            duration,
        })
        .collect()
}

fn drift() -> Pattern {
    Pattern {
        lead: line(&[C4, E4, G4, E4], 4, 4.0),
        bass: notes(&[(C3, 0, 8.0), (G2, 8, 8.0)]),
        harmony: notes(&[(G3, 0, 16.0)]),
        drums: drums(&[
            (DrumKind::Kick, 0),
            (DrumKind::HiHat, 4),
            (DrumKind::Kick, 8),
            (DrumKind::HiHat, 12),
        ]),
        ..Pattern::new("drift")
    }
}

fn pulse() -> Pattern {
    Pattern {
        lead: notes(&[
            (D4, 0, 2.0),
            (F4, 2, 2.0),
            (A4, 4, 4.0),
            (G4, 8, 2.0),
            (F4, 10, 2.0),
            (E4, 12, 4.0),
        ]),
        bass: line(&[D3, D3, A2, A2], 4, 4.0),
        harmony: notes(&[(F3, 0, 8.0), (E3, 8, 8.0)]),
        drums: drum_line("k.h.s.h.k.h.s.h."),
        ..Pattern::new("pulse")
    }
}

fn climb() -> Pattern {
    Pattern {
        lead: line(&[C5, E5, G5, E5, D5, F5, A5, G5], 2, 2.0),
        bass: line(&[C3, C3, F3, G3], 4, 4.0),
        harmony: notes(&[(E4, 0, 8.0), (D4, 8, 8.0)]),
        drums: drum_line("k.h.s.h.k.k.s.h."),
        arp: arps(&[(&[C4, E4, G4], 0, 4.0), (&[F4, A4, C5], 8, 4.0)]),
        ..Pattern::new("climb")
    }
}

fn surge() -> Pattern {
    Pattern {
        lead: line(&[D5, F5, A5, B5, A5, G5, F5, E5], 2, 2.0),
        bass: line(&[E3, E3, G3, G3, A3, A3, G3, G3], 2, 2.0),
        harmony: notes(&[(G4, 0, 8.0), (A4, 8, 8.0)]),
        drums: drum_line("khhhshhhkhkhshsh"),
        arp: arps(&[(&[E4, G4, B4], 0, 4.0), (&[A4, C5, E5], 8, 4.0)]),
        ..Pattern::new("surge")
    }
}

fn rush() -> Pattern {
    let steps = [0, 1, 2, 4, 5, 6, 8, 9, 10, 12, 13, 14];
    let melody = [E5, G5, A5, C6, A5, G5, E5, G5, A5, B5, C6, D6];
    let lead = steps
        .iter()
        .zip(melody)
        .map(|(&start, note)| (note, start, 1.0))
        .collect::<Vec<_>>();

    Pattern {
        lead: notes(&lead),
        bass: line(&[A2, A3, A2, A3, F2, F3, G2, G3], 2, 2.0),
        harmony: line(&[C5, E5, A4, B4], 4, 4.0),
        drums: drum_line("khkhshkhkhkhshss"),
        arp: arps(&[
            (&[A4, C5, E5], 0, 4.0),
            (&[F4, A4, C5], 4, 4.0),
            (&[G4, B4, D5], 8, 4.0),
            (&[E4, G4, B4], 12, 4.0),
        ]),
        ..Pattern::new("rush")
    }
}

fn frenzy() -> Pattern {
    let chords: [&[u8]; 2] = [&[A4, C5, E5], &[G4, B4, D5]];
    let arp = (0..8)
        .map(|i| (chords[i % 2], i * 2, 2.0))
        .collect::<Vec<_>>();

    Pattern {
        lead: line(
            &[
                G5, A5, C6, D6, E6, D6, C6, A5, G5, A5, C6, E6, G6, E6, A6, G6,
            ],
            1,
            1.0,
        ),
        bass: line(&[A2, A3, G2, G3, F2, F3, G2, G3], 2, 2.0),
        harmony: line(&[E5, G5, C5, D5], 4, 4.0),
        drums: drum_line("kskhskkhkskhsksh"),
        arp: arps(&arp),
        ..Pattern::new("frenzy")
    }
}
