use serde::{Deserialize, Serialize};

use crate::audio::Bus;

use super::voice::{Envelope, Sweep, Voice, Waveform};

/// One-shot effect catalog
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SoundKind {
    Shoot,
    Collect,
    EnemyKilled,
    Explosion,
    PowerUpRapidFire,
    PowerUpShield,
    PowerUpSpeed,
    PowerUpMultiShot,
    PowerUpExpire,
    LevelUp,
    Hit,
    Default,
}

/// How a tone's amplitude evolves
#[derive(Debug, Clone, Copy, PartialEq)]
enum Shape {
    Held,
    Struck,
}

/// A single tone inside an effect recipe
#[derive(Debug, Clone, Copy)]
struct Tone {
    waveform: Waveform,
    from: f32,
    to: f32,
    offset: f32,
    duration: f32,
    peak: f32,
    shape: Shape,
}

const fn tone(waveform: Waveform, from: f32, to: f32, offset: f32, duration: f32, peak: f32, shape: Shape) -> Tone {
    Tone {
        waveform,
        from,
        to,
        offset,
        duration,
        peak,
        shape,
    }
}

use Shape::{Held, Struck};
use Waveform::{Sawtooth, Sine, Square, Triangle};

const SHOOT: &[Tone] = &[tone(Square, 880.0, 220.0, 0.0, 0.08, 0.3, Struck)];
const COLLECT: &[Tone] = &[
    tone(Square, 988.0, 988.0, 0.0, 0.06, 0.3, Held),
    tone(Square, 1319.0, 1319.0, 0.06, 0.09, 0.3, Held),
];
const ENEMY_KILLED: &[Tone] = &[tone(Sawtooth, 440.0, 110.0, 0.0, 0.15, 0.35, Struck)];
const EXPLOSION: &[Tone] = &[
    tone(Sawtooth, 120.0, 30.0, 0.0, 0.3, 0.5, Struck),
    tone(Square, 60.0, 25.0, 0.0, 0.25, 0.3, Struck),
];
const POWER_UP_RAPID_FIRE: &[Tone] = &[
    tone(Square, 523.0, 523.0, 0.0, 0.05, 0.3, Held),
    tone(Square, 659.0, 659.0, 0.05, 0.05, 0.3, Held),
    tone(Square, 784.0, 784.0, 0.10, 0.08, 0.3, Held),
];
const POWER_UP_SHIELD: &[Tone] = &[tone(Triangle, 220.0, 880.0, 0.0, 0.25, 0.45, Held)];
const POWER_UP_SPEED: &[Tone] = &[tone(Sawtooth, 330.0, 1320.0, 0.0, 0.18, 0.3, Held)];
const POWER_UP_MULTI_SHOT: &[Tone] = &[
    tone(Square, 440.0, 440.0, 0.0, 0.04, 0.3, Held),
    tone(Square, 554.0, 554.0, 0.04, 0.04, 0.3, Held),
    tone(Square, 659.0, 659.0, 0.08, 0.04, 0.3, Held),
    tone(Square, 880.0, 880.0, 0.12, 0.08, 0.3, Held),
];
const POWER_UP_EXPIRE: &[Tone] = &[
    tone(Square, 880.0, 440.0, 0.0, 0.08, 0.3, Held),
    tone(Square, 880.0, 440.0, 0.12, 0.08, 0.3, Held),
];
const LEVEL_UP: &[Tone] = &[
    tone(Square, 523.0, 523.0, 0.0, 0.06, 0.35, Held),
    tone(Square, 659.0, 659.0, 0.06, 0.06, 0.35, Held),
    tone(Square, 784.0, 784.0, 0.12, 0.06, 0.35, Held),
    tone(Square, 1047.0, 1047.0, 0.18, 0.1, 0.4, Held),
];
const HIT: &[Tone] = &[tone(Sawtooth, 200.0, 60.0, 0.0, 0.12, 0.45, Struck)];
const DEFAULT: &[Tone] = &[tone(Sine, 440.0, 440.0, 0.0, 0.1, 0.3, Held)];

impl SoundKind {
    pub const ALL: [SoundKind; 12] = [
        SoundKind::Shoot,
        SoundKind::Collect,
        SoundKind::EnemyKilled,
        SoundKind::Explosion,
        SoundKind::PowerUpRapidFire,
        SoundKind::PowerUpShield,
        SoundKind::PowerUpSpeed,
        SoundKind::PowerUpMultiShot,
        SoundKind::PowerUpExpire,
        SoundKind::LevelUp,
        SoundKind::Hit,
        SoundKind::Default,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            SoundKind::Shoot => "shoot",
            SoundKind::Collect => "collect",
            SoundKind::EnemyKilled => "enemyKilled",
            SoundKind::Explosion => "explosion",
            SoundKind::PowerUpRapidFire => "powerUpRapidFire",
            SoundKind::PowerUpShield => "powerUpShield",
            SoundKind::PowerUpSpeed => "powerUpSpeed",
            SoundKind::PowerUpMultiShot => "powerUpMultiShot",
            SoundKind::PowerUpExpire => "powerUpExpire",
            SoundKind::LevelUp => "levelUp",
            SoundKind::Hit => "hit",
            SoundKind::Default => "default",
        }
    }

    /// Unknown names resolve to the default blip
    pub fn from_name(name: &str) -> SoundKind {
        SoundKind::ALL
            .iter()
            .copied()
            .find(|kind| kind.name() == name)
            .unwrap_or(SoundKind::Default)
    }

    fn recipe(&self) -> &'static [Tone] {
        match self {
            SoundKind::Shoot => SHOOT,
            SoundKind::Collect => COLLECT,
            SoundKind::EnemyKilled => ENEMY_KILLED,
            SoundKind::Explosion => EXPLOSION,
            SoundKind::PowerUpRapidFire => POWER_UP_RAPID_FIRE,
            SoundKind::PowerUpShield => POWER_UP_SHIELD,
            SoundKind::PowerUpSpeed => POWER_UP_SPEED,
            SoundKind::PowerUpMultiShot => POWER_UP_MULTI_SHOT,
            SoundKind::PowerUpExpire => POWER_UP_EXPIRE,
            SoundKind::LevelUp => LEVEL_UP,
            SoundKind::Hit => HIT,
            SoundKind::Default => DEFAULT,
        }
    }

    /// Total length of the effect in seconds
    pub fn length(&self) -> f32 {
        self.recipe()
            .iter()
            .map(|t| t.offset + t.duration)
            .fold(0.0, f32::max)
    }

    /// Voices for this effect starting at `at`, routed to the effects bus
    pub fn voices(&self, at: f64) -> Vec<Voice> {
        self.recipe()
            .iter()
            .map(|t| {
                let envelope = match t.shape {
                    Held => Envelope::for_note(t.duration),
                    Struck => Envelope::struck(t.duration, 6.0),
                };
                Voice::new(
                    Bus::Effects,
                    t.waveform,
                    Sweep::new(t.from, t.to),
                    envelope,
                    t.peak,
                    at + t.offset as f64,
                    t.duration,
                )
            })
            .collect()
    }
}
