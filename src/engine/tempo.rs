use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::synth::DrumKind;

/// Tuning of the difficulty to tempo mapping
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TempoConfig {
    pub max_tempo: f32,
    /// BPM added per difficulty level above 1
    pub difficulty_weight: f32,
    /// One BPM per this many points of score
    pub score_divisor: u64,
    /// A further BPM per this many points of score
    pub intensity_divisor: u64,
    /// Smallest change `update_difficulty` will apply
    pub epsilon: f32,
    /// Kills only accent once the tempo is above this
    pub kill_accent_threshold: f32,
    /// BPM per kill in a streak
    pub streak_step: f32,
    pub frenzy_tempo_per_tier: f32,
    pub frenzy_difficulty_per_tier: f32,
    /// Fraction of a frenzy start's boost applied on extend
    pub frenzy_extend_scale: f32,
    /// BPM shed when a frenzy ends
    pub frenzy_relax: f32,
}

impl Default for TempoConfig {
    fn default() -> Self {
        Self {
            max_tempo: 300.0,
            difficulty_weight: 25.0,
            score_divisor: 250,
            intensity_divisor: 1000,
            epsilon: 0.5,
            kill_accent_threshold: 180.0,
            streak_step: 4.0,
            frenzy_tempo_per_tier: 18.0,
            frenzy_difficulty_per_tier: 0.3,
            frenzy_extend_scale: 0.5,
            frenzy_relax: 20.0,
        }
    }
}

impl TempoConfig {
    /// Keep `tempo` inside `[base, max_tempo]`. Non-finite input falls back to `base`.
    pub fn clamp(&self, tempo: f32, base: f32) -> f32 {
        if !tempo.is_finite() {
            return base;
        }
        tempo.clamp(base, self.max_tempo.max(base))
    }

    /// Target tempo for a difficulty level and score
    pub fn difficulty_tempo(&self, base: f32, difficulty: f32, score: u64) -> f32 {
        let difficulty = if difficulty.is_finite() { difficulty } else { 1.0 };
        let score_term = score / self.score_divisor.max(1);
        let intensity_term = score / self.intensity_divisor.max(1);
        let tempo = base
            + (difficulty - 1.0) * self.difficulty_weight
            + score_term as f32
            + intensity_term as f32;
        self.clamp(tempo, base)
    }

    /// React to a discrete gameplay moment.
    ///
    /// `scaling` is false for tracks whose tempo never moves; accents still fire.
    pub fn respond(
        &self,
        event: GameEvent,
        tempo: f32,
        difficulty: f32,
        base: f32,
        scaling: bool,
    ) -> EventResponse {
        let mut response = EventResponse {
            tempo,
            difficulty,
            accents: Vec::new(),
            fanfare: false,
        };

        match event {
            GameEvent::Kill => {
                if tempo > self.kill_accent_threshold {
                    response.accents.push(DrumKind::HiHat);
                }
            }
            GameEvent::Killstreak { streak } => {
                if scaling {
                    response.tempo = tempo + streak as f32 * self.streak_step;
                }
                response.accents = vec![DrumKind::Kick, DrumKind::Snare];
            }
            GameEvent::FrenzyStart { tier } => {
                if scaling {
                    response.tempo = tempo + tier as f32 * self.frenzy_tempo_per_tier;
                    response.difficulty =
                        difficulty + tier as f32 * self.frenzy_difficulty_per_tier;
                }
                response.accents = vec![DrumKind::Kick, DrumKind::Snare, DrumKind::HiHat];
            }
            GameEvent::FrenzyExtend { tier } => {
                if scaling {
                    let scale = tier as f32 * self.frenzy_extend_scale;
                    response.tempo = tempo + scale * self.frenzy_tempo_per_tier;
                    response.difficulty = difficulty + scale * self.frenzy_difficulty_per_tier;
                }
                response.accents = vec![DrumKind::Snare, DrumKind::HiHat];
            }
            GameEvent::FrenzyEnd => {
                if scaling {
                    response.tempo = (tempo - self.frenzy_relax).max(base);
                }
            }
            GameEvent::LevelUp => response.fanfare = true,
        }

        response.tempo = self.clamp(response.tempo, base);
        response
    }
}

/// Discrete gameplay moments the soundtrack reacts to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum GameEvent {
    Kill,
    Killstreak { streak: u32 },
    FrenzyStart { tier: u32 },
    FrenzyExtend { tier: u32 },
    FrenzyEnd,
    LevelUp,
}

impl GameEvent {
    /// Build an event from a loosely typed name and payload.
    ///
    /// Accepts `kill`, `killstreak`, `frenzy-start`, `frenzy-extend`,
    /// `frenzy-end` and `level-up` (camelCase and snake_case spellings too).
    /// Missing `streak`/`tier` fields default to 1. Unknown names give `None`.
    pub fn from_name(name: &str, payload: &Value) -> Option<GameEvent> {
        let field = |key: &str| {
            payload
                .get(key)
                .and_then(Value::as_u64)
                .map(|v| v.min(u32::MAX as u64) as u32)
                .unwrap_or(1)
        };

        let normalized: String = name
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .map(|c| c.to_ascii_lowercase())
            .collect();

        match normalized.as_str() {
            "kill" => Some(GameEvent::Kill),
            "killstreak" => Some(GameEvent::Killstreak {
                streak: field("streak"),
            }),
            "frenzystart" => Some(GameEvent::FrenzyStart {
                tier: field("tier"),
            }),
            "frenzyextend" => Some(GameEvent::FrenzyExtend {
                tier: field("tier"),
            }),
            "frenzyend" => Some(GameEvent::FrenzyEnd),
            "levelup" => Some(GameEvent::LevelUp),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            GameEvent::Kill => "kill",
            GameEvent::Killstreak { .. } => "killstreak",
            GameEvent::FrenzyStart { .. } => "frenzy-start",
            GameEvent::FrenzyExtend { .. } => "frenzy-extend",
            GameEvent::FrenzyEnd => "frenzy-end",
            GameEvent::LevelUp => "level-up",
        }
    }
}

/// What an event changes
#[derive(Debug, Clone, PartialEq)]
pub struct EventResponse {
    pub tempo: f32,
    pub difficulty: f32,
    /// Drum hits to fire right away
    pub accents: Vec<DrumKind>,
    /// Play the melodic level-up accent
    pub fanfare: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{Rng, SeedableRng};
    use rand_pcg::Pcg32;
    use serde_json::json;

    const BASE: f32 = 140.0;

    #[test]
    fn difficulty_formula() {
        let cfg = TempoConfig::default();
        assert_eq!(cfg.difficulty_tempo(BASE, 1.0, 0), 140.0);
        assert_eq!(cfg.difficulty_tempo(BASE, 2.0, 0), 165.0);
        // 999 / 250 = 3, 999 / 1000 = 0
        assert_eq!(cfg.difficulty_tempo(BASE, 1.0, 999), 143.0);
        // 2000 / 250 = 8, 2000 / 1000 = 2
        assert_eq!(cfg.difficulty_tempo(BASE, 1.0, 2000), 150.0);
        assert_eq!(cfg.difficulty_tempo(BASE, 0.0, 0), BASE);
        assert_eq!(cfg.difficulty_tempo(BASE, 50.0, 0), 300.0);
        assert_eq!(cfg.difficulty_tempo(BASE, f32::NAN, 0), BASE);
    }

    #[test]
    fn streak_tempo_is_monotonic_and_bounded() {
        let cfg = TempoConfig::default();
        let after = |streak| {
            cfg.respond(GameEvent::Killstreak { streak }, 160.0, 1.0, BASE, true)
                .tempo
        };
        for s1 in 0..120 {
            let s2 = s1 + 1;
            assert!(after(s2) >= after(s1));
            assert!(after(s2) <= cfg.max_tempo);
        }
        assert_eq!(after(u32::MAX), cfg.max_tempo);
    }

    #[test]
    fn random_event_sequences_stay_in_range() {
        let cfg = TempoConfig::default();
        let mut rng = Pcg32::seed_from_u64(3);
        let mut tempo = BASE;
        let mut difficulty = 1.0;
        for _ in 0..5000 {
            let event = match rng.random_range(0..7) {
                0 => GameEvent::Kill,
                1 => GameEvent::Killstreak {
                    streak: rng.random_range(0..50),
                },
                2 => GameEvent::FrenzyStart {
                    tier: rng.random_range(0..5),
                },
                3 => GameEvent::FrenzyExtend {
                    tier: rng.random_range(0..5),
                },
                4 => GameEvent::FrenzyEnd,
                5 => GameEvent::LevelUp,
                _ => {
                    let d = rng.random_range(-5.0..20.0);
                    tempo = cfg.difficulty_tempo(BASE, d, rng.random_range(0..100_000));
                    assert!((BASE..=cfg.max_tempo).contains(&tempo));
                    continue;
                }
            };
            let r = cfg.respond(event, tempo, difficulty, BASE, true);
            tempo = r.tempo;
            difficulty = r.difficulty;
            assert!((BASE..=cfg.max_tempo).contains(&tempo));
        }
    }

    #[test]
    fn frenzy_escalation_and_relax() {
        let cfg = TempoConfig::default();
        let start = cfg.respond(GameEvent::FrenzyStart { tier: 2 }, 140.0, 1.0, BASE, true);
        assert_eq!(start.tempo, 176.0);
        assert!((start.difficulty - 1.6).abs() < 1e-6);
        assert_eq!(start.accents.len(), 3);

        let end = cfg.respond(GameEvent::FrenzyEnd, start.tempo, start.difficulty, BASE, true);
        assert_eq!(end.tempo, 156.0);

        let floor = cfg.respond(GameEvent::FrenzyEnd, 150.0, 1.0, BASE, true);
        assert_eq!(floor.tempo, BASE);
    }

    #[test]
    fn kill_accent_needs_high_tempo() {
        let cfg = TempoConfig::default();
        let slow = cfg.respond(GameEvent::Kill, 170.0, 1.0, BASE, true);
        assert!(slow.accents.is_empty());
        let fast = cfg.respond(GameEvent::Kill, 200.0, 1.0, BASE, true);
        assert_eq!(fast.accents, vec![DrumKind::HiHat]);
        assert_eq!(fast.tempo, 200.0);
    }

    #[test]
    fn fixed_tempo_tracks_keep_tempo_but_accent() {
        let cfg = TempoConfig::default();
        let r = cfg.respond(GameEvent::Killstreak { streak: 10 }, 100.0, 1.0, 100.0, false);
        assert_eq!(r.tempo, 100.0);
        assert_eq!(r.accents, vec![DrumKind::Kick, DrumKind::Snare]);
        let level = cfg.respond(GameEvent::LevelUp, 100.0, 1.0, 100.0, false);
        assert!(level.fanfare);
    }

    #[test]
    fn events_from_loose_names() {
        assert_eq!(
            GameEvent::from_name("frenzy-start", &json!({"tier": 2})),
            Some(GameEvent::FrenzyStart { tier: 2 })
        );
        assert_eq!(
            GameEvent::from_name("killstreak", &json!({"streak": 7})),
            Some(GameEvent::Killstreak { streak: 7 })
        );
        assert_eq!(
            GameEvent::from_name("frenzyExtend", &Value::Null),
            Some(GameEvent::FrenzyExtend { tier: 1 })
        );
        assert_eq!(
            GameEvent::from_name("level_up", &Value::Null),
            Some(GameEvent::LevelUp)
        );
        assert_eq!(GameEvent::from_name("boss-spawn", &Value::Null), None);
    }

    #[test]
    fn tagged_json_form() {
        let event: GameEvent =
            serde_json::from_str(r#"{"type":"frenzyStart","tier":3}"#).expect("parse");
        assert_eq!(event, GameEvent::FrenzyStart { tier: 3 });
    }
}
