use std::ops::Range;

use rand::{Rng, SeedableRng};
use rand_pcg::Pcg32;

use super::pattern::STEPS;

/// Tempo above which selection turns random within a restricted tier
pub const RANDOM_TIER_TEMPO: f32 = 180.0;

/// Steps between pattern switch opportunities at `tempo`
pub fn switch_interval(tempo: f32) -> u64 {
    if tempo < 160.0 {
        STEPS as u64
    } else if tempo < 200.0 {
        8
    } else if tempo < 240.0 {
        4
    } else {
        2
    }
}

/// Indices of the patterns eligible at `tempo` out of a pool of `len`.
///
/// Each faster tier starts further into the catalog, so a faster tier's
/// range is always contained in the slower tier's range.
pub fn eligible(tempo: f32, len: usize) -> Range<usize> {
    if len == 0 {
        return 0..0;
    }
    let start = if tempo >= 260.0 {
        len * 2 / 3
    } else if tempo >= 220.0 {
        len / 2
    } else if tempo >= RANDOM_TIER_TEMPO {
        len / 3
    } else {
        0
    };
    start.min(len - 1)..len
}

/// Owns the active pattern index and decides when to move it
pub struct PatternSelector {
    current: usize,
    rng: Pcg32,
}

impl PatternSelector {
    pub fn new() -> Self {
        Self::with_seed(rand::random::<u64>())
    }

    pub fn with_seed(seed: u64) -> Self {
        Self {
            current: 0,
            rng: Pcg32::seed_from_u64(seed),
        }
    }

    pub fn current(&self) -> usize {
        self.current
    }

    /// Back to the first pattern for a fresh playback session
    pub fn reset(&mut self) {
        self.current = 0;
    }

    /// Called for every step before it plays. Returns true when the active
    /// pattern changed.
    pub fn advance(&mut self, step_index: u64, tempo: f32, pool: usize) -> bool {
        if pool == 0 || step_index == 0 || step_index % switch_interval(tempo) != 0 {
            return false;
        }

        let previous = self.current;
        self.current = if tempo < RANDOM_TIER_TEMPO {
            (self.current + 1) % pool
        } else {
            let tier = eligible(tempo, pool);
            self.rng.random_range(tier)
        };
        self.current != previous
    }
}

impl Default for PatternSelector {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interval_shrinks_with_tempo() {
        assert_eq!(switch_interval(100.0), 16);
        assert_eq!(switch_interval(140.0), 16);
        assert_eq!(switch_interval(170.0), 8);
        assert_eq!(switch_interval(210.0), 4);
        assert_eq!(switch_interval(300.0), 2);

        let tempos = [60.0, 159.0, 160.0, 199.0, 200.0, 239.0, 240.0, 300.0];
        for pair in tempos.windows(2) {
            assert!(switch_interval(pair[1]) <= switch_interval(pair[0]));
        }
    }

    #[test]
    fn faster_tiers_are_subsets_of_slower_ones() {
        for len in 1..=12 {
            let mut previous = eligible(0.0, len);
            for tempo in [180.0, 220.0, 260.0, 300.0] {
                let tier = eligible(tempo, len);
                assert!(!tier.is_empty());
                assert!(tier.start >= previous.start && tier.end <= previous.end);
                previous = tier;
            }
        }
        assert_eq!(eligible(200.0, 6), 2..6);
        assert_eq!(eligible(230.0, 6), 3..6);
        assert_eq!(eligible(280.0, 6), 4..6);
    }

    #[test]
    fn slow_tempo_cycles_in_order() {
        let mut selector = PatternSelector::with_seed(1);
        let mut seen = vec![selector.current()];
        for step in 1..=(16 * 6) {
            if selector.advance(step, 140.0, 6) {
                seen.push(selector.current());
            }
        }
        assert_eq!(seen, vec![0, 1, 2, 3, 4, 5, 0]);
    }

    #[test]
    fn only_switches_on_interval_boundaries() {
        let mut selector = PatternSelector::with_seed(1);
        assert!(!selector.advance(0, 140.0, 6));
        assert!(!selector.advance(5, 140.0, 6));
        assert!(selector.advance(16, 140.0, 6));
        assert!(!selector.advance(4, 170.0, 6));
        assert!(selector.advance(8, 170.0, 6));
    }

    #[test]
    fn fast_tempo_stays_in_its_tier() {
        let mut selector = PatternSelector::with_seed(42);
        for step in 1..500 {
            selector.advance(step, 270.0, 6);
            if step >= 2 {
                assert!(eligible(270.0, 6).contains(&selector.current()));
            }
        }
    }

    #[test]
    fn same_seed_same_choices() {
        let mut a = PatternSelector::with_seed(9);
        let mut b = PatternSelector::with_seed(9);
        for step in 1..200 {
            a.advance(step, 250.0, 6);
            b.advance(step, 250.0, 6);
            assert_eq!(a.current(), b.current());
        }
    }
}
