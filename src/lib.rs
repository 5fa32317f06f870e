//! Adaptive procedural soundtrack engine.
//!
//! A synthesized 16-step sequencer whose tempo and pattern choice follow game
//! difficulty, score and discrete gameplay events. Hosts drive it through
//! [`engine::SoundEngine`] and hand it an [`audio::AudioOutput`] to render on.

pub mod audio;
pub mod command;
pub mod engine;
pub mod event;
pub mod prefs;
pub mod sequencer;
pub mod synth;
pub mod ui;
