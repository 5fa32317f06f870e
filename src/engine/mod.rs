//! The adaptive soundtrack engine.
//!
//! `SoundEngine` runs on the caller's thread. The host calls [`SoundEngine::pump`]
//! from its frame loop; every pump hands the steps falling inside the lookahead
//! window to the output with absolute start times. Voices then render on the
//! output's own path and terminate by themselves.

pub mod arena;
pub mod state;
pub mod tempo;

pub use arena::{LiveHandle, VoiceArena};
pub use state::{EngineState, Track};
pub use tempo::{EventResponse, GameEvent, TempoConfig};

use std::collections::VecDeque;

use anyhow::Result;
use serde_json::Value;

use crate::audio::{AudioOutput, Bus, BusWeights, ChannelBus, OutputCommand, OutputStatus};
use crate::command::Command;
use crate::prefs::{PreferenceStore, Preferences};
use crate::sequencer::{DueStep, Pattern, PatternLibrary, PatternSelector, Scheduler, STEPS};
use crate::synth::notes::{C5, C6, E5, G5};
use crate::synth::{
    arpeggio_voices, drum_voice, midi_to_freq, SoundKind, Voice, VoiceId, Waveform,
};

/// Resume attempts for a start that found the output suspended
pub const MAX_RESUME_ATTEMPTS: u32 = 5;

/// Level-up accent, played as one quick rising burst
const FANFARE: [u8; 4] = [C5, E5, G5, C6];
const FANFARE_SECS: f32 = 0.32;

/// Event accents hit a little harder than sequenced drums
const ACCENT_GAIN: f32 = 1.2;

type OutputOpener<O> = Box<dyn FnMut() -> Result<O>>;

enum OutputSlot<O> {
    Unopened,
    Ready(O),
    /// Opening failed; the engine stays silent for good
    Unavailable,
}

/// A step handed to the output that may not be sounding yet
#[derive(Debug, Clone, Copy)]
struct QueuedStep {
    at: f64,
    index: u64,
    pattern: usize,
}

/// A start waiting for a suspended output
#[derive(Debug, Clone, Copy)]
struct PendingStart {
    track: Track,
    tempo: f32,
    attempts: u32,
}

pub struct SoundEngine<O: AudioOutput> {
    opener: OutputOpener<O>,
    output: OutputSlot<O>,
    prefs: PreferenceStore,
    state: EngineState,
    tempo_config: TempoConfig,
    bus_weights: BusWeights,
    /// Music buses of the current session; empty while stopped
    buses: Vec<ChannelBus>,
    library: PatternLibrary,
    selector: PatternSelector,
    scheduler: Scheduler,
    arena: VoiceArena,
    /// Steps scheduled ahead of the output clock, oldest first
    queued: VecDeque<QueuedStep>,
    next_voice_id: VoiceId,
    pending: Option<PendingStart>,
    /// Music to bring back when unmuting
    resume_on_unmute: Option<(Track, f32)>,
}

impl<O: AudioOutput> SoundEngine<O> {
    /// Create the engine and load stored preferences. The output is not
    /// opened until [`SoundEngine::init`].
    pub fn new(opener: impl FnMut() -> Result<O> + 'static, prefs: PreferenceStore) -> Self {
        let stored = prefs.load();
        let state = EngineState {
            muted: stored.muted,
            music_volume: stored.music_volume,
            sfx_volume: stored.sfx_volume,
            ..EngineState::default()
        };

        Self {
            opener: Box::new(opener),
            output: OutputSlot::Unopened,
            prefs,
            state,
            tempo_config: TempoConfig::default(),
            bus_weights: BusWeights::default(),
            buses: Vec::new(),
            library: PatternLibrary::builtin(),
            selector: PatternSelector::new(),
            scheduler: Scheduler::new(),
            arena: VoiceArena::new(),
            queued: VecDeque::new(),
            next_voice_id: 1,
            pending: None,
            resume_on_unmute: None,
        }
    }

    pub fn with_library(mut self, library: PatternLibrary) -> Self {
        self.library = library;
        self
    }

    pub fn with_tempo_config(mut self, config: TempoConfig) -> Self {
        self.tempo_config = config;
        self
    }

    pub fn with_bus_weights(mut self, weights: BusWeights) -> Self {
        self.bus_weights = weights;
        self
    }

    /// Make random pattern choices reproducible
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.selector = PatternSelector::with_seed(seed);
        self
    }

    /// Open the output on first use. Returns whether audio is usable.
    pub fn init(&mut self) -> bool {
        match self.output {
            OutputSlot::Ready(_) => return true,
            OutputSlot::Unavailable => return false,
            OutputSlot::Unopened => {}
        }

        match (self.opener)() {
            Ok(mut output) => {
                output.send(OutputCommand::SetMusicVolume(self.state.music_volume));
                output.send(OutputCommand::SetSfxVolume(self.state.sfx_volume));
                self.output = OutputSlot::Ready(output);
                true
            }
            Err(e) => {
                tracing::warn!("Audio output unavailable, continuing without sound: {:#}", e);
                self.output = OutputSlot::Unavailable;
                false
            }
        }
    }

    /// Begin continuous playback of `track`. No-op while muted or already playing.
    pub fn start_music(&mut self, track: Track, difficulty: f32) {
        if self.state.muted {
            tracing::debug!("Muted, not starting {} music", track.name());
            return;
        }
        if self.state.music_playing || self.pending.is_some() {
            tracing::debug!("Music already active, ignoring start");
            return;
        }
        if !self.init() {
            return;
        }

        let difficulty = if difficulty.is_finite() { difficulty } else { 1.0 };
        let base = track.base_tempo();
        let tempo = if track.tempo_scaling() {
            self.tempo_config.difficulty_tempo(base, difficulty, 0)
        } else {
            base
        };
        self.state.game_difficulty = difficulty;
        self.start_at(track, tempo);
    }

    fn start_at(&mut self, track: Track, tempo: f32) {
        let OutputSlot::Ready(output) = &mut self.output else {
            return;
        };
        if output.status() == OutputStatus::Suspended {
            if let Err(e) = output.resume() {
                tracing::debug!("Output resume failed: {:#}", e);
            }
        }

        if output.status() == OutputStatus::Running {
            self.begin_playback(track, tempo);
        } else {
            tracing::info!(
                "Audio output suspended, {} music will start once it resumes",
                track.name()
            );
            self.pending = Some(PendingStart {
                track,
                tempo,
                attempts: 1,
            });
        }
    }

    fn begin_playback(&mut self, track: Track, tempo: f32) {
        let OutputSlot::Ready(output) = &mut self.output else {
            return;
        };
        let now = output.now();
        output.send(OutputCommand::OpenBuses);

        self.buses = ChannelBus::session(&self.bus_weights);
        self.selector.reset();
        self.queued.clear();
        self.scheduler.start(now);
        self.state.music_playing = true;
        self.state.track = track;
        self.state.current_tempo = tempo;
        self.state.current_pattern_index = 0;
        self.state.step_index = 0;

        tracing::info!("Music started: {} track at {:.0} BPM", track.name(), tempo);
        self.schedule_due();
    }

    /// Halt playback and dispose every live voice. Safe to call at any time.
    /// Music stopped this way stays stopped across a later unmute.
    pub fn stop_music(&mut self) {
        self.resume_on_unmute = None;
        self.teardown();
    }

    fn teardown(&mut self) {
        self.pending = None;
        self.scheduler.stop();
        self.queued.clear();
        let ids = self.arena.drain_all();

        if let OutputSlot::Ready(output) = &mut self.output {
            if !ids.is_empty() {
                output.send(OutputCommand::Release(ids));
            }
            if !self.buses.is_empty() {
                output.send(OutputCommand::CloseBuses);
            }
        }
        self.buses.clear();

        if self.state.music_playing {
            self.state.music_playing = false;
            tracing::info!("Music stopped");
        }
    }

    /// Advance the timeline: retry a pending start, then schedule every step
    /// due within the lookahead window.
    pub fn pump(&mut self) {
        if let OutputSlot::Ready(output) = &mut self.output {
            output.flush();
        }
        if self.pending.is_some() {
            self.retry_pending();
        }
        if self.state.music_playing {
            self.schedule_due();
        }
    }

    fn retry_pending(&mut self) {
        let Some(mut pending) = self.pending.take() else {
            return;
        };
        let OutputSlot::Ready(output) = &mut self.output else {
            return;
        };

        if let Err(e) = output.resume() {
            tracing::debug!("Output resume failed: {:#}", e);
        }
        if output.status() == OutputStatus::Running {
            self.begin_playback(pending.track, pending.tempo);
            return;
        }

        pending.attempts += 1;
        if pending.attempts >= MAX_RESUME_ATTEMPTS {
            tracing::warn!(
                "Audio output did not resume after {} attempts, dropping {} music",
                pending.attempts,
                pending.track.name()
            );
        } else {
            self.pending = Some(pending);
        }
    }

    fn schedule_due(&mut self) {
        let now = match &self.output {
            OutputSlot::Ready(output) => output.now(),
            _ => return,
        };
        self.arena.prune(now);

        while self.state.music_playing {
            let Some(due) = self.scheduler.next_due(now, self.state.current_tempo) else {
                break;
            };
            self.play_step(due);
        }
        self.advance_playhead(now);
    }

    /// Report the latest queued step that has started sounding
    fn advance_playhead(&mut self, now: f64) {
        while let Some(step) = self.queued.front().copied() {
            if step.at > now {
                break;
            }
            self.queued.pop_front();
            self.state.step_index = step.index;
            self.state.current_pattern_index = step.pattern;
        }
    }

    fn play_step(&mut self, due: DueStep) {
        let tempo = self.state.current_tempo;
        let pool = self.state.track.pattern_pool(self.library.len());
        let previous = self.selector.current();
        if self.selector.advance(due.index, tempo, pool) {
            tracing::debug!(
                "Pattern {} -> {} at step {} ({:.0} BPM)",
                previous,
                self.selector.current(),
                due.index,
                tempo
            );
        }
        let pattern = self.selector.current();
        self.queued.push_back(QueuedStep {
            at: due.at,
            index: due.index,
            pattern,
        });

        let voices = self.library.get(pattern).voices_at(
            due.position(STEPS),
            due.at,
            due.duration as f32,
            tempo,
        );
        for voice in voices {
            self.schedule_music(voice);
        }
    }

    /// Weight a music voice by its bus, track it and hand it to the output
    fn schedule_music(&mut self, mut voice: Voice) {
        let Some(weight) = self
            .buses
            .iter()
            .find(|b| b.bus == voice.bus)
            .map(|b| b.gain_weight)
        else {
            return;
        };
        let OutputSlot::Ready(output) = &mut self.output else {
            return;
        };

        voice.peak *= weight;
        voice.id = self.next_voice_id;
        self.next_voice_id += 1;
        self.arena.insert(voice.id, voice.end());
        output.send(OutputCommand::Play(voice));
    }

    /// Recompute tempo from a difficulty level and score
    pub fn update_difficulty(&mut self, difficulty: f32, score: u64) {
        if !self.state.music_playing || !self.state.track.tempo_scaling() {
            return;
        }
        if difficulty.is_finite() {
            self.state.game_difficulty = difficulty;
        }

        let base = self.state.track.base_tempo();
        let target = self.tempo_config.difficulty_tempo(base, difficulty, score);
        if (target - self.state.current_tempo).abs() > self.tempo_config.epsilon {
            tracing::debug!(
                "Tempo {:.1} -> {:.1} BPM",
                self.state.current_tempo,
                target
            );
            self.state.current_tempo = target;
        }
    }

    /// Apply tempo bumps and accents for a gameplay moment
    pub fn sync_with_game_event(&mut self, event: GameEvent) {
        if !self.state.music_playing {
            tracing::debug!("Ignoring {} while music is stopped", event.name());
            return;
        }

        let track = self.state.track;
        let response = self.tempo_config.respond(
            event,
            self.state.current_tempo,
            self.state.game_difficulty,
            track.base_tempo(),
            track.tempo_scaling(),
        );
        if response.tempo != self.state.current_tempo {
            tracing::debug!(
                "{}: tempo {:.1} -> {:.1} BPM",
                event.name(),
                self.state.current_tempo,
                response.tempo
            );
        }
        self.state.current_tempo = response.tempo;
        self.state.game_difficulty = response.difficulty;

        let now = match &self.output {
            OutputSlot::Ready(output) => output.now(),
            _ => return,
        };
        for kind in response.accents {
            self.schedule_music(drum_voice(kind, kind.default_hit().louder(ACCENT_GAIN), now));
        }
        if response.fanfare {
            let freqs: Vec<f32> = FANFARE.iter().map(|&n| midi_to_freq(n)).collect();
            let voices =
                arpeggio_voices(&freqs, 1.0, FANFARE_SECS, Bus::Lead, Waveform::Square, now, 1.0);
            for voice in voices {
                self.schedule_music(voice);
            }
        }
    }

    /// Like [`SoundEngine::sync_with_game_event`] for loosely typed callers.
    /// Unknown event names are ignored.
    pub fn sync_named_event(&mut self, name: &str, payload: &Value) {
        match GameEvent::from_name(name, payload) {
            Some(event) => self.sync_with_game_event(event),
            None => tracing::debug!("Ignoring unknown game event '{}'", name),
        }
    }

    /// [`SoundEngine::start_music`] by track name; unknown names play gameplay
    pub fn start_music_named(&mut self, track: &str, difficulty: f32) {
        self.start_music(Track::from_name(track), difficulty);
    }

    /// [`SoundEngine::play_sound`] by kind name; unknown names play the default blip
    pub fn play_sound_named(&mut self, kind: &str) {
        self.play_sound(SoundKind::from_name(kind));
    }

    /// Fire a one-shot effect, independent of the sequencer
    pub fn play_sound(&mut self, kind: SoundKind) {
        if self.state.muted || !self.init() {
            return;
        }
        let OutputSlot::Ready(output) = &mut self.output else {
            return;
        };
        if output.status() == OutputStatus::Suspended {
            if let Err(e) = output.resume() {
                tracing::debug!("Output resume failed: {:#}", e);
            }
            if output.status() != OutputStatus::Running {
                tracing::debug!("Output suspended, dropping {}", kind.name());
                return;
            }
        }

        let now = output.now();
        for mut voice in kind.voices(now) {
            voice.id = self.next_voice_id;
            self.next_voice_id += 1;
            output.send(OutputCommand::Play(voice));
        }
    }

    pub fn set_music_volume(&mut self, volume: f32) {
        if !volume.is_finite() {
            return;
        }
        let volume = volume.clamp(0.0, 1.0);
        self.state.music_volume = volume;
        if let OutputSlot::Ready(output) = &mut self.output {
            output.send(OutputCommand::SetMusicVolume(volume));
        }
        self.save_prefs();
    }

    pub fn set_sfx_volume(&mut self, volume: f32) {
        if !volume.is_finite() {
            return;
        }
        let volume = volume.clamp(0.0, 1.0);
        self.state.sfx_volume = volume;
        if let OutputSlot::Ready(output) = &mut self.output {
            output.send(OutputCommand::SetSfxVolume(volume));
        }
        self.save_prefs();
    }

    /// Flip mute. Muting stops the music; unmuting restarts it from step 0
    /// at the last tempo if it was playing when muted.
    pub fn toggle_mute(&mut self) {
        if self.state.muted {
            self.state.muted = false;
            tracing::info!("Unmuted");
            if let Some((track, tempo)) = self.resume_on_unmute.take() {
                self.start_at(track, tempo);
            }
        } else {
            self.resume_on_unmute = if self.state.music_playing {
                Some((self.state.track, self.state.current_tempo))
            } else {
                self.pending.map(|p| (p.track, p.tempo))
            };
            self.state.muted = true;
            self.teardown();
            tracing::info!("Muted");
        }
        self.save_prefs();
    }

    /// Route a command to the matching call
    pub fn dispatch(&mut self, command: Command) {
        match command {
            Command::Init => {
                self.init();
            }
            Command::StartMusic { track, difficulty } => self.start_music(track, difficulty),
            Command::StopMusic => self.stop_music(),
            Command::UpdateDifficulty { difficulty, score } => {
                self.update_difficulty(difficulty, score)
            }
            Command::GameEvent(event) => self.sync_with_game_event(event),
            Command::PlaySound(kind) => self.play_sound(kind),
            Command::SetMusicVolume(v) => self.set_music_volume(v),
            Command::SetSfxVolume(v) => self.set_sfx_volume(v),
            Command::ToggleMute => self.toggle_mute(),
        }
    }

    fn save_prefs(&mut self) {
        let prefs = Preferences {
            muted: self.state.muted,
            music_volume: self.state.music_volume,
            sfx_volume: self.state.sfx_volume,
        };
        self.prefs.save(&prefs);
    }

    pub fn state(&self) -> &EngineState {
        &self.state
    }

    pub fn is_playing(&self) -> bool {
        self.state.music_playing
    }

    pub fn is_muted(&self) -> bool {
        self.state.muted
    }

    pub fn tempo(&self) -> f32 {
        self.state.current_tempo
    }

    /// A start is waiting for the output to resume
    pub fn is_start_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// Whether the output has been opened successfully
    pub fn is_available(&self) -> bool {
        matches!(self.output, OutputSlot::Ready(_))
    }

    pub fn live_handle_count(&self) -> usize {
        self.arena.len()
    }

    pub fn library(&self) -> &PatternLibrary {
        &self.library
    }

    pub fn current_pattern(&self) -> &Pattern {
        self.library.get(self.state.current_pattern_index)
    }

    pub fn tempo_config(&self) -> &TempoConfig {
        &self.tempo_config
    }

    pub fn output(&self) -> Option<&O> {
        match &self.output {
            OutputSlot::Ready(output) => Some(output),
            _ => None,
        }
    }

    pub fn output_mut(&mut self) -> Option<&mut O> {
        match &mut self.output {
            OutputSlot::Ready(output) => Some(output),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;
    use std::rc::Rc;

    use super::*;
    use crate::audio::OfflineOutput;
    use crate::prefs::FileBackend;
    use crate::sequencer::{eligible, step_duration};
    use crate::synth::primitives::NOTE_PEAK;

    const FRAME: f64 = 1.0 / 60.0;

    fn engine() -> SoundEngine<OfflineOutput> {
        SoundEngine::new(|| Ok(OfflineOutput::new(8000.0)), PreferenceStore::in_memory())
            .with_seed(1)
    }

    /// Pump like a 60 fps game loop while the output renders
    fn run_offline(engine: &mut SoundEngine<OfflineOutput>, seconds: f64) {
        let frames = (seconds / FRAME).round() as usize;
        for _ in 0..frames {
            engine.pump();
            if let Some(output) = engine.output_mut() {
                output.advance(FRAME);
            }
        }
    }

    fn played(engine: &SoundEngine<OfflineOutput>) -> &[Voice] {
        engine.output().expect("output open").played()
    }

    /// Output that stays suspended until resumed `ready_after` times
    struct SlowOutput {
        inner: OfflineOutput,
        resumes: u32,
        ready_after: u32,
    }

    impl SlowOutput {
        fn new(ready_after: u32) -> Self {
            Self {
                inner: OfflineOutput::new(8000.0),
                resumes: 0,
                ready_after,
            }
        }
    }

    impl AudioOutput for SlowOutput {
        fn status(&self) -> OutputStatus {
            if self.resumes >= self.ready_after {
                OutputStatus::Running
            } else {
                OutputStatus::Suspended
            }
        }

        fn resume(&mut self) -> Result<()> {
            self.resumes += 1;
            if self.resumes >= self.ready_after {
                Ok(())
            } else {
                Err(anyhow::anyhow!("blocked by autoplay policy"))
            }
        }

        fn now(&self) -> f64 {
            self.inner.now()
        }

        fn send(&mut self, cmd: OutputCommand) {
            self.inner.send(cmd);
        }
    }

    #[test]
    fn cold_start_then_first_step() {
        let mut e = engine();
        assert!(!e.is_playing());
        assert!(e.output().is_none());

        assert!(e.init());
        e.pump();
        assert!(played(&e).is_empty());
        assert!(!e.is_playing());

        e.start_music(Track::Gameplay, 1.0);
        assert!(e.is_playing());
        assert_eq!(e.tempo(), 140.0);
        assert_eq!(e.state().current_pattern_index, 0);
        assert_eq!(e.state().step_index, 0);

        // Step 0 of the first pattern: lead, bass, harmony and a kick, all at t=0
        let first = played(&e).to_vec();
        assert_eq!(first.len(), 4);
        assert!(first.iter().all(|v| v.start == 0.0 && v.bus.is_music()));

        run_offline(&mut e, 0.5);
        let step4 = 4.0 * step_duration(140.0);
        assert!(played(&e)
            .iter()
            .any(|v| (v.start - step4).abs() < 1e-9 && v.bus == Bus::Percussion));
        assert!(e.live_handle_count() > 0);
    }

    #[test]
    fn second_start_is_ignored() {
        let mut e = engine();
        e.start_music(Track::Gameplay, 1.0);
        let count = played(&e).len();
        e.start_music(Track::Gameplay, 5.0);
        assert_eq!(played(&e).len(), count);
        assert_eq!(e.tempo(), 140.0);
    }

    #[test]
    fn stop_is_idempotent() {
        let mut e = engine();
        e.start_music(Track::Gameplay, 1.0);
        run_offline(&mut e, 0.3);

        e.stop_music();
        assert!(!e.is_playing());
        assert_eq!(e.live_handle_count(), 0);
        assert!(!e.state().music_playing);
        let output = e.output().expect("output open");
        assert_eq!(output.active_voices(), 0);
        let count = output.played().len();

        e.stop_music();
        assert!(!e.is_playing());
        assert_eq!(e.live_handle_count(), 0);
        run_offline(&mut e, 0.5);
        assert_eq!(played(&e).len(), count);

        // Never opened: still fine
        let mut fresh = engine();
        fresh.stop_music();
        fresh.stop_music();
        assert!(!fresh.is_playing());
    }

    #[test]
    fn muted_engine_makes_no_sound() {
        let mut e = engine();
        assert!(e.init());
        e.toggle_mute();
        e.start_music(Track::Gameplay, 1.0);
        e.play_sound(SoundKind::Shoot);
        run_offline(&mut e, 0.3);

        assert!(!e.is_playing());
        assert_eq!(e.live_handle_count(), 0);
        assert!(played(&e).is_empty());
    }

    #[test]
    fn mute_and_unmute_during_playback() {
        let mut e = engine();
        e.start_music(Track::Gameplay, 1.0);
        // 4000 / 250 + 4000 / 1000 = 20 BPM
        e.update_difficulty(1.0, 4000);
        assert_eq!(e.tempo(), 160.0);
        run_offline(&mut e, 0.5);

        e.toggle_mute();
        assert!(e.is_muted());
        assert!(!e.is_playing());
        assert_eq!(e.live_handle_count(), 0);
        assert_eq!(e.output().expect("output open").active_voices(), 0);

        let silent = played(&e).len();
        run_offline(&mut e, 0.5);
        assert_eq!(played(&e).len(), silent);

        e.toggle_mute();
        assert!(!e.is_muted());
        assert!(e.is_playing());
        assert_eq!(e.tempo(), 160.0);
        assert_eq!(e.state().step_index, 0);
        assert_eq!(e.state().current_pattern_index, 0);
        let now = e.output().expect("output open").now();
        let restarted = &played(&e)[silent..];
        assert!(restarted.iter().any(|v| v.start == now));
        assert!(restarted.iter().all(|v| v.start >= now));
    }

    #[test]
    fn reported_step_is_the_one_sounding() {
        let mut e = engine();
        e.start_music(Track::Gameplay, 1.0);
        // 160 BPM: steps are shorter than the lookahead window
        e.update_difficulty(1.0, 4000);
        assert!(step_duration(e.tempo()) < crate::sequencer::LOOKAHEAD_SECS);

        for _ in 0..(2.0 / FRAME) as usize {
            e.pump();
            let now = e.output().expect("output open").now();
            assert!(e.queued.iter().all(|step| step.at > now));
            if let Some(next) = e.queued.front() {
                assert_eq!(next.index, e.state().step_index + 1);
            }
            e.output_mut().expect("output open").advance(FRAME);
        }
        assert!(e.state().step_index > 16);
    }

    #[test]
    fn unmuted_restart_reports_step_zero_at_fast_tempo() {
        let mut e = engine();
        e.start_music(Track::Gameplay, 1.0);
        e.sync_with_game_event(GameEvent::FrenzyStart { tier: 2 });
        assert_eq!(e.tempo(), 176.0);
        run_offline(&mut e, 0.5);

        e.toggle_mute();
        e.toggle_mute();
        assert!(e.is_playing());
        assert_eq!(e.state().step_index, 0);
        assert_eq!(e.state().current_pattern_index, 0);

        run_offline(&mut e, step_duration(176.0) + 2.0 * FRAME);
        assert_eq!(e.state().step_index, 1);
    }

    #[test]
    fn explicit_stop_while_muted_is_not_undone_by_unmute() {
        let mut e = engine();
        e.start_music(Track::Gameplay, 1.0);
        e.toggle_mute();
        e.stop_music();
        e.toggle_mute();
        assert!(!e.is_muted());
        assert!(!e.is_playing());
        assert!(!e.is_start_pending());
        assert_eq!(e.live_handle_count(), 0);
    }

    #[test]
    fn unmute_without_prior_music_stays_quiet() {
        let mut e = engine();
        e.init();
        e.toggle_mute();
        e.toggle_mute();
        assert!(!e.is_playing());
    }

    #[test]
    fn effects_play_without_music() {
        let mut e = engine();
        e.play_sound(SoundKind::Explosion);
        assert!(e.is_available());
        assert!(!e.is_playing());
        assert!(!played(&e).is_empty());
        assert!(played(&e).iter().all(|v| v.bus == Bus::Effects));
        // One-shots are not part of the music session
        assert_eq!(e.live_handle_count(), 0);
    }

    #[test]
    fn small_difficulty_changes_are_ignored() {
        let mut e = engine();
        e.update_difficulty(3.0, 0);
        assert_eq!(e.tempo(), 140.0);

        e.start_music(Track::Gameplay, 1.0);
        e.update_difficulty(1.0, 100);
        assert_eq!(e.tempo(), 140.0);
        e.update_difficulty(1.01, 0);
        assert_eq!(e.tempo(), 140.0);
        e.update_difficulty(1.1, 0);
        assert!((e.tempo() - 142.5).abs() < 1e-4);
        e.update_difficulty(f32::NAN, 0);
        assert!((140.0..=300.0).contains(&e.tempo()));
    }

    #[test]
    fn menu_track_keeps_its_tempo() {
        let mut e = engine();
        e.start_music(Track::Menu, 5.0);
        assert_eq!(e.tempo(), 100.0);
        e.update_difficulty(5.0, 10_000);
        assert_eq!(e.tempo(), 100.0);

        let before = played(&e).len();
        e.sync_with_game_event(GameEvent::Killstreak { streak: 10 });
        assert_eq!(e.tempo(), 100.0);
        let accents = &played(&e)[before..];
        assert_eq!(accents.len(), 2);
        assert!(accents.iter().all(|v| v.bus == Bus::Percussion));

        for _ in 0..(6.0 / FRAME) as usize {
            e.pump();
            assert!(e.state().current_pattern_index < 2);
            e.output_mut().expect("output open").advance(FRAME);
        }
        assert!(e.state().step_index > 32);
    }

    #[test]
    fn frenzy_escalation() {
        let mut e = engine();
        e.start_music(Track::Gameplay, 1.0);
        e.sync_with_game_event(GameEvent::FrenzyStart { tier: 2 });
        assert_eq!(e.tempo(), 176.0);
        assert!((e.state().game_difficulty - 1.6).abs() < 1e-6);

        e.sync_with_game_event(GameEvent::FrenzyEnd);
        assert_eq!(e.tempo(), 156.0);
    }

    #[test]
    fn events_are_ignored_while_stopped() {
        let mut e = engine();
        e.init();
        e.sync_with_game_event(GameEvent::Killstreak { streak: 5 });
        e.sync_named_event("level-up", &Value::Null);
        assert_eq!(e.tempo(), 140.0);
        assert!(played(&e).is_empty());
    }

    #[test]
    fn named_events_reach_the_mapper() {
        let mut e = engine();
        e.start_music(Track::Gameplay, 1.0);
        e.sync_named_event("frenzy-start", &serde_json::json!({"tier": 1}));
        assert_eq!(e.tempo(), 158.0);
        e.sync_named_event("meteor-shower", &Value::Null);
        assert_eq!(e.tempo(), 158.0);
    }

    #[test]
    fn named_calls_resolve_loose_names() {
        let mut e = engine();
        e.start_music_named("menu", 4.0);
        assert_eq!(e.state().track, Track::Menu);
        assert_eq!(e.tempo(), 100.0);
        e.stop_music();

        e.start_music_named("credits", 1.0);
        assert_eq!(e.state().track, Track::Gameplay);
        assert_eq!(e.tempo(), 140.0);

        let before = played(&e).len();
        e.play_sound_named("enemyKilled");
        e.play_sound_named("no-such-sound");
        let effects = &played(&e)[before..];
        let expected = SoundKind::EnemyKilled.voices(0.0).len() + SoundKind::Default.voices(0.0).len();
        assert_eq!(effects.len(), expected);
        assert!(effects.iter().all(|v| v.bus == Bus::Effects));
    }

    #[test]
    fn level_up_plays_a_rising_fanfare() {
        let mut e = engine();
        e.start_music(Track::Gameplay, 1.0);
        let before = played(&e).len();
        e.sync_with_game_event(GameEvent::LevelUp);

        let fanfare = &played(&e)[before..];
        assert_eq!(fanfare.len(), 4);
        assert!(fanfare.iter().all(|v| v.bus == Bus::Lead));
        assert!(fanfare.windows(2).all(|w| w[1].sweep.from > w[0].sweep.from));
        assert!(fanfare.windows(2).all(|w| w[1].start > w[0].start));
    }

    #[test]
    fn music_voices_are_bus_weighted() {
        let mut e = engine();
        e.start_music(Track::Gameplay, 1.0);
        let lead = played(&e)
            .iter()
            .find(|v| v.bus == Bus::Lead)
            .expect("lead note on step 0");
        assert!((lead.peak - NOTE_PEAK * 0.3).abs() < 1e-6);
    }

    #[test]
    fn fast_tempo_uses_the_dense_patterns() {
        let mut e = engine();
        e.start_music(Track::Gameplay, 1.0);
        e.update_difficulty(8.0, 0);
        assert_eq!(e.tempo(), 300.0);

        let tier = eligible(300.0, e.library().len());
        for _ in 0..(3.0 / FRAME) as usize {
            e.pump();
            if e.state().step_index >= 2 {
                assert!(tier.contains(&e.state().current_pattern_index));
            }
            e.output_mut().expect("output open").advance(FRAME);
        }
    }

    #[test]
    fn suspended_output_is_resumed_on_start() {
        let mut e = SoundEngine::new(
            || Ok(OfflineOutput::suspended(8000.0)),
            PreferenceStore::in_memory(),
        );
        e.start_music(Track::Gameplay, 1.0);
        assert!(e.is_playing());
        assert!(!e.is_start_pending());
    }

    #[test]
    fn late_output_starts_on_a_later_pump() {
        let mut e = SoundEngine::new(|| Ok(SlowOutput::new(3)), PreferenceStore::in_memory());
        e.start_music(Track::Gameplay, 1.0);
        assert!(!e.is_playing());
        assert!(e.is_start_pending());

        e.pump();
        assert!(!e.is_playing());
        e.pump();
        assert!(e.is_playing());
        assert_eq!(e.tempo(), 140.0);
        assert!(e.live_handle_count() > 0);
    }

    #[test]
    fn stuck_output_gives_up_after_bounded_attempts() {
        let mut e = SoundEngine::new(|| Ok(SlowOutput::new(u32::MAX)), PreferenceStore::in_memory());
        e.start_music(Track::Gameplay, 1.0);
        for _ in 0..20 {
            e.pump();
        }
        assert!(!e.is_playing());
        assert!(!e.is_start_pending());
        assert_eq!(
            e.output().expect("output open").resumes,
            MAX_RESUME_ATTEMPTS
        );
    }

    #[test]
    fn muting_a_pending_start_resumes_it_later() {
        let mut e = SoundEngine::new(|| Ok(SlowOutput::new(2)), PreferenceStore::in_memory());
        e.start_music(Track::Menu, 1.0);
        assert!(e.is_start_pending());
        e.toggle_mute();
        assert!(!e.is_start_pending());
        e.toggle_mute();
        assert!(e.is_playing());
        assert_eq!(e.tempo(), 100.0);
    }

    #[test]
    fn unavailable_output_is_a_silent_no_op() {
        let opens = Rc::new(Cell::new(0));
        let counter = opens.clone();
        let mut e: SoundEngine<OfflineOutput> = SoundEngine::new(
            move || {
                counter.set(counter.get() + 1);
                Err(anyhow::anyhow!("no output device"))
            },
            PreferenceStore::in_memory(),
        );

        assert!(!e.init());
        e.start_music(Track::Gameplay, 1.0);
        e.play_sound(SoundKind::Hit);
        e.sync_with_game_event(GameEvent::LevelUp);
        e.pump();
        e.stop_music();
        assert!(!e.init());

        assert!(!e.is_playing());
        assert!(!e.is_available());
        assert!(e.output().is_none());
        assert_eq!(opens.get(), 1);
    }

    #[test]
    fn preferences_survive_a_restart() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = || PreferenceStore::new(FileBackend::in_dir(dir.path()));

        let mut e: SoundEngine<OfflineOutput> =
            SoundEngine::new(|| Ok(OfflineOutput::new(8000.0)), store());
        e.set_music_volume(0.3);
        e.set_sfx_volume(7.0);
        e.toggle_mute();

        let reloaded: SoundEngine<OfflineOutput> =
            SoundEngine::new(|| Ok(OfflineOutput::new(8000.0)), store());
        assert!((reloaded.state().music_volume - 0.3).abs() < 1e-6);
        assert_eq!(reloaded.state().sfx_volume, 1.0);
        assert!(reloaded.is_muted());
    }

    #[test]
    fn broken_storage_does_not_affect_playback() {
        let mut e = SoundEngine::new(
            || Ok(OfflineOutput::new(8000.0)),
            PreferenceStore::unavailable(),
        );
        e.set_music_volume(0.2);
        assert_eq!(e.state().music_volume, 0.2);
        e.start_music(Track::Gameplay, 1.0);
        assert!(e.is_playing());
    }

    #[test]
    fn dispatch_routes_commands() {
        let mut e = engine();
        e.dispatch(Command::StartMusic {
            track: Track::Gameplay,
            difficulty: 2.0,
        });
        assert!(e.is_playing());
        assert_eq!(e.tempo(), 165.0);
        e.dispatch(Command::GameEvent(GameEvent::Killstreak { streak: 2 }));
        assert_eq!(e.tempo(), 173.0);
        e.dispatch(Command::StopMusic);
        assert!(!e.is_playing());
    }
}
