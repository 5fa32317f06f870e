use std::path::Path;

use anyhow::{Context, Result};

use crate::engine::{SoundEngine, Track};
use crate::prefs::PreferenceStore;
use crate::sequencer::PatternLibrary;
use crate::synth::Voice;

use super::render::Renderer;
use super::{AudioOutput, OutputCommand, OutputStatus};

pub const SAMPLE_RATE: f32 = 44100.0;

/// How often the offline session pumps the scheduler, like a 60 fps game loop
const FRAME_SECS: f64 = 1.0 / 60.0;

/// Output that renders into memory on a manually advanced clock
pub struct OfflineOutput {
    renderer: Renderer,
    status: OutputStatus,
    samples: Vec<f32>,
    /// Every voice handed to this output, in dispatch order
    played: Vec<Voice>,
}

impl OfflineOutput {
    pub fn new(sample_rate: f32) -> Self {
        Self {
            renderer: Renderer::new(sample_rate),
            status: OutputStatus::Running,
            samples: Vec::new(),
            played: Vec::new(),
        }
    }

    /// Starts suspended, like a device that is waiting for its first resume
    pub fn suspended(sample_rate: f32) -> Self {
        Self {
            status: OutputStatus::Suspended,
            ..Self::new(sample_rate)
        }
    }

    pub fn sample_rate(&self) -> f32 {
        self.renderer.sample_rate()
    }

    /// Render `seconds` of audio, moving the output clock forward
    pub fn advance(&mut self, seconds: f64) {
        let count = (seconds * self.renderer.sample_rate() as f64).round() as usize;
        self.samples.reserve(count);
        for _ in 0..count {
            let sample = if self.status == OutputStatus::Running {
                self.renderer.next_sample()
            } else {
                0.0
            };
            self.samples.push(sample);
        }
    }

    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    pub fn played(&self) -> &[Voice] {
        &self.played
    }

    /// Voices still sounding or waiting to start on the render side
    pub fn active_voices(&self) -> usize {
        self.renderer.active_voices()
    }
}

impl AudioOutput for OfflineOutput {
    fn status(&self) -> OutputStatus {
        self.status
    }

    fn resume(&mut self) -> Result<()> {
        self.status = OutputStatus::Running;
        Ok(())
    }

    fn now(&self) -> f64 {
        self.samples.len() as f64 / self.renderer.sample_rate() as f64
    }

    fn send(&mut self, cmd: OutputCommand) {
        if let OutputCommand::Play(voice) = &cmd {
            self.played.push(voice.clone());
        }
        self.renderer.handle(cmd);
    }
}

/// Parameters of an offline soundtrack render
pub struct RenderPlan {
    pub track: Track,
    pub seconds: f32,
    /// Difficulty at the start of the render
    pub start_difficulty: f32,
    /// Difficulty reached by the end, ramped linearly
    pub end_difficulty: f32,
    /// Score gained per second while rendering
    pub score_rate: f32,
    pub seed: Option<u64>,
    pub library: PatternLibrary,
}

impl Default for RenderPlan {
    fn default() -> Self {
        Self {
            track: Track::Gameplay,
            seconds: 30.0,
            start_difficulty: 1.0,
            end_difficulty: 1.0,
            score_rate: 0.0,
            seed: None,
            library: PatternLibrary::builtin(),
        }
    }
}

/// Result of an export operation
pub struct ExportResult {
    pub duration_secs: f32,
    pub samples: usize,
    pub final_tempo: f32,
}

/// Play a track through an offline output and write it as WAV
pub fn export_wav(plan: RenderPlan, path: &Path) -> Result<ExportResult> {
    let mut engine = SoundEngine::new(
        || Ok(OfflineOutput::new(SAMPLE_RATE)),
        PreferenceStore::in_memory(),
    )
    .with_library(plan.library);
    if let Some(seed) = plan.seed {
        engine = engine.with_seed(seed);
    }

    if !engine.init() {
        anyhow::bail!("Offline output could not be opened");
    }
    engine.start_music(plan.track, plan.start_difficulty);

    let total = plan.seconds.max(0.0) as f64;
    let mut elapsed = 0.0f64;
    while elapsed < total {
        let progress = (elapsed / total.max(f64::EPSILON)) as f32;
        let difficulty =
            plan.start_difficulty + (plan.end_difficulty - plan.start_difficulty) * progress;
        let score = (plan.score_rate.max(0.0) as f64 * elapsed) as u64;
        engine.update_difficulty(difficulty, score);
        engine.pump();

        let frame = FRAME_SECS.min(total - elapsed);
        if let Some(output) = engine.output_mut() {
            output.advance(frame);
        }
        elapsed += frame;
    }

    let final_tempo = engine.tempo();
    let output = engine
        .output()
        .context("Offline output disappeared during render")?;
    write_wav(path, output.samples(), output.sample_rate())?;

    Ok(ExportResult {
        duration_secs: output.samples().len() as f32 / output.sample_rate(),
        samples: output.samples().len(),
        final_tempo,
    })
}

/// Write mono samples as a 16-bit WAV file
pub fn write_wav(path: &Path, samples: &[f32], sample_rate: f32) -> Result<()> {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate: sample_rate as u32,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };

    let mut writer = hound::WavWriter::create(path, spec)
        .with_context(|| format!("Failed to create {}", path.display()))?;
    for &sample in samples {
        let value = (sample.clamp(-1.0, 1.0) * i16::MAX as f32) as i16;
        writer.write_sample(value)?;
    }
    writer
        .finalize()
        .with_context(|| format!("Failed to finalize {}", path.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::Bus;
    use crate::synth::SoundKind;

    #[test]
    fn advance_moves_the_clock() {
        let mut out = OfflineOutput::new(1000.0);
        assert_eq!(out.now(), 0.0);
        out.advance(0.25);
        assert_eq!(out.samples().len(), 250);
        assert!((out.now() - 0.25).abs() < 1e-9);
    }

    #[test]
    fn records_played_voices() {
        let mut out = OfflineOutput::new(8000.0);
        for voice in SoundKind::Shoot.voices(0.0) {
            out.send(OutputCommand::Play(voice));
        }
        assert_eq!(out.played().len(), 1);
        assert_eq!(out.played()[0].bus, Bus::Effects);
        out.advance(0.05);
        assert!(out.samples().iter().any(|s| s.abs() > 0.01));
    }

    #[test]
    fn suspended_output_is_silent_until_resumed() {
        let mut out = OfflineOutput::suspended(8000.0);
        assert_eq!(out.status(), OutputStatus::Suspended);
        out.resume().expect("offline resume cannot fail");
        assert_eq!(out.status(), OutputStatus::Running);
    }

    #[test]
    fn wav_export_writes_a_readable_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("run.wav");
        let plan = RenderPlan {
            seconds: 2.0,
            start_difficulty: 1.0,
            end_difficulty: 3.0,
            score_rate: 100.0,
            seed: Some(7),
            ..RenderPlan::default()
        };
        let result = export_wav(plan, &path).expect("export");
        assert_eq!(result.samples, (2.0 * SAMPLE_RATE) as usize);
        assert!(result.final_tempo > 140.0);

        let reader = hound::WavReader::open(&path).expect("open wav");
        assert_eq!(reader.spec().channels, 1);
        assert_eq!(reader.len() as usize, result.samples);
    }

    #[test]
    fn menu_render_keeps_its_fixed_tempo() {
        let dir = tempfile::tempdir().expect("tempdir");
        let plan = RenderPlan {
            track: Track::Menu,
            seconds: 1.0,
            end_difficulty: 6.0,
            score_rate: 5000.0,
            ..RenderPlan::default()
        };
        let result = export_wav(plan, &dir.path().join("menu.wav")).expect("export");
        assert_eq!(result.final_tempo, 100.0);
    }
}
