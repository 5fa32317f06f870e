//! Host audio output: the rendering path voices are handed to once scheduled.
//!
//! The engine only ever talks to an [`AudioOutput`]. `DeviceOutput` drives a
//! real sound card through cpal; `OfflineOutput` renders into memory for WAV
//! export and tests. Both share the same [`Renderer`].

pub mod bus;
pub mod device;
pub mod mixer;
pub mod offline;
pub mod render;

pub use bus::{OutputBus, OutputReceiver, OutputSender};
pub use device::{DeviceOutput, RenderStats};
pub use mixer::{soft_clip, Bus, BusWeights, ChannelBus, Mixer};
pub use offline::{export_wav, write_wav, ExportResult, OfflineOutput, RenderPlan};
pub use render::Renderer;

use crate::synth::{Voice, VoiceId};

/// Whether an output currently accepts scheduled sound
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputStatus {
    Running,
    /// Exists but must be resumed before it produces sound
    Suspended,
}

/// Messages from the engine to the render path
#[derive(Debug, Clone, PartialEq)]
pub enum OutputCommand {
    /// Start routing the music buses
    OpenBuses,
    /// Tear down the music buses, dropping every music voice still sounding
    CloseBuses,
    Play(Voice),
    /// Halt specific voices immediately
    Release(Vec<VoiceId>),
    SetMusicVolume(f32),
    SetSfxVolume(f32),
}

impl OutputCommand {
    /// Voices may be lost under pressure; every other command must arrive
    pub fn is_droppable(&self) -> bool {
        matches!(self, OutputCommand::Play(_))
    }

    pub fn kind(&self) -> &'static str {
        match self {
            OutputCommand::OpenBuses => "OpenBuses",
            OutputCommand::CloseBuses => "CloseBuses",
            OutputCommand::Play(_) => "Play",
            OutputCommand::Release(_) => "Release",
            OutputCommand::SetMusicVolume(_) => "SetMusicVolume",
            OutputCommand::SetSfxVolume(_) => "SetSfxVolume",
        }
    }
}

/// A sound output the engine can schedule voices on
pub trait AudioOutput {
    fn status(&self) -> OutputStatus;

    /// Ask a suspended output to start producing sound
    fn resume(&mut self) -> anyhow::Result<()>;

    /// Monotonic output clock in seconds. Read fresh at every dispatch.
    fn now(&self) -> f64;

    /// Hand a command to the render path (never blocks)
    fn send(&mut self, cmd: OutputCommand);

    /// Retry commands an earlier `send` could not deliver. Called on every pump.
    fn flush(&mut self) {}
}
