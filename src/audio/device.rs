use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use anyhow::{Context, Result};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{Device, SampleFormat, Stream, StreamConfig};
use parking_lot::RwLock;

use super::bus::{OutputBus, OutputReceiver, OutputSender};
use super::render::Renderer;
use super::{AudioOutput, OutputCommand, OutputStatus};

/// Render-thread figures published for display
#[derive(Clone, Copy, Debug, Default)]
pub struct RenderStats {
    pub active_voices: usize,
    /// Peak absolute sample value of the last callback buffer
    pub peak: f32,
}

/// Sound card output driven by a cpal stream.
///
/// The stream is created paused; the first `resume()` starts it. The render
/// callback owns the [`Renderer`] and is fed through an [`OutputBus`].
pub struct DeviceOutput {
    stream: Stream,
    sender: OutputSender,
    /// Samples rendered so far, written by the audio thread
    clock: Arc<AtomicU64>,
    sample_rate: f32,
    status: OutputStatus,
    stats: Arc<RwLock<RenderStats>>,
}

impl DeviceOutput {
    /// Build a stream on the default output device
    pub fn open() -> Result<Self> {
        let host = cpal::default_host();
        let device = host
            .default_output_device()
            .context("No output device available")?;

        let config = device
            .default_output_config()
            .context("No default output configuration")?;
        let sample_rate = config.sample_rate().0 as f32;

        let bus = OutputBus::new();
        let clock = Arc::new(AtomicU64::new(0));
        let stats = Arc::new(RwLock::new(RenderStats::default()));

        let stream = match config.sample_format() {
            SampleFormat::F32 => Self::build_stream::<f32>(
                &device,
                &config.into(),
                bus.receiver(),
                clock.clone(),
                stats.clone(),
            )?,
            SampleFormat::I16 => Self::build_stream::<i16>(
                &device,
                &config.into(),
                bus.receiver(),
                clock.clone(),
                stats.clone(),
            )?,
            SampleFormat::U16 => Self::build_stream::<u16>(
                &device,
                &config.into(),
                bus.receiver(),
                clock.clone(),
                stats.clone(),
            )?,
            format => anyhow::bail!("Unsupported sample format: {:?}", format),
        };

        // Some hosts start streams on creation; hold it until resumed
        if let Err(e) = stream.pause() {
            tracing::debug!("Could not pause new stream: {}", e);
        }

        tracing::info!(
            "Audio output opened: {} Hz on {}",
            sample_rate,
            device.name().unwrap_or_else(|_| "unknown device".to_string())
        );

        Ok(Self {
            stream,
            sender: bus.sender(),
            clock,
            sample_rate,
            status: OutputStatus::Suspended,
            stats,
        })
    }

    /// Shared handle to the render statistics
    pub fn stats(&self) -> Arc<RwLock<RenderStats>> {
        self.stats.clone()
    }

    /// Build the audio stream for a specific sample format
    fn build_stream<T>(
        device: &Device,
        config: &StreamConfig,
        command_rx: OutputReceiver,
        clock: Arc<AtomicU64>,
        stats: Arc<RwLock<RenderStats>>,
    ) -> Result<Stream>
    where
        T: cpal::SizedSample + cpal::FromSample<f32>,
    {
        let sample_rate = config.sample_rate.0 as f32;
        let channels = config.channels as usize;

        let mut renderer = Renderer::new(sample_rate);

        let stream = device
            .build_output_stream(
                config,
                move |data: &mut [T], _: &cpal::OutputCallbackInfo| {
                    // Process commands from the engine
                    while let Some(cmd) = command_rx.try_recv() {
                        renderer.handle(cmd);
                    }

                    let mut peak = 0.0f32;
                    for frame in data.chunks_mut(channels) {
                        let sample = renderer.next_sample();
                        peak = peak.max(sample.abs());
                        for channel_sample in frame.iter_mut() {
                            *channel_sample = T::from_sample(sample);
                        }
                    }

                    clock.store(renderer.clock(), Ordering::Release);

                    if let Some(mut stats) = stats.try_write() {
                        stats.active_voices = renderer.active_voices();
                        stats.peak = peak;
                    }
                },
                |err| {
                    tracing::error!("Audio stream error: {}", err);
                },
                None,
            )
            .context("Failed to build output stream")?;

        Ok(stream)
    }
}

impl AudioOutput for DeviceOutput {
    fn status(&self) -> OutputStatus {
        self.status
    }

    fn resume(&mut self) -> Result<()> {
        self.stream.play().context("Failed to start audio stream")?;
        self.status = OutputStatus::Running;
        Ok(())
    }

    fn now(&self) -> f64 {
        self.clock.load(Ordering::Acquire) as f64 / self.sample_rate as f64
    }

    fn send(&mut self, cmd: OutputCommand) {
        self.sender.send(cmd);
    }

    fn flush(&mut self) {
        self.sender.flush();
    }
}
