//! CPAL output stream driving the renderer
//!
//! ```text
//! ┌──────────────────┐   update(&state)   ┌─────────────────────┐
//! │    UI Thread     │ ─────────────────► │   State handoff     │
//! │ EngineController │ ◄───────────────── │  (lock-free SPSC)   │
//! └──────────────────┘   PlaybackReport   └──────────┬──────────┘
//!                                                    │
//!                                         ┌──────────▼──────────┐
//!                                         │  CPAL audio thread  │
//!                                         │ (owns AudioRenderer)│
//!                                         └─────────────────────┘
//! ```
//!
//! The callback owns the renderer outright, so there is no lock between the
//! device and the engine.

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{BufferSize as CpalBufferSize, SampleFormat, SampleRate, Stream, StreamConfig};

use super::config::OutputConfig;
use super::error::{AudioError, AudioResult};
use crate::engine::{AudioEngine, AudioRenderer, EngineController};
use crate::queue::QueueConfig;
use crate::types::{AudioBuffer, AudioFormat};

/// Keeps the output stream alive; drop to stop audio
pub struct OutputHandle {
    _stream: Stream,
    format: AudioFormat,
    buffer_frames: Option<u32>,
}

impl OutputHandle {
    pub fn format(&self) -> AudioFormat {
        self.format
    }

    /// Requested buffer size, `None` when the device chose it
    pub fn buffer_frames(&self) -> Option<u32> {
        self.buffer_frames
    }

    /// One-way output latency in milliseconds, when known
    pub fn latency_ms(&self) -> Option<f32> {
        self.buffer_frames
            .map(|frames| frames as f32 / self.format.sample_rate as f32 * 1000.0)
    }
}

/// Names of the default host's output devices
pub fn output_device_names() -> AudioResult<Vec<String>> {
    let host = cpal::default_host();
    let devices = host
        .output_devices()
        .map_err(|e| AudioError::ConfigError(e.to_string()))?;
    Ok(devices.filter_map(|device| device.name().ok()).collect())
}

fn find_device(name: Option<&str>) -> AudioResult<cpal::Device> {
    let host = cpal::default_host();
    match name {
        None => host.default_output_device().ok_or(AudioError::NoDefaultDevice),
        Some(name) => host
            .output_devices()
            .map_err(|e| AudioError::ConfigError(e.to_string()))?
            .find(|device| device.name().ok().as_deref() == Some(name))
            .ok_or_else(|| AudioError::DeviceNotFound(name.to_string())),
    }
}

/// Pick an f32 config, preferring stereo at the requested rate
fn stream_config(device: &cpal::Device, config: &OutputConfig) -> AudioResult<StreamConfig> {
    let candidates: Vec<_> = device
        .supported_output_configs()
        .map_err(|e| AudioError::ConfigError(e.to_string()))?
        .filter(|c| c.sample_format() == SampleFormat::F32)
        .collect();

    let target = config.sample_rate;
    let supports_rate = |c: &cpal::SupportedStreamConfigRange| {
        (c.min_sample_rate().0..=c.max_sample_rate().0).contains(&target)
    };

    let best = candidates
        .iter()
        .find(|c| c.channels() >= 2 && supports_rate(*c))
        .or_else(|| candidates.iter().find(|c| c.channels() >= 2))
        .or_else(|| candidates.first())
        .ok_or_else(|| AudioError::UnsupportedFormat("device has no f32 output".to_string()))?;

    let sample_rate = if supports_rate(best) {
        SampleRate(target)
    } else {
        log::warn!(
            "Device does not support {}Hz, using {}Hz",
            target,
            best.max_sample_rate().0
        );
        best.max_sample_rate()
    };

    Ok(StreamConfig {
        channels: best.channels(),
        sample_rate,
        buffer_size: match config.buffer_size.as_frames() {
            Some(frames) => CpalBufferSize::Fixed(frames),
            None => CpalBufferSize::Default,
        },
    })
}

/// Open the configured device and start rendering into it
pub fn start_output(config: &OutputConfig, mut renderer: AudioRenderer) -> AudioResult<OutputHandle> {
    let device = find_device(config.device.as_deref())?;
    let device_name = device.name().unwrap_or_else(|_| "Unknown".to_string());
    log::info!("Using audio device: {}", device_name);

    let stream_config = stream_config(&device, config)?;
    let format = AudioFormat {
        channels: stream_config.channels,
        sample_rate: stream_config.sample_rate.0,
    };
    let buffer_frames = config.buffer_size.as_frames();

    let stream = device
        .build_output_stream(
            &stream_config,
            move |data: &mut [f32], _info: &cpal::OutputCallbackInfo| {
                renderer.render(&mut AudioBuffer::new(format, data));
            },
            |err| log::error!("Audio stream error: {}", err),
            None,
        )
        .map_err(|e| AudioError::StreamBuildError(e.to_string()))?;

    stream
        .play()
        .map_err(|e| AudioError::StreamPlayError(e.to_string()))?;

    log::info!(
        "Audio stream started: {} channels, {}Hz, buffer {:?}",
        format.channels,
        format.sample_rate,
        buffer_frames
    );

    Ok(OutputHandle {
        _stream: stream,
        format,
        buffer_frames,
    })
}

/// Create an engine and start rendering it on the configured device
pub fn start_engine(
    queue: &QueueConfig,
    output: &OutputConfig,
) -> AudioResult<(EngineController, OutputHandle)> {
    let (controller, renderer) = AudioEngine::new(queue)?;
    let handle = start_output(output, renderer)?;
    Ok((controller, handle))
}
