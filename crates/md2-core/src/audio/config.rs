//! Output device configuration

use serde::{Deserialize, Serialize};

use crate::types::SAMPLE_RATE;

/// Largest fixed buffer size accepted from config (frames)
pub const MAX_BUFFER_FRAMES: u32 = 8192;

/// Preferred buffer size for the output stream
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum BufferSize {
    /// Let the device choose
    #[default]
    Default,
    /// Request a specific size in frames (the device may adjust it)
    Fixed(u32),
}

impl BufferSize {
    /// Frames requested from the device, clamped to a sane range
    pub fn as_frames(&self) -> Option<u32> {
        match self {
            BufferSize::Default => None,
            BufferSize::Fixed(frames) => Some((*frames).clamp(16, MAX_BUFFER_FRAMES)),
        }
    }
}

/// Output stream settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Device name; `None` uses the host's default output
    pub device: Option<String>,
    pub sample_rate: u32,
    pub buffer_size: BufferSize,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            device: None,
            sample_rate: SAMPLE_RATE,
            buffer_size: BufferSize::Default,
        }
    }
}
