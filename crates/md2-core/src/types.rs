//! Common audio types for md2
//!
//! Sample, frame and buffer-descriptor types shared by the realtime renderer,
//! the background clip loader and the output backend.

/// Default sample rate assumed before an output device reports its own (48kHz)
pub const SAMPLE_RATE: u32 = 48000;

/// Audio sample type (32-bit float, interleaved in output buffers)
pub type Sample = f32;

/// A single stereo frame (left and right channels)
///
/// Uses `#[repr(C)]` so a `&mut [Sample]` with two channels can be viewed as
/// `&mut [StereoSample]` through bytemuck without copying.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct StereoSample {
    pub left: Sample,
    pub right: Sample,
}

impl StereoSample {
    /// Create a new stereo sample
    #[inline]
    pub fn new(left: Sample, right: Sample) -> Self {
        Self { left, right }
    }

    /// Create a silent stereo sample
    #[inline]
    pub fn silence() -> Self {
        Self::default()
    }

    /// Create a mono sample (same value in both channels)
    #[inline]
    pub fn mono(value: Sample) -> Self {
        Self { left: value, right: value }
    }

    /// Channel value by index (0 = left, anything else = right)
    #[inline]
    pub fn channel(&self, index: usize) -> Sample {
        if index == 0 {
            self.left
        } else {
            self.right
        }
    }
}

impl std::ops::Mul<Sample> for StereoSample {
    type Output = Self;

    #[inline]
    fn mul(self, factor: Sample) -> Self {
        Self {
            left: self.left * factor,
            right: self.right * factor,
        }
    }
}

/// Decoded clip audio, immutable once loaded
///
/// Produced by the background loader and shared with the realtime renderer
/// through `basedrop::Shared`, see [`crate::engine::gc`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StereoClip {
    frames: Vec<StereoSample>,
    sample_rate: u32,
}

impl StereoClip {
    pub fn new(frames: Vec<StereoSample>, sample_rate: u32) -> Self {
        Self { frames, sample_rate }
    }

    /// Build a clip from interleaved stereo samples [L, R, L, R, ...]
    pub fn from_interleaved(interleaved: &[Sample], sample_rate: u32) -> Self {
        let frames = interleaved
            .chunks_exact(2)
            .map(|chunk| StereoSample::new(chunk[0], chunk[1]))
            .collect();
        Self { frames, sample_rate }
    }

    pub fn frames(&self) -> &[StereoSample] {
        &self.frames
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Duration in seconds (0 for an unknown sample rate)
    pub fn duration_secs(&self) -> f64 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.frames.len() as f64 / self.sample_rate as f64
    }
}

/// Format of the output buffer handed to the realtime callback
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AudioFormat {
    pub channels: u16,
    pub sample_rate: u32,
}

impl Default for AudioFormat {
    fn default() -> Self {
        Self {
            channels: 2,
            sample_rate: SAMPLE_RATE,
        }
    }
}

/// Output buffer descriptor for one realtime callback
///
/// `samples` is interleaved: `frame_count() * channels` values.
pub struct AudioBuffer<'a> {
    pub format: AudioFormat,
    pub samples: &'a mut [Sample],
}

impl<'a> AudioBuffer<'a> {
    pub fn new(format: AudioFormat, samples: &'a mut [Sample]) -> Self {
        Self { format, samples }
    }

    /// Number of frames in the buffer (trailing partial frames are ignored)
    pub fn frame_count(&self) -> usize {
        match self.format.channels {
            0 => 0,
            channels => self.samples.len() / channels as usize,
        }
    }

    pub fn fill_silence(&mut self) {
        self.samples.fill(0.0);
    }
}
