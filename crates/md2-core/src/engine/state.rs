//! Snapshot and report types exchanged with the realtime renderer

use basedrop::Shared;

use crate::types::{AudioFormat, StereoClip};

/// Looping playback of one clip
///
/// `phase` is the normalized position in [0, 1); `phase_increment` is added
/// per output frame and may be negative to play backwards.
#[derive(Clone)]
pub struct ClipPlayer {
    pub clip: Shared<StereoClip>,
    pub phase: f64,
    pub phase_increment: f64,
}

impl ClipPlayer {
    /// Player that advances one clip frame per output frame
    pub fn new(clip: Shared<StereoClip>) -> Self {
        let phase_increment = match clip.len() {
            0 => 0.0,
            n => 1.0 / n as f64,
        };
        Self {
            clip,
            phase: 0.0,
            phase_increment,
        }
    }

    /// Player that resamples so the clip plays at its native speed on an
    /// output running at `output_rate`
    pub fn at_output_rate(clip: Shared<StereoClip>, output_rate: u32) -> Self {
        let phase_increment = if clip.is_empty() || output_rate == 0 {
            0.0
        } else {
            clip.sample_rate() as f64 / (clip.len() as f64 * output_rate as f64)
        };
        Self {
            clip,
            phase: 0.0,
            phase_increment,
        }
    }

    pub fn with_phase(mut self, phase: f64) -> Self {
        self.phase = phase.rem_euclid(1.0);
        self
    }

    pub fn reversed(mut self) -> Self {
        self.phase_increment = -self.phase_increment;
        self
    }

    fn clip_addr(&self) -> usize {
        &*self.clip as *const StereoClip as usize
    }
}

impl std::fmt::Debug for ClipPlayer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClipPlayer")
            .field("frames", &self.clip.len())
            .field("phase", &self.phase)
            .field("phase_increment", &self.phase_increment)
            .finish()
    }
}

/// Desired audio state, owned and edited by the UI thread
#[derive(Debug, Clone)]
pub struct AudioState {
    pub global_gain: f32,
    pub preview_clip: Option<ClipPlayer>,
    pub preview_clip_is_playing: bool,
}

impl Default for AudioState {
    fn default() -> Self {
        Self {
            global_gain: 1.0,
            preview_clip: None,
            preview_clip_is_playing: false,
        }
    }
}

impl AudioState {
    /// Start looping `player` as the preview clip
    pub fn play_preview(&mut self, player: ClipPlayer) {
        self.preview_clip = Some(player);
        self.preview_clip_is_playing = true;
    }

    pub fn stop_preview(&mut self) {
        self.preview_clip_is_playing = false;
    }

    /// Identity of the preview clip buffer, used to detect clip swaps
    pub(crate) fn preview_identity(&self) -> Option<usize> {
        self.preview_clip.as_ref().map(ClipPlayer::clip_addr)
    }
}

/// What the renderer reports back after each callback
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PlaybackReport {
    /// Preview clip phase after the last rendered buffer
    pub preview_phase: f64,
    /// Format of the last output buffer
    pub output_format: AudioFormat,
    /// Frames rendered since the engine was created
    pub frames_rendered: u64,
    /// Callbacks completed since the engine was created
    pub cycles: u64,
}

impl PlaybackReport {
    pub fn sample_rate(&self) -> u32 {
        self.output_format.sample_rate
    }
}
