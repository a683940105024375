//! UI controller and realtime renderer connected by a state handoff

use crate::handoff::{HandoffConsumer, HandoffProducer, StateHandoff};
use crate::queue::{QueueConfig, QueueError};
use crate::types::{AudioBuffer, StereoSample};

use super::state::{AudioState, ClipPlayer, PlaybackReport};

/// Constructor for the controller/renderer pair
pub struct AudioEngine;

impl AudioEngine {
    /// Create a silent engine
    ///
    /// The controller stays on the UI thread; the renderer moves into the
    /// audio callback.
    pub fn new(config: &QueueConfig) -> Result<(EngineController, AudioRenderer), QueueError> {
        let (producer, consumer) = StateHandoff::new(AudioState::default(), config)?;
        log::info!(
            "Audio engine created (queue capacity {}, staging {})",
            config.capacity,
            config.staging_capacity
        );
        Ok((
            EngineController {
                producer,
                report: PlaybackReport::default(),
            },
            AudioRenderer {
                consumer,
                phase: 0.0,
                preview: None,
                frames_rendered: 0,
                cycles: 0,
            },
        ))
    }
}

// ────────────────────────────────────────────────────────────────────────────────
// UI side
// ────────────────────────────────────────────────────────────────────────────────

/// UI-thread endpoint: publishes desired state once per frame
pub struct EngineController {
    producer: HandoffProducer<AudioState, PlaybackReport>,
    report: PlaybackReport,
}

impl EngineController {
    /// Publish `state` and return the newest report from the renderer
    ///
    /// Before the renderer's first callback the default report is returned.
    pub fn update(&mut self, state: &AudioState) -> PlaybackReport {
        if let Some(report) = self.producer.publish(state) {
            self.report = report;
        }
        self.report
    }

    /// Drain renderer reports without publishing
    pub fn poll(&mut self) -> PlaybackReport {
        if let Some(report) = self.producer.poll() {
            self.report = report;
        }
        self.report
    }

    pub fn report(&self) -> PlaybackReport {
        self.report
    }
}

// ────────────────────────────────────────────────────────────────────────────────
// Realtime side
// ────────────────────────────────────────────────────────────────────────────────

/// Realtime endpoint: renders one output buffer per callback
///
/// `render` never locks, allocates or frees clip data.
pub struct AudioRenderer {
    consumer: HandoffConsumer<AudioState, PlaybackReport>,
    /// Authoritative preview phase, carried across snapshots
    phase: f64,
    /// Identity of the clip `phase` belongs to, `None` while stopped
    preview: Option<usize>,
    frames_rendered: u64,
    cycles: u64,
}

impl AudioRenderer {
    /// Render one interleaved output buffer
    pub fn render(&mut self, output: &mut AudioBuffer) {
        let state = self.consumer.begin_cycle();
        output.fill_silence();
        let frame_count = output.frame_count();

        let active = state
            .preview_clip
            .as_ref()
            .filter(|_| state.preview_clip_is_playing);

        match active {
            Some(player) => {
                let identity = state.preview_identity();
                if self.preview != identity {
                    // New clip or restarted playback: start from the UI's phase
                    self.phase = player.phase;
                    self.preview = identity;
                }
                self.phase = mix_clip(player, self.phase, state.global_gain, output);
            }
            None => self.preview = None,
        }

        self.frames_rendered += frame_count as u64;
        self.cycles += 1;
        self.consumer.end_cycle(PlaybackReport {
            preview_phase: self.phase,
            output_format: output.format,
            frames_rendered: self.frames_rendered,
            cycles: self.cycles,
        });
    }

    /// Snapshot the renderer is currently playing
    pub fn state(&self) -> &AudioState {
        self.consumer.state()
    }
}

/// Mix `player` into channels 0 and 1 of `output`; returns the final phase
fn mix_clip(player: &ClipPlayer, mut phase: f64, gain: f32, output: &mut AudioBuffer) -> f64 {
    let frames = player.clip.frames();
    let channels = output.format.channels as usize;
    let frame_count = output.frame_count();

    let source = |phase: f64| -> StereoSample {
        let index = (phase * frames.len() as f64) as usize;
        frames[index.min(frames.len() - 1)] * gain
    };

    if frames.is_empty() || channels == 0 {
        phase += player.phase_increment * frame_count as f64;
        return phase.rem_euclid(1.0);
    }

    let samples = &mut output.samples[..frame_count * channels];
    if channels == 2 {
        // Interleaved stereo maps directly onto StereoSample frames
        let stereo: &mut [StereoSample] = bytemuck::cast_slice_mut(samples);
        for out in stereo {
            phase = phase.rem_euclid(1.0);
            *out = source(phase);
            phase += player.phase_increment;
        }
    } else {
        for frame in samples.chunks_exact_mut(channels) {
            phase = phase.rem_euclid(1.0);
            let value = source(phase);
            for (channel, out) in frame.iter_mut().take(2).enumerate() {
                *out = value.channel(channel);
            }
            phase += player.phase_increment;
        }
    }
    phase.rem_euclid(1.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::gc::gc_handle;
    use crate::types::{AudioFormat, StereoClip};
    use basedrop::Shared;
    use std::thread;

    fn engine() -> (EngineController, AudioRenderer) {
        AudioEngine::new(&QueueConfig::default()).unwrap()
    }

    fn ramp_clip(len: usize) -> Shared<StereoClip> {
        let frames = (0..len)
            .map(|i| StereoSample::new(i as f32, -(i as f32)))
            .collect();
        Shared::new(&gc_handle(), StereoClip::new(frames, 48000))
    }

    fn render(renderer: &mut AudioRenderer, channels: u16, frames: usize) -> Vec<f32> {
        let mut samples = vec![1.0; frames * channels as usize];
        let format = AudioFormat {
            channels,
            sample_rate: 44100,
        };
        renderer.render(&mut AudioBuffer::new(format, &mut samples));
        samples
    }

    #[test]
    fn test_renders_silence_by_default() {
        let (mut controller, mut renderer) = engine();
        let samples = render(&mut renderer, 2, 64);
        assert!(samples.iter().all(|&s| s == 0.0));

        let report = controller.poll();
        assert_eq!(report.frames_rendered, 64);
        assert_eq!(report.sample_rate(), 44100);
        assert_eq!(report.cycles, 1);
    }

    #[test]
    fn test_update_before_first_callback_returns_default_report() {
        let (mut controller, _renderer) = engine();
        assert_eq!(controller.update(&AudioState::default()), PlaybackReport::default());
    }

    #[test]
    fn test_plays_preview_clip_with_gain() {
        let (mut controller, mut renderer) = engine();
        let mut state = AudioState {
            global_gain: 0.5,
            ..AudioState::default()
        };
        state.play_preview(ClipPlayer::new(ramp_clip(8)));
        controller.update(&state);

        let samples = render(&mut renderer, 2, 4);
        assert_eq!(samples, vec![0.0, -0.0, 0.5, -0.5, 1.0, -1.0, 1.5, -1.5]);

        let report = controller.poll();
        assert!((report.preview_phase - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_phase_wraps_and_continues_across_callbacks() {
        let (mut controller, mut renderer) = engine();
        let mut state = AudioState::default();
        state.play_preview(ClipPlayer::new(ramp_clip(4)));
        controller.update(&state);

        let first = render(&mut renderer, 2, 3);
        let second = render(&mut renderer, 2, 3);
        let lefts: Vec<f32> = first.iter().chain(&second).step_by(2).copied().collect();
        assert_eq!(lefts, vec![0.0, 1.0, 2.0, 3.0, 0.0, 1.0]);

        let phase = controller.poll().preview_phase;
        assert!((0.0..1.0).contains(&phase));
        assert!((phase - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_reverse_playback() {
        let (mut controller, mut renderer) = engine();
        let mut state = AudioState::default();
        state.play_preview(ClipPlayer::new(ramp_clip(4)).reversed());
        controller.update(&state);

        let lefts: Vec<f32> = render(&mut renderer, 2, 4).into_iter().step_by(2).collect();
        assert_eq!(lefts, vec![0.0, 3.0, 2.0, 1.0]);
        assert!((0.0..1.0).contains(&controller.poll().preview_phase));
    }

    #[test]
    fn test_extra_channels_stay_silent() {
        let (mut controller, mut renderer) = engine();
        let mut state = AudioState::default();
        state.play_preview(ClipPlayer::new(ramp_clip(4)).with_phase(0.25));
        controller.update(&state);

        let samples = render(&mut renderer, 4, 2);
        assert_eq!(samples, vec![1.0, -1.0, 0.0, 0.0, 2.0, -2.0, 0.0, 0.0]);
    }

    #[test]
    fn test_stopped_clip_is_silent() {
        let (mut controller, mut renderer) = engine();
        let mut state = AudioState::default();
        state.play_preview(ClipPlayer::new(ramp_clip(4)));
        state.stop_preview();
        controller.update(&state);

        assert!(render(&mut renderer, 2, 16).iter().all(|&s| s == 0.0));
    }

    #[test]
    fn test_restart_takes_phase_from_ui() {
        let (mut controller, mut renderer) = engine();
        let clip = ramp_clip(4);
        let mut state = AudioState::default();
        state.play_preview(ClipPlayer::new(clip.clone()));
        controller.update(&state);
        render(&mut renderer, 2, 3);

        // Same clip keeps playing from the renderer's phase
        controller.update(&state);
        assert_eq!(render(&mut renderer, 2, 1)[0], 3.0);

        state.stop_preview();
        controller.update(&state);
        render(&mut renderer, 2, 1);

        state.play_preview(ClipPlayer::new(clip).with_phase(0.5));
        controller.update(&state);
        assert_eq!(render(&mut renderer, 2, 1)[0], 2.0);
    }

    #[test]
    fn test_renderer_on_audio_thread() {
        let (mut controller, mut renderer) = engine();
        let audio = thread::spawn(move || {
            let mut samples = vec![0.0; 256];
            for _ in 0..500 {
                let format = AudioFormat::default();
                renderer.render(&mut AudioBuffer::new(format, &mut samples));
                thread::yield_now();
            }
            renderer
        });

        let clip = ramp_clip(64);
        for i in 0..500 {
            let mut state = AudioState {
                global_gain: (i % 10) as f32 / 10.0,
                ..AudioState::default()
            };
            state.play_preview(ClipPlayer::new(clip.clone()));
            let report = controller.update(&state);
            assert!((0.0..1.0).contains(&report.preview_phase));
        }

        let mut renderer = audio.join().unwrap();
        // One more callback flushes any report coalesced while the UI lagged
        controller.poll();
        render(&mut renderer, 2, 128);
        let report = controller.poll();
        assert_eq!(report.cycles, 501);
        assert_eq!(report.frames_rendered, 501 * 128);
    }
}
