//! Audio engine built on the state handoff
//!
//! ```text
//!   UI thread                                 audio callback
//!  ┌──────────────────┐   AudioState      ┌──────────────────┐
//!  │ EngineController │ ────────────────► │  AudioRenderer   │
//!  │   update(&state) │ ◄──────────────── │  render(&mut buf)│
//!  └──────────────────┘  PlaybackReport   └──────────────────┘
//! ```
//!
//! The UI edits its own [`AudioState`] and calls
//! [`EngineController::update`] once per frame. The renderer always plays
//! the newest snapshot and reports the preview phase and output format back.

mod engine;
pub mod gc;
mod state;

pub use engine::{AudioEngine, AudioRenderer, EngineController};
pub use state::{AudioState, ClipPlayer, PlaybackReport};
