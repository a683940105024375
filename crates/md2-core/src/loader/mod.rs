//! Background loading on the task scheduler
//!
//! Clip decoding and library scans are slow, blocking work that must stay
//! off both the UI and the audio thread. [`ClipLoader`] turns each request
//! into a work task plus a dependent finish task and hands back a
//! [`PendingLoad`] the UI polls once per frame.

mod clip_loader;
mod error;
mod scan;
mod wav;

pub use clip_loader::{ClipLoader, PendingLoad};
pub use error::{LoadError, LoadResult};
pub use scan::{scan_directory, LibraryScan};
pub use wav::decode_wav;
