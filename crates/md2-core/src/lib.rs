//! md2 Core - concurrency core for the md2 music player
//!
//! - [`queue`]: lock-free SPSC ring with an overflow staging list
//! - [`handoff`]: latest-wins state snapshots between the UI and the
//!   audio callback
//! - [`tasks`]: generation-checked background task scheduler
//! - [`engine`]: audio renderer and UI controller built on the handoff
//! - [`loader`]: clip decoding and library scans on the scheduler
//! - [`audio`]: output device backend (`cpal-backend` feature)
//! - [`config`]: YAML configuration

pub mod audio;
pub mod config;
pub mod engine;
pub mod handoff;
pub mod loader;
pub mod queue;
pub mod tasks;
pub mod types;

pub use types::*;
