//! Audio output
//!
//! With the `cpal-backend` feature, [`start_output`] opens a device and
//! drives an [`AudioRenderer`](crate::engine::AudioRenderer) from its
//! callback. Without it only the configuration and error types are built,
//! so the core compiles on machines without system audio headers.

mod config;
mod error;

#[cfg(feature = "cpal-backend")]
mod cpal_backend;

pub use config::{BufferSize, OutputConfig, MAX_BUFFER_FRAMES};
pub use error::{AudioError, AudioResult};

#[cfg(feature = "cpal-backend")]
pub use cpal_backend::{output_device_names, start_engine, start_output, OutputHandle};
