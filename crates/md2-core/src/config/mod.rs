//! Runtime configuration
//!
//! One YAML file holds the tunables of every subsystem. Every section uses
//! `#[serde(default)]`, so a partial file only overrides what it names.
//!
//! ```yaml
//! queue:
//!   capacity: 256
//!   staging_capacity: 64
//! scheduler:
//!   poll_interval_ms: 1
//!   thread_name: md2-tasks
//! output:
//!   device: null
//!   sample_rate: 48000
//!   buffer_size: Default
//! library: null
//! ```

mod io;
mod paths;

pub use io::{load_config, save_config, try_load_config};
pub use paths::{config_dir, default_config_path, default_library_path};

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::audio::OutputConfig;
use crate::queue::QueueConfig;
use crate::tasks::SchedulerConfig;

/// Top-level configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CoreConfig {
    pub queue: QueueConfig,
    pub scheduler: SchedulerConfig,
    pub output: OutputConfig,
    /// Clip library root; `None` uses [`default_library_path`]
    pub library: Option<PathBuf>,
}

impl CoreConfig {
    /// Load from [`default_config_path`]
    pub fn load_default() -> Self {
        load_config(&default_config_path())
    }

    pub fn library_path(&self) -> PathBuf {
        self.library.clone().unwrap_or_else(default_library_path)
    }
}
