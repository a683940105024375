//! Background task scheduler
//!
//! Non-realtime work (file decoding, directory scans) runs on a single
//! worker thread. Tasks live in a generation-checked arena; any thread may
//! create them, chain them with [`TaskSpawner::depends`] and start them.
//!
//! ```text
//! let a = spawner.create(decode);
//! let b = spawner.create(finish);
//! spawner.depends(a, b)?;   // b starts after a's body returns
//! spawner.start(a)?;
//! ```
//!
//! Task bodies cannot be cancelled once started; see [`CancelToken`] for the
//! cooperative pattern.

mod cancel;
mod error;
pub mod global;
mod handle;
mod scheduler;

pub use cancel::CancelToken;
pub use error::{TaskError, TaskResult};
pub use global::{create, deinit, depends, init, init_with, start, task_exists};
pub use handle::{TaskHandle, MAX_TASKS};
pub use scheduler::{TaskBody, TaskScheduler, TaskSpawner};

use serde::{Deserialize, Serialize};

/// Default worker sleep between inbox drains
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 1;

/// Worker thread settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    pub poll_interval_ms: u64,
    pub thread_name: String,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
            thread_name: "md2-tasks".to_string(),
        }
    }
}
