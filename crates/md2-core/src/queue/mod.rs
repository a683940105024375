//! Single-producer single-consumer ring queue
//!
//! The queue used for every realtime ⇄ UI message path in md2:
//!
//! ```text
//! ┌──────────────┐  push()   ┌──────────────┐  flush()  ┌──────────────┐  pull_next()  ┌──────────────┐
//! │   Producer   │──────────►│ Staging list │──────────►│  Ring (C)    │──────────────►│   Consumer   │
//! │    thread    │           │ (unbounded)  │           │  SPSC slots  │               │    thread    │
//! └──────────────┘           └──────────────┘           └──────────────┘               └──────────────┘
//! ```
//!
//! - The ring has a fixed power-of-two capacity; slots are addressed by
//!   masking two free-running `u32` indices.
//! - Overflow is not an error: values that do not fit stay in the writer's
//!   staging list (FIFO) until a later `flush()` finds room.
//! - Neither end ever blocks or takes a lock. The only allocation risk is the
//!   staging list growing, which realtime producers avoid with
//!   [`QueueWriter::reserve_staging`].
//!
//! The writer and reader halves are not `Clone`, and every mutating call
//! takes `&mut self`, so the single-producer/single-consumer contract is
//! enforced by ownership.
//!
//! # Usage
//!
//! ```
//! use md2_core::queue::RingQueue;
//!
//! let (mut writer, mut reader) = RingQueue::with_capacity(256).unwrap();
//! writer.push(7u32);
//! assert_eq!(reader.pull_next(), Some(7));
//! assert_eq!(reader.pull_next(), None);
//! ```

mod ring;

pub use ring::{QueueReader, QueueWriter, RingQueue};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Capacity used by the handoff queues unless configured otherwise
pub const DEFAULT_QUEUE_CAPACITY: usize = 256;

/// Staging slots pre-reserved for realtime producers
pub const DEFAULT_STAGING_CAPACITY: usize = 64;

/// Errors raised when constructing a queue
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum QueueError {
    /// Capacity must be a non-zero power of two no larger than 2^31
    #[error("Queue capacity must be a power of two in 1..=2^31, got {0}")]
    InvalidCapacity(usize),
}

/// Queue sizing, part of [`crate::config::CoreConfig`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct QueueConfig {
    /// Ring capacity (power of two)
    pub capacity: usize,
    /// Initial staging list capacity for each writer
    pub staging_capacity: usize,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_QUEUE_CAPACITY,
            staging_capacity: DEFAULT_STAGING_CAPACITY,
        }
    }
}
