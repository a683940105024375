//! Cooperative cancellation flag
//!
//! Task bodies cannot be interrupted. A caller that loses interest marks the
//! token; the task's cleanup dependent checks it and releases the result
//! instead of publishing it.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Shared "cancelled" flag, cheap to clone into task closures
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}
