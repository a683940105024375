//! Task scheduler error types

use thiserror::Error;

use super::TaskHandle;

/// Rejected scheduler operations
///
/// These are protocol violations by the caller; the scheduler refuses the
/// operation and leaves its state untouched.
#[derive(Error, Debug)]
pub enum TaskError {
    /// Handle is null, out of range, or its slot was recycled/completed
    #[error("Stale or invalid task handle: {0:?}")]
    StaleHandle(TaskHandle),

    /// A task cannot be its own dependent
    #[error("Task cannot depend on itself: {0:?}")]
    SelfDependency(TaskHandle),

    /// Task was already started
    #[error("Task already started: {0:?}")]
    AlreadyStarted(TaskHandle),

    /// Worker thread has been shut down
    #[error("Task scheduler is not running")]
    NotRunning,

    /// Process-wide scheduler was initialized twice
    #[error("Task scheduler already initialized")]
    AlreadyInitialized,

    /// Failed to spawn the worker thread
    #[error("Failed to spawn task worker thread: {0}")]
    Spawn(#[source] std::io::Error),
}

/// Result type for scheduler operations
pub type TaskResult<T> = Result<T, TaskError>;
