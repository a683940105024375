//! Process-wide scheduler
//!
//! Free functions over a single [`TaskScheduler`] for code that does not
//! want to thread a spawner through every call site. Rejected operations are
//! logged here and returned to the caller. Stale handles and self-dependencies
//! are caller bugs and additionally trip a `debug_assert!`; release builds
//! only log them.

use std::sync::{Mutex, PoisonError};

use super::{SchedulerConfig, TaskError, TaskHandle, TaskResult, TaskScheduler, TaskSpawner};

static SCHEDULER: Mutex<Option<TaskScheduler>> = Mutex::new(None);

fn spawner() -> Option<TaskSpawner> {
    SCHEDULER
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .as_ref()
        .map(TaskScheduler::spawner)
}

/// Start the process-wide worker with default settings
pub fn init() -> TaskResult<()> {
    init_with(SchedulerConfig::default())
}

pub fn init_with(config: SchedulerConfig) -> TaskResult<()> {
    let mut scheduler = SCHEDULER.lock().unwrap_or_else(PoisonError::into_inner);
    if scheduler.is_some() {
        log::error!("Task scheduler already initialized");
        return Err(TaskError::AlreadyInitialized);
    }
    *scheduler = Some(TaskScheduler::start(config)?);
    Ok(())
}

/// Stop the process-wide worker and join it
pub fn deinit() {
    // Take it out first: joining while holding the lock would deadlock a
    // task body that calls back into this module.
    let scheduler = SCHEDULER
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .take();
    match scheduler {
        Some(mut scheduler) => scheduler.shutdown(),
        None => log::warn!("Task scheduler deinit without init"),
    }
}

/// Create a task; returns [`TaskHandle::NULL`] when uninitialized or full
pub fn create<F>(body: F) -> TaskHandle
where
    F: FnOnce() + Send + 'static,
{
    match spawner() {
        Some(spawner) => spawner.create(body),
        None => {
            log::error!("Task created before scheduler init");
            TaskHandle::NULL
        }
    }
}

fn rejected(operation: std::fmt::Arguments<'_>, error: &TaskError) {
    log::error!("{} rejected: {}", operation, error);
    debug_assert!(
        !matches!(error, TaskError::StaleHandle(_) | TaskError::SelfDependency(_)),
        "{} rejected: {}",
        operation,
        error
    );
}

pub fn depends(task: TaskHandle, dependent: TaskHandle) -> TaskResult<()> {
    let result = spawner()
        .ok_or(TaskError::NotRunning)
        .and_then(|spawner| spawner.depends(task, dependent));
    if let Err(e) = &result {
        rejected(format_args!("depends({:?}, {:?})", task, dependent), e);
    }
    result
}

pub fn start(task: TaskHandle) -> TaskResult<()> {
    let result = spawner()
        .ok_or(TaskError::NotRunning)
        .and_then(|spawner| spawner.start(task));
    if let Err(e) = &result {
        rejected(format_args!("start({:?})", task), e);
    }
    result
}

pub fn task_exists(task: TaskHandle) -> bool {
    spawner().is_some_and(|spawner| spawner.task_exists(task))
}
