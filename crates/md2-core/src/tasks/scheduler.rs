//! Task arena and worker thread
//!
//! ```text
//!  any thread                         worker thread ("md2-tasks")
//!  ──────────                         ───────────────────────────
//!  create(body) ──► arena slot        loop {
//!  depends(a, b)    (Mutex)             drain inbox ─┐
//!  start(a) ─────► inbox ───────────►   take body   │ arena lock
//!                  (Mutex<Vec>)         run body      (no lock held)
//!                                       start dependents, tombstone
//!                                       sleep(poll_interval)
//!                                     }
//! ```
//!
//! A task's dependents are read when its body *returns*, so edges added
//! while the body is running are still honoured. A dependent with several
//! parents starts when the first parent finishes; later activations are
//! ignored. Cycles are not detected: a cycle never starts on its own and its
//! slots stay allocated until the process exits.

use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use super::handle::{next_generation, MAX_TASKS};
use super::{SchedulerConfig, TaskError, TaskHandle, TaskResult};

/// Boxed task body, run exactly once on the worker thread
pub type TaskBody = Box<dyn FnOnce() + Send + 'static>;

// ───────────────────────────────────────────────────────────────────────────
// Arena
// ───────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SlotState {
    /// Tombstoned, available for reuse
    Free,
    /// Created, not yet started
    Pending,
    /// In the worker inbox
    Scheduled,
    /// Body currently executing
    Running,
}

struct TaskSlot {
    handle: TaskHandle,
    state: SlotState,
    body: Option<TaskBody>,
    dependents: Vec<TaskHandle>,
}

#[derive(Default)]
struct TaskArena {
    slots: Vec<TaskSlot>,
}

impl TaskArena {
    fn allocate(&mut self, body: TaskBody) -> TaskHandle {
        if let Some((index, slot)) = self
            .slots
            .iter_mut()
            .enumerate()
            .find(|(_, slot)| slot.state == SlotState::Free)
        {
            slot.handle = TaskHandle::new(next_generation(slot.handle.generation()), index);
            slot.state = SlotState::Pending;
            slot.body = Some(body);
            slot.dependents.clear();
            return slot.handle;
        }

        let index = self.slots.len();
        if index >= MAX_TASKS {
            return TaskHandle::NULL;
        }
        let handle = TaskHandle::new(1, index);
        self.slots.push(TaskSlot {
            handle,
            state: SlotState::Pending,
            body: Some(body),
            dependents: Vec::new(),
        });
        handle
    }

    fn get(&self, handle: TaskHandle) -> Option<&TaskSlot> {
        if handle.is_null() {
            return None;
        }
        self.slots
            .get(handle.index())
            .filter(|slot| slot.handle == handle && slot.state != SlotState::Free)
    }

    fn get_mut(&mut self, handle: TaskHandle) -> Option<&mut TaskSlot> {
        if handle.is_null() {
            return None;
        }
        self.slots
            .get_mut(handle.index())
            .filter(|slot| slot.handle == handle && slot.state != SlotState::Free)
    }

    fn live_count(&self) -> usize {
        self.slots
            .iter()
            .filter(|slot| slot.state != SlotState::Free)
            .count()
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    // Bodies run outside every lock, so poisoning can only come from a bug
    // in this module; the protected data is still consistent.
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

// ───────────────────────────────────────────────────────────────────────────
// Shared state
// ───────────────────────────────────────────────────────────────────────────

struct Shared {
    arena: Mutex<TaskArena>,
    inbox: Mutex<Vec<TaskHandle>>,
    running: AtomicBool,
}

impl Shared {
    fn create(&self, body: TaskBody) -> TaskHandle {
        let handle = lock(&self.arena).allocate(body);
        if handle.is_null() {
            log::error!("Task arena exhausted ({} slots)", MAX_TASKS);
        }
        handle
    }

    fn depends(&self, task: TaskHandle, dependent: TaskHandle) -> TaskResult<()> {
        if task == dependent {
            return Err(TaskError::SelfDependency(task));
        }
        let mut arena = lock(&self.arena);
        if arena.get(dependent).is_none() {
            return Err(TaskError::StaleHandle(dependent));
        }
        let slot = arena.get_mut(task).ok_or(TaskError::StaleHandle(task))?;
        slot.dependents.push(dependent);
        Ok(())
    }

    fn start(&self, task: TaskHandle) -> TaskResult<()> {
        if !self.running.load(Ordering::Acquire) {
            return Err(TaskError::NotRunning);
        }
        {
            let mut arena = lock(&self.arena);
            let slot = arena.get_mut(task).ok_or(TaskError::StaleHandle(task))?;
            if slot.state != SlotState::Pending {
                return Err(TaskError::AlreadyStarted(task));
            }
            slot.state = SlotState::Scheduled;
        }
        lock(&self.inbox).push(task);
        Ok(())
    }

    fn discard(&self, task: TaskHandle) -> bool {
        let body = {
            let mut arena = lock(&self.arena);
            match arena.get_mut(task) {
                Some(slot) if slot.state == SlotState::Pending => {
                    slot.state = SlotState::Free;
                    slot.dependents.clear();
                    slot.body.take()
                }
                _ => return false,
            }
        };
        // Dropped outside the lock: the body may own anything
        drop(body);
        true
    }

    fn task_exists(&self, task: TaskHandle) -> bool {
        lock(&self.arena).get(task).is_some()
    }

    fn pending_count(&self) -> usize {
        lock(&self.arena).live_count()
    }

    fn run(&self, task: TaskHandle) {
        let body = {
            let mut arena = lock(&self.arena);
            match arena.get_mut(task) {
                Some(slot) if slot.state == SlotState::Scheduled => {
                    slot.state = SlotState::Running;
                    slot.body.take()
                }
                _ => {
                    log::warn!("Skipping {}: no longer scheduled", task);
                    return;
                }
            }
        };

        if let Some(body) = body {
            if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(body)) {
                log::error!("{} panicked: {}", task, panic_message(payload.as_ref()));
            }
        }

        let dependents = {
            let mut arena = lock(&self.arena);
            match arena.get_mut(task) {
                Some(slot) => {
                    slot.state = SlotState::Free;
                    std::mem::take(&mut slot.dependents)
                }
                None => Vec::new(),
            }
        };

        for dependent in dependents {
            if let Err(e) = self.start(dependent) {
                log::debug!("Dependent of {} not started: {}", task, e);
            }
        }
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> &str {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.as_str()
    } else {
        "<non-string panic payload>"
    }
}

fn worker_loop(shared: Arc<Shared>, poll_interval: Duration) {
    log::info!("Task worker started");
    let mut batch = Vec::new();

    while shared.running.load(Ordering::Acquire) {
        std::mem::swap(&mut batch, &mut *lock(&shared.inbox));
        for task in batch.drain(..) {
            shared.run(task);
        }
        thread::sleep(poll_interval);
    }

    let abandoned = lock(&shared.inbox).len();
    if abandoned > 0 {
        log::warn!("Task worker stopping with {} queued tasks", abandoned);
    }
    log::info!("Task worker stopped");
}

// ───────────────────────────────────────────────────────────────────────────
// Public API
// ───────────────────────────────────────────────────────────────────────────

/// Cloneable handle for creating and wiring tasks from any thread
///
/// Task bodies capture one of these to schedule follow-up work.
#[derive(Clone)]
pub struct TaskSpawner {
    shared: Arc<Shared>,
}

impl TaskSpawner {
    /// Allocate a task without starting it
    ///
    /// Returns [`TaskHandle::NULL`] if the arena is exhausted.
    pub fn create<F>(&self, body: F) -> TaskHandle
    where
        F: FnOnce() + Send + 'static,
    {
        self.shared.create(Box::new(body))
    }

    /// Start `dependent` once `task`'s body has returned
    pub fn depends(&self, task: TaskHandle, dependent: TaskHandle) -> TaskResult<()> {
        self.shared.depends(task, dependent)
    }

    /// Queue `task` for execution on the worker thread
    pub fn start(&self, task: TaskHandle) -> TaskResult<()> {
        self.shared.start(task)
    }

    /// Free a task that was created but never started
    ///
    /// Its body is dropped without running. Returns `false` for stale handles
    /// and tasks that are already queued or running.
    pub(crate) fn discard(&self, task: TaskHandle) -> bool {
        self.shared.discard(task)
    }

    /// True while `task` is created, queued or running
    pub fn task_exists(&self, task: TaskHandle) -> bool {
        self.shared.task_exists(task)
    }

    /// Number of live (not yet completed) tasks
    pub fn pending_count(&self) -> usize {
        self.shared.pending_count()
    }
}

/// Owns the worker thread; dropping it stops the worker
pub struct TaskScheduler {
    spawner: TaskSpawner,
    worker: Option<JoinHandle<()>>,
}

impl TaskScheduler {
    /// Spawn the worker thread
    pub fn start(config: SchedulerConfig) -> TaskResult<Self> {
        let shared = Arc::new(Shared {
            arena: Mutex::new(TaskArena::default()),
            inbox: Mutex::new(Vec::new()),
            running: AtomicBool::new(true),
        });

        let poll_interval = Duration::from_millis(config.poll_interval_ms);
        let worker_shared = Arc::clone(&shared);
        let worker = thread::Builder::new()
            .name(config.thread_name.clone())
            .spawn(move || worker_loop(worker_shared, poll_interval))
            .map_err(TaskError::Spawn)?;

        log::info!(
            "Task scheduler started (thread '{}', poll {:?})",
            config.thread_name,
            poll_interval
        );

        Ok(Self {
            spawner: TaskSpawner { shared },
            worker: Some(worker),
        })
    }

    pub fn spawner(&self) -> TaskSpawner {
        self.spawner.clone()
    }

    pub fn create<F>(&self, body: F) -> TaskHandle
    where
        F: FnOnce() + Send + 'static,
    {
        self.spawner.create(body)
    }

    pub fn depends(&self, task: TaskHandle, dependent: TaskHandle) -> TaskResult<()> {
        self.spawner.depends(task, dependent)
    }

    pub fn start_task(&self, task: TaskHandle) -> TaskResult<()> {
        self.spawner.start(task)
    }

    pub fn task_exists(&self, task: TaskHandle) -> bool {
        self.spawner.task_exists(task)
    }

    pub fn pending_count(&self) -> usize {
        self.spawner.pending_count()
    }

    /// Stop the worker and wait for it to exit
    ///
    /// A body that is currently running finishes first. Queued tasks are
    /// abandoned.
    pub fn shutdown(&mut self) {
        let Some(worker) = self.worker.take() else {
            return;
        };
        self.spawner.shared.running.store(false, Ordering::Release);
        if worker.join().is_err() {
            log::error!("Task worker thread panicked");
        }
    }

    pub fn is_running(&self) -> bool {
        self.worker.is_some()
    }
}

impl Drop for TaskScheduler {
    fn drop(&mut self) {
        self.shutdown();
    }
}
