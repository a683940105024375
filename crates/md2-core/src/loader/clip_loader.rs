//! Task-based background loader
//!
//! Every load is two tasks chained on the scheduler:
//!
//! ```text
//!   work task ──(depends)──► finish task
//!   decode / scan            cancelled? ── yes ──► drop result
//!   stage result                  │
//!                                 no ──► publish to PendingLoad
//! ```
//!
//! The work task itself can't be interrupted; cancelling only decides what
//! the finish task does with the result.

use std::path::PathBuf;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use basedrop::Shared;
use crossbeam::channel::{self, Receiver, RecvTimeoutError, TryRecvError};

use super::scan::{scan_directory, LibraryScan};
use super::wav::decode_wav;
use super::{LoadError, LoadResult};
use crate::engine::gc::gc_handle;
use crate::tasks::{CancelToken, TaskResult, TaskSpawner};
use crate::types::StereoClip;

/// Result storage shared between the two tasks of one load
struct LoadSlot<T> {
    staged: Mutex<Option<LoadResult<T>>>,
}

impl<T> LoadSlot<T> {
    fn new() -> Self {
        Self {
            staged: Mutex::new(None),
        }
    }

    fn stage(&self, result: LoadResult<T>) {
        *self.staged.lock().unwrap_or_else(PoisonError::into_inner) = Some(result);
    }

    fn take(&self) -> Option<LoadResult<T>> {
        self.staged
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
    }
}

/// UI-side view of an in-flight load
pub struct PendingLoad<T> {
    done: Receiver<LoadResult<T>>,
    cancel: CancelToken,
    finished: bool,
}

impl<T> PendingLoad<T> {
    /// Take the result if the load has finished
    ///
    /// A load that ended without a result (cancelled, or the work task never
    /// staged one) reports [`LoadError::Incomplete`] once.
    pub fn try_take(&mut self) -> Option<LoadResult<T>> {
        if self.finished {
            return None;
        }
        match self.done.try_recv() {
            Ok(result) => {
                self.finished = true;
                Some(result)
            }
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Disconnected) => {
                self.finished = true;
                Some(Err(LoadError::Incomplete))
            }
        }
    }

    /// Block up to `timeout` for the result
    pub fn wait_timeout(&mut self, timeout: Duration) -> Option<LoadResult<T>> {
        if self.finished {
            return None;
        }
        match self.done.recv_timeout(timeout) {
            Ok(result) => {
                self.finished = true;
                Some(result)
            }
            Err(RecvTimeoutError::Timeout) => None,
            Err(RecvTimeoutError::Disconnected) => {
                self.finished = true;
                Some(Err(LoadError::Incomplete))
            }
        }
    }

    /// Ask the finish task to discard the result
    ///
    /// The work task still runs to completion if it has already started.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }
}

/// Schedules clip decodes and directory scans on the task scheduler
#[derive(Clone)]
pub struct ClipLoader {
    spawner: TaskSpawner,
}

impl ClipLoader {
    pub fn new(spawner: TaskSpawner) -> Self {
        Self { spawner }
    }

    /// Decode a WAV file into GC-managed clip data
    pub fn load_clip(&self, path: impl Into<PathBuf>) -> TaskResult<PendingLoad<Shared<StereoClip>>> {
        let path = path.into();
        log::debug!("Queueing clip load: {:?}", path);
        self.submit(move || decode_wav(&path).map(|clip| Shared::new(&gc_handle(), clip)))
    }

    /// List a library directory
    pub fn scan_directory(&self, root: impl Into<PathBuf>) -> TaskResult<PendingLoad<LibraryScan>> {
        let root = root.into();
        self.submit(move || scan_directory(&root))
    }

    fn submit<T, F>(&self, work: F) -> TaskResult<PendingLoad<T>>
    where
        T: Send + 'static,
        F: FnOnce() -> LoadResult<T> + Send + 'static,
    {
        let slot = Arc::new(LoadSlot::new());
        let cancel = CancelToken::new();
        let (done_tx, done_rx) = channel::bounded(1);

        let work_slot = Arc::clone(&slot);
        let work_task = self.spawner.create(move || work_slot.stage(work()));

        let finish_cancel = cancel.clone();
        let finish_task = self.spawner.create(move || {
            let Some(result) = slot.take() else {
                log::warn!("Load finished without a staged result");
                return;
            };
            if finish_cancel.is_cancelled() {
                log::debug!("Discarding cancelled load result");
                drop(result);
                return;
            }
            // Receiver may be gone if the caller dropped its PendingLoad
            let _ = done_tx.send(result);
        });

        if let Err(e) = self
            .spawner
            .depends(work_task, finish_task)
            .and_then(|()| self.spawner.start(work_task))
        {
            // Neither task will run; free them so the closures are dropped
            self.spawner.discard(work_task);
            self.spawner.discard(finish_task);
            return Err(e);
        }

        Ok(PendingLoad {
            done: done_rx,
            cancel,
            finished: false,
        })
    }
}
