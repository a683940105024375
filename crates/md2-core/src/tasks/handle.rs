//! Generation-checked task handles
//!
//! ```text
//!  31        24 23                      0
//! ┌────────────┬─────────────────────────┐
//! │ generation │       slot index        │
//! └────────────┴─────────────────────────┘
//! ```
//!
//! Generations start at 1 and skip 0 on wrap, so a live handle is never
//! all-zero and [`TaskHandle::NULL`] can mean "no task".

use std::fmt;

const INDEX_BITS: u32 = 24;
const INDEX_MASK: u32 = (1 << INDEX_BITS) - 1;

/// Maximum number of task slots the arena can address
pub const MAX_TASKS: usize = 1 << INDEX_BITS;

/// Opaque reference to a task slot, validated by value comparison
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct TaskHandle(u32);

impl TaskHandle {
    /// Reserved handle: allocation failed / no task
    pub const NULL: TaskHandle = TaskHandle(0);

    pub(crate) fn new(generation: u8, index: usize) -> Self {
        debug_assert!(generation != 0, "generation 0 is reserved");
        debug_assert!(index < MAX_TASKS, "task index {index} out of range");
        Self((u32::from(generation) << INDEX_BITS) | (index as u32 & INDEX_MASK))
    }

    /// Slot index in the arena
    pub fn index(self) -> usize {
        (self.0 & INDEX_MASK) as usize
    }

    pub fn generation(self) -> u8 {
        (self.0 >> INDEX_BITS) as u8
    }

    pub fn is_null(self) -> bool {
        self.0 == 0
    }

    pub fn to_raw(self) -> u32 {
        self.0
    }

    pub fn from_raw(raw: u32) -> Self {
        Self(raw)
    }
}

impl fmt::Debug for TaskHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_null() {
            return write!(f, "TaskHandle(NULL)");
        }
        write!(f, "TaskHandle({}@{})", self.index(), self.generation())
    }
}

impl fmt::Display for TaskHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "task #{} (gen {})", self.index(), self.generation())
    }
}

/// Generation for the next occupant of a recycled slot
pub(crate) fn next_generation(generation: u8) -> u8 {
    match generation.wrapping_add(1) {
        0 => 1,
        next => next,
    }
}
