//! Ring storage plus the writer/reader halves
//!
//! Index discipline (both indices are free-running and wrap at 2^32):
//!
//! ```text
//! occupancy = writer_index - reader_index      (wrapping, always 0..=C)
//! slot      = index & (C - 1)
//! ```
//!
//! Producer: Acquire-load `reader_index`, write slots, Release-store `writer_index`.
//! Consumer: Acquire-load `writer_index`, read slot, Release-store `reader_index`.

use std::cell::UnsafeCell;
use std::mem::MaybeUninit;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use crossbeam::utils::CachePadded;

use super::{QueueConfig, QueueError};

const MAX_CAPACITY: usize = 1 << 31;

/// Fixed-capacity SPSC ring shared by one [`QueueWriter`] and one [`QueueReader`]
///
/// Slots in `[reader_index, writer_index)` hold initialized values; every
/// other slot is uninitialized.
pub struct RingQueue<T> {
    slots: Box<[UnsafeCell<MaybeUninit<T>>]>,
    mask: u32,
    /// Only the writer stores to this
    writer_index: CachePadded<AtomicU32>,
    /// Only the reader stores to this
    reader_index: CachePadded<AtomicU32>,
}

// SAFETY: the writer only touches slots outside [reader_index, writer_index)
// and the reader only touches slots inside it; the Release/Acquire pairs on
// the indices order slot writes before the matching reads.
unsafe impl<T: Send> Sync for RingQueue<T> {}
unsafe impl<T: Send> Send for RingQueue<T> {}

impl<T> RingQueue<T> {
    /// Create a queue and split it into its two halves
    pub fn with_capacity(capacity: usize) -> Result<(QueueWriter<T>, QueueReader<T>), QueueError> {
        Self::with_capacity_and_staging(capacity, 0)
    }

    /// Create a queue whose writer has `staging` pre-reserved staging slots
    pub fn with_capacity_and_staging(
        capacity: usize,
        staging: usize,
    ) -> Result<(QueueWriter<T>, QueueReader<T>), QueueError> {
        let queue = Arc::new(Self::new(capacity, 0)?);
        Ok(Self::split(queue, staging))
    }

    /// Create a queue sized from configuration
    pub fn from_config(config: &QueueConfig) -> Result<(QueueWriter<T>, QueueReader<T>), QueueError> {
        Self::with_capacity_and_staging(config.capacity, config.staging_capacity)
    }

    /// Queue whose indices start at `start` instead of zero
    #[cfg(test)]
    pub(crate) fn with_start_index(
        capacity: usize,
        start: u32,
    ) -> Result<(QueueWriter<T>, QueueReader<T>), QueueError> {
        let queue = Arc::new(Self::new(capacity, start)?);
        Ok(Self::split(queue, 0))
    }

    fn new(capacity: usize, start: u32) -> Result<Self, QueueError> {
        if !capacity.is_power_of_two() || capacity > MAX_CAPACITY {
            return Err(QueueError::InvalidCapacity(capacity));
        }
        let slots = (0..capacity)
            .map(|_| UnsafeCell::new(MaybeUninit::uninit()))
            .collect();
        Ok(Self {
            slots,
            mask: (capacity - 1) as u32,
            writer_index: CachePadded::new(AtomicU32::new(start)),
            reader_index: CachePadded::new(AtomicU32::new(start)),
        })
    }

    fn split(queue: Arc<Self>, staging: usize) -> (QueueWriter<T>, QueueReader<T>) {
        let writer = QueueWriter {
            queue: Arc::clone(&queue),
            staging: Vec::with_capacity(staging),
        };
        (writer, QueueReader { queue })
    }

    #[inline]
    fn capacity(&self) -> u32 {
        self.mask.wrapping_add(1)
    }

    /// Occupancy as seen from either side (a snapshot, the other side may move)
    #[inline]
    fn occupancy(&self) -> u32 {
        let writer_index = self.writer_index.load(Ordering::Acquire);
        let reader_index = self.reader_index.load(Ordering::Acquire);
        writer_index.wrapping_sub(reader_index)
    }

    #[inline]
    fn slot(&self, index: u32) -> *mut MaybeUninit<T> {
        self.slots[(index & self.mask) as usize].get()
    }
}

impl<T> Drop for RingQueue<T> {
    fn drop(&mut self) {
        let writer_index = *self.writer_index.get_mut();
        let mut index = *self.reader_index.get_mut();
        while index != writer_index {
            // SAFETY: slots in [reader_index, writer_index) are initialized and
            // both halves are gone (we hold the last reference).
            unsafe { (*self.slot(index)).assume_init_drop() };
            index = index.wrapping_add(1);
        }
    }
}

/// Producer half: a staging list in front of the ring
pub struct QueueWriter<T> {
    queue: Arc<RingQueue<T>>,
    /// FIFO of values not yet admitted into the ring
    staging: Vec<T>,
}

impl<T> QueueWriter<T> {
    /// Stage `value` and try to flush. Never fails, never blocks.
    ///
    /// Allocates only if the staging list has to grow.
    pub fn push(&mut self, value: T) {
        self.staging.push(value);
        self.flush();
    }

    /// Move as many staged values into the ring as currently fit
    ///
    /// Returns `true` if anything was enqueued by this call or is still
    /// staged, `false` when there was nothing to do.
    pub fn flush(&mut self) -> bool {
        if self.staging.is_empty() {
            return false;
        }

        let queue = &*self.queue;
        let writer_index = queue.writer_index.load(Ordering::Relaxed);
        let reader_index = queue.reader_index.load(Ordering::Acquire);
        let occupancy = writer_index.wrapping_sub(reader_index);
        debug_assert!(occupancy <= queue.capacity(), "ring occupancy {occupancy} exceeds capacity");

        let available = queue.capacity().saturating_sub(occupancy) as usize;
        let count = available.min(self.staging.len());
        for (offset, value) in self.staging.drain(..count).enumerate() {
            // SAFETY: the slot lies outside [reader_index, writer_index), so the
            // reader will not look at it until writer_index is published below.
            unsafe { (*queue.slot(writer_index.wrapping_add(offset as u32))).write(value) };
        }
        queue
            .writer_index
            .store(writer_index.wrapping_add(count as u32), Ordering::Release);

        count > 0 || !self.staging.is_empty()
    }

    /// Number of values waiting in the staging list
    pub fn staged_len(&self) -> usize {
        self.staging.len()
    }

    /// Staged values, oldest first, for in-place coalescing
    pub fn staged_mut(&mut self) -> std::slice::IterMut<'_, T> {
        self.staging.iter_mut()
    }

    /// Pre-size the staging list so `additional` pushes cannot allocate
    pub fn reserve_staging(&mut self, additional: usize) {
        self.staging.reserve(additional);
    }

    /// Number of values currently in the ring (excludes staged values)
    pub fn len(&self) -> usize {
        self.queue.occupancy() as usize
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.queue.capacity() as usize
    }
}

/// Consumer half
pub struct QueueReader<T> {
    queue: Arc<RingQueue<T>>,
}

impl<T> QueueReader<T> {
    /// Take the oldest value, or `None` when the ring is empty. Never blocks.
    pub fn pull_next(&mut self) -> Option<T> {
        let queue = &*self.queue;
        let reader_index = queue.reader_index.load(Ordering::Relaxed);
        let writer_index = queue.writer_index.load(Ordering::Acquire);
        let occupancy = writer_index.wrapping_sub(reader_index);
        if occupancy == 0 {
            return None;
        }
        debug_assert!(occupancy <= queue.capacity(), "ring occupancy {occupancy} exceeds capacity");

        // SAFETY: reader_index < writer_index (mod 2^32), the Acquire load above
        // synchronizes with the writer's Release store, so the slot is initialized.
        let value = unsafe { (*queue.slot(reader_index)).assume_init_read() };
        queue
            .reader_index
            .store(reader_index.wrapping_add(1), Ordering::Release);
        Some(value)
    }

    /// Number of values ready to pull
    pub fn len(&self) -> usize {
        self.queue.occupancy() as usize
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.queue.capacity() as usize
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    /// Small deterministic generator so schedules are reproducible
    struct XorShift(u32);

    impl XorShift {
        fn next(&mut self) -> u32 {
            let mut x = self.0;
            x ^= x << 13;
            x ^= x >> 17;
            x ^= x << 5;
            self.0 = x;
            x
        }
    }

    #[test]
    fn test_invalid_capacity_rejected() {
        assert_eq!(
            RingQueue::<u32>::with_capacity(0).err(),
            Some(QueueError::InvalidCapacity(0))
        );
        assert_eq!(
            RingQueue::<u32>::with_capacity(100).err(),
            Some(QueueError::InvalidCapacity(100))
        );
        assert!(RingQueue::<u32>::with_capacity(1).is_ok());
    }

    #[test]
    fn test_pull_from_empty_queue() {
        let (_writer, mut reader) = RingQueue::<u32>::with_capacity(8).unwrap();
        assert_eq!(reader.pull_next(), None);
        assert!(reader.is_empty());
    }

    #[test]
    fn test_overflow_goes_to_staging() {
        let (mut writer, mut reader) = RingQueue::with_capacity(256).unwrap();

        let mut next = 1u32;
        while writer.staged_len() == 0 {
            writer.push(next);
            next += 1;
        }
        // One value more than the ring holds
        assert_eq!(next - 1, 257);
        assert_eq!(writer.staged_len(), 1);
        assert_eq!(writer.len(), 256);

        assert_eq!(reader.pull_next(), Some(1));
        writer.push(next);
        next += 1;
        // The staged value moved in, the new one took its place
        assert_eq!(writer.staged_len(), 1);

        // Read everything else, flushing as room appears
        let mut expected = 2;
        loop {
            let read = reader.pull_next();
            if let Some(value) = read {
                assert_eq!(value, expected);
                expected += 1;
            }
            if !writer.flush() && read.is_none() {
                break;
            }
        }
        assert_eq!(expected, next);

        writer.push(next);
        assert_eq!(writer.staged_len(), 0);
    }

    #[test]
    fn test_flush_idempotent_when_nothing_staged() {
        let (mut writer, reader) = RingQueue::<u32>::with_capacity(4).unwrap();
        assert!(!writer.flush());
        assert!(!writer.flush());
        assert_eq!(writer.len(), 0);
        assert_eq!(reader.len(), 0);
    }

    #[test]
    fn test_flush_reports_remaining_when_full() {
        let (mut writer, _reader) = RingQueue::with_capacity(2).unwrap();
        writer.push(1u8);
        writer.push(2u8);
        writer.push(3u8);
        // Ring full, one staged: nothing enqueued but something remains
        assert!(writer.flush());
        assert_eq!(writer.staged_len(), 1);
    }

    #[test]
    fn test_fifo_under_random_schedule() {
        let (mut writer, mut reader) = RingQueue::with_capacity(16).unwrap();
        let mut rng = XorShift(0x9E37_79B9);
        let mut pushed = 0u64;
        let mut pulled = Vec::new();

        for _ in 0..10_000 {
            match rng.next() % 3 {
                0 => {
                    writer.push(pushed);
                    pushed += 1;
                }
                1 => {
                    writer.flush();
                }
                _ => {
                    if let Some(value) = reader.pull_next() {
                        pulled.push(value);
                    }
                }
            }
            assert!(reader.len() <= 16);
        }
        while writer.flush() {
            while let Some(value) = reader.pull_next() {
                pulled.push(value);
            }
        }
        while let Some(value) = reader.pull_next() {
            pulled.push(value);
        }

        let expected: Vec<u64> = (0..pushed).collect();
        assert_eq!(pulled, expected);
    }

    #[test]
    fn test_indices_wrap_at_u32_boundary() {
        let start = u32::MAX - 5;
        let (mut writer, mut reader) = RingQueue::with_start_index(8, start).unwrap();

        let mut expected = 0u32;
        for value in 0..64u32 {
            writer.push(value);
            assert!(writer.len() <= 8);
            if value % 3 == 0 {
                while let Some(read) = reader.pull_next() {
                    assert_eq!(read, expected);
                    expected += 1;
                }
                writer.flush();
            }
        }
        while writer.flush() || !reader.is_empty() {
            while let Some(read) = reader.pull_next() {
                assert_eq!(read, expected);
                expected += 1;
            }
        }
        assert_eq!(expected, 64);
        assert_eq!(writer.staged_len(), 0);
    }

    #[test]
    fn test_three_hundred_values_through_256_slots() {
        let (mut writer, mut reader) = RingQueue::with_capacity(256).unwrap();
        let mut pulled = Vec::with_capacity(300);

        for value in 0..300u32 {
            writer.push(value);
            if value % 10 == 9 {
                writer.flush();
                if let Some(read) = reader.pull_next() {
                    pulled.push(read);
                }
            }
        }
        while writer.flush() || !reader.is_empty() {
            while let Some(read) = reader.pull_next() {
                pulled.push(read);
            }
        }

        assert_eq!(pulled, (0..300).collect::<Vec<_>>());
        assert_eq!(writer.staged_len(), 0);
    }

    #[test]
    fn test_cross_thread_fifo() {
        const COUNT: u64 = 100_000;
        let (mut writer, mut reader) = RingQueue::with_capacity(64).unwrap();

        let producer = std::thread::spawn(move || {
            for value in 0..COUNT {
                writer.push(value);
            }
            while writer.flush() {
                std::thread::yield_now();
            }
        });

        let mut expected = 0;
        while expected < COUNT {
            match reader.pull_next() {
                Some(value) => {
                    assert_eq!(value, expected);
                    expected += 1;
                }
                None => std::thread::yield_now(),
            }
        }
        producer.join().unwrap();
        assert_eq!(reader.pull_next(), None);
    }

    #[test]
    fn test_staged_values_coalesce_in_place() {
        let (mut writer, _reader) = RingQueue::with_capacity(1).unwrap();
        writer.push(1u32);
        writer.push(2u32);
        writer.push(3u32);
        for value in writer.staged_mut() {
            *value *= 10;
        }
        assert_eq!(writer.staged_len(), 2);
        assert_eq!(writer.staged_mut().map(|v| *v).collect::<Vec<_>>(), vec![20, 30]);
    }

    #[test]
    fn test_unread_values_dropped_with_queue() {
        struct Counted(Arc<AtomicUsize>);
        impl Drop for Counted {
            fn drop(&mut self) {
                self.0.fetch_add(1, Ordering::SeqCst);
            }
        }

        let drops = Arc::new(AtomicUsize::new(0));
        {
            let (mut writer, mut reader) = RingQueue::with_capacity(4).unwrap();
            for _ in 0..6 {
                writer.push(Counted(drops.clone()));
            }
            drop(reader.pull_next());
            assert_eq!(drops.load(Ordering::SeqCst), 1);
        }
        // 3 left in the ring, 2 in staging
        assert_eq!(drops.load(Ordering::SeqCst), 6);
    }
}
