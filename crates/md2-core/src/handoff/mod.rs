//! Double-buffered state handoff between a realtime callback and the UI
//!
//! Two [`RingQueue`]s and a two-slot nursery let the UI thread hand the
//! realtime thread a complete new snapshot every frame, without the realtime
//! side ever locking, blocking or allocating:
//!
//! ```text
//!                  to-realtime: Box<Slot<S>>
//! ┌──────────────┐ ─────────────────────────────────────► ┌──────────────────┐
//! │ Handoff      │                                        │ Handoff          │
//! │ Producer     │                                        │ Consumer         │
//! │ (UI thread)  │ ◄───────────────────────────────────── │ (audio callback) │
//! └──────────────┘   from-realtime: Acknowledgement       └──────────────────┘
//!                    { live_slot, retired slot, report }
//! ```
//!
//! Each nursery slot is an owned `Box<Slot<S>>`. Whoever holds the box owns
//! the slot; the only way a slot changes hands is by travelling through one
//! of the queues. The consumer reads (and may scribble on) its live slot,
//! the producer writes its free slot, and neither can observe the other's.
//!
//! # Cycle
//!
//! 1. Producer drains acknowledgements: recovers slots the consumer moved
//!    off and remembers the latest report.
//! 2. Producer copies the new snapshot into its free slot and pushes it.
//! 3. Consumer, at the top of its callback, drains every pushed slot and
//!    keeps only the newest (last write wins). Superseded slots, including
//!    the one it was reading, go back in acknowledgements.
//! 4. Consumer, at the end of its callback, acknowledges its live slot and
//!    attaches a report (e.g. playback position).
//!
//! If the producer publishes again before any slot came back, it mints an
//! overflow slot rather than touching a slot the consumer may be reading.
//! Once the to-realtime ring is full the newest slot sits in the producer's
//! own staging list, and further publishes overwrite it in place, so a
//! stalled consumer holds at most `capacity + 2` slots. Overflow slots are
//! retired when they return, so the nursery settles back to exactly two
//! slots. The consumer never drops a slot itself.
//!
//! Until the first publish the consumer keeps using the initial snapshot
//! (slot 0), which callers make neutral (silence).

use crate::queue::{QueueConfig, QueueError, QueueReader, QueueWriter, RingQueue};

/// Slots that exist in steady state
pub const NURSERY_SLOTS: usize = 2;

/// One nursery slot: a snapshot plus its identity
#[derive(Debug, Clone)]
pub struct Slot<S> {
    id: u32,
    pub state: S,
}

impl<S> Slot<S> {
    pub fn id(&self) -> u32 {
        self.id
    }
}

/// Message from the realtime side back to the producer
pub struct Acknowledgement<S, R> {
    /// Slot the consumer is reading now
    pub live_slot: u32,
    /// Slot the consumer moved off, returned to the producer
    pub retired: Option<Box<Slot<S>>>,
    /// Latest observation from the realtime side
    pub report: R,
}

/// Constructor for a connected producer/consumer pair
pub struct StateHandoff;

impl StateHandoff {
    /// Create the handoff with `initial` as the consumer's first live snapshot
    pub fn new<S, R>(
        initial: S,
        config: &QueueConfig,
    ) -> Result<(HandoffProducer<S, R>, HandoffConsumer<S, R>), QueueError>
    where
        S: Clone + Send,
        R: Copy + Send + Default,
    {
        let (to_realtime, from_ui) = RingQueue::from_config(config)?;
        let (mut to_ui, from_realtime) = RingQueue::from_config(config)?;
        // A consumer catching up after a stall retires one slot per
        // acknowledgement; keep those pushes off the allocator.
        to_ui.reserve_staging(config.capacity + NURSERY_SLOTS);

        let free = Box::new(Slot { id: 1, state: initial.clone() });
        let live = Box::new(Slot { id: 0, state: initial });

        let producer = HandoffProducer {
            to_realtime,
            from_realtime,
            free: Some(free),
            live_slot: 0,
            last_report: None,
            next_slot_id: NURSERY_SLOTS as u32,
            slot_count: NURSERY_SLOTS,
        };
        let consumer = HandoffConsumer {
            from_ui,
            to_ui,
            live,
            report: R::default(),
        };
        Ok((producer, consumer))
    }
}

// ────────────────────────────────────────────────────────────────────────────────
// Producer (non-realtime side)
// ────────────────────────────────────────────────────────────────────────────────

/// UI-side endpoint: publishes snapshots, receives acknowledgements
pub struct HandoffProducer<S, R> {
    to_realtime: QueueWriter<Box<Slot<S>>>,
    from_realtime: QueueReader<Acknowledgement<S, R>>,
    /// Slot the consumer has handed back and will not read again
    free: Option<Box<Slot<S>>>,
    /// Most recently acknowledged live slot
    live_slot: u32,
    last_report: Option<R>,
    next_slot_id: u32,
    /// Slots currently in existence, wherever they are
    slot_count: usize,
}

impl<S: Clone, R: Copy> HandoffProducer<S, R> {
    /// Publish a complete snapshot and return the latest realtime report
    ///
    /// Returns `None` until the realtime side has acknowledged at least once.
    pub fn publish(&mut self, state: &S) -> Option<R> {
        self.collect_acknowledgements();

        // Ring full: the newest staged slot is still ours, reuse it
        if let Some(staged) = self.to_realtime.staged_mut().next_back() {
            staged.state.clone_from(state);
            return self.last_report;
        }

        let slot = match self.free.take() {
            Some(mut slot) => {
                slot.state.clone_from(state);
                slot
            }
            None => self.mint_slot(state),
        };
        self.to_realtime.push(slot);
        self.last_report
    }

    /// Drain acknowledgements without publishing
    pub fn poll(&mut self) -> Option<R> {
        self.collect_acknowledgements();
        self.last_report
    }

    /// Latest report received, if any
    pub fn latest_report(&self) -> Option<R> {
        self.last_report
    }

    /// Slot most recently acknowledged as live by the realtime side
    pub fn live_slot(&self) -> u32 {
        self.live_slot
    }

    /// Whether the next publish can reuse a nursery slot
    pub fn has_free_slot(&self) -> bool {
        self.free.is_some()
    }

    /// Number of slots in existence (2 in steady state)
    pub fn slot_count(&self) -> usize {
        self.slot_count
    }

    fn collect_acknowledgements(&mut self) {
        self.to_realtime.flush();
        while let Some(ack) = self.from_realtime.pull_next() {
            self.live_slot = ack.live_slot;
            self.last_report = Some(ack.report);
            if let Some(retired) = ack.retired {
                self.recycle(retired);
            }
        }
    }

    fn recycle(&mut self, slot: Box<Slot<S>>) {
        if self.free.is_none() {
            self.free = Some(slot);
            return;
        }
        // Surplus from an earlier overflow
        log::debug!("handoff: retiring surplus slot {}", slot.id);
        self.slot_count -= 1;
        drop(slot);
    }

    fn mint_slot(&mut self, state: &S) -> Box<Slot<S>> {
        let id = self.next_slot_id;
        self.next_slot_id = self.next_slot_id.wrapping_add(1).max(NURSERY_SLOTS as u32);
        self.slot_count += 1;
        log::debug!(
            "handoff: no acknowledged slot, minting overflow slot {} ({} in flight)",
            id,
            self.slot_count
        );
        Box::new(Slot { id, state: state.clone() })
    }
}

// ────────────────────────────────────────────────────────────────────────────────
// Consumer (realtime side)
// ────────────────────────────────────────────────────────────────────────────────

/// Realtime-side endpoint: adopts the newest snapshot, acknowledges it
///
/// Nothing here locks or blocks. Nothing allocates as long as the
/// acknowledgement ring has room or the writer's staging reserve holds out.
pub struct HandoffConsumer<S, R> {
    from_ui: QueueReader<Box<Slot<S>>>,
    to_ui: QueueWriter<Acknowledgement<S, R>>,
    live: Box<Slot<S>>,
    report: R,
}

impl<S, R: Copy> HandoffConsumer<S, R> {
    /// Adopt the newest published snapshot (if any) and return it
    pub fn begin_cycle(&mut self) -> &mut S {
        while let Some(incoming) = self.from_ui.pull_next() {
            let retired = std::mem::replace(&mut self.live, incoming);
            self.to_ui.push(Acknowledgement {
                live_slot: self.live.id,
                retired: Some(retired),
                report: self.report,
            });
        }
        &mut self.live.state
    }

    /// Acknowledge the live slot and send `report` back
    ///
    /// Acknowledgements still staged (UI not draining) are updated in place
    /// instead of queueing another message.
    pub fn end_cycle(&mut self, report: R) {
        self.report = report;
        let live_slot = self.live.id;

        self.to_ui.flush();
        if self.to_ui.staged_len() > 0 {
            for ack in self.to_ui.staged_mut() {
                ack.live_slot = live_slot;
                ack.report = report;
            }
        } else {
            self.to_ui.push(Acknowledgement {
                live_slot,
                retired: None,
                report,
            });
        }
    }

    /// Current live snapshot without draining
    pub fn state(&self) -> &S {
        &self.live.state
    }

    pub fn live_slot(&self) -> u32 {
        self.live.id
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;

    fn pair<S: Clone + Send>(initial: S) -> (HandoffProducer<S, u64>, HandoffConsumer<S, u64>) {
        StateHandoff::new(initial, &QueueConfig::default()).unwrap()
    }

    #[test]
    fn test_initial_state_without_publish() {
        let (mut producer, mut consumer) = pair(0u32);
        for cycle in 0..10 {
            assert_eq!(*consumer.begin_cycle(), 0);
            consumer.end_cycle(cycle);
        }
        assert_eq!(consumer.live_slot(), 0);
        assert_eq!(producer.poll(), Some(9));
    }

    #[test]
    fn test_no_report_before_first_acknowledgement() {
        let (mut producer, _consumer) = pair(0u32);
        assert_eq!(producer.publish(&1), None);
        assert_eq!(producer.latest_report(), None);
    }

    #[test]
    fn test_lockstep_cycles_alternate_two_slots() {
        let (mut producer, mut consumer) = pair(0u32);
        let mut seen_slots = Vec::new();

        for frame in 1..=20u32 {
            producer.publish(&frame);
            assert_eq!(*consumer.begin_cycle(), frame);
            seen_slots.push(consumer.live_slot());
            consumer.end_cycle(u64::from(frame));
        }

        producer.poll();
        assert_eq!(producer.slot_count(), NURSERY_SLOTS);
        assert_eq!(producer.live_slot(), consumer.live_slot());
        assert!(seen_slots.iter().all(|id| *id < NURSERY_SLOTS as u32));
        assert!(seen_slots.windows(2).all(|w| w[0] != w[1]));
    }

    #[test]
    fn test_latest_of_many_unacknowledged_publishes_wins() {
        let (mut producer, mut consumer) = pair(0u32);

        for frame in 1..=25u32 {
            producer.publish(&frame);
        }
        assert_eq!(*consumer.begin_cycle(), 25);
        consumer.end_cycle(1);

        // Every superseded slot comes back; the surplus is retired
        producer.publish(&26);
        assert!(producer.slot_count() <= 3);
        assert_eq!(*consumer.begin_cycle(), 26);
        consumer.end_cycle(2);
        producer.poll();
        assert_eq!(producer.slot_count(), NURSERY_SLOTS);
        assert!(producer.has_free_slot());
    }

    #[test]
    fn test_stalled_consumer_bounds_slot_count() {
        let config = QueueConfig::default();
        let (mut producer, mut consumer) = pair(0u32);

        for frame in 1..=10_000u32 {
            producer.publish(&frame);
        }
        assert_eq!(producer.slot_count(), config.capacity + NURSERY_SLOTS);

        // Ring holds frames 1..=256; 10_000 waits in the producer's staging
        assert_eq!(*consumer.begin_cycle(), config.capacity as u32);
        consumer.end_cycle(1);
        assert!(consumer.to_ui.staged_len() <= config.capacity + NURSERY_SLOTS);

        producer.publish(&10_001);
        assert_eq!(*consumer.begin_cycle(), 10_001);
        consumer.end_cycle(2);
        producer.poll();
        assert_eq!(producer.slot_count(), NURSERY_SLOTS);
    }

    #[test]
    fn test_published_slot_never_shared() {
        let (mut producer, mut consumer) = pair(vec![0u8; 4]);

        producer.publish(&vec![1; 4]);
        let live = consumer.begin_cycle();
        // Consumer writes into its live slot
        live[0] = 99;
        consumer.end_cycle(0);

        producer.publish(&vec![2; 4]);
        assert_eq!(consumer.state(), &vec![99, 1, 1, 1]);
        assert_eq!(consumer.begin_cycle(), &vec![2; 4]);
    }

    #[test]
    fn test_reports_coalesce_while_ui_not_draining() {
        let config = QueueConfig { capacity: 4, staging_capacity: 4 };
        let (mut producer, mut consumer) =
            StateHandoff::new::<u32, u64>(0, &config).unwrap();

        for cycle in 0..1000u64 {
            consumer.begin_cycle();
            consumer.end_cycle(cycle);
        }
        // Ring full, one staged ack carrying the newest report
        assert_eq!(consumer.to_ui.staged_len(), 1);
        producer.poll();
        consumer.begin_cycle();
        consumer.end_cycle(1000);
        assert_eq!(producer.poll(), Some(1000));
    }

    #[derive(Clone)]
    struct Frame {
        generation: u64,
        payload: [u64; 64],
    }

    impl Frame {
        fn new(generation: u64) -> Self {
            Self { generation, payload: [generation; 64] }
        }
    }

    #[test]
    fn test_no_torn_reads_across_threads() {
        let (mut producer, mut consumer) = pair(Frame::new(0));
        let done = Arc::new(AtomicBool::new(false));
        let done_rt = done.clone();

        let realtime = std::thread::spawn(move || {
            let mut last_seen = 0;
            let mut cycles = 0u64;
            while !done_rt.load(Ordering::Acquire) || cycles < 1000 {
                let frame = consumer.begin_cycle();
                assert!(frame.payload.iter().all(|v| *v == frame.generation));
                assert!(frame.generation >= last_seen);
                last_seen = frame.generation;
                consumer.end_cycle(last_seen);
                cycles += 1;
            }
            last_seen
        });

        for generation in 1..=20_000 {
            producer.publish(&Frame::new(generation));
        }
        done.store(true, Ordering::Release);
        let last_seen = realtime.join().unwrap();

        assert!(last_seen <= 20_000);
        assert!(producer.poll().unwrap_or(0) <= 20_000);
    }
}
