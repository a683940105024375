//! Deferred deallocation for clip data
//!
//! Clip buffers reach the realtime thread inside [`AudioState`] snapshots.
//! Whichever thread drops the last reference, the memory must not be freed
//! on the audio callback. Clips are therefore wrapped in
//! `basedrop::Shared`, whose final drop only enqueues the pointer; a
//! dedicated collector thread frees it later.
//!
//! ```ignore
//! use basedrop::Shared;
//! use md2_core::engine::gc::gc_handle;
//!
//! let clip = Shared::new(&gc_handle(), StereoClip::default());
//! ```
//!
//! [`AudioState`]: super::AudioState

use basedrop::{Collector, Handle};
use std::sync::mpsc;
use std::sync::OnceLock;
use std::thread;
use std::time::Duration;

/// How often the collector frees queued allocations
const COLLECT_INTERVAL: Duration = Duration::from_millis(50);

static GC_HANDLE: OnceLock<Handle> = OnceLock::new();

fn spawn_collector() -> Handle {
    let (handle_tx, handle_rx) = mpsc::sync_channel(1);

    thread::Builder::new()
        .name("md2-gc".to_string())
        .spawn(move || {
            // Collector is !Sync; it must be created on the thread that runs it
            let mut collector = Collector::new();
            handle_tx
                .send(collector.handle())
                .expect("GC handle receiver dropped");
            log::info!("Clip collector thread started");

            loop {
                collector.collect();
                thread::sleep(COLLECT_INTERVAL);
            }
        })
        .expect("Failed to spawn clip collector thread");

    handle_rx.recv().expect("Clip collector exited before handing out a handle")
}

/// Handle for allocating `Shared<T>` values freed off the realtime thread
///
/// The collector thread is started on first use and lives for the rest of
/// the process.
pub fn gc_handle() -> Handle {
    GC_HANDLE.get_or_init(spawn_collector).clone()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{StereoClip, StereoSample};
    use basedrop::Shared;

    #[test]
    fn test_shared_clip_clones_and_drops() {
        let clip = Shared::new(
            &gc_handle(),
            StereoClip::new(vec![StereoSample::mono(0.5); 16], 48000),
        );
        let other = Shared::clone(&clip);
        assert_eq!(other.len(), 16);
        drop(clip);
        assert_eq!(other.frames()[3], StereoSample::mono(0.5));
    }
}
