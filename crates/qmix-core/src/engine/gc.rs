//! Deferred deallocation for render buffers
//!
//! The device callback must never free memory. When the recycle queue is
//! full it discards the buffer it just played; that buffer's storage is a
//! `basedrop::Owned`, so dropping it only enqueues a pointer and the actual
//! `free` happens on the collector thread started here.
//!
//! ```ignore
//! use basedrop::Owned;
//! use crate::engine::gc_handle;
//!
//! let storage = Owned::new(&gc_handle(), vec![0.0f32; 256]);
//! drop(storage); // queued for the collector thread
//! ```

use basedrop::{Collector, Handle};
use std::sync::mpsc;
use std::sync::OnceLock;
use std::thread;
use std::time::Duration;

/// Global handle for creating `Owned<T>` allocations
static GC_HANDLE: OnceLock<Handle> = OnceLock::new();

/// How often the collector thread reclaims deferred drops
const COLLECT_INTERVAL: Duration = Duration::from_millis(100);

/// Spawn the collector thread and return a handle to it
fn init_gc() -> Handle {
    let (tx, rx) = mpsc::channel();

    thread::Builder::new()
        .name("qmix-gc".to_string())
        .spawn(move || {
            // Collector is !Sync, so it lives on this thread only
            let mut collector = Collector::new();
            tx.send(collector.handle()).expect("Failed to send GC handle");

            log::debug!("Render buffer collector thread started");

            loop {
                collector.collect();
                thread::sleep(COLLECT_INTERVAL);
            }
        })
        .expect("Failed to spawn render buffer collector thread");

    rx.recv().expect("Failed to receive GC handle")
}

/// Get a handle for creating `Owned<T>` allocations
///
/// The first call starts the collector thread; the render thread calls this
/// when it has to allocate a fresh buffer, never the device callback.
pub fn gc_handle() -> Handle {
    GC_HANDLE.get_or_init(init_gc).clone()
}
