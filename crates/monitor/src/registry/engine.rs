//! Device monitor engine
//!
//! Owns the slot table and its registry lock, the injected event sink, and
//! the thread set (one discovery loop plus one reader loop per occupied
//! slot). The registry lock is only ever held for bounded bookkeeping,
//! never across a blocking transport call.

use crate::config::MonitorConfig;
use crate::registry::slots::SlotTable;
use crate::registry::{discovery, reader};
use common::transport::Transport;
use events::{EventSink, NormalizedEvent, SlotSummary};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::JoinHandle;
use tracing::{info, warn};

/// Shared state between the engine handle and its threads.
pub(crate) struct MonitorShared<T: Transport> {
    pub(crate) transport: T,
    pub(crate) config: MonitorConfig,
    pub(crate) sink: EventSink,
    pub(crate) table: Mutex<SlotTable<T::Link>>,
    pub(crate) stop: AtomicBool,
    pub(crate) readers: Mutex<Vec<JoinHandle<()>>>,
}

impl<T: Transport> MonitorShared<T> {
    pub(crate) fn table(&self) -> MutexGuard<'_, SlotTable<T::Link>> {
        self.table.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn stopping(&self) -> bool {
        self.stop.load(Ordering::Relaxed)
    }

    /// Tear down `index` if it still holds `link`, dispatching the
    /// Disconnection event when this call actually freed the slot. Both the
    /// discovery loop and reader loops funnel through here, so whichever
    /// observes a disconnect first wins and the loser is a no-op.
    pub(crate) fn release_slot(&self, index: usize, link: &Arc<T::Link>) -> bool {
        let released = self.table().release_matching(index, link);
        match released {
            Some(entry) => {
                entry.stop.store(true, Ordering::Relaxed);
                info!(slot = index, device = %entry.display_name, "device detached");
                (self.sink)(NormalizedEvent::disconnection(
                    index,
                    entry.vendor_id,
                    entry.product_id,
                    &entry.display_name,
                ));
                true
            }
            None => false,
        }
    }

    /// Track a reader thread handle for join at shutdown.
    pub(crate) fn track_reader(&self, handle: JoinHandle<()>) {
        self.readers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(handle);
    }
}

/// Bounded hot-plug device monitor.
///
/// Construct with an injected transport and sink, then `start` the
/// discovery loop. Call `shutdown` before dropping; a dropped monitor does
/// not stop its threads.
pub struct DeviceMonitor<T: Transport> {
    shared: Arc<MonitorShared<T>>,
    discovery: Mutex<Option<JoinHandle<()>>>,
    started: AtomicBool,
}

impl<T: Transport> DeviceMonitor<T> {
    pub fn new(transport: T, config: MonitorConfig, sink: EventSink) -> Self {
        let capacity = config.monitor.slot_capacity;
        Self {
            shared: Arc::new(MonitorShared {
                transport,
                config,
                sink,
                table: Mutex::new(SlotTable::new(capacity)),
                stop: AtomicBool::new(false),
                readers: Mutex::new(Vec::new()),
            }),
            discovery: Mutex::new(None),
            started: AtomicBool::new(false),
        }
    }

    /// Start the discovery loop. Subsequent calls are no-ops.
    pub fn start(&self) {
        if self.started.swap(true, Ordering::SeqCst) {
            return;
        }

        let shared = Arc::clone(&self.shared);
        let handle = std::thread::Builder::new()
            .name("discovery".to_string())
            .spawn(move || discovery::run(shared))
            .expect("failed to spawn discovery thread");

        *self
            .discovery
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(handle);
    }

    /// Read-only snapshot of one slot; `None` for free or out-of-range
    /// indices.
    pub fn get_slot(&self, index: usize) -> Option<SlotSummary> {
        self.shared.table().summary(index)
    }

    /// Number of currently occupied slots.
    pub fn occupied_count(&self) -> usize {
        self.shared.table().occupied_count()
    }

    /// Structured shutdown: signal every loop, join all threads, then close
    /// every tracked device. Idempotent and safe to call concurrently with
    /// in-flight attach/detach work.
    pub fn shutdown(&self) {
        self.shared.stop.store(true, Ordering::SeqCst);
        self.shared.table().stop_all();

        if let Some(handle) = self
            .discovery
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
            && handle.join().is_err()
        {
            warn!("discovery thread panicked");
        }

        // Discovery is joined, so no new readers can appear
        let readers: Vec<_> = {
            let mut readers = self
                .shared
                .readers
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            readers.drain(..).collect()
        };
        for handle in readers {
            if handle.join().is_err() {
                warn!("reader thread panicked");
            }
        }

        let entries = self.shared.table().drain();
        drop(entries);
        info!("device monitor stopped");
    }
}

// Reader spawning lives here so discovery stays focused on reconciliation.
pub(crate) fn spawn_reader<T: Transport>(
    shared: &Arc<MonitorShared<T>>,
    index: usize,
    link: Arc<T::Link>,
    stop: Arc<AtomicBool>,
    summary: SlotSummary,
) {
    let worker = {
        let shared = Arc::clone(shared);
        let link = Arc::clone(&link);
        move || reader::run(shared, index, link, stop, summary)
    };

    match std::thread::Builder::new()
        .name(format!("reader-{index}"))
        .spawn(worker)
    {
        Ok(handle) => shared.track_reader(handle),
        Err(e) => {
            // Without a reader the slot is useless; give it back
            warn!(slot = index, "failed to spawn reader thread: {e}");
            shared.release_slot(index, &link);
        }
    }
}
