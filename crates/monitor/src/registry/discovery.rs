//! Discovery loop
//!
//! Periodic reconciliation of the devices physically present against the
//! slot table. Each cycle runs an attach phase (new devices get a slot, a
//! Connection event, and a reader loop) followed by a detach phase (probe
//! every occupied slot, release the vanished ones), so a device that
//! disappears and reappears within one cycle is never flagged both ways
//! out of order.

use crate::registry::engine::{MonitorShared, spawn_reader};
use crate::registry::slots::SlotEntry;
use common::transport::{DeviceCandidate, DeviceLink, Transport};
use events::{NormalizedEvent, SlotSummary, hex_dump};
use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Granularity of the interval sleep; bounds how long shutdown waits on a
/// sleeping discovery thread.
const STOP_POLL_STEP: Duration = Duration::from_millis(20);

pub(crate) fn run<T: Transport>(shared: Arc<MonitorShared<T>>) {
    info!("discovery loop started");

    while !shared.stopping() {
        match shared.transport.enumerate() {
            Ok(candidates) => {
                attach_phase(&shared, candidates);
                detach_phase(&shared);
            }
            Err(e) => warn!("device enumeration failed: {e}"),
        }
        sleep_interval(&shared);
    }

    info!("discovery loop stopped");
}

/// Attach every present device that is not yet tracked.
fn attach_phase<T: Transport>(shared: &Arc<MonitorShared<T>>, candidates: Vec<T::Candidate>) {
    for candidate in candidates {
        if shared.stopping() {
            return;
        }

        let vendor_id = candidate.vendor_id();
        let product_id = candidate.product_id();

        if !shared.config.usb.allows(vendor_id, product_id) {
            debug!("device {vendor_id:04x}:{product_id:04x} ignored by filter");
            continue;
        }

        if shared.table().contains(vendor_id, product_id) {
            continue;
        }

        let display_name = candidate.display_name();

        // Open, claim and snapshot while no lock is held; only the final
        // slot commit takes the registry lock.
        let link = match candidate.open() {
            Ok(link) => Arc::new(link),
            Err(e) => {
                warn!(device = %display_name, "failed to open device: {e}");
                continue;
            }
        };
        let snapshot = link
            .descriptor_snapshot()
            .map(|bytes| hex_dump(&bytes))
            .unwrap_or_default();

        let stop = Arc::new(AtomicBool::new(false));
        let entry = SlotEntry {
            link: Arc::clone(&link),
            display_name: display_name.clone(),
            vendor_id,
            product_id,
            stop: Arc::clone(&stop),
        };

        let index = {
            let mut table = shared.table();
            match table.find_free() {
                Some(index) => table.occupy(index, entry).then_some(index),
                None => None,
            }
        };
        let Some(index) = index else {
            // Dropping the link closes it; the device is retried once a
            // slot frees up
            warn!(device = %display_name, "slot table full, device ignored");
            continue;
        };

        info!(slot = index, device = %display_name, "device attached");
        (shared.sink)(NormalizedEvent::connection(
            index,
            vendor_id,
            product_id,
            &display_name,
            &snapshot,
        ));

        // The reader starts only after the Connection event is out, which
        // pins the per-slot Connection < Data ordering
        let summary = SlotSummary {
            slot_index: index,
            display_name,
            vendor_id,
            product_id,
        };
        spawn_reader(shared, index, link, stop, summary);
    }
}

/// Probe every occupied slot and release the ones that stopped answering.
fn detach_phase<T: Transport>(shared: &Arc<MonitorShared<T>>) {
    let occupied = shared.table().snapshot();

    for (index, link, summary) in occupied {
        if shared.stopping() {
            return;
        }
        if let Err(e) = link.probe() {
            debug!(slot = index, device = %summary.display_name, "liveness probe failed: {e}");
            shared.release_slot(index, &link);
        }
    }
}

/// Sleep one cycle interval, polling the stop flag.
fn sleep_interval<T: Transport>(shared: &MonitorShared<T>) {
    let mut remaining = shared.config.monitor.poll_interval();
    while !shared.stopping() && remaining > Duration::ZERO {
        let step = remaining.min(STOP_POLL_STEP);
        std::thread::sleep(step);
        remaining = remaining.saturating_sub(step);
    }
}
