//! Per-slot reader loop
//!
//! One loop per occupied slot, started after the slot's Connection event is
//! dispatched. Repeats a bounded-timeout read: data becomes a Data event,
//! a timeout is retried, and any hard error is treated as a disconnect —
//! the loop releases its own slot (unless the discovery loop already did)
//! and exits.

use crate::registry::engine::MonitorShared;
use common::transport::{DeviceLink, Transport};
use events::{NormalizedEvent, SlotSummary};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::debug;

pub(crate) fn run<T: Transport>(
    shared: Arc<MonitorShared<T>>,
    index: usize,
    link: Arc<T::Link>,
    stop: Arc<AtomicBool>,
    summary: SlotSummary,
) {
    let timeout = shared.config.monitor.read_timeout();
    debug!(slot = index, device = %summary.display_name, "reader loop started");

    loop {
        // Cancellation is checked at every read boundary
        if stop.load(Ordering::Relaxed) || shared.stopping() {
            break;
        }

        match link.read_frame(timeout) {
            Ok(Some(frame)) => {
                let (kind, payload) = frame.describe();
                (shared.sink)(NormalizedEvent::data(
                    index,
                    summary.vendor_id,
                    summary.product_id,
                    &summary.display_name,
                    &kind,
                    &payload,
                ));
            }
            Ok(None) => {}
            Err(e) => {
                debug!(
                    slot = index,
                    device = %summary.display_name,
                    "read failed, treating as disconnect: {e}"
                );
                shared.release_slot(index, &link);
                break;
            }
        }
    }

    debug!(slot = index, device = %summary.display_name, "reader loop stopped");
}
