//! Bounded event channel between monitor threads and async consumers

use async_channel::{Receiver, bounded};
use events::{EventSink, NormalizedEvent};
use tracing::debug;

/// Default bound for the event channel.
pub const DEFAULT_EVENT_CAPACITY: usize = 256;

/// Create a sink/receiver pair over a bounded channel.
///
/// The sink performs a blocking send from whichever monitor thread produced
/// the event, so a slow consumer applies backpressure to the monitor. Once
/// the receiver is closed, events are discarded.
pub fn event_channel(capacity: usize) -> (EventSink, Receiver<NormalizedEvent>) {
    let (tx, rx) = bounded(capacity);

    let sink: EventSink = Box::new(move |event: NormalizedEvent| {
        if tx.send_blocking(event).is_err() {
            debug!("event receiver closed, dropping event");
        }
    });

    (sink, rx)
}
