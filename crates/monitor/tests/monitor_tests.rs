//! Engine integration tests
//!
//! Drive the full monitor engine against the scriptable mock transport:
//! hot-plug reconciliation, capacity bounds, per-slot event ordering, and
//! both teardown paths.
//!
//! Run with: `cargo test -p monitor --test monitor_tests`

use async_channel::Receiver;
use common::channel::event_channel;
use common::test_utils::MockTransport;
use events::{EventCategory, InputFrame, NormalizedEvent, TransportError};
use monitor::config::MonitorConfig;
use monitor::registry::DeviceMonitor;
use std::time::{Duration, Instant};

const EVENT_WAIT: Duration = Duration::from_secs(2);

/// A few discovery cycles at the test poll interval.
const SETTLE: Duration = Duration::from_millis(80);

fn test_config(slot_capacity: usize) -> MonitorConfig {
    let mut config = MonitorConfig::default();
    config.monitor.slot_capacity = slot_capacity;
    config.monitor.poll_interval_ms = 10;
    config.monitor.read_timeout_ms = 10;
    config
}

fn start_monitor(
    transport: MockTransport,
    config: MonitorConfig,
) -> (DeviceMonitor<MockTransport>, Receiver<NormalizedEvent>) {
    let (sink, events) = event_channel(64);
    let monitor = DeviceMonitor::new(transport, config, sink);
    monitor.start();
    (monitor, events)
}

fn next_event(events: &Receiver<NormalizedEvent>) -> NormalizedEvent {
    let deadline = Instant::now() + EVENT_WAIT;
    loop {
        if let Ok(event) = events.try_recv() {
            return event;
        }
        assert!(Instant::now() < deadline, "timed out waiting for an event");
        std::thread::sleep(Duration::from_millis(2));
    }
}

fn drain_events(events: &Receiver<NormalizedEvent>) -> Vec<NormalizedEvent> {
    std::thread::sleep(SETTLE);
    let mut drained = Vec::new();
    while let Ok(event) = events.try_recv() {
        drained.push(event);
    }
    drained
}

#[test]
fn scenario_connect_then_disconnect() {
    let transport = MockTransport::new();
    let device = transport.plug(0x04, 0x05, "0004:0005");
    let (monitor, events) = start_monitor(transport, test_config(2));

    let connected = next_event(&events);
    assert_eq!(connected.category, EventCategory::Connection);
    assert_eq!(connected.slot_index, 0);
    assert_eq!(connected.vendor_id, 0x04);
    assert_eq!(connected.product_id, 0x05);
    assert_eq!(connected.kind, "connected");

    let summary = monitor.get_slot(0).unwrap();
    assert_eq!(summary.display_name, "0004:0005");
    assert_eq!(monitor.occupied_count(), 1);

    device.unplug();

    let disconnected = next_event(&events);
    assert_eq!(disconnected.category, EventCategory::Disconnection);
    assert_eq!(disconnected.slot_index, 0);
    assert_eq!(disconnected.identity, "0004:0005");
    assert_eq!(disconnected.kind, "disconnected");

    // Exactly one Disconnection even though discovery and the reader race
    // to observe the removal
    assert!(drain_events(&events).is_empty());
    assert_eq!(monitor.occupied_count(), 0);

    monitor.shutdown();
}

#[test]
fn scenario_capacity_bound_and_retry() {
    let transport = MockTransport::new();
    let first = transport.plug(0x01, 0x0a, "first");
    let (monitor, events) = start_monitor(transport.clone(), test_config(1));

    let connected = next_event(&events);
    assert_eq!(connected.category, EventCategory::Connection);
    assert_eq!(connected.identity, "first");

    // Second device must wait: the table is full
    let _second = transport.plug(0x02, 0x0b, "second");
    assert!(drain_events(&events).is_empty());
    assert_eq!(monitor.occupied_count(), 1);
    assert_eq!(monitor.get_slot(0).unwrap().display_name, "first");

    // Once the first device leaves, the freed slot goes to the second
    first.unplug();
    let mut seen = vec![next_event(&events), next_event(&events)];
    seen.sort_by_key(|event| event.category == EventCategory::Connection);

    assert_eq!(seen[0].category, EventCategory::Disconnection);
    assert_eq!(seen[0].identity, "first");
    assert_eq!(seen[1].category, EventCategory::Connection);
    assert_eq!(seen[1].identity, "second");
    assert_eq!(seen[1].slot_index, 0);

    monitor.shutdown();
}

#[test]
fn scenario_reader_error_frees_slot() {
    let transport = MockTransport::new();
    let device = transport.plug(0x04, 0x05, "pad");
    device.push_frame(InputFrame::Report(vec![0x01]));
    device.push_frame(InputFrame::Report(vec![0x02]));
    device.push_frame(InputFrame::Report(vec![0x03]));
    device.push_error(TransportError::Disconnected);

    let (monitor, events) = start_monitor(transport, test_config(1));

    // The device is still on the bus after the failure, so the freed slot
    // is reused by a later discovery cycle: 6 events total. The second
    // Connection starts a new occupancy period and may interleave with the
    // first period's Disconnection, but never with its Data events.
    let seen: Vec<_> = (0..6).map(|_| next_event(&events)).collect();

    assert_eq!(seen[0].category, EventCategory::Connection);
    assert_eq!(seen[0].slot_index, 0);

    // Exactly three Data events, in read order
    let data: Vec<_> = seen
        .iter()
        .filter(|event| event.category == EventCategory::Data)
        .collect();
    assert_eq!(
        data.iter().map(|event| event.payload.as_str()).collect::<Vec<_>>(),
        vec!["01", "02", "03"]
    );
    assert!(data.iter().all(|event| event.kind == "report"));

    // Exactly one Disconnection, after the last Data event
    let last_data = seen
        .iter()
        .rposition(|event| event.category == EventCategory::Data)
        .unwrap();
    let disconnects: Vec<_> = seen
        .iter()
        .enumerate()
        .filter(|(_, event)| event.category == EventCategory::Disconnection)
        .collect();
    assert_eq!(disconnects.len(), 1);
    assert!(disconnects[0].0 > last_data);

    // The re-attach lands back in slot 0
    let reconnect = seen
        .iter()
        .skip(1)
        .find(|event| event.category == EventCategory::Connection)
        .unwrap();
    assert_eq!(reconnect.slot_index, 0);

    monitor.shutdown();
}

#[test]
fn test_structured_frames_become_data_events() {
    let transport = MockTransport::new();
    let device = transport.plug(0x04, 0x05, "stick");
    device.push_frame(InputFrame::Axis { index: 0, value: -4096 });
    device.push_frame(InputFrame::Button { index: 3, pressed: true });
    device.push_frame(InputFrame::Hat { index: 1, value: 8 });

    let (monitor, events) = start_monitor(transport, test_config(1));
    assert_eq!(next_event(&events).category, EventCategory::Connection);

    let axis = next_event(&events);
    assert_eq!(axis.kind, "Axis 0");
    assert_eq!(axis.payload, "-4096");

    let button = next_event(&events);
    assert_eq!(button.kind, "Button 3 Down");
    assert_eq!(button.payload, "Down");

    let hat = next_event(&events);
    assert_eq!(hat.kind, "Hat 1");
    assert_eq!(hat.payload, "8");

    monitor.shutdown();
}

#[test]
fn test_connection_carries_descriptor_snapshot() {
    let transport = MockTransport::new();
    let device = transport.plug(0x04, 0x05, "pad");
    device.set_descriptor(vec![0x05, 0x01, 0x09, 0x04]);

    let (monitor, events) = start_monitor(transport, test_config(1));

    let connected = next_event(&events);
    assert_eq!(connected.category, EventCategory::Connection);
    assert_eq!(connected.payload, "05 01 09 04");

    monitor.shutdown();
}

#[test]
fn test_dedup_on_rediscovery() {
    let transport = MockTransport::new();
    transport.plug(0x04, 0x05, "pad");
    let (monitor, events) = start_monitor(transport, test_config(4));

    assert_eq!(next_event(&events).category, EventCategory::Connection);

    // Many discovery cycles later the same device still occupies one slot
    assert!(drain_events(&events).is_empty());
    assert_eq!(monitor.occupied_count(), 1);

    monitor.shutdown();
}

#[test]
fn test_open_failure_is_retried() {
    let transport = MockTransport::new();
    let device = transport.plug(0x04, 0x05, "pad");
    device.fail_open(TransportError::Access);

    let (monitor, events) = start_monitor(transport, test_config(1));

    // Open fails each cycle; nothing is attached
    assert!(drain_events(&events).is_empty());
    assert_eq!(monitor.occupied_count(), 0);

    device.allow_open();
    assert_eq!(next_event(&events).category, EventCategory::Connection);

    monitor.shutdown();
}

#[test]
fn test_filtered_device_is_ignored() {
    let transport = MockTransport::new();
    transport.plug(0x0003, 0x0004, "blocked");
    transport.plug(0x0001, 0x0002, "allowed");

    let mut config = test_config(4);
    config.usb.filters = vec!["0x0001:0x0002".to_string()];
    let (monitor, events) = start_monitor(transport, config);

    let connected = next_event(&events);
    assert_eq!(connected.identity, "allowed");

    assert!(drain_events(&events).is_empty());
    assert_eq!(monitor.occupied_count(), 1);

    monitor.shutdown();
}

#[test]
fn test_get_slot_out_of_range_is_none() {
    let transport = MockTransport::new();
    let (monitor, _events) = start_monitor(transport, test_config(2));

    assert!(monitor.get_slot(0).is_none());
    assert!(monitor.get_slot(99).is_none());
    assert_eq!(monitor.occupied_count(), 0);

    monitor.shutdown();
}

#[test]
fn test_start_is_idempotent() {
    let transport = MockTransport::new();
    transport.plug(0x04, 0x05, "pad");
    let (monitor, events) = start_monitor(transport, test_config(2));
    monitor.start();

    assert_eq!(next_event(&events).category, EventCategory::Connection);
    assert!(drain_events(&events).is_empty());
    assert_eq!(monitor.occupied_count(), 1);

    monitor.shutdown();
}

#[test]
fn test_shutdown_clears_table_and_is_idempotent() {
    let transport = MockTransport::new();
    transport.plug(0x04, 0x05, "pad");
    let (monitor, events) = start_monitor(transport, test_config(2));

    assert_eq!(next_event(&events).category, EventCategory::Connection);

    monitor.shutdown();
    assert_eq!(monitor.occupied_count(), 0);

    // No Disconnection events for shutdown teardown, and a second call is
    // a no-op
    assert!(drain_events(&events).is_empty());
    monitor.shutdown();
}

#[test]
fn test_replug_after_removal_reattaches() {
    let transport = MockTransport::new();
    let device = transport.plug(0x04, 0x05, "pad");
    let (monitor, events) = start_monitor(transport, test_config(1));

    assert_eq!(next_event(&events).category, EventCategory::Connection);
    device.unplug();
    assert_eq!(next_event(&events).category, EventCategory::Disconnection);

    device.replug();
    let reconnected = next_event(&events);
    assert_eq!(reconnected.category, EventCategory::Connection);
    assert_eq!(reconnected.slot_index, 0);

    monitor.shutdown();
}
