//! Normalized event and slot summary records
//!
//! This module defines the single payload type crossing the dispatch
//! boundary. Events are value copies: once built they carry no ownership
//! relationship to the slot they describe, so a slot can be freed
//! concurrently without invalidating events already dispatched.

use serde::{Deserialize, Serialize};

/// Maximum byte length of the `identity` field.
pub const MAX_IDENTITY_LEN: usize = 63;

/// Maximum byte length of the `kind` field.
pub const MAX_KIND_LEN: usize = 31;

/// Maximum byte length of the `payload` field.
pub const MAX_PAYLOAD_LEN: usize = 255;

/// Coarse classification of a normalized event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventCategory {
    /// A device was attached to a slot.
    Connection,
    /// A device vanished and its slot was released.
    Disconnection,
    /// An input observation from an attached device.
    Data,
}

/// The uniform record emitted for every observable occurrence.
///
/// Field lengths are capped at construction; producers truncate rather than
/// overflow. Fields that do not apply to a category are left empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NormalizedEvent {
    /// Index of the originating slot.
    pub slot_index: usize,
    /// USB Vendor ID captured at attach time.
    pub vendor_id: u16,
    /// USB Product ID captured at attach time.
    pub product_id: u16,
    /// Serial/name string of the originating device (≤ 63 bytes).
    pub identity: String,
    /// Coarse classification.
    pub category: EventCategory,
    /// Fine-grained sub-type label, e.g. "Axis 2" or "connected" (≤ 31 bytes).
    pub kind: String,
    /// Observed value: hex byte dump, axis/button/hat value, or a status
    /// word (≤ 255 bytes).
    pub payload: String,
}

impl NormalizedEvent {
    /// Build a Connection event. `payload` carries the initial descriptor
    /// snapshot when the transport exposes one, empty otherwise.
    pub fn connection(
        slot_index: usize,
        vendor_id: u16,
        product_id: u16,
        identity: &str,
        payload: &str,
    ) -> Self {
        Self {
            slot_index,
            vendor_id,
            product_id,
            identity: truncated(identity, MAX_IDENTITY_LEN),
            category: EventCategory::Connection,
            kind: "connected".to_string(),
            payload: truncated(payload, MAX_PAYLOAD_LEN),
        }
    }

    /// Build a Disconnection event carrying the slot's last-known identity.
    pub fn disconnection(
        slot_index: usize,
        vendor_id: u16,
        product_id: u16,
        identity: &str,
    ) -> Self {
        Self {
            slot_index,
            vendor_id,
            product_id,
            identity: truncated(identity, MAX_IDENTITY_LEN),
            category: EventCategory::Disconnection,
            kind: "disconnected".to_string(),
            payload: truncated(identity, MAX_PAYLOAD_LEN),
        }
    }

    /// Build a Data event from an already formatted kind/payload pair.
    pub fn data(
        slot_index: usize,
        vendor_id: u16,
        product_id: u16,
        identity: &str,
        kind: &str,
        payload: &str,
    ) -> Self {
        Self {
            slot_index,
            vendor_id,
            product_id,
            identity: truncated(identity, MAX_IDENTITY_LEN),
            category: EventCategory::Data,
            kind: truncated(kind, MAX_KIND_LEN),
            payload: truncated(payload, MAX_PAYLOAD_LEN),
        }
    }
}

/// Owned read-only copy of one occupied slot, safe to hold outside the
/// registry lock.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlotSummary {
    /// Stable slot index, 0..capacity.
    pub slot_index: usize,
    /// Human-readable identifier (vendor:product string or device name).
    pub display_name: String,
    /// USB Vendor ID.
    pub vendor_id: u16,
    /// USB Product ID.
    pub product_id: u16,
}

/// The consumer callback every normalized event is handed to.
///
/// Invoked synchronously from whichever thread produced the event, so the
/// sink must be safe to call concurrently and must not block indefinitely.
pub type EventSink = Box<dyn Fn(NormalizedEvent) + Send + Sync>;

/// A sink that discards every event.
pub fn null_sink() -> EventSink {
    Box::new(|_| {})
}

/// Copy `s` truncated to at most `max` bytes on a char boundary.
fn truncated(s: &str, max: usize) -> String {
    if s.len() <= max {
        return s.to_string();
    }
    let mut end = max;
    while end > 0 && !s.is_char_boundary(end) {
        end -= 1;
    }
    s[..end].to_string()
}
