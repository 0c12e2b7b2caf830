//! Event records for hidmon
//!
//! This crate defines the records that cross the dispatch boundary between
//! the device monitor and its consumer: the normalized event emitted for
//! every observable occurrence (connect, disconnect, data), the typed input
//! frame a transport read produces, and the transport error taxonomy.
//!
//! # Example
//!
//! ```
//! use events::{EventCategory, NormalizedEvent};
//!
//! let event = NormalizedEvent::connection(0, 0x046d, 0xc216, "046d:c216", "09 04");
//! assert_eq!(event.category, EventCategory::Connection);
//! assert_eq!(event.kind, "connected");
//! ```

pub mod error;
pub mod frame;
pub mod record;

pub use error::{Result, TransportError};
pub use frame::{InputFrame, hex_dump};
pub use record::{
    EventCategory, EventSink, MAX_IDENTITY_LEN, MAX_KIND_LEN, MAX_PAYLOAD_LEN, NormalizedEvent,
    SlotSummary, null_sink,
};
