//! Transport adapter boundary
//!
//! Abstraction over the underlying device-access library. The monitor
//! engine only ever talks to these traits: `Transport` lists devices
//! physically present, a `DeviceCandidate` can be opened into a
//! `DeviceLink`, and a link serves bounded-timeout reads and liveness
//! probes. Busy-polled and interrupt-driven transports both fit behind
//! `read_frame`; the polling cadence is a configuration parameter, not a
//! structural difference.

use events::{InputFrame, Result};
use std::time::Duration;

/// A device visible during enumeration, not yet opened.
pub trait DeviceCandidate {
    /// The open-connection type `open` produces.
    type Link: DeviceLink;

    /// Vendor ID from the device descriptor.
    fn vendor_id(&self) -> u16;

    /// Product ID from the device descriptor.
    fn product_id(&self) -> u16;

    /// Human-readable identifier, best effort ("vvvv:pppp" when the
    /// transport offers nothing better).
    fn display_name(&self) -> String;

    /// Open the device and claim its input interface.
    fn open(&self) -> Result<Self::Link>;
}

/// An open, claimed connection to one device.
///
/// Implementations release their transport resources on drop; the engine
/// shares a link between the slot table and the slot's reader thread, so
/// the actual close happens when the last clone is gone.
pub trait DeviceLink: Send + Sync + 'static {
    /// Bounded-timeout read of the next input frame.
    ///
    /// `Ok(None)` means the timeout expired with no data, which is not an
    /// error; any `Err` is fatal to the device and triggers slot teardown.
    fn read_frame(&self, timeout: Duration) -> Result<Option<InputFrame>>;

    /// Re-query device metadata to confirm the device is still present.
    fn probe(&self) -> Result<()>;

    /// Initial descriptor or state snapshot, if the transport exposes one.
    fn descriptor_snapshot(&self) -> Option<Vec<u8>>;
}

/// Abstraction over the underlying device-access library.
pub trait Transport: Send + Sync + 'static {
    /// Open-connection type for this transport.
    type Link: DeviceLink;
    /// Enumerated-device type for this transport.
    type Candidate: DeviceCandidate<Link = Self::Link>;

    /// List the devices physically present right now.
    ///
    /// A failure fails the whole discovery cycle; it is logged and retried
    /// at the next interval, never fatal.
    fn enumerate(&self) -> Result<Vec<Self::Candidate>>;
}
