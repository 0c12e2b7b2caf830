//! USB transport adapter
//!
//! rusb-backed implementation of the transport boundary: enumeration of
//! HID-style devices, open/claim with kernel-driver detach, interrupt
//! reads, and descriptor-based liveness probes.

pub mod transport;

pub use transport::{UsbCandidate, UsbLink, UsbTransport};
