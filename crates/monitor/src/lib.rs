//! hidmon engine
//!
//! Bounded device registry and hot-plug event engine: a fixed-capacity slot
//! table shared between a periodic discovery loop and per-device reader
//! loops under a single registry lock. Every observation — connect,
//! disconnect, input data — is republished as a normalized event to one
//! injected sink.

pub mod config;
pub mod registry;
pub mod usb;

pub use config::MonitorConfig;
pub use registry::DeviceMonitor;
pub use usb::UsbTransport;
