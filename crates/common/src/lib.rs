//! Common machinery for hidmon
//!
//! Shared between the monitor engine and its consumers: the application
//! error type, logging setup, the transport adapter boundary, the bounded
//! event channel bridge, and test utilities.

pub mod channel;
pub mod error;
pub mod logging;
pub mod test_utils;
pub mod transport;

pub use channel::{DEFAULT_EVENT_CAPACITY, event_channel};
pub use error::{Error, Result};
pub use logging::setup_logging;
