//! Transport error taxonomy

use thiserror::Error;

/// Errors surfaced by a transport adapter.
///
/// `Timeout` is the only retryable variant at the read boundary; every other
/// variant on a per-device operation is treated as a disconnect signal, not
/// a process-level failure.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    /// Bounded-timeout operation expired with no data.
    #[error("operation timed out")]
    Timeout,

    /// The device vanished or stopped answering.
    #[error("device disconnected or unreachable")]
    Disconnected,

    /// Opening or claiming the device was denied.
    #[error("access denied")]
    Access,

    /// The device or interface is held by another owner.
    #[error("device busy")]
    Busy,

    /// Whole-cycle device enumeration failed.
    #[error("enumeration failed: {0}")]
    Enumeration(String),

    /// Anything the taxonomy does not name.
    #[error("transport error: {0}")]
    Other(String),
}

/// Type alias for transport results.
pub type Result<T> = std::result::Result<T, TransportError>;
