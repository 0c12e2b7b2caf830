//! Typed input frames
//!
//! A `DeviceLink` read yields one `InputFrame`: either an opaque report for
//! report-style transports or a decoded axis/button/hat change for
//! structured joystick transports. `describe` turns either shape into the
//! kind/payload string pair carried by a Data event, so the reader loop is
//! transport-agnostic.

use serde::{Deserialize, Serialize};

/// One observation read from an open device link.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum InputFrame {
    /// Raw report bytes, dispatched as a hex dump.
    Report(Vec<u8>),
    /// Absolute axis position change.
    Axis { index: u8, value: i16 },
    /// Button press or release.
    Button { index: u8, pressed: bool },
    /// Hat (D-pad) position change.
    Hat { index: u8, value: u8 },
}

impl InputFrame {
    /// Event kind and payload strings for this frame.
    pub fn describe(&self) -> (String, String) {
        match self {
            InputFrame::Report(bytes) => ("report".to_string(), hex_dump(bytes)),
            InputFrame::Axis { index, value } => (format!("Axis {index}"), value.to_string()),
            InputFrame::Button { index, pressed } => {
                let state = if *pressed { "Down" } else { "Up" };
                (format!("Button {index} {state}"), state.to_string())
            }
            InputFrame::Hat { index, value } => (format!("Hat {index}"), value.to_string()),
        }
    }
}

/// Space-separated lowercase hex dump of `bytes`.
pub fn hex_dump(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len() * 3);
    for (i, byte) in bytes.iter().enumerate() {
        if i > 0 {
            out.push(' ');
        }
        out.push_str(&format!("{byte:02x}"));
    }
    out
}
