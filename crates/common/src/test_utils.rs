//! Test utilities for hidmon
//!
//! Provides a fully scriptable in-memory transport so engine behavior can
//! be exercised without hardware: devices are plugged and unplugged on a
//! simulated bus, and each device's reads follow a queued script.
//!
//! # Example
//!
//! ```
//! use common::test_utils::MockTransport;
//! use common::transport::Transport;
//!
//! let transport = MockTransport::new();
//! transport.plug(0x046d, 0xc216, "pad");
//! assert_eq!(transport.enumerate().unwrap().len(), 1);
//! ```

use crate::transport::{DeviceCandidate, DeviceLink, Transport};
use events::{InputFrame, Result, TransportError};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread;
use std::time::Duration;

/// Ceiling for an idle mock read's sleep; keeps test loops responsive.
const IDLE_READ_STEP: Duration = Duration::from_millis(5);

#[derive(Debug, Clone)]
enum ScriptStep {
    Frame(InputFrame),
    Error(TransportError),
}

#[derive(Debug)]
struct MockDeviceState {
    vendor_id: u16,
    product_id: u16,
    name: String,
    present: bool,
    open_error: Option<TransportError>,
    descriptor: Option<Vec<u8>>,
    script: VecDeque<ScriptStep>,
}

fn lock_state(state: &Arc<Mutex<MockDeviceState>>) -> MutexGuard<'_, MockDeviceState> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Control handle for one simulated device.
#[derive(Clone)]
pub struct MockDevice {
    state: Arc<Mutex<MockDeviceState>>,
}

impl MockDevice {
    /// Queue an input frame for the device's reader.
    pub fn push_frame(&self, frame: InputFrame) {
        lock_state(&self.state).script.push_back(ScriptStep::Frame(frame));
    }

    /// Queue a fatal read error, delivered after any queued frames.
    pub fn push_error(&self, error: TransportError) {
        lock_state(&self.state).script.push_back(ScriptStep::Error(error));
    }

    /// Remove the device from the bus: enumeration no longer lists it,
    /// liveness probes fail, and reads past the queued script fail.
    pub fn unplug(&self) {
        lock_state(&self.state).present = false;
    }

    /// Put the device back on the bus.
    pub fn replug(&self) {
        lock_state(&self.state).present = true;
    }

    /// Make open attempts fail until `allow_open`.
    pub fn fail_open(&self, error: TransportError) {
        lock_state(&self.state).open_error = Some(error);
    }

    /// Let open attempts succeed again.
    pub fn allow_open(&self) {
        lock_state(&self.state).open_error = None;
    }

    /// Set the descriptor snapshot reported once the device is open.
    pub fn set_descriptor(&self, bytes: Vec<u8>) {
        lock_state(&self.state).descriptor = Some(bytes);
    }
}

/// Scriptable transport over a simulated bus; clones share the bus.
#[derive(Clone, Default)]
pub struct MockTransport {
    bus: Arc<Mutex<Vec<Arc<Mutex<MockDeviceState>>>>>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a device to the bus and return its control handle.
    pub fn plug(&self, vendor_id: u16, product_id: u16, name: &str) -> MockDevice {
        let state = Arc::new(Mutex::new(MockDeviceState {
            vendor_id,
            product_id,
            name: name.to_string(),
            present: true,
            open_error: None,
            descriptor: None,
            script: VecDeque::new(),
        }));
        self.bus
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(Arc::clone(&state));
        MockDevice { state }
    }
}

impl Transport for MockTransport {
    type Link = MockLink;
    type Candidate = MockCandidate;

    fn enumerate(&self) -> Result<Vec<MockCandidate>> {
        let bus = self.bus.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(bus
            .iter()
            .filter(|state| lock_state(state).present)
            .map(|state| MockCandidate {
                state: Arc::clone(state),
            })
            .collect())
    }
}

/// An enumerated mock device, not yet opened.
pub struct MockCandidate {
    state: Arc<Mutex<MockDeviceState>>,
}

impl DeviceCandidate for MockCandidate {
    type Link = MockLink;

    fn vendor_id(&self) -> u16 {
        lock_state(&self.state).vendor_id
    }

    fn product_id(&self) -> u16 {
        lock_state(&self.state).product_id
    }

    fn display_name(&self) -> String {
        lock_state(&self.state).name.clone()
    }

    fn open(&self) -> Result<MockLink> {
        let state = lock_state(&self.state);
        if !state.present {
            return Err(TransportError::Disconnected);
        }
        if let Some(error) = state.open_error.clone() {
            return Err(error);
        }
        drop(state);
        Ok(MockLink {
            state: Arc::clone(&self.state),
        })
    }
}

/// An open connection to a mock device.
pub struct MockLink {
    state: Arc<Mutex<MockDeviceState>>,
}

impl DeviceLink for MockLink {
    fn read_frame(&self, timeout: Duration) -> Result<Option<InputFrame>> {
        {
            let mut state = lock_state(&self.state);
            match state.script.pop_front() {
                Some(ScriptStep::Frame(frame)) => return Ok(Some(frame)),
                Some(ScriptStep::Error(error)) => return Err(error),
                None if !state.present => return Err(TransportError::Disconnected),
                None => {}
            }
        }
        thread::sleep(timeout.min(IDLE_READ_STEP));
        Ok(None)
    }

    fn probe(&self) -> Result<()> {
        if lock_state(&self.state).present {
            Ok(())
        } else {
            Err(TransportError::Disconnected)
        }
    }

    fn descriptor_snapshot(&self) -> Option<Vec<u8>> {
        lock_state(&self.state).descriptor.clone()
    }
}
