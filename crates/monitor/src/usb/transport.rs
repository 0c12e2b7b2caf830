//! rusb transport implementation

use common::transport::{DeviceCandidate, DeviceLink, Transport};
use events::{InputFrame, Result, TransportError};
use rusb::{Context, Device, DeviceDescriptor, Direction, Recipient, RequestType, UsbContext};
use std::time::Duration;
use tracing::debug;

/// bRequest for GET_DESCRIPTOR.
const HID_GET_DESCRIPTOR: u8 = 0x06;
/// Descriptor type selecting the HID report descriptor.
const HID_REPORT_DESCRIPTOR: u16 = 0x22;
/// Interrupt IN endpoint carrying input reports.
const INPUT_ENDPOINT: u8 = rusb::constants::LIBUSB_ENDPOINT_IN | 1;
/// Interface claimed for input.
const INPUT_INTERFACE: u8 = 0;
/// Timeout for the report-descriptor control transfer.
const DESCRIPTOR_TIMEOUT: Duration = Duration::from_secs(1);
/// Largest report or descriptor captured per transfer.
const MAX_REPORT_LEN: usize = 256;

/// USB transport backed by a libusb context.
pub struct UsbTransport {
    context: Context,
}

impl UsbTransport {
    /// Initialize the libusb context. Failure here is the one unrecoverable
    /// startup condition; everything after it is retried or skipped.
    pub fn new() -> Result<Self> {
        let context = Context::new().map_err(map_rusb_error)?;
        Ok(Self { context })
    }
}

impl Transport for UsbTransport {
    type Link = UsbLink;
    type Candidate = UsbCandidate;

    fn enumerate(&self) -> Result<Vec<UsbCandidate>> {
        let devices = self
            .context
            .devices()
            .map_err(|e| TransportError::Enumeration(e.to_string()))?;

        let mut candidates = Vec::new();
        for device in devices.iter() {
            let descriptor = match device.device_descriptor() {
                Ok(descriptor) => descriptor,
                Err(e) => {
                    debug!(
                        bus = device.bus_number(),
                        addr = device.address(),
                        "failed to read device descriptor: {e}"
                    );
                    continue;
                }
            };

            // HID-style devices declare their class per interface
            if descriptor.class_code() != rusb::constants::LIBUSB_CLASS_PER_INTERFACE {
                continue;
            }

            candidates.push(UsbCandidate { device, descriptor });
        }

        Ok(candidates)
    }
}

/// An enumerated USB device with its cached descriptor.
pub struct UsbCandidate {
    device: Device<Context>,
    descriptor: DeviceDescriptor,
}

impl DeviceCandidate for UsbCandidate {
    type Link = UsbLink;

    fn vendor_id(&self) -> u16 {
        self.descriptor.vendor_id()
    }

    fn product_id(&self) -> u16 {
        self.descriptor.product_id()
    }

    fn display_name(&self) -> String {
        format!(
            "{:04x}:{:04x}",
            self.descriptor.vendor_id(),
            self.descriptor.product_id()
        )
    }

    fn open(&self) -> Result<UsbLink> {
        let handle = self.device.open().map_err(map_rusb_error)?;

        if handle.kernel_driver_active(INPUT_INTERFACE).unwrap_or(false) {
            handle
                .detach_kernel_driver(INPUT_INTERFACE)
                .map_err(map_rusb_error)?;
        }

        handle
            .claim_interface(INPUT_INTERFACE)
            .map_err(map_rusb_error)?;

        Ok(UsbLink {
            device: self.device.clone(),
            handle,
        })
    }
}

/// An open, claimed USB device.
pub struct UsbLink {
    device: Device<Context>,
    handle: rusb::DeviceHandle<Context>,
}

impl DeviceLink for UsbLink {
    fn read_frame(&self, timeout: Duration) -> Result<Option<InputFrame>> {
        let mut buf = [0u8; MAX_REPORT_LEN];
        match self.handle.read_interrupt(INPUT_ENDPOINT, &mut buf, timeout) {
            Ok(0) => Ok(None),
            Ok(len) => Ok(Some(InputFrame::Report(buf[..len].to_vec()))),
            Err(rusb::Error::Timeout) => Ok(None),
            Err(e) => Err(map_rusb_error(e)),
        }
    }

    fn probe(&self) -> Result<()> {
        self.device
            .device_descriptor()
            .map(|_| ())
            .map_err(map_rusb_error)
    }

    fn descriptor_snapshot(&self) -> Option<Vec<u8>> {
        let mut buf = [0u8; MAX_REPORT_LEN];
        let request_type =
            rusb::request_type(Direction::In, RequestType::Standard, Recipient::Interface);

        match self.handle.read_control(
            request_type,
            HID_GET_DESCRIPTOR,
            HID_REPORT_DESCRIPTOR << 8,
            u16::from(INPUT_INTERFACE),
            &mut buf,
            DESCRIPTOR_TIMEOUT,
        ) {
            Ok(len) => Some(buf[..len].to_vec()),
            Err(e) => {
                debug!("report descriptor read failed: {e}");
                None
            }
        }
    }
}

impl Drop for UsbLink {
    fn drop(&mut self) {
        if let Err(e) = self.handle.release_interface(INPUT_INTERFACE) {
            debug!("failed to release interface: {e}");
        }
        // Restore the device to kernel control
        if let Err(e) = self.handle.attach_kernel_driver(INPUT_INTERFACE) {
            debug!("could not reattach kernel driver: {e}");
        }
    }
}

/// Map rusb errors onto the transport taxonomy.
fn map_rusb_error(err: rusb::Error) -> TransportError {
    match err {
        rusb::Error::Timeout => TransportError::Timeout,
        rusb::Error::NoDevice | rusb::Error::NotFound | rusb::Error::Io | rusb::Error::Pipe => {
            TransportError::Disconnected
        }
        rusb::Error::Access => TransportError::Access,
        rusb::Error::Busy => TransportError::Busy,
        _ => TransportError::Other(err.to_string()),
    }
}
