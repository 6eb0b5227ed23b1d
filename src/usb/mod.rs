//! USB host mass-storage contract.
//!
//! The host stack itself is an external collaborator. This module fixes the
//! calls the rest of the crate makes into it and the events it reports back.
//! Requests are asynchronous: `inquiry`, `read10` and `write10` only queue
//! work, and their completion is delivered as a [`HostEvent`] from a later
//! [`MscHost::task`] call.

pub mod sim;

use alloc::vec::Vec;
use core::fmt;

pub use sim::{RamDevice, RamDeviceBuilder, SimHost, TransferStats};

/// Device address assigned by the host stack (1-based).
pub type DeviceAddr = u8;

/// Status byte of a command status wrapper.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CswStatus {
    Passed,
    Failed,
    PhaseError,
}

impl CswStatus {
    pub fn is_passed(self) -> bool {
        self == Self::Passed
    }
}

/// Reasons a host stack refuses to queue a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UsbError {
    NotMounted,
    /// A request is already outstanding for the device.
    Busy,
    InvalidRequest,
}

impl fmt::Display for UsbError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotMounted => write!(f, "device not mounted"),
            Self::Busy => write!(f, "device busy"),
            Self::InvalidRequest => write!(f, "invalid request"),
        }
    }
}

/// Identification strings of SCSI standard INQUIRY data.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InquiryResponse {
    pub vendor_id: [u8; 8],
    pub product_id: [u8; 16],
    pub product_rev: [u8; 4],
}

impl InquiryResponse {
    /// Build a response from text fields, space padded as SCSI requires.
    pub fn new(vendor: &str, product: &str, revision: &str) -> Self {
        Self {
            vendor_id: pad_field(vendor),
            product_id: pad_field(product),
            product_rev: pad_field(revision),
        }
    }

    pub fn vendor(&self) -> &str {
        field_str(&self.vendor_id)
    }

    pub fn product(&self) -> &str {
        field_str(&self.product_id)
    }

    pub fn revision(&self) -> &str {
        field_str(&self.product_rev)
    }
}

fn pad_field<const N: usize>(text: &str) -> [u8; N] {
    let mut field = [b' '; N];
    let len = text.len().min(N);
    field[..len].copy_from_slice(&text.as_bytes()[..len]);
    field
}

/// Field text up to the first NUL, padding kept.
fn field_str(field: &[u8]) -> &str {
    let end = field.iter().position(|&b| b == 0).unwrap_or(field.len());
    core::str::from_utf8(&field[..end]).unwrap_or("")
}

/// Notifications delivered by [`MscHost::task`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostEvent {
    /// A mass-storage device finished enumeration.
    Mounted(DeviceAddr),
    /// A mass-storage device was removed.
    Unmounted(DeviceAddr),
    InquiryComplete {
        dev_addr: DeviceAddr,
        lun: u8,
        status: CswStatus,
        response: InquiryResponse,
    },
    /// READ10 finished; `data` holds the sectors that were read.
    ReadComplete {
        dev_addr: DeviceAddr,
        lun: u8,
        status: CswStatus,
        data: Vec<u8>,
    },
    WriteComplete {
        dev_addr: DeviceAddr,
        lun: u8,
        status: CswStatus,
    },
}

impl HostEvent {
    pub fn dev_addr(&self) -> DeviceAddr {
        match self {
            Self::Mounted(addr) | Self::Unmounted(addr) => *addr,
            Self::InquiryComplete { dev_addr, .. }
            | Self::ReadComplete { dev_addr, .. }
            | Self::WriteComplete { dev_addr, .. } => *dev_addr,
        }
    }
}

/// The mass-storage side of a USB host stack.
pub trait MscHost {
    /// Run the stack once and hand every ready event to `sink`.
    fn task(&mut self, sink: &mut dyn FnMut(HostEvent));

    fn mounted(&self, dev_addr: DeviceAddr) -> bool;

    fn block_count(&self, dev_addr: DeviceAddr, lun: u8) -> u32;

    fn block_size(&self, dev_addr: DeviceAddr, lun: u8) -> u32;

    /// Queue a SCSI INQUIRY.
    fn inquiry(&mut self, dev_addr: DeviceAddr, lun: u8) -> Result<(), UsbError>;

    /// Queue a READ10 of `count` blocks starting at `lba`.
    fn read10(&mut self, dev_addr: DeviceAddr, lun: u8, lba: u32, count: u16)
    -> Result<(), UsbError>;

    /// Queue a WRITE10 of `data`, which must hold whole blocks.
    fn write10(&mut self, dev_addr: DeviceAddr, lun: u8, lba: u32, data: &[u8])
    -> Result<(), UsbError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_inquiry_fields_are_space_padded() {
        let resp = InquiryResponse::new("TinyUSB", "Flash Drive", "1.0");
        assert_eq!(&resp.vendor_id, b"TinyUSB ");
        assert_eq!(resp.vendor(), "TinyUSB ");
        assert_eq!(resp.product(), "Flash Drive     ");
        assert_eq!(resp.revision(), "1.0 ");
    }

    #[test]
    fn test_inquiry_fields_are_truncated() {
        let resp = InquiryResponse::new("VeryLongVendor", "P", "12345");
        assert_eq!(resp.vendor(), "VeryLong");
        assert_eq!(resp.revision(), "1234");
    }

    #[test]
    fn test_field_stops_at_nul() {
        let mut resp = InquiryResponse::new("ACME", "X", "1");
        resp.vendor_id = *b"AB\0\0\0\0\0\0";
        assert_eq!(resp.vendor(), "AB");
    }

    #[test]
    fn test_event_device_address() {
        assert_eq!(HostEvent::Unmounted(3).dev_addr(), 3);
        let event = HostEvent::WriteComplete {
            dev_addr: 2,
            lun: 0,
            status: CswStatus::Failed,
        };
        assert_eq!(event.dev_addr(), 2);
    }
}
