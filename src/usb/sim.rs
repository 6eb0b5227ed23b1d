//! RAM-backed mass-storage host.
//!
//! `SimHost` behaves like a host stack with up to `DEVICE_MAX` flash drives
//! plugged in: requests are queued and only complete from a later `task`
//! call, optionally after a configurable number of extra calls. It backs the
//! demo binary and the test suite.

use alloc::collections::VecDeque;
use alloc::string::{String, ToString};
use alloc::vec;
use alloc::vec::Vec;

use fatfs::{FileSystem, FormatVolumeOptions, FsOptions, IoBase, Read, Seek, SeekFrom, Write};
use log::{debug, trace};

use super::{CswStatus, DeviceAddr, HostEvent, InquiryResponse, MscHost, UsbError};
use crate::config::DEVICE_MAX;
use crate::error::{FsError, IoError};

/// A single-LUN storage medium held in memory.
#[derive(Debug, Clone)]
pub struct RamDevice {
    storage: Vec<u8>,
    block_size: u32,
    inquiry: InquiryResponse,
}

impl RamDevice {
    /// Zero-filled medium of `block_count` blocks.
    pub fn new(block_count: u32, block_size: u32) -> Self {
        Self {
            storage: vec![0u8; block_count as usize * block_size as usize],
            block_size,
            inquiry: InquiryResponse::new("TinyUSB", "Mass Storage", "1.0"),
        }
    }

    /// Freshly formatted FAT medium, ready to be populated.
    pub fn builder() -> RamDeviceBuilder {
        RamDeviceBuilder::new()
    }

    pub fn with_inquiry(mut self, vendor: &str, product: &str, revision: &str) -> Self {
        self.inquiry = InquiryResponse::new(vendor, product, revision);
        self
    }

    pub fn block_count(&self) -> u32 {
        (self.storage.len() / self.block_size as usize) as u32
    }

    pub fn block_size(&self) -> u32 {
        self.block_size
    }

    pub fn inquiry(&self) -> &InquiryResponse {
        &self.inquiry
    }

    pub fn data(&self) -> &[u8] {
        &self.storage
    }

    fn range(&self, lba: u32, count: u32) -> Option<core::ops::Range<usize>> {
        let start = lba as usize * self.block_size as usize;
        let end = start + count as usize * self.block_size as usize;
        (end <= self.storage.len()).then_some(start..end)
    }
}

enum Entry {
    Dir(String),
    File(String, Vec<u8>),
}

/// Builds a FAT-formatted [`RamDevice`].
pub struct RamDeviceBuilder {
    block_count: u32,
    block_size: u32,
    label: [u8; 11],
    entries: Vec<Entry>,
}

impl RamDeviceBuilder {
    fn new() -> Self {
        Self {
            block_count: 8192,
            block_size: 512,
            label: *b"MSCDEMO    ",
            entries: Vec::new(),
        }
    }

    pub fn geometry(mut self, block_count: u32, block_size: u32) -> Self {
        self.block_count = block_count;
        self.block_size = block_size;
        self
    }

    pub fn label(mut self, label: &str) -> Self {
        self.label = [b' '; 11];
        let len = label.len().min(11);
        self.label[..len].copy_from_slice(&label.as_bytes()[..len]);
        self
    }

    /// Create a directory. Parents must be created first.
    pub fn dir(mut self, path: &str) -> Self {
        self.entries.push(Entry::Dir(path.to_string()));
        self
    }

    pub fn file(mut self, path: &str, contents: &[u8]) -> Self {
        self.entries.push(Entry::File(path.to_string(), contents.to_vec()));
        self
    }

    pub fn build(self) -> Result<RamDevice, FsError> {
        let mut device = RamDevice::new(self.block_count, self.block_size);
        let mut image = ImageCursor::new(&mut device.storage);

        let options = FormatVolumeOptions::new()
            .bytes_per_sector(self.block_size as u16)
            .total_sectors(self.block_count)
            .volume_label(self.label);
        fatfs::format_volume(&mut image, options)?;
        image.seek(SeekFrom::Start(0))?;

        let fs = FileSystem::new(image, FsOptions::new().update_accessed_date(false))?;
        {
            let root = fs.root_dir();
            for entry in &self.entries {
                match entry {
                    Entry::Dir(path) => {
                        root.create_dir(path)?;
                    }
                    Entry::File(path, contents) => {
                        let mut file = root.create_file(path)?;
                        file.truncate()?;
                        file.write_all(contents)?;
                        file.flush()?;
                    }
                }
            }
        }
        fs.unmount()?;
        debug!(
            "built FAT image: {} blocks of {} bytes, {} entries",
            self.block_count,
            self.block_size,
            self.entries.len()
        );
        Ok(device)
    }
}

/// Byte-stream view of an in-memory image, used for formatting.
struct ImageCursor<'a> {
    data: &'a mut [u8],
    pos: u64,
}

impl<'a> ImageCursor<'a> {
    fn new(data: &'a mut [u8]) -> Self {
        Self { data, pos: 0 }
    }
}

impl IoBase for ImageCursor<'_> {
    type Error = IoError;
}

impl Read for ImageCursor<'_> {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize, Self::Error> {
        let start = (self.pos as usize).min(self.data.len());
        let len = buf.len().min(self.data.len() - start);
        buf[..len].copy_from_slice(&self.data[start..start + len]);
        self.pos += len as u64;
        Ok(len)
    }
}

impl Write for ImageCursor<'_> {
    fn write(&mut self, buf: &[u8]) -> Result<usize, Self::Error> {
        let start = (self.pos as usize).min(self.data.len());
        let len = buf.len().min(self.data.len() - start);
        self.data[start..start + len].copy_from_slice(&buf[..len]);
        self.pos += len as u64;
        Ok(len)
    }

    fn flush(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }
}

impl Seek for ImageCursor<'_> {
    fn seek(&mut self, pos: SeekFrom) -> Result<u64, Self::Error> {
        let new_pos = match pos {
            SeekFrom::Start(off) => Some(off),
            SeekFrom::Current(off) => self.pos.checked_add_signed(off),
            SeekFrom::End(off) => (self.data.len() as u64).checked_add_signed(off),
        };
        self.pos = new_pos.ok_or(IoError::Seek)?;
        Ok(self.pos)
    }
}

/// Request counters, for checking what reached the bus.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct TransferStats {
    pub inquiries: usize,
    pub reads: usize,
    pub writes: usize,
    pub tasks: usize,
}

impl TransferStats {
    /// Block transfers queued so far.
    pub fn transfers(&self) -> usize {
        self.reads + self.writes
    }
}

enum Request {
    Inquiry,
    Read { lba: u32, count: u16 },
    Write { lba: u32, data: Vec<u8> },
}

struct InFlight {
    dev_addr: DeviceAddr,
    lun: u8,
    ticks_left: u32,
    request: Request,
}

/// Host stack simulation over [`RamDevice`]s.
pub struct SimHost {
    devices: [Option<RamDevice>; DEVICE_MAX],
    notifications: VecDeque<HostEvent>,
    in_flight: VecDeque<InFlight>,
    latency: u32,
    fail_next: [bool; DEVICE_MAX],
    /// Task calls left before the device in each slot is unplugged.
    detach_in: [Option<u32>; DEVICE_MAX],
    stats: TransferStats,
}

impl Default for SimHost {
    fn default() -> Self {
        Self::new()
    }
}

impl SimHost {
    pub fn new() -> Self {
        Self {
            devices: core::array::from_fn(|_| None),
            notifications: VecDeque::new(),
            in_flight: VecDeque::new(),
            latency: 0,
            fail_next: [false; DEVICE_MAX],
            detach_in: [None; DEVICE_MAX],
            stats: TransferStats::default(),
        }
    }

    fn slot(dev_addr: DeviceAddr) -> Option<usize> {
        let idx = (dev_addr as usize).checked_sub(1)?;
        (idx < DEVICE_MAX).then_some(idx)
    }

    /// Plug in a device. The mount notification arrives with the next task.
    pub fn attach(&mut self, dev_addr: DeviceAddr, device: RamDevice) -> Result<(), UsbError> {
        let idx = Self::slot(dev_addr).ok_or(UsbError::InvalidRequest)?;
        if self.devices[idx].is_some() {
            return Err(UsbError::Busy);
        }
        self.devices[idx] = Some(device);
        self.notifications.push_back(HostEvent::Mounted(dev_addr));
        debug!("sim: device {} attached", dev_addr);
        Ok(())
    }

    /// Unplug a device. Requests still in flight are dropped without completion.
    pub fn detach(&mut self, dev_addr: DeviceAddr) -> Option<RamDevice> {
        let idx = Self::slot(dev_addr)?;
        let device = self.devices[idx].take()?;
        self.detach_in[idx] = None;
        self.in_flight.retain(|req| req.dev_addr != dev_addr);
        self.notifications.push_back(HostEvent::Unmounted(dev_addr));
        debug!("sim: device {} detached", dev_addr);
        Some(device)
    }

    /// Unplug `dev_addr` at the start of the `ticks`-th following task call,
    /// before that call delivers anything.
    pub fn detach_after(&mut self, dev_addr: DeviceAddr, ticks: u32) {
        if let Some(idx) = Self::slot(dev_addr) {
            self.detach_in[idx] = Some(ticks.max(1));
        }
    }

    pub fn device(&self, dev_addr: DeviceAddr) -> Option<&RamDevice> {
        self.devices[Self::slot(dev_addr)?].as_ref()
    }

    /// Number of extra task calls before a request completes.
    pub fn set_latency(&mut self, ticks: u32) {
        self.latency = ticks;
    }

    /// Make the next request to `dev_addr` finish with a failing CSW.
    pub fn fail_next(&mut self, dev_addr: DeviceAddr) {
        if let Some(idx) = Self::slot(dev_addr) {
            self.fail_next[idx] = true;
        }
    }

    pub fn stats(&self) -> TransferStats {
        self.stats
    }

    pub fn in_flight(&self) -> usize {
        self.in_flight.len()
    }

    fn queue(&mut self, dev_addr: DeviceAddr, lun: u8, request: Request) -> Result<(), UsbError> {
        let idx = Self::slot(dev_addr).ok_or(UsbError::InvalidRequest)?;
        if self.devices[idx].is_none() {
            return Err(UsbError::NotMounted);
        }
        if lun != 0 {
            return Err(UsbError::InvalidRequest);
        }
        if self.in_flight.iter().any(|req| req.dev_addr == dev_addr) {
            return Err(UsbError::Busy);
        }
        self.in_flight.push_back(InFlight {
            dev_addr,
            lun,
            ticks_left: self.latency,
            request,
        });
        Ok(())
    }

    fn complete(&mut self, req: InFlight) -> Option<HostEvent> {
        let idx = Self::slot(req.dev_addr)?;
        let failed = core::mem::take(&mut self.fail_next[idx]);
        let device = self.devices[idx].as_mut()?;
        let InFlight { dev_addr, lun, request, .. } = req;

        let event = match request {
            Request::Inquiry => HostEvent::InquiryComplete {
                dev_addr,
                lun,
                status: if failed { CswStatus::Failed } else { CswStatus::Passed },
                response: device.inquiry,
            },
            Request::Read { lba, count } => {
                let range = device.range(lba, count as u32).filter(|_| !failed);
                let (status, data) = match range {
                    Some(range) => (CswStatus::Passed, device.storage[range].to_vec()),
                    None => (CswStatus::Failed, Vec::new()),
                };
                HostEvent::ReadComplete {
                    dev_addr,
                    lun,
                    status,
                    data,
                }
            }
            Request::Write { lba, data } => {
                let count = data.len() as u32 / device.block_size;
                let status = match device.range(lba, count).filter(|_| !failed) {
                    Some(range) => {
                        device.storage[range].copy_from_slice(&data);
                        CswStatus::Passed
                    }
                    None => CswStatus::Failed,
                };
                HostEvent::WriteComplete {
                    dev_addr,
                    lun,
                    status,
                }
            }
        };
        Some(event)
    }
}

impl MscHost for SimHost {
    fn task(&mut self, sink: &mut dyn FnMut(HostEvent)) {
        self.stats.tasks += 1;

        for idx in 0..DEVICE_MAX {
            let Some(left) = self.detach_in[idx] else {
                continue;
            };
            if left > 1 {
                self.detach_in[idx] = Some(left - 1);
            } else {
                self.detach_in[idx] = None;
                self.detach(idx as DeviceAddr + 1);
            }
        }

        while let Some(event) = self.notifications.pop_front() {
            sink(event);
        }

        let mut waiting = VecDeque::new();
        while let Some(mut req) = self.in_flight.pop_front() {
            if req.ticks_left > 0 {
                req.ticks_left -= 1;
                waiting.push_back(req);
            } else if let Some(event) = self.complete(req) {
                sink(event);
            }
        }
        self.in_flight = waiting;
    }

    fn mounted(&self, dev_addr: DeviceAddr) -> bool {
        self.device(dev_addr).is_some()
    }

    fn block_count(&self, dev_addr: DeviceAddr, _lun: u8) -> u32 {
        self.device(dev_addr).map_or(0, RamDevice::block_count)
    }

    fn block_size(&self, dev_addr: DeviceAddr, _lun: u8) -> u32 {
        self.device(dev_addr).map_or(0, RamDevice::block_size)
    }

    fn inquiry(&mut self, dev_addr: DeviceAddr, lun: u8) -> Result<(), UsbError> {
        self.queue(dev_addr, lun, Request::Inquiry)?;
        self.stats.inquiries += 1;
        Ok(())
    }

    fn read10(
        &mut self,
        dev_addr: DeviceAddr,
        lun: u8,
        lba: u32,
        count: u16,
    ) -> Result<(), UsbError> {
        self.queue(dev_addr, lun, Request::Read { lba, count })?;
        self.stats.reads += 1;
        trace!("sim: READ10 dev {} lba {} count {}", dev_addr, lba, count);
        Ok(())
    }

    fn write10(
        &mut self,
        dev_addr: DeviceAddr,
        lun: u8,
        lba: u32,
        data: &[u8],
    ) -> Result<(), UsbError> {
        let block_size = self.block_size(dev_addr, lun) as usize;
        if block_size == 0 || data.len() % block_size != 0 {
            return Err(UsbError::InvalidRequest);
        }
        self.queue(
            dev_addr,
            lun,
            Request::Write {
                lba,
                data: data.to_vec(),
            },
        )?;
        self.stats.writes += 1;
        trace!("sim: WRITE10 dev {} lba {} bytes {}", dev_addr, lba, data.len());
        Ok(())
    }
}
