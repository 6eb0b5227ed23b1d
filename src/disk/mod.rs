//! Block-device adapter between `fatfs` and the USB mass-storage host.
//!
//! Filesystems want synchronous sector I/O while USB transfers complete
//! asynchronously. [`MscDisk`] bridges the two: each read or write sets the
//! slot's busy flag, queues the transfer and then keeps running the host
//! stack until the completion event clears the flag. There is no timeout; a
//! transfer that never completes blocks the caller.
//!
//! Events that are not block-transfer completions (mounts, unmounts, inquiry
//! results) are kept for the application and handed out by [`MscDisk::task`].

mod io;

use alloc::collections::VecDeque;
use alloc::sync::Arc;
use alloc::vec::Vec;

use bitflags::bitflags;
use log::{trace, warn};

use crate::config::{DEVICE_MAX, MSC_LUN};
use crate::error::DiskError;
use crate::sync::Mutex;
use crate::usb::{CswStatus, DeviceAddr, HostEvent, MscHost};

pub use io::DiskIo;

bitflags! {
    /// Drive status bits.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct DiskStatus: u8 {
        /// No medium in the drive.
        const NODISK = 0x02;
        const PROTECT = 0x04;
    }
}

/// Control requests understood by a [`BlockDevice`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IoctlCommand {
    /// Finish pending writes.
    Sync,
    GetSectorCount,
    GetSectorSize,
    /// Erase block size in units of sectors.
    GetBlockSize,
    /// Inform the device that a sector range is no longer used.
    Trim { start: u32, end: u32 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IoctlResponse {
    Done,
    SectorCount(u32),
    SectorSize(u16),
    BlockSize(u32),
}

/// Sector-addressed storage, one physical drive per slot.
pub trait BlockDevice {
    fn status(&self, pdrv: u8) -> DiskStatus;

    fn initialize(&mut self, pdrv: u8) -> DiskStatus;

    /// Read `count` sectors starting at `lba` into `buf`.
    fn read(&mut self, pdrv: u8, buf: &mut [u8], lba: u32, count: u32) -> Result<(), DiskError>;

    /// Write `count` sectors starting at `lba` from `buf`.
    fn write(&mut self, pdrv: u8, buf: &[u8], lba: u32, count: u32) -> Result<(), DiskError>;

    fn ioctl(&mut self, pdrv: u8, cmd: IoctlCommand) -> Result<IoctlResponse, DiskError>;
}

/// Block device shared by every mounted volume.
pub type SharedDisk = Arc<Mutex<dyn BlockDevice>>;

#[derive(Default)]
struct DiskSlot {
    /// Set while a transfer is outstanding, cleared by its completion.
    busy: bool,
    outcome: Option<Result<Vec<u8>, DiskError>>,
}

/// [`BlockDevice`] over the mass-storage class of a USB host stack.
pub struct MscDisk<H> {
    host: H,
    slots: [DiskSlot; DEVICE_MAX],
    deferred: VecDeque<HostEvent>,
}

impl<H: MscHost> MscDisk<H> {
    pub fn new(host: H) -> Self {
        Self {
            host,
            slots: core::array::from_fn(|_| DiskSlot::default()),
            deferred: VecDeque::new(),
        }
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    pub fn host_mut(&mut self) -> &mut H {
        &mut self.host
    }

    /// Whether a transfer is outstanding on the slot.
    pub fn is_busy(&self, pdrv: u8) -> bool {
        self.slots
            .get(pdrv as usize)
            .is_some_and(|slot| slot.busy)
    }

    /// Run the host stack once and return every event meant for the
    /// application, including those that arrived while waiting on a transfer.
    pub fn task(&mut self) -> Vec<HostEvent> {
        let Self {
            host,
            slots,
            deferred,
        } = &mut *self;
        host.task(&mut |event| route(slots, deferred, event));
        self.deferred.drain(..).collect()
    }

    fn ready(&self, pdrv: u8) -> Result<DeviceAddr, DiskError> {
        if pdrv as usize >= DEVICE_MAX {
            return Err(DiskError::InvalidDrive);
        }
        let dev_addr = pdrv + 1;
        if !self.host.mounted(dev_addr) {
            return Err(DiskError::NotReady);
        }
        Ok(dev_addr)
    }

    /// Validate a transfer of `count` sectors held in `len` bytes.
    fn transfer_len(&self, dev_addr: DeviceAddr, len: usize, count: u32) -> Result<u16, DiskError> {
        let block_size = self.host.block_size(dev_addr, MSC_LUN) as usize;
        let count16 = u16::try_from(count).map_err(|_| DiskError::InvalidParameter)?;
        if count16 == 0 || block_size == 0 || len != count as usize * block_size {
            return Err(DiskError::InvalidParameter);
        }
        Ok(count16)
    }

    /// Spin on the host stack until the slot's transfer completes.
    fn wait_for_disk_io(&mut self, pdrv: u8) -> Result<Vec<u8>, DiskError> {
        let idx = pdrv as usize;
        while self.slots[idx].busy {
            let Self {
                host,
                slots,
                deferred,
            } = &mut *self;
            host.task(&mut |event| route(slots, deferred, event));
        }
        self.slots[idx].outcome.take().unwrap_or(Err(DiskError::NotReady))
    }
}

/// Deliver an event: transfer completions go to their slot, everything else
/// waits for the application.
fn route(slots: &mut [DiskSlot; DEVICE_MAX], deferred: &mut VecDeque<HostEvent>, event: HostEvent) {
    let Some(slot) = (event.dev_addr() as usize)
        .checked_sub(1)
        .and_then(|idx| slots.get_mut(idx))
    else {
        warn!("event for unknown device {}: {:?}", event.dev_addr(), event);
        return;
    };

    let outcome = match event {
        HostEvent::ReadComplete { status, data, .. } => transfer_outcome(status, data),
        HostEvent::WriteComplete { status, .. } => transfer_outcome(status, Vec::new()),
        HostEvent::Unmounted(dev_addr) => {
            if slot.busy {
                warn!("device {} removed during a transfer", dev_addr);
                slot.busy = false;
                slot.outcome = Some(Err(DiskError::NotReady));
            }
            deferred.push_back(event);
            return;
        }
        other => {
            deferred.push_back(other);
            return;
        }
    };

    if slot.busy {
        slot.busy = false;
        slot.outcome = Some(outcome);
    } else {
        trace!("dropping stale transfer completion");
    }
}

fn transfer_outcome(status: CswStatus, data: Vec<u8>) -> Result<Vec<u8>, DiskError> {
    if status.is_passed() {
        Ok(data)
    } else {
        Err(DiskError::Transfer(status))
    }
}

impl<H: MscHost> BlockDevice for MscDisk<H> {
    fn status(&self, pdrv: u8) -> DiskStatus {
        match self.ready(pdrv) {
            Ok(_) if cfg!(feature = "readonly") => DiskStatus::PROTECT,
            Ok(_) => DiskStatus::empty(),
            Err(_) => DiskStatus::NODISK,
        }
    }

    fn initialize(&mut self, pdrv: u8) -> DiskStatus {
        // nothing to do, the host stack enumerates the device
        self.status(pdrv)
    }

    fn read(&mut self, pdrv: u8, buf: &mut [u8], lba: u32, count: u32) -> Result<(), DiskError> {
        let dev_addr = self.ready(pdrv)?;
        let count = self.transfer_len(dev_addr, buf.len(), count)?;

        self.slots[pdrv as usize].busy = true;
        if let Err(err) = self.host.read10(dev_addr, MSC_LUN, lba, count) {
            self.slots[pdrv as usize].busy = false;
            return Err(DiskError::Submit(err));
        }
        trace!("disk {}: read lba {} count {}", pdrv, lba, count);

        let data = self.wait_for_disk_io(pdrv)?;
        if data.len() != buf.len() {
            return Err(DiskError::Transfer(CswStatus::PhaseError));
        }
        buf.copy_from_slice(&data);
        Ok(())
    }

    fn write(&mut self, pdrv: u8, buf: &[u8], lba: u32, count: u32) -> Result<(), DiskError> {
        let dev_addr = self.ready(pdrv)?;
        if cfg!(feature = "readonly") {
            return Err(DiskError::WriteProtected);
        }
        let count = self.transfer_len(dev_addr, buf.len(), count)?;

        self.slots[pdrv as usize].busy = true;
        if let Err(err) = self.host.write10(dev_addr, MSC_LUN, lba, buf) {
            self.slots[pdrv as usize].busy = false;
            return Err(DiskError::Submit(err));
        }
        trace!("disk {}: write lba {} count {}", pdrv, lba, count);

        self.wait_for_disk_io(pdrv).map(|_| ())
    }

    fn ioctl(&mut self, pdrv: u8, cmd: IoctlCommand) -> Result<IoctlResponse, DiskError> {
        let dev_addr = self.ready(pdrv)?;
        match cmd {
            // nothing to do since we do blocking
            IoctlCommand::Sync => Ok(IoctlResponse::Done),
            IoctlCommand::GetSectorCount => Ok(IoctlResponse::SectorCount(
                self.host.block_count(dev_addr, MSC_LUN),
            )),
            IoctlCommand::GetSectorSize => {
                let size = self.host.block_size(dev_addr, MSC_LUN);
                u16::try_from(size)
                    .map(IoctlResponse::SectorSize)
                    .map_err(|_| DiskError::InvalidParameter)
            }
            IoctlCommand::GetBlockSize => Ok(IoctlResponse::BlockSize(1)),
            IoctlCommand::Trim { .. } => Err(DiskError::InvalidParameter),
        }
    }
}
