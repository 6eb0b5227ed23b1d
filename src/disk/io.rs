use core::cmp::min;

use alloc::vec;
use alloc::vec::Vec;

use fatfs::{IoBase, Read, Seek, SeekFrom, Write};
use log::{error, trace};

use super::{DiskStatus, IoctlCommand, IoctlResponse, SharedDisk};
use crate::error::{DiskError, IoError};

/// A wrapper struct needed by fatfs to access one drive.
///
/// It maintains a current seek position/cursor. Whole aligned sectors are
/// transferred directly; partial sectors go through a one-sector cache
/// (read-modify-write), flushed on `flush` and on drop.
pub struct DiskIo {
    disk: SharedDisk,
    pdrv: u8,
    pos: u64,
    sector_size: usize,
    sector_count: u64,
    sector_buffer: Vec<u8>,
    buffer_sector: Option<u32>,
    buffer_dirty: bool,
}

impl DiskIo {
    pub fn new(disk: SharedDisk, pdrv: u8) -> Result<Self, DiskError> {
        let (sector_size, sector_count) = {
            let mut dev = disk.lock();
            if dev.initialize(pdrv).contains(DiskStatus::NODISK) {
                return Err(DiskError::NotReady);
            }
            let size = match dev.ioctl(pdrv, IoctlCommand::GetSectorSize)? {
                IoctlResponse::SectorSize(size) if size > 0 => size as usize,
                _ => return Err(DiskError::InvalidParameter),
            };
            let count = match dev.ioctl(pdrv, IoctlCommand::GetSectorCount)? {
                IoctlResponse::SectorCount(count) => count as u64,
                _ => return Err(DiskError::InvalidParameter),
            };
            (size, count)
        };

        Ok(Self {
            disk,
            pdrv,
            pos: 0,
            sector_size,
            sector_count,
            sector_buffer: vec![0u8; sector_size],
            buffer_sector: None,
            buffer_dirty: false,
        })
    }

    pub fn capacity(&self) -> u64 {
        self.sector_count * self.sector_size as u64
    }

    fn flush_buffer(&mut self) -> Result<(), IoError> {
        if self.buffer_dirty {
            if let Some(sector) = self.buffer_sector {
                self.disk
                    .lock()
                    .write(self.pdrv, &self.sector_buffer, sector, 1)?;
                self.buffer_dirty = false;
            }
        }
        Ok(())
    }

    fn load_sector(&mut self, sector: u32) -> Result<(), IoError> {
        if self.buffer_sector == Some(sector) {
            return Ok(());
        }

        self.flush_buffer()?;
        self.buffer_sector = None;
        self.disk
            .lock()
            .read(self.pdrv, &mut self.sector_buffer, sector, 1)?;
        self.buffer_sector = Some(sector);
        Ok(())
    }

    /// Whether the cached sector lies in `[first, first + count)`.
    fn buffer_within(&self, first: u32, count: usize) -> bool {
        self.buffer_sector
            .is_some_and(|s| s >= first && ((s - first) as usize) < count)
    }

    /// Position split into sector number and offset inside it.
    fn cursor(&self) -> Result<(u32, usize), IoError> {
        let sector = u32::try_from(self.pos / self.sector_size as u64)
            .map_err(|_| IoError::Seek)?;
        Ok((sector, (self.pos % self.sector_size as u64) as usize))
    }

    /// Bytes left before the end of the medium, capped at `want`.
    fn clamp(&self, want: usize) -> usize {
        min(want as u64, self.capacity().saturating_sub(self.pos)) as usize
    }

    /// Sectors per direct transfer, bounded by the READ10/WRITE10 count field.
    fn run_len(&self, remaining: usize) -> usize {
        min(remaining / self.sector_size, u16::MAX as usize)
    }
}

impl IoBase for DiskIo {
    type Error = IoError;
}

impl Read for DiskIo {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize, Self::Error> {
        let len = self.clamp(buf.len());
        let mut read_len = 0;

        while read_len < len {
            let (sector, offset) = self.cursor()?;
            let remaining = len - read_len;
            let run = self.run_len(remaining);

            let copied = if offset == 0 && run > 0 {
                if self.buffer_dirty && self.buffer_within(sector, run) {
                    self.flush_buffer()?;
                }
                let bytes = run * self.sector_size;
                if let Err(e) = self.disk.lock().read(
                    self.pdrv,
                    &mut buf[read_len..read_len + bytes],
                    sector,
                    run as u32,
                ) {
                    error!("disk {} read error: {}", self.pdrv, e);
                    return Err(e.into());
                }
                bytes
            } else {
                self.load_sector(sector)?;
                let n = min(remaining, self.sector_size - offset);
                buf[read_len..read_len + n]
                    .copy_from_slice(&self.sector_buffer[offset..offset + n]);
                n
            };

            self.pos += copied as u64;
            read_len += copied;
        }

        Ok(read_len)
    }
}

impl Write for DiskIo {
    fn write(&mut self, buf: &[u8]) -> Result<usize, Self::Error> {
        let len = self.clamp(buf.len());
        let mut written_len = 0;

        while written_len < len {
            let (sector, offset) = self.cursor()?;
            let remaining = len - written_len;
            let run = self.run_len(remaining);

            let copied = if offset == 0 && run > 0 {
                // the direct write supersedes whatever the cache holds
                if self.buffer_within(sector, run) {
                    self.buffer_sector = None;
                    self.buffer_dirty = false;
                }
                let bytes = run * self.sector_size;
                if let Err(e) = self.disk.lock().write(
                    self.pdrv,
                    &buf[written_len..written_len + bytes],
                    sector,
                    run as u32,
                ) {
                    error!("disk {} write error: {}", self.pdrv, e);
                    return Err(e.into());
                }
                bytes
            } else {
                // Read-Modify-Write
                self.load_sector(sector)?;
                let n = min(remaining, self.sector_size - offset);
                self.sector_buffer[offset..offset + n]
                    .copy_from_slice(&buf[written_len..written_len + n]);
                self.buffer_dirty = true;
                n
            };

            self.pos += copied as u64;
            written_len += copied;
        }

        Ok(written_len)
    }

    fn flush(&mut self) -> Result<(), Self::Error> {
        self.flush_buffer()?;
        self.disk.lock().ioctl(self.pdrv, IoctlCommand::Sync)?;
        Ok(())
    }
}

impl Seek for DiskIo {
    fn seek(&mut self, pos: SeekFrom) -> Result<u64, Self::Error> {
        let new_pos = match pos {
            SeekFrom::Start(off) => Some(off),
            SeekFrom::Current(off) => self.pos.checked_add_signed(off),
            SeekFrom::End(off) => self.capacity().checked_add_signed(off),
        };
        self.pos = new_pos.ok_or(IoError::Seek)?;
        Ok(self.pos)
    }
}

impl Drop for DiskIo {
    fn drop(&mut self) {
        if let Err(e) = self.flush_buffer() {
            trace!("disk {}: dropping unflushed sector: {:?}", self.pdrv, e);
        }
    }
}

#[cfg(test)]
mod tests {
    use alloc::sync::Arc;

    use super::*;
    use crate::disk::{BlockDevice, MscDisk};
    use crate::sync::Mutex;
    use crate::usb::{RamDevice, SimHost};

    fn shared(blocks: u32) -> (Arc<Mutex<MscDisk<SimHost>>>, SharedDisk) {
        let mut host = SimHost::new();
        host.attach(1, RamDevice::new(blocks, 512)).unwrap();
        let disk = Arc::new(Mutex::new(MscDisk::new(host)));
        disk.lock().task();
        let dyn_disk: SharedDisk = disk.clone();
        (disk, dyn_disk)
    }

    #[test]
    fn test_new_requires_device() {
        let (_disk, dyn_disk) = shared(16);
        assert_eq!(DiskIo::new(dyn_disk.clone(), 1).err(), Some(DiskError::NotReady));
        let io = DiskIo::new(dyn_disk, 0).unwrap();
        assert_eq!(io.capacity(), 16 * 512);
    }

    #[test]
    #[cfg(not(feature = "readonly"))]
    fn test_unaligned_write_read() {
        let (disk, dyn_disk) = shared(16);
        let mut io = DiskIo::new(dyn_disk, 0).unwrap();

        io.seek(SeekFrom::Start(500)).unwrap();
        io.write_all(&[7u8; 40]).unwrap();
        io.flush().unwrap();

        {
            let guard = disk.lock();
            let data = guard.host().device(1).unwrap().data();
            assert!(data[500..540].iter().all(|&b| b == 7));
            assert_eq!(data[499], 0);
            assert_eq!(data[540], 0);
        }

        io.seek(SeekFrom::Start(498)).unwrap();
        let mut back = [0u8; 44];
        io.read_exact(&mut back).unwrap();
        assert_eq!(&back[..2], &[0, 0]);
        assert!(back[2..42].iter().all(|&b| b == 7));
    }

    #[test]
    #[cfg(not(feature = "readonly"))]
    fn test_aligned_runs_use_one_transfer() {
        let (disk, dyn_disk) = shared(16);
        let mut io = DiskIo::new(dyn_disk, 0).unwrap();

        let data: Vec<u8> = (0..2048).map(|i| (i % 251) as u8).collect();
        io.seek(SeekFrom::Start(1024)).unwrap();
        io.write_all(&data).unwrap();
        assert_eq!(disk.lock().host().stats().writes, 1);

        io.seek(SeekFrom::Start(1024)).unwrap();
        let mut back = vec![0u8; 2048];
        io.read_exact(&mut back).unwrap();
        assert_eq!(back, data);
        assert_eq!(disk.lock().host().stats().reads, 1);
    }

    #[test]
    fn test_read_stops_at_end_of_medium() {
        let (_disk, dyn_disk) = shared(2);
        let mut io = DiskIo::new(dyn_disk, 0).unwrap();
        assert_eq!(io.seek(SeekFrom::End(-10)).unwrap(), 1014);
        let mut buf = [0u8; 64];
        assert_eq!(io.read(&mut buf).unwrap(), 10);
        assert_eq!(io.read(&mut buf).unwrap(), 0);
        assert_eq!(io.seek(SeekFrom::Current(-2000)), Err(IoError::Seek));
    }

    #[test]
    #[cfg(not(feature = "readonly"))]
    fn test_dirty_sector_flushed_on_drop() {
        let (disk, dyn_disk) = shared(4);
        {
            let mut io = DiskIo::new(dyn_disk, 0).unwrap();
            io.seek(SeekFrom::Start(3)).unwrap();
            io.write_all(b"abc").unwrap();
        }
        let guard = disk.lock();
        assert_eq!(&guard.host().device(1).unwrap().data()[3..6], b"abc");
        assert!(!guard.is_busy(0));
    }

    #[test]
    fn test_unplugged_device_reports_error() {
        let (disk, dyn_disk) = shared(4);
        let mut io = DiskIo::new(dyn_disk, 0).unwrap();
        disk.lock().host_mut().detach(1);
        let mut buf = [0u8; 16];
        assert_eq!(io.read(&mut buf), Err(IoError::Disk(DiskError::NotReady)));
        assert_eq!(disk.lock().status(0), DiskStatus::NODISK);
    }
}
