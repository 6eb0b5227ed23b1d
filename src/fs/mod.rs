//! Mounted FAT volumes, one per device slot.
//!
//! Each volume keeps its own working directory. The current drive selects
//! which volume relative paths refer to; having no current drive is valid
//! (nothing mounted yet, or the last drive went away).

mod path;

use alloc::format;
use alloc::string::String;
use alloc::vec::Vec;

use fatfs::{FsOptions, LossyOemCpConverter, NullTimeProvider};
use log::{debug, info, warn};

use crate::config::DEVICE_MAX;
use crate::disk::{DiskIo, SharedDisk};
use crate::error::FsError;

pub use path::{DrivePath, drive_path, resolve_path, split_drive};

pub(crate) type FS = fatfs::FileSystem<DiskIo, NullTimeProvider, LossyOemCpConverter>;
type FsDir<'a> = fatfs::Dir<'a, DiskIo, NullTimeProvider, LossyOemCpConverter>;

/// One directory listing entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirEntryInfo {
    pub name: String,
    pub is_dir: bool,
    pub size: u64,
}

struct Volume {
    fs: FS,
    cwd: String,
}

/// The mount table.
pub struct Volumes {
    drives: [Option<Volume>; DEVICE_MAX],
    current: Option<u8>,
}

impl Default for Volumes {
    fn default() -> Self {
        Self::new()
    }
}

impl Volumes {
    pub fn new() -> Self {
        Self {
            drives: core::array::from_fn(|_| None),
            current: None,
        }
    }

    /// Mount the FAT volume found on `disk` as `drive`, replacing any volume
    /// already mounted there.
    pub fn mount(&mut self, drive: u8, disk: SharedDisk) -> Result<(), FsError> {
        if drive as usize >= DEVICE_MAX {
            return Err(FsError::InvalidDrive);
        }
        if self.drives[drive as usize].is_some() {
            warn!("drive {} already mounted, replacing it", drive);
            self.unmount(drive)?;
        }

        let io = DiskIo::new(disk, drive).map_err(|e| FsError::Disk(e.into()))?;
        let options = FsOptions::new()
            .update_accessed_date(false)
            .time_provider(NullTimeProvider::new());
        let fs = fatfs::FileSystem::new(io, options)?;
        info!("drive {} mounted ({:?})", drive, fs.fat_type());

        self.drives[drive as usize] = Some(Volume {
            fs,
            cwd: String::from("/"),
        });
        Ok(())
    }

    /// Unmount `drive`. When it was the current drive, the lowest-numbered
    /// drive still mounted becomes current, or none.
    pub fn unmount(&mut self, drive: u8) -> Result<(), FsError> {
        let volume = self
            .drives
            .get_mut(drive as usize)
            .ok_or(FsError::InvalidDrive)?
            .take()
            .ok_or(FsError::NotEnabled)?;

        // The device may already be gone, so a failed flush is not an error.
        if let Err(e) = volume.fs.unmount() {
            debug!("drive {}: unmount flush failed: {:?}", drive, e);
        }

        if self.current == Some(drive) {
            let next = self.mounted_drives().next();
            self.current = next;
            match next {
                Some(next) => info!("current drive {} removed, switching to {}", drive, next),
                None => info!("current drive {} removed, no drive left", drive),
            }
        }
        Ok(())
    }

    pub fn is_mounted(&self, drive: u8) -> bool {
        self.drives
            .get(drive as usize)
            .is_some_and(|slot| slot.is_some())
    }

    /// Mounted drive numbers in ascending order.
    pub fn mounted_drives(&self) -> impl Iterator<Item = u8> + '_ {
        self.drives
            .iter()
            .enumerate()
            .filter(|(_, slot)| slot.is_some())
            .map(|(i, _)| i as u8)
    }

    pub fn current_drive(&self) -> Option<u8> {
        self.current
    }

    pub fn change_drive(&mut self, drive: u8) -> Result<(), FsError> {
        self.volume(drive)?;
        self.current = Some(drive);
        Ok(())
    }

    /// `N:/path` of the current directory.
    pub fn current_dir(&self) -> Result<String, FsError> {
        let drive = self.current.ok_or(FsError::NotEnabled)?;
        let volume = self.volume(drive)?;
        Ok(format!("{}{}", drive_path(drive), volume.cwd))
    }

    /// Change the working directory.
    ///
    /// A drive prefix such as `1:/docs` also makes that drive current, so
    /// `cd` doubles as a drive switch. This differs from a plain chdir that
    /// only updates the named drive's directory; use [`Self::change_drive`]
    /// alone to switch drives without touching any directory.
    pub fn change_dir(&mut self, path: &str) -> Result<(), FsError> {
        let (drive, target) = self.locate(path)?;
        {
            let volume = self.volume(drive)?;
            open_dir(&volume.fs, &target)?;
        }
        if let Some(volume) = self.drives[drive as usize].as_mut() {
            volume.cwd = target;
        }
        self.current = Some(drive);
        Ok(())
    }

    /// Entries of a directory, `.` and `..` included when the directory
    /// has them.
    pub fn read_dir(&self, path: &str) -> Result<Vec<DirEntryInfo>, FsError> {
        let (drive, target) = self.locate(path)?;
        let volume = self.volume(drive)?;
        let dir = open_dir(&volume.fs, &target)?;

        let mut entries = Vec::new();
        for entry in dir.iter() {
            let e = entry?;
            entries.push(DirEntryInfo {
                name: e.file_name(),
                is_dir: e.is_dir(),
                size: e.len(),
            });
        }
        Ok(entries)
    }

    fn volume(&self, drive: u8) -> Result<&Volume, FsError> {
        self.drives
            .get(drive as usize)
            .ok_or(FsError::InvalidDrive)?
            .as_ref()
            .ok_or(FsError::NotEnabled)
    }

    /// Drive and absolute in-volume path named by `path`.
    fn locate(&self, path: &str) -> Result<(u8, String), FsError> {
        let split = split_drive(path)?;
        let drive = match split.drive {
            Some(drive) => drive,
            None => self.current.ok_or(FsError::NotEnabled)?,
        };
        let volume = self.volume(drive)?;
        Ok((drive, resolve_path(&volume.cwd, split.path)))
    }
}

fn open_dir<'a>(fs: &'a FS, target: &str) -> Result<FsDir<'a>, FsError> {
    let root = fs.root_dir();
    if target == "/" {
        return Ok(root);
    }
    // Strip leading / for fatfs
    let rel_path = target.strip_prefix('/').unwrap_or(target);
    root.open_dir(rel_path).map_err(|e| match e {
        fatfs::Error::NotFound => FsError::NoPath,
        // fatfs reports a file where a directory was expected this way
        fatfs::Error::InvalidInput => FsError::NotADirectory,
        other => other.into(),
    })
}
