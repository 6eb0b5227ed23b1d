//! Error types.
//!
//! Command handlers and initialization use [`ExplorerResult`], an alias for
//! `anyhow::Result`. The block and volume layers have their own small enums so
//! callers can match on them:
//!
//! - [`DiskError`] for the block-device adapter,
//! - [`IoError`] for the `fatfs` byte stream on top of it,
//! - [`FsError`] for mounted volumes and path lookups.

use core::fmt;

use crate::usb::{CswStatus, UsbError};

/// Result type alias using anyhow::Error.
pub type ExplorerResult<T> = anyhow::Result<T>;

/// Block-device failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiskError {
    /// No device is mounted in the slot.
    NotReady,
    /// Slot number out of range.
    InvalidDrive,
    /// Bad buffer size or unsupported control code.
    InvalidParameter,
    WriteProtected,
    /// The device answered with a failing CSW.
    Transfer(CswStatus),
    /// The host stack refused the request.
    Submit(UsbError),
}

impl fmt::Display for DiskError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotReady => write!(f, "device not ready"),
            Self::InvalidDrive => write!(f, "invalid drive"),
            Self::InvalidParameter => write!(f, "invalid parameter"),
            Self::WriteProtected => write!(f, "write protected"),
            Self::Transfer(status) => write!(f, "transfer failed: {:?}", status),
            Self::Submit(err) => write!(f, "request rejected: {}", err),
        }
    }
}

/// Errors of the byte-stream view handed to `fatfs`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IoError {
    Disk(DiskError),
    UnexpectedEof,
    WriteZero,
    Seek,
}

// Implement the strict error type required by fatfs
impl fatfs::IoError for IoError {
    fn is_interrupted(&self) -> bool {
        false
    }

    fn new_unexpected_eof_error() -> Self {
        Self::UnexpectedEof
    }

    fn new_write_zero_error() -> Self {
        Self::WriteZero
    }
}

impl From<DiskError> for IoError {
    fn from(err: DiskError) -> Self {
        Self::Disk(err)
    }
}

/// Volume and path failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FsError {
    /// Drive number out of range or malformed drive prefix.
    InvalidDrive,
    /// Drive in range but nothing mounted there.
    NotEnabled,
    NoPath,
    /// Any other `fatfs` failure.
    NoFile,
    /// A path component names a file.
    NotADirectory,
    Exists,
    NotEmpty,
    /// No free cluster left on the volume.
    NoSpace,
    /// Name too long or holding a character FAT does not allow.
    InvalidName,
    /// The medium holds no FAT volume.
    NoFilesystem,
    Disk(IoError),
}

impl fmt::Display for FsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidDrive => write!(f, "invalid drive"),
            Self::NotEnabled => write!(f, "drive not mounted"),
            Self::NoPath => write!(f, "no such path"),
            Self::NoFile => write!(f, "no such file"),
            Self::NotADirectory => write!(f, "not a directory"),
            Self::Exists => write!(f, "already exists"),
            Self::NotEmpty => write!(f, "directory not empty"),
            Self::NoSpace => write!(f, "no space left on volume"),
            Self::InvalidName => write!(f, "invalid name"),
            Self::NoFilesystem => write!(f, "no FAT filesystem"),
            Self::Disk(err) => write!(f, "disk error: {:?}", err),
        }
    }
}

impl From<IoError> for FsError {
    fn from(err: IoError) -> Self {
        Self::Disk(err)
    }
}

impl From<fatfs::Error<IoError>> for FsError {
    fn from(err: fatfs::Error<IoError>) -> Self {
        match err {
            fatfs::Error::Io(io) => Self::Disk(io),
            fatfs::Error::NotFound => Self::NoPath,
            fatfs::Error::CorruptedFileSystem => Self::NoFilesystem,
            fatfs::Error::UnexpectedEof => Self::Disk(IoError::UnexpectedEof),
            fatfs::Error::WriteZero => Self::Disk(IoError::WriteZero),
            // callers that know the request refine this, see `fs::open_dir`
            fatfs::Error::InvalidInput => Self::NoFile,
            fatfs::Error::AlreadyExists => Self::Exists,
            fatfs::Error::DirectoryIsNotEmpty => Self::NotEmpty,
            fatfs::Error::NotEnoughSpace => Self::NoSpace,
            fatfs::Error::InvalidFileNameLength | fatfs::Error::UnsupportedFileNameCharacter => {
                Self::InvalidName
            }
            // `fatfs::Error` is non-exhaustive
            _ => Self::NoFile,
        }
    }
}
