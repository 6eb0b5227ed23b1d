//! msc_explorer - browse FAT volumes on USB mass-storage devices from a shell.
//!
//! The crate glues three collaborators together:
//!
//! - a USB host stack's mass-storage class driver, consumed through
//!   [`usb::MscHost`],
//! - the `fatfs` filesystem, mounted per device in [`fs::Volumes`],
//! - the line-oriented command interpreter in [`cli`].
//!
//! The block-device adapter in [`disk`] turns asynchronous MSC transfers into
//! the blocking sector I/O that `fatfs` expects, and [`app::MscApp`] maps
//! device mount/unmount events onto filesystem mounts.

#![cfg_attr(not(test), no_std)]

extern crate alloc;

pub mod app;
pub mod cli;
pub mod config;
pub mod console;
pub mod disk;
pub mod error;
pub mod fs;
pub mod sync;
pub mod usb;

pub use app::MscApp;
pub use error::{DiskError, ExplorerResult, FsError};
