//! Drive-prefixed path handling.
//!
//! Paths look like `[N:][/]a/b`, where `N` is a decimal drive number. A path
//! without a drive prefix refers to the current drive; a path without a
//! leading `/` is relative to that drive's working directory.

use alloc::format;
use alloc::string::String;
use alloc::vec::Vec;

use crate::error::FsError;

/// A path split at its drive prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DrivePath<'a> {
    pub drive: Option<u8>,
    pub path: &'a str,
}

pub fn split_drive(path: &str) -> Result<DrivePath<'_>, FsError> {
    let Some((prefix, rest)) = path.split_once(':') else {
        return Ok(DrivePath { drive: None, path });
    };
    if prefix.is_empty() || !prefix.bytes().all(|b| b.is_ascii_digit()) {
        return Err(FsError::InvalidDrive);
    }
    let drive = prefix.parse::<u8>().map_err(|_| FsError::InvalidDrive)?;
    Ok(DrivePath {
        drive: Some(drive),
        path: rest,
    })
}

/// Drive identifier as typed by users, e.g. `"0:"`.
pub fn drive_path(drive: u8) -> String {
    format!("{}:", drive)
}

/// Resolve `path` against `cwd` into an absolute, normalized path.
pub fn resolve_path(cwd: &str, path: &str) -> String {
    let abs_path = if path.starts_with('/') {
        String::from(path)
    } else if cwd.ends_with('/') {
        format!("{}{}", cwd, path)
    } else {
        format!("{}/{}", cwd, path)
    };

    let mut parts = Vec::new();
    for part in abs_path.split('/') {
        if part.is_empty() || part == "." {
            continue;
        }
        if part == ".." {
            parts.pop();
        } else {
            parts.push(part);
        }
    }

    let mut res = String::from("/");
    res.push_str(&parts.join("/"));
    res
}
