//! POSIX permission inspection for template source files.
//!
//! Only the owner-execute bit is carried into archives; every other bit is
//! normalised, since source permissions mean little across platforms.

use std::path::Path;

/// Unix mode given to archive entries whose source is executable.
pub const RWXR_XR_X: u32 = 0o755;

const OWNER_EXECUTE: u32 = 0o100;

/// Permission bits of a file, as reported by the filesystem.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PosixPermissions(u32);

impl PosixPermissions {
    /// Wrap raw mode bits; anything above the permission bits is dropped.
    pub fn from_mode(mode: u32) -> Self {
        PosixPermissions(mode & 0o777)
    }

    /// The permission bits.
    pub fn mode(&self) -> u32 {
        self.0
    }

    /// Whether the owner-execute bit is set.
    pub fn is_executable(&self) -> bool {
        self.0 & OWNER_EXECUTE != 0
    }
}

/// Read the permissions of `path`.
///
/// Returns `None` when the platform has no POSIX permissions or the file
/// cannot be inspected.
#[cfg(unix)]
pub fn permissions(path: &Path) -> Option<PosixPermissions> {
    use std::os::unix::fs::PermissionsExt;

    std::fs::metadata(path)
        .ok()
        .map(|metadata| PosixPermissions::from_mode(metadata.permissions().mode()))
}

#[cfg(not(unix))]
pub fn permissions(_path: &Path) -> Option<PosixPermissions> {
    None
}
