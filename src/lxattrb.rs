//! Codec for the `LXATTRB` attribute value
//!
//! WSL keeps the Linux identity of a file — mode bits, owner, device
//! numbers, timestamps — in a single extended attribute named `LXATTRB`
//! whose value is a packed little-endian record. This module parses and
//! generates that record and provides helpers for working with the
//! `st_mode` bitset it carries.

use bitflags::bitflags;

use crate::error::{EaError, Result};

/// Name of the attribute WSL stores its Linux metadata under.
pub const LXATTRB: &str = "LXATTRB";

// file-type field of st_mode
const S_IFMT: u32 = 0o170_000;
const S_IFSOCK: u32 = 0o140_000;
const S_IFLNK: u32 = 0o120_000;
const S_IFREG: u32 = 0o100_000;
const S_IFBLK: u32 = 0o060_000;
const S_IFDIR: u32 = 0o040_000;
const S_IFCHR: u32 = 0o020_000;
const S_IFIFO: u32 = 0o010_000;

bitflags! {
    /// Permission and protection bits of a Unix `st_mode`.
    #[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
    pub struct Permissions: u32 {
        const SET_UID = 0o4000;
        const SET_GID = 0o2000;
        const STICKY = 0o1000;
        const OWNER_READ = 0o400;
        const OWNER_WRITE = 0o200;
        const OWNER_EXECUTE = 0o100;
        const GROUP_READ = 0o040;
        const GROUP_WRITE = 0o020;
        const GROUP_EXECUTE = 0o010;
        const OTHER_READ = 0o004;
        const OTHER_WRITE = 0o002;
        const OTHER_EXECUTE = 0o001;
    }
}

/// A Unix `st_mode` bitset: file type plus permissions.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FileMode(pub u32);

impl FileMode {
    /// Whether the mode describes a socket.
    #[must_use]
    pub const fn is_socket(self) -> bool {
        self.0 & S_IFMT == S_IFSOCK
    }

    /// Whether the mode describes a symbolic link.
    #[must_use]
    pub const fn is_symlink(self) -> bool {
        self.0 & S_IFMT == S_IFLNK
    }

    /// Whether the mode describes a regular file.
    #[must_use]
    pub const fn is_regular_file(self) -> bool {
        self.0 & S_IFMT == S_IFREG
    }

    /// Whether the mode describes a block device.
    #[must_use]
    pub const fn is_block_device(self) -> bool {
        self.0 & S_IFMT == S_IFBLK
    }

    /// Whether the mode describes a directory.
    #[must_use]
    pub const fn is_directory(self) -> bool {
        self.0 & S_IFMT == S_IFDIR
    }

    /// Whether the mode describes a character device.
    #[must_use]
    pub const fn is_char_device(self) -> bool {
        self.0 & S_IFMT == S_IFCHR
    }

    /// Whether the mode describes a FIFO.
    #[must_use]
    pub const fn is_fifo(self) -> bool {
        self.0 & S_IFMT == S_IFIFO
    }

    /// Whether the mode describes a character, block, or FIFO device.
    #[must_use]
    pub const fn is_device(self) -> bool {
        self.is_char_device() || self.is_block_device() || self.is_fifo()
    }

    /// The permission and protection bits, without the file type.
    #[must_use]
    pub fn permissions(self) -> Permissions {
        Permissions::from_bits_truncate(self.0 & !S_IFMT)
    }
}

/// The packed `LXATTRB` value: 56 bytes, little-endian throughout.
///
/// `version` is 1 in every record WSL writes; the nanosecond fields pair
/// with the whole-second timestamps below them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Lxattrb {
    /// Reserved flag bits; zero in practice.
    pub flags: u16,
    /// Record format version.
    pub version: u16,
    /// Unix mode bits.
    pub mode: FileMode,
    /// Owning user id.
    pub uid: u32,
    /// Owning group id.
    pub gid: u32,
    /// Device number for device nodes.
    pub rdev: u32,
    /// Nanosecond part of the access time.
    pub atime_nsec: u32,
    /// Nanosecond part of the modification time.
    pub mtime_nsec: u32,
    /// Nanosecond part of the change time.
    pub ctime_nsec: u32,
    /// Access time, seconds since the epoch.
    pub atime: u64,
    /// Modification time, seconds since the epoch.
    pub mtime: u64,
    /// Change time, seconds since the epoch.
    pub ctime: u64,
}

impl Default for Lxattrb {
    fn default() -> Self {
        Self {
            flags: 0,
            version: 1,
            mode: FileMode(0),
            uid: 0,
            gid: 0,
            rdev: 0,
            atime_nsec: 0,
            mtime_nsec: 0,
            ctime_nsec: 0,
            atime: 0,
            mtime: 0,
            ctime: 0,
        }
    }
}

impl Lxattrb {
    /// Exact wire size of an encoded record.
    pub const WIRE_LEN: usize = 56;

    /// Parse an attribute value into a record.
    ///
    /// # Errors
    ///
    /// [`EaError::Malformed`] if the value is not exactly
    /// [`Self::WIRE_LEN`] bytes.
    pub fn parse(value: &[u8]) -> Result<Self> {
        if value.len() != Self::WIRE_LEN {
            return Err(EaError::Malformed {
                reason: "LXATTRB value must be exactly 56 bytes",
            });
        }

        let u16_at = |at: usize| u16::from_le_bytes([value[at], value[at + 1]]);
        let u32_at =
            |at: usize| u32::from_le_bytes([value[at], value[at + 1], value[at + 2], value[at + 3]]);
        let u64_at = |at: usize| {
            u64::from_le_bytes([
                value[at],
                value[at + 1],
                value[at + 2],
                value[at + 3],
                value[at + 4],
                value[at + 5],
                value[at + 6],
                value[at + 7],
            ])
        };

        Ok(Self {
            flags: u16_at(0),
            version: u16_at(2),
            mode: FileMode(u32_at(4)),
            uid: u32_at(8),
            gid: u32_at(12),
            rdev: u32_at(16),
            atime_nsec: u32_at(20),
            mtime_nsec: u32_at(24),
            ctime_nsec: u32_at(28),
            atime: u64_at(32),
            mtime: u64_at(40),
            ctime: u64_at(48),
        })
    }

    /// Encode this record as an attribute value.
    #[must_use]
    pub fn to_bytes(&self) -> [u8; Self::WIRE_LEN] {
        let mut buf = [0u8; Self::WIRE_LEN];
        buf[0..2].copy_from_slice(&self.flags.to_le_bytes());
        buf[2..4].copy_from_slice(&self.version.to_le_bytes());
        buf[4..8].copy_from_slice(&self.mode.0.to_le_bytes());
        buf[8..12].copy_from_slice(&self.uid.to_le_bytes());
        buf[12..16].copy_from_slice(&self.gid.to_le_bytes());
        buf[16..20].copy_from_slice(&self.rdev.to_le_bytes());
        buf[20..24].copy_from_slice(&self.atime_nsec.to_le_bytes());
        buf[24..28].copy_from_slice(&self.mtime_nsec.to_le_bytes());
        buf[28..32].copy_from_slice(&self.ctime_nsec.to_le_bytes());
        buf[32..40].copy_from_slice(&self.atime.to_le_bytes());
        buf[40..48].copy_from_slice(&self.mtime.to_le_bytes());
        buf[48..56].copy_from_slice(&self.ctime.to_le_bytes());
        buf
    }
}
