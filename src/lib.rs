//! # ntfs-ea
//!
//! Read, enumerate, and write NTFS extended attributes by speaking
//! directly to the NT file-information API (`NtQueryEaFile` /
//! `NtSetEaFile`) rather than a higher-level filesystem layer:
//!
//! - Bit-exact codec for the packed, chained buffer formats the native
//!   calls consume and produce
//! - Bounded-buffer enumeration with the overflow-driven continuation
//!   loop and a hard 4096-record cap
//! - Single-attribute lookup and write (including delete-by-empty-value)
//! - A driver trait isolating the OS surface, so the codec and the
//!   protocols are testable without a Windows box and portable to other
//!   bounded name/value attribute APIs
//! - A typed codec for the `LXATTRB` value WSL uses to keep Linux
//!   metadata on NTFS files
//!
//! The plain `get_ea_list` / `get_ea` / `write_ea` functions never fail
//! loudly: they return an empty list, an empty record, or `-1` instead.
//! The `*_with` functions underneath report typed [`EaError`]s.
//!
//! ## Example
//!
//! ```rust,no_run
//! # #[cfg(windows)]
//! # {
//! use std::path::Path;
//! use ntfs_ea::{get_ea, write_ea};
//!
//! let path = Path::new(r"C:\data\rootfs\etc\hostname");
//! let stored = write_ea(path, "USER.ORIGIN", Some(b"imported"));
//! assert_eq!(stored, 8);
//!
//! let record = get_ea(path, "USER.ORIGIN");
//! assert_eq!(record.value, b"imported");
//! # }
//! ```

pub mod driver;
pub mod error;
pub mod lxattrb;
#[cfg(windows)]
pub mod nt;
pub mod ops;
pub mod record;
pub mod wire;

#[cfg(test)]
pub(crate) mod fake;

pub use error::{EaError, Result};
pub use lxattrb::{FileMode, Lxattrb, Permissions, LXATTRB};
#[cfg(windows)]
pub use nt::NtDriver;
#[cfg(windows)]
pub use ops::{get_ea, get_ea_list, write_ea};
pub use ops::{get_ea_with, list_ea_with, write_ea_with};
pub use record::{EaList, EaRecord, EA_LIST_CAPACITY, EA_NAME_MAX, EA_VALUE_MAX};

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
