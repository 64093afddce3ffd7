//! Error types for extended-attribute operations
//!
//! Every failure is modeled as a specific [`EaError`] kind so internal
//! logic and tests can assert on what actually went wrong. The public
//! sentinel wrappers in [`crate::ops`] collapse these to the empty-result
//! and `-1` conventions at the crate boundary; nothing in between loses
//! the cause.

use std::path::PathBuf;

use thiserror::Error;

use crate::driver::NtStatus;
use crate::record::{EA_NAME_MAX, EA_VALUE_MAX};

/// Result type for extended-attribute operations
pub type Result<T> = std::result::Result<T, EaError>;

/// Errors that can occur during extended-attribute operations
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum EaError {
    /// The path could not be converted to the canonical NT form
    #[error("cannot resolve `{}` to an NT path", .path.display())]
    PathResolution {
        /// The path as supplied by the caller
        path: PathBuf,
    },

    /// The native open call reported a failure status
    #[error("opening `{}` failed with status {status:#010x}", .path.display())]
    Open {
        /// The path as supplied by the caller
        path: PathBuf,
        /// Raw `NTSTATUS` returned by the open call
        status: NtStatus,
    },

    /// The native query call reported a failure status
    #[error("EA query failed with status {status:#010x}")]
    Query {
        /// Raw `NTSTATUS` returned by the query call
        status: NtStatus,
    },

    /// The native set call reported a failure status
    #[error("EA write failed with status {status:#010x}")]
    Write {
        /// Raw `NTSTATUS` returned by the set call
        status: NtStatus,
    },

    /// An attribute name exceeds the wire format's length field
    #[error("EA name is {len} bytes (limit {max})", max = EA_NAME_MAX)]
    NameTooLong {
        /// Length of the rejected name in bytes
        len: usize,
    },

    /// An attribute name contains an interior NUL byte
    ///
    /// Names travel NUL-terminated inside the wire records, so an
    /// embedded terminator would silently shorten the name on the OS
    /// side.
    #[error("EA name contains an interior NUL byte")]
    NameContainsNul,

    /// An attribute value exceeds the contract limit
    #[error("EA value is {len} bytes (limit {max})", max = EA_VALUE_MAX)]
    ValueTooLong {
        /// Length of the rejected value in bytes
        len: usize,
    },

    /// A wire buffer failed validation while being decoded
    #[error("malformed EA buffer: {reason}")]
    Malformed {
        /// What the decoder rejected
        reason: &'static str,
    },
}

impl EaError {
    /// The raw `NTSTATUS` carried by this error, when the failure came
    /// from a native call.
    #[must_use]
    pub fn status(&self) -> Option<NtStatus> {
        match self {
            Self::Open { status, .. } | Self::Query { status } | Self::Write { status } => {
                Some(*status)
            }
            _ => None,
        }
    }
}
