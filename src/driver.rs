//! OS capability interface for extended-attribute I/O
//!
//! The enumeration/query/write protocols in [`crate::ops`] never touch
//! the OS directly; they go through [`EaDriver`], which captures exactly
//! the four calls the native NT surface provides. This keeps the codec
//! and the protocols testable against an in-memory implementation, and
//! gives a port to another OS's bounded name/value attribute API a
//! single seam to fill in.

use std::path::Path;

use crate::error::Result;

/// Raw NT status code, as returned by the native calls.
pub type NtStatus = i32;

/// The operation completed.
pub const STATUS_SUCCESS: NtStatus = 0;
/// More data exists than fit in the supplied buffer; call again.
pub const STATUS_BUFFER_OVERFLOW: NtStatus = 0x8000_0005_u32 as NtStatus;
/// The scan has already returned every attribute.
pub const STATUS_NO_MORE_EAS: NtStatus = 0x8000_0012_u32 as NtStatus;
/// A name in the query list failed the OS's validation.
pub const STATUS_INVALID_EA_NAME: NtStatus = 0x8000_0013_u32 as NtStatus;
/// The chained offsets of a request buffer are inconsistent.
pub const STATUS_EA_LIST_INCONSISTENT: NtStatus = 0x8000_0014_u32 as NtStatus;
/// The caller lacks the required access right.
pub const STATUS_ACCESS_DENIED: NtStatus = 0xC000_0022_u32 as NtStatus;
/// Not even one record fit in the supplied buffer.
pub const STATUS_BUFFER_TOO_SMALL: NtStatus = 0xC000_0023_u32 as NtStatus;
/// The filesystem holding the file does not support extended attributes.
pub const STATUS_EAS_NOT_SUPPORTED: NtStatus = 0xC000_004F_u32 as NtStatus;
/// The file has no extended attributes.
pub const STATUS_NO_EAS_ON_FILE: NtStatus = 0xC000_0052_u32 as NtStatus;

/// Access requested when opening a file for attribute I/O.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EaAccess {
    /// Read access only.
    Read,
    /// Read plus write access, for set calls.
    ReadWrite,
}

/// Outcome of a query call that produced data.
///
/// Both success and buffer-overflow are "data present": overflow is the
/// OS's instruction to call again for the rest, not an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueryReply {
    /// Number of bytes the OS wrote into the reply buffer.
    pub len: usize,
    /// Whether more attributes remain beyond this reply.
    pub more: bool,
}

/// The four native calls the attribute protocols are built on.
///
/// Implementations map their platform's statuses as follows: success and
/// buffer-overflow become an `Ok` [`QueryReply`]; every other status is
/// an error carrying the raw code. Handles are opaque to the protocols
/// and must be closed exactly once via [`EaDriver::close`] — use
/// [`HandleGuard`] rather than calling it by hand.
pub trait EaDriver {
    /// Opaque open-file reference.
    type Handle;

    /// Resolve `path` and open (or create, open-if-missing) the file.
    ///
    /// Sharing must permit concurrent read/write/delete from other
    /// processes. When `create_ea` holds an encoded full record, it is
    /// passed through to the open call so a brand-new file is created
    /// already carrying those attributes; it has no effect on a file
    /// that already exists.
    ///
    /// # Errors
    ///
    /// [`crate::EaError::PathResolution`] if the path cannot be put in
    /// canonical form, [`crate::EaError::Open`] if the open call fails.
    fn open_for_ea(
        &self,
        path: &Path,
        access: EaAccess,
        create_ea: Option<&[u8]>,
    ) -> Result<Self::Handle>;

    /// Query attributes into `reply`.
    ///
    /// With `names`, only the attributes in that encoded query list are
    /// fetched; without it, the call enumerates. `restart_scan` begins
    /// the enumeration from the start; passing `false` resumes the
    /// previous scan position on this handle.
    ///
    /// # Errors
    ///
    /// [`crate::EaError::Query`] carrying the status for any outcome
    /// other than success or buffer-overflow.
    fn query_ea(
        &self,
        handle: &Self::Handle,
        reply: &mut [u8],
        names: Option<&[u8]>,
        restart_scan: bool,
    ) -> Result<QueryReply>;

    /// Apply one encoded full record to the file.
    ///
    /// A record with a zero value length deletes the named attribute.
    ///
    /// # Errors
    ///
    /// [`crate::EaError::Write`] carrying the status on failure.
    fn set_ea(&self, handle: &Self::Handle, record: &[u8]) -> Result<()>;

    /// Release a handle. Called exactly once per successful open.
    fn close(&self, handle: Self::Handle);
}

/// RAII guard that closes a driver handle on every exit path.
pub struct HandleGuard<'d, D: EaDriver> {
    driver: &'d D,
    handle: Option<D::Handle>,
}

impl<'d, D: EaDriver> HandleGuard<'d, D> {
    /// Take ownership of `handle`, closing it when the guard drops.
    pub fn new(driver: &'d D, handle: D::Handle) -> Self {
        Self {
            driver,
            handle: Some(handle),
        }
    }

    /// Borrow the guarded handle.
    #[allow(clippy::expect_used)]
    pub fn handle(&self) -> &D::Handle {
        // populated from construction until drop
        self.handle.as_ref().expect("handle present until drop")
    }
}

impl<D: EaDriver> Drop for HandleGuard<'_, D> {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            self.driver.close(handle);
        }
    }
}
