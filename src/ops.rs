//! The enumerate, query, and write protocols
//!
//! Each operation is synchronous and self-contained: it opens its own
//! handle through the driver, performs exactly the I/O it needs, and the
//! guard closes the handle before the function returns — on success and
//! on every failure path. Nothing is cached between calls.
//!
//! The `*_with` functions are generic over [`EaDriver`] and report
//! failures as typed [`EaError`]s. The plain wrappers bind the NT driver
//! and collapse failures to sentinel results: an empty list, an empty
//! record, or `-1`.

use std::path::Path;

use tracing::{debug, warn};

use crate::driver::{EaAccess, EaDriver, HandleGuard, STATUS_BUFFER_OVERFLOW};
use crate::error::{EaError, Result};
use crate::record::{EaList, EaRecord, EA_NAME_MAX, EA_VALUE_MAX};
use crate::wire;

/// Scratch capacity for one enumeration round-trip.
pub const LIST_SCRATCH_LEN: usize = 4096;

/// Reply capacity for a single-name query: one header plus a maximal
/// name and value, each with its terminator slot.
pub const SCALAR_SCRATCH_LEN: usize =
    wire::FULL_HEADER_LEN + (EA_NAME_MAX + 1) + (EA_VALUE_MAX + 1);

/// Collect every extended attribute on the file at `path`.
///
/// Drives the scan-and-overflow-retry loop: the first query restarts the
/// scan, later rounds resume it, and the loop continues while the OS
/// reports buffer-overflow. A query failure mid-scan ends the walk and
/// the list holds what was collected up to that point; so does a record
/// that fails wire validation. The scan also stops unconditionally once
/// the list reaches its capacity bound, which keeps worst-case work
/// finite on files with pathological attribute counts.
///
/// # Errors
///
/// Only resolution and open failures surface as errors; see above for
/// how mid-scan failures are absorbed.
pub fn list_ea_with<D: EaDriver>(driver: &D, path: &Path) -> Result<EaList> {
    let handle = driver.open_for_ea(path, EaAccess::Read, None)?;
    let guard = HandleGuard::new(driver, handle);

    let mut scratch = vec![0u8; LIST_SCRATCH_LEN];
    let mut list = EaList::new();
    let mut restart_scan = true;

    'scan: loop {
        let reply = match driver.query_ea(guard.handle(), &mut scratch, None, restart_scan) {
            Ok(reply) => reply,
            Err(err) => {
                // Covers STATUS_NO_EAS_ON_FILE and friends: the scan is
                // over and the caller gets whatever was collected.
                debug!("EA scan of {} ended: {}", path.display(), err);
                break 'scan;
            }
        };
        restart_scan = false;

        let len = reply.len.min(scratch.len());
        for decoded in wire::FullRecords::new(&scratch[..len]) {
            let record = match decoded {
                Ok(record) => record,
                Err(err) => {
                    warn!(
                        "discarding rest of malformed EA buffer from {}: {}",
                        path.display(),
                        err
                    );
                    break 'scan;
                }
            };
            if !list.push(EaRecord::from_wire(&record)) {
                break 'scan;
            }
            if list.is_full() {
                break 'scan;
            }
        }

        if !reply.more {
            break;
        }
    }

    Ok(list)
}

/// Fetch the single attribute `name` from the file at `path`.
///
/// Builds a one-entry query list and issues a fresh scan restricted to
/// it. The OS answers a lookup of a missing attribute with a record
/// whose value length is zero, so absence comes back as the empty
/// record, not an error.
///
/// # Errors
///
/// Typed errors for invalid names, resolution/open failures, and any
/// non-success query status.
pub fn get_ea_with<D: EaDriver>(driver: &D, path: &Path, name: &str) -> Result<EaRecord> {
    let query_list = wire::encode_query_list(&[name.as_bytes()])?;
    let handle = driver.open_for_ea(path, EaAccess::Read, None)?;
    let guard = HandleGuard::new(driver, handle);

    let mut reply_buf = vec![0u8; SCALAR_SCRATCH_LEN];
    let reply = driver.query_ea(guard.handle(), &mut reply_buf, Some(&query_list), true)?;
    if reply.more {
        // A single record within the contract bounds always fits, so a
        // truncated reply means the call did not complete.
        return Err(EaError::Query {
            status: STATUS_BUFFER_OVERFLOW,
        });
    }

    let len = reply.len.min(reply_buf.len());
    match wire::FullRecords::new(&reply_buf[..len]).next() {
        Some(Ok(record)) if !record.value.is_empty() => Ok(EaRecord::from_wire(&record)),
        Some(Ok(_)) | None => Ok(EaRecord::default()),
        Some(Err(err)) => Err(err),
    }
}

/// Store, replace, or delete the attribute `name` on the file at `path`.
///
/// `Some(value)` stores the value; `None` deletes the attribute (a
/// zero-length value is the native delete marker). The file is created
/// if it does not exist, and when a value is being stored the open call
/// is primed with the encoded record so a brand-new file starts life
/// already carrying the attribute.
///
/// Returns the stored value length, which callers compare against what
/// they asked for.
///
/// # Errors
///
/// Typed errors for invalid names or values, resolution/open failures,
/// and any non-success set status.
pub fn write_ea_with<D: EaDriver>(
    driver: &D,
    path: &Path,
    name: &str,
    value: Option<&[u8]>,
) -> Result<usize> {
    let record = wire::encode_full_record(name.as_bytes(), value.unwrap_or_default())?;
    let create_ea = match value {
        Some(value) if !value.is_empty() => Some(record.as_slice()),
        _ => None,
    };

    let handle = driver.open_for_ea(path, EaAccess::ReadWrite, create_ea)?;
    let guard = HandleGuard::new(driver, handle);
    driver.set_ea(guard.handle(), &record)?;
    Ok(value.map_or(0, <[u8]>::len))
}

/// Collect every extended attribute on the file at `path`.
///
/// Sentinel form of [`list_ea_with`] over the NT driver: any failure to
/// reach the file yields an empty list, never an error.
#[cfg(windows)]
#[must_use]
pub fn get_ea_list(path: &Path) -> EaList {
    match list_ea_with(&crate::nt::NtDriver, path) {
        Ok(list) => list,
        Err(err) => {
            debug!("EA enumeration of {} failed: {}", path.display(), err);
            EaList::new()
        }
    }
}

/// Fetch the single attribute `name` from the file at `path`.
///
/// Sentinel form of [`get_ea_with`] over the NT driver: failure and
/// absence both yield the empty record.
#[cfg(windows)]
#[must_use]
pub fn get_ea(path: &Path, name: &str) -> EaRecord {
    match get_ea_with(&crate::nt::NtDriver, path, name) {
        Ok(record) => record,
        Err(err) => {
            debug!("EA lookup of {} on {} failed: {}", name, path.display(), err);
            EaRecord::default()
        }
    }
}

/// Store, replace, or delete the attribute `name` on the file at `path`.
///
/// Sentinel form of [`write_ea_with`] over the NT driver: returns the
/// stored value length, or `-1` on any failure.
#[cfg(windows)]
#[must_use]
pub fn write_ea(path: &Path, name: &str, value: Option<&[u8]>) -> i32 {
    match write_ea_with(&crate::nt::NtDriver, path, name, value) {
        Ok(len) => len as i32,
        Err(err) => {
            debug!("EA write of {} to {} failed: {}", name, path.display(), err);
            -1
        }
    }
}
