//! In-memory stand-in for the NT driver
//!
//! Reproduces the pieces of the native contract the protocols lean on:
//! open-if-missing with creation attributes, case-insensitive upsert and
//! delete-by-empty-value, a per-handle scan cursor honoring the
//! restart-scan flag, 4-byte-aligned chain packing into the caller's
//! reply buffer, and overflow signaling when the buffer fills. It also
//! counts opens and closes so tests can assert that every operation
//! releases exactly what it acquired.

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::driver::{
    EaAccess, EaDriver, NtStatus, QueryReply, STATUS_ACCESS_DENIED, STATUS_BUFFER_TOO_SMALL,
    STATUS_EA_LIST_INCONSISTENT, STATUS_NO_EAS_ON_FILE, STATUS_NO_MORE_EAS,
};
use crate::error::{EaError, Result};
use crate::wire;

type EaStore = Vec<(String, Vec<u8>)>;

#[derive(Default)]
pub(crate) struct FakeDriver {
    files: RefCell<HashMap<PathBuf, EaStore>>,
    denied: RefCell<Vec<PathBuf>>,
    fail_query_at: Cell<Option<(usize, NtStatus)>>,
    query_calls: Cell<usize>,
    opens: Cell<usize>,
    open_handles: Cell<isize>,
}

pub(crate) struct FakeHandle {
    path: PathBuf,
    writable: bool,
    cursor: Cell<usize>,
}

impl FakeDriver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-create a file with no attributes.
    pub fn create_file(&self, path: &Path) {
        self.files
            .borrow_mut()
            .entry(path.to_path_buf())
            .or_default();
    }

    /// Make every open of `path` fail with access-denied.
    pub fn deny(&self, path: &Path) {
        self.denied.borrow_mut().push(path.to_path_buf());
    }

    /// Make the `nth` query call (1-based) fail with `status`.
    pub fn fail_query_call(&self, nth: usize, status: NtStatus) {
        self.fail_query_at.set(Some((nth, status)));
    }

    /// Insert an attribute directly, bypassing the write protocol.
    pub fn seed(&self, path: &Path, name: &str, value: &[u8]) {
        self.files
            .borrow_mut()
            .entry(path.to_path_buf())
            .or_default()
            .push((name.to_owned(), value.to_vec()));
    }

    pub fn value_of(&self, path: &Path, name: &str) -> Option<Vec<u8>> {
        self.files.borrow().get(path).and_then(|eas| {
            eas.iter()
                .find(|(n, _)| n.eq_ignore_ascii_case(name))
                .map(|(_, v)| v.clone())
        })
    }

    pub fn ea_count(&self, path: &Path) -> usize {
        self.files.borrow().get(path).map_or(0, Vec::len)
    }

    pub fn opens(&self) -> usize {
        self.opens.get()
    }

    pub fn query_calls(&self) -> usize {
        self.query_calls.get()
    }

    /// Handles currently open; zero means every open was closed.
    pub fn open_handles(&self) -> isize {
        self.open_handles.get()
    }
}

/// Write one full record at `at`, which must be 4-byte aligned. Returns
/// the unpadded record length, or `None` if it does not fit.
fn pack_record(reply: &mut [u8], at: usize, name: &[u8], value: &[u8]) -> Option<usize> {
    let record_len = wire::full_record_len(name.len(), value.len());
    if at + record_len > reply.len() {
        return None;
    }
    reply[at..at + 4].copy_from_slice(&0u32.to_le_bytes());
    reply[at + 4] = 0;
    reply[at + 5] = name.len() as u8;
    reply[at + 6..at + 8].copy_from_slice(&(value.len() as u16).to_le_bytes());
    reply[at + 8..at + 8 + name.len()].copy_from_slice(name);
    reply[at + 8 + name.len()] = 0;
    reply[at + 9 + name.len()..at + record_len].copy_from_slice(value);
    Some(record_len)
}

/// Pack as many records as fit, chaining them the way the OS does.
/// Returns (records packed, bytes used, whether any were left over).
fn pack_chain<'e>(
    reply: &mut [u8],
    entries: impl Iterator<Item = (&'e [u8], &'e [u8])>,
) -> (usize, usize, bool) {
    let mut filled = 0;
    let mut prev_start = None;
    let mut count = 0;

    for (name, value) in entries {
        let at = wire::align4(filled);
        let pad_start = filled.min(reply.len());
        let pad_end = at.min(reply.len());
        for pad in &mut reply[pad_start..pad_end] {
            *pad = 0;
        }
        let Some(record_len) = pack_record(reply, at, name, value) else {
            return (count, filled, true);
        };
        if let Some(prev) = prev_start {
            let delta = (at - prev) as u32;
            reply[prev..prev + 4].copy_from_slice(&delta.to_le_bytes());
        }
        prev_start = Some(at);
        filled = at + record_len;
        count += 1;
    }
    (count, filled, false)
}

impl EaDriver for FakeDriver {
    type Handle = FakeHandle;

    fn open_for_ea(
        &self,
        path: &Path,
        access: EaAccess,
        create_ea: Option<&[u8]>,
    ) -> Result<FakeHandle> {
        if path.as_os_str().is_empty() {
            return Err(EaError::PathResolution {
                path: path.to_path_buf(),
            });
        }
        if self.denied.borrow().iter().any(|denied| denied == path) {
            return Err(EaError::Open {
                path: path.to_path_buf(),
                status: STATUS_ACCESS_DENIED,
            });
        }

        let mut files = self.files.borrow_mut();
        if !files.contains_key(path) {
            // open-if-missing: creation attributes apply only here
            let mut eas = EaStore::new();
            if let Some(buf) = create_ea {
                for record in wire::FullRecords::new(buf) {
                    let record = record?;
                    if !record.value.is_empty() {
                        eas.push((
                            String::from_utf8_lossy(record.name).into_owned(),
                            record.value.to_vec(),
                        ));
                    }
                }
            }
            files.insert(path.to_path_buf(), eas);
        }

        self.opens.set(self.opens.get() + 1);
        self.open_handles.set(self.open_handles.get() + 1);
        Ok(FakeHandle {
            path: path.to_path_buf(),
            writable: matches!(access, EaAccess::ReadWrite),
            cursor: Cell::new(0),
        })
    }

    fn query_ea(
        &self,
        handle: &FakeHandle,
        reply: &mut [u8],
        names: Option<&[u8]>,
        restart_scan: bool,
    ) -> Result<QueryReply> {
        self.query_calls.set(self.query_calls.get() + 1);
        if let Some((nth, status)) = self.fail_query_at.get() {
            if self.query_calls.get() == nth {
                self.fail_query_at.set(None);
                return Err(EaError::Query { status });
            }
        }

        let files = self.files.borrow();
        let eas = files.get(&handle.path).ok_or(EaError::Query {
            status: STATUS_NO_EAS_ON_FILE,
        })?;

        if let Some(list) = names {
            // lookups echo a record for every requested name; a missing
            // attribute comes back with an empty value
            let mut requested = Vec::new();
            for name in wire::QueryNames::new(list) {
                requested.push(name.map_err(|_| EaError::Query {
                    status: STATUS_EA_LIST_INCONSISTENT,
                })?);
            }

            let entries: Vec<(&[u8], &[u8])> = requested
                .iter()
                .map(|&name| {
                    let found = eas.iter().find(|(stored, _)| {
                        stored.as_bytes().eq_ignore_ascii_case(name)
                    });
                    match found {
                        Some((stored, value)) => (stored.as_bytes(), value.as_slice()),
                        None => (name, &[][..]),
                    }
                })
                .collect();

            let (count, filled, truncated) = pack_chain(reply, entries.into_iter());
            if count == 0 && truncated {
                return Err(EaError::Query {
                    status: STATUS_BUFFER_TOO_SMALL,
                });
            }
            return Ok(QueryReply {
                len: filled,
                more: truncated,
            });
        }

        if eas.is_empty() {
            return Err(EaError::Query {
                status: STATUS_NO_EAS_ON_FILE,
            });
        }
        if restart_scan {
            handle.cursor.set(0);
        }
        let start = handle.cursor.get();
        if start >= eas.len() {
            return Err(EaError::Query {
                status: STATUS_NO_MORE_EAS,
            });
        }

        let entries = eas[start..]
            .iter()
            .map(|(name, value)| (name.as_bytes(), value.as_slice()));
        let (count, filled, truncated) = pack_chain(reply, entries);
        if count == 0 {
            return Err(EaError::Query {
                status: STATUS_BUFFER_TOO_SMALL,
            });
        }
        handle.cursor.set(start + count);
        Ok(QueryReply {
            len: filled,
            more: truncated,
        })
    }

    fn set_ea(&self, handle: &FakeHandle, record_buf: &[u8]) -> Result<()> {
        if !handle.writable {
            return Err(EaError::Write {
                status: STATUS_ACCESS_DENIED,
            });
        }

        let mut files = self.files.borrow_mut();
        let eas = files.get_mut(&handle.path).ok_or(EaError::Write {
            status: STATUS_NO_EAS_ON_FILE,
        })?;

        for record in wire::FullRecords::new(record_buf) {
            let record = record.map_err(|_| EaError::Write {
                status: STATUS_EA_LIST_INCONSISTENT,
            })?;
            let name = String::from_utf8_lossy(record.name).into_owned();
            let existing = eas
                .iter()
                .position(|(stored, _)| stored.eq_ignore_ascii_case(&name));
            if record.value.is_empty() {
                if let Some(index) = existing {
                    eas.remove(index);
                }
            } else if let Some(index) = existing {
                eas[index] = (name, record.value.to_vec());
            } else {
                eas.push((name, record.value.to_vec()));
            }
        }
        Ok(())
    }

    fn close(&self, _handle: FakeHandle) {
        self.open_handles.set(self.open_handles.get() - 1);
    }
}
