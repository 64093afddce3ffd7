//! The real driver: NT path resolution and the native EA calls
//!
//! This is the only module that talks to the operating system. Paths are
//! converted to their canonical NT form with
//! `RtlDosPathNameToNtPathName_U`, files are opened with `NtCreateFile`
//! in open-if-missing mode with full read/write/delete sharing, and the
//! attribute I/O goes through `NtQueryEaFile` and `NtSetEaFile`. The
//! Win32 layer has no equivalent of these file-information calls.

use std::ffi::c_void;
use std::os::windows::ffi::OsStrExt;
use std::path::Path;
use std::ptr::{null, null_mut};

use windows_sys::Wdk::Foundation::OBJECT_ATTRIBUTES;
use windows_sys::Wdk::Storage::FileSystem::{
    NtCreateFile, NtQueryEaFile, NtSetEaFile, FILE_OPEN_IF,
};
use windows_sys::Win32::Foundation::{
    CloseHandle, GENERIC_READ, GENERIC_WRITE, HANDLE, UNICODE_STRING,
};
use windows_sys::Win32::Storage::FileSystem::{
    FILE_SHARE_DELETE, FILE_SHARE_READ, FILE_SHARE_WRITE,
};
use windows_sys::Win32::System::IO::IO_STATUS_BLOCK;

use crate::driver::{
    EaAccess, EaDriver, QueryReply, STATUS_BUFFER_OVERFLOW, STATUS_SUCCESS,
};
use crate::error::{EaError, Result};

// The DOS-to-NT path routines live in ntdll and have no windows-sys
// binding; declared here against the import library windows-sys links.
#[link(name = "ntdll")]
extern "system" {
    fn RtlDosPathNameToNtPathName_U(
        dos_file_name: *const u16,
        nt_file_name: *mut UNICODE_STRING,
        file_part: *mut *mut u16,
        relative_name: *mut c_void,
    ) -> u8;

    fn RtlFreeUnicodeString(unicode_string: *mut UNICODE_STRING);
}

/// Driver backed by the NT native API.
#[derive(Debug, Default, Clone, Copy)]
pub struct NtDriver;

/// An open NT file handle. Closed by [`EaDriver::close`], exactly once.
#[derive(Debug)]
pub struct NtHandle(HANDLE);

impl EaDriver for NtDriver {
    type Handle = NtHandle;

    fn open_for_ea(
        &self,
        path: &Path,
        access: EaAccess,
        create_ea: Option<&[u8]>,
    ) -> Result<NtHandle> {
        let mut dos_name: Vec<u16> = path.as_os_str().encode_wide().collect();
        if dos_name.contains(&0) {
            return Err(EaError::PathResolution {
                path: path.to_path_buf(),
            });
        }
        dos_name.push(0);

        let mut nt_name = UNICODE_STRING {
            Length: 0,
            MaximumLength: 0,
            Buffer: null_mut(),
        };
        let converted = unsafe {
            RtlDosPathNameToNtPathName_U(dos_name.as_ptr(), &mut nt_name, null_mut(), null_mut())
        };
        if converted == 0 {
            return Err(EaError::PathResolution {
                path: path.to_path_buf(),
            });
        }

        let mut object_attributes = OBJECT_ATTRIBUTES {
            Length: std::mem::size_of::<OBJECT_ATTRIBUTES>() as u32,
            RootDirectory: null_mut(),
            ObjectName: &mut nt_name,
            Attributes: 0,
            SecurityDescriptor: null_mut(),
            SecurityQualityOfService: null_mut(),
        };

        let desired_access = match access {
            EaAccess::Read => GENERIC_READ,
            EaAccess::ReadWrite => GENERIC_READ | GENERIC_WRITE,
        };
        let (ea_ptr, ea_len) = match create_ea {
            Some(buf) => (buf.as_ptr().cast::<c_void>(), buf.len() as u32),
            None => (null(), 0),
        };

        let mut handle: HANDLE = null_mut();
        let mut iosb: IO_STATUS_BLOCK = unsafe { std::mem::zeroed() };
        let status = unsafe {
            NtCreateFile(
                &mut handle,
                desired_access,
                &mut object_attributes,
                &mut iosb,
                null_mut(),
                0,
                FILE_SHARE_READ | FILE_SHARE_WRITE | FILE_SHARE_DELETE,
                FILE_OPEN_IF,
                0,
                ea_ptr.cast_mut(),
                ea_len,
            )
        };
        unsafe { RtlFreeUnicodeString(&mut nt_name) };

        if status != STATUS_SUCCESS {
            return Err(EaError::Open {
                path: path.to_path_buf(),
                status,
            });
        }
        Ok(NtHandle(handle))
    }

    fn query_ea(
        &self,
        handle: &NtHandle,
        reply: &mut [u8],
        names: Option<&[u8]>,
        restart_scan: bool,
    ) -> Result<QueryReply> {
        let (list_ptr, list_len) = match names {
            Some(list) => (list.as_ptr().cast::<c_void>(), list.len() as u32),
            None => (null(), 0),
        };

        let mut iosb: IO_STATUS_BLOCK = unsafe { std::mem::zeroed() };
        let status = unsafe {
            NtQueryEaFile(
                handle.0,
                &mut iosb,
                reply.as_mut_ptr().cast::<c_void>(),
                reply.len() as u32,
                0,
                list_ptr.cast_mut(),
                list_len,
                null_mut(),
                u8::from(restart_scan),
            )
        };

        match status {
            STATUS_SUCCESS => Ok(QueryReply {
                len: iosb.Information,
                more: false,
            }),
            STATUS_BUFFER_OVERFLOW => Ok(QueryReply {
                len: iosb.Information,
                more: true,
            }),
            status => Err(EaError::Query { status }),
        }
    }

    fn set_ea(&self, handle: &NtHandle, record: &[u8]) -> Result<()> {
        let mut iosb: IO_STATUS_BLOCK = unsafe { std::mem::zeroed() };
        let status = unsafe {
            NtSetEaFile(
                handle.0,
                &mut iosb,
                record.as_ptr().cast::<c_void>().cast_mut(),
                record.len() as u32,
            )
        };
        if status != STATUS_SUCCESS {
            return Err(EaError::Write { status });
        }
        Ok(())
    }

    fn close(&self, handle: NtHandle) {
        // CloseHandle only fails for an invalid handle; nothing to do here
        unsafe {
            CloseHandle(handle.0);
        }
    }
}
