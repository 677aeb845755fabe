//! Named file mapping used on Windows

use std::path::Path;
use std::ptr::NonNull;

use tracing::trace;
use windows::Win32::Foundation::{CloseHandle, ERROR_ALREADY_EXISTS, GetLastError, HANDLE, INVALID_HANDLE_VALUE};
use windows::Win32::System::Memory::{
    CreateFileMappingW, FILE_MAP_ALL_ACCESS, MEMORY_BASIC_INFORMATION, MEMORY_MAPPED_VIEW_ADDRESS,
    MapViewOfFile, PAGE_READWRITE, UnmapViewOfFile, VirtualQuery,
};
use windows_core::PCWSTR;

use crate::{BridgeError, Result};

pub(super) struct Mapping {
    handle: HANDLE,
    base: NonNull<u8>,
    size: usize,
}

impl Mapping {
    pub(super) fn open_or_create(_dir: Option<&Path>, name: &str, size: usize) -> Result<Self> {
        let wide_name = wide_string(name);
        let size_high = ((size as u64) >> 32) as u32;
        let size_low = (size as u64 & 0xFFFF_FFFF) as u32;

        // CreateFileMappingW opens the existing object when the name is taken.
        let handle = unsafe {
            CreateFileMappingW(
                INVALID_HANDLE_VALUE,
                None,
                PAGE_READWRITE,
                size_high,
                size_low,
                PCWSTR::from_raw(wide_name.as_ptr()),
            )
        }
        .map_err(|e| BridgeError::transport_unavailable(name, format!("CreateFileMappingW: {}", e)))?;
        let existed = unsafe { GetLastError() } == ERROR_ALREADY_EXISTS;

        let view = unsafe { MapViewOfFile(handle, FILE_MAP_ALL_ACCESS, 0, 0, 0) };
        let Some(base) = NonNull::new(view.Value as *mut u8) else {
            let err = windows::core::Error::from_thread();
            unsafe {
                let _ = CloseHandle(handle);
            }
            return Err(BridgeError::transport_unavailable(name, format!("MapViewOfFile: {}", err)));
        };

        let mapping = Self { handle, base, size };

        // An existing mapping keeps its original size; a smaller one would let
        // a full-frame copy run past the view.
        if existed {
            let mapped = mapping.view_size();
            trace!(region = name, mapped, "Opened existing file mapping");
            if mapped < size {
                return Err(BridgeError::transport_unavailable(
                    name,
                    format!("existing region is {} bytes, expected {}", mapped, size),
                ));
            }
        }

        Ok(mapping)
    }

    fn view_size(&self) -> usize {
        let mut info = MEMORY_BASIC_INFORMATION::default();
        let written = unsafe {
            VirtualQuery(
                Some(self.base.as_ptr() as *const _),
                &mut info,
                std::mem::size_of::<MEMORY_BASIC_INFORMATION>(),
            )
        };
        if written == 0 { 0 } else { info.RegionSize }
    }

    pub(super) fn as_slice(&self) -> &[u8] {
        // SAFETY: the view is at least `size` bytes and lives as long as self.
        unsafe { std::slice::from_raw_parts(self.base.as_ptr(), self.size) }
    }

    pub(super) fn as_mut_slice(&mut self) -> &mut [u8] {
        // SAFETY: as above, and `&mut self` gives exclusive in-process access.
        unsafe { std::slice::from_raw_parts_mut(self.base.as_ptr(), self.size) }
    }
}

impl Drop for Mapping {
    fn drop(&mut self) {
        unsafe {
            let addr = MEMORY_MAPPED_VIEW_ADDRESS { Value: self.base.as_ptr() as *mut _ };
            let _ = UnmapViewOfFile(addr);
            let _ = CloseHandle(self.handle);
        }
    }
}

// SAFETY: the mapping is a kernel object plus a view pointer; all access goes
// through &self / &mut self.
unsafe impl Send for Mapping {}
unsafe impl Sync for Mapping {}

fn wide_string(s: &str) -> Vec<u16> {
    use std::ffi::OsStr;
    use std::os::windows::ffi::OsStrExt;
    OsStr::new(s).encode_wide().chain(std::iter::once(0)).collect()
}
