use crate::error::{Result, SmartError};
use crate::guard::{NativeGuard, NativeHandle};
use std::ffi::c_void;
use std::ptr;
use windows_sys::Win32::Foundation::{CloseHandle, GENERIC_READ, GENERIC_WRITE, HANDLE, INVALID_HANDLE_VALUE};
use windows_sys::Win32::Storage::FileSystem::{CreateFileW, FILE_ATTRIBUTE_NORMAL, FILE_SHARE_READ, FILE_SHARE_WRITE, OPEN_EXISTING};
use windows_sys::Win32::System::IO::DeviceIoControl;

#[derive(Debug)]
pub struct DeviceHandle(HANDLE);

impl NativeHandle for DeviceHandle {
    fn release(self) {
        // SAFETY: the guard owns this handle and releases it once.
        unsafe { CloseHandle(self.0) };
    }
}

// SAFETY: a device handle may be used from any thread. Each one is owned by a
// single session, which callers serialize.
unsafe impl Send for DeviceHandle {}

#[derive(Debug, Clone, Copy)]
pub enum Access {
    /// Property queries only.
    Query,
    ReadWrite,
}

pub fn open(path: &str, access: Access) -> Result<NativeGuard<DeviceHandle>> {
    let wide: Vec<u16> = path.encode_utf16().chain(std::iter::once(0)).collect();
    let desired = match access {
        Access::Query     => 0,
        Access::ReadWrite => GENERIC_READ | GENERIC_WRITE,
    };

    // SAFETY: `wide` is NUL-terminated and outlives the call.
    let handle = unsafe {
        CreateFileW(
            wide.as_ptr(),
            desired,
            FILE_SHARE_READ | FILE_SHARE_WRITE,
            ptr::null(),
            OPEN_EXISTING,
            FILE_ATTRIBUTE_NORMAL,
            ptr::null_mut(),
        )
    };
    if handle == INVALID_HANDLE_VALUE || handle.is_null() {
        return Err(SmartError::Open { path: path.to_string(), source: std::io::Error::last_os_error() });
    }
    Ok(NativeGuard::new(DeviceHandle(handle)))
}

/// Issue one `DeviceIoControl`; returns the number of bytes written to `output`.
pub fn control(
    guard: &NativeGuard<DeviceHandle>,
    op: &'static str,
    code: u32,
    input: *const c_void,
    input_len: usize,
    output: *mut c_void,
    output_len: usize,
) -> Result<usize> {
    let handle = guard
        .get()
        .map(|h| h.0)
        .ok_or_else(|| SmartError::Io(std::io::Error::from(std::io::ErrorKind::NotConnected)))?;

    let mut returned: u32 = 0;
    // SAFETY: callers pass buffers valid for the stated lengths.
    let ok = unsafe {
        DeviceIoControl(
            handle,
            code,
            input,
            input_len as u32,
            output,
            output_len as u32,
            &mut returned,
            ptr::null_mut(),
        )
    };
    if ok == 0 {
        return Err(SmartError::ioctl(op));
    }
    Ok(returned as usize)
}

/// `control` over byte buffers.
pub fn control_bytes(
    guard: &NativeGuard<DeviceHandle>,
    op: &'static str,
    code: u32,
    input: &[u8],
    output: &mut [u8],
) -> Result<usize> {
    let in_ptr = if input.is_empty() { ptr::null() } else { input.as_ptr().cast() };
    control(guard, op, code, in_ptr, input.len(), output.as_mut_ptr().cast(), output.len())
}
