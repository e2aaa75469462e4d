//! Raw I/O Kit and Core Foundation bindings. Only what the backend calls.

#![allow(non_camel_case_types, non_upper_case_globals)]

use std::ffi::{c_char, c_void};

pub type mach_port_t = u32;
pub type io_object_t = mach_port_t;
pub type io_iterator_t = io_object_t;
pub type io_service_t = io_object_t;
pub type io_registry_entry_t = io_object_t;
pub type kern_return_t = i32;
pub type IOReturn = kern_return_t;
pub type HRESULT = i32;
pub type Boolean = u8;
pub type CFIndex = isize;

pub type CFTypeRef = *const c_void;
pub type CFAllocatorRef = *const c_void;
pub type CFStringRef = *const c_void;
pub type CFDictionaryRef = *const c_void;
pub type CFMutableDictionaryRef = *mut c_void;
pub type CFNumberRef = *const c_void;
pub type CFBooleanRef = *const c_void;
pub type CFUUIDRef = *const c_void;
pub type CFTypeID = usize;

pub const KERN_SUCCESS: kern_return_t = 0;
pub const S_OK: HRESULT = 0;
pub const MACH_PORT_NULL: mach_port_t = 0;
/// `kIOMainPortDefault`.
pub const IO_MAIN_PORT_DEFAULT: mach_port_t = 0;

pub const kCFStringEncodingUTF8: u32 = 0x0800_0100;
pub const kCFNumberSInt64Type: CFIndex = 4;

pub const kIORegistryIterateRecursively: u32 = 0x1;
pub const kIORegistryIterateParents: u32 = 0x2;

pub const IO_SERVICE_PLANE: &[u8] = b"IOService\0";

/// `CFUUIDBytes`, passed by value as `REFIID`.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CFUUIDBytes(pub [u8; 16]);

// ── Interface identifiers ────────────────────────────────────────────────────

/// `kIOCFPlugInInterfaceID`
pub const CF_PLUGIN_INTERFACE_ID: [u8; 16] = [
    0xC2, 0x44, 0xE8, 0x58, 0x10, 0x9C, 0x11, 0xD4, 0x91, 0xD4, 0x00, 0x50, 0xE4, 0xC6, 0x42, 0x6F,
];
/// `kIOATASMARTUserClientTypeID`
pub const ATA_SMART_USER_CLIENT_TYPE_ID: [u8; 16] = [
    0x24, 0x51, 0x4B, 0x7A, 0x28, 0x04, 0x11, 0xD6, 0x8A, 0x02, 0x00, 0x30, 0x65, 0x70, 0x48, 0x66,
];
/// `kIOATASMARTInterfaceID`
pub const ATA_SMART_INTERFACE_ID: [u8; 16] = [
    0x08, 0xAB, 0xE2, 0x1C, 0x20, 0xD4, 0x11, 0xD6, 0x8D, 0xF6, 0x00, 0x03, 0x93, 0x5A, 0x76, 0xB2,
];
/// `kIONVMeSMARTUserClientTypeID`
pub const NVME_SMART_USER_CLIENT_TYPE_ID: [u8; 16] = [
    0xAA, 0x0F, 0xA6, 0xF9, 0xC2, 0xD6, 0x45, 0x7F, 0xB1, 0x0B, 0x59, 0xA1, 0x32, 0x53, 0x29, 0x2F,
];
/// `kIONVMeSMARTInterfaceID`
pub const NVME_SMART_INTERFACE_ID: [u8; 16] = [
    0xCC, 0xD1, 0xDB, 0x19, 0xFD, 0x9A, 0x4D, 0xAF, 0xBF, 0x95, 0x12, 0x45, 0x4B, 0x23, 0x0A, 0xB6,
];

// ── Plugin vtables ───────────────────────────────────────────────────────────
//
// Every interface is a pointer to a pointer to its function table. The first
// four slots are the IUnknown layout shared by all of them.

pub type QueryInterfaceFn = unsafe extern "C" fn(this: *mut c_void, iid: CFUUIDBytes, ppv: *mut *mut c_void) -> HRESULT;
pub type RefCountFn = unsafe extern "C" fn(this: *mut c_void) -> u32;

#[repr(C)]
pub struct IUnknownVTbl {
    pub _reserved:       *mut c_void,
    pub query_interface: QueryInterfaceFn,
    pub add_ref:         RefCountFn,
    pub release:         RefCountFn,
}

/// `IOCFPlugInInterface`
#[repr(C)]
pub struct IOCFPlugInInterface {
    pub unknown:  IUnknownVTbl,
    pub version:  u16,
    pub revision: u16,
    pub probe:    *mut c_void,
    pub start:    *mut c_void,
    pub stop:     *mut c_void,
}

/// `IOATASMARTInterface`, up to the last entry the backend uses.
#[repr(C)]
pub struct IOATASMARTInterface {
    pub unknown:                          IUnknownVTbl,
    pub version:                          u16,
    pub revision:                         u16,
    pub smart_enable_disable_operations:  unsafe extern "C" fn(this: *mut c_void, enable: Boolean) -> IOReturn,
    pub smart_enable_disable_autosave:    unsafe extern "C" fn(this: *mut c_void, enable: Boolean) -> IOReturn,
    pub smart_return_status:              unsafe extern "C" fn(this: *mut c_void, exceeded: *mut Boolean) -> IOReturn,
    pub smart_execute_off_line_immediate: unsafe extern "C" fn(this: *mut c_void, extended: Boolean) -> IOReturn,
    pub smart_read_data:                  unsafe extern "C" fn(this: *mut c_void, data: *mut u8) -> IOReturn,
}

/// `IONVMeSMARTInterface`, up to the last entry the backend uses.
#[repr(C)]
pub struct IONVMeSMARTInterface {
    pub unknown:         IUnknownVTbl,
    pub version:         u16,
    pub revision:        u16,
    pub smart_read_data: unsafe extern "C" fn(this: *mut c_void, data: *mut u8) -> IOReturn,
}

// ── I/O Kit ──────────────────────────────────────────────────────────────────

#[link(name = "IOKit", kind = "framework")]
extern "C" {
    pub fn IOServiceMatching(name: *const c_char) -> CFMutableDictionaryRef;
    pub fn IOBSDNameMatching(main_port: mach_port_t, options: u32, bsd_name: *const c_char) -> CFMutableDictionaryRef;
    pub fn IOServiceGetMatchingServices(main_port: mach_port_t, matching: CFDictionaryRef, existing: *mut io_iterator_t) -> kern_return_t;
    pub fn IOServiceGetMatchingService(main_port: mach_port_t, matching: CFDictionaryRef) -> io_service_t;
    pub fn IOIteratorNext(iterator: io_iterator_t) -> io_object_t;
    pub fn IOObjectRelease(object: io_object_t) -> kern_return_t;
    pub fn IOObjectConformsTo(object: io_object_t, class_name: *const c_char) -> u32;
    pub fn IORegistryEntryGetParentEntry(entry: io_registry_entry_t, plane: *const c_char, parent: *mut io_registry_entry_t) -> kern_return_t;
    pub fn IORegistryEntryCreateCFProperty(entry: io_registry_entry_t, key: CFStringRef, allocator: CFAllocatorRef, options: u32) -> CFTypeRef;
    pub fn IORegistryEntrySearchCFProperty(entry: io_registry_entry_t, plane: *const c_char, key: CFStringRef, allocator: CFAllocatorRef, options: u32) -> CFTypeRef;
    pub fn IOCreatePlugInInterfaceForService(
        service: io_service_t,
        plugin_type: CFUUIDRef,
        interface_type: CFUUIDRef,
        the_interface: *mut *mut *mut IOCFPlugInInterface,
        the_score: *mut i32,
    ) -> kern_return_t;
}

// ── Core Foundation ──────────────────────────────────────────────────────────

#[link(name = "CoreFoundation", kind = "framework")]
extern "C" {
    pub fn CFRelease(cf: CFTypeRef);
    pub fn CFGetTypeID(cf: CFTypeRef) -> CFTypeID;
    pub fn CFStringGetTypeID() -> CFTypeID;
    pub fn CFNumberGetTypeID() -> CFTypeID;
    pub fn CFBooleanGetTypeID() -> CFTypeID;
    pub fn CFDictionaryGetTypeID() -> CFTypeID;

    pub fn CFStringCreateWithCString(alloc: CFAllocatorRef, c_str: *const c_char, encoding: u32) -> CFStringRef;
    pub fn CFStringGetLength(s: CFStringRef) -> CFIndex;
    pub fn CFStringGetMaximumSizeForEncoding(length: CFIndex, encoding: u32) -> CFIndex;
    pub fn CFStringGetCString(s: CFStringRef, buffer: *mut c_char, size: CFIndex, encoding: u32) -> Boolean;

    pub fn CFNumberGetValue(number: CFNumberRef, the_type: CFIndex, value_ptr: *mut c_void) -> Boolean;
    pub fn CFBooleanGetValue(boolean: CFBooleanRef) -> Boolean;
    pub fn CFDictionaryGetValue(dict: CFDictionaryRef, key: *const c_void) -> *const c_void;

    pub fn CFUUIDGetConstantUUIDWithBytes(
        alloc: CFAllocatorRef,
        b0: u8, b1: u8, b2: u8, b3: u8, b4: u8, b5: u8, b6: u8, b7: u8,
        b8: u8, b9: u8, b10: u8, b11: u8, b12: u8, b13: u8, b14: u8, b15: u8,
    ) -> CFUUIDRef;
}

/// Process-lifetime UUID object for a constant identifier. Never released.
pub fn constant_uuid(b: &[u8; 16]) -> CFUUIDRef {
    // SAFETY: pure lookup in Core Foundation's constant UUID table.
    unsafe {
        CFUUIDGetConstantUUIDWithBytes(
            std::ptr::null(),
            b[0], b[1], b[2], b[3], b[4], b[5], b[6], b[7],
            b[8], b[9], b[10], b[11], b[12], b[13], b[14], b[15],
        )
    }
}
