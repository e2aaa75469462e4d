//! Typed reads from the I/O Registry. A missing or mistyped property reads
//! as `None`.

use super::ffi::*;
use super::plugin::{cf_owned, io_object, raw, CfRef, IoObject};
use crate::guard::NativeGuard;
use std::ffi::{c_char, c_void, CString};
use std::ptr;

pub fn cf_string(s: &str) -> Option<NativeGuard<CfRef>> {
    let c = CString::new(s).ok()?;
    // SAFETY: `c` is NUL-terminated and outlives the call.
    cf_owned(unsafe { CFStringCreateWithCString(ptr::null(), c.as_ptr(), kCFStringEncodingUTF8) })
}

fn has_type(value: CFTypeRef, type_id: CFTypeID) -> bool {
    // SAFETY: `value` is a non-null CF object.
    !value.is_null() && unsafe { CFGetTypeID(value) } == type_id
}

pub fn to_string(value: CFTypeRef) -> Option<String> {
    // SAFETY: type-checked before each call; buffer sized by CF.
    unsafe {
        if !has_type(value, CFStringGetTypeID()) {
            return None;
        }
        let len = CFStringGetLength(value);
        let cap = CFStringGetMaximumSizeForEncoding(len, kCFStringEncodingUTF8) + 1;
        let mut buf = vec![0u8; usize::try_from(cap).ok()?];
        if CFStringGetCString(value, buf.as_mut_ptr().cast::<c_char>(), cap, kCFStringEncodingUTF8) == 0 {
            return None;
        }
        let end = buf.iter().position(|&b| b == 0).unwrap_or(buf.len());
        let s = String::from_utf8_lossy(&buf[..end]).trim().to_string();
        if s.is_empty() { None } else { Some(s) }
    }
}

pub fn to_u64(value: CFTypeRef) -> Option<u64> {
    // SAFETY: type-checked; `out` is a valid i64.
    unsafe {
        if !has_type(value, CFNumberGetTypeID()) {
            return None;
        }
        let mut out: i64 = 0;
        CFNumberGetValue(value, kCFNumberSInt64Type, (&mut out as *mut i64).cast::<c_void>());
        u64::try_from(out).ok()
    }
}

pub fn to_bool(value: CFTypeRef) -> Option<bool> {
    // SAFETY: type-checked.
    unsafe {
        if !has_type(value, CFBooleanGetTypeID()) {
            return None;
        }
        Some(CFBooleanGetValue(value) != 0)
    }
}

/// A property of `entry` itself, owned by the caller.
pub fn property(entry: io_registry_entry_t, key: &str) -> Option<NativeGuard<CfRef>> {
    let key = cf_string(key)?;
    let key_ref = key.get()?.0;
    // SAFETY: `key` is a live CFString.
    cf_owned(unsafe { IORegistryEntryCreateCFProperty(entry, key_ref, ptr::null(), 0) })
}

/// A property of `entry` or the nearest ancestor in the service plane that has it.
pub fn search_parents(entry: io_registry_entry_t, key: &str) -> Option<NativeGuard<CfRef>> {
    let key = cf_string(key)?;
    let key_ref = key.get()?.0;
    // SAFETY: `key` is live and the plane name is NUL-terminated.
    cf_owned(unsafe {
        IORegistryEntrySearchCFProperty(
            entry,
            IO_SERVICE_PLANE.as_ptr().cast(),
            key_ref,
            ptr::null(),
            kIORegistryIterateRecursively | kIORegistryIterateParents,
        )
    })
}

fn value(guard: &Option<NativeGuard<CfRef>>) -> CFTypeRef {
    guard.as_ref().and_then(|g| g.get()).map(|r| r.0).unwrap_or(ptr::null())
}

pub fn string_property(entry: io_registry_entry_t, key: &str) -> Option<String> {
    to_string(value(&property(entry, key)))
}

pub fn u64_property(entry: io_registry_entry_t, key: &str) -> Option<u64> {
    to_u64(value(&property(entry, key)))
}

pub fn bool_property(entry: io_registry_entry_t, key: &str) -> Option<bool> {
    to_bool(value(&property(entry, key)))
}

/// Borrowed view of a CF dictionary held by some owning guard.
pub struct Dict<'a> {
    raw:    CFDictionaryRef,
    _owner: std::marker::PhantomData<&'a NativeGuard<CfRef>>,
}

impl<'a> Dict<'a> {
    pub fn of(owner: &'a Option<NativeGuard<CfRef>>) -> Option<Self> {
        let raw = value(owner);
        // SAFETY: pure type query.
        if !has_type(raw, unsafe { CFDictionaryGetTypeID() }) {
            return None;
        }
        Some(Self { raw, _owner: std::marker::PhantomData })
    }

    fn get(&self, key: &str) -> CFTypeRef {
        let key = match cf_string(key) {
            Some(k) => k,
            None    => return ptr::null(),
        };
        let key_ref = key.get().map(|k| k.0).unwrap_or(ptr::null());
        // SAFETY: get rule; the value lives as long as the dictionary.
        unsafe { CFDictionaryGetValue(self.raw, key_ref) }
    }

    pub fn string(&self, key: &str) -> Option<String> {
        to_string(self.get(key))
    }

    pub fn u64(&self, key: &str) -> Option<u64> {
        to_u64(self.get(key))
    }
}

// ── Registry traversal ───────────────────────────────────────────────────────

pub fn parent(entry: io_registry_entry_t) -> Option<NativeGuard<IoObject>> {
    let mut out: io_registry_entry_t = MACH_PORT_NULL;
    // SAFETY: `out` is a valid out-pointer.
    let kr = unsafe { IORegistryEntryGetParentEntry(entry, IO_SERVICE_PLANE.as_ptr().cast(), &mut out) };
    if kr != KERN_SUCCESS { None } else { io_object(out) }
}

pub fn conforms_to(entry: io_registry_entry_t, class: &str) -> bool {
    let class = match CString::new(class) {
        Ok(c)  => c,
        Err(_) => return false,
    };
    // SAFETY: NUL-terminated class name.
    unsafe { IOObjectConformsTo(entry, class.as_ptr()) != 0 }
}

/// The nearest strict ancestor of `entry` that is an instance of `class`.
pub fn ancestor(entry: io_registry_entry_t, class: &str) -> Option<NativeGuard<IoObject>> {
    let mut current = parent(entry)?;
    loop {
        if conforms_to(raw(&current), class) {
            return Some(current);
        }
        current = parent(raw(&current))?;
    }
}

/// Every registered service matching `class`, in registry order.
pub fn matching_services(class: &str) -> Vec<NativeGuard<IoObject>> {
    let class = match CString::new(class) {
        Ok(c)  => c,
        Err(_) => return Vec::new(),
    };
    let mut iter: io_iterator_t = MACH_PORT_NULL;
    // SAFETY: IOServiceGetMatchingServices consumes the matching dictionary.
    let kr = unsafe {
        IOServiceGetMatchingServices(IO_MAIN_PORT_DEFAULT, IOServiceMatching(class.as_ptr()), &mut iter)
    };
    let iter = match (kr, io_object(iter)) {
        (KERN_SUCCESS, Some(it)) => it,
        _                        => return Vec::new(),
    };

    let mut services = Vec::new();
    // SAFETY: iterator is live until `iter` drops.
    while let Some(obj) = io_object(unsafe { IOIteratorNext(raw(&iter)) }) {
        services.push(obj);
    }
    services
}

/// The `IOMedia` object carrying a BSD name such as `disk0`.
pub fn media_for_bsd_name(bsd_name: &str) -> Option<NativeGuard<IoObject>> {
    let name = CString::new(bsd_name).ok()?;
    // SAFETY: IOServiceGetMatchingService consumes the matching dictionary.
    io_object(unsafe {
        IOServiceGetMatchingService(IO_MAIN_PORT_DEFAULT, IOBSDNameMatching(IO_MAIN_PORT_DEFAULT, 0, name.as_ptr()))
    })
}
