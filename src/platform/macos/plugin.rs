//! Owned I/O Kit objects, Core Foundation references and plugin interfaces.

use super::ffi::*;
use crate::error::{Result, SmartError};
use crate::guard::{self, Handshake, NativeGuard, NativeHandle};
use std::ffi::c_void;
use std::marker::PhantomData;
use std::ptr;
use tracing::debug;

/// A retained `io_object_t`.
#[derive(Debug)]
pub struct IoObject(pub io_object_t);

impl NativeHandle for IoObject {
    fn release(self) {
        // SAFETY: the guard owns exactly one reference to this object.
        unsafe { IOObjectRelease(self.0) };
    }
}

pub fn io_object(raw: io_object_t) -> Option<NativeGuard<IoObject>> {
    if raw == MACH_PORT_NULL { None } else { Some(NativeGuard::new(IoObject(raw))) }
}

pub fn raw(obj: &NativeGuard<IoObject>) -> io_object_t {
    obj.get().map(|o| o.0).unwrap_or(MACH_PORT_NULL)
}

/// A Core Foundation object obtained under the create rule.
#[derive(Debug)]
pub struct CfRef(pub CFTypeRef);

impl NativeHandle for CfRef {
    fn release(self) {
        // SAFETY: the guard owns the +1 reference returned by a Create/Copy call.
        unsafe { CFRelease(self.0) };
    }
}

pub fn cf_owned(raw: CFTypeRef) -> Option<NativeGuard<CfRef>> {
    if raw.is_null() { None } else { Some(NativeGuard::new(CfRef(raw))) }
}

/// The outer `IOCFPlugInInterface**` returned by the factory call.
#[derive(Debug)]
pub struct PlugIn(*mut *mut IOCFPlugInInterface);

impl NativeHandle for PlugIn {
    fn release(self) {
        // SAFETY: the guard owns the reference handed out by
        // IOCreatePlugInInterfaceForService; Release is IUnknown slot 3.
        unsafe { release_unknown(self.0.cast()) };
    }
}

// SAFETY: I/O Kit plugin references are not tied to the creating thread. Each
// one is owned by a single session, which callers serialize.
unsafe impl Send for PlugIn {}

/// An inner SMART interface `V**` obtained through `QueryInterface`.
#[derive(Debug)]
pub struct Interface<V> {
    ptr:     *mut *mut V,
    _vtable: PhantomData<V>,
}

impl<V> Interface<V> {
    pub fn this(&self) -> *mut c_void {
        self.ptr.cast()
    }

    /// # Safety
    /// The interface must still be retained, which the owning guard ensures.
    pub unsafe fn vtable(&self) -> &V {
        &**self.ptr
    }
}

impl<V> NativeHandle for Interface<V> {
    fn release(self) {
        // SAFETY: QueryInterface returned one reference, owned by the guard.
        unsafe { release_unknown(self.ptr.cast()) };
    }
}

// SAFETY: as for `PlugIn`; the vtable type is only a marker.
unsafe impl<V> Send for Interface<V> {}

unsafe fn release_unknown(this: *mut *mut IUnknownVTbl) {
    if this.is_null() || (*this).is_null() {
        return;
    }
    let release = (**this).release;
    release(this.cast());
}

/// The factory then `QueryInterface` handshake against one service.
struct PlugInQuery<V> {
    service:          io_service_t,
    user_client_type: &'static [u8; 16],
    interface_id:     &'static [u8; 16],
    name:             &'static str,
    _vtable:          PhantomData<V>,
}

impl<V> Handshake for PlugInQuery<V> {
    type Outer = PlugIn;
    type Inner = Interface<V>;

    fn create(&mut self) -> Result<PlugIn> {
        let mut plugin: *mut *mut IOCFPlugInInterface = ptr::null_mut();
        let mut score: i32 = 0;

        // SAFETY: out-pointers are valid locals; UUIDs are process-lifetime constants.
        let kr = unsafe {
            IOCreatePlugInInterfaceForService(
                self.service,
                constant_uuid(self.user_client_type),
                constant_uuid(&CF_PLUGIN_INTERFACE_ID),
                &mut plugin,
                &mut score,
            )
        };
        if kr != KERN_SUCCESS || plugin.is_null() {
            return Err(SmartError::IoKit { op: "IOCreatePlugInInterfaceForService", code: kr });
        }
        Ok(PlugIn(plugin))
    }

    fn query(&mut self, outer: &PlugIn) -> Result<Interface<V>> {
        let plugin = outer.0;
        let mut inner: *mut c_void = ptr::null_mut();
        // SAFETY: `plugin` is a live IOCFPlugInInterface** owned by the caller's guard.
        let hr = unsafe {
            let query = (**plugin).unknown.query_interface;
            query(plugin.cast(), CFUUIDBytes(*self.interface_id), &mut inner)
        };
        if hr != S_OK || inner.is_null() {
            debug!(interface = self.name, hr, "QueryInterface failed");
            return Err(SmartError::InterfaceUnavailable(self.name));
        }
        Ok(Interface { ptr: inner.cast(), _vtable: PhantomData })
    }
}

/// Open the SMART interface `V` of `service`. Both references come back inner
/// first; a failed query leaves nothing retained.
pub fn open_interface<V>(
    service: io_service_t,
    user_client_type: &'static [u8; 16],
    interface_id: &'static [u8; 16],
    name: &'static str,
) -> Result<(NativeGuard<Interface<V>>, NativeGuard<PlugIn>)> {
    guard::acquire(&mut PlugInQuery { service, user_client_type, interface_id, name, _vtable: PhantomData })
}
