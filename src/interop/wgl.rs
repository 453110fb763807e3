//! `WGL_NV_DX_interop` entry points.
//!
//! Loaded through `wglGetProcAddress`, so an OpenGL context has to be
//! current on the calling thread.

use std::ffi::{CStr, c_void};

use tracing::debug;
use windows::Win32::Graphics::OpenGL::wglGetProcAddress;
use windows::core::PCSTR;

use super::{AliasTarget, InteropAccess, InteropApi, InteropDevice, InteropObject};
use crate::error::InteropError;

const WGL_ACCESS_READ_ONLY_NV: u32 = 0x0000;
const WGL_ACCESS_READ_WRITE_NV: u32 = 0x0001;
const WGL_ACCESS_WRITE_DISCARD_NV: u32 = 0x0002;

const GL_TEXTURE_2D: u32 = 0x0DE1;
const GL_RENDERBUFFER: u32 = 0x8D41;

type OpenDeviceFn = unsafe extern "system" fn(*mut c_void) -> *mut c_void;
type CloseDeviceFn = unsafe extern "system" fn(*mut c_void) -> i32;
type RegisterObjectFn =
    unsafe extern "system" fn(*mut c_void, *mut c_void, u32, u32, u32) -> *mut c_void;
type UnregisterObjectFn = unsafe extern "system" fn(*mut c_void, *mut c_void) -> i32;
type LockObjectsFn = unsafe extern "system" fn(*mut c_void, i32, *mut *mut c_void) -> i32;

pub struct WglInterop {
    open_device: OpenDeviceFn,
    close_device: CloseDeviceFn,
    register_object: RegisterObjectFn,
    unregister_object: UnregisterObjectFn,
    lock_objects: LockObjectsFn,
    unlock_objects: LockObjectsFn,
}

/// Resolve one WGL extension function
unsafe fn load<T: Copy>(name: &'static CStr) -> Result<T, InteropError> {
    let proc = unsafe { wglGetProcAddress(PCSTR(name.as_ptr() as *const u8)) };
    match proc {
        Some(f) => Ok(unsafe { std::mem::transmute_copy(&f) }),
        None => Err(InteropError::EntryPointMissing(
            name.to_str().unwrap_or("wglDX*NV"),
        )),
    }
}

impl WglInterop {
    /// # Safety
    /// An OpenGL context must be current on this thread.
    pub unsafe fn load() -> Result<Self, InteropError> {
        unsafe {
            let interop = Self {
                open_device: load(c"wglDXOpenDeviceNV")?,
                close_device: load(c"wglDXCloseDeviceNV")?,
                register_object: load(c"wglDXRegisterObjectNV")?,
                unregister_object: load(c"wglDXUnregisterObjectNV")?,
                lock_objects: load(c"wglDXLockObjectsNV")?,
                unlock_objects: load(c"wglDXUnlockObjectsNV")?,
            };
            debug!("interop: WGL_NV_DX_interop entry points loaded");
            Ok(interop)
        }
    }
}

fn raw_objects(objects: &[InteropObject]) -> Vec<*mut c_void> {
    objects.iter().map(|o| o.0 as *mut c_void).collect()
}

impl InteropApi for WglInterop {
    fn open_device(&self, native_device: *mut c_void) -> Result<InteropDevice, InteropError> {
        let handle = unsafe { (self.open_device)(native_device) };
        if handle.is_null() {
            return Err(InteropError::OpenDevice);
        }
        Ok(InteropDevice(handle as usize))
    }

    fn register_object(
        &self,
        device: InteropDevice,
        native_resource: *mut c_void,
        alias_name: u32,
        target: AliasTarget,
        access: InteropAccess,
    ) -> Result<InteropObject, InteropError> {
        let target = match target {
            AliasTarget::Renderbuffer => GL_RENDERBUFFER,
            AliasTarget::Texture2D => GL_TEXTURE_2D,
        };
        let access = match access {
            InteropAccess::ReadOnly => WGL_ACCESS_READ_ONLY_NV,
            InteropAccess::ReadWrite => WGL_ACCESS_READ_WRITE_NV,
            InteropAccess::WriteDiscard => WGL_ACCESS_WRITE_DISCARD_NV,
        };
        let handle = unsafe {
            (self.register_object)(
                device.0 as *mut c_void,
                native_resource,
                alias_name,
                target,
                access,
            )
        };
        if handle.is_null() {
            return Err(InteropError::Register);
        }
        Ok(InteropObject(handle as usize))
    }

    fn lock_objects(&self, device: InteropDevice, objects: &[InteropObject]) -> Result<(), InteropError> {
        let mut raw = raw_objects(objects);
        let ok = unsafe {
            (self.lock_objects)(device.0 as *mut c_void, raw.len() as i32, raw.as_mut_ptr())
        };
        if ok == 0 { Err(InteropError::Lock) } else { Ok(()) }
    }

    fn unlock_objects(
        &self,
        device: InteropDevice,
        objects: &[InteropObject],
    ) -> Result<(), InteropError> {
        let mut raw = raw_objects(objects);
        let ok = unsafe {
            (self.unlock_objects)(device.0 as *mut c_void, raw.len() as i32, raw.as_mut_ptr())
        };
        if ok == 0 { Err(InteropError::Unlock) } else { Ok(()) }
    }

    fn unregister_object(&self, device: InteropDevice, object: InteropObject) -> bool {
        unsafe { (self.unregister_object)(device.0 as *mut c_void, object.0 as *mut c_void) != 0 }
    }

    fn close_device(&self, device: InteropDevice) -> bool {
        unsafe { (self.close_device)(device.0 as *mut c_void) != 0 }
    }
}
