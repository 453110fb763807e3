//! Interop bridge: one GPU resource visible to two graphics APIs.
//!
//! The native device (D3D11) owns the resource; the aliasing API (OpenGL)
//! may only touch it while it is locked, and the native API only while it is
//! unlocked. The driver reports nothing when that rule is broken, so the
//! bridge enforces it: [`InteropBridge::lock`] hands out an [`InteropLock`]
//! that has to be returned to [`InteropBridge::unlock`], a second lock while
//! one is outstanding is refused, and dropping the bridge unlocks,
//! unregisters and closes in that order.

use std::ffi::c_void;

use tracing::{debug, warn};

use crate::error::InteropError;

#[cfg(windows)]
pub mod wgl;

/// Device handle returned by [`InteropApi::open_device`].
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct InteropDevice(pub usize);

/// Registration handle returned by [`InteropApi::register_object`].
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct InteropObject(pub usize);

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum InteropAccess {
    ReadOnly,
    ReadWrite,
    WriteDiscard,
}

/// Kind of object the native resource is aliased as.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum AliasTarget {
    Renderbuffer,
    Texture2D,
}

/// Driver entry points of a cross-API aliasing extension.
pub trait InteropApi {
    fn open_device(&self, native_device: *mut c_void) -> Result<InteropDevice, InteropError>;

    fn register_object(
        &self,
        device: InteropDevice,
        native_resource: *mut c_void,
        alias_name: u32,
        target: AliasTarget,
        access: InteropAccess,
    ) -> Result<InteropObject, InteropError>;

    fn lock_objects(&self, device: InteropDevice, objects: &[InteropObject]) -> Result<(), InteropError>;

    fn unlock_objects(&self, device: InteropDevice, objects: &[InteropObject])
    -> Result<(), InteropError>;

    fn unregister_object(&self, device: InteropDevice, object: InteropObject) -> bool;

    fn close_device(&self, device: InteropDevice) -> bool;
}

/// Proof that the registered objects are locked for the aliasing API.
#[must_use = "an interop lock must be passed back to InteropBridge::unlock"]
#[derive(Debug)]
pub struct InteropLock {
    device: InteropDevice,
}

pub struct InteropBridge<A: InteropApi> {
    api: A,
    device: Option<InteropDevice>,
    objects: Vec<InteropObject>,
    locked: bool,
}

impl<A: InteropApi> InteropBridge<A> {
    /// Opens the interop device for `native_device`.
    pub fn open(api: A, native_device: *mut c_void) -> Result<Self, InteropError> {
        let device = api.open_device(native_device)?;
        debug!("interop: opened device {:?}", device);
        Ok(Self {
            api,
            device: Some(device),
            objects: Vec::new(),
            locked: false,
        })
    }

    pub fn register(
        &mut self,
        native_resource: *mut c_void,
        alias_name: u32,
        target: AliasTarget,
        access: InteropAccess,
    ) -> Result<InteropObject, InteropError> {
        let device = self.device.ok_or(InteropError::NotOpen)?;
        if self.locked {
            return Err(InteropError::AlreadyLocked);
        }
        let object = self
            .api
            .register_object(device, native_resource, alias_name, target, access)?;
        debug!("interop: registered {:?} as {:?} {}", object, target, alias_name);
        self.objects.push(object);
        Ok(object)
    }

    pub fn is_locked(&self) -> bool {
        self.locked
    }

    /// Locks every registered object for the aliasing API.
    pub fn lock(&mut self) -> Result<InteropLock, InteropError> {
        let device = self.device.ok_or(InteropError::NotOpen)?;
        if self.locked {
            return Err(InteropError::AlreadyLocked);
        }
        self.api.lock_objects(device, &self.objects)?;
        self.locked = true;
        Ok(InteropLock { device })
    }

    /// Hands the objects back to the native API.
    pub fn unlock(&mut self, lock: InteropLock) -> Result<(), InteropError> {
        if !self.locked || self.device != Some(lock.device) {
            return Err(InteropError::NotOpen);
        }
        // Clear the flag first so a failed unlock is not retried on drop.
        self.locked = false;
        self.api.unlock_objects(lock.device, &self.objects)
    }

    /// Runs `f` with the objects locked, unlocking on every exit path.
    pub fn with_lock<R>(&mut self, f: impl FnOnce() -> R) -> Result<R, InteropError> {
        let lock = self.lock()?;
        let result = f();
        self.unlock(lock)?;
        Ok(result)
    }

    /// Unlocks if needed, unregisters every object and closes the device.
    /// Returns false if the bridge was already closed.
    pub fn close(&mut self) -> bool {
        let Some(device) = self.device.take() else {
            return false;
        };
        if self.locked {
            self.locked = false;
            if let Err(e) = self.api.unlock_objects(device, &self.objects) {
                warn!("interop: unlock during close failed: {}", e);
            }
        }
        for object in self.objects.drain(..).rev() {
            if !self.api.unregister_object(device, object) {
                warn!("interop: failed to unregister {:?}", object);
            }
        }
        if !self.api.close_device(device) {
            warn!("interop: failed to close device {:?}", device);
        }
        debug!("interop: closed device {:?}", device);
        true
    }
}

impl<A: InteropApi> Drop for InteropBridge<A> {
    fn drop(&mut self) {
        self.close();
    }
}
