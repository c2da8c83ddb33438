//! Process-wide asset manager handle and asset access

use std::ptr::{self, NonNull};
use std::sync::atomic::{AtomicPtr, Ordering};

use crate::error::{Error, Result};

#[cfg(target_os = "android")]
pub use ndk_sys::AAssetManager as RawAssetManager;

/// Opaque stand-in for `AAssetManager` on hosts without the NDK.
#[cfg(not(target_os = "android"))]
#[repr(C)]
pub struct RawAssetManager {
    _private: [u8; 0],
}

/// Borrowed reference to the platform's asset manager.
///
/// The activity owns the manager; this handle never releases it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AssetManagerHandle(NonNull<RawAssetManager>);

// SAFETY: AAssetManager is documented as safe to use from any thread, and the
// handle never frees it.
unsafe impl Send for AssetManagerHandle {}
unsafe impl Sync for AssetManagerHandle {}

impl AssetManagerHandle {
    /// Returns `None` for a null pointer.
    pub fn from_raw(ptr: *mut RawAssetManager) -> Option<Self> {
        NonNull::new(ptr).map(Self)
    }

    pub fn as_ptr(&self) -> *mut RawAssetManager {
        self.0.as_ptr()
    }
}

/// A slot holding the most recently provided asset manager.
pub struct AssetSlot {
    ptr: AtomicPtr<RawAssetManager>,
}

impl Default for AssetSlot {
    fn default() -> Self {
        Self::new()
    }
}

impl AssetSlot {
    pub const fn new() -> Self {
        Self {
            ptr: AtomicPtr::new(ptr::null_mut()),
        }
    }

    pub fn store(&self, handle: AssetManagerHandle) {
        self.ptr.store(handle.as_ptr(), Ordering::Release);
    }

    pub fn load(&self) -> Result<AssetManagerHandle> {
        AssetManagerHandle::from_raw(self.ptr.load(Ordering::Acquire)).ok_or(Error::NoAssetManager)
    }
}

/// The slot native code reads from.
pub static ASSET_MANAGER: AssetSlot = AssetSlot::new();

/// The current asset manager, or [`Error::NoAssetManager`] if no activity has
/// provided one yet.
pub fn current() -> Result<AssetManagerHandle> {
    ASSET_MANAGER.load()
}

/// File descriptor onto an uncompressed asset inside the APK.
#[cfg(target_os = "android")]
#[derive(Debug)]
pub struct AssetDescriptor {
    pub fd: std::os::fd::OwnedFd,
    /// Byte offset of the asset within `fd`.
    pub start: i64,
    pub length: i64,
}

/// Read a whole asset into memory.
#[cfg(target_os = "android")]
pub fn read(path: &str) -> Result<Vec<u8>> {
    use ndk::asset::AssetManager;

    log::info!("Loading asset from file '{}'.", path);

    let handle = current()?;
    let filename = std::ffi::CString::new(path).map_err(|_| Error::AssetLoad(path.to_string()))?;
    // SAFETY: the pointer came from the platform and outlives the activity.
    let manager = unsafe { AssetManager::from_ptr(handle.0) };
    let mut asset = manager.open(&filename).ok_or_else(|| {
        log::error!("Asset '{}' not found", path);
        Error::AssetLoad(path.to_string())
    })?;
    let bytes = asset
        .get_buffer()
        .map_err(|_| Error::AssetLoad(path.to_string()))?;
    Ok(bytes.to_vec())
}

/// Open an asset as a file descriptor, for consumers that want `FILE*`-style
/// access. Only works for assets stored uncompressed.
#[cfg(target_os = "android")]
pub fn open_descriptor(path: &str) -> Result<AssetDescriptor> {
    use std::os::fd::FromRawFd;

    log::info!("Loading asset from file '{}'.", path);

    let handle = current()?;
    let filename = std::ffi::CString::new(path).map_err(|_| Error::AssetLoad(path.to_string()))?;

    // SAFETY: valid manager and NUL-terminated name; the asset is closed
    // before returning on every path.
    unsafe {
        let asset = ndk_sys::AAssetManager_open(
            handle.as_ptr(),
            filename.as_ptr(),
            ndk_sys::AASSET_MODE_UNKNOWN as _,
        );
        if asset.is_null() {
            log::error!("Asset '{}' not found", path);
            return Err(Error::AssetLoad(path.to_string()));
        }

        let mut start = 0;
        let mut length = 0;
        let fd = ndk_sys::AAsset_openFileDescriptor(asset, &mut start, &mut length);
        ndk_sys::AAsset_close(asset);
        if fd < 0 {
            log::error!("Asset '{}' has no file descriptor", path);
            return Err(Error::AssetLoad(path.to_string()));
        }

        Ok(AssetDescriptor {
            fd: std::os::fd::OwnedFd::from_raw_fd(fd),
            start: start as i64,
            length: length as i64,
        })
    }
}
