//! Load-once and creation-hook sequencing
//!
//! [`Bootstrap`] ties the pieces together: the library plan is loaded exactly
//! once, and only after that succeeds is the asset manager fetched, stored and
//! forwarded to native code.

use std::sync::{Mutex, OnceLock};

use libloading::Library;
use log::{debug, info, warn};

use crate::assets::{self, AssetManagerHandle, AssetSlot, RawAssetManager};
use crate::error::{Error, LoadError, Result};
use crate::libraries::{self, LibraryLoader, LoadPlan, LoadReport, APPLICATION_LIBRARY};

/// Symbol the application library exports to receive the asset manager.
pub const ENTRY_SYMBOL: &str = "zeni_provide_asset_manager";

/// Symbol the application library exports to take over the activity once the
/// asset manager has been provided.
pub const MAIN_SYMBOL: &str = "zeni_android_main";

/// Receiver of the asset manager once the activity is created.
pub trait AssetSink {
    fn provide(&self, handle: AssetManagerHandle) -> Result<()>;
}

impl<F> AssetSink for F
where
    F: Fn(AssetManagerHandle),
{
    fn provide(&self, handle: AssetManagerHandle) -> Result<()> {
        self(handle);
        Ok(())
    }
}

/// File name of a native library as the dynamic linker looks it up.
pub fn library_file(name: &str) -> String {
    format!("lib{name}.so")
}

/// Resolve `symbol` from `library` and keep the library resident so the
/// returned pointer stays valid for the life of the process.
///
/// # Safety
///
/// `T` must be the function pointer type the library declares for `symbol`.
pub unsafe fn resolve_symbol<T: Copy>(library: &str, symbol: &str) -> std::result::Result<T, String> {
    // SAFETY: libraries named here are already resident from the load plan,
    // so this only bumps their reference count.
    let handle = unsafe { Library::new(library) }.map_err(|e| e.to_string())?;
    let func = unsafe { handle.get::<T>(symbol.as_bytes()) }
        .map(|sym| *sym)
        .map_err(|e| e.to_string())?;
    std::mem::forget(handle);
    Ok(func)
}

type ProvideFn = unsafe extern "C" fn(*mut RawAssetManager);

/// C-ABI entry point exported by a native library, resolved on first use.
pub struct EntryPoint {
    library: String,
    symbol: &'static str,
    resolved: OnceLock<std::result::Result<ProvideFn, String>>,
}

impl EntryPoint {
    /// Entry point in the library with the given short name (`application`
    /// for `libapplication.so`).
    pub fn new(library: &str, symbol: &'static str) -> Self {
        Self::from_path(library_file(library), symbol)
    }

    /// Entry point in a library named by file name or path.
    pub fn from_path(library: impl Into<String>, symbol: &'static str) -> Self {
        Self {
            library: library.into(),
            symbol,
            resolved: OnceLock::new(),
        }
    }

    /// `zeni_provide_asset_manager` in the application library.
    pub fn application() -> Self {
        Self::new(APPLICATION_LIBRARY, ENTRY_SYMBOL)
    }

    /// Whether the symbol has been looked up and found.
    pub fn is_resolved(&self) -> bool {
        matches!(self.resolved.get(), Some(Ok(_)))
    }
}

impl AssetSink for EntryPoint {
    fn provide(&self, handle: AssetManagerHandle) -> Result<()> {
        let func = self
            .resolved
            // SAFETY: the engine declares the symbol as `void (AAssetManager *)`.
            .get_or_init(|| unsafe { resolve_symbol(&self.library, self.symbol) })
            .as_ref()
            .map_err(|reason| Error::EntryPoint {
                symbol: self.symbol,
                library: self.library.clone(),
                reason: reason.clone(),
            })?;
        debug!("Forwarding asset manager to {}", self.symbol);
        // SAFETY: the symbol is declared with this signature by the engine and
        // the handle is non-null.
        unsafe { func(handle.as_ptr()) };
        Ok(())
    }
}

/// One-time library loading followed by asset manager forwarding.
pub struct Bootstrap<L, S> {
    plan: LoadPlan,
    loader: Mutex<L>,
    sink: S,
    slot: &'static AssetSlot,
    loaded: OnceLock<std::result::Result<LoadReport, LoadError>>,
}

impl<L: LibraryLoader, S: AssetSink> Bootstrap<L, S> {
    /// A bootstrap that publishes into the process-wide [`assets::ASSET_MANAGER`].
    pub fn new(plan: LoadPlan, loader: L, sink: S) -> Self {
        Self::with_slot(plan, loader, sink, &assets::ASSET_MANAGER)
    }

    pub fn with_slot(plan: LoadPlan, loader: L, sink: S, slot: &'static AssetSlot) -> Self {
        Self {
            plan,
            loader: Mutex::new(loader),
            sink,
            slot,
            loaded: OnceLock::new(),
        }
    }

    pub fn plan(&self) -> &LoadPlan {
        &self.plan
    }

    /// Load the plan the first time this is called; later calls return the
    /// same outcome without touching the loader.
    pub fn ensure_loaded(&self) -> std::result::Result<&LoadReport, LoadError> {
        self.loaded
            .get_or_init(|| {
                info!("Loading {} native libraries", self.plan.len());
                let mut loader = match self.loader.lock() {
                    Ok(guard) => guard,
                    Err(poisoned) => poisoned.into_inner(),
                };
                libraries::load_plan(&self.plan, &mut *loader)
            })
            .as_ref()
            .map_err(|e| e.clone())
    }

    /// Activity creation hook.
    ///
    /// `fetch` is only called once the libraries are resident. Every call
    /// re-fetches, so a configuration change never leaves native code with a
    /// stale handle.
    pub fn on_create<F>(&self, fetch: F) -> Result<AssetManagerHandle>
    where
        F: FnOnce() -> *mut RawAssetManager,
    {
        self.ensure_loaded()?;

        let handle = AssetManagerHandle::from_raw(fetch()).ok_or_else(|| {
            warn!("Platform returned a null asset manager");
            Error::NullAssetManager
        })?;
        self.slot.store(handle);
        self.sink.provide(handle)?;

        info!("Asset manager provided to native code");
        Ok(handle)
    }
}
