//! zenilib-activity - NativeActivity bootstrap for zenilib applications
//!
//! This crate is the library the Android framework loads for a zenilib
//! NativeActivity. It does two things:
//!
//! - loads the engine's native libraries once, in dependency order, before any
//!   native call is made;
//! - hands the activity's `AAssetManager` to native code each time an
//!   activity is created.
//!
//! The application library, `libapplication.so`, then takes over. It exports
//!
//! ```c
//! void zeni_provide_asset_manager(AAssetManager *manager);
//! ```
//!
//! to receive the asset manager, and `zeni_android_main`, which is handed the
//! `AndroidApp` and owns the activity's lifecycle from then on. Rust code can
//! also read the handle back with [`assets::current`].
//!
//! # Example
//!
//! ```rust,ignore
//! use zenilib_activity::{Bootstrap, DlopenLoader, LoadPlan};
//!
//! let bootstrap = Bootstrap::new(LoadPlan::default(), DlopenLoader::new(), |handle| {
//!     log::info!("engine got {:?}", handle);
//! });
//! bootstrap.on_create(|| app.asset_manager().ptr().as_ptr())?;
//! ```

pub mod assets;
pub mod bootstrap;
pub mod error;
pub mod libraries;

#[cfg(target_os = "android")]
mod runtime;

pub use assets::{AssetManagerHandle, AssetSlot, RawAssetManager};
pub use bootstrap::{
    library_file, resolve_symbol, AssetSink, Bootstrap, EntryPoint, ENTRY_SYMBOL, MAIN_SYMBOL,
};
pub use error::{Error, LoadError, Result};
pub use libraries::{
    load_plan, Availability, DlopenLoader, LibraryLoader, LoadPlan, LoadReport, NativeLibrary,
    Stage, APPLICATION_LIBRARY, LIBRARIES,
};

/// Tag every shim and engine log line is written under on device.
pub const LOG_TAG: &str = "zenilib App";

/// Library name the manifest's `android.app.lib_name` must point at.
pub const ACTIVITY_LIB_NAME: &str = "zenilib_activity";
