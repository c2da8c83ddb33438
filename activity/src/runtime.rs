//! Android NativeActivity entry point
//!
//! The framework loads this library as the activity's native code. It loads
//! the engine libraries, hands the asset manager to native code and then gives
//! the activity to the application's own `zeni_android_main`, which owns the
//! lifecycle from there on.

use std::sync::LazyLock;

use android_activity::AndroidApp;
use android_logger::Config as AndroidLoggerConfig;
use anyhow::{Context, anyhow};
use log::{error, info};

use crate::bootstrap::{self, Bootstrap, EntryPoint, MAIN_SYMBOL};
use crate::libraries::{APPLICATION_LIBRARY, DlopenLoader, LoadPlan};
use crate::LOG_TAG;

/// `void zeni_android_main(AndroidApp)`, exported by a Rust application
/// library built against the same `android-activity` release.
#[allow(improper_ctypes_definitions)]
type AppMainFn = unsafe extern "C" fn(AndroidApp);

static BOOTSTRAP: LazyLock<Bootstrap<DlopenLoader, EntryPoint>> = LazyLock::new(|| {
    Bootstrap::new(LoadPlan::default(), DlopenLoader::new(), EntryPoint::application())
});

fn init_logging() {
    android_logger::init_once(
        AndroidLoggerConfig::default()
            .with_max_level(log::LevelFilter::Info)
            .with_tag(LOG_TAG),
    );

    std::panic::set_hook(Box::new(|panic_info| {
        log::error!("PANIC: {}", panic_info);
    }));
}

/// Android NativeActivity entry point
#[unsafe(no_mangle)]
#[allow(improper_ctypes_definitions)]
pub extern "C" fn android_main(app: AndroidApp) {
    init_logging();
    info!("zenilib activity starting");

    if let Err(e) = run(app) {
        // Nothing can run without the native libraries or the asset manager.
        error!("Fatal error: {:#}", e);
        std::process::abort();
    }

    info!("zenilib activity finished");
}

fn run(app: AndroidApp) -> anyhow::Result<()> {
    // Runs once per activity instance, so a recreated activity always
    // forwards its own asset manager.
    BOOTSTRAP
        .on_create(|| app.asset_manager().ptr().as_ptr())
        .context("failed to provide asset manager")?;

    // SAFETY: the application declares `zeni_android_main` as `AppMainFn`.
    let app_main: AppMainFn = unsafe {
        bootstrap::resolve_symbol(&bootstrap::library_file(APPLICATION_LIBRARY), MAIN_SYMBOL)
    }
    .map_err(|reason| anyhow!("{} unavailable: {}", MAIN_SYMBOL, reason))?;

    info!("Handing activity to {}", MAIN_SYMBOL);
    // SAFETY: signature checked above; the application owns `app` from here.
    unsafe { app_main(app) };
    Ok(())
}
