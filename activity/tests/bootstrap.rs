use std::ptr;
use std::sync::{Arc, Mutex};

use zenilib_activity::{
    AssetManagerHandle, AssetSlot, Bootstrap, Error, LibraryLoader, LoadPlan, NativeLibrary,
    RawAssetManager,
};

fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Records every attempted library and fails on the one named `fail_on`.
#[derive(Clone, Default)]
struct RecordingLoader {
    attempts: Arc<Mutex<Vec<&'static str>>>,
    fail_on: Option<&'static str>,
}

impl RecordingLoader {
    fn failing_on(name: &'static str) -> Self {
        Self {
            fail_on: Some(name),
            ..Self::default()
        }
    }

    fn attempts(&self) -> Vec<&'static str> {
        self.attempts.lock().unwrap().clone()
    }
}

impl LibraryLoader for RecordingLoader {
    fn load(&mut self, library: &NativeLibrary) -> Result<(), String> {
        self.attempts.lock().unwrap().push(library.name);
        match self.fail_on {
            Some(name) if name == library.name => Err(format!("dlopen failed: lib{name}.so not found")),
            _ => Ok(()),
        }
    }
}

type Forwarded = Arc<Mutex<Vec<usize>>>;

fn recording_sink() -> (Forwarded, impl Fn(AssetManagerHandle)) {
    let forwarded = Forwarded::default();
    let sink = {
        let forwarded = forwarded.clone();
        move |handle: AssetManagerHandle| forwarded.lock().unwrap().push(handle.as_ptr() as usize)
    };
    (forwarded, sink)
}

fn fake_manager(storage: &'static mut u8) -> *mut RawAssetManager {
    storage as *mut u8 as *mut RawAssetManager
}

#[test]
fn test_create_forwards_non_null_handle() {
    init_logger();
    static SLOT: AssetSlot = AssetSlot::new();
    let loader = RecordingLoader::default();
    let (forwarded, sink) = recording_sink();
    let bootstrap = Bootstrap::with_slot(LoadPlan::enabled(true), loader.clone(), sink, &SLOT);

    let raw = fake_manager(Box::leak(Box::new(0u8)));
    let handle = bootstrap.on_create(|| raw).unwrap();

    assert_eq!(handle.as_ptr(), raw);
    assert_eq!(SLOT.load().unwrap(), handle);
    assert_eq!(*forwarded.lock().unwrap(), vec![raw as usize]);
    assert_eq!(loader.attempts(), LoadPlan::enabled(true).names());
}

#[test]
fn test_null_handle_is_never_forwarded() {
    init_logger();
    static SLOT: AssetSlot = AssetSlot::new();
    let (forwarded, sink) = recording_sink();
    let bootstrap = Bootstrap::with_slot(LoadPlan::enabled(false), RecordingLoader::default(), sink, &SLOT);

    let err = bootstrap.on_create(|| ptr::null_mut()).unwrap_err();

    assert!(matches!(err, Error::NullAssetManager));
    assert!(forwarded.lock().unwrap().is_empty());
    assert!(matches!(SLOT.load(), Err(Error::NoAssetManager)));
}

#[test]
fn test_load_failure_aborts_before_next_library_and_before_fetch() {
    init_logger();
    static SLOT: AssetSlot = AssetSlot::new();
    let loader = RecordingLoader::failing_on("zeni");
    let (forwarded, sink) = recording_sink();
    let bootstrap = Bootstrap::with_slot(LoadPlan::enabled(true), loader.clone(), sink, &SLOT);

    let mut fetched = false;
    let err = bootstrap
        .on_create(|| {
            fetched = true;
            ptr::null_mut()
        })
        .unwrap_err();

    match err {
        Error::Load(load) => {
            assert_eq!(load.library, "zeni");
            assert_eq!(load.position, 7);
        }
        other => panic!("unexpected error: {other}"),
    }
    assert!(!fetched);
    assert!(forwarded.lock().unwrap().is_empty());
    assert_eq!(
        loader.attempts(),
        vec!["gnustl_shared", "z", "png", "freetype2", "tinyxml", "3ds", "zeni"]
    );
}

#[test]
fn test_libraries_load_once() {
    init_logger();
    static SLOT: AssetSlot = AssetSlot::new();
    let loader = RecordingLoader::default();
    let (_, sink) = recording_sink();
    let bootstrap = Bootstrap::with_slot(LoadPlan::enabled(false), loader.clone(), sink, &SLOT);

    assert_eq!(bootstrap.ensure_loaded().unwrap().loaded, vec!["application"]);
    assert_eq!(bootstrap.ensure_loaded().unwrap().loaded, vec!["application"]);
    let raw = fake_manager(Box::leak(Box::new(0u8)));
    bootstrap.on_create(|| raw).unwrap();

    assert_eq!(loader.attempts(), vec!["application"]);
}

#[test]
fn test_load_failure_is_cached() {
    init_logger();
    static SLOT: AssetSlot = AssetSlot::new();
    let loader = RecordingLoader::failing_on("application");
    let (_, sink) = recording_sink();
    let bootstrap = Bootstrap::with_slot(LoadPlan::enabled(false), loader.clone(), sink, &SLOT);

    let first = bootstrap.ensure_loaded().unwrap_err();
    let second = bootstrap.ensure_loaded().unwrap_err();

    assert_eq!(first, second);
    assert_eq!(loader.attempts().len(), 1);
}

#[test]
fn test_recreate_refetches_and_reforwards() {
    init_logger();
    static SLOT: AssetSlot = AssetSlot::new();
    let (forwarded, sink) = recording_sink();
    let bootstrap = Bootstrap::with_slot(LoadPlan::enabled(false), RecordingLoader::default(), sink, &SLOT);

    let first = fake_manager(Box::leak(Box::new(0u8)));
    let second = fake_manager(Box::leak(Box::new(0u8)));
    let mut fetches = 0;
    bootstrap
        .on_create(|| {
            fetches += 1;
            first
        })
        .unwrap();
    bootstrap
        .on_create(|| {
            fetches += 1;
            second
        })
        .unwrap();

    assert_eq!(fetches, 2);
    assert_eq!(*forwarded.lock().unwrap(), vec![first as usize, second as usize]);
    assert_eq!(SLOT.load().unwrap().as_ptr(), second);
}

#[test]
fn test_missing_entry_point_is_reported() {
    init_logger();
    static SLOT: AssetSlot = AssetSlot::new();
    let sink = zenilib_activity::EntryPoint::new("zenidroid_missing_for_test", zenilib_activity::ENTRY_SYMBOL);
    let bootstrap = Bootstrap::with_slot(LoadPlan::enabled(false), RecordingLoader::default(), sink, &SLOT);

    let raw = fake_manager(Box::leak(Box::new(0u8)));
    let err = bootstrap.on_create(|| raw).unwrap_err();

    match err {
        Error::EntryPoint { symbol, library, .. } => {
            assert_eq!(symbol, "zeni_provide_asset_manager");
            assert_eq!(library, "libzenidroid_missing_for_test.so");
        }
        other => panic!("unexpected error: {other}"),
    }
    // Stored before forwarding so native code can still read it back.
    assert_eq!(SLOT.load().unwrap().as_ptr(), raw);
}

// `time(time_t *)` writes through its only argument, so it stands in for the
// engine's `zeni_provide_asset_manager` and shows which pointer it was given.
#[cfg(all(target_os = "linux", target_env = "gnu"))]
#[test]
fn test_entry_point_resolves_once_and_receives_handle() {
    use zenilib_activity::{AssetSink, EntryPoint};

    init_logger();
    let sink = EntryPoint::from_path("libc.so.6", "time");
    assert!(!sink.is_resolved());

    let seconds: &'static mut i64 = Box::leak(Box::new(0));
    let slot = seconds as *mut i64;
    let handle = AssetManagerHandle::from_raw(slot as *mut RawAssetManager).unwrap();

    sink.provide(handle).unwrap();
    assert!(sink.is_resolved());
    // SAFETY: `slot` is a live leaked allocation.
    assert!(unsafe { *slot } > 0);

    unsafe { *slot = 0 };
    sink.provide(handle).unwrap();
    assert!(unsafe { *slot } > 0);
}
