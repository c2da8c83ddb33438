//! Native library load plan
//!
//! The zenilib engine ships as a chain of shared libraries in which later
//! libraries resolve symbols from earlier ones, so the order below is a
//! dependency order and must be preserved when loading.

use libloading::Library;
use log::{debug, info};
use serde::Serialize;

use crate::error::LoadError;

/// Where a library sits in the dependency chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    /// C++ runtime shared by everything above it.
    Runtime,
    /// Codecs, compression, XML, fonts, model formats.
    Support,
    /// The zenilib engine modules.
    Engine,
    /// The application's own native entry-point library.
    Application,
}

/// Whether a library is part of the load plan for a given build.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Availability {
    /// Loaded in every build.
    Always,
    /// Loaded only when the engine chain is enabled.
    Engine,
    /// Listed for completeness, never loaded.
    Disabled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct NativeLibrary {
    pub name: &'static str,
    pub stage: Stage,
    pub availability: Availability,
}

impl NativeLibrary {
    const fn new(name: &'static str, stage: Stage, availability: Availability) -> Self {
        Self { name, stage, availability }
    }

    /// File name inside the APK's `lib/<abi>/` directory.
    pub fn file_name(&self) -> String {
        crate::bootstrap::library_file(self.name)
    }

    pub fn is_enabled(&self, engine: bool) -> bool {
        match self.availability {
            Availability::Always => true,
            Availability::Engine => engine,
            Availability::Disabled => false,
        }
    }
}

/// Name of the application's native library, always loaded last.
pub const APPLICATION_LIBRARY: &str = "application";

/// Every library the shim knows about, in dependency order.
pub const LIBRARIES: &[NativeLibrary] = &[
    NativeLibrary::new("gnustl_shared", Stage::Runtime, Availability::Engine),
    NativeLibrary::new("z", Stage::Support, Availability::Engine),
    NativeLibrary::new("png", Stage::Support, Availability::Engine),
    NativeLibrary::new("freetype2", Stage::Support, Availability::Engine),
    NativeLibrary::new("tinyxml", Stage::Support, Availability::Engine),
    NativeLibrary::new("3ds", Stage::Support, Availability::Engine),
    NativeLibrary::new("zeni", Stage::Engine, Availability::Engine),
    NativeLibrary::new("zeni_audio", Stage::Engine, Availability::Engine),
    NativeLibrary::new("zeni_core", Stage::Engine, Availability::Engine),
    NativeLibrary::new("zeni_graphics", Stage::Engine, Availability::Engine),
    NativeLibrary::new("zeni_net", Stage::Engine, Availability::Disabled),
    NativeLibrary::new("zeni_rest", Stage::Engine, Availability::Engine),
    NativeLibrary::new(APPLICATION_LIBRARY, Stage::Application, Availability::Always),
];

/// Ordered list of libraries to load.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadPlan {
    libraries: Vec<NativeLibrary>,
}

impl Default for LoadPlan {
    /// The plan selected by the `engine-libs` feature.
    fn default() -> Self {
        Self::enabled(cfg!(feature = "engine-libs"))
    }
}

impl LoadPlan {
    /// Enabled libraries from [`LIBRARIES`], keeping their order.
    pub fn enabled(engine: bool) -> Self {
        Self::from_libraries(LIBRARIES.iter().copied().filter(|lib| lib.is_enabled(engine)))
    }

    pub fn from_libraries(libraries: impl IntoIterator<Item = NativeLibrary>) -> Self {
        Self {
            libraries: libraries.into_iter().collect(),
        }
    }

    pub fn libraries(&self) -> &[NativeLibrary] {
        &self.libraries
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.libraries.iter().map(|lib| lib.name).collect()
    }

    pub fn len(&self) -> usize {
        self.libraries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.libraries.is_empty()
    }
}

/// Libraries that were loaded, in load order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadReport {
    pub loaded: Vec<&'static str>,
}

/// Something that can make a named native library resident in the process.
pub trait LibraryLoader {
    /// Load `library`. The error string ends up in [`LoadError::reason`].
    fn load(&mut self, library: &NativeLibrary) -> Result<(), String>;
}

impl<F> LibraryLoader for F
where
    F: FnMut(&NativeLibrary) -> Result<(), String>,
{
    fn load(&mut self, library: &NativeLibrary) -> Result<(), String> {
        self(library)
    }
}

/// Load every library in `plan` in order, stopping at the first failure.
pub fn load_plan<L: LibraryLoader + ?Sized>(
    plan: &LoadPlan,
    loader: &mut L,
) -> Result<LoadReport, LoadError> {
    let total = plan.len();
    let mut report = LoadReport::default();

    for (index, library) in plan.libraries().iter().enumerate() {
        debug!("Loading native library {} ({}/{})", library.name, index + 1, total);
        loader.load(library).map_err(|reason| LoadError {
            library: library.name,
            position: index + 1,
            total,
            reason,
        })?;
        report.loaded.push(library.name);
    }

    info!("Loaded {} native libraries: {}", total, report.loaded.join(", "));
    Ok(report)
}

/// Loads libraries with `dlopen` and keeps them resident for the life of the
/// process.
#[derive(Default)]
pub struct DlopenLoader {
    libraries: Vec<(&'static str, Library)>,
}

impl DlopenLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn loaded(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.libraries.iter().map(|(name, _)| *name)
    }
}

impl LibraryLoader for DlopenLoader {
    fn load(&mut self, library: &NativeLibrary) -> Result<(), String> {
        // SAFETY: the plan only names zenilib libraries shipped in the APK;
        // their initialisers have no preconditions beyond load order.
        let handle = unsafe { Library::new(library.file_name()) }.map_err(|e| e.to_string())?;
        self.libraries.push((library.name, handle));
        Ok(())
    }
}

impl Drop for DlopenLoader {
    fn drop(&mut self) {
        // Loading is irreversible for the process lifetime.
        for (_, library) in self.libraries.drain(..) {
            std::mem::forget(library);
        }
    }
}
