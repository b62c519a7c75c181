//! Library loader implementation
//!
//! One `LibraryLoader` exists per registered library. It owns the library's
//! exports object, its declared imports, its loader routine and its load
//! state. Loading is a depth-first walk over the import graph in which the
//! load state doubles as the visited mark: a library found `Loading` is on
//! the active walk, so reaching it again means the graph has a cycle.

use std::fmt;
use std::sync::Mutex;
use tracing::debug;

use crate::library::exports::Exports;
use crate::library::registry::LibraryRegistry;
use crate::library::traits::{LibraryError, LibraryMetadata, LoadState, LoaderRoutine};
use crate::utils::lock;

/// Loader record for a single registered library
pub struct LibraryLoader {
    /// Library name (unique identifier)
    name: String,
    /// Exports object, identity stable for the life of the registry
    exports: Exports,
    /// Imported library names, in declaration order
    imports: Vec<String>,
    /// Loader routine, taken when it runs
    routine: Mutex<Option<LoaderRoutine>>,
    /// Current load state
    state: Mutex<LoadState>,
}

impl LibraryLoader {
    pub(crate) fn new(
        name: String,
        default_exports: Option<Exports>,
        imports: Vec<String>,
        routine: LoaderRoutine,
    ) -> Self {
        Self {
            name,
            exports: default_exports.unwrap_or_default(),
            imports,
            routine: Mutex::new(Some(routine)),
            state: Mutex::new(LoadState::NotLoaded),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn imports(&self) -> &[String] {
        &self.imports
    }

    pub fn state(&self) -> LoadState {
        *lock::lock(&self.state, "library state")
    }

    /// Exports object without triggering a load
    ///
    /// The returned object has the same identity the library will have once
    /// loaded, but its members are only populated after `load` succeeds.
    pub fn stub(&self) -> Exports {
        self.exports.clone()
    }

    /// Load this library, loading its imports first
    ///
    /// A ready library returns its exports immediately. A library that is
    /// already loading is being re-entered, which fails with
    /// `CircularDependency`. Any failure leaves the library `Loading`, so later
    /// attempts fail the same way instead of retrying.
    pub fn load(&self, registry: &LibraryRegistry) -> Result<Exports, LibraryError> {
        {
            let mut state = lock::lock(&self.state, "library state");
            match *state {
                LoadState::Ready => return Ok(self.exports.clone()),
                LoadState::Loading => {
                    return Err(LibraryError::CircularDependency(self.name.clone()))
                }
                LoadState::NotLoaded => *state = LoadState::Loading,
            }
        }
        debug!("Loading library {} (imports: {:?})", self.name, self.imports);

        let imported = self.load_imports(registry)?;

        let routine = lock::lock(&self.routine, "loader routine")
            .take()
            .ok_or_else(|| {
                LibraryError::InitializationError(format!(
                    "loader routine for {} already consumed",
                    self.name
                ))
            })?;
        routine(&self.exports, &imported)?;

        *lock::lock(&self.state, "library state") = LoadState::Ready;
        registry.record_metadata(
            &self.exports,
            LibraryMetadata {
                name: self.name.clone(),
                imports: self.imports.clone(),
            },
        );

        debug!("Library {} ready", self.name);
        Ok(self.exports.clone())
    }

    /// Load every import in declaration order and collect their exports
    fn load_imports(&self, registry: &LibraryRegistry) -> Result<Vec<Exports>, LibraryError> {
        let mut results = Vec::with_capacity(self.imports.len());
        for name in &self.imports {
            let library = registry.get(name).ok_or_else(|| {
                debug!("Library {} imports unavailable library {}", self.name, name);
                LibraryError::LibraryNotFound(name.clone())
            })?;
            results.push(library.load(registry)?);
        }
        Ok(results)
    }
}

impl fmt::Debug for LibraryLoader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LibraryLoader")
            .field("name", &self.name)
            .field("imports", &self.imports)
            .field("state", &self.state())
            .finish()
    }
}
