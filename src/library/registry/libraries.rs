//! Library registry
//!
//! Append-only, insertion-ordered map from library name to its loader.

use indexmap::map::Entry;
use indexmap::IndexMap;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use tracing::{debug, warn};

use crate::library::exports::{Exports, ExportsId};
use crate::library::loader::LibraryLoader;
use crate::library::traits::{LibraryError, LibraryMetadata};
use crate::utils::lock;

/// Registry of every known library
#[derive(Debug, Default)]
pub struct LibraryRegistry {
    /// Loaders by name, in registration order
    libraries: RwLock<IndexMap<String, Arc<LibraryLoader>>>,
    /// Name and imports of every ready library, keyed by exports identity
    metadata: RwLock<HashMap<ExportsId, LibraryMetadata>>,
}

impl LibraryRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a library
    ///
    /// Registering a name twice keeps the first registration: a warning is
    /// logged, the existing loader is returned and the new routine is dropped
    /// without running.
    pub fn register<N, I, S, F>(
        &self,
        name: N,
        default_exports: Option<Exports>,
        imports: I,
        routine: F,
    ) -> Arc<LibraryLoader>
    where
        N: Into<String>,
        I: IntoIterator<Item = S>,
        S: Into<String>,
        F: FnOnce(&Exports, &[Exports]) -> Result<(), LibraryError> + Send + Sync + 'static,
    {
        let name = name.into();
        let mut libraries = lock::write(&self.libraries, "library registry");
        match libraries.entry(name) {
            Entry::Occupied(entry) => {
                warn!("Already loaded {}", entry.key());
                Arc::clone(entry.get())
            }
            Entry::Vacant(entry) => {
                let imports: Vec<String> = imports.into_iter().map(Into::into).collect();
                debug!("Registering library {} (imports: {:?})", entry.key(), imports);
                let loader = Arc::new(LibraryLoader::new(
                    entry.key().clone(),
                    default_exports,
                    imports,
                    Box::new(routine),
                ));
                Arc::clone(entry.insert(loader))
            }
        }
    }

    /// Look up a library by name
    ///
    /// The registry lock is released before the loader is returned, so the
    /// caller may load it (and register further libraries) freely.
    pub fn get(&self, name: &str) -> Option<Arc<LibraryLoader>> {
        lock::read(&self.libraries, "library registry")
            .get(name)
            .cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        lock::read(&self.libraries, "library registry").contains_key(name)
    }

    /// All registered names, in registration order
    pub fn names(&self) -> Vec<String> {
        lock::read(&self.libraries, "library registry")
            .keys()
            .cloned()
            .collect()
    }

    /// Snapshot of all loaders, in registration order
    pub fn loaders(&self) -> Vec<Arc<LibraryLoader>> {
        lock::read(&self.libraries, "library registry")
            .values()
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        lock::read(&self.libraries, "library registry").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Load a library by name
    pub fn load(&self, name: &str) -> Result<Exports, LibraryError> {
        let loader = self
            .get(name)
            .ok_or_else(|| LibraryError::LibraryNotFound(name.to_string()))?;
        loader.load(self)
    }

    /// Load every registered library and return their exports
    ///
    /// Eagerly resolves the whole registry, in registration order. Stops at
    /// the first failure.
    pub fn load_all(&self) -> Result<Vec<Exports>, LibraryError> {
        self.loaders()
            .iter()
            .map(|loader| loader.load(self))
            .collect()
    }

    /// Name and imports of the library owning `exports`, once it is ready
    pub fn metadata_of(&self, exports: &Exports) -> Option<LibraryMetadata> {
        lock::read(&self.metadata, "library metadata")
            .get(&exports.id())
            .cloned()
    }

    pub(crate) fn record_metadata(&self, exports: &Exports, metadata: LibraryMetadata) {
        lock::write(&self.metadata, "library metadata").insert(exports.id(), metadata);
    }
}
