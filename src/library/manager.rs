//! Library manager
//!
//! Process-scoped entry point of the loader. Owns the registry, runs the
//! one-time bootstrap before the first import and hands the first started
//! entry point to the root context.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tracing::{debug, info, warn};

use crate::config::LoaderConfig;
use crate::library::deferred::{defer, Deferred};
use crate::library::exports::{ExportValue, Exports};
use crate::library::loader::LibraryLoader;
use crate::library::registry::{DependencyResolution, LibraryDependencies, LibraryRegistry};
use crate::library::traits::{
    DirectRootContext, LibraryError, LibraryMetadata, LoadState, RootContext,
};
use crate::utils::lock;

/// One-time environment hook, run during bootstrap with the core library's exports
pub type BootstrapHook = Box<dyn FnOnce(&Exports) -> Result<(), LibraryError> + Send + Sync>;

/// Bootstrap hooks and whether the bootstrap pass has finished running them
#[derive(Default)]
struct HookQueue {
    pending: Vec<BootstrapHook>,
    drained: bool,
}

/// Library manager coordinates registration, loading and program start
pub struct LibraryManager {
    /// Loader configuration
    config: LoaderConfig,
    /// All registered libraries
    registry: Arc<LibraryRegistry>,
    /// Set once bootstrap has been attempted
    bootstrapped: AtomicBool,
    /// Set once the root context has been started
    root_started: AtomicBool,
    /// Hooks waiting for the bootstrap pass
    bootstrap_hooks: Mutex<HookQueue>,
    /// Root execution context for the first entry point
    root_context: Box<dyn RootContext>,
}

impl LibraryManager {
    /// Create a new library manager with default configuration
    pub fn new() -> Self {
        Self::with_config(LoaderConfig::default())
    }

    /// Create a new library manager with the given configuration
    pub fn with_config(config: LoaderConfig) -> Self {
        Self {
            config,
            registry: Arc::new(LibraryRegistry::new()),
            bootstrapped: AtomicBool::new(false),
            root_started: AtomicBool::new(false),
            bootstrap_hooks: Mutex::new(HookQueue::default()),
            root_context: Box::new(DirectRootContext),
        }
    }

    /// Replace the root context used by the first `start`
    pub fn with_root_context<R: RootContext + 'static>(mut self, root_context: R) -> Self {
        self.root_context = Box::new(root_context);
        self
    }

    pub fn config(&self) -> &LoaderConfig {
        &self.config
    }

    pub fn registry(&self) -> &Arc<LibraryRegistry> {
        &self.registry
    }

    /// Register a library
    ///
    /// A name that is already registered keeps its first registration.
    pub fn library<N, I, S, F>(
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
        self.registry.register(name, default_exports, imports, routine)
    }

    /// Import a library, bootstrapping the process first if needed
    pub fn import(&self, name: &str) -> Result<Exports, LibraryError> {
        self.bootstrap()?;
        self.registry.load(name)
    }

    /// Run the one-time process bootstrap
    ///
    /// Loads the configured core library, then runs the registered bootstrap
    /// hooks in order, including hooks registered while the pass is running.
    /// Every hook runs even if an earlier one fails; the first error is
    /// returned. Only the first call does anything, even if it fails.
    pub fn bootstrap(&self) -> Result<(), LibraryError> {
        if self.bootstrapped.swap(true, Ordering::SeqCst) {
            return Ok(());
        }
        info!("Bootstrapping library loader");

        let core = match self.core_exports() {
            Ok(core) => core,
            Err(e) => {
                // Queued hooks have no core to run against
                let dropped = lock::with_lock(&self.bootstrap_hooks, "bootstrap hooks", |queue| {
                    queue.drained = true;
                    std::mem::take(&mut queue.pending).len()
                });
                if dropped > 0 {
                    warn!("Bootstrap failed, dropping {} bootstrap hooks", dropped);
                }
                return Err(e);
            }
        };

        let mut first_error = None;
        loop {
            let hooks = lock::with_lock(&self.bootstrap_hooks, "bootstrap hooks", |queue| {
                if queue.pending.is_empty() {
                    queue.drained = true;
                }
                std::mem::take(&mut queue.pending)
            });
            if hooks.is_empty() {
                break;
            }
            debug!("Running {} bootstrap hooks", hooks.len());
            for hook in hooks {
                if let Err(e) = hook(&core) {
                    warn!("Bootstrap hook failed: {}", e);
                    first_error.get_or_insert(e);
                }
            }
        }
        first_error.map_or(Ok(()), Err)
    }

    pub fn is_bootstrapped(&self) -> bool {
        self.bootstrapped.load(Ordering::SeqCst)
    }

    /// Register a one-time environment hook
    ///
    /// Until the bootstrap pass has finished running hooks, the hook is
    /// queued, so hooks registered by the core library's routine or by other
    /// hooks still run inside that pass. Afterwards it runs immediately.
    pub fn on_bootstrap<F>(&self, hook: F) -> Result<(), LibraryError>
    where
        F: FnOnce(&Exports) -> Result<(), LibraryError> + Send + Sync + 'static,
    {
        let mut hook = Some(hook);
        lock::with_lock(&self.bootstrap_hooks, "bootstrap hooks", |queue| {
            if !queue.drained {
                if let Some(hook) = hook.take() {
                    queue.pending.push(Box::new(hook));
                }
            }
        });
        match hook {
            Some(hook) => {
                let core = self.core_exports()?;
                hook(&core)
            }
            None => Ok(()),
        }
    }

    fn core_exports(&self) -> Result<Exports, LibraryError> {
        match &self.config.core_library {
            Some(core) => self.registry.load(core),
            None => Ok(Exports::new()),
        }
    }

    /// Load `module_name` and run the entry point of `library_name` in it
    ///
    /// `library_name` defaults to `module_name`. The library is looked up as a
    /// nested object of the module's exports and its configured entry point
    /// (normally `main`) is called. The first call in the process runs the
    /// entry point inside the root context; later calls invoke it directly.
    pub fn start(&self, module_name: &str, library_name: Option<&str>) -> Result<(), LibraryError> {
        let library_name = library_name.unwrap_or(module_name);
        let module = self.import(module_name)?;

        let not_found = || LibraryError::EntryPointNotFound {
            module: module_name.to_string(),
            library: library_name.to_string(),
        };
        let library = module.get_object(library_name).ok_or_else(not_found)?;
        let main = library
            .get_function(&self.config.entry_point)
            .ok_or_else(not_found)?;

        if !self.root_started.swap(true, Ordering::SeqCst) {
            info!("Starting root context with {}:{}", module_name, library_name);
            self.root_context.start_root(&main)
        } else {
            debug!("Root context running, calling {}:{} directly", module_name, library_name);
            main(&[]).map(|_| ())
        }
    }

    pub fn is_root_started(&self) -> bool {
        self.root_started.load(Ordering::SeqCst)
    }

    /// Defer loading `library` until the returned handle is resolved
    ///
    /// Stores the library's stub exports under `carrier[property]`. The
    /// handle's patch loads the library through the registry and stores the
    /// loaded exports back under `property`.
    pub fn defer_library(
        &self,
        carrier: &Exports,
        property: &str,
        library: &str,
    ) -> Result<Deferred, LibraryError> {
        let stub = self
            .registry
            .get(library)
            .ok_or_else(|| LibraryError::LibraryNotFound(library.to_string()))?
            .stub();
        carrier.set(property, stub);

        let registry = Arc::clone(&self.registry);
        let library = library.to_string();
        let property_name = property.to_string();
        Ok(defer(carrier, property, move |carrier, _current| {
            let exports = registry.load(&library)?;
            carrier.set(property_name.clone(), ExportValue::Object(exports));
            Ok(())
        }))
    }

    /// All registered library names, in registration order
    pub fn libraries(&self) -> Vec<String> {
        self.registry.names()
    }

    /// Exports of every registered library, loading all of them
    pub fn debugger_libraries(&self) -> Result<Vec<Exports>, LibraryError> {
        self.registry.load_all()
    }

    /// Current load state of a library
    pub fn state_of(&self, name: &str) -> Option<LoadState> {
        self.registry.get(name).map(|loader| loader.state())
    }

    /// Name and imports of the library owning `exports`, once it is ready
    pub fn metadata_of(&self, exports: &Exports) -> Option<LibraryMetadata> {
        self.registry.metadata_of(exports)
    }

    /// Check the registered import graph without loading anything
    pub fn dependency_plan(&self) -> Result<DependencyResolution, LibraryError> {
        LibraryDependencies::resolve(&self.registry)
    }
}

impl Default for LibraryManager {
    fn default() -> Self {
        Self::new()
    }
}
