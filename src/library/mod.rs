//! Library system
//!
//! Wires named libraries together at runtime. Each library declares the
//! names of the libraries it imports and a loader routine that populates its
//! exports object from the exports of those imports.
//!
//! ## Architecture
//!
//! - **Registry**: append-only map from name to loader; first registration wins
//! - **Loader**: per-library `NotLoaded -> Loading -> Ready` state machine;
//!   re-entering a `Loading` library is a circular dependency
//! - **Memoization**: a ready library returns the same exports object forever
//! - **Deferral**: lazy handles postpone a load until first use
//! - **Manager**: one-time bootstrap, `import` and `start`

pub mod deferred;
pub mod exports;
pub mod loader;
pub mod manager;
pub mod registry;
pub mod traits;

pub use deferred::{defer, Deferred, PatchFn};
pub use exports::{ExportFn, ExportValue, Exports, ExportsId};
pub use loader::LibraryLoader;
pub use manager::{BootstrapHook, LibraryManager};
pub use registry::{DependencyResolution, LibraryDependencies, LibraryRegistry};
pub use traits::{
    DirectRootContext, LibraryError, LibraryMetadata, LoadState, LoaderRoutine, RootContext,
};
