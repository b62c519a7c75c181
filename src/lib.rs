//! Library Loader - minimal runtime module loader
//!
//! Registers named libraries together with the names of their dependencies
//! and a loader routine, then resolves them lazily on first import:
//! dependencies are loaded depth-first in declaration order, circular
//! dependencies are detected, and every library is loaded at most once.
//!
//! ## Example
//!
//! ```rust
//! use library_loader::{LibraryManager, Exports};
//! use serde_json::json;
//!
//! let manager = LibraryManager::new();
//! manager.library("core", None, Vec::<String>::new(), |exports: &Exports, _: &[Exports]| {
//!     exports.set("value", json!(1));
//!     Ok(())
//! });
//! manager.library("app", None, ["core"], |exports: &Exports, imports: &[Exports]| {
//!     let core = imports[0].get_data("value").and_then(|v| v.as_i64()).unwrap_or(0);
//!     exports.set("value", json!(core + 1));
//!     Ok(())
//! });
//!
//! let app = manager.import("app").unwrap();
//! assert_eq!(app.get_data("value"), Some(json!(2)));
//! ```

pub mod config;
pub mod library;
pub mod utils;

pub use config::{LoaderConfig, LoggingConfig};
pub use library::{
    defer, Deferred, DependencyResolution, ExportFn, ExportValue, Exports, LibraryError,
    LibraryLoader, LibraryManager, LibraryMetadata, LibraryRegistry, LoadState, RootContext,
};
