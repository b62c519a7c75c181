//! Library registry and dependency analysis
//!
//! Holds every registered library and checks the import graph.

pub mod dependencies;
pub mod libraries;

pub use dependencies::{DependencyResolution, LibraryDependencies};
pub use libraries::LibraryRegistry;
