//! Library loading
//!
//! Per-library load state machine and recursive import resolution.

pub mod loader;

pub use loader::LibraryLoader;
