//! Library system traits and interfaces
//!
//! Defines the core types shared by the registry, the per-library loader
//! state machine and the entry orchestrator.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::library::exports::{ExportFn, Exports};

/// Library load state
///
/// Transitions only forward: `NotLoaded -> Loading -> Ready`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum LoadState {
    /// Registered, loader routine not yet invoked
    NotLoaded,
    /// Imports are being resolved or the loader routine is running
    Loading,
    /// Loader routine completed, exports are final
    Ready,
}

impl std::fmt::Display for LoadState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LoadState::NotLoaded => write!(f, "not-loaded"),
            LoadState::Loading => write!(f, "loading"),
            LoadState::Ready => write!(f, "ready"),
        }
    }
}

/// Introspection metadata recorded for a library once it is ready
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LibraryMetadata {
    /// Library name (unique identifier)
    pub name: String,
    /// Declared imports, in declaration order
    pub imports: Vec<String>,
}

/// Loader routine supplied at registration time
///
/// Receives the library's own exports object followed by the resolved
/// exports of every import, in declaration order. It populates the exports
/// object in place and runs at most once.
pub type LoaderRoutine =
    Box<dyn FnOnce(&Exports, &[Exports]) -> Result<(), LibraryError> + Send + Sync>;

/// Root execution context
///
/// `start` hands the first entry point of the process to the root context;
/// every later entry point is invoked directly.
pub trait RootContext: Send + Sync {
    /// Initialize the root context and run `main` inside it
    fn start_root(&self, main: &ExportFn) -> Result<(), LibraryError>;
}

/// Root context that runs `main` with no arguments and no extra setup
#[derive(Debug, Default, Clone, Copy)]
pub struct DirectRootContext;

impl RootContext for DirectRootContext {
    fn start_root(&self, main: &ExportFn) -> Result<(), LibraryError> {
        main(&[]).map(|_| ())
    }
}

/// Library system errors
#[derive(Debug, Error)]
pub enum LibraryError {
    #[error("Library not found: {0}")]
    LibraryNotFound(String),

    #[error("Circular dependence on library: {0}")]
    CircularDependency(String),

    #[error("Library {library} in module {module} has no entry point")]
    EntryPointNotFound { module: String, library: String },

    #[error("Library initialization failed: {0}")]
    InitializationError(String),

    #[error("Invalid loader configuration: {0}")]
    InvalidConfig(String),

    #[error("Library operation failed: {0}")]
    OperationError(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),
}

impl From<serde_json::Error> for LibraryError {
    fn from(e: serde_json::Error) -> Self {
        LibraryError::SerializationError(e.to_string())
    }
}

impl From<toml::de::Error> for LibraryError {
    fn from(e: toml::de::Error) -> Self {
        LibraryError::InvalidConfig(e.to_string())
    }
}

impl From<anyhow::Error> for LibraryError {
    fn from(e: anyhow::Error) -> Self {
        LibraryError::OperationError(e.to_string())
    }
}
