//! Deferred library access
//!
//! A `Deferred` lets an importer hold a reference to a library namespace
//! without loading it. The carrier object keeps the namespace under a
//! property; the first `resolve` runs the patch function, which is expected
//! to force the load and leave the resolved namespace under that property.

use std::fmt;
use std::sync::{Arc, OnceLock};
use tracing::debug;

use crate::library::exports::{ExportValue, Exports};
use crate::library::traits::LibraryError;

/// Patch function run on first access
///
/// Receives the carrier and the current value stored under the deferred
/// property.
pub type PatchFn =
    Arc<dyn Fn(&Exports, Option<&ExportValue>) -> Result<(), LibraryError> + Send + Sync>;

/// Lazy handle to a namespace stored on a carrier object
#[derive(Clone)]
pub struct Deferred {
    carrier: Exports,
    property: String,
    patch: PatchFn,
    resolved: Arc<OnceLock<Exports>>,
}

/// Create a lazy handle to `carrier[property]`
///
/// Nothing runs until the handle is first resolved.
pub fn defer<F>(carrier: &Exports, property: impl Into<String>, patch: F) -> Deferred
where
    F: Fn(&Exports, Option<&ExportValue>) -> Result<(), LibraryError> + Send + Sync + 'static,
{
    Deferred {
        carrier: carrier.clone(),
        property: property.into(),
        patch: Arc::new(patch),
        resolved: Arc::new(OnceLock::new()),
    }
}

impl Deferred {
    pub fn property(&self) -> &str {
        &self.property
    }

    pub fn carrier(&self) -> &Exports {
        &self.carrier
    }

    /// Whether the handle has been resolved
    pub fn is_resolved(&self) -> bool {
        self.resolved.get().is_some()
    }

    /// Run the patch (first time only) and return the resolved namespace
    ///
    /// A failed patch is not cached; the next call runs it again.
    pub fn resolve(&self) -> Result<Exports, LibraryError> {
        if let Some(exports) = self.resolved.get() {
            return Ok(exports.clone());
        }

        let current = self.carrier.get(&self.property);
        debug!("Resolving deferred property {}", self.property);
        (self.patch)(&self.carrier, current.as_ref())?;

        let exports = self.carrier.get_object(&self.property).ok_or_else(|| {
            LibraryError::OperationError(format!(
                "deferred property {} did not resolve to an object",
                self.property
            ))
        })?;
        Ok(self.resolved.get_or_init(|| exports).clone())
    }

    /// Resolve, then read a member of the resolved namespace
    pub fn get(&self, member: &str) -> Result<Option<ExportValue>, LibraryError> {
        Ok(self.resolve()?.get(member))
    }
}

impl fmt::Debug for Deferred {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Deferred")
            .field("property", &self.property)
            .field("resolved", &self.is_resolved())
            .finish()
    }
}
