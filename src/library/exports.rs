//! Library exports objects
//!
//! An `Exports` is a shared handle to a mutable member table. Cloning the
//! handle never copies the table: every clone observes the same members, and
//! identity is pointer identity of the shared table.

use indexmap::IndexMap;
use std::fmt;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::library::traits::LibraryError;
use crate::utils::lock;

/// Callable exported by a library
pub type ExportFn = Arc<dyn Fn(&[ExportValue]) -> Result<ExportValue, LibraryError> + Send + Sync>;

/// A single exported member
#[derive(Clone)]
pub enum ExportValue {
    /// Plain data
    Data(serde_json::Value),
    /// Nested namespace, or another library's exports
    Object(Exports),
    /// Callable member
    Function(ExportFn),
}

impl ExportValue {
    /// Wrap a closure as a callable member
    pub fn function<F>(f: F) -> Self
    where
        F: Fn(&[ExportValue]) -> Result<ExportValue, LibraryError> + Send + Sync + 'static,
    {
        ExportValue::Function(Arc::new(f))
    }

    pub fn as_data(&self) -> Option<&serde_json::Value> {
        match self {
            ExportValue::Data(value) => Some(value),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&Exports> {
        match self {
            ExportValue::Object(exports) => Some(exports),
            _ => None,
        }
    }

    pub fn as_function(&self) -> Option<&ExportFn> {
        match self {
            ExportValue::Function(f) => Some(f),
            _ => None,
        }
    }
}

impl fmt::Debug for ExportValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExportValue::Data(value) => f.debug_tuple("Data").field(value).finish(),
            ExportValue::Object(exports) => f.debug_tuple("Object").field(exports).finish(),
            ExportValue::Function(_) => f.write_str("Function(..)"),
        }
    }
}

impl From<serde_json::Value> for ExportValue {
    fn from(value: serde_json::Value) -> Self {
        ExportValue::Data(value)
    }
}

impl From<Exports> for ExportValue {
    fn from(exports: Exports) -> Self {
        ExportValue::Object(exports)
    }
}

/// Stable identity of an exports object
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ExportsId(usize);

/// Shared, mutable exports object
#[derive(Clone, Default)]
pub struct Exports {
    members: Arc<RwLock<IndexMap<String, ExportValue>>>,
}

impl Exports {
    /// Create an empty exports object
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an exports object seeded with members
    pub fn with_members<I, K>(members: I) -> Self
    where
        I: IntoIterator<Item = (K, ExportValue)>,
        K: Into<String>,
    {
        let members = members.into_iter().map(|(k, v)| (k.into(), v)).collect();
        Self {
            members: Arc::new(RwLock::new(members)),
        }
    }

    /// Create an exports object from a JSON object's fields
    pub fn from_json(value: serde_json::Value) -> Result<Self, LibraryError> {
        match value {
            serde_json::Value::Object(map) => Ok(Self::with_members(
                map.into_iter().map(|(k, v)| (k, ExportValue::Data(v))),
            )),
            other => Err(LibraryError::SerializationError(format!(
                "exports must be a JSON object, got {}",
                other
            ))),
        }
    }

    /// Identity of this exports object, shared by all clones
    pub fn id(&self) -> ExportsId {
        ExportsId(Arc::as_ptr(&self.members) as *const () as usize)
    }

    /// Whether two handles refer to the same exports object
    pub fn ptr_eq(&self, other: &Exports) -> bool {
        Arc::ptr_eq(&self.members, &other.members)
    }

    fn read(&self) -> RwLockReadGuard<'_, IndexMap<String, ExportValue>> {
        lock::read(&self.members, "exports")
    }

    fn write(&self) -> RwLockWriteGuard<'_, IndexMap<String, ExportValue>> {
        lock::write(&self.members, "exports")
    }

    /// Read a member
    pub fn get(&self, key: &str) -> Option<ExportValue> {
        self.read().get(key).cloned()
    }

    /// Set a member, returning the previous value
    pub fn set(&self, key: impl Into<String>, value: impl Into<ExportValue>) -> Option<ExportValue> {
        self.write().insert(key.into(), value.into())
    }

    /// Remove a member, returning it
    pub fn remove(&self, key: &str) -> Option<ExportValue> {
        self.write().shift_remove(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.read().contains_key(key)
    }

    /// Member names in insertion order
    pub fn keys(&self) -> Vec<String> {
        self.read().keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    /// Read a data member
    pub fn get_data(&self, key: &str) -> Option<serde_json::Value> {
        self.read().get(key).and_then(|v| v.as_data().cloned())
    }

    /// Read a nested object member
    pub fn get_object(&self, key: &str) -> Option<Exports> {
        self.read().get(key).and_then(|v| v.as_object().cloned())
    }

    /// Read a callable member
    pub fn get_function(&self, key: &str) -> Option<ExportFn> {
        self.read().get(key).and_then(|v| v.as_function().cloned())
    }

    /// Call a callable member
    ///
    /// The member lock is released before the call so the callee may freely
    /// read and mutate this object.
    pub fn call(&self, key: &str, args: &[ExportValue]) -> Result<ExportValue, LibraryError> {
        let f = self.get_function(key).ok_or_else(|| {
            LibraryError::OperationError(format!("member {} is not callable", key))
        })?;
        f(args)
    }
}

impl PartialEq for Exports {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

impl Eq for Exports {}

impl fmt::Debug for Exports {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Exports")
            .field("id", &self.id())
            .field("members", &self.keys())
            .finish()
    }
}
