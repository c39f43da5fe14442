//! Injected capabilities.
//!
//! Long-lived values such as a storage client are registered once when the
//! application is assembled and handed to every request by reference. The
//! request path never inspects them; handlers look them up by type.
//!
//! ```
//! use std::sync::Arc;
//! use veritas_core::Capabilities;
//!
//! struct Database {
//!     url: String,
//! }
//!
//! let mut caps = Capabilities::new();
//! caps.insert(Arc::new(Database { url: "mysql://localhost/app".into() }));
//!
//! let db = caps.get::<Database>().unwrap();
//! assert_eq!(db.url, "mysql://localhost/app");
//! ```

use std::any::{type_name, Any, TypeId};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::error::ApiError;

/// A set of shared values keyed by their type.
#[derive(Default, Clone)]
pub struct Capabilities {
    values: HashMap<TypeId, (&'static str, Arc<dyn Any + Send + Sync>)>,
}

impl Capabilities {
    /// Creates an empty set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a value, replacing any previous value of the same type.
    pub fn insert<T: Send + Sync + 'static>(&mut self, value: Arc<T>) {
        let value: Arc<dyn Any + Send + Sync> = value;
        self.values
            .insert(TypeId::of::<T>(), (type_name::<T>(), value));
    }

    /// Looks a value up by type.
    #[must_use]
    pub fn get<T: Send + Sync + 'static>(&self) -> Option<Arc<T>> {
        self.values
            .get(&TypeId::of::<T>())
            .and_then(|(_, value)| Arc::clone(value).downcast::<T>().ok())
    }

    /// Looks a value up by type, failing with [`ApiError::MissingCapability`].
    pub fn require<T: Send + Sync + 'static>(&self) -> Result<Arc<T>, ApiError> {
        self.get().ok_or(ApiError::MissingCapability {
            type_name: type_name::<T>(),
        })
    }

    /// Returns `true` if a value of type `T` is present.
    #[must_use]
    pub fn contains<T: Send + Sync + 'static>(&self) -> bool {
        self.values.contains_key(&TypeId::of::<T>())
    }

    /// Returns the number of values.
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Returns `true` if the set is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl fmt::Debug for Capabilities {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<_> = self.values.values().map(|(name, _)| *name).collect();
        names.sort_unstable();
        f.debug_struct("Capabilities").field("types", &names).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, PartialEq)]
    struct Storage(&'static str);

    struct Cache;

    #[test]
    fn test_insert_and_get() {
        let mut caps = Capabilities::new();
        assert!(caps.is_empty());
        caps.insert(Arc::new(Storage("primary")));

        assert!(caps.contains::<Storage>());
        assert!(!caps.contains::<Cache>());
        assert_eq!(*caps.get::<Storage>().unwrap(), Storage("primary"));
        assert!(caps.get::<Cache>().is_none());
    }

    #[test]
    fn test_insert_replaces() {
        let mut caps = Capabilities::new();
        caps.insert(Arc::new(Storage("a")));
        caps.insert(Arc::new(Storage("b")));
        assert_eq!(caps.len(), 1);
        assert_eq!(caps.get::<Storage>().unwrap().0, "b");
    }

    #[test]
    fn test_require_missing() {
        let caps = Capabilities::new();
        let err = caps.require::<Storage>().unwrap_err();
        assert!(matches!(err, ApiError::MissingCapability { type_name } if type_name.ends_with("Storage")));
    }

    #[test]
    fn test_shared_identity() {
        let storage = Arc::new(Storage("shared"));
        let mut caps = Capabilities::new();
        caps.insert(Arc::clone(&storage));
        assert!(Arc::ptr_eq(&storage, &caps.get::<Storage>().unwrap()));
    }

    #[test]
    fn test_debug_lists_types() {
        let mut caps = Capabilities::new();
        caps.insert(Arc::new(Cache));
        assert!(format!("{caps:?}").contains("Cache"));
    }
}
