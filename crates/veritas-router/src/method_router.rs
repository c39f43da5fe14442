//! Per-path method table.
//!
//! [`MethodRouter`] maps HTTP methods to route values for a single path.
//! Setting a method that is already present replaces its value.

use http::Method;

/// Maps HTTP methods to values for one route path.
///
/// # Example
///
/// ```rust
/// use veritas_router::MethodRouter;
/// use http::Method;
///
/// let router = MethodRouter::new()
///     .with(Method::GET, "listUsers")
///     .with(Method::POST, "createUser");
///
/// assert_eq!(router.get(&Method::GET), Some(&"listUsers"));
/// assert_eq!(router.get(&Method::DELETE), None);
/// ```
#[derive(Debug, Clone)]
pub struct MethodRouter<T> {
    entries: Vec<(Method, T)>,
}

impl<T> Default for MethodRouter<T> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
        }
    }
}

impl<T> MethodRouter<T> {
    /// Creates an empty method table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder form of [`set`](Self::set).
    #[must_use]
    pub fn with(mut self, method: Method, value: T) -> Self {
        self.set(method, value);
        self
    }

    /// Stores `value` for `method`, returning the value it replaced.
    pub fn set(&mut self, method: Method, value: T) -> Option<T> {
        match self.entries.iter_mut().find(|(m, _)| *m == method) {
            Some((_, slot)) => Some(std::mem::replace(slot, value)),
            None => {
                self.entries.push((method, value));
                None
            }
        }
    }

    /// Returns the value registered for `method`.
    #[must_use]
    pub fn get(&self, method: &Method) -> Option<&T> {
        self.entries
            .iter()
            .find(|(m, _)| m == method)
            .map(|(_, value)| value)
    }

    /// Removes and returns the value registered for `method`.
    pub fn remove(&mut self, method: &Method) -> Option<T> {
        let index = self.entries.iter().position(|(m, _)| m == method)?;
        Some(self.entries.remove(index).1)
    }

    /// Merges another table into this one. Entries from `other` win.
    pub fn merge(&mut self, other: MethodRouter<T>) {
        for (method, value) in other.entries {
            self.set(method, value);
        }
    }

    /// Returns the registered methods in registration order.
    #[must_use]
    pub fn allowed_methods(&self) -> Vec<Method> {
        self.entries.iter().map(|(m, _)| m.clone()).collect()
    }

    /// Iterates over `(method, value)` pairs.
    pub fn iter(&self) -> impl Iterator<Item = (&Method, &T)> {
        self.entries.iter().map(|(m, v)| (m, v))
    }

    /// Returns the number of registered methods.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if no methods are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
