//! The schema contract.
//!
//! Anything that can check raw input implements [`Schema`]. Anything that can
//! be shown in a generated document implements [`Describe`]. Every schema is
//! describable, which keeps validation and documentation tied to one value.
//!
//! Three implementations ship with this crate:
//!
//! - [`Shape`] parses into a cleaned [`serde_json::Value`]
//! - [`Typed<T>`] parses with a shape and then deserializes into `T`
//! - [`Passthrough`] stands for "no schema declared"

use std::any::type_name;
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::shape::Shape;
use crate::validation::ValidationError;

/// A schema that can be inspected without running it.
pub trait Describe: Send + Sync {
    /// Returns the documented shape, or `None` if nothing was declared.
    fn describe(&self) -> Option<Shape>;
}

/// A schema that turns raw input into a typed value.
///
/// `parse` must be deterministic and free of side effects.
///
/// # Example
///
/// ```
/// use serde::Deserialize;
/// use serde_json::json;
/// use veritas_core::{Schema, Shape};
///
/// #[derive(Debug, Deserialize, PartialEq)]
/// struct Search {
///     test: String,
/// }
///
/// let schema = Shape::object([("test", Shape::string())]).typed::<Search>();
/// let search = schema.parse(json!({"test": "hello"})).unwrap();
/// assert_eq!(search, Search { test: "hello".into() });
/// ```
pub trait Schema: Describe {
    /// The value produced by a successful parse.
    type Output: Send + 'static;

    /// Checks `raw` and converts it.
    fn parse(&self, raw: Value) -> Result<Self::Output, ValidationError>;
}

impl Describe for Shape {
    fn describe(&self) -> Option<Shape> {
        Some(self.clone())
    }
}

impl Schema for Shape {
    type Output = Value;

    fn parse(&self, raw: Value) -> Result<Value, ValidationError> {
        self.validate(raw)
    }
}

impl<S: Describe + ?Sized> Describe for Arc<S> {
    fn describe(&self) -> Option<Shape> {
        (**self).describe()
    }
}

impl<S: Schema + ?Sized> Schema for Arc<S> {
    type Output = S::Output;

    fn parse(&self, raw: Value) -> Result<S::Output, ValidationError> {
        (**self).parse(raw)
    }
}

/// A [`Shape`] bound to a Rust type.
///
/// Parsing validates against the shape first, so clients get field-level
/// issues, and then deserializes the cleaned value into `T`.
pub struct Typed<T> {
    shape: Shape,
    _output: PhantomData<fn() -> T>,
}

impl<T> Typed<T> {
    /// Binds `shape` to `T`.
    #[must_use]
    pub const fn new(shape: Shape) -> Self {
        Self {
            shape,
            _output: PhantomData,
        }
    }

    /// Returns the underlying shape.
    #[must_use]
    pub const fn shape(&self) -> &Shape {
        &self.shape
    }
}

impl<T> Clone for Typed<T> {
    fn clone(&self) -> Self {
        Self::new(self.shape.clone())
    }
}

impl<T> fmt::Debug for Typed<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Typed")
            .field("output", &type_name::<T>())
            .field("shape", &self.shape)
            .finish()
    }
}

impl<T> Describe for Typed<T> {
    fn describe(&self) -> Option<Shape> {
        Some(self.shape.clone())
    }
}

impl<T: DeserializeOwned + Send + 'static> Schema for Typed<T> {
    type Output = T;

    fn parse(&self, raw: Value) -> Result<T, ValidationError> {
        let value = self.shape.validate(raw)?;
        serde_json::from_value(value).map_err(|e| {
            ValidationError::single("", format!("cannot read as {}: {e}", type_name::<T>()))
        })
    }
}

/// The absence of a schema.
///
/// Parsing hands the raw value back untouched and nothing is documented.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Passthrough;

impl Describe for Passthrough {
    fn describe(&self) -> Option<Shape> {
        None
    }
}

impl Schema for Passthrough {
    type Output = Value;

    fn parse(&self, raw: Value) -> Result<Value, ValidationError> {
        Ok(raw)
    }
}

/// A shared, type-erased handle to a describable schema.
pub type SchemaRef = Arc<dyn Describe>;
