//! Declarative value shapes.
//!
//! A [`Shape`] is both a validator and a description. The same value is used
//! by the request binder to check incoming data and by the document generator
//! to describe it, so the two can never disagree.
//!
//! ```
//! use serde_json::json;
//! use veritas_core::{Schema, Shape};
//!
//! let user = Shape::object([
//!     ("name", Shape::string().min_length(1)),
//!     ("age", Shape::integer().minimum(0.0).optional()),
//! ]);
//!
//! assert!(user.parse(json!({"name": "Ada"})).is_ok());
//!
//! let err = user.parse(json!({"age": -1})).unwrap_err();
//! assert!(err.mentions("name"));
//! assert!(err.mentions("age"));
//! ```

use std::fmt;

use indexmap::IndexMap;
use regex::Regex;
use serde_json::{Map, Number, Value};

use crate::schema::Typed;
use crate::validation::{Issue, ValidationError};

/// A compiled regular expression that compares by its source text.
#[derive(Clone)]
pub struct Pattern {
    source: String,
    regex: Regex,
}

impl Pattern {
    /// Compiles a pattern.
    pub fn new(source: &str) -> Result<Self, regex::Error> {
        Ok(Self {
            source: source.to_string(),
            regex: Regex::new(source)?,
        })
    }

    /// Returns the pattern source.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// Returns `true` if the pattern matches anywhere in `text`.
    #[must_use]
    pub fn is_match(&self, text: &str) -> bool {
        self.regex.is_match(text)
    }
}

impl PartialEq for Pattern {
    fn eq(&self, other: &Self) -> bool {
        self.source == other.source
    }
}

impl fmt::Debug for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Pattern").field(&self.source).finish()
    }
}

/// Constraints on string values.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StringRules {
    /// Minimum length in characters.
    pub min_length: Option<usize>,
    /// Maximum length in characters.
    pub max_length: Option<usize>,
    /// Regular expression the value must match.
    pub pattern: Option<Pattern>,
    /// Format hint for documentation (`email`, `uuid`, `date-time`).
    pub format: Option<String>,
}

/// Constraints on numeric values.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NumberRules {
    /// Inclusive lower bound.
    pub minimum: Option<f64>,
    /// Inclusive upper bound.
    pub maximum: Option<f64>,
}

/// The structural kind of a [`Shape`].
#[derive(Debug, Clone, PartialEq)]
pub enum ShapeKind {
    /// UTF-8 string.
    String(StringRules),
    /// Whole number.
    Integer(NumberRules),
    /// Any JSON number.
    Number(NumberRules),
    /// `true` or `false`.
    Boolean,
    /// Homogeneous list.
    Array {
        /// Shape of every element.
        items: Box<Shape>,
        /// Minimum number of elements.
        min_items: Option<usize>,
        /// Maximum number of elements.
        max_items: Option<usize>,
    },
    /// Object with named fields. Unknown keys are dropped during parsing.
    Object {
        /// Declared fields in declaration order.
        properties: IndexMap<String, Shape>,
    },
    /// Anything, passed through untouched.
    Any,
    /// Only `null`.
    Null,
}

impl ShapeKind {
    /// Returns the JSON type name used in messages and documents.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::String(_) => "string",
            Self::Integer(_) => "integer",
            Self::Number(_) => "number",
            Self::Boolean => "boolean",
            Self::Array { .. } => "array",
            Self::Object { .. } => "object",
            Self::Any => "any",
            Self::Null => "null",
        }
    }
}

/// Declarative description of an expected value.
///
/// Object fields are required unless marked [`optional`](Shape::optional).
/// Builder methods that do not apply to the shape's kind (for example
/// `min_length` on an integer) leave it unchanged.
#[derive(Debug, Clone, PartialEq)]
pub struct Shape {
    kind: ShapeKind,
    optional: bool,
    nullable: bool,
    coerce: bool,
    description: Option<String>,
    example: Option<Value>,
}

impl Shape {
    fn of(kind: ShapeKind) -> Self {
        Self {
            kind,
            optional: false,
            nullable: false,
            coerce: false,
            description: None,
            example: None,
        }
    }

    /// A string.
    #[must_use]
    pub fn string() -> Self {
        Self::of(ShapeKind::String(StringRules::default()))
    }

    /// A whole number.
    #[must_use]
    pub fn integer() -> Self {
        Self::of(ShapeKind::Integer(NumberRules::default()))
    }

    /// Any number.
    #[must_use]
    pub fn number() -> Self {
        Self::of(ShapeKind::Number(NumberRules::default()))
    }

    /// A boolean.
    #[must_use]
    pub fn boolean() -> Self {
        Self::of(ShapeKind::Boolean)
    }

    /// A list whose elements all match `items`.
    #[must_use]
    pub fn array(items: Shape) -> Self {
        Self::of(ShapeKind::Array {
            items: Box::new(items),
            min_items: None,
            max_items: None,
        })
    }

    /// An object with the given fields.
    #[must_use]
    pub fn object<I, K>(fields: I) -> Self
    where
        I: IntoIterator<Item = (K, Shape)>,
        K: Into<String>,
    {
        Self::of(ShapeKind::Object {
            properties: fields
                .into_iter()
                .map(|(name, shape)| (name.into(), shape))
                .collect(),
        })
    }

    /// Any value.
    #[must_use]
    pub fn any() -> Self {
        Self::of(ShapeKind::Any)
    }

    /// Only `null`.
    #[must_use]
    pub fn null() -> Self {
        Self::of(ShapeKind::Null)
    }

    /// Adds a field to an object shape, replacing one with the same name.
    #[must_use]
    pub fn field(mut self, name: impl Into<String>, shape: Shape) -> Self {
        if let ShapeKind::Object { properties } = &mut self.kind {
            properties.insert(name.into(), shape);
        }
        self
    }

    /// Allows the value to be absent.
    #[must_use]
    pub fn optional(mut self) -> Self {
        self.optional = true;
        self
    }

    /// Requires the value to be present. This is the default.
    #[must_use]
    pub fn required(mut self) -> Self {
        self.optional = false;
        self
    }

    /// Accepts `null` in addition to the declared kind.
    #[must_use]
    pub fn nullable(mut self) -> Self {
        self.nullable = true;
        self
    }

    /// Accepts string renderings of scalars (`"42"`, `"true"`) and single
    /// values where a list is expected.
    ///
    /// Path and query values always arrive as strings, so shapes declared
    /// for those sections usually want this.
    #[must_use]
    pub fn coerce(mut self) -> Self {
        self.coerce = true;
        self
    }

    /// Sets the human description shown in documents.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Sets an example value shown in documents.
    #[must_use]
    pub fn with_example(mut self, example: impl Into<Value>) -> Self {
        self.example = Some(example.into());
        self
    }

    /// Minimum string length, in characters.
    #[must_use]
    pub fn min_length(mut self, len: usize) -> Self {
        if let ShapeKind::String(rules) = &mut self.kind {
            rules.min_length = Some(len);
        }
        self
    }

    /// Maximum string length, in characters.
    #[must_use]
    pub fn max_length(mut self, len: usize) -> Self {
        if let ShapeKind::String(rules) = &mut self.kind {
            rules.max_length = Some(len);
        }
        self
    }

    /// Regular expression a string must match.
    pub fn pattern(mut self, pattern: &str) -> Result<Self, regex::Error> {
        if let ShapeKind::String(rules) = &mut self.kind {
            rules.pattern = Some(Pattern::new(pattern)?);
        }
        Ok(self)
    }

    /// Format hint for strings.
    #[must_use]
    pub fn format(mut self, format: impl Into<String>) -> Self {
        if let ShapeKind::String(rules) = &mut self.kind {
            rules.format = Some(format.into());
        }
        self
    }

    /// Inclusive lower bound for numbers.
    #[must_use]
    pub fn minimum(mut self, min: f64) -> Self {
        if let ShapeKind::Integer(rules) | ShapeKind::Number(rules) = &mut self.kind {
            rules.minimum = Some(min);
        }
        self
    }

    /// Inclusive upper bound for numbers.
    #[must_use]
    pub fn maximum(mut self, max: f64) -> Self {
        if let ShapeKind::Integer(rules) | ShapeKind::Number(rules) = &mut self.kind {
            rules.maximum = Some(max);
        }
        self
    }

    /// Minimum number of list elements.
    #[must_use]
    pub fn min_items(mut self, n: usize) -> Self {
        if let ShapeKind::Array { min_items, .. } = &mut self.kind {
            *min_items = Some(n);
        }
        self
    }

    /// Maximum number of list elements.
    #[must_use]
    pub fn max_items(mut self, n: usize) -> Self {
        if let ShapeKind::Array { max_items, .. } = &mut self.kind {
            *max_items = Some(n);
        }
        self
    }

    /// Pairs this shape with a Rust type for typed parsing.
    #[must_use]
    pub fn typed<T>(self) -> Typed<T> {
        Typed::new(self)
    }

    /// Returns the structural kind.
    #[must_use]
    pub const fn kind(&self) -> &ShapeKind {
        &self.kind
    }

    /// Returns `true` if the value may be absent.
    #[must_use]
    pub const fn is_optional(&self) -> bool {
        self.optional
    }

    /// Returns `true` if `null` is accepted.
    #[must_use]
    pub const fn is_nullable(&self) -> bool {
        self.nullable
    }

    /// Returns `true` if string renderings are coerced.
    #[must_use]
    pub const fn coerces(&self) -> bool {
        self.coerce
    }

    /// Returns the description.
    #[must_use]
    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    /// Returns the example value.
    #[must_use]
    pub fn example(&self) -> Option<&Value> {
        self.example.as_ref()
    }

    /// Returns the declared fields of an object shape.
    #[must_use]
    pub fn properties(&self) -> Option<&IndexMap<String, Shape>> {
        match &self.kind {
            ShapeKind::Object { properties } => Some(properties),
            _ => None,
        }
    }

    /// Checks `raw` and returns the cleaned value.
    ///
    /// Every violation is collected before failing.
    pub fn validate(&self, raw: Value) -> Result<Value, ValidationError> {
        if raw.is_null() && self.optional {
            return Ok(Value::Null);
        }
        let mut issues = Vec::new();
        let value = self.check(raw, "", &mut issues);
        if issues.is_empty() {
            Ok(value)
        } else {
            Err(ValidationError::new(issues))
        }
    }

    fn check(&self, value: Value, path: &str, issues: &mut Vec<Issue>) -> Value {
        if value.is_null() {
            if !(self.nullable || matches!(self.kind, ShapeKind::Null | ShapeKind::Any)) {
                issues.push(mismatch(path, &self.kind, &value));
            }
            return value;
        }

        match &self.kind {
            ShapeKind::Any => value,
            ShapeKind::Null => {
                issues.push(mismatch(path, &self.kind, &value));
                value
            }
            ShapeKind::String(rules) => match value {
                Value::String(s) => {
                    check_string(rules, &s, path, issues);
                    Value::String(s)
                }
                other => {
                    issues.push(mismatch(path, &self.kind, &other));
                    other
                }
            },
            ShapeKind::Boolean => match value {
                Value::Bool(_) => value,
                Value::String(s) if self.coerce => {
                    let parsed = match s.trim() {
                        "true" | "1" => Some(true),
                        "false" | "0" => Some(false),
                        _ => None,
                    };
                    parsed.map_or_else(
                        || {
                            let other = Value::String(s);
                            issues.push(mismatch(path, &self.kind, &other));
                            other
                        },
                        Value::Bool,
                    )
                }
                other => {
                    issues.push(mismatch(path, &self.kind, &other));
                    other
                }
            },
            ShapeKind::Integer(rules) => match self.read_integer(value) {
                Ok(n) => {
                    check_range(rules, n.as_f64().unwrap_or_default(), path, issues);
                    Value::Number(n)
                }
                Err(other) => {
                    issues.push(mismatch(path, &self.kind, &other));
                    other
                }
            },
            ShapeKind::Number(rules) => match self.read_number(value) {
                Ok(n) => {
                    check_range(rules, n.as_f64().unwrap_or_default(), path, issues);
                    Value::Number(n)
                }
                Err(other) => {
                    issues.push(mismatch(path, &self.kind, &other));
                    other
                }
            },
            ShapeKind::Array {
                items,
                min_items,
                max_items,
            } => {
                let elements = match value {
                    Value::Array(elements) => elements,
                    Value::Object(_) => {
                        issues.push(mismatch(path, &self.kind, &value));
                        return value;
                    }
                    scalar if self.coerce => vec![scalar],
                    other => {
                        issues.push(mismatch(path, &self.kind, &other));
                        return other;
                    }
                };
                if let Some(min) = min_items {
                    if elements.len() < *min {
                        issues.push(Issue::new(path, format!("must contain at least {min} items")));
                    }
                }
                if let Some(max) = max_items {
                    if elements.len() > *max {
                        issues.push(Issue::new(path, format!("must contain at most {max} items")));
                    }
                }
                Value::Array(
                    elements
                        .into_iter()
                        .enumerate()
                        .map(|(i, element)| items.check(element, &index_path(path, i), issues))
                        .collect(),
                )
            }
            ShapeKind::Object { properties } => match value {
                Value::Object(mut map) => {
                    let mut out = Map::with_capacity(properties.len());
                    for (name, field) in properties {
                        let field_path = child_path(path, name);
                        match map.remove(name) {
                            Some(v) => {
                                out.insert(name.clone(), field.check(v, &field_path, issues));
                            }
                            None if field.optional => {}
                            None => issues.push(Issue::new(field_path, "required field is missing")),
                        }
                    }
                    Value::Object(out)
                }
                other => {
                    issues.push(mismatch(path, &self.kind, &other));
                    other
                }
            },
        }
    }

    #[allow(clippy::cast_possible_truncation, clippy::float_cmp)]
    fn read_integer(&self, value: Value) -> Result<Number, Value> {
        match value {
            Value::Number(n) if n.is_i64() || n.is_u64() => Ok(n),
            Value::Number(n) => match n.as_f64() {
                Some(f) if f.fract() == 0.0 && f.abs() <= MAX_SAFE_INTEGER => {
                    Ok(Number::from(f as i64))
                }
                _ => Err(Value::Number(n)),
            },
            Value::String(s) if self.coerce => {
                let trimmed = s.trim();
                match trimmed.parse::<i64>() {
                    Ok(n) => Ok(Number::from(n)),
                    Err(_) => match trimmed.parse::<u64>() {
                        Ok(n) => Ok(Number::from(n)),
                        Err(_) => Err(Value::String(s)),
                    },
                }
            }
            other => Err(other),
        }
    }

    fn read_number(&self, value: Value) -> Result<Number, Value> {
        match value {
            Value::Number(n) => Ok(n),
            Value::String(s) if self.coerce => {
                match s.trim().parse::<f64>().ok().and_then(Number::from_f64) {
                    Some(n) => Ok(n),
                    None => Err(Value::String(s)),
                }
            }
            other => Err(other),
        }
    }
}

const MAX_SAFE_INTEGER: f64 = 9_007_199_254_740_991.0;

fn check_string(rules: &StringRules, s: &str, path: &str, issues: &mut Vec<Issue>) {
    let len = s.chars().count();
    if let Some(min) = rules.min_length {
        if len < min {
            issues.push(Issue::new(path, format!("must be at least {min} characters")));
        }
    }
    if let Some(max) = rules.max_length {
        if len > max {
            issues.push(Issue::new(path, format!("must be at most {max} characters")));
        }
    }
    if let Some(pattern) = &rules.pattern {
        if !pattern.is_match(s) {
            issues.push(Issue::new(
                path,
                format!("does not match pattern '{}'", pattern.as_str()),
            ));
        }
    }
}

fn check_range(rules: &NumberRules, n: f64, path: &str, issues: &mut Vec<Issue>) {
    if let Some(min) = rules.minimum {
        if n < min {
            issues.push(Issue::new(path, format!("must be greater than or equal to {min}")));
        }
    }
    if let Some(max) = rules.maximum {
        if n > max {
            issues.push(Issue::new(path, format!("must be less than or equal to {max}")));
        }
    }
}

fn mismatch(path: &str, expected: &ShapeKind, found: &Value) -> Issue {
    Issue::new(
        path,
        format!("expected {}, found {}", expected.name(), value_type_name(found)),
    )
}

fn child_path(parent: &str, key: &str) -> String {
    if parent.is_empty() {
        key.to_string()
    } else {
        format!("{parent}.{key}")
    }
}

fn index_path(parent: &str, index: usize) -> String {
    format!("{parent}[{index}]")
}

fn value_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
