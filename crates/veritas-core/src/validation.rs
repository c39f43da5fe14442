//! Validation failures.
//!
//! A [`ValidationError`] is the only way a schema may reject input. It keeps
//! every field-level [`Issue`] found in the offending value, and once the
//! binder has seen it, the [`Section`] of the request it came from.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// The part of a request a schema was applied to.
///
/// Sections are validated in declaration order: params, then query, then body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Section {
    /// Path parameters.
    Params,
    /// Query string parameters.
    Query,
    /// Request body.
    Body,
}

impl Section {
    /// All sections in validation order.
    pub const ORDERED: [Self; 3] = [Self::Params, Self::Query, Self::Body];

    /// Returns the lowercase section name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Params => "params",
            Self::Query => "query",
            Self::Body => "body",
        }
    }
}

impl fmt::Display for Section {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single field-level diagnostic.
///
/// `path` is dotted for object fields (`user.name`) and uses brackets for
/// array positions (`tags[0]`). The empty path refers to the value itself.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Issue {
    /// Location of the offending value.
    pub path: String,
    /// What was wrong with it.
    pub message: String,
}

impl Issue {
    /// Creates a new issue.
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Returns `true` if the issue refers to the whole value.
    #[must_use]
    pub fn is_root(&self) -> bool {
        self.path.is_empty()
    }
}

impl fmt::Display for Issue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_root() {
            f.write_str(&self.message)
        } else {
            write!(f, "{}: {}", self.path, self.message)
        }
    }
}

/// Raw input did not satisfy a declared schema.
///
/// # Example
///
/// ```
/// use veritas_core::{Issue, Section, ValidationError};
///
/// let err = ValidationError::single("test", "required field is missing")
///     .in_section(Section::Query);
///
/// assert_eq!(err.section(), Some(Section::Query));
/// assert!(err.mentions("test"));
/// assert_eq!(err.to_string(), "invalid query: test: required field is missing");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationError {
    #[serde(skip_serializing_if = "Option::is_none")]
    section: Option<Section>,
    issues: Vec<Issue>,
}

impl ValidationError {
    /// Creates an error from a list of issues.
    #[must_use]
    pub fn new(issues: Vec<Issue>) -> Self {
        Self {
            section: None,
            issues,
        }
    }

    /// Creates an error with exactly one issue.
    pub fn single(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(vec![Issue::new(path, message)])
    }

    /// Tags the error with the request section it was raised for.
    #[must_use]
    pub fn in_section(mut self, section: Section) -> Self {
        self.section = Some(section);
        self
    }

    /// Returns the request section, if known.
    #[must_use]
    pub const fn section(&self) -> Option<Section> {
        self.section
    }

    /// Returns the collected issues.
    #[must_use]
    pub fn issues(&self) -> &[Issue] {
        &self.issues
    }

    /// Consumes the error and returns its issues.
    #[must_use]
    pub fn into_issues(self) -> Vec<Issue> {
        self.issues
    }

    /// Adds another issue.
    pub fn push(&mut self, issue: Issue) {
        self.issues.push(issue);
    }

    /// Returns `true` if any issue is located at `path` or below it.
    #[must_use]
    pub fn mentions(&self, path: &str) -> bool {
        self.issues.iter().any(|issue| {
            issue.path == path
                || issue
                    .path
                    .strip_prefix(path)
                    .is_some_and(|rest| rest.starts_with('.') || rest.starts_with('['))
        })
    }

    /// Returns the number of issues.
    #[must_use]
    pub fn len(&self) -> usize {
        self.issues.len()
    }

    /// Returns `true` if there are no issues.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.issues.is_empty()
    }

    /// Groups messages by field path, for error envelopes.
    #[must_use]
    pub fn by_field(&self) -> BTreeMap<String, Vec<String>> {
        let mut fields: BTreeMap<String, Vec<String>> = BTreeMap::new();
        for issue in &self.issues {
            fields
                .entry(issue.path.clone())
                .or_default()
                .push(issue.message.clone());
        }
        fields
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.section {
            Some(section) => write!(f, "invalid {section}")?,
            None => f.write_str("invalid input")?,
        }
        for (i, issue) in self.issues.iter().enumerate() {
            f.write_str(if i == 0 { ": " } else { "; " })?;
            write!(f, "{issue}")?;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationError {}
