//! Captured path parameters.

use smallvec::SmallVec;

// Route templates rarely capture more than a few segments.
type Captures = SmallVec<[Capture; 4]>;

#[derive(Debug, Clone, PartialEq, Eq)]
struct Capture {
    name: String,
    value: String,
}

/// Values captured by `{name}` and `*name` segments, in template order.
///
/// A name can appear only once per template, so lookups return the single
/// captured value.
///
/// ```rust
/// use veritas_router::Params;
///
/// let mut params = Params::new();
/// params.push("org", "veritas");
/// params.push("path", "docs/openapi.json");
///
/// assert_eq!(params.get("path"), Some("docs/openapi.json"));
/// assert_eq!(params.iter().map(|(name, _)| name).collect::<Vec<_>>(), ["org", "path"]);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Params {
    captures: Captures,
}

impl Params {
    /// Creates an empty set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a captured segment.
    pub fn push(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.captures.push(Capture {
            name: name.into(),
            value: value.into(),
        });
    }

    /// Returns the value captured for `name`.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.captures
            .iter()
            .find_map(|capture| (capture.name == name).then_some(capture.value.as_str()))
    }

    /// Discards captures made after the first `len`, undoing a failed
    /// branch during matching.
    pub fn truncate(&mut self, len: usize) {
        self.captures.truncate(len);
    }

    /// Number of captured values.
    #[must_use]
    pub fn len(&self) -> usize {
        self.captures.len()
    }

    /// True when nothing was captured.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.captures.is_empty()
    }

    /// Iterates `(name, value)` in template order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.captures
            .iter()
            .map(|capture| (capture.name.as_str(), capture.value.as_str()))
    }
}

impl IntoIterator for Params {
    type Item = (String, String);
    type IntoIter = IntoIter;

    fn into_iter(self) -> Self::IntoIter {
        IntoIter {
            captures: self.captures.into_iter(),
        }
    }
}

/// Owning iterator over captured `(name, value)` pairs.
#[derive(Debug)]
pub struct IntoIter {
    captures: smallvec::IntoIter<[Capture; 4]>,
}

impl Iterator for IntoIter {
    type Item = (String, String);

    fn next(&mut self) -> Option<Self::Item> {
        self.captures
            .next()
            .map(|capture| (capture.name, capture.value))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.captures.size_hint()
    }
}

impl ExactSizeIterator for IntoIter {}

impl<N: Into<String>, V: Into<String>> FromIterator<(N, V)> for Params {
    fn from_iter<I: IntoIterator<Item = (N, V)>>(iter: I) -> Self {
        let mut params = Self::new();
        for (name, value) in iter {
            params.push(name, value);
        }
        params
    }
}
