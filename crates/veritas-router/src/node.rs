//! Radix tree nodes.

use http::Method;

use crate::method_router::MethodRouter;
use crate::params::Params;
use crate::RouteError;

/// Type of path segment in the radix tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SegmentKind {
    /// Static path segment (e.g., "users", "api")
    Static,
    /// Named parameter (e.g., "{id}")
    Param(String),
    /// Catch-all wildcard (e.g., "*path")
    Wildcard(String),
}

/// A node in the radix tree.
///
/// Nodes that terminate a registered route carry the route template and a
/// [`MethodRouter`] holding one value per method.
#[derive(Debug, Clone)]
pub struct Node<T> {
    segment: String,
    kind: SegmentKind,
    template: Option<String>,
    methods: MethodRouter<T>,
    static_children: Vec<Node<T>>,
    param_child: Option<Box<Node<T>>>,
    wildcard_child: Option<Box<Node<T>>>,
}

impl<T> Node<T> {
    fn with_kind(segment: String, kind: SegmentKind) -> Self {
        Self {
            segment,
            kind,
            template: None,
            methods: MethodRouter::new(),
            static_children: Vec::new(),
            param_child: None,
            wildcard_child: None,
        }
    }

    /// Creates a root node for the tree.
    #[must_use]
    pub fn root() -> Self {
        Self::with_kind(String::new(), SegmentKind::Static)
    }

    /// Returns the segment text this node matches.
    #[must_use]
    pub fn segment(&self) -> &str {
        &self.segment
    }

    /// Returns the segment kind.
    #[must_use]
    pub const fn kind(&self) -> &SegmentKind {
        &self.kind
    }

    /// Returns the route template if a route ends here.
    #[must_use]
    pub fn template(&self) -> Option<&str> {
        self.template.as_deref()
    }

    /// Returns the method table of this node.
    #[must_use]
    pub const fn methods(&self) -> &MethodRouter<T> {
        &self.methods
    }

    /// Inserts `value` for `method` at `path`, returning any value it replaced.
    pub fn insert(&mut self, path: &str, method: Method, value: T) -> Result<Option<T>, RouteError> {
        let segments = parse_template(path)?;
        let leaf = self.descend(path, &segments)?;
        if leaf.template.is_none() {
            leaf.template = Some(path.to_string());
        }
        Ok(leaf.methods.set(method, value))
    }

    /// Reports the error [`insert`](Self::insert) would return for `path`
    /// without modifying the tree.
    pub fn check(&self, path: &str) -> Result<(), RouteError> {
        let segments = parse_template(path)?;
        let mut node = self;
        for (segment, kind) in &segments {
            let next = match kind {
                SegmentKind::Static => node.find_static_child(segment),
                SegmentKind::Param(_) => node.param_child.as_deref(),
                SegmentKind::Wildcard(_) => node.wildcard_child.as_deref(),
            };
            // Nothing below a missing node can conflict.
            let Some(next) = next else {
                return Ok(());
            };
            if next.kind != *kind {
                return Err(RouteError::ConflictingParameter {
                    path: path.to_string(),
                    existing: next.segment.clone(),
                    new: segment.clone(),
                });
            }
            node = next;
        }
        Ok(())
    }

    // Walks to (creating as needed) the node for `segments`.
    fn descend(
        &mut self,
        path: &str,
        segments: &[(String, SegmentKind)],
    ) -> Result<&mut Self, RouteError> {
        let Some(((segment, kind), rest)) = segments.split_first() else {
            return Ok(self);
        };

        let child = match kind {
            SegmentKind::Static => {
                let index = match self
                    .static_children
                    .binary_search_by(|c| c.segment.as_str().cmp(segment))
                {
                    Ok(index) => index,
                    Err(index) => {
                        self.static_children
                            .insert(index, Self::with_kind(segment.clone(), SegmentKind::Static));
                        index
                    }
                };
                &mut self.static_children[index]
            }
            SegmentKind::Param(_) | SegmentKind::Wildcard(_) => {
                let slot = if matches!(kind, SegmentKind::Param(_)) {
                    &mut self.param_child
                } else {
                    &mut self.wildcard_child
                };
                let child = slot.get_or_insert_with(|| {
                    Box::new(Self::with_kind(segment.clone(), kind.clone()))
                });
                if child.kind != *kind {
                    return Err(RouteError::ConflictingParameter {
                        path: path.to_string(),
                        existing: child.segment.clone(),
                        new: segment.clone(),
                    });
                }
                &mut **child
            }
        };
        child.descend(path, rest)
    }

    /// Matches a concrete path, filling `params` on success.
    #[must_use]
    pub fn find(&self, path: &str, params: &mut Params) -> Option<&Self> {
        let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
        self.match_segments(&segments, params)
    }

    fn match_segments<'a>(&'a self, segments: &[&str], params: &mut Params) -> Option<&'a Self> {
        let Some((segment, rest)) = segments.split_first() else {
            return self.template.is_some().then_some(self);
        };

        if let Some(child) = self.find_static_child(segment) {
            if let Some(found) = child.match_segments(rest, params) {
                return Some(found);
            }
        }

        if let Some(child) = &self.param_child {
            if let SegmentKind::Param(name) = &child.kind {
                let mark = params.len();
                params.push(name.clone(), *segment);
                if let Some(found) = child.match_segments(rest, params) {
                    return Some(found);
                }
                params.truncate(mark);
            }
        }

        if let Some(child) = &self.wildcard_child {
            if let SegmentKind::Wildcard(name) = &child.kind {
                if child.template.is_some() {
                    params.push(name.clone(), segments.join("/"));
                    return Some(child);
                }
            }
        }

        None
    }

    fn find_static_child(&self, segment: &str) -> Option<&Self> {
        self.static_children
            .binary_search_by(|c| c.segment.as_str().cmp(segment))
            .ok()
            .map(|i| &self.static_children[i])
    }
}

fn parse_template(path: &str) -> Result<Vec<(String, SegmentKind)>, RouteError> {
    let segments = parse_path(path);
    let wildcard = segments
        .iter()
        .position(|(_, kind)| matches!(kind, SegmentKind::Wildcard(_)));
    match wildcard {
        Some(pos) if pos + 1 != segments.len() => Err(RouteError::WildcardNotLast {
            path: path.to_string(),
        }),
        _ => Ok(segments),
    }
}

fn parse_path(path: &str) -> Vec<(String, SegmentKind)> {
    path.split('/')
        .filter(|s| !s.is_empty())
        .map(|s| {
            let kind = if let Some(name) = s.strip_prefix('{').and_then(|s| s.strip_suffix('}')) {
                SegmentKind::Param(name.to_string())
            } else if let Some(name) = s.strip_prefix('*') {
                SegmentKind::Wildcard(name.to_string())
            } else {
                SegmentKind::Static
            };
            (s.to_string(), kind)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lookup<'a>(root: &'a Node<&'static str>, path: &str) -> Option<(&'a Node<&'static str>, Params)> {
        let mut params = Params::new();
        root.find(path, &mut params).map(|node| (node, params))
    }

    #[test]
    fn test_parse_path() {
        let segments = parse_path("/files/{dir}/*rest");
        assert_eq!(segments[0], ("files".to_string(), SegmentKind::Static));
        assert_eq!(segments[1], ("{dir}".to_string(), SegmentKind::Param("dir".into())));
        assert_eq!(segments[2], ("*rest".to_string(), SegmentKind::Wildcard("rest".into())));
    }

    #[test]
    fn test_insert_and_match_param() {
        let mut root = Node::root();
        root.insert("/users/{id}", Method::GET, "getUser").unwrap();

        let (node, params) = lookup(&root, "/users/123").unwrap();
        assert_eq!(node.methods().get(&Method::GET), Some(&"getUser"));
        assert_eq!(node.template(), Some("/users/{id}"));
        assert_eq!(params.get("id"), Some("123"));
    }

    #[test]
    fn test_insert_returns_replaced_value() {
        let mut root = Node::root();
        assert_eq!(root.insert("/a", Method::GET, "one").unwrap(), None);
        assert_eq!(root.insert("/a", Method::GET, "two").unwrap(), Some("one"));
        assert_eq!(root.insert("/a", Method::POST, "three").unwrap(), None);
    }

    #[test]
    fn test_intermediate_nodes_do_not_match() {
        let mut root = Node::root();
        root.insert("/api/v1/users", Method::GET, "listUsers").unwrap();
        assert!(lookup(&root, "/api/v1").is_none());
        assert!(lookup(&root, "/api").is_none());
    }

    #[test]
    fn test_backtracking_discards_params() {
        let mut root = Node::root();
        root.insert("/{org}/settings", Method::GET, "orgSettings").unwrap();
        root.insert("/*rest", Method::GET, "fallback").unwrap();

        let (node, params) = lookup(&root, "/acme/billing").unwrap();
        assert_eq!(node.methods().get(&Method::GET), Some(&"fallback"));
        assert_eq!(params.get("org"), None);
        assert_eq!(params.get("rest"), Some("acme/billing"));
    }

    #[test]
    fn test_wildcard_must_be_last() {
        let mut root = Node::root();
        let err = root.insert("/files/*path/meta", Method::GET, "x").unwrap_err();
        assert!(matches!(err, RouteError::WildcardNotLast { .. }));
    }

    #[test]
    fn test_conflicting_param_names() {
        let mut root = Node::root();
        root.insert("/users/{id}", Method::GET, "getUser").unwrap();
        let err = root
            .insert("/users/{userId}/posts", Method::GET, "listPosts")
            .unwrap_err();
        assert!(matches!(err, RouteError::ConflictingParameter { .. }));
    }

    #[test]
    fn test_check_agrees_with_insert_and_leaves_tree_alone() {
        let mut root = Node::root();
        root.insert("/users/{id}", Method::GET, "getUser").unwrap();

        assert!(root.check("/users/{id}/posts").is_ok());
        assert!(root.check("/orgs/{org}").is_ok());
        assert!(matches!(
            root.check("/users/{userId}/posts"),
            Err(RouteError::ConflictingParameter { .. })
        ));
        assert!(matches!(
            root.check("/files/*path/meta"),
            Err(RouteError::WildcardNotLast { .. })
        ));

        assert!(lookup(&root, "/orgs/acme").is_none());
        assert_eq!(root.static_children.len(), 1);
    }

    #[test]
    fn test_static_children_sorted() {
        let mut root = Node::root();
        for path in ["/c", "/a", "/b"] {
            root.insert(path, Method::GET, "x").unwrap();
        }
        let segments: Vec<&str> = root.static_children.iter().map(Node::segment).collect();
        assert_eq!(segments, ["a", "b", "c"]);
    }
}
