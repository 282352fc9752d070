//! XML namespace handling
//!
//! This module provides qualified names, flat prefix mappings
//! ([`NamespaceContext`]) and the scoped prefix stack ([`NamespaceSupport`])
//! that schema documents use while they are traversed.

use serde::Serialize;
use std::collections::HashMap;
use std::fmt;

use crate::XML_NAMESPACE;

/// XML Namespace URI
pub type NamespaceUri = String;

/// Namespace prefix
pub type Prefix = String;

/// Qualified name (QName) - combination of namespace and local name
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct QName {
    /// Namespace URI (None for no namespace)
    pub namespace: Option<NamespaceUri>,
    /// Local name
    pub local_name: String,
}

impl QName {
    /// Create a new QName
    pub fn new(namespace: Option<impl Into<String>>, local_name: impl Into<String>) -> Self {
        Self {
            namespace: namespace.map(|s| s.into()),
            local_name: local_name.into(),
        }
    }

    /// Create a QName without a namespace
    pub fn local(local_name: impl Into<String>) -> Self {
        Self {
            namespace: None,
            local_name: local_name.into(),
        }
    }

    /// Create a QName with a namespace
    pub fn namespaced(namespace: impl Into<String>, local_name: impl Into<String>) -> Self {
        Self {
            namespace: Some(namespace.into()),
            local_name: local_name.into(),
        }
    }

    /// Namespace as a borrowed option
    pub fn namespace(&self) -> Option<&str> {
        self.namespace.as_deref()
    }
}

impl fmt::Display for QName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.namespace {
            Some(ns) => write!(f, "{{{}}}{}", ns, self.local_name),
            None => write!(f, "{}", self.local_name),
        }
    }
}

/// A single `xmlns` / `xmlns:prefix` declaration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamespaceBinding {
    /// Declared prefix, `None` for the default namespace
    pub prefix: Option<Prefix>,
    /// Bound URI; empty undeclares the default namespace
    pub uri: NamespaceUri,
}

impl NamespaceBinding {
    /// Create a binding
    pub fn new(prefix: Option<impl Into<String>>, uri: impl Into<String>) -> Self {
        Self {
            prefix: prefix.map(|p| p.into()),
            uri: uri.into(),
        }
    }
}

/// Namespace context for resolving prefixes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamespaceContext {
    /// Mapping from prefix to namespace URI
    prefixes: HashMap<Prefix, NamespaceUri>,
    /// Default namespace (no prefix)
    default_namespace: Option<NamespaceUri>,
}

impl NamespaceContext {
    /// Create a new empty namespace context
    pub fn new() -> Self {
        Self {
            prefixes: HashMap::new(),
            default_namespace: None,
        }
    }

    /// Add a namespace prefix mapping
    pub fn add_prefix(&mut self, prefix: impl Into<String>, namespace: impl Into<String>) {
        self.prefixes.insert(prefix.into(), namespace.into());
    }

    /// Set the default namespace
    pub fn set_default_namespace(&mut self, namespace: impl Into<String>) {
        let namespace = namespace.into();
        self.default_namespace = (!namespace.is_empty()).then_some(namespace);
    }

    /// Apply a declaration
    pub fn declare(&mut self, binding: &NamespaceBinding) {
        match &binding.prefix {
            Some(prefix) => self.add_prefix(prefix.clone(), binding.uri.clone()),
            None => self.set_default_namespace(binding.uri.clone()),
        }
    }

    /// Get the namespace for a prefix
    pub fn get_namespace(&self, prefix: &str) -> Option<&str> {
        if prefix == "xml" {
            return Some(XML_NAMESPACE);
        }
        self.prefixes.get(prefix).map(|s| s.as_str())
    }

    /// Iterate over the prefixed bindings
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.prefixes.iter().map(|(p, u)| (p.as_str(), u.as_str()))
    }

    /// All bindings, including the default namespace
    pub fn bindings(&self) -> Vec<NamespaceBinding> {
        let mut out: Vec<NamespaceBinding> = self
            .prefixes
            .iter()
            .map(|(p, u)| NamespaceBinding::new(Some(p.clone()), u.clone()))
            .collect();
        if let Some(ref ns) = self.default_namespace {
            out.push(NamespaceBinding::new(None::<String>, ns.clone()));
        }
        out
    }
}

impl Default for NamespaceContext {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone)]
struct ScopeFrame {
    bindings: Vec<NamespaceBinding>,
    /// Lookups do not continue below an isolated frame
    isolated: bool,
}

/// Scoped prefix mappings, one frame per pushed scope
///
/// The bottom frame always exists and is never popped.
#[derive(Debug, Clone)]
pub struct NamespaceSupport {
    frames: Vec<ScopeFrame>,
}

impl NamespaceSupport {
    /// Create a support object whose base frame holds `base`
    pub fn new(base: Vec<NamespaceBinding>) -> Self {
        Self {
            frames: vec![ScopeFrame {
                bindings: base,
                isolated: true,
            }],
        }
    }

    /// Number of frames on the stack
    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    /// Push a frame extending the current scope; returns the depth to restore
    pub fn push(&mut self, bindings: Vec<NamespaceBinding>) -> usize {
        let depth = self.frames.len();
        self.frames.push(ScopeFrame {
            bindings,
            isolated: false,
        });
        depth
    }

    /// Push a frame that replaces the current scope entirely
    pub fn push_isolated(&mut self, context: &NamespaceContext) -> usize {
        let depth = self.frames.len();
        self.frames.push(ScopeFrame {
            bindings: context.bindings(),
            isolated: true,
        });
        depth
    }

    /// Pop frames until the stack is back at `depth`
    pub fn pop_to(&mut self, depth: usize) {
        self.frames.truncate(depth.max(1));
    }

    /// Look up a prefix (`None` for the default namespace)
    pub fn lookup(&self, prefix: Option<&str>) -> Option<&str> {
        if prefix == Some("xml") {
            return Some(XML_NAMESPACE);
        }
        for frame in self.frames.iter().rev() {
            if let Some(binding) = frame
                .bindings
                .iter()
                .rev()
                .find(|b| b.prefix.as_deref() == prefix)
            {
                return (!binding.uri.is_empty()).then_some(binding.uri.as_str());
            }
            if frame.isolated {
                break;
            }
        }
        None
    }

    /// Flatten the visible bindings into a context
    pub fn snapshot(&self) -> NamespaceContext {
        let start = self
            .frames
            .iter()
            .rposition(|f| f.isolated)
            .unwrap_or(0);
        let mut context = NamespaceContext::new();
        for frame in &self.frames[start..] {
            for binding in &frame.bindings {
                context.declare(binding);
            }
        }
        context
    }
}

impl Default for NamespaceSupport {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_qname_creation() {
        let qname = QName::namespaced("http://example.com", "element");
        assert_eq!(qname.namespace, Some("http://example.com".to_string()));
        assert_eq!(qname.local_name, "element");
    }

    #[test]
    fn test_qname_display() {
        let qname = QName::namespaced("http://example.com", "element");
        assert_eq!(qname.to_string(), "{http://example.com}element");

        let qname_local = QName::local("element");
        assert_eq!(qname_local.to_string(), "element");
    }

    #[test]
    fn test_context_prefix_lookup() {
        let mut ctx = NamespaceContext::new();
        ctx.declare(&NamespaceBinding::new(Some("xs"), "http://www.w3.org/2001/XMLSchema"));
        ctx.declare(&NamespaceBinding::new(None::<String>, "urn:d"));

        assert_eq!(ctx.get_namespace("xs"), Some("http://www.w3.org/2001/XMLSchema"));
        assert_eq!(ctx.get_namespace("xml"), Some(XML_NAMESPACE));
        assert_eq!(ctx.get_namespace("nope"), None);
        assert_eq!(ctx.bindings().len(), 2);
    }

    #[test]
    fn test_support_push_and_pop() {
        let mut support =
            NamespaceSupport::new(vec![NamespaceBinding::new(Some("a"), "urn:a")]);
        let depth = support.push(vec![NamespaceBinding::new(Some("a"), "urn:inner")]);
        assert_eq!(support.lookup(Some("a")), Some("urn:inner"));
        support.pop_to(depth);
        assert_eq!(support.lookup(Some("a")), Some("urn:a"));
        assert_eq!(support.depth(), 1);
    }

    #[test]
    fn test_isolated_frame_hides_outer_bindings() {
        let mut support =
            NamespaceSupport::new(vec![NamespaceBinding::new(Some("a"), "urn:a")]);
        let mut replacement = NamespaceContext::new();
        replacement.add_prefix("b", "urn:b");
        let depth = support.push_isolated(&replacement);
        assert_eq!(support.lookup(Some("a")), None);
        assert_eq!(support.lookup(Some("b")), Some("urn:b"));
        support.pop_to(depth);
        assert_eq!(support.lookup(Some("a")), Some("urn:a"));
    }

    #[test]
    fn test_default_namespace_undeclared() {
        let mut support =
            NamespaceSupport::new(vec![NamespaceBinding::new(None::<String>, "urn:d")]);
        assert_eq!(support.lookup(None), Some("urn:d"));
        support.push(vec![NamespaceBinding::new(None::<String>, "")]);
        assert_eq!(support.lookup(None), None);
        assert_eq!(support.lookup(Some("xml")), Some(XML_NAMESPACE));
    }

    #[test]
    fn test_snapshot_flattens_visible_frames() {
        let mut support =
            NamespaceSupport::new(vec![NamespaceBinding::new(Some("a"), "urn:a")]);
        support.push(vec![NamespaceBinding::new(Some("b"), "urn:b")]);
        let snapshot = support.snapshot();
        assert_eq!(snapshot.get_namespace("a"), Some("urn:a"));
        assert_eq!(snapshot.get_namespace("b"), Some("urn:b"));
    }
}
