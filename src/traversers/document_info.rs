//! Per-document traversal state

use std::collections::HashSet;
use std::sync::Arc;

use crate::components::Annotation;
use crate::diagnostics::ErrorReporter;
use crate::documents::{SchemaDocument, SchemaElement};
use crate::error::{Error, Result};
use crate::names::split_qname;
use crate::namespaces::{NamespaceBinding, NamespaceContext, NamespaceSupport, QName};
use crate::{XML_NAMESPACE, XSD_NAMESPACE};

use super::attribute_checker::{AttrArray, AttrIndex, AttributeChecker, DerivationSet, Form};

/// Index of a document in the traversal context
pub type DocId = usize;

#[derive(Debug)]
struct AnnotationNode {
    annotation: Annotation,
    next: Option<Box<AnnotationNode>>,
}

/// Everything the traversers need to know about one schema document
#[derive(Debug)]
pub struct XsDocumentInfo {
    pub id: DocId,
    pub system_id: String,
    pub root: Arc<SchemaElement>,
    target_namespace: Option<String>,
    chameleon: bool,
    pub element_form_qualified: bool,
    pub attribute_form_qualified: bool,
    pub block_default: DerivationSet,
    pub final_default: DerivationSet,
    scope: NamespaceSupport,
    root_context: NamespaceContext,
    allowed_namespaces: Vec<Option<String>>,
    reported_namespaces: HashSet<Option<String>>,
    annotations: Option<Box<AnnotationNode>>,
    root_attrs: Option<AttrArray>,
}

impl XsDocumentInfo {
    /// Build the context for `document`
    ///
    /// Fails when the root is not `xs:schema` or its attributes cannot be
    /// checked at all.
    pub fn new(
        id: DocId,
        document: &SchemaDocument,
        checker: &mut AttributeChecker,
        reporter: &mut ErrorReporter,
    ) -> Result<Self> {
        let root = document.root.clone();
        let system_id = document.system_id.clone().unwrap_or_default();
        if !root.is_xsd("schema") {
            return Err(Error::NotSchema {
                system_id,
                found: root.qname.to_string(),
            });
        }

        let scope = NamespaceSupport::new(root.namespace_decls.clone());
        let root_context = scope.snapshot();
        let mut info = Self {
            id,
            system_id,
            root: root.clone(),
            target_namespace: None,
            chameleon: false,
            element_form_qualified: false,
            attribute_form_qualified: false,
            block_default: DerivationSet::empty(),
            final_default: DerivationSet::empty(),
            scope,
            root_context,
            allowed_namespaces: Vec::new(),
            reported_namespaces: HashSet::new(),
            annotations: None,
            root_attrs: None,
        };

        // namespace lists on the root resolve against the raw attribute
        info.target_namespace = root
            .attribute("targetNamespace")
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty());

        let attrs = checker
            .check_attributes(&root, true, &info, reporter)
            .ok_or_else(|| Error::RootAttributes {
                system_id: info.system_id.clone(),
            })?;
        info.target_namespace = attrs
            .string(AttrIndex::TargetNamespace)
            .filter(|s| !s.is_empty());
        info.element_form_qualified = attrs.form(AttrIndex::ElementFormDefault) == Some(Form::Qualified);
        info.attribute_form_qualified =
            attrs.form(AttrIndex::AttributeFormDefault) == Some(Form::Qualified);
        info.block_default = attrs.derivation(AttrIndex::BlockDefault);
        info.final_default = attrs.derivation(AttrIndex::FinalDefault);
        info.root_attrs = Some(attrs);
        Ok(info)
    }

    pub fn target_namespace(&self) -> Option<&str> {
        self.target_namespace.as_deref()
    }

    /// Whether the document was pulled into a namespace by a chameleon include
    pub fn is_chameleon(&self) -> bool {
        self.chameleon
    }

    /// Adopt the includer's namespace (document has no `targetNamespace`)
    pub fn set_chameleon_namespace(&mut self, namespace: Option<&str>) {
        if namespace.is_some() {
            self.target_namespace = namespace.map(str::to_string);
            self.chameleon = true;
        }
    }

    /// Open a scope for declarations made on a nested element
    pub fn push_scope(&mut self, bindings: &[NamespaceBinding]) -> usize {
        self.scope.push(bindings.to_vec())
    }

    /// Switch to the document's root scope, e.g. for on-demand traversal
    pub fn backup_scope(&mut self) -> usize {
        self.scope.push_isolated(&self.root_context)
    }

    /// Switch to a previously captured scope
    pub fn backup_scope_with(&mut self, context: &NamespaceContext) -> usize {
        self.scope.push_isolated(context)
    }

    /// Drop every scope opened after `depth` was returned
    pub fn restore_scope(&mut self, depth: usize) {
        self.scope.pop_to(depth);
    }

    pub fn scope_depth(&self) -> usize {
        self.scope.depth()
    }

    pub fn lookup_prefix(&self, prefix: Option<&str>) -> Option<&str> {
        self.scope.lookup(prefix)
    }

    /// Bindings currently in scope
    pub fn namespace_snapshot(&self) -> NamespaceContext {
        self.scope.snapshot()
    }

    /// Resolve a lexical QName against the current scope
    ///
    /// Unprefixed names take the default namespace; in a chameleon document
    /// with no default namespace they take the adopted target namespace.
    /// On failure the unbound prefix is returned.
    pub fn resolve_qname(&self, raw: &str) -> std::result::Result<QName, String> {
        let (prefix, local) = split_qname(raw);
        match prefix {
            Some(prefix) => self
                .lookup_prefix(Some(prefix))
                .map(|ns| QName::namespaced(ns, local))
                .ok_or_else(|| prefix.to_string()),
            None => {
                let namespace = self.lookup_prefix(None).map(str::to_string).or_else(|| {
                    if self.chameleon {
                        self.target_namespace.clone()
                    } else {
                        None
                    }
                });
                Ok(QName::new(namespace, local))
            }
        }
    }

    /// Record an `import` of `namespace`
    pub fn allow_namespace(&mut self, namespace: Option<&str>) {
        let namespace = namespace.map(str::to_string);
        if !self.allowed_namespaces.contains(&namespace) {
            self.allowed_namespaces.push(namespace);
        }
    }

    /// Components of `namespace` may be referenced from this document
    pub fn is_namespace_allowed(&self, namespace: Option<&str>) -> bool {
        namespace == Some(XSD_NAMESPACE)
            || namespace == Some(XML_NAMESPACE)
            || namespace == self.target_namespace()
            || self
                .allowed_namespaces
                .iter()
                .any(|ns| ns.as_deref() == namespace)
    }

    /// First call per namespace returns true
    pub fn needs_namespace_report(&mut self, namespace: Option<&str>) -> bool {
        self.reported_namespaces.insert(namespace.map(str::to_string))
    }

    pub fn add_annotation(&mut self, annotation: Annotation) {
        let next = self.annotations.take();
        self.annotations = Some(Box::new(AnnotationNode { annotation, next }));
    }

    /// Remove the collected annotations, in the order they were added
    pub fn take_annotations(&mut self) -> Vec<Annotation> {
        let mut annotations = Vec::new();
        let mut node = self.annotations.take();
        while let Some(current) = node {
            let AnnotationNode { annotation, next } = *current;
            annotations.push(annotation);
            node = next;
        }
        annotations.reverse();
        annotations
    }

    pub fn root_attrs(&self) -> Option<&AttrArray> {
        self.root_attrs.as_ref()
    }

    /// Give the root element's attribute array back to the checker
    pub fn release(&mut self, checker: &mut AttributeChecker) {
        if let Some(attrs) = self.root_attrs.take() {
            checker.return_attr_array(attrs);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn info(xml: &str) -> (XsDocumentInfo, AttributeChecker) {
        let doc = SchemaDocument::parse_pull(xml, Some("t.xsd")).unwrap();
        let mut checker = AttributeChecker::new(4);
        let mut reporter = ErrorReporter::new();
        let info = XsDocumentInfo::new(0, &doc, &mut checker, &mut reporter).unwrap();
        (info, checker)
    }

    #[test]
    fn test_root_defaults() {
        let (mut info, mut checker) = info(
            r##"<xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema" targetNamespace="urn:t"
                 elementFormDefault="qualified" blockDefault="#all"/>"##,
        );
        assert_eq!(info.target_namespace(), Some("urn:t"));
        assert!(info.element_form_qualified);
        assert!(!info.attribute_form_qualified);
        assert!(info.block_default.contains(DerivationSet::SUBSTITUTION));
        assert!(info.root_attrs().is_some());
        info.release(&mut checker);
        assert_eq!(checker.outstanding(), 0);
    }

    #[test]
    fn test_rejects_non_schema_root() {
        let doc = SchemaDocument::parse_pull("<schema/>", None).unwrap();
        let mut checker = AttributeChecker::new(4);
        let mut reporter = ErrorReporter::new();
        assert!(XsDocumentInfo::new(0, &doc, &mut checker, &mut reporter).is_err());
        assert_eq!(checker.outstanding(), 0);
    }

    #[test]
    fn test_scopes() {
        let (mut info, _) = info(
            r#"<xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema" xmlns:a="urn:a"/>"#,
        );
        let base = info.scope_depth();
        let depth = info.push_scope(&[NamespaceBinding::new(Some("b"), "urn:b")]);
        assert_eq!(info.lookup_prefix(Some("a")), Some("urn:a"));
        assert_eq!(info.lookup_prefix(Some("b")), Some("urn:b"));
        let backup = info.backup_scope();
        assert_eq!(info.lookup_prefix(Some("b")), None);
        info.restore_scope(backup);
        assert_eq!(info.lookup_prefix(Some("b")), Some("urn:b"));
        info.restore_scope(depth);
        assert_eq!(info.scope_depth(), base);
    }

    #[test]
    fn test_chameleon_resolution() {
        let (mut info, _) = info(r#"<xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema"/>"#);
        assert_eq!(info.resolve_qname("g"), Ok(QName::local("g")));
        info.set_chameleon_namespace(Some("urn:host"));
        assert!(info.is_chameleon());
        assert_eq!(info.resolve_qname("g"), Ok(QName::namespaced("urn:host", "g")));
        assert_eq!(info.resolve_qname("p:g"), Err("p".to_string()));
    }

    #[test]
    fn test_allowed_namespaces() {
        let (mut info, _) = info(
            r#"<xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema" targetNamespace="urn:t"/>"#,
        );
        assert!(info.is_namespace_allowed(Some("urn:t")));
        assert!(info.is_namespace_allowed(Some(XSD_NAMESPACE)));
        assert!(info.is_namespace_allowed(Some(XML_NAMESPACE)));
        assert!(!info.is_namespace_allowed(None));
        info.allow_namespace(None);
        assert!(info.is_namespace_allowed(None));
        assert!(info.needs_namespace_report(Some("urn:x")));
        assert!(!info.needs_namespace_report(Some("urn:x")));
    }

    #[test]
    fn test_annotation_order() {
        let (mut info, _) = info(r#"<xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema"/>"#);
        info.add_annotation(Annotation::synthetic("one"));
        info.add_annotation(Annotation::synthetic("two"));
        let texts: Vec<_> = info
            .take_annotations()
            .into_iter()
            .map(|a| a.documentation[0].clone())
            .collect();
        assert_eq!(texts, vec!["one", "two"]);
        assert!(info.take_annotations().is_empty());
    }
}
