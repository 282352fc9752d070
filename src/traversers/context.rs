//! Shared state of one schema-set traversal
//!
//! The [`TraversalContext`] owns every document context, the grammar
//! bucket, the attribute checker, the particle accumulator and the error
//! reporter. Top-level declarations are first registered by name so that a
//! reference to a component that has not been traversed yet can traverse it
//! on demand.

use indexmap::IndexMap;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use crate::components::{Annotation, AttributeDecl, AttributeGroup, IdentityConstraint, NamedGroup, Occurs};
use crate::config::TraversalOptions;
use crate::diagnostics::{keys, Diagnostic, ErrorReporter};
use crate::documents::SchemaElement;
use crate::grammar::{DeclOrigin, DuplicatePolicy, GrammarBucket, RedefinitionRecord, SchemaGrammar};
use crate::loaders::SchemaResolver;
use crate::namespaces::{NamespaceContext, QName};
use crate::XSD_NAMESPACE;

use super::accumulator::ParticleAccumulator;
use super::attribute_checker::{AttrArray, AttributeChecker};
use super::document_info::{DocId, XsDocumentInfo};
use super::{attribute_groups, attributes, elements, groups, types};

/// Names of the built-in XSD datatypes
const BUILTIN_TYPES: &[&str] = &[
    "anyType", "anySimpleType", "string", "boolean", "decimal", "float", "double", "duration",
    "dateTime", "time", "date", "gYearMonth", "gYear", "gMonthDay", "gDay", "gMonth", "hexBinary",
    "base64Binary", "anyURI", "QName", "NOTATION", "normalizedString", "token", "language",
    "NMTOKEN", "NMTOKENS", "Name", "NCName", "ID", "IDREF", "IDREFS", "ENTITY", "ENTITIES",
    "integer", "nonPositiveInteger", "negativeInteger", "long", "int", "short", "byte",
    "nonNegativeInteger", "unsignedLong", "unsignedInt", "unsignedShort", "unsignedByte",
    "positiveInteger",
];

/// Kind of a global declaration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DeclKind {
    Attribute,
    AttributeGroup,
    Element,
    Group,
    IdentityConstraint,
    Notation,
    Type,
}

impl DeclKind {
    /// Kind declared by a top-level schema child
    pub fn from_local_name(name: &str) -> Option<Self> {
        match name {
            "attribute" => Some(Self::Attribute),
            "attributeGroup" => Some(Self::AttributeGroup),
            "element" => Some(Self::Element),
            "group" => Some(Self::Group),
            "notation" => Some(Self::Notation),
            "complexType" | "simpleType" => Some(Self::Type),
            _ => None,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Attribute => "attribute declaration",
            Self::AttributeGroup => "attribute group",
            Self::Element => "element declaration",
            Self::Group => "group",
            Self::IdentityConstraint => "identity constraint",
            Self::Notation => "notation declaration",
            Self::Type => "type definition",
        }
    }
}

/// Result of a global declaration lookup
#[derive(Debug, Clone)]
pub enum GlobalDecl {
    Group(Arc<NamedGroup>),
    AttributeGroup(Arc<AttributeGroup>),
    Attribute(Arc<AttributeDecl>),
    IdentityConstraint(Arc<IdentityConstraint>),
    /// Elements, types and notations are referenced by name only
    Declared(QName),
}

/// A top-level declaration known by name before traversal
#[derive(Debug, Clone)]
pub(crate) struct RegistryEntry {
    pub doc: DocId,
    pub node: Arc<SchemaElement>,
    /// Enclosing `redefine` element
    pub redefine: Option<Arc<SchemaElement>>,
}

/// Redefinition currently being traversed
#[derive(Debug, Clone)]
pub(crate) struct RedefineScope {
    pub kind: DeclKind,
    pub name: QName,
    /// Renamed original declaration
    pub original: QName,
    /// Occurrence ranges of the self-references seen so far
    pub self_refs: Vec<Occurs>,
}

/// A keyref waiting for every key to be registered
#[derive(Debug, Clone)]
pub(crate) struct PendingKeyref {
    pub doc: DocId,
    pub node: Arc<SchemaElement>,
    pub element_name: QName,
    pub namespaces: NamespaceContext,
}

/// A group redefined by restriction, checked once all groups exist
#[derive(Debug, Clone)]
pub(crate) struct DeferredRestriction {
    pub doc: DocId,
    pub node: Arc<SchemaElement>,
    pub name: QName,
    pub original: QName,
}

pub(crate) type NodeKey = usize;

pub(crate) fn node_key(node: &Arc<SchemaElement>) -> NodeKey {
    Arc::as_ptr(node) as usize
}

/// State shared by all traversers of one schema set
pub struct TraversalContext {
    pub(crate) docs: Vec<XsDocumentInfo>,
    pub(crate) grammars: GrammarBucket,
    pub(crate) checker: AttributeChecker,
    pub(crate) accumulator: ParticleAccumulator,
    pub(crate) reporter: ErrorReporter,
    pub(crate) options: TraversalOptions,
    pub(crate) resolver: Option<Box<dyn SchemaResolver>>,
    pub(crate) locations: HashMap<String, DocId>,
    registry: IndexMap<(DeclKind, QName), RegistryEntry>,
    origins: HashMap<NodeKey, DeclOrigin>,
    renamed: HashMap<NodeKey, QName>,
    pub(crate) redefine_targets: HashMap<NodeKey, QName>,
    traversed: HashSet<NodeKey>,
    in_progress: HashSet<NodeKey>,
    pub(crate) redefining: Option<RedefineScope>,
    pub(crate) pending_keyrefs: Vec<PendingKeyref>,
    pub(crate) deferred_restrictions: Vec<DeferredRestriction>,
    pub(crate) redefinitions: Vec<RedefinitionRecord>,
    depth: usize,
}

impl TraversalContext {
    pub fn new(options: TraversalOptions) -> Self {
        let checker = AttributeChecker::new(options.limits.max_pooled_arrays)
            .with_max_occurs_limit(options.limits.max_occurs_limit);
        Self {
            docs: Vec::new(),
            grammars: GrammarBucket::new(),
            checker,
            accumulator: ParticleAccumulator::new(),
            reporter: ErrorReporter::new(),
            options,
            resolver: None,
            locations: HashMap::new(),
            registry: IndexMap::new(),
            origins: HashMap::new(),
            renamed: HashMap::new(),
            redefine_targets: HashMap::new(),
            traversed: HashSet::new(),
            in_progress: HashSet::new(),
            redefining: None,
            pending_keyrefs: Vec::new(),
            deferred_restrictions: Vec::new(),
            redefinitions: Vec::new(),
            depth: 0,
        }
    }

    pub fn with_resolver(mut self, resolver: Box<dyn SchemaResolver>) -> Self {
        self.resolver = Some(resolver);
        self
    }

    pub fn document(&self, doc: DocId) -> &XsDocumentInfo {
        &self.docs[doc]
    }

    pub fn document_mut(&mut self, doc: DocId) -> &mut XsDocumentInfo {
        &mut self.docs[doc]
    }

    pub fn document_count(&self) -> usize {
        self.docs.len()
    }

    pub fn grammars(&self) -> &GrammarBucket {
        &self.grammars
    }

    pub fn reporter(&self) -> &ErrorReporter {
        &self.reporter
    }

    pub fn checker(&self) -> &AttributeChecker {
        &self.checker
    }

    pub fn accumulator(&self) -> &ParticleAccumulator {
        &self.accumulator
    }

    pub fn options(&self) -> &TraversalOptions {
        &self.options
    }

    pub fn redefinitions(&self) -> &[RedefinitionRecord] {
        &self.redefinitions
    }

    pub(crate) fn into_parts(self) -> (GrammarBucket, ErrorReporter, Vec<RedefinitionRecord>) {
        (self.grammars, self.reporter, self.redefinitions)
    }

    /// Report an error located at `element`
    pub(crate) fn report(&mut self, doc: DocId, element: &SchemaElement, key: &'static str, args: Vec<String>) {
        let system_id = self.docs.get(doc).map(|d| d.system_id.as_str());
        self.reporter
            .report(Diagnostic::error(key, args).at(element, system_id));
    }

    pub(crate) fn warn(&mut self, doc: DocId, element: &SchemaElement, key: &'static str, args: Vec<String>) {
        let system_id = self.docs.get(doc).map(|d| d.system_id.as_str());
        self.reporter
            .report(Diagnostic::warning(key, args).at(element, system_id));
    }

    pub(crate) fn check_attributes(
        &mut self,
        doc: DocId,
        element: &SchemaElement,
        is_global: bool,
    ) -> Option<AttrArray> {
        self.checker
            .check_attributes(element, is_global, &self.docs[doc], &mut self.reporter)
    }

    pub(crate) fn check_particle_attributes(
        &mut self,
        doc: DocId,
        element: &SchemaElement,
        sole_in_sequence: bool,
    ) -> Option<AttrArray> {
        self.checker
            .check_particle_attributes(element, sole_in_sequence, &self.docs[doc], &mut self.reporter)
    }

    pub(crate) fn return_attr_array(&mut self, array: AttrArray) {
        self.checker.return_attr_array(array);
    }

    /// Run `f` with the namespace declarations of `element` in scope
    pub(crate) fn in_element_scope<T>(
        &mut self,
        doc: DocId,
        element: &SchemaElement,
        f: impl FnOnce(&mut Self) -> T,
    ) -> T {
        if element.namespace_decls.is_empty() {
            return f(self);
        }
        let depth = self.docs[doc].push_scope(&element.namespace_decls);
        let result = f(self);
        self.docs[doc].restore_scope(depth);
        result
    }

    /// Enter a nested model group; false when too deep
    pub(crate) fn descend(&mut self, doc: DocId, element: &SchemaElement) -> bool {
        if !self.options.limits.allows_traversal_depth(self.depth + 1) {
            self.report(
                doc,
                element,
                keys::SCHEMA_DEPTH_EXCEEDED,
                vec![self.options.limits.max_traversal_depth.to_string()],
            );
            return false;
        }
        self.depth += 1;
        true
    }

    pub(crate) fn ascend(&mut self) {
        self.depth = self.depth.saturating_sub(1);
    }

    /// Annotation made from text before the first child of `element`
    pub(crate) fn synthetic_annotation(&self, element: &SchemaElement) -> Option<Annotation> {
        if !self.options.synthetic_annotations || element.leading_text.trim().is_empty() {
            return None;
        }
        Some(Annotation::synthetic(&element.leading_text))
    }

    pub(crate) fn duplicate_policy(&self) -> DuplicatePolicy {
        DuplicatePolicy::from_tolerance(self.options.tolerate_duplicates)
    }

    pub(crate) fn grammar_mut(&mut self, doc: DocId) -> &mut SchemaGrammar {
        let namespace = self.docs[doc].target_namespace().map(str::to_string);
        let system_id = self.docs[doc].system_id.clone();
        let grammar = self.grammars.get_or_create(namespace.as_deref());
        grammar.add_document(&system_id);
        grammar
    }

    pub(crate) fn origin_of(&self, doc: DocId, node: &Arc<SchemaElement>) -> DeclOrigin {
        self.origins
            .get(&node_key(node))
            .copied()
            .unwrap_or(DeclOrigin::new(doc, usize::MAX))
    }

    /// Qualified name of a top-level declaration, after redefine renaming
    pub(crate) fn global_name(&self, doc: DocId, node: &Arc<SchemaElement>, local: &str) -> QName {
        if let Some(renamed) = self.renamed.get(&node_key(node)) {
            return renamed.clone();
        }
        QName::new(self.docs[doc].target_namespace(), local)
    }

    /// Record a top-level node before traversal
    ///
    /// Returns false when another declaration already holds the name.
    pub(crate) fn register_global(
        &mut self,
        doc: DocId,
        kind: DeclKind,
        name: QName,
        node: Arc<SchemaElement>,
        redefine: Option<Arc<SchemaElement>>,
        position: usize,
    ) -> bool {
        self.origins
            .insert(node_key(&node), DeclOrigin::new(doc, position));
        let entry = RegistryEntry { doc, node, redefine };
        let key = (kind, name);
        match self.registry.get(&key) {
            Some(existing) if Arc::ptr_eq(&existing.node, &entry.node) => true,
            Some(existing) => {
                tracing::debug!(name = %key.1, kind = kind.label(), "duplicate global declaration");
                // tolerance only covers declarations from different documents
                let same_document = existing.doc == doc;
                if !self.options.tolerate_duplicates || same_document {
                    let name = key.1.to_string();
                    self.report(doc, &entry.node, keys::SCH_PROPS_CORRECT_2, vec![name]);
                }
                if self.options.tolerate_duplicates {
                    self.registry.insert(key, entry);
                }
                false
            }
            None => {
                tracing::trace!(name = %key.1, kind = kind.label(), "registered global declaration");
                self.registry.insert(key, entry);
                true
            }
        }
    }

    /// Move a registered declaration to a new name
    pub(crate) fn rename_global(&mut self, kind: DeclKind, name: &QName, renamed: QName) -> Option<Arc<SchemaElement>> {
        let entry = self.registry.shift_remove(&(kind, name.clone()))?;
        let node = entry.node.clone();
        self.renamed.insert(node_key(&node), renamed.clone());
        self.registry.insert((kind, renamed), entry);
        Some(node)
    }

    /// Resolve a reference to a global declaration
    ///
    /// Checks that the referencing document may see the namespace, then
    /// traverses the declaration on demand if it has not been built yet.
    /// Unresolvable references are reported as `src-resolve` and yield
    /// `None`.
    pub fn get_global_decl(
        &mut self,
        doc: DocId,
        kind: DeclKind,
        name: &QName,
        referrer: &SchemaElement,
    ) -> Option<GlobalDecl> {
        let namespace = name.namespace();
        if !self.docs[doc].is_namespace_allowed(namespace) && self.docs[doc].needs_namespace_report(namespace) {
            let key = if namespace.is_none() {
                keys::SRC_RESOLVE_4_1
            } else {
                keys::SRC_RESOLVE_4_2
            };
            let args = vec![
                self.docs[doc].system_id.clone(),
                namespace.unwrap_or("").to_string(),
                name.local_name.clone(),
            ];
            self.report(doc, referrer, key, args);
        }

        if kind == DeclKind::Type
            && namespace == Some(XSD_NAMESPACE)
            && BUILTIN_TYPES.contains(&name.local_name.as_str())
        {
            return Some(GlobalDecl::Declared(name.clone()));
        }

        if let Some(entry) = self.registry.get(&(kind, name.clone())).cloned() {
            let key = node_key(&entry.node);
            if self.in_progress.contains(&key) {
                match kind {
                    DeclKind::Group => {
                        self.report(doc, referrer, keys::MG_PROPS_CORRECT_2, vec![name.to_string()]);
                        return None;
                    }
                    DeclKind::AttributeGroup => {
                        self.report(doc, referrer, keys::SRC_ATTRIBUTE_GROUP_3, vec![name.to_string()]);
                        return None;
                    }
                    // recursive element and type references are legal
                    _ => return Some(GlobalDecl::Declared(name.clone())),
                }
            }
            if !self.traversed.contains(&key) {
                tracing::trace!(name = %name, kind = kind.label(), "traversing on demand");
                self.traverse_global_node(entry.doc, kind, &entry.node, entry.redefine.as_ref());
            }
        }

        if let Some(found) = self.lookup_grammar(kind, name) {
            return Some(found);
        }
        self.report(
            doc,
            referrer,
            keys::SRC_RESOLVE,
            vec![name.to_string(), kind.label().to_string()],
        );
        None
    }

    fn lookup_grammar(&self, kind: DeclKind, name: &QName) -> Option<GlobalDecl> {
        let grammar = self.grammars.get(name.namespace())?;
        match kind {
            DeclKind::Group => grammar.groups.get(name).cloned().map(GlobalDecl::Group),
            DeclKind::AttributeGroup => grammar
                .attribute_groups
                .get(name)
                .cloned()
                .map(GlobalDecl::AttributeGroup),
            DeclKind::Attribute => grammar.attributes.get(name).cloned().map(GlobalDecl::Attribute),
            DeclKind::IdentityConstraint => grammar
                .identity_constraints
                .get(name)
                .cloned()
                .map(GlobalDecl::IdentityConstraint),
            DeclKind::Element => grammar
                .elements
                .contains(name)
                .then(|| GlobalDecl::Declared(name.clone())),
            DeclKind::Type => grammar
                .types
                .contains(name)
                .then(|| GlobalDecl::Declared(name.clone())),
            DeclKind::Notation => grammar
                .notations
                .contains(name)
                .then(|| GlobalDecl::Declared(name.clone())),
        }
    }

    /// Traverse one top-level declaration unless that already happened
    pub(crate) fn traverse_global_node(
        &mut self,
        doc: DocId,
        kind: DeclKind,
        node: &Arc<SchemaElement>,
        redefine: Option<&Arc<SchemaElement>>,
    ) {
        let key = node_key(node);
        if self.traversed.contains(&key) || self.in_progress.contains(&key) {
            return;
        }
        self.in_progress.insert(key);

        let scope = self.docs[doc].backup_scope();
        if let Some(redefine) = redefine {
            self.docs[doc].push_scope(&redefine.namespace_decls);
        }
        let saved_redefining = self.redefining.take();
        let saved_depth = std::mem::take(&mut self.depth);
        if let Some(original) = self.redefine_targets.get(&key) {
            let name = node
                .attribute("name")
                .map(|n| QName::new(self.docs[doc].target_namespace(), n.trim()));
            if let Some(name) = name {
                self.redefining = Some(RedefineScope {
                    kind,
                    name,
                    original: original.clone(),
                    self_refs: Vec::new(),
                });
            }
        }

        match (kind, node.local_name()) {
            (DeclKind::Group, _) => {
                groups::traverse_global(self, doc, node);
            }
            (DeclKind::AttributeGroup, _) => {
                attribute_groups::traverse_global(self, doc, node);
            }
            (DeclKind::Attribute, _) => {
                attributes::traverse_global(self, doc, node);
            }
            (DeclKind::Element, _) => {
                elements::traverse_global(self, doc, node);
            }
            (DeclKind::Type, "complexType") => {
                types::traverse_global_complex(self, doc, node);
            }
            (DeclKind::Type, _) => {
                types::traverse_global_simple(self, doc, node);
            }
            (DeclKind::Notation, _) => {
                types::traverse_notation(self, doc, node);
            }
            (DeclKind::IdentityConstraint, _) => {}
        }

        self.depth = saved_depth;
        self.redefining = saved_redefining;
        self.docs[doc].restore_scope(scope);
        self.in_progress.remove(&key);
        self.traversed.insert(key);
    }

    /// The redefinition being traversed, if it redefines `name` of `kind`
    pub(crate) fn redefine_self_reference(&mut self, kind: DeclKind, name: &QName, occurs: Occurs) -> Option<QName> {
        let scope = self.redefining.as_mut()?;
        if scope.kind != kind || &scope.name != name {
            return None;
        }
        scope.self_refs.push(occurs);
        Some(scope.original.clone())
    }
}
