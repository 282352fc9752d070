//! Grammar store
//!
//! One [`SchemaGrammar`] per target namespace holds the global components
//! built by the traversers. Each component kind has a [`DeclTable`] with a
//! global map (what name resolution sees) and an extended map keyed by
//! `(system id, name)` that remembers the first declaration each document
//! contributed.

use indexmap::IndexMap;
use std::sync::Arc;

use crate::components::{
    Annotation, AttributeDecl, AttributeGroup, ComplexType, ElementDecl, IdentityConstraint,
    NamedGroup, NamedOnly,
};
use crate::namespaces::QName;

/// Where a global declaration came from, in traversal order
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DeclOrigin {
    /// Index of the schema document
    pub document: usize,
    /// Index of the component among the document's top-level children
    pub position: usize,
}

impl DeclOrigin {
    pub fn new(document: usize, position: usize) -> Self {
        Self { document, position }
    }
}

/// How a second global declaration of the same name is handled
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DuplicatePolicy {
    /// The earliest declaration stays resolvable
    #[default]
    KeepFirst,
    /// The latest declaration becomes resolvable
    Replace,
}

impl DuplicatePolicy {
    pub fn from_tolerance(tolerate_duplicates: bool) -> Self {
        if tolerate_duplicates {
            Self::Replace
        } else {
            Self::KeepFirst
        }
    }

    fn prefers(&self, incoming: DeclOrigin, existing: DeclOrigin) -> bool {
        match self {
            Self::KeepFirst => incoming < existing,
            Self::Replace => incoming >= existing,
        }
    }
}

#[derive(Debug, Clone)]
struct Entry<T> {
    decl: Arc<T>,
    origin: DeclOrigin,
}

/// Global and per-document declarations of one component kind
#[derive(Debug, Clone)]
pub struct DeclTable<T> {
    global: IndexMap<QName, Entry<T>>,
    extended: IndexMap<(String, QName), Arc<T>>,
}

impl<T> Default for DeclTable<T> {
    fn default() -> Self {
        Self {
            global: IndexMap::new(),
            extended: IndexMap::new(),
        }
    }
}

impl<T> DeclTable<T> {
    /// Add a global declaration; returns whether it is now the resolvable one
    pub fn add(&mut self, name: QName, decl: Arc<T>, origin: DeclOrigin, policy: DuplicatePolicy) -> bool {
        match self.global.get_mut(&name) {
            Some(entry) if !policy.prefers(origin, entry.origin) => false,
            Some(entry) => {
                *entry = Entry { decl, origin };
                true
            }
            None => {
                self.global.insert(name, Entry { decl, origin });
                true
            }
        }
    }

    /// Remember the declaration `system_id` made; the first one per name wins
    ///
    /// Returns the declaration already recorded for that document, if any.
    pub fn add_extended(&mut self, system_id: &str, name: QName, decl: Arc<T>) -> Option<Arc<T>> {
        let key = (system_id.to_string(), name);
        if let Some(existing) = self.extended.get(&key) {
            return Some(existing.clone());
        }
        self.extended.insert(key, decl);
        None
    }

    pub fn get(&self, name: &QName) -> Option<&Arc<T>> {
        self.global.get(name).map(|e| &e.decl)
    }

    pub fn get_extended(&self, system_id: &str, name: &QName) -> Option<&Arc<T>> {
        self.extended.get(&(system_id.to_string(), name.clone()))
    }

    pub fn origin(&self, name: &QName) -> Option<DeclOrigin> {
        self.global.get(name).map(|e| e.origin)
    }

    pub fn contains(&self, name: &QName) -> bool {
        self.global.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.global.len()
    }

    pub fn is_empty(&self) -> bool {
        self.global.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&QName, &Arc<T>)> {
        self.global.iter().map(|(k, e)| (k, &e.decl))
    }

    pub fn names(&self) -> impl Iterator<Item = &QName> {
        self.global.keys()
    }
}

/// A global type definition
#[derive(Debug, Clone, PartialEq)]
pub enum GlobalType {
    Complex(Arc<ComplexType>),
    Simple(NamedOnly),
}

/// Components of one target namespace
#[derive(Debug, Clone, Default)]
pub struct SchemaGrammar {
    pub target_namespace: Option<String>,
    pub groups: DeclTable<NamedGroup>,
    pub attribute_groups: DeclTable<AttributeGroup>,
    pub identity_constraints: DeclTable<IdentityConstraint>,
    pub elements: DeclTable<ElementDecl>,
    pub attributes: DeclTable<AttributeDecl>,
    pub types: DeclTable<GlobalType>,
    pub notations: DeclTable<NamedOnly>,
    pub annotations: Vec<Annotation>,
    /// System ids of the documents that contributed to this grammar
    pub documents: Vec<String>,
}

impl SchemaGrammar {
    pub fn new(target_namespace: Option<String>) -> Self {
        Self {
            target_namespace,
            ..Self::default()
        }
    }

    /// Identity constraints attached to the element declaration `element`
    pub fn identity_constraints_of<'a>(
        &'a self,
        element: &'a QName,
    ) -> impl Iterator<Item = &'a Arc<IdentityConstraint>> + 'a {
        self.identity_constraints
            .iter()
            .map(|(_, ic)| ic)
            .filter(move |ic| &ic.element_name == element)
    }

    /// Number of global components of every kind
    pub fn component_count(&self) -> usize {
        self.groups.len()
            + self.attribute_groups.len()
            + self.identity_constraints.len()
            + self.elements.len()
            + self.attributes.len()
            + self.types.len()
            + self.notations.len()
    }

    pub(crate) fn add_document(&mut self, system_id: &str) {
        if !self.documents.iter().any(|d| d == system_id) {
            self.documents.push(system_id.to_string());
        }
    }
}

/// All grammars of a schema set, keyed by target namespace
#[derive(Debug, Clone, Default)]
pub struct GrammarBucket {
    grammars: IndexMap<Option<String>, SchemaGrammar>,
}

impl GrammarBucket {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, namespace: Option<&str>) -> Option<&SchemaGrammar> {
        self.grammars.get(&namespace.map(str::to_string))
    }

    /// Grammar for `namespace`, created on first use
    pub fn get_or_create(&mut self, namespace: Option<&str>) -> &mut SchemaGrammar {
        self.grammars
            .entry(namespace.map(str::to_string))
            .or_insert_with(|| SchemaGrammar::new(namespace.map(str::to_string)))
    }

    pub fn iter(&self) -> impl Iterator<Item = &SchemaGrammar> {
        self.grammars.values()
    }

    pub fn len(&self) -> usize {
        self.grammars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.grammars.is_empty()
    }
}

/// Kind of component a `redefine` replaced
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub enum RedefinedKind {
    Group,
    AttributeGroup,
    ComplexType,
    SimpleType,
}

/// A component replaced through `redefine`
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct RedefinitionRecord {
    pub kind: RedefinedKind,
    pub name: QName,
    /// Name the original declaration was renamed to
    pub original: QName,
    /// System id of the redefining document
    pub system_id: String,
    /// Redefined by restriction rather than by self-reference
    pub restriction: bool,
}
