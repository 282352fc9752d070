//! Schema document traversers
//!
//! One traverser per schema construct turns the elements of a parsed
//! schema document into grammar components. They share a
//! [`TraversalContext`] which owns the per-document contexts, the attribute
//! checker, the particle accumulator and the grammar bucket.
//!
//! A schema set is built in three phases:
//!
//! 1. [`TraversalContext::load_str`] parses the root document, follows
//!    `include`, `import` and `redefine`, and registers every top-level
//!    declaration by name.
//! 2. [`TraversalContext::traverse_globals`] traverses each top-level
//!    declaration in document order. References to declarations that were
//!    not traversed yet are traversed on demand.
//! 3. Also part of `traverse_globals`: queued keyrefs and group
//!    restrictions are checked once every declaration exists.

pub mod accumulator;
pub mod annotations;
pub mod attribute_checker;
pub mod attribute_groups;
pub mod attributes;
pub mod context;
pub mod document_info;
pub mod elements;
pub mod groups;
pub mod identities;
mod loading;
pub mod particles;
pub mod types;
pub mod wildcards;

pub use accumulator::{FrameId, ParticleAccumulator};
pub use annotations::traverse_annotation;
pub use attribute_checker::{AttrArray, AttrIndex, AttrValue, AttributeChecker, DerivationSet, Form};
pub use context::{DeclKind, GlobalDecl, TraversalContext};
pub use document_info::{DocId, XsDocumentInfo};
pub use particles::{traverse_all, traverse_choice, traverse_sequence, ParticleContext};

use crate::error::Result;
use crate::XSD_NAMESPACE;

impl TraversalContext {
    /// Load the root document at `system_id` and everything it references
    ///
    /// Fails only when the root document itself cannot be read; problems
    /// with referenced documents are reported as diagnostics.
    pub fn load_str(&mut self, text: &str, system_id: &str) -> Result<DocId> {
        loading::load_root(self, text, system_id)
    }

    /// Traverse every registered document, then run the deferred checks
    pub fn traverse_globals(&mut self) {
        for doc in 0..self.docs.len() {
            self.traverse_document(doc);
        }
        identities::resolve_pending_keyrefs(self);
        groups::check_deferred_restrictions(self);

        let TraversalContext { docs, checker, .. } = self;
        for info in docs.iter_mut() {
            info.release(checker);
        }
        let outstanding = self.checker.outstanding();
        if outstanding != 0 {
            tracing::warn!(outstanding, "attribute arrays were not returned to the pool");
        }
    }

    fn traverse_document(&mut self, doc: DocId) {
        let root = self.docs[doc].root.clone();
        tracing::debug!(system_id = %self.docs[doc].system_id, "traversing schema document");
        for child in root.child_elements() {
            if child.namespace() != Some(XSD_NAMESPACE) {
                continue;
            }
            match child.local_name() {
                "annotation" => {
                    let annotation = traverse_annotation(self, doc, child);
                    self.docs[doc].add_annotation(annotation);
                }
                "redefine" => {
                    for nested in child.child_elements() {
                        if nested.is_xsd("annotation") {
                            let annotation = traverse_annotation(self, doc, nested);
                            self.docs[doc].add_annotation(annotation);
                            continue;
                        }
                        let redefinable = matches!(
                            nested.local_name(),
                            "group" | "attributeGroup" | "complexType" | "simpleType"
                        );
                        if let Some(kind) = DeclKind::from_local_name(nested.local_name()).filter(|_| redefinable) {
                            self.traverse_global_node(doc, kind, nested, Some(child));
                        }
                    }
                }
                local => {
                    if let Some(kind) = DeclKind::from_local_name(local) {
                        self.traverse_global_node(doc, kind, child, None);
                    }
                }
            }
        }
        let annotations = self.docs[doc].take_annotations();
        self.grammar_mut(doc).annotations.extend(annotations);
    }
}
