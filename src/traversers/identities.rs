//! Identity constraints: `unique`, `key` and `keyref`
//!
//! `unique` and `key` are registered while their element is traversed.
//! A `keyref` is queued with a snapshot of the namespace bindings in scope
//! and traversed once every element, and so every key, has been built.

use std::sync::Arc;

use crate::components::{Annotation, IdentityConstraint, IdentityConstraintKind};
use crate::diagnostics::keys;
use crate::documents::SchemaElement;
use crate::grammar::DuplicatePolicy;
use crate::namespaces::QName;
use crate::xpath::{parse_field, parse_selector, IdentityXPath, XPathError};

use super::annotations::{leading_annotation, reject_content};
use super::attribute_checker::AttrIndex;
use super::context::{DeclKind, GlobalDecl, PendingKeyref, TraversalContext};
use super::document_info::DocId;

const IDENTITY_CONTENT: &str = "(annotation?, selector, field+)";

/// Parsed `(annotation?, selector, field+)` content
#[derive(Debug, Clone)]
pub struct IdentityContent {
    pub annotations: Vec<Annotation>,
    pub selector: IdentityXPath,
    pub fields: Vec<IdentityXPath>,
}

/// Read the `xpath` of a `selector` or `field` and parse it
fn traverse_xpath(
    ctx: &mut TraversalContext,
    doc: DocId,
    element: &Arc<SchemaElement>,
) -> Option<IdentityXPath> {
    ctx.in_element_scope(doc, element, |ctx| {
        let attrs = ctx.check_attributes(doc, element, false)?;
        let expression = attrs.string(AttrIndex::XPath);
        ctx.return_attr_array(attrs);

        let (_, start) = leading_annotation(ctx, doc, element);
        reject_content(ctx, doc, element, start, element.local_name());

        let expression = expression?;
        let is_selector = element.local_name() == "selector";
        let parsed: Result<IdentityXPath, XPathError> = {
            let info = ctx.document(doc);
            let resolve = |prefix: &str| info.lookup_prefix(Some(prefix)).map(str::to_string);
            if is_selector {
                parse_selector(&expression, resolve)
            } else {
                parse_field(&expression, resolve)
            }
        };
        match parsed {
            Ok(xpath) => Some(xpath),
            Err(err) => {
                let key = if is_selector {
                    keys::C_SELECTOR_XPATH
                } else {
                    keys::C_FIELDS_XPATHS
                };
                ctx.report(doc, element, key, vec![expression, err.to_string()]);
                None
            }
        }
    })
}

/// Traverse the selector and fields shared by `unique`, `key` and `keyref`
///
/// Returns `None` when the content is malformed or an xpath fails to parse;
/// the constraint is then dropped.
pub fn traverse_identity_constraint(
    ctx: &mut TraversalContext,
    doc: DocId,
    element: &SchemaElement,
    label: &str,
) -> Option<IdentityContent> {
    let (annotations, start) = leading_annotation(ctx, doc, element);
    let children = element.child_elements();

    let Some(selector_node) = children.get(start) else {
        ctx.report(doc, element, keys::ELT_MUST_MATCH_2, vec![label.to_string(), IDENTITY_CONTENT.into()]);
        return None;
    };
    if !selector_node.is_xsd("selector") {
        ctx.report(
            doc,
            selector_node,
            keys::ELT_MUST_MATCH_1,
            vec![label.to_string(), IDENTITY_CONTENT.into(), selector_node.local_name().to_string()],
        );
        return None;
    }
    let selector = traverse_xpath(ctx, doc, selector_node)?;

    let mut fields = Vec::new();
    for child in &children[start + 1..] {
        if !child.is_xsd("field") {
            ctx.report(
                doc,
                child,
                keys::ELT_MUST_MATCH_1,
                vec![label.to_string(), IDENTITY_CONTENT.into(), child.local_name().to_string()],
            );
            continue;
        }
        fields.push(traverse_xpath(ctx, doc, child)?);
    }
    if fields.is_empty() {
        ctx.report(doc, element, keys::ELT_MUST_MATCH_2, vec![label.to_string(), IDENTITY_CONTENT.into()]);
        return None;
    }

    Some(IdentityContent {
        annotations,
        selector,
        fields,
    })
}

fn register(ctx: &mut TraversalContext, doc: DocId, element: &Arc<SchemaElement>, constraint: IdentityConstraint) {
    let name = constraint.name.clone();
    let origin = ctx.origin_of(doc, element);
    let policy = ctx.duplicate_policy();
    let system_id = ctx.document(doc).system_id.clone();
    if let Some(existing) = ctx.grammar_mut(doc).identity_constraints.origin(&name) {
        if policy == DuplicatePolicy::KeepFirst || existing.document == doc {
            ctx.report(doc, element, keys::SCH_PROPS_CORRECT_2, vec![name.to_string()]);
        }
        if policy == DuplicatePolicy::KeepFirst {
            return;
        }
    }
    let constraint = Arc::new(constraint);
    let grammar = ctx.grammar_mut(doc);
    grammar.identity_constraints.add(name.clone(), constraint.clone(), origin, policy);
    grammar.identity_constraints.add_extended(&system_id, name, constraint);
}

/// Traverse a `unique` or `key` belonging to `element_name`
pub fn traverse_unique_or_key(
    ctx: &mut TraversalContext,
    doc: DocId,
    element: &Arc<SchemaElement>,
    element_name: &QName,
) {
    ctx.in_element_scope(doc, element, |ctx| {
        let Some(attrs) = ctx.check_attributes(doc, element, false) else {
            return;
        };
        let name = attrs.string(AttrIndex::Name);
        ctx.return_attr_array(attrs);

        let Some(kind) = IdentityConstraintKind::from_local_name(element.local_name()) else {
            return;
        };
        let Some(content) = traverse_identity_constraint(ctx, doc, element, kind.as_str()) else {
            return;
        };
        let Some(name) = name else {
            return;
        };
        let qname = QName::new(ctx.document(doc).target_namespace(), name);
        let constraint = IdentityConstraint {
            name: qname,
            element_name: element_name.clone(),
            kind,
            selector: content.selector,
            fields: content.fields,
            refer: None,
            annotations: content.annotations,
        };
        register(ctx, doc, element, constraint);
    })
}

/// Queue a `keyref` until all keys exist
pub fn defer_keyref(ctx: &mut TraversalContext, doc: DocId, element: &Arc<SchemaElement>, element_name: &QName) {
    let namespaces = ctx.document(doc).namespace_snapshot();
    ctx.pending_keyrefs.push(PendingKeyref {
        doc,
        node: element.clone(),
        element_name: element_name.clone(),
        namespaces,
    });
}

/// Traverse a `keyref` of `element_name`
///
/// `refer` must name a `key` or `unique` with the same number of fields.
pub fn traverse_keyref(
    ctx: &mut TraversalContext,
    doc: DocId,
    element: &Arc<SchemaElement>,
    element_name: &QName,
) {
    ctx.in_element_scope(doc, element, |ctx| {
        let Some(attrs) = ctx.check_attributes(doc, element, false) else {
            return;
        };
        let name = attrs.string(AttrIndex::Name);
        let refer = attrs.qname(AttrIndex::Refer);
        ctx.return_attr_array(attrs);

        let (Some(name), Some(refer)) = (name, refer) else {
            return;
        };
        let key = match ctx.get_global_decl(doc, DeclKind::IdentityConstraint, &refer, element) {
            Some(GlobalDecl::IdentityConstraint(key)) if key.is_referenceable() => key,
            Some(GlobalDecl::IdentityConstraint(_)) => {
                ctx.report(
                    doc,
                    element,
                    keys::SRC_RESOLVE,
                    vec![refer.to_string(), "identity constraint key/unique".into()],
                );
                return;
            }
            _ => return,
        };

        let Some(content) = traverse_identity_constraint(ctx, doc, element, "keyref") else {
            return;
        };
        let qname = QName::new(ctx.document(doc).target_namespace(), name);
        if key.field_count() != content.fields.len() {
            ctx.report(
                doc,
                element,
                keys::C_PROPS_CORRECT_2,
                vec![qname.to_string(), key.name.to_string()],
            );
            return;
        }
        let constraint = IdentityConstraint {
            name: qname,
            element_name: element_name.clone(),
            kind: IdentityConstraintKind::Keyref,
            selector: content.selector,
            fields: content.fields,
            refer: Some(key),
            annotations: content.annotations,
        };
        register(ctx, doc, element, constraint);
    })
}

/// Traverse every queued keyref in its captured namespace scope
pub(crate) fn resolve_pending_keyrefs(ctx: &mut TraversalContext) {
    let pending = std::mem::take(&mut ctx.pending_keyrefs);
    for keyref in pending {
        let depth = ctx.document_mut(keyref.doc).backup_scope_with(&keyref.namespaces);
        traverse_keyref(ctx, keyref.doc, &keyref.node, &keyref.element_name);
        ctx.document_mut(keyref.doc).restore_scope(depth);
    }
}
