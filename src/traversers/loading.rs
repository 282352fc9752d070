//! Loading schema documents and registering their top-level declarations
//!
//! The root document is parsed and every `include`, `import` and
//! `redefine` is followed recursively. Each location is loaded once.
//! Declarations are registered by name as their document is processed;
//! `redefine` renames the original declaration so the redefinition can
//! take its name.

use std::sync::Arc;

use crate::diagnostics::keys;
use crate::documents::{SchemaDocument, SchemaElement};
use crate::error::{Error, Result};
use crate::locations::resolve_location;
use crate::namespaces::QName;
use crate::XSD_NAMESPACE;

use super::attribute_checker::AttrIndex;
use super::context::{node_key, DeclKind, TraversalContext};
use super::document_info::{DocId, XsDocumentInfo};

/// Suffix given to a declaration replaced through `redefine`
const REDEFINED_SUFFIX: &str = "_redefined";

/// How a document was reached
#[derive(Debug, Clone, PartialEq, Eq)]
enum Reference {
    Include(Option<String>),
    Redefine(Option<String>),
    Import(Option<String>),
}

/// Parse and register the root document and everything it references
pub(crate) fn load_root(ctx: &mut TraversalContext, text: &str, system_id: &str) -> Result<DocId> {
    ctx.options.limits.check_xml_size(text.len())?;
    let document = SchemaDocument::parse_str(
        text,
        Some(system_id),
        ctx.options.event_source,
        &ctx.options.limits,
    )?;
    let id = ctx.docs.len();
    let info = XsDocumentInfo::new(id, &document, &mut ctx.checker, &mut ctx.reporter)?;
    tracing::debug!(system_id, target_namespace = ?info.target_namespace(), "loaded root schema document");
    ctx.docs.push(info);
    ctx.locations.insert(system_id.to_string(), id);
    process_document(ctx, id, 0);
    Ok(id)
}

fn fetch(ctx: &TraversalContext, system_id: &str) -> Result<String> {
    let resolver = ctx
        .resolver
        .as_ref()
        .ok_or_else(|| Error::Resource(format!("no resolver available for '{}'", system_id)))?;
    let text = resolver.resolve(system_id)?;
    ctx.options.limits.check_xml_size(text.len())?;
    Ok(text)
}

fn unreadable(ctx: &mut TraversalContext, from: DocId, element: &SchemaElement, location: String, err: Error) {
    tracing::warn!(location = %location, error = %err, "referenced schema document skipped");
    ctx.warn(from, element, keys::SCHEMA_REFERENCE_4, vec![location, err.to_string()]);
}

fn load_referenced(
    ctx: &mut TraversalContext,
    from: DocId,
    element: &SchemaElement,
    location: &str,
    reference: Reference,
    depth: usize,
) -> Option<DocId> {
    let system_id = match resolve_location(location, Some(&ctx.docs[from].system_id)) {
        Ok(system_id) => system_id,
        Err(err) => {
            unreadable(ctx, from, element, location.to_string(), err);
            return None;
        }
    };
    if let Some(&id) = ctx.locations.get(&system_id) {
        return Some(id);
    }
    if let Err(err) = ctx.options.limits.check_schema_depth(depth + 1) {
        ctx.report(from, element, keys::SCHEMA_DEPTH_EXCEEDED, vec![system_id, err.to_string()]);
        return None;
    }

    let parsed = fetch(ctx, &system_id).and_then(|text| {
        SchemaDocument::parse_str(
            &text,
            Some(&system_id),
            ctx.options.event_source,
            &ctx.options.limits,
        )
    });
    let document = match parsed {
        Ok(document) => document,
        Err(err) => {
            unreadable(ctx, from, element, system_id, err);
            return None;
        }
    };

    let id = ctx.docs.len();
    let mut info = match XsDocumentInfo::new(id, &document, &mut ctx.checker, &mut ctx.reporter) {
        Ok(info) => info,
        Err(err) => {
            unreadable(ctx, from, element, system_id, err);
            return None;
        }
    };

    let mismatch = match &reference {
        Reference::Include(expected) | Reference::Redefine(expected) => match info.target_namespace() {
            None => {
                info.set_chameleon_namespace(expected.as_deref());
                None
            }
            Some(found) if Some(found) == expected.as_deref() => None,
            Some(found) => Some((keys::SRC_INCLUDE_2_1, found.to_string(), expected.clone())),
        },
        Reference::Import(expected) => {
            if info.target_namespace() == expected.as_deref() {
                None
            } else {
                let found = info.target_namespace().unwrap_or("").to_string();
                Some((keys::SRC_IMPORT_3_1, found, expected.clone()))
            }
        }
    };
    if let Some((key, found, expected)) = mismatch {
        info.release(&mut ctx.checker);
        ctx.report(
            from,
            element,
            key,
            vec![system_id, found, expected.unwrap_or_default()],
        );
        return None;
    }

    tracing::debug!(
        system_id = %system_id,
        target_namespace = ?info.target_namespace(),
        chameleon = info.is_chameleon(),
        "loaded referenced schema document"
    );
    ctx.docs.push(info);
    ctx.locations.insert(system_id, id);
    process_document(ctx, id, depth + 1);
    Some(id)
}

/// Follow directives and register the declarations of one document
fn process_document(ctx: &mut TraversalContext, id: DocId, depth: usize) {
    let root = ctx.docs[id].root.clone();
    for (position, child) in root.child_elements().iter().enumerate() {
        if child.namespace() != Some(XSD_NAMESPACE) {
            ctx.report(id, child, keys::ELT_INVALID_CONTENT, vec!["schema".into(), child.local_name().into()]);
            continue;
        }
        match child.local_name() {
            "include" | "import" | "redefine" => {
                ctx.in_element_scope(id, child, |ctx| directive(ctx, id, child, depth, position));
            }
            "annotation" => {}
            local => match DeclKind::from_local_name(local) {
                Some(kind) => register(ctx, id, kind, child, None, position),
                None => ctx.report(id, child, keys::ELT_INVALID_CONTENT, vec!["schema".into(), local.into()]),
            },
        }
    }
}

fn register(
    ctx: &mut TraversalContext,
    doc: DocId,
    kind: DeclKind,
    node: &Arc<SchemaElement>,
    redefine: Option<&Arc<SchemaElement>>,
    position: usize,
) {
    // unnamed declarations are reported when traversed
    let Some(name) = node.attribute("name").map(str::trim) else {
        return;
    };
    let qname = QName::new(ctx.docs[doc].target_namespace(), name);
    ctx.register_global(doc, kind, qname, node.clone(), redefine.cloned(), position);
}

fn directive(ctx: &mut TraversalContext, id: DocId, element: &Arc<SchemaElement>, depth: usize, position: usize) {
    let Some(attrs) = ctx.check_attributes(id, element, false) else {
        return;
    };
    let location = attrs.string(AttrIndex::SchemaLocation);
    let namespace = attrs.string(AttrIndex::Namespace);
    ctx.return_attr_array(attrs);

    let own_namespace = ctx.docs[id].target_namespace().map(str::to_string);
    match element.local_name() {
        "include" => {
            if let Some(location) = location {
                load_referenced(ctx, id, element, &location, Reference::Include(own_namespace), depth);
            }
        }
        "import" => {
            let namespace = namespace.filter(|ns| !ns.is_empty());
            if namespace == own_namespace {
                ctx.report(id, element, keys::SRC_IMPORT_1_1, vec![namespace.clone().unwrap_or_default()]);
                return;
            }
            ctx.docs[id].allow_namespace(namespace.as_deref());
            if let Some(location) = location {
                load_referenced(ctx, id, element, &location, Reference::Import(namespace), depth);
            }
        }
        _ => {
            let Some(location) = location else {
                return;
            };
            let target = load_referenced(ctx, id, element, &location, Reference::Redefine(own_namespace), depth);
            redefine_children(ctx, id, element, target.is_some(), position);
        }
    }
}

/// Rename each redefined original and register its replacement
fn redefine_children(
    ctx: &mut TraversalContext,
    id: DocId,
    redefine: &Arc<SchemaElement>,
    loaded: bool,
    position: usize,
) {
    for child in redefine.child_elements() {
        if child.is_xsd("annotation") {
            continue;
        }
        let kind = match child.local_name() {
            "group" | "attributeGroup" | "complexType" | "simpleType" if child.namespace() == Some(XSD_NAMESPACE) => {
                DeclKind::from_local_name(child.local_name())
            }
            _ => None,
        };
        let Some(kind) = kind else {
            ctx.report(id, child, keys::ELT_INVALID_CONTENT, vec!["redefine".into(), child.local_name().into()]);
            continue;
        };
        let Some(name) = child.attribute("name").map(str::trim) else {
            continue;
        };
        let qname = QName::new(ctx.docs[id].target_namespace(), name);
        if loaded {
            let renamed = QName::new(qname.namespace(), format!("{}{}", name, REDEFINED_SUFFIX));
            if ctx.rename_global(kind, &qname, renamed.clone()).is_some() {
                ctx.redefine_targets.insert(node_key(child), renamed);
            } else {
                ctx.report(id, child, keys::SRC_REDEFINE_1, vec![qname.to_string(), kind.label().into()]);
            }
        }
        register(ctx, id, kind, child, Some(redefine), position);
    }
}
