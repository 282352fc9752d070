//! Attribute groups and the attribute content shared with complex types

use std::sync::Arc;

use crate::components::{AttributeGroup, AttributeUse};
use crate::diagnostics::keys;
use crate::documents::SchemaElement;
use crate::grammar::{RedefinedKind, RedefinitionRecord};
use crate::namespaces::QName;

use super::annotations::{leading_annotation, reject_content};
use super::attribute_checker::AttrIndex;
use super::context::{DeclKind, GlobalDecl, TraversalContext};
use super::document_info::DocId;
use super::{attributes, wildcards};

const ATTRIBUTE_GROUP_CONTENT: &str = "(annotation?, ((attribute | attributeGroup)*, anyAttribute?))";

/// Traverse an `attributeGroup ref="..."`
pub fn traverse_local(
    ctx: &mut TraversalContext,
    doc: DocId,
    element: &Arc<SchemaElement>,
) -> Option<Arc<AttributeGroup>> {
    ctx.in_element_scope(doc, element, |ctx| {
        let attrs = ctx.check_attributes(doc, element, false)?;
        let reference = attrs.qname(AttrIndex::Ref);
        ctx.return_attr_array(attrs);

        let (_, start) = leading_annotation(ctx, doc, element);
        reject_content(ctx, doc, element, start, "attributeGroup (local)");

        let reference = reference?;
        let target = ctx
            .redefine_self_reference(DeclKind::AttributeGroup, &reference, Default::default())
            .unwrap_or(reference);
        match ctx.get_global_decl(doc, DeclKind::AttributeGroup, &target, element)? {
            GlobalDecl::AttributeGroup(group) => Some(group),
            _ => None,
        }
    })
}

/// Traverse a global `attributeGroup` and register it
pub fn traverse_global(
    ctx: &mut TraversalContext,
    doc: DocId,
    element: &Arc<SchemaElement>,
) -> Option<Arc<AttributeGroup>> {
    ctx.in_element_scope(doc, element, |ctx| {
        let attrs = ctx.check_attributes(doc, element, true)?;
        let name = attrs.string(AttrIndex::Name);
        ctx.return_attr_array(attrs);

        let qname = name.as_deref().map(|n| ctx.global_name(doc, element, n));
        let (annotations, start) = leading_annotation(ctx, doc, element);
        let mut group = AttributeGroup::new(qname.clone());
        group.annotations = annotations;
        let children = element.child_elements();
        let next = traverse_attrs_and_attr_grps(ctx, doc, children, start, &mut group, false);
        if let Some(extra) = children.get(next) {
            ctx.report(
                doc,
                extra,
                keys::ELT_MUST_MATCH_1,
                vec![
                    "attributeGroup (global)".into(),
                    ATTRIBUTE_GROUP_CONTENT.into(),
                    extra.local_name().to_string(),
                ],
            );
        }
        group.remove_prohibited();

        let qname = qname?;
        let redefining = ctx
            .redefining
            .as_ref()
            .filter(|scope| scope.kind == DeclKind::AttributeGroup && scope.name == qname)
            .cloned();
        if let Some(scope) = redefining {
            match scope.self_refs.len() {
                0 => {
                    group.restricts = Some(scope.original.clone());
                    if let Some(GlobalDecl::AttributeGroup(original)) =
                        ctx.get_global_decl(doc, DeclKind::AttributeGroup, &scope.original, element)
                    {
                        if let Err(reason) = group.check_restriction(&original) {
                            ctx.report(doc, element, keys::SRC_REDEFINE_7_2_2, vec![qname.to_string(), reason]);
                        }
                    }
                }
                1 => {}
                _ => ctx.report(doc, element, keys::SRC_REDEFINE_7_1, vec![qname.to_string()]),
            }
            let system_id = ctx.document(doc).system_id.clone();
            ctx.redefinitions.push(RedefinitionRecord {
                kind: RedefinedKind::AttributeGroup,
                name: qname.clone(),
                original: scope.original,
                system_id,
                restriction: scope.self_refs.is_empty(),
            });
        }

        let group = Arc::new(group);
        let origin = ctx.origin_of(doc, element);
        let policy = ctx.duplicate_policy();
        let system_id = ctx.document(doc).system_id.clone();
        let grammar = ctx.grammar_mut(doc);
        grammar.attribute_groups.add(qname.clone(), group.clone(), origin, policy);
        grammar.attribute_groups.add_extended(&system_id, qname, group.clone());
        Some(group)
    })
}

/// Traverse `(attribute | attributeGroup)*, anyAttribute?` into `target`
///
/// Starts at `children[start]` and returns the index of the first child
/// that was not consumed. A prohibited use overrides a use of the same
/// name coming from a referenced group.
pub(crate) fn traverse_attrs_and_attr_grps(
    ctx: &mut TraversalContext,
    doc: DocId,
    children: &[Arc<SchemaElement>],
    start: usize,
    target: &mut AttributeGroup,
    in_complex_type: bool,
) -> usize {
    let duplicate_key = if in_complex_type {
        keys::CT_PROPS_CORRECT_4
    } else {
        keys::AG_PROPS_CORRECT_2
    };
    let owner = target
        .name
        .as_ref()
        .map_or_else(|| "(anonymous)".to_string(), QName::to_string);

    let mut index = start;
    while let Some(child) = children.get(index) {
        if child.is_xsd("attribute") {
            if let Some(attribute_use) = attributes::traverse_local(ctx, doc, child) {
                add_direct_use(ctx, doc, child, target, attribute_use, duplicate_key, &owner);
            }
        } else if child.is_xsd("attributeGroup") {
            if let Some(group) = traverse_local(ctx, doc, child) {
                merge_group(ctx, doc, child, target, &group, duplicate_key, &owner);
            }
        } else {
            break;
        }
        index += 1;
    }

    if let Some(child) = children.get(index) {
        if child.is_xsd("anyAttribute") {
            if let Some(wildcard) = wildcards::traverse_any_attribute(ctx, doc, child) {
                target.wildcard = Some(match &target.wildcard {
                    Some(existing) => Arc::new(wildcard.intersect(existing)),
                    None => wildcard,
                });
            }
            index += 1;
        }
    }
    index
}

fn add_direct_use(
    ctx: &mut TraversalContext,
    doc: DocId,
    child: &SchemaElement,
    target: &mut AttributeGroup,
    attribute_use: AttributeUse,
    duplicate_key: &'static str,
    owner: &str,
) {
    let name = attribute_use.name().clone();
    match target.uses.get(&name) {
        None => {
            target.uses.insert(name, attribute_use);
        }
        Some(existing) if attribute_use.is_prohibited() && !existing.is_prohibited() => {
            target.uses.insert(name, attribute_use);
        }
        Some(_) => {
            ctx.report(doc, child, duplicate_key, vec![name.to_string(), owner.to_string()]);
        }
    }
}

fn merge_group(
    ctx: &mut TraversalContext,
    doc: DocId,
    child: &SchemaElement,
    target: &mut AttributeGroup,
    group: &AttributeGroup,
    duplicate_key: &'static str,
    owner: &str,
) {
    for (name, other) in &group.uses {
        match target.uses.get(name) {
            None => {
                target.uses.insert(name.clone(), other.clone());
            }
            Some(existing) if existing.is_prohibited() => {}
            Some(existing) if Arc::ptr_eq(&existing.decl, &other.decl) => {}
            Some(_) => {
                ctx.report(doc, child, duplicate_key, vec![name.to_string(), owner.to_string()]);
            }
        }
    }
    if let Some(wildcard) = &group.wildcard {
        target.wildcard = Some(match &target.wildcard {
            Some(existing) => Arc::new(existing.intersect(wildcard)),
            None => wildcard.clone(),
        });
    }
}
