//! `attribute` declarations and uses

use std::sync::Arc;

use crate::components::{AttributeDecl, AttributeUse, AttributeUseMode, ValueConstraint};
use crate::diagnostics::keys;
use crate::documents::SchemaElement;
use crate::namespaces::QName;

use super::annotations::leading_annotation;
use super::attribute_checker::{AttrArray, AttrIndex, Form};
use super::context::{DeclKind, GlobalDecl, TraversalContext};
use super::document_info::DocId;

fn value_constraint(
    ctx: &mut TraversalContext,
    doc: DocId,
    element: &SchemaElement,
    attrs: &AttrArray,
) -> Option<ValueConstraint> {
    let default = attrs.string(AttrIndex::Default);
    let fixed = attrs.string(AttrIndex::Fixed);
    match (default, fixed) {
        (Some(_), Some(_)) => {
            ctx.report(doc, element, keys::SRC_ATTRIBUTE_1, vec![element.local_name().to_string()]);
            None
        }
        (Some(d), None) => Some(ValueConstraint::Default(d)),
        (None, Some(f)) => Some(ValueConstraint::Fixed(f)),
        (None, None) => None,
    }
}

/// `(annotation?, simpleType?)`; returns whether an anonymous type was present
fn traverse_content(ctx: &mut TraversalContext, doc: DocId, element: &SchemaElement, label: &str) -> (Vec<crate::components::Annotation>, bool) {
    let (annotations, start) = leading_annotation(ctx, doc, element);
    let mut has_simple_type = false;
    for (i, child) in element.child_elements().iter().enumerate().skip(start) {
        if i == start && child.is_xsd("simpleType") {
            if let Some(attrs) = ctx.check_attributes(doc, child, false) {
                ctx.return_attr_array(attrs);
            }
            has_simple_type = true;
            continue;
        }
        ctx.report(
            doc,
            child,
            keys::ELT_MUST_MATCH_1,
            vec![label.to_string(), "(annotation?, (simpleType?))".to_string(), child.local_name().to_string()],
        );
    }
    (annotations, has_simple_type)
}

/// Traverse a local `attribute` into an attribute use
pub fn traverse_local(ctx: &mut TraversalContext, doc: DocId, element: &Arc<SchemaElement>) -> Option<AttributeUse> {
    ctx.in_element_scope(doc, element, |ctx| {
        let attrs = ctx.check_attributes(doc, element, false)?;
        let name = attrs.string(AttrIndex::Name);
        let reference = attrs.qname(AttrIndex::Ref);
        let type_name = attrs.qname(AttrIndex::Type);
        let form = attrs.form(AttrIndex::Form);
        let mode = attrs.use_mode();
        let constraint = value_constraint(ctx, doc, element, &attrs);
        ctx.return_attr_array(attrs);

        let (annotations, has_simple_type) = traverse_content(ctx, doc, element, "attribute (local)");

        if matches!(constraint, Some(ValueConstraint::Default(_))) && mode != AttributeUseMode::Optional {
            ctx.report(doc, element, keys::SRC_ATTRIBUTE_2, vec![name.clone().unwrap_or_default()]);
        }

        let decl = match (name, reference) {
            (Some(_), Some(_)) | (None, None) => {
                ctx.report(doc, element, keys::SRC_ATTRIBUTE_3_1, vec!["attribute (local)".into()]);
                return None;
            }
            (None, Some(reference)) => match ctx.get_global_decl(doc, DeclKind::Attribute, &reference, element)? {
                GlobalDecl::Attribute(decl) => decl,
                _ => return None,
            },
            (Some(name), None) => {
                let info = ctx.document(doc);
                let qualified = match form {
                    Some(form) => form == Form::Qualified,
                    None => info.attribute_form_qualified,
                };
                let namespace = if qualified { info.target_namespace() } else { None };
                let mut decl = AttributeDecl::new(QName::new(namespace, name));
                if let Some(type_name) = &type_name {
                    ctx.get_global_decl(doc, DeclKind::Type, type_name, element);
                }
                decl.type_name = type_name.filter(|_| !has_simple_type);
                decl.value_constraint = constraint.clone();
                decl.annotations = annotations;
                Arc::new(decl)
            }
        };

        Some(AttributeUse {
            decl,
            mode,
            value_constraint: constraint,
        })
    })
}

/// Traverse a global `attribute` and register it
pub fn traverse_global(
    ctx: &mut TraversalContext,
    doc: DocId,
    element: &Arc<SchemaElement>,
) -> Option<Arc<AttributeDecl>> {
    ctx.in_element_scope(doc, element, |ctx| {
        let attrs = ctx.check_attributes(doc, element, true)?;
        let name = attrs.string(AttrIndex::Name);
        let type_name = attrs.qname(AttrIndex::Type);
        let constraint = value_constraint(ctx, doc, element, &attrs);
        ctx.return_attr_array(attrs);

        let (annotations, has_simple_type) = traverse_content(ctx, doc, element, "attribute (global)");
        if let Some(type_name) = &type_name {
            ctx.get_global_decl(doc, DeclKind::Type, type_name, element);
        }

        let qname = ctx.global_name(doc, element, &name?);
        let mut decl = AttributeDecl::new(qname.clone());
        decl.type_name = type_name.filter(|_| !has_simple_type);
        decl.value_constraint = constraint;
        decl.global = true;
        decl.annotations = annotations;
        let decl = Arc::new(decl);

        let origin = ctx.origin_of(doc, element);
        let policy = ctx.duplicate_policy();
        let system_id = ctx.document(doc).system_id.clone();
        let grammar = ctx.grammar_mut(doc);
        grammar.attributes.add(qname.clone(), decl.clone(), origin, policy);
        grammar.attributes.add_extended(&system_id, qname, decl.clone());
        Some(decl)
    })
}
