//! Element declarations, global and local

use std::sync::Arc;

use crate::components::{ElementDecl, ElementTerm, Particle, Term, TypeReference, ValueConstraint};
use crate::diagnostics::keys;
use crate::documents::SchemaElement;
use crate::namespaces::QName;

use super::annotations::{leading_annotation, reject_content};
use super::attribute_checker::{AttrArray, AttrIndex, Form};
use super::context::{DeclKind, TraversalContext};
use super::document_info::DocId;
use super::particles::{check_occurrences, DeclaredOccurs, ParticleContext};
use super::{identities, types};

const ELEMENT_CONTENT: &str = "(annotation?, (simpleType | complexType)?, (unique | key | keyref)*)";

/// Properties copied out of the element's attribute array
struct ElementAttrs {
    name: Option<String>,
    reference: Option<QName>,
    type_name: Option<QName>,
    form: Option<Form>,
    nillable: bool,
    is_abstract: bool,
    substitution_group: Option<QName>,
    value_constraint: Option<ValueConstraint>,
    default_and_fixed: bool,
}

impl ElementAttrs {
    fn from_attrs(attrs: &AttrArray) -> Self {
        let default = attrs.string(AttrIndex::Default);
        let fixed = attrs.string(AttrIndex::Fixed);
        let default_and_fixed = default.is_some() && fixed.is_some();
        let value_constraint = match (default, fixed) {
            (_, Some(fixed)) => Some(ValueConstraint::Fixed(fixed)),
            (Some(default), None) => Some(ValueConstraint::Default(default)),
            (None, None) => None,
        };
        Self {
            name: attrs.string(AttrIndex::Name),
            reference: attrs.qname(AttrIndex::Ref),
            type_name: attrs.qname(AttrIndex::Type),
            form: attrs.form(AttrIndex::Form),
            nillable: attrs.bool(AttrIndex::Nillable),
            is_abstract: attrs.bool(AttrIndex::Abstract),
            substitution_group: attrs.qname(AttrIndex::SubstitutionGroup),
            value_constraint,
            default_and_fixed,
        }
    }
}

/// Traverse a local `element` into a particle
pub fn traverse_local(
    ctx: &mut TraversalContext,
    doc: DocId,
    element: &Arc<SchemaElement>,
    context: ParticleContext,
) -> Option<Particle> {
    ctx.in_element_scope(doc, element, |ctx| {
        let sole_in_sequence = context.contains(ParticleContext::SOLE_IN_SEQUENCE);
        let attrs = ctx.check_particle_attributes(doc, element, sole_in_sequence)?;
        let declared = DeclaredOccurs::from_attrs(&attrs);
        let props = ElementAttrs::from_attrs(&attrs);
        ctx.return_attr_array(attrs);

        let particle = match (&props.name, &props.reference) {
            (Some(_), Some(_)) | (None, None) => {
                ctx.report(doc, element, keys::SRC_ELEMENT_2_1, vec!["element (local)".into()]);
                return None;
            }
            (None, Some(reference)) => {
                let (annotations, start) = leading_annotation(ctx, doc, element);
                reject_content(ctx, doc, element, start, "element (local)");
                ctx.get_global_decl(doc, DeclKind::Element, reference, element)?;
                Particle::new(declared.occurs, Term::Element(ElementTerm::Global(reference.clone())))
                    .with_annotations(annotations)
            }
            (Some(name), None) => {
                let info = ctx.document(doc);
                let qualified = match props.form {
                    Some(form) => form == Form::Qualified,
                    None => info.element_form_qualified,
                };
                let namespace = if qualified { info.target_namespace() } else { None };
                let qname = QName::new(namespace, name.clone());
                let decl = build_decl(ctx, doc, element, qname, &props, false);
                Particle::new(declared.occurs, Term::Element(ElementTerm::Local(Arc::new(decl))))
            }
        };

        if context.contains(ParticleContext::ALL_ELEMENT) {
            return Some(check_occurrences(ctx, doc, element, particle, declared, context));
        }
        Some(particle)
    })
}

/// Traverse a global `element` and register it
pub fn traverse_global(
    ctx: &mut TraversalContext,
    doc: DocId,
    element: &Arc<SchemaElement>,
) -> Option<Arc<ElementDecl>> {
    ctx.in_element_scope(doc, element, |ctx| {
        let attrs = ctx.check_attributes(doc, element, true)?;
        let props = ElementAttrs::from_attrs(&attrs);
        ctx.return_attr_array(attrs);

        let name = props.name.clone()?;
        let qname = ctx.global_name(doc, element, &name);
        if let Some(group) = &props.substitution_group {
            ctx.get_global_decl(doc, DeclKind::Element, group, element);
        }
        let decl = Arc::new(build_decl(ctx, doc, element, qname.clone(), &props, true));

        let origin = ctx.origin_of(doc, element);
        let policy = ctx.duplicate_policy();
        let system_id = ctx.document(doc).system_id.clone();
        let grammar = ctx.grammar_mut(doc);
        grammar.elements.add(qname.clone(), decl.clone(), origin, policy);
        grammar.elements.add_extended(&system_id, qname, decl.clone());
        Some(decl)
    })
}

/// Build the declaration from attributes and content
fn build_decl(
    ctx: &mut TraversalContext,
    doc: DocId,
    element: &Arc<SchemaElement>,
    name: QName,
    props: &ElementAttrs,
    global: bool,
) -> ElementDecl {
    if props.default_and_fixed {
        ctx.report(doc, element, keys::SRC_ELEMENT_1, vec![name.to_string()]);
    }

    let mut decl = ElementDecl::new(name);
    decl.global = global;
    decl.nillable = props.nillable;
    decl.is_abstract = props.is_abstract;
    decl.value_constraint = props.value_constraint.clone();
    decl.substitution_group = props.substitution_group.clone();

    let (annotations, start) = leading_annotation(ctx, doc, element);
    decl.annotations = annotations;

    let children = element.child_elements();
    let mut index = start;
    let anonymous = match children.get(index) {
        Some(child) if child.is_xsd("complexType") => {
            index += 1;
            types::traverse_local_complex(ctx, doc, child).map(TypeReference::AnonymousComplex)
        }
        Some(child) if child.is_xsd("simpleType") => {
            index += 1;
            types::traverse_local_simple(ctx, doc, child);
            Some(TypeReference::AnonymousSimple)
        }
        _ => None,
    };

    decl.type_def = match (&props.type_name, anonymous) {
        (Some(_), Some(anonymous)) => {
            ctx.report(doc, element, keys::SRC_ELEMENT_3, vec![decl.name.to_string()]);
            Some(anonymous)
        }
        (Some(type_name), None) => {
            ctx.get_global_decl(doc, DeclKind::Type, type_name, element);
            Some(TypeReference::Named(type_name.clone()))
        }
        (None, anonymous) => anonymous,
    };

    for child in &children[index..] {
        if child.is_xsd("unique") || child.is_xsd("key") {
            identities::traverse_unique_or_key(ctx, doc, child, &decl.name);
        } else if child.is_xsd("keyref") {
            identities::defer_keyref(ctx, doc, child, &decl.name);
        } else {
            ctx.report(
                doc,
                child,
                keys::ELT_MUST_MATCH_1,
                vec![
                    if global { "element (global)" } else { "element (local)" }.to_string(),
                    ELEMENT_CONTENT.to_string(),
                    child.local_name().to_string(),
                ],
            );
        }
    }
    decl
}
