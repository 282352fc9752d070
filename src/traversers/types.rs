//! Type definitions and notations
//!
//! Complex types are traversed for their particle and attribute content.
//! Simple types and notations are registered by name; their facets are not
//! modelled.

use std::sync::Arc;

use crate::components::{ComplexType, ContentKind, DerivationMethod, NamedOnly, Particle};
use crate::diagnostics::keys;
use crate::documents::SchemaElement;
use crate::grammar::{GlobalType, RedefinedKind, RedefinitionRecord};
use crate::namespaces::QName;
use crate::XSD_NAMESPACE;

use super::annotations::{leading_annotation, reject_content};
use super::attribute_checker::AttrIndex;
use super::attribute_groups::traverse_attrs_and_attr_grps;
use super::context::{DeclKind, TraversalContext};
use super::document_info::DocId;
use super::particles::{self, ParticleContext};
use super::groups;

/// Base name check for a type inside `redefine`
#[derive(Debug, Clone)]
struct Redefinition {
    name: QName,
    original: QName,
}

/// Traverse a global `complexType` and register it
pub fn traverse_global_complex(
    ctx: &mut TraversalContext,
    doc: DocId,
    element: &Arc<SchemaElement>,
) -> Option<Arc<ComplexType>> {
    ctx.in_element_scope(doc, element, |ctx| {
        let attrs = ctx.check_attributes(doc, element, true)?;
        let name = attrs.string(AttrIndex::Name);
        let mixed = attrs.bool(AttrIndex::Mixed);
        let is_abstract = attrs.bool(AttrIndex::Abstract);
        ctx.return_attr_array(attrs);

        let qname = ctx.global_name(doc, element, &name?);
        let redefinition = redefinition_for(ctx, &qname);
        let mut complex = traverse_complex_body(ctx, doc, element, Some(qname.clone()), mixed, redefinition.as_ref());
        complex.is_abstract = is_abstract;

        if let Some(redefinition) = redefinition {
            let system_id = ctx.document(doc).system_id.clone();
            ctx.redefinitions.push(RedefinitionRecord {
                kind: RedefinedKind::ComplexType,
                name: qname.clone(),
                original: redefinition.original,
                system_id,
                restriction: complex.derivation == Some(DerivationMethod::Restriction),
            });
        }

        let complex = Arc::new(complex);
        register_type(ctx, doc, element, qname, GlobalType::Complex(complex.clone()));
        Some(complex)
    })
}

/// Traverse an anonymous `complexType`
pub fn traverse_local_complex(
    ctx: &mut TraversalContext,
    doc: DocId,
    element: &Arc<SchemaElement>,
) -> Option<Arc<ComplexType>> {
    ctx.in_element_scope(doc, element, |ctx| {
        let attrs = ctx.check_attributes(doc, element, false)?;
        let mixed = attrs.bool(AttrIndex::Mixed);
        ctx.return_attr_array(attrs);
        Some(Arc::new(traverse_complex_body(ctx, doc, element, None, mixed, None)))
    })
}

/// Traverse a global `simpleType` and register its name
pub fn traverse_global_simple(ctx: &mut TraversalContext, doc: DocId, element: &Arc<SchemaElement>) {
    ctx.in_element_scope(doc, element, |ctx| {
        let Some(attrs) = ctx.check_attributes(doc, element, true) else {
            return;
        };
        let name = attrs.string(AttrIndex::Name);
        ctx.return_attr_array(attrs);
        let Some(name) = name else {
            return;
        };

        let qname = ctx.global_name(doc, element, &name);
        let (annotations, _) = leading_annotation(ctx, doc, element);
        if let Some(redefinition) = redefinition_for(ctx, &qname) {
            let base = element
                .child_elements()
                .iter()
                .find(|c| c.is_xsd("restriction"))
                .and_then(|r| r.attribute("base"))
                .and_then(|raw| ctx.document(doc).resolve_qname(raw.trim()).ok());
            if base.as_ref() != Some(&redefinition.name) {
                ctx.report(doc, element, keys::SRC_REDEFINE_5_A_C, vec![qname.to_string()]);
            }
            let system_id = ctx.document(doc).system_id.clone();
            ctx.redefinitions.push(RedefinitionRecord {
                kind: RedefinedKind::SimpleType,
                name: qname.clone(),
                original: redefinition.original,
                system_id,
                restriction: true,
            });
        }
        let simple = NamedOnly {
            name: qname.clone(),
            annotations,
        };
        register_type(ctx, doc, element, qname, GlobalType::Simple(simple));
    })
}

/// Check the attributes of an anonymous `simpleType`
pub fn traverse_local_simple(ctx: &mut TraversalContext, doc: DocId, element: &Arc<SchemaElement>) {
    if let Some(attrs) = ctx.check_attributes(doc, element, false) {
        ctx.return_attr_array(attrs);
    }
}

/// Traverse a global `notation` and register it
pub fn traverse_notation(ctx: &mut TraversalContext, doc: DocId, element: &Arc<SchemaElement>) {
    ctx.in_element_scope(doc, element, |ctx| {
        let Some(attrs) = ctx.check_attributes(doc, element, true) else {
            return;
        };
        let name = attrs.string(AttrIndex::Name);
        let has_id = attrs.str(AttrIndex::Public).is_some() || attrs.str(AttrIndex::System).is_some();
        ctx.return_attr_array(attrs);

        let (annotations, start) = leading_annotation(ctx, doc, element);
        reject_content(ctx, doc, element, start, "notation");
        let Some(name) = name else {
            return;
        };
        if !has_id {
            ctx.report(doc, element, keys::ATT_MUST_APPEAR, vec!["notation".into(), "public".into()]);
        }
        let qname = ctx.global_name(doc, element, &name);
        let notation = Arc::new(NamedOnly {
            name: qname.clone(),
            annotations,
        });
        let origin = ctx.origin_of(doc, element);
        let policy = ctx.duplicate_policy();
        let system_id = ctx.document(doc).system_id.clone();
        let grammar = ctx.grammar_mut(doc);
        grammar.notations.add(qname.clone(), notation.clone(), origin, policy);
        grammar.notations.add_extended(&system_id, qname, notation);
    })
}

fn redefinition_for(ctx: &TraversalContext, name: &QName) -> Option<Redefinition> {
    ctx.redefining
        .as_ref()
        .filter(|scope| scope.kind == DeclKind::Type && &scope.name == name)
        .map(|scope| Redefinition {
            name: scope.name.clone(),
            original: scope.original.clone(),
        })
}

fn register_type(ctx: &mut TraversalContext, doc: DocId, element: &Arc<SchemaElement>, name: QName, def: GlobalType) {
    let def = Arc::new(def);
    let origin = ctx.origin_of(doc, element);
    let policy = ctx.duplicate_policy();
    let system_id = ctx.document(doc).system_id.clone();
    let grammar = ctx.grammar_mut(doc);
    grammar.types.add(name.clone(), def.clone(), origin, policy);
    grammar.types.add_extended(&system_id, name, def);
}

/// Particle content: `(group | all | choice | sequence)?` at `children[index]`
fn traverse_particle_content(
    ctx: &mut TraversalContext,
    doc: DocId,
    children: &[Arc<SchemaElement>],
    index: &mut usize,
) -> Option<Particle> {
    let child = children.get(*index)?;
    let particle = if child.is_xsd("group") {
        groups::traverse_local(ctx, doc, child)
    } else if child.is_xsd("all") {
        particles::traverse_all(ctx, doc, child, ParticleContext::NONE)
    } else if child.is_xsd("choice") {
        particles::traverse_choice(ctx, doc, child, ParticleContext::NONE)
    } else if child.is_xsd("sequence") {
        particles::traverse_sequence(ctx, doc, child, ParticleContext::NONE)
    } else {
        return None;
    };
    *index += 1;
    particle.filter(|p| !p.occurs.is_empty())
}

fn content_kind(particle: &Option<Particle>, mixed: bool) -> ContentKind {
    match (particle, mixed) {
        (_, true) => ContentKind::Mixed,
        (Some(_), false) => ContentKind::ElementOnly,
        (None, false) => ContentKind::Empty,
    }
}

fn report_leftover(ctx: &mut TraversalContext, doc: DocId, children: &[Arc<SchemaElement>], index: usize, owner: &str) {
    for child in children.iter().skip(index) {
        ctx.report(
            doc,
            child,
            keys::ELT_INVALID_CONTENT,
            vec![owner.to_string(), child.local_name().to_string()],
        );
    }
}

fn traverse_complex_body(
    ctx: &mut TraversalContext,
    doc: DocId,
    element: &SchemaElement,
    name: Option<QName>,
    mixed: bool,
    redefinition: Option<&Redefinition>,
) -> ComplexType {
    let mut complex = ComplexType::new(name);
    let (annotations, start) = leading_annotation(ctx, doc, element);
    complex.annotations = annotations;
    let children = element.child_elements();

    match children.get(start) {
        Some(child) if child.is_xsd("simpleContent") || child.is_xsd("complexContent") => {
            traverse_derived_content(ctx, doc, child, &mut complex, mixed, redefinition);
            report_leftover(ctx, doc, children, start + 1, "complexType");
        }
        _ => {
            if redefinition.is_some() {
                ctx.report(doc, element, keys::SRC_REDEFINE_5_A_C, vec![complex_label(&complex)]);
            }
            let mut index = start;
            let particle = traverse_particle_content(ctx, doc, children, &mut index);
            index = traverse_attrs_and_attr_grps(ctx, doc, children, index, &mut complex.attributes, true);
            report_leftover(ctx, doc, children, index, "complexType");
            complex.content_kind = content_kind(&particle, mixed);
            complex.particle = particle;
        }
    }
    complex.attributes.remove_prohibited();
    complex
}

fn complex_label(complex: &ComplexType) -> String {
    complex
        .name
        .as_ref()
        .map_or_else(|| "(anonymous)".to_string(), QName::to_string)
}

/// `simpleContent` or `complexContent` with its `restriction`/`extension`
fn traverse_derived_content(
    ctx: &mut TraversalContext,
    doc: DocId,
    content: &Arc<SchemaElement>,
    complex: &mut ComplexType,
    mixed: bool,
    redefinition: Option<&Redefinition>,
) {
    ctx.in_element_scope(doc, content, |ctx| {
        let Some(attrs) = ctx.check_attributes(doc, content, false) else {
            return;
        };
        let mixed = attrs.get(AttrIndex::Mixed).map_or(mixed, |_| attrs.bool(AttrIndex::Mixed));
        ctx.return_attr_array(attrs);

        let simple = content.local_name() == "simpleContent";
        let expected = "(annotation?, (restriction | extension))";
        let (_, start) = leading_annotation(ctx, doc, content);
        let children = content.child_elements();
        let Some(derivation) = children.get(start) else {
            ctx.report(doc, content, keys::ELT_MUST_MATCH_2, vec![content.local_name().into(), expected.into()]);
            return;
        };
        let Some(method) = DerivationMethod::from_local_name(derivation.local_name())
            .filter(|_| derivation.namespace() == content.namespace())
        else {
            ctx.report(
                doc,
                derivation,
                keys::ELT_MUST_MATCH_1,
                vec![content.local_name().into(), expected.into(), derivation.local_name().into()],
            );
            return;
        };
        report_leftover(ctx, doc, children, start + 1, content.local_name());

        ctx.in_element_scope(doc, derivation, |ctx| {
            let Some(attrs) = ctx.check_attributes(doc, derivation, false) else {
                return;
            };
            let base = attrs.qname(AttrIndex::Base);
            ctx.return_attr_array(attrs);

            let base = match (base, redefinition) {
                (Some(base), Some(redefinition)) if base == redefinition.name => Some(redefinition.original.clone()),
                (base, Some(_)) => {
                    ctx.report(doc, derivation, keys::SRC_REDEFINE_5_A_C, vec![complex_label(complex)]);
                    base
                }
                (base, None) => base,
            };
            if let Some(base) = &base {
                ctx.get_global_decl(doc, DeclKind::Type, base, derivation);
            }
            complex.base = base;
            complex.derivation = Some(method);

            let (_, start) = leading_annotation(ctx, doc, derivation);
            let children = derivation.child_elements();
            let mut index = start;
            if simple {
                // simpleType and facets are accepted without being modelled
                while let Some(child) = children.get(index) {
                    let is_attribute_content = child.is_xsd("attribute")
                        || child.is_xsd("attributeGroup")
                        || child.is_xsd("anyAttribute");
                    if is_attribute_content || child.namespace() != Some(XSD_NAMESPACE) {
                        break;
                    }
                    index += 1;
                }
                complex.content_kind = ContentKind::Simple;
            } else {
                let particle = traverse_particle_content(ctx, doc, children, &mut index);
                complex.content_kind = content_kind(&particle, mixed);
                complex.particle = particle;
            }
            index = traverse_attrs_and_attr_grps(ctx, doc, children, index, &mut complex.attributes, true);
            report_leftover(ctx, doc, children, index, derivation.local_name());
        });
    });
}
