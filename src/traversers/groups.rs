//! Named model groups: global `group` definitions and `group ref` particles

use std::sync::Arc;

use crate::components::{check_particle_restriction, Compositor, ModelGroup, NamedGroup, Particle, Term};
use crate::diagnostics::keys;
use crate::documents::SchemaElement;
use crate::grammar::{RedefinedKind, RedefinitionRecord};

use super::annotations::{leading_annotation, reject_content};
use super::attribute_checker::AttrIndex;
use super::context::{DeclKind, DeferredRestriction, GlobalDecl, TraversalContext};
use super::document_info::DocId;
use super::particles::{self, check_occurrences, DeclaredOccurs, ParticleContext};

const GROUP_CONTENT: &str = "(annotation?, (all | choice | sequence))";

/// Traverse a `group ref="..."` particle
///
/// Returns `None` when the reference cannot be resolved or the group is
/// absent (maxOccurs 0 is left to the caller).
pub fn traverse_local(ctx: &mut TraversalContext, doc: DocId, element: &Arc<SchemaElement>) -> Option<Particle> {
    ctx.in_element_scope(doc, element, |ctx| {
        let attrs = ctx.check_attributes(doc, element, false)?;
        let declared = DeclaredOccurs::from_attrs(&attrs);
        let reference = attrs.qname(AttrIndex::Ref);
        ctx.return_attr_array(attrs);

        let (annotations, start) = leading_annotation(ctx, doc, element);
        reject_content(ctx, doc, element, start, "group (local)");

        let reference = reference?;
        let target = ctx
            .redefine_self_reference(DeclKind::Group, &reference, declared.occurs)
            .unwrap_or(reference);
        let group = match ctx.get_global_decl(doc, DeclKind::Group, &target, element)? {
            GlobalDecl::Group(group) => group,
            _ => return None,
        };

        let particle = Particle::new(declared.occurs, Term::ModelGroup(group.model_group.clone()))
            .with_annotations(annotations);
        if group.compositor() == Compositor::All {
            return Some(check_occurrences(
                ctx,
                doc,
                element,
                particle,
                declared,
                ParticleContext::GROUP_REF_WITH_ALL,
            ));
        }
        Some(particle)
    })
}

/// Traverse a global `group` and register it in its grammar
pub fn traverse_global(
    ctx: &mut TraversalContext,
    doc: DocId,
    element: &Arc<SchemaElement>,
) -> Option<Arc<NamedGroup>> {
    ctx.in_element_scope(doc, element, |ctx| {
        let attrs = ctx.check_attributes(doc, element, true)?;
        let name = attrs.string(AttrIndex::Name);
        ctx.return_attr_array(attrs);

        let (annotations, start) = leading_annotation(ctx, doc, element);
        let children = element.child_elements();
        let mut compositor = Compositor::Sequence;
        let particle = match children.get(start) {
            None => {
                ctx.report(
                    doc,
                    element,
                    keys::ELT_MUST_MATCH_2,
                    vec!["group (global)".into(), GROUP_CONTENT.into()],
                );
                None
            }
            Some(child) => {
                let particle = if child.is_xsd("all") {
                    compositor = Compositor::All;
                    particles::traverse_all(ctx, doc, child, ParticleContext::CHILD_OF_GROUP)
                } else if child.is_xsd("choice") {
                    compositor = Compositor::Choice;
                    particles::traverse_choice(ctx, doc, child, ParticleContext::CHILD_OF_GROUP)
                } else if child.is_xsd("sequence") {
                    particles::traverse_sequence(ctx, doc, child, ParticleContext::CHILD_OF_GROUP)
                } else {
                    ctx.report(
                        doc,
                        child,
                        keys::ELT_MUST_MATCH_1,
                        vec![
                            "group (global)".into(),
                            GROUP_CONTENT.into(),
                            child.local_name().to_string(),
                        ],
                    );
                    None
                };
                if let Some(extra) = children.get(start + 1) {
                    ctx.report(
                        doc,
                        extra,
                        keys::ELT_MUST_MATCH_1,
                        vec![
                            "group (global)".into(),
                            GROUP_CONTENT.into(),
                            extra.local_name().to_string(),
                        ],
                    );
                }
                particle
            }
        };

        let name = name?;
        let qname = ctx.global_name(doc, element, &name);
        // an empty compositor comes back as an empty sequence particle
        let model_group = particle
            .and_then(|p| p.model_group().cloned())
            .filter(|g| g.compositor == compositor)
            .unwrap_or_else(|| Arc::new(ModelGroup::new(compositor)));
        let mut group = NamedGroup::new(qname.clone(), model_group);
        group.annotations = annotations;

        let redefining = ctx
            .redefining
            .as_ref()
            .filter(|scope| scope.kind == DeclKind::Group && scope.name == qname)
            .cloned();
        if let Some(scope) = redefining {
            match scope.self_refs.len() {
                0 => {
                    group.restricts = Some(scope.original.clone());
                    ctx.deferred_restrictions.push(DeferredRestriction {
                        doc,
                        node: element.clone(),
                        name: qname.clone(),
                        original: scope.original.clone(),
                    });
                }
                1 => {
                    if !scope.self_refs[0].is_single() || scope.self_refs[0].min != 1 {
                        ctx.report(doc, element, keys::SRC_REDEFINE_6_1_2, vec![qname.to_string()]);
                    }
                }
                _ => ctx.report(doc, element, keys::SRC_REDEFINE_6_1_1, vec![qname.to_string()]),
            }
            let system_id = ctx.document(doc).system_id.clone();
            ctx.redefinitions.push(RedefinitionRecord {
                kind: RedefinedKind::Group,
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
        grammar.groups.add(qname.clone(), group.clone(), origin, policy);
        grammar.groups.add_extended(&system_id, qname, group.clone());
        Some(group)
    })
}

/// Check groups redefined without a self-reference against their originals
pub(crate) fn check_deferred_restrictions(ctx: &mut TraversalContext) {
    let deferred = std::mem::take(&mut ctx.deferred_restrictions);
    for item in deferred {
        let derived = match ctx.get_global_decl(item.doc, DeclKind::Group, &item.name, &item.node) {
            Some(GlobalDecl::Group(group)) => group,
            _ => continue,
        };
        let original = match ctx.get_global_decl(item.doc, DeclKind::Group, &item.original, &item.node) {
            Some(GlobalDecl::Group(group)) => group,
            _ => continue,
        };
        let derived_particle = Particle::new(Default::default(), Term::ModelGroup(derived.model_group.clone()));
        let base_particle = Particle::new(Default::default(), Term::ModelGroup(original.model_group.clone()));
        if let Err(reason) = check_particle_restriction(&derived_particle, &base_particle) {
            ctx.report(
                item.doc,
                &item.node,
                keys::SRC_REDEFINE_6_2_2,
                vec![item.name.to_string(), reason],
            );
        }
    }
}
