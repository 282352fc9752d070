//! `all`, `choice` and `sequence`
//!
//! Each compositor opens a frame on the shared
//! [`ParticleAccumulator`](super::accumulator::ParticleAccumulator),
//! traverses its children in document order and closes the frame to build
//! its model group.

use std::ops::BitOr;
use std::sync::Arc;

use crate::components::{Compositor, ModelGroup, Occurs, Particle, Term};
use crate::diagnostics::keys;
use crate::documents::SchemaElement;

use super::annotations::leading_annotation;
use super::attribute_checker::AttrIndex;
use super::context::TraversalContext;
use super::document_info::DocId;
use super::{elements, groups, wildcards};

/// Where a particle appears, as far as `all` restrictions care
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ParticleContext(u8);

impl ParticleContext {
    pub const NONE: Self = Self(0);
    /// Element directly inside `all`
    pub const ALL_ELEMENT: Self = Self(1);
    /// Group reference whose group is an `all`
    pub const GROUP_REF_WITH_ALL: Self = Self(2);
    /// Compositor directly inside a global `group`
    pub const CHILD_OF_GROUP: Self = Self(4);
    /// The `all` compositor itself
    pub const ALL_GROUP: Self = Self(8);
    /// Only child element of a `sequence`
    pub const SOLE_IN_SEQUENCE: Self = Self(16);

    pub fn contains(&self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }
}

impl BitOr for ParticleContext {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

/// Occurrence attributes as written, before any adjustment
#[derive(Debug, Clone, Copy)]
pub(crate) struct DeclaredOccurs {
    pub occurs: Occurs,
    pub explicit_min: bool,
    pub explicit_max: bool,
}

impl DeclaredOccurs {
    pub(crate) fn from_attrs(attrs: &super::attribute_checker::AttrArray) -> Self {
        Self {
            occurs: attrs.occurs(),
            explicit_min: !attrs.is_default(AttrIndex::MinOccurs),
            explicit_max: !attrs.is_default(AttrIndex::MaxOccurs),
        }
    }
}

/// Apply the occurrence rules for `context` to `particle`
///
/// Compositors under a global group may not carry minOccurs/maxOccurs.
/// Inside `all`, and for `all` itself, maxOccurs must be 1.
pub(crate) fn check_occurrences(
    ctx: &mut TraversalContext,
    doc: DocId,
    element: &SchemaElement,
    mut particle: Particle,
    declared: DeclaredOccurs,
    context: ParticleContext,
) -> Particle {
    let label = element.local_name().to_string();
    let mut occurs = particle.occurs;

    if context.contains(ParticleContext::CHILD_OF_GROUP) {
        if declared.explicit_min {
            ctx.report(doc, element, keys::ATT_NOT_ALLOWED, vec![label.clone(), "minOccurs".into()]);
            occurs.min = 1;
        }
        if declared.explicit_max {
            ctx.report(doc, element, keys::ATT_NOT_ALLOWED, vec![label.clone(), "maxOccurs".into()]);
            occurs.max = Some(1);
        }
    }

    if occurs.min == 0 && occurs.is_empty() {
        particle.occurs = occurs;
        return particle;
    }

    let max_text = occurs.max.map_or_else(|| "unbounded".to_string(), |m| m.to_string());
    if context.contains(ParticleContext::ALL_ELEMENT) {
        if occurs.max != Some(1) {
            let name = match &particle.term {
                Term::Element(term) => term.name().to_string(),
                _ => label,
            };
            ctx.report(doc, element, keys::COS_ALL_LIMITED_2, vec![max_text, name]);
            occurs.max = Some(1);
            occurs.min = occurs.min.min(1);
        }
    } else if (context.contains(ParticleContext::ALL_GROUP)
        || context.contains(ParticleContext::GROUP_REF_WITH_ALL))
        && occurs.max != Some(1)
    {
        ctx.report(doc, element, keys::COS_ALL_LIMITED_1_2, Vec::new());
        occurs.max = Some(1);
        occurs.min = occurs.min.min(1);
    }

    particle.occurs = occurs;
    particle
}

fn model_group_particle(compositor: Compositor, occurs: Occurs, particles: Vec<Particle>) -> Particle {
    if particles.is_empty() {
        return Particle {
            occurs,
            ..Particle::empty_sequence()
        };
    }
    Particle::new(
        occurs,
        Term::ModelGroup(Arc::new(ModelGroup::with_particles(compositor, particles))),
    )
}

/// Traverse an `all` compositor
pub fn traverse_all(
    ctx: &mut TraversalContext,
    doc: DocId,
    element: &Arc<SchemaElement>,
    context: ParticleContext,
) -> Option<Particle> {
    ctx.in_element_scope(doc, element, |ctx| {
        let attrs = ctx.check_attributes(doc, element, false)?;
        let declared = DeclaredOccurs::from_attrs(&attrs);
        ctx.return_attr_array(attrs);

        if !ctx.descend(doc, element) {
            return None;
        }
        let (annotations, start) = leading_annotation(ctx, doc, element);
        let frame = ctx.accumulator.push_frame();
        for child in &element.child_elements()[start..] {
            if child.is_xsd("element") {
                if let Some(particle) = elements::traverse_local(ctx, doc, child, ParticleContext::ALL_ELEMENT) {
                    if !particle.occurs.is_empty() {
                        ctx.accumulator.add(particle);
                    }
                }
            } else {
                ctx.report(
                    doc,
                    child,
                    keys::ELT_MUST_MATCH_1,
                    vec!["all".into(), "(annotation?, element*)".into(), child.local_name().to_string()],
                );
            }
        }
        let particles = ctx.accumulator.pop_frame(frame);
        ctx.ascend();

        let particle = model_group_particle(Compositor::All, declared.occurs, particles)
            .with_annotations(annotations);
        Some(check_occurrences(
            ctx,
            doc,
            element,
            particle,
            declared,
            context | ParticleContext::ALL_GROUP,
        ))
    })
}

/// Traverse a `sequence` compositor
pub fn traverse_sequence(
    ctx: &mut TraversalContext,
    doc: DocId,
    element: &Arc<SchemaElement>,
    context: ParticleContext,
) -> Option<Particle> {
    traverse_seq_choice(ctx, doc, element, context, Compositor::Sequence)
}

/// Traverse a `choice` compositor
pub fn traverse_choice(
    ctx: &mut TraversalContext,
    doc: DocId,
    element: &Arc<SchemaElement>,
    context: ParticleContext,
) -> Option<Particle> {
    traverse_seq_choice(ctx, doc, element, context, Compositor::Choice)
}

fn traverse_seq_choice(
    ctx: &mut TraversalContext,
    doc: DocId,
    element: &Arc<SchemaElement>,
    context: ParticleContext,
    compositor: Compositor,
) -> Option<Particle> {
    ctx.in_element_scope(doc, element, |ctx| {
        let attrs = ctx.check_attributes(doc, element, false)?;
        let declared = DeclaredOccurs::from_attrs(&attrs);
        ctx.return_attr_array(attrs);

        if !ctx.descend(doc, element) {
            return None;
        }
        let (annotations, start) = leading_annotation(ctx, doc, element);
        let children = element.child_elements();
        let sole = if compositor == Compositor::Sequence && children.len() == 1 {
            ParticleContext::SOLE_IN_SEQUENCE
        } else {
            ParticleContext::NONE
        };
        let frame = ctx.accumulator.push_frame();
        for child in &children[start..] {
            let particle = if child.is_xsd("element") {
                elements::traverse_local(ctx, doc, child, sole)
            } else if child.is_xsd("group") {
                groups::traverse_local(ctx, doc, child).and_then(|particle| {
                    let is_all = particle
                        .model_group()
                        .is_some_and(|g| g.compositor == Compositor::All);
                    if is_all {
                        ctx.report(doc, child, keys::COS_ALL_LIMITED_1_2, Vec::new());
                        None
                    } else {
                        Some(particle)
                    }
                })
            } else if child.is_xsd("choice") {
                traverse_choice(ctx, doc, child, ParticleContext::NONE)
            } else if child.is_xsd("sequence") {
                traverse_sequence(ctx, doc, child, ParticleContext::NONE)
            } else if child.is_xsd("any") {
                wildcards::traverse_any(ctx, doc, child, sole)
            } else {
                ctx.report(
                    doc,
                    child,
                    keys::ELT_MUST_MATCH_1,
                    vec![
                        compositor.as_str().to_string(),
                        "(annotation?, (element | group | choice | sequence | any)*)".to_string(),
                        child.local_name().to_string(),
                    ],
                );
                None
            };
            if let Some(particle) = particle {
                if !particle.occurs.is_empty() {
                    ctx.accumulator.add(particle);
                }
            }
        }
        let particles = ctx.accumulator.pop_frame(frame);
        ctx.ascend();

        let particle = model_group_particle(compositor, declared.occurs, particles)
            .with_annotations(annotations);
        Some(check_occurrences(ctx, doc, element, particle, declared, context))
    })
}
