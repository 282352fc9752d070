//! `any` and `anyAttribute`

use std::sync::Arc;

use crate::components::{Particle, Term, Wildcard};
use crate::documents::SchemaElement;

use super::annotations::{leading_annotation, reject_content};
use super::context::TraversalContext;
use super::document_info::DocId;
use super::particles::{DeclaredOccurs, ParticleContext};

fn traverse_wildcard(
    ctx: &mut TraversalContext,
    doc: DocId,
    element: &Arc<SchemaElement>,
    context: ParticleContext,
) -> Option<(Wildcard, DeclaredOccurs)> {
    let sole_in_sequence = context.contains(ParticleContext::SOLE_IN_SEQUENCE);
    let attrs = ctx.check_particle_attributes(doc, element, sole_in_sequence)?;
    let declared = DeclaredOccurs::from_attrs(&attrs);
    let mut wildcard = Wildcard::new(attrs.namespace_constraint(), attrs.process_contents());
    ctx.return_attr_array(attrs);

    let (annotations, start) = leading_annotation(ctx, doc, element);
    reject_content(ctx, doc, element, start, element.local_name());
    wildcard.annotations = annotations;
    Some((wildcard, declared))
}

/// Traverse an `any` particle; `None` when maxOccurs is 0
pub fn traverse_any(
    ctx: &mut TraversalContext,
    doc: DocId,
    element: &Arc<SchemaElement>,
    context: ParticleContext,
) -> Option<Particle> {
    ctx.in_element_scope(doc, element, |ctx| {
        let (wildcard, declared) = traverse_wildcard(ctx, doc, element, context)?;
        if declared.occurs.is_empty() {
            return None;
        }
        Some(Particle::new(declared.occurs, Term::Wildcard(Arc::new(wildcard))))
    })
}

/// Traverse an `anyAttribute`
pub fn traverse_any_attribute(
    ctx: &mut TraversalContext,
    doc: DocId,
    element: &Arc<SchemaElement>,
) -> Option<Arc<Wildcard>> {
    ctx.in_element_scope(doc, element, |ctx| {
        traverse_wildcard(ctx, doc, element, ParticleContext::NONE).map(|(wildcard, _)| Arc::new(wildcard))
    })
}
