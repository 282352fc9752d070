//! `annotation` elements

use std::sync::Arc;

use crate::components::Annotation;
use crate::diagnostics::keys;
use crate::documents::SchemaElement;

use super::context::TraversalContext;
use super::document_info::DocId;

/// Build an [`Annotation`] from an `annotation` element
pub fn traverse_annotation(ctx: &mut TraversalContext, doc: DocId, element: &Arc<SchemaElement>) -> Annotation {
    ctx.in_element_scope(doc, element, |ctx| {
        if let Some(attrs) = ctx.check_attributes(doc, element, false) {
            ctx.return_attr_array(attrs);
        }
        let mut annotation = Annotation::default();
        for child in element.child_elements() {
            let is_info = child.is_xsd("appinfo") || child.is_xsd("documentation");
            if !is_info {
                ctx.report(
                    doc,
                    child,
                    keys::ELT_MUST_MATCH_1,
                    vec![
                        "annotation".to_string(),
                        "(appinfo | documentation)*".to_string(),
                        child.local_name().to_string(),
                    ],
                );
                continue;
            }
            if let Some(attrs) = ctx.check_attributes(doc, child, false) {
                ctx.return_attr_array(attrs);
            }
            let text = content_text(child);
            if child.local_name() == "appinfo" {
                annotation.app_info.push(text);
            } else {
                annotation.documentation.push(text);
            }
        }
        annotation
    })
}

/// Character content of `element` and its descendants, trimmed
fn content_text(element: &SchemaElement) -> String {
    fn collect(element: &SchemaElement, out: &mut String) {
        out.push_str(&element.text);
        for child in element.child_elements() {
            collect(child, out);
        }
    }
    let mut text = String::new();
    collect(element, &mut text);
    text.trim().to_string()
}

/// Leading `annotation` of a component, or a synthetic one
///
/// Returns the annotations and the index of the first content child.
pub fn leading_annotation(
    ctx: &mut TraversalContext,
    doc: DocId,
    element: &SchemaElement,
) -> (Vec<Annotation>, usize) {
    match element.first_child_element() {
        Some(first) if first.is_xsd("annotation") => {
            let first = first.clone();
            (vec![traverse_annotation(ctx, doc, &first)], 1)
        }
        _ => (ctx.synthetic_annotation(element).into_iter().collect(), 0),
    }
}

/// Report every child of `element` from `start` on; only an annotation was allowed
pub(crate) fn reject_content(
    ctx: &mut TraversalContext,
    doc: DocId,
    element: &SchemaElement,
    start: usize,
    label: &str,
) {
    for child in element.child_elements().iter().skip(start) {
        ctx.report(
            doc,
            child,
            keys::ELT_MUST_MATCH_1,
            vec![label.to_string(), "(annotation?)".to_string(), child.local_name().to_string()],
        );
    }
}
