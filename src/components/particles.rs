//! Particles
//!
//! A particle is an occurrence-bounded term: an element, a wildcard or a
//! model group.

use serde::Serialize;
use std::sync::Arc;

use super::annotations::Annotation;
use super::elements::ElementDecl;
use super::groups::{Compositor, ModelGroup};
use super::wildcards::Wildcard;
use crate::namespaces::QName;

/// Occurrence bounds for a particle (minOccurs, maxOccurs)
/// None for max means unbounded
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Occurs {
    /// Minimum number of occurrences (default 1)
    pub min: u32,
    /// Maximum number of occurrences (None = unbounded, default 1)
    pub max: Option<u32>,
}

impl Occurs {
    pub fn new(min: u32, max: Option<u32>) -> Self {
        Self { min, max }
    }

    /// Default occurrence (1, 1)
    pub fn once() -> Self {
        Self { min: 1, max: Some(1) }
    }

    /// Optional occurrence (0, 1)
    pub fn optional() -> Self {
        Self { min: 0, max: Some(1) }
    }

    /// Zero or more (0, unbounded)
    pub fn zero_or_more() -> Self {
        Self { min: 0, max: None }
    }

    /// Empty (0, 0)
    pub fn empty() -> Self {
        Self { min: 0, max: Some(0) }
    }

    pub fn is_emptiable(&self) -> bool {
        self.min == 0
    }

    /// maxOccurs == 0; such a particle contributes nothing
    pub fn is_empty(&self) -> bool {
        self.max == Some(0)
    }

    pub fn is_single(&self) -> bool {
        self.max == Some(1)
    }

    pub fn is_unbounded(&self) -> bool {
        self.max.is_none()
    }

    /// min <= max, or max unbounded
    pub fn is_consistent(&self) -> bool {
        self.max.map_or(true, |max| self.min <= max)
    }

    /// Occurrence range of `self` is contained in `other` (Occurrence Range OK)
    pub fn has_occurs_restriction(&self, other: &Occurs) -> bool {
        if self.min < other.min {
            return false;
        }
        match (self.max, other.max) {
            (_, None) => true,
            (None, Some(_)) => false,
            (Some(mine), Some(theirs)) => mine <= theirs,
        }
    }

    /// Bounds multiplied by `factor` (saturating)
    pub fn scaled(&self, factor: u32) -> Occurs {
        Occurs {
            min: self.min.saturating_mul(factor),
            max: self.max.map(|m| m.saturating_mul(factor)),
        }
    }
}

impl Default for Occurs {
    fn default() -> Self {
        Self::once()
    }
}

impl std::fmt::Display for Occurs {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.max {
            Some(max) => write!(f, "[{}, {}]", self.min, max),
            None => write!(f, "[{}, unbounded]", self.min),
        }
    }
}

/// Element term of a particle
#[derive(Debug, Clone, PartialEq)]
pub enum ElementTerm {
    /// A local declaration
    Local(Arc<ElementDecl>),
    /// A reference to a global element declaration by name
    Global(QName),
}

impl ElementTerm {
    pub fn name(&self) -> &QName {
        match self {
            ElementTerm::Local(decl) => &decl.name,
            ElementTerm::Global(name) => name,
        }
    }
}

/// Payload of a particle
#[derive(Debug, Clone, PartialEq)]
pub enum Term {
    Element(ElementTerm),
    Wildcard(Arc<Wildcard>),
    ModelGroup(Arc<ModelGroup>),
}

/// An occurrence-bounded term
#[derive(Debug, Clone, PartialEq)]
pub struct Particle {
    pub occurs: Occurs,
    pub term: Term,
    pub annotations: Vec<Annotation>,
}

impl Particle {
    pub fn new(occurs: Occurs, term: Term) -> Self {
        Self {
            occurs,
            term,
            annotations: Vec::new(),
        }
    }

    /// A `(1,1)` sequence with no children
    pub fn empty_sequence() -> Self {
        Self::new(
            Occurs::once(),
            Term::ModelGroup(Arc::new(ModelGroup::new(Compositor::Sequence))),
        )
    }

    pub fn with_annotations(mut self, annotations: Vec<Annotation>) -> Self {
        self.annotations = annotations;
        self
    }

    pub fn is_element(&self) -> bool {
        matches!(self.term, Term::Element(_))
    }

    pub fn model_group(&self) -> Option<&Arc<ModelGroup>> {
        match &self.term {
            Term::ModelGroup(group) => Some(group),
            _ => None,
        }
    }

    /// Particle can match nothing at all
    pub fn is_emptiable(&self) -> bool {
        if self.occurs.is_emptiable() {
            return true;
        }
        match &self.term {
            Term::ModelGroup(group) => group.is_emptiable(),
            _ => false,
        }
    }

    /// Short label used in summaries and messages
    pub fn kind(&self) -> &'static str {
        match &self.term {
            Term::Element(_) => "element",
            Term::Wildcard(_) => "any",
            Term::ModelGroup(group) => group.compositor.as_str(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_occurs_predicates() {
        assert!(Occurs::optional().is_emptiable());
        assert!(Occurs::empty().is_empty());
        assert!(Occurs::zero_or_more().is_unbounded());
        assert!(!Occurs::new(3, Some(2)).is_consistent());
        assert!(Occurs::new(3, None).is_consistent());
        assert_eq!(Occurs::zero_or_more().to_string(), "[0, unbounded]");
    }

    #[test]
    fn test_occurs_restriction() {
        let base = Occurs::new(1, Some(3));

        assert!(Occurs::new(1, Some(3)).has_occurs_restriction(&base));
        assert!(Occurs::new(2, Some(2)).has_occurs_restriction(&base));

        assert!(!Occurs::new(0, Some(3)).has_occurs_restriction(&base));
        assert!(!Occurs::new(1, Some(5)).has_occurs_restriction(&base));
        assert!(!Occurs::new(1, None).has_occurs_restriction(&base));

        let unbounded_base = Occurs::new(1, None);
        assert!(Occurs::new(1, None).has_occurs_restriction(&unbounded_base));
    }

    #[test]
    fn test_empty_sequence() {
        let particle = Particle::empty_sequence();
        assert_eq!(particle.kind(), "sequence");
        assert!(particle.is_emptiable());
        assert!(particle.model_group().unwrap().particles.is_empty());
    }

    #[test]
    fn test_scaled() {
        assert_eq!(Occurs::new(1, Some(2)).scaled(3), Occurs::new(3, Some(6)));
        assert_eq!(Occurs::zero_or_more().scaled(2), Occurs::zero_or_more());
    }
}
