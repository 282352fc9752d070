//! Model groups and named model groups
//!
//! Also holds the particle restriction check used when a redefined group
//! does not refer to itself and must be a valid restriction of the
//! original.

use serde::Serialize;
use std::sync::Arc;

use super::annotations::Annotation;
use super::particles::{Occurs, Particle, Term};
use crate::namespaces::QName;

/// Model group compositor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Compositor {
    All,
    Choice,
    Sequence,
}

impl Compositor {
    pub fn as_str(&self) -> &'static str {
        match self {
            Compositor::All => "all",
            Compositor::Choice => "choice",
            Compositor::Sequence => "sequence",
        }
    }

    /// The compositor named by an XSD element local name
    pub fn from_local_name(name: &str) -> Option<Self> {
        match name {
            "all" => Some(Compositor::All),
            "choice" => Some(Compositor::Choice),
            "sequence" => Some(Compositor::Sequence),
            _ => None,
        }
    }
}

impl std::fmt::Display for Compositor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A compositor over an ordered sequence of particles
#[derive(Debug, Clone, PartialEq)]
pub struct ModelGroup {
    pub compositor: Compositor,
    pub particles: Vec<Particle>,
    pub annotations: Vec<Annotation>,
}

impl ModelGroup {
    pub fn new(compositor: Compositor) -> Self {
        Self {
            compositor,
            particles: Vec::new(),
            annotations: Vec::new(),
        }
    }

    pub fn with_particles(compositor: Compositor, particles: Vec<Particle>) -> Self {
        Self {
            compositor,
            particles,
            annotations: Vec::new(),
        }
    }

    /// Group can match an empty sequence
    pub fn is_emptiable(&self) -> bool {
        match self.compositor {
            Compositor::Choice => {
                self.particles.is_empty() || self.particles.iter().any(Particle::is_emptiable)
            }
            Compositor::All | Compositor::Sequence => {
                self.particles.iter().all(Particle::is_emptiable)
            }
        }
    }
}

/// A global named model group
#[derive(Debug, Clone, PartialEq)]
pub struct NamedGroup {
    pub name: QName,
    pub model_group: Arc<ModelGroup>,
    pub annotations: Vec<Annotation>,
    /// Name of the group this one redefines by restriction
    pub restricts: Option<QName>,
}

impl NamedGroup {
    pub fn new(name: QName, model_group: Arc<ModelGroup>) -> Self {
        Self {
            name,
            model_group,
            annotations: Vec::new(),
            restricts: None,
        }
    }

    pub fn compositor(&self) -> Compositor {
        self.model_group.compositor
    }
}

/// Reason a particle is not a valid restriction of another
pub type RestrictionError = String;

/// Check that `derived` is a valid restriction of `base`
///
/// Element terms are compared by name. Nested `(1,1)` single-child groups
/// are unwrapped on both sides first.
pub fn check_particle_restriction(
    derived: &Particle,
    base: &Particle,
) -> Result<(), RestrictionError> {
    let derived = unwrap_pointless(derived);
    let base = unwrap_pointless(base);
    match (&derived.term, &base.term) {
        (Term::Element(d), Term::Element(b)) => {
            if d.name() != b.name() {
                return Err(format!("element {} does not match {}", d.name(), b.name()));
            }
            occurs_ok(derived, base)
        }
        (Term::Element(d), Term::Wildcard(w)) => {
            if !w.allows(d.name().namespace()) {
                return Err(format!("element {} is not allowed by the wildcard", d.name()));
            }
            occurs_ok(derived, base)
        }
        (Term::Wildcard(d), Term::Wildcard(b)) => {
            if !d.is_restriction_of(b) {
                return Err("wildcard is not a subset of the base wildcard".to_string());
            }
            occurs_ok(derived, base)
        }
        (Term::ModelGroup(group), Term::Wildcard(_)) => {
            for child in &group.particles {
                check_particle_restriction(child, base)?;
            }
            let total = effective_total_range(derived);
            if !total.has_occurs_restriction(&base.occurs) {
                return Err(format!(
                    "effective occurrence range {} exceeds {}",
                    total, base.occurs
                ));
            }
            Ok(())
        }
        (Term::Element(_), Term::ModelGroup(group)) => {
            let wrapped = ModelGroup::with_particles(group.compositor, vec![derived.clone()]);
            check_group_restriction(&Occurs::once(), &wrapped, base, group)
        }
        (Term::ModelGroup(d), Term::ModelGroup(b)) => {
            check_group_restriction(&derived.occurs, d, base, b)
        }
        (Term::ModelGroup(group), Term::Element(b)) => Err(format!(
            "{} group cannot restrict element {}",
            group.compositor,
            b.name()
        )),
        (Term::Wildcard(_), _) => Err("a wildcard can only restrict a wildcard".to_string()),
    }
}

fn check_group_restriction(
    derived_occurs: &Occurs,
    derived: &ModelGroup,
    base_particle: &Particle,
    base: &ModelGroup,
) -> Result<(), RestrictionError> {
    if !derived_occurs.has_occurs_restriction(&base_particle.occurs) {
        return Err(format!(
            "occurrence range {} is not within {}",
            derived_occurs, base_particle.occurs
        ));
    }
    match (derived.compositor, base.compositor) {
        (Compositor::All, Compositor::All) | (Compositor::Sequence, Compositor::Sequence) => {
            recurse(&derived.particles, &base.particles, true)
        }
        (Compositor::Choice, Compositor::Choice) => {
            recurse(&derived.particles, &base.particles, false)
        }
        (Compositor::Sequence, Compositor::All) => {
            recurse_unordered(&derived.particles, &base.particles)
        }
        (Compositor::Sequence, Compositor::Choice) => {
            map_and_sum(&derived.particles, &base.particles)
        }
        (dc, bc) => Err(format!("{} cannot restrict {}", dc, bc)),
    }
}

fn occurs_ok(derived: &Particle, base: &Particle) -> Result<(), RestrictionError> {
    if derived.occurs.has_occurs_restriction(&base.occurs) {
        Ok(())
    } else {
        Err(format!(
            "occurrence range {} is not within {}",
            derived.occurs, base.occurs
        ))
    }
}

fn unwrap_pointless(particle: &Particle) -> &Particle {
    let mut current = particle;
    while let Term::ModelGroup(group) = &current.term {
        if current.occurs == Occurs::once() && group.particles.len() == 1 {
            current = &group.particles[0];
        } else {
            break;
        }
    }
    current
}

/// Ordered mapping; unmapped base particles must be emptiable when `strict`
fn recurse(derived: &[Particle], base: &[Particle], strict: bool) -> Result<(), RestrictionError> {
    let mut base_iter = base.iter();
    'outer: for d in derived {
        for b in base_iter.by_ref() {
            if check_particle_restriction(d, b).is_ok() {
                continue 'outer;
            }
            if strict && !b.is_emptiable() {
                return Err(format!(
                    "required base {} particle is not matched",
                    b.kind()
                ));
            }
        }
        return Err(format!("derived {} particle has no counterpart", d.kind()));
    }
    if strict {
        if let Some(b) = base_iter.find(|b| !b.is_emptiable()) {
            return Err(format!("required base {} particle is not matched", b.kind()));
        }
    }
    Ok(())
}

fn recurse_unordered(derived: &[Particle], base: &[Particle]) -> Result<(), RestrictionError> {
    let mut used = vec![false; base.len()];
    for d in derived {
        if !d.occurs.is_single() && !d.occurs.is_empty() {
            return Err("particles mapped onto an all group must have maxOccurs 1".to_string());
        }
        let slot = base
            .iter()
            .enumerate()
            .find(|(i, b)| !used[*i] && check_particle_restriction(d, b).is_ok())
            .map(|(i, _)| i);
        match slot {
            Some(i) => used[i] = true,
            None => return Err(format!("derived {} particle has no counterpart", d.kind())),
        }
    }
    for (i, b) in base.iter().enumerate() {
        if !used[i] && !b.is_emptiable() {
            return Err(format!("required base {} particle is not matched", b.kind()));
        }
    }
    Ok(())
}

fn map_and_sum(derived: &[Particle], base: &[Particle]) -> Result<(), RestrictionError> {
    for d in derived {
        if !base.iter().any(|b| check_particle_restriction(d, b).is_ok()) {
            return Err(format!("derived {} particle has no counterpart", d.kind()));
        }
    }
    Ok(())
}

/// Effective total range of a particle (used against a base wildcard)
fn effective_total_range(particle: &Particle) -> Occurs {
    let Term::ModelGroup(group) = &particle.term else {
        return particle.occurs;
    };
    let ranges: Vec<Occurs> = group.particles.iter().map(effective_total_range).collect();
    let combined = match group.compositor {
        Compositor::Choice => {
            let min = ranges.iter().map(|o| o.min).min().unwrap_or(0);
            let max = ranges
                .iter()
                .try_fold(0u32, |acc, o| o.max.map(|m| acc.max(m)));
            Occurs::new(min, max)
        }
        Compositor::All | Compositor::Sequence => {
            let min = ranges.iter().fold(0u32, |acc, o| acc.saturating_add(o.min));
            let max = ranges
                .iter()
                .try_fold(0u32, |acc, o| o.max.map(|m| acc.saturating_add(m)));
            Occurs::new(min, max)
        }
    };
    Occurs {
        min: combined.min.saturating_mul(particle.occurs.min),
        max: match (combined.max, particle.occurs.max) {
            (Some(0), _) => Some(0),
            (Some(a), Some(b)) => Some(a.saturating_mul(b)),
            _ => None,
        },
    }
}
