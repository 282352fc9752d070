//! Schema components built by the traversers

pub mod annotations;
pub mod attributes;
pub mod elements;
pub mod groups;
pub mod identities;
pub mod particles;
pub mod wildcards;

pub use annotations::Annotation;
pub use attributes::{AttributeDecl, AttributeGroup, AttributeUse, AttributeUseMode, ValueConstraint};
pub use elements::{ComplexType, ContentKind, DerivationMethod, ElementDecl, NamedOnly, TypeReference};
pub use groups::{check_particle_restriction, Compositor, ModelGroup, NamedGroup};
pub use identities::{IdentityConstraint, IdentityConstraintKind};
pub use particles::{ElementTerm, Occurs, Particle, Term};
pub use wildcards::{NamespaceConstraint, ProcessContents, Wildcard};
