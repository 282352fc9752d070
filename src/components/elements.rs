//! Element declarations and complex type definitions

use serde::Serialize;
use std::sync::Arc;

use super::annotations::Annotation;
use super::attributes::{AttributeGroup, ValueConstraint};
use super::particles::Particle;
use crate::namespaces::QName;

/// Type of an element declaration
#[derive(Debug, Clone, PartialEq)]
pub enum TypeReference {
    Named(QName),
    AnonymousComplex(Arc<ComplexType>),
    /// Anonymous `simpleType`; its facets are not modelled
    AnonymousSimple,
}

/// Element declaration
#[derive(Debug, Clone, PartialEq)]
pub struct ElementDecl {
    pub name: QName,
    pub type_def: Option<TypeReference>,
    pub global: bool,
    pub nillable: bool,
    pub is_abstract: bool,
    pub value_constraint: Option<ValueConstraint>,
    pub substitution_group: Option<QName>,
    pub annotations: Vec<Annotation>,
}

impl ElementDecl {
    pub fn new(name: QName) -> Self {
        Self {
            name,
            type_def: None,
            global: false,
            nillable: false,
            is_abstract: false,
            value_constraint: None,
            substitution_group: None,
            annotations: Vec::new(),
        }
    }
}

/// `extension` or `restriction`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DerivationMethod {
    Extension,
    Restriction,
}

impl DerivationMethod {
    pub fn from_local_name(name: &str) -> Option<Self> {
        match name {
            "extension" => Some(Self::Extension),
            "restriction" => Some(Self::Restriction),
            _ => None,
        }
    }
}

/// Kind of content a complex type allows
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentKind {
    Empty,
    Simple,
    ElementOnly,
    Mixed,
}

/// Complex type definition
#[derive(Debug, Clone, PartialEq)]
pub struct ComplexType {
    pub name: Option<QName>,
    pub base: Option<QName>,
    pub derivation: Option<DerivationMethod>,
    pub content_kind: ContentKind,
    pub particle: Option<Particle>,
    pub attributes: AttributeGroup,
    pub is_abstract: bool,
    pub annotations: Vec<Annotation>,
}

impl ComplexType {
    pub fn new(name: Option<QName>) -> Self {
        Self {
            name,
            base: None,
            derivation: None,
            content_kind: ContentKind::Empty,
            particle: None,
            attributes: AttributeGroup::new(None),
            is_abstract: false,
            annotations: Vec::new(),
        }
    }
}

/// A global `simpleType` or `notation`, registered by name only
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamedOnly {
    pub name: QName,
    pub annotations: Vec<Annotation>,
}
