//! Identity constraints (`unique`, `key`, `keyref`)

use serde::Serialize;
use std::sync::Arc;

use super::annotations::Annotation;
use crate::namespaces::QName;
use crate::xpath::IdentityXPath;

/// Identity constraint category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum IdentityConstraintKind {
    Unique,
    Key,
    Keyref,
}

impl IdentityConstraintKind {
    pub fn from_local_name(name: &str) -> Option<Self> {
        match name {
            "unique" => Some(Self::Unique),
            "key" => Some(Self::Key),
            "keyref" => Some(Self::Keyref),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Unique => "unique",
            Self::Key => "key",
            Self::Keyref => "keyref",
        }
    }
}

/// A `unique`, `key` or `keyref` declaration
#[derive(Debug, Clone, PartialEq)]
pub struct IdentityConstraint {
    pub name: QName,
    /// Element declaration the constraint belongs to
    pub element_name: QName,
    pub kind: IdentityConstraintKind,
    pub selector: IdentityXPath,
    /// Never empty
    pub fields: Vec<IdentityXPath>,
    /// Target of a keyref; it has as many fields as this constraint
    pub refer: Option<Arc<IdentityConstraint>>,
    pub annotations: Vec<Annotation>,
}

impl IdentityConstraint {
    pub fn field_count(&self) -> usize {
        self.fields.len()
    }

    pub fn is_referenceable(&self) -> bool {
        matches!(self.kind, IdentityConstraintKind::Unique | IdentityConstraintKind::Key)
    }
}
