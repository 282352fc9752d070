//! Serializable summary of built grammars
//!
//! Names are written in Clark notation (`{namespace}local`) so summaries of
//! different schema sets can be compared as JSON.

use serde::Serialize;

use crate::components::{Compositor, Term};
use crate::diagnostics::Diagnostic;
use crate::grammar::{GlobalType, GrammarBucket, RedefinitionRecord, SchemaGrammar};

/// Summary of one schema set
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct SchemaSetSummary {
    /// One entry per target namespace
    pub grammars: Vec<GrammarSummary>,

    /// Components replaced through `redefine`
    pub redefinitions: Vec<RedefinitionRecord>,

    /// Number of error diagnostics
    pub errors: usize,

    /// Number of warning diagnostics
    pub warnings: usize,
}

impl SchemaSetSummary {
    /// Summarize a bucket together with its traversal results
    pub fn new(bucket: &GrammarBucket, diagnostics: &[Diagnostic], redefinitions: &[RedefinitionRecord]) -> Self {
        let errors = diagnostics.iter().filter(|d| d.is_error()).count();
        Self {
            grammars: bucket.iter().map(GrammarSummary::from_grammar).collect(),
            redefinitions: redefinitions.to_vec(),
            errors,
            warnings: diagnostics.len() - errors,
        }
    }

    /// Render as pretty-printed JSON
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

/// Summary of the components of one target namespace
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct GrammarSummary {
    /// Target namespace of the grammar
    pub target_namespace: Option<String>,

    /// Documents that contributed components
    pub documents: Vec<String>,

    /// Global element declarations
    pub elements: Vec<String>,

    /// Global attribute declarations
    pub attributes: Vec<String>,

    /// Named complex types
    pub complex_types: Vec<String>,

    /// Named simple types
    pub simple_types: Vec<String>,

    /// Named model groups
    pub groups: Vec<GroupSummary>,

    /// Named attribute groups
    pub attribute_groups: Vec<AttributeGroupSummary>,

    /// Identity constraints
    pub identity_constraints: Vec<IdentityConstraintSummary>,

    /// Notation declarations
    pub notations: Vec<String>,

    /// Number of top-level annotations
    pub annotations: usize,
}

/// Named model group
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct GroupSummary {
    pub name: String,
    pub compositor: Compositor,
    /// Names of the element particles, in order; wildcards appear as `*`
    pub particles: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub restricts: Option<String>,
}

/// Named attribute group
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct AttributeGroupSummary {
    pub name: String,
    pub attributes: Vec<String>,
    pub wildcard: bool,
}

/// Identity constraint
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct IdentityConstraintSummary {
    pub name: String,
    pub kind: String,
    pub element: String,
    pub fields: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub refer: Option<String>,
}

impl GrammarSummary {
    /// Summarize one grammar
    pub fn from_grammar(grammar: &SchemaGrammar) -> Self {
        let mut complex_types = Vec::new();
        let mut simple_types = Vec::new();
        for (name, global) in grammar.types.iter() {
            match global.as_ref() {
                GlobalType::Complex(_) => complex_types.push(name.to_string()),
                GlobalType::Simple(_) => simple_types.push(name.to_string()),
            }
        }

        let groups = grammar
            .groups
            .iter()
            .map(|(name, group)| GroupSummary {
                name: name.to_string(),
                compositor: group.model_group.compositor,
                particles: group
                    .model_group
                    .particles
                    .iter()
                    .map(|particle| match &particle.term {
                        Term::Element(element) => element.name().to_string(),
                        Term::Wildcard(_) => "*".to_string(),
                        Term::ModelGroup(group) => format!("({})", group.compositor),
                    })
                    .collect(),
                restricts: group.restricts.as_ref().map(ToString::to_string),
            })
            .collect();

        let attribute_groups = grammar
            .attribute_groups
            .iter()
            .map(|(name, group)| AttributeGroupSummary {
                name: name.to_string(),
                attributes: group.uses.keys().map(ToString::to_string).collect(),
                wildcard: group.wildcard.is_some(),
            })
            .collect();

        let identity_constraints = grammar
            .identity_constraints
            .iter()
            .map(|(name, constraint)| IdentityConstraintSummary {
                name: name.to_string(),
                kind: constraint.kind.as_str().to_string(),
                element: constraint.element_name.to_string(),
                fields: constraint.field_count(),
                refer: constraint.refer.as_ref().map(|key| key.name.to_string()),
            })
            .collect();

        Self {
            target_namespace: grammar.target_namespace.clone(),
            documents: grammar.documents.clone(),
            elements: grammar.elements.names().map(ToString::to_string).collect(),
            attributes: grammar.attributes.names().map(ToString::to_string).collect(),
            complex_types,
            simple_types,
            groups,
            attribute_groups,
            identity_constraints,
            notations: grammar.notations.names().map(ToString::to_string).collect(),
            annotations: grammar.annotations.len(),
        }
    }
}
