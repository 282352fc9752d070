//! Wildcards (`any`, `anyAttribute`)
//!
//! Namespaces are `Option<String>`; `None` stands for "no namespace"
//! (`##local`, or an absent target namespace).

use serde::Serialize;

use super::annotations::Annotation;

/// Process contents mode for wildcards
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ProcessContents {
    /// Validate strictly - element/attribute must be declared
    #[default]
    Strict,
    /// Validate if declaration found, otherwise accept
    Lax,
    /// Skip validation entirely
    Skip,
}

impl ProcessContents {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "strict" => Some(Self::Strict),
            "lax" => Some(Self::Lax),
            "skip" => Some(Self::Skip),
            _ => None,
        }
    }

    /// Whether `self` is at least as strong as `other`
    pub fn is_restriction_of(&self, other: &Self) -> bool {
        self.strength() >= other.strength()
    }

    fn strength(&self) -> u8 {
        match self {
            Self::Skip => 0,
            Self::Lax => 1,
            Self::Strict => 2,
        }
    }
}

impl std::fmt::Display for ProcessContents {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Strict => write!(f, "strict"),
            Self::Lax => write!(f, "lax"),
            Self::Skip => write!(f, "skip"),
        }
    }
}

/// Namespace constraint of a wildcard
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "namespaces", rename_all = "lowercase")]
pub enum NamespaceConstraint {
    /// `##any`
    Any,
    /// Every namespace except those listed (`##other`)
    Not(Vec<Option<String>>),
    /// Only the listed namespaces
    List(Vec<Option<String>>),
}

impl Default for NamespaceConstraint {
    fn default() -> Self {
        Self::Any
    }
}

impl NamespaceConstraint {
    /// Decode a `namespace` attribute value
    ///
    /// Returns the offending token when the value is not valid.
    pub fn from_namespace_attr(
        value: &str,
        target_namespace: Option<&str>,
    ) -> Result<Self, String> {
        let value = value.trim();
        match value {
            "##any" => Ok(Self::Any),
            "##other" => {
                let mut excluded = vec![None];
                if let Some(tns) = target_namespace {
                    excluded.insert(0, Some(tns.to_string()));
                }
                Ok(Self::Not(excluded))
            }
            _ => {
                let mut namespaces: Vec<Option<String>> = Vec::new();
                for token in value.split_ascii_whitespace() {
                    let ns = match token {
                        "##local" => None,
                        "##targetNamespace" => target_namespace.map(str::to_string),
                        "##any" | "##other" => return Err(token.to_string()),
                        s if s.starts_with("##") => return Err(token.to_string()),
                        uri => Some(uri.to_string()),
                    };
                    if !namespaces.contains(&ns) {
                        namespaces.push(ns);
                    }
                }
                Ok(Self::List(namespaces))
            }
        }
    }

    /// Whether a name in `namespace` matches
    pub fn allows(&self, namespace: Option<&str>) -> bool {
        match self {
            Self::Any => true,
            Self::Not(excluded) => !excluded.iter().any(|e| e.as_deref() == namespace),
            Self::List(list) => list.iter().any(|n| n.as_deref() == namespace),
        }
    }

    /// Every namespace `self` allows is allowed by `other`
    pub fn is_subset_of(&self, other: &Self) -> bool {
        match (self, other) {
            (_, Self::Any) => true,
            (Self::Any, _) => false,
            (Self::List(list), sup) => list.iter().all(|ns| sup.allows(ns.as_deref())),
            (Self::Not(mine), Self::Not(theirs)) => theirs.iter().all(|ns| mine.contains(ns)),
            (Self::Not(_), Self::List(_)) => false,
        }
    }

    /// Attribute wildcard intersection
    pub fn intersection(&self, other: &Self) -> Self {
        match (self, other) {
            (Self::Any, o) | (o, Self::Any) => o.clone(),
            (Self::List(a), Self::List(b)) => {
                Self::List(a.iter().filter(|ns| b.contains(ns)).cloned().collect())
            }
            (Self::Not(excluded), Self::List(list)) | (Self::List(list), Self::Not(excluded)) => {
                Self::List(
                    list.iter()
                        .filter(|ns| ns.is_some() && !excluded.contains(ns))
                        .cloned()
                        .collect(),
                )
            }
            (Self::Not(a), Self::Not(b)) => {
                let mut excluded = a.clone();
                for ns in b {
                    if !excluded.contains(ns) {
                        excluded.push(ns.clone());
                    }
                }
                Self::Not(excluded)
            }
        }
    }
}

/// A wildcard
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct Wildcard {
    pub namespace: NamespaceConstraint,
    pub process_contents: ProcessContents,
    pub annotations: Vec<Annotation>,
}

impl Wildcard {
    pub fn new(namespace: NamespaceConstraint, process_contents: ProcessContents) -> Self {
        Self {
            namespace,
            process_contents,
            annotations: Vec::new(),
        }
    }

    pub fn allows(&self, namespace: Option<&str>) -> bool {
        self.namespace.allows(namespace)
    }

    /// Wildcard subset: namespaces contained and processing at least as strict
    pub fn is_restriction_of(&self, base: &Wildcard) -> bool {
        self.namespace.is_subset_of(&base.namespace)
            && self.process_contents.is_restriction_of(&base.process_contents)
    }

    /// Intersection keeping the process contents of `self`
    pub fn intersect(&self, other: &Wildcard) -> Wildcard {
        Wildcard {
            namespace: self.namespace.intersection(&other.namespace),
            process_contents: self.process_contents,
            annotations: self.annotations.clone(),
        }
    }
}
