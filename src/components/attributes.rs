//! Attribute declarations, attribute uses and attribute groups

use indexmap::IndexMap;
use serde::Serialize;
use std::sync::Arc;

use super::annotations::Annotation;
use super::wildcards::Wildcard;
use crate::namespaces::QName;

/// Value of the `use` attribute
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AttributeUseMode {
    #[default]
    Optional,
    Required,
    Prohibited,
}

impl AttributeUseMode {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "optional" => Some(Self::Optional),
            "required" => Some(Self::Required),
            "prohibited" => Some(Self::Prohibited),
            _ => None,
        }
    }
}

/// `default` or `fixed`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "value", rename_all = "lowercase")]
pub enum ValueConstraint {
    Default(String),
    Fixed(String),
}

/// Attribute declaration
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AttributeDecl {
    pub name: QName,
    pub type_name: Option<QName>,
    pub value_constraint: Option<ValueConstraint>,
    pub global: bool,
    #[serde(skip)]
    pub annotations: Vec<Annotation>,
}

impl AttributeDecl {
    pub fn new(name: QName) -> Self {
        Self {
            name,
            type_name: None,
            value_constraint: None,
            global: false,
            annotations: Vec::new(),
        }
    }
}

/// Use of an attribute declaration in a type or attribute group
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttributeUse {
    pub decl: Arc<AttributeDecl>,
    pub mode: AttributeUseMode,
    pub value_constraint: Option<ValueConstraint>,
}

impl AttributeUse {
    pub fn name(&self) -> &QName {
        &self.decl.name
    }

    pub fn is_required(&self) -> bool {
        self.mode == AttributeUseMode::Required
    }

    pub fn is_prohibited(&self) -> bool {
        self.mode == AttributeUseMode::Prohibited
    }

    /// Fixed value in effect, from the use or its declaration
    pub fn fixed_value(&self) -> Option<&str> {
        match self
            .value_constraint
            .as_ref()
            .or(self.decl.value_constraint.as_ref())
        {
            Some(ValueConstraint::Fixed(v)) => Some(v),
            _ => None,
        }
    }
}

/// A set of attribute uses plus an optional wildcard
#[derive(Debug, Clone, PartialEq, Default)]
pub struct AttributeGroup {
    /// `None` for the anonymous set of a complex type
    pub name: Option<QName>,
    pub uses: IndexMap<QName, AttributeUse>,
    pub wildcard: Option<Arc<Wildcard>>,
    pub annotations: Vec<Annotation>,
    /// Name of the group this one redefines by restriction
    pub restricts: Option<QName>,
}

impl AttributeGroup {
    pub fn new(name: Option<QName>) -> Self {
        Self {
            name,
            ..Self::default()
        }
    }

    /// Add a use; returns the rejected use if one with that name exists
    pub fn add_use(&mut self, attribute_use: AttributeUse) -> Result<(), AttributeUse> {
        let key = attribute_use.name().clone();
        if self.uses.contains_key(&key) {
            return Err(attribute_use);
        }
        self.uses.insert(key, attribute_use);
        Ok(())
    }

    pub fn get_use(&self, name: &QName) -> Option<&AttributeUse> {
        self.uses.get(name)
    }

    /// Drop uses marked `prohibited`
    pub fn remove_prohibited(&mut self) {
        self.uses.retain(|_, u| !u.is_prohibited());
    }

    pub fn is_empty(&self) -> bool {
        self.uses.is_empty() && self.wildcard.is_none()
    }

    /// Check that `self` is a valid restriction of `base`
    pub fn check_restriction(&self, base: &AttributeGroup) -> Result<(), String> {
        for (name, derived_use) in &self.uses {
            if derived_use.is_prohibited() {
                continue;
            }
            match base.uses.get(name) {
                Some(base_use) => {
                    if base_use.is_required() && !derived_use.is_required() {
                        return Err(format!("attribute {} must remain required", name));
                    }
                    if let Some(fixed) = base_use.fixed_value() {
                        if derived_use.fixed_value() != Some(fixed) {
                            return Err(format!("attribute {} must keep fixed value '{}'", name, fixed));
                        }
                    }
                }
                None => {
                    let allowed = base
                        .wildcard
                        .as_ref()
                        .map_or(false, |w| w.allows(name.namespace()));
                    if !allowed {
                        return Err(format!("attribute {} is not allowed by the base", name));
                    }
                }
            }
        }
        for (name, base_use) in &base.uses {
            if base_use.is_required() {
                let kept = self
                    .uses
                    .get(name)
                    .map_or(false, |u| !u.is_prohibited());
                if !kept {
                    return Err(format!("required attribute {} is missing", name));
                }
            }
        }
        if let Some(ref wildcard) = self.wildcard {
            match base.wildcard {
                Some(ref base_wildcard) if wildcard.is_restriction_of(base_wildcard) => {}
                Some(_) => return Err("attribute wildcard is not a subset of the base".to_string()),
                None => return Err("base has no attribute wildcard".to_string()),
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::wildcards::{NamespaceConstraint, ProcessContents};

    fn attribute_use(name: &str, mode: AttributeUseMode) -> AttributeUse {
        AttributeUse {
            decl: Arc::new(AttributeDecl::new(QName::local(name))),
            mode,
            value_constraint: None,
        }
    }

    #[test]
    fn test_duplicate_use_rejected() {
        let mut group = AttributeGroup::new(None);
        assert!(group.add_use(attribute_use("a", AttributeUseMode::Optional)).is_ok());
        assert!(group.add_use(attribute_use("a", AttributeUseMode::Required)).is_err());
        assert_eq!(group.uses.len(), 1);
    }

    #[test]
    fn test_remove_prohibited() {
        let mut group = AttributeGroup::new(None);
        group.add_use(attribute_use("a", AttributeUseMode::Prohibited)).unwrap();
        group.add_use(attribute_use("b", AttributeUseMode::Optional)).unwrap();
        group.remove_prohibited();
        assert_eq!(group.uses.keys().collect::<Vec<_>>(), vec![&QName::local("b")]);
    }

    #[test]
    fn test_restriction() {
        let mut base = AttributeGroup::new(None);
        base.add_use(attribute_use("a", AttributeUseMode::Required)).unwrap();
        base.add_use(attribute_use("b", AttributeUseMode::Optional)).unwrap();

        let mut ok = AttributeGroup::new(None);
        ok.add_use(attribute_use("a", AttributeUseMode::Required)).unwrap();
        assert!(ok.check_restriction(&base).is_ok());

        let mut missing = AttributeGroup::new(None);
        missing.add_use(attribute_use("b", AttributeUseMode::Required)).unwrap();
        assert!(missing.check_restriction(&base).is_err());

        let mut extra = ok.clone();
        extra.add_use(attribute_use("c", AttributeUseMode::Optional)).unwrap();
        assert!(extra.check_restriction(&base).is_err());

        base.wildcard = Some(Arc::new(Wildcard::new(
            NamespaceConstraint::List(vec![None]),
            ProcessContents::Lax,
        )));
        assert!(extra.check_restriction(&base).is_ok());
    }
}
