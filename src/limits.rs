//! Bounds on schema loading and traversal
//!
//! A hostile or broken schema set must not exhaust the stack or memory:
//! deeply nested XML, huge files, runaway include chains and pathologically
//! nested model groups are all cut off here.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Limits {
    /// Element nesting depth of a schema document
    pub max_xml_depth: usize,

    /// Schema document size in bytes
    pub max_xml_size: usize,

    /// Attributes on one element
    pub max_attributes: usize,

    /// include/import/redefine nesting below the root document
    pub max_schema_depth: usize,

    /// Nested model groups and local declarations during traversal
    pub max_traversal_depth: usize,

    /// Idle attribute arrays kept in the checker pool
    pub max_pooled_arrays: usize,

    /// Largest finite maxOccurs accepted on a particle; `None` is unlimited
    pub max_occurs_limit: Option<u32>,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            max_xml_depth: 1000,
            max_xml_size: 100 * 1024 * 1024,
            max_attributes: 1000,
            max_schema_depth: 100,
            max_traversal_depth: 256,
            max_pooled_arrays: 64,
            max_occurs_limit: None,
        }
    }
}

fn check(limit: &'static str, actual: usize, max: usize) -> Result<()> {
    if actual > max {
        return Err(Error::LimitExceeded { limit, actual, max });
    }
    Ok(())
}

impl Limits {
    pub fn new() -> Self {
        Self::default()
    }

    /// Tight bounds for untrusted schema sets
    pub fn strict() -> Self {
        Self {
            max_xml_depth: 100,
            max_xml_size: 10 * 1024 * 1024,
            max_attributes: 100,
            max_schema_depth: 20,
            max_traversal_depth: 64,
            max_pooled_arrays: 16,
            max_occurs_limit: Some(5000),
        }
    }

    pub fn check_xml_depth(&self, depth: usize) -> Result<()> {
        check("XML depth", depth, self.max_xml_depth)
    }

    pub fn check_xml_size(&self, size: usize) -> Result<()> {
        check("document size", size, self.max_xml_size)
    }

    pub fn check_attributes(&self, count: usize) -> Result<()> {
        check("attribute count", count, self.max_attributes)
    }

    pub fn check_schema_depth(&self, depth: usize) -> Result<()> {
        check("schema depth", depth, self.max_schema_depth)
    }

    /// Whether a traversal at `depth` nested model groups may continue
    pub fn allows_traversal_depth(&self, depth: usize) -> bool {
        depth <= self.max_traversal_depth
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_limits() {
        let limits = Limits::default();
        assert!(limits.check_xml_depth(500).is_ok());
        assert!(matches!(
            limits.check_xml_depth(1500),
            Err(Error::LimitExceeded { actual: 1500, max: 1000, .. })
        ));
    }

    #[test]
    fn test_strict_limits() {
        let limits = Limits::strict();
        assert!(limits.check_schema_depth(21).is_err());
        assert!(limits.allows_traversal_depth(64));
        assert!(!limits.allows_traversal_depth(65));
        assert_eq!(limits.max_occurs_limit, Some(5000));
        assert_eq!(Limits::default().max_occurs_limit, None);
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let limits: Limits = serde_json::from_str(r#"{"max_schema_depth": 3}"#).unwrap();
        assert_eq!(limits.max_schema_depth, 3);
        assert_eq!(limits.max_xml_depth, Limits::default().max_xml_depth);
    }
}
