//! Schema document resolution
//!
//! A [`SchemaResolver`] turns a resolved system id into the document text.
//! The loader asks it once per location; failures on referenced documents
//! become warnings, failure on the root document is fatal.

use std::collections::HashMap;
use std::fs;

use crate::error::{Error, Result};
use crate::limits::Limits;
use crate::locations::Location;

/// Source of schema document text
pub trait SchemaResolver {
    /// Fetch the text of the document at `system_id`
    fn resolve(&self, system_id: &str) -> Result<String>;
}

/// In-memory documents keyed by system id
#[derive(Debug, Clone, Default)]
pub struct MemoryResolver {
    documents: HashMap<String, String>,
}

impl MemoryResolver {
    /// Create an empty resolver
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a document
    pub fn with_document(mut self, system_id: impl Into<String>, text: impl Into<String>) -> Self {
        self.insert(system_id, text);
        self
    }

    /// Add a document in place
    pub fn insert(&mut self, system_id: impl Into<String>, text: impl Into<String>) {
        self.documents.insert(system_id.into(), text.into());
    }
}

impl SchemaResolver for MemoryResolver {
    fn resolve(&self, system_id: &str) -> Result<String> {
        self.documents
            .get(system_id)
            .cloned()
            .ok_or_else(|| Error::Resource(format!("No document registered for '{}'", system_id)))
    }
}

/// Resolver for local files
#[derive(Debug, Clone)]
pub struct FileResolver {
    /// Resource limits
    limits: Limits,
    /// Whether to allow remote resources
    allow_remote: bool,
}

impl FileResolver {
    /// Create a new resolver with default settings
    pub fn new() -> Self {
        Self {
            limits: Limits::default(),
            allow_remote: false,
        }
    }

    /// Set the limits
    pub fn with_limits(mut self, limits: Limits) -> Self {
        self.limits = limits;
        self
    }

    /// Set whether remote resources may be requested
    pub fn with_allow_remote(mut self, allow: bool) -> Self {
        self.allow_remote = allow;
        self
    }
}

impl Default for FileResolver {
    fn default() -> Self {
        Self::new()
    }
}

impl SchemaResolver for FileResolver {
    fn resolve(&self, system_id: &str) -> Result<String> {
        let path = match Location::parse(system_id) {
            Location::Path(path) => path,
            Location::String(id) => id.into(),
            Location::Url(url) => {
                if !self.allow_remote {
                    return Err(Error::Resource(format!(
                        "Remote resources are not allowed: {}",
                        url
                    )));
                }
                return Err(Error::Resource(format!(
                    "No transport available for {}",
                    url
                )));
            }
        };
        let metadata = fs::metadata(&path).map_err(|e| {
            Error::Resource(format!("Failed to read file '{}': {}", path.display(), e))
        })?;
        self.limits.check_xml_size(metadata.len() as usize)?;
        fs::read_to_string(&path).map_err(|e| {
            Error::Resource(format!("Failed to read file '{}': {}", path.display(), e))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_load_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "<xs:schema/>").unwrap();

        let resolver = FileResolver::new();
        let content = resolver.resolve(&file.path().to_string_lossy()).unwrap();
        assert!(content.contains("<xs:schema/>"));
    }

    #[test]
    fn test_memory_resolver() {
        let resolver = MemoryResolver::new().with_document("a.xsd", "<schema/>");
        assert_eq!(resolver.resolve("a.xsd").unwrap(), "<schema/>");
        assert!(matches!(resolver.resolve("b.xsd"), Err(Error::Resource(_))));
    }

    #[test]
    fn test_size_limit() {
        let mut file = NamedTempFile::new().unwrap();
        let large_content = "x".repeat(11 * 1024 * 1024);
        write!(file, "{}", large_content).unwrap();

        let resolver = FileResolver::new().with_limits(Limits::strict());
        let result = resolver.resolve(&file.path().to_string_lossy());
        assert!(matches!(result, Err(Error::LimitExceeded { .. })));
    }

    #[test]
    fn test_remote_rejected() {
        let resolver = FileResolver::new();
        assert!(resolver.resolve("http://example.com/a.xsd").is_err());
    }
}
