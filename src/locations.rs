//! Resource location resolution
//!
//! `schemaLocation` values are resolved against the system id of the
//! document that contains the `include`, `import` or `redefine`.

use std::path::{Path, PathBuf};
use url::Url;

use crate::error::Result;

/// Resource location - can be a URL, file path, or string identifier
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Location {
    /// File system path
    Path(PathBuf),
    /// URL (http, https, file with a non-path form, ...)
    Url(Url),
    /// Opaque identifier (for in-memory resources)
    String(String),
}

impl Location {
    /// Classify a system id
    pub fn parse(s: &str) -> Self {
        if let Ok(url) = Url::parse(s) {
            if url.scheme() == "file" {
                if let Ok(path) = url.to_file_path() {
                    return Location::Path(path);
                }
            }
            // Single letters are Windows drive prefixes, not schemes.
            if url.scheme().len() > 1 {
                return Location::Url(url);
            }
        }
        if s.starts_with('/') || s.starts_with('.') || Path::new(s).exists() {
            return Location::Path(PathBuf::from(s));
        }
        Location::String(s.to_string())
    }

    /// Get the location as a system id string
    pub fn as_str(&self) -> String {
        match self {
            Location::Path(p) => p.to_string_lossy().to_string(),
            Location::Url(u) => u.to_string(),
            Location::String(s) => s.clone(),
        }
    }
}

/// Resolve `location` relative to the system id `base`
///
/// Absolute URLs are returned unchanged. Relative references are joined
/// with the base URL, or with the directory of the base path. Without a
/// base the location is returned as given.
pub fn resolve_location(location: &str, base: Option<&str>) -> Result<String> {
    let location = location.trim();
    if let Ok(url) = Url::parse(location) {
        if url.scheme().len() > 1 {
            return Ok(url.to_string());
        }
    }
    let Some(base) = base else {
        return Ok(location.to_string());
    };
    match Location::parse(base) {
        Location::Url(base_url) => Ok(base_url.join(location)?.to_string()),
        Location::Path(base_path) => Ok(join_path(&base_path, location)),
        Location::String(base_id) => Ok(join_path(Path::new(&base_id), location)),
    }
}

fn join_path(base: &Path, location: &str) -> String {
    if Path::new(location).is_absolute() {
        return location.to_string();
    }
    let joined = match base.parent() {
        Some(dir) => dir.join(location),
        None => PathBuf::from(location),
    };
    normalize(&joined).to_string_lossy().to_string()
}

/// Remove `.` segments and fold `..` where possible
fn normalize(path: &Path) -> PathBuf {
    use std::path::Component;
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                let can_pop = matches!(
                    out.components().next_back(),
                    Some(Component::Normal(_))
                );
                if can_pop {
                    out.pop();
                } else {
                    out.push("..");
                }
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_location_from_url() {
        let loc = Location::parse("http://example.com/schema.xsd");
        assert!(matches!(loc, Location::Url(_)));
        assert_eq!(loc.as_str(), "http://example.com/schema.xsd");
    }

    #[test]
    fn test_location_from_path() {
        let loc = Location::parse("/tmp/schema.xsd");
        assert!(matches!(loc, Location::Path(_)));
        assert_eq!(Location::parse("main.xsd"), Location::String("main.xsd".into()));
    }

    #[test]
    fn test_resolve_against_url() {
        let resolved =
            resolve_location("types.xsd", Some("http://example.com/a/main.xsd")).unwrap();
        assert_eq!(resolved, "http://example.com/a/types.xsd");
    }

    #[test]
    fn test_resolve_against_path() {
        let resolved = resolve_location("../common/types.xsd", Some("/schemas/a/main.xsd")).unwrap();
        assert_eq!(resolved, "/schemas/common/types.xsd");
    }

    #[test]
    fn test_resolve_against_identifier() {
        assert_eq!(resolve_location("b.xsd", Some("main.xsd")).unwrap(), "b.xsd");
        assert_eq!(resolve_location("inc/b.xsd", Some("dir/main.xsd")).unwrap(), "dir/inc/b.xsd");
        assert_eq!(resolve_location("b.xsd", None).unwrap(), "b.xsd");
    }

    #[test]
    fn test_absolute_location_is_kept() {
        let resolved =
            resolve_location("http://other.org/x.xsd", Some("/schemas/main.xsd")).unwrap();
        assert_eq!(resolved, "http://other.org/x.xsd");
    }
}
