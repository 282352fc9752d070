//! Error types for xmlschema-grammar
//!
//! Only fatal failures are represented here: a document that cannot be read,
//! an XML stream that cannot be parsed, or a root element that is not a
//! schema. Structural problems found while traversing a schema document are
//! reported as [`Diagnostic`](crate::diagnostics::Diagnostic)s instead, and
//! traversal continues past them.

use thiserror::Error;

/// Result type alias using the crate [`Error`]
pub type Result<T> = std::result::Result<T, Error>;

/// Fatal failure while loading a schema document
#[derive(Error, Debug)]
pub enum Error {
    /// The root element of a document is not `xs:schema`
    #[error("{system_id}: root element {found} is not {{http://www.w3.org/2001/XMLSchema}}schema")]
    NotSchema { system_id: String, found: String },

    /// The attributes of the `xs:schema` element are unusable
    #[error("{system_id}: attributes of the schema element could not be checked")]
    RootAttributes { system_id: String },

    /// The event stream stopped before the root element was closed
    #[error("{system_id}: document ended before its root element was complete")]
    Incomplete { system_id: String },

    /// A document could not be located or read
    #[error("resource error: {0}")]
    Resource(String),

    /// Unbound prefix in the event stream
    #[error("namespace error: {0}")]
    Namespace(String),

    /// A configured [`Limits`](crate::limits::Limits) bound was crossed
    #[error("{limit} {actual} exceeds maximum {max}")]
    LimitExceeded {
        limit: &'static str,
        actual: usize,
        max: usize,
    },

    /// Malformed XML reported by an event source
    #[error("XML error: {0}")]
    Xml(String),

    /// Unreadable traversal options
    #[error("invalid options: {0}")]
    Config(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("URL error: {0}")]
    Url(#[from] url::ParseError),
}

impl Error {
    /// The document could not be parsed or is not a schema
    pub fn is_malformed(&self) -> bool {
        matches!(
            self,
            Error::NotSchema { .. }
                | Error::RootAttributes { .. }
                | Error::Incomplete { .. }
                | Error::Xml(_)
                | Error::Namespace(_)
        )
    }
}

impl From<quick_xml::Error> for Error {
    fn from(err: quick_xml::Error) -> Self {
        Error::Xml(err.to_string())
    }
}

impl From<roxmltree::Error> for Error {
    fn from(err: roxmltree::Error) -> Self {
        Error::Xml(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_schema_display() {
        let err = Error::NotSchema {
            system_id: "a.xsd".into(),
            found: "{urn:x}root".into(),
        };
        let msg = err.to_string();
        assert!(msg.starts_with("a.xsd: root element {urn:x}root"));
        assert!(err.is_malformed());
    }

    #[test]
    fn test_limit_display() {
        let err = Error::LimitExceeded {
            limit: "schema depth",
            actual: 4,
            max: 3,
        };
        assert_eq!(err.to_string(), "schema depth 4 exceeds maximum 3");
        assert!(!err.is_malformed());
    }

    #[test]
    fn test_xml_error_conversion() {
        let err: Error = roxmltree::Document::parse("<a>").unwrap_err().into();
        assert!(matches!(err, Error::Xml(_)));
    }
}
