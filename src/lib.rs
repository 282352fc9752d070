//! # xmlschema-grammar
//!
//! Builds XML Schema 1.0 grammars from schema documents.
//!
//! Schema documents are parsed into a small element tree through either a
//! pull reader or push callbacks. A family of traversers then walks the
//! tree, checks each element's attributes, and turns `group`,
//! `attributeGroup`, `element`, the model-group compositors, wildcards and
//! identity constraints into components of a per-namespace grammar.
//! `include`, `import` and `redefine` are followed.
//!
//! Problems in a schema are reported as [`Diagnostic`]s keyed by the
//! constraint they violate; traversal carries on past them. Only failure
//! to read the root document is an [`Error`].
//!
//! ## Example
//!
//! ```rust
//! use xmlschema_grammar::{SchemaLoader, TraversalOptions};
//!
//! let text = r#"<xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema"
//!                          targetNamespace="urn:example">
//!     <xs:group name="g">
//!         <xs:sequence>
//!             <xs:element name="a"/>
//!         </xs:sequence>
//!     </xs:group>
//! </xs:schema>"#;
//!
//! let schema = SchemaLoader::new(TraversalOptions::default())
//!     .load_str(text, "example.xsd")
//!     .unwrap();
//! assert!(schema.is_valid());
//! let grammar = schema.grammar(Some("urn:example")).unwrap();
//! assert_eq!(grammar.groups.len(), 1);
//! ```

#![warn(clippy::all)]

// Foundation
pub mod error;
pub mod limits;
pub mod config;
pub mod diagnostics;

// Names and locations
pub mod namespaces;
pub mod names;
pub mod locations;

// Documents
pub mod loaders;
pub mod events;
pub mod documents;

// Components and grammars
pub mod components;
pub mod xpath;
pub mod grammar;
pub mod traversers;

// Schema sets
pub mod schema;
pub mod summary;

pub use config::{EventSource, TraversalOptions};
pub use diagnostics::{Diagnostic, ErrorReporter, Severity};
pub use error::{Error, Result};
pub use grammar::{GrammarBucket, SchemaGrammar};
pub use limits::Limits;
pub use loaders::{FileResolver, MemoryResolver, SchemaResolver};
pub use schema::{BuiltSchema, SchemaLoader};
pub use summary::SchemaSetSummary;

/// Version of the library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// XSD 1.0 namespace
pub const XSD_NAMESPACE: &str = "http://www.w3.org/2001/XMLSchema";

/// XML namespace
pub const XML_NAMESPACE: &str = "http://www.w3.org/XML/1998/namespace";

/// XMLNS namespace
pub const XMLNS_NAMESPACE: &str = "http://www.w3.org/2000/xmlns/";
