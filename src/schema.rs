//! Building grammars from schema documents
//!
//! [`SchemaLoader`] is the entry point: it runs the traversal phases over a
//! root document and everything it references and returns a
//! [`BuiltSchema`] holding the grammars and every diagnostic.

use crate::config::TraversalOptions;
use crate::diagnostics::Diagnostic;
use crate::error::Result;
use crate::grammar::{GrammarBucket, RedefinitionRecord, SchemaGrammar};
use crate::loaders::{FileResolver, SchemaResolver};
use crate::locations::resolve_location;
use crate::summary::SchemaSetSummary;
use crate::traversers::TraversalContext;

/// Loads a schema set into grammars
pub struct SchemaLoader {
    options: TraversalOptions,
    resolver: Box<dyn SchemaResolver>,
}

impl SchemaLoader {
    /// Create a loader reading referenced documents from the file system
    pub fn new(options: TraversalOptions) -> Self {
        let resolver = FileResolver::new().with_limits(options.limits.clone());
        Self {
            options,
            resolver: Box::new(resolver),
        }
    }

    /// Replace the resolver used for referenced documents
    pub fn with_resolver(mut self, resolver: impl SchemaResolver + 'static) -> Self {
        self.resolver = Box::new(resolver);
        self
    }

    pub fn options(&self) -> &TraversalOptions {
        &self.options
    }

    /// Build the schema set rooted at `text`
    ///
    /// Relative `schemaLocation`s are resolved against `system_id`.
    pub fn load_str(self, text: &str, system_id: &str) -> Result<BuiltSchema> {
        let mut ctx = TraversalContext::new(self.options).with_resolver(self.resolver);
        ctx.load_str(text, system_id)?;
        ctx.traverse_globals();

        let documents = (0..ctx.document_count())
            .map(|doc| ctx.document(doc).system_id.clone())
            .collect();
        let (grammars, reporter, redefinitions) = ctx.into_parts();
        let diagnostics = reporter.into_diagnostics();
        tracing::info!(
            grammars = grammars.len(),
            diagnostics = diagnostics.len(),
            "schema set built"
        );
        Ok(BuiltSchema {
            grammars,
            diagnostics,
            redefinitions,
            documents,
        })
    }

    /// Build the schema set rooted at `location`, read through the resolver
    pub fn load_location(self, location: &str) -> Result<BuiltSchema> {
        let system_id = resolve_location(location, None)?;
        let text = self.resolver.resolve(&system_id)?;
        self.load_str(&text, &system_id)
    }
}

impl Default for SchemaLoader {
    fn default() -> Self {
        Self::new(TraversalOptions::default())
    }
}

/// Result of loading a schema set
#[derive(Debug, Clone)]
pub struct BuiltSchema {
    grammars: GrammarBucket,
    diagnostics: Vec<Diagnostic>,
    redefinitions: Vec<RedefinitionRecord>,
    documents: Vec<String>,
}

impl BuiltSchema {
    pub fn grammars(&self) -> &GrammarBucket {
        &self.grammars
    }

    /// Grammar of `namespace`
    pub fn grammar(&self, namespace: Option<&str>) -> Option<&SchemaGrammar> {
        self.grammars.get(namespace)
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    /// Error diagnostics only
    pub fn errors(&self) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics.iter().filter(|d| d.is_error())
    }

    /// No error was reported
    pub fn is_valid(&self) -> bool {
        self.errors().next().is_none()
    }

    /// Diagnostics with the given key
    pub fn diagnostics_with_key<'a>(&'a self, key: &'a str) -> impl Iterator<Item = &'a Diagnostic> + 'a {
        self.diagnostics.iter().filter(move |d| d.key == key)
    }

    pub fn redefinitions(&self) -> &[RedefinitionRecord] {
        &self.redefinitions
    }

    /// System ids of every loaded document, root first
    pub fn documents(&self) -> &[String] {
        &self.documents
    }

    pub fn summary(&self) -> SchemaSetSummary {
        SchemaSetSummary::new(&self.grammars, &self.diagnostics, &self.redefinitions)
    }
}
