//! Canonical XML event stream
//!
//! Two adapters normalize external XML event models into the callbacks of
//! [`SchemaEventHandler`]: [`pull`] drives a `quick-xml` reader, [`push`]
//! adapts SAX-style callbacks. The schema document builder consumes only
//! the canonical stream, so it does not care which adapter produced it.
//!
//! Every callback may fail; an `Err` aborts the whole document.

pub mod pull;
pub mod push;

use serde::Serialize;

use crate::error::Result;
use crate::namespaces::{NamespaceBinding, NamespaceContext, QName};

/// One-based line and column of a node in its document
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct TextPosition {
    pub line: u32,
    pub column: u32,
}

impl TextPosition {
    pub fn new(line: u32, column: u32) -> Self {
        Self { line, column }
    }
}

/// Document identity and the position of the event being delivered
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Locator {
    pub system_id: Option<String>,
    pub position: TextPosition,
}

/// Resolved element or attribute name together with its lexical prefix
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElementName {
    pub qname: QName,
    pub prefix: Option<String>,
}

impl ElementName {
    pub fn new(qname: QName, prefix: Option<String>) -> Self {
        Self { qname, prefix }
    }

    pub fn local_name(&self) -> &str {
        &self.qname.local_name
    }

    /// The name as written in the document
    pub fn raw(&self) -> String {
        match &self.prefix {
            Some(prefix) => format!("{}:{}", prefix, self.qname.local_name),
            None => self.qname.local_name.clone(),
        }
    }
}

/// A non-namespace-declaration attribute
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventAttribute {
    pub name: ElementName,
    pub value: String,
}

/// Payload of a start-element event
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StartElement {
    pub name: ElementName,
    pub attributes: Vec<EventAttribute>,
    /// Namespace declarations made on this element
    pub namespace_decls: Vec<NamespaceBinding>,
    pub position: TextPosition,
}

/// Consumer of the canonical event stream
pub trait SchemaEventHandler {
    fn start_document(&mut self, locator: &Locator, namespaces: &NamespaceContext) -> Result<()>;

    fn start_element(&mut self, element: &StartElement) -> Result<()>;

    fn characters(&mut self, text: &str) -> Result<()>;

    fn ignorable_whitespace(&mut self, _text: &str) -> Result<()> {
        Ok(())
    }

    fn end_element(&mut self, name: &ElementName) -> Result<()>;

    fn end_document(&mut self) -> Result<()>;

    fn processing_instruction(&mut self, _target: &str, _data: Option<&str>) -> Result<()> {
        Ok(())
    }

    fn start_cdata(&mut self) -> Result<()> {
        Ok(())
    }

    fn end_cdata(&mut self) -> Result<()> {
        Ok(())
    }
}

/// Byte offset to line/column mapping
#[derive(Debug, Clone)]
pub(crate) struct LineIndex {
    line_starts: Vec<usize>,
}

impl LineIndex {
    pub(crate) fn new(text: &str) -> Self {
        let mut line_starts = vec![0];
        line_starts.extend(text.match_indices('\n').map(|(i, _)| i + 1));
        Self { line_starts }
    }

    pub(crate) fn position(&self, text: &str, offset: usize) -> TextPosition {
        let line = match self.line_starts.binary_search(&offset) {
            Ok(line) => line,
            Err(next) => next.saturating_sub(1),
        };
        let start = self.line_starts[line];
        let end = offset.min(text.len());
        let column = text
            .get(start..end)
            .map(|s| s.chars().count())
            .unwrap_or(end.saturating_sub(start));
        TextPosition::new(line as u32 + 1, column as u32 + 1)
    }
}

/// Split processing-instruction content into target and data
pub(crate) fn split_pi(content: &str) -> (&str, Option<&str>) {
    let content = content.trim_start();
    match content.find(|c: char| c.is_ascii_whitespace()) {
        Some(at) => {
            let data = content[at..].trim_start();
            (&content[..at], (!data.is_empty()).then_some(data))
        }
        None => (content, None),
    }
}
