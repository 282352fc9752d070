//! Schema document tree
//!
//! [`SchemaDomBuilder`] consumes the canonical event stream and produces an
//! immutable tree of [`SchemaElement`]s. Nodes are shared as `Arc` so
//! traversers and the global registry can hold on to subtrees.

use std::sync::Arc;

use crate::config::EventSource;
use crate::error::{Error, Result};
use crate::events::pull::PullEventSource;
use crate::events::{push, ElementName, Locator, SchemaEventHandler, StartElement};
use crate::limits::Limits;
use crate::namespaces::{NamespaceBinding, NamespaceContext, QName};
use crate::XSD_NAMESPACE;

pub use crate::events::TextPosition;

/// Attribute of a schema element
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElementAttribute {
    pub name: QName,
    pub prefix: Option<String>,
    pub value: String,
}

/// One element of a schema document
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaElement {
    pub qname: QName,
    pub prefix: Option<String>,
    pub attributes: Vec<ElementAttribute>,
    /// Declarations made on this element
    pub namespace_decls: Vec<NamespaceBinding>,
    pub children: Vec<Arc<SchemaElement>>,
    /// All character content directly inside this element
    pub text: String,
    /// Non-whitespace character content before the first child element
    pub leading_text: String,
    pub position: TextPosition,
}

impl SchemaElement {
    /// Create an element with no content
    pub fn new(qname: QName) -> Self {
        Self {
            qname,
            prefix: None,
            attributes: Vec::new(),
            namespace_decls: Vec::new(),
            children: Vec::new(),
            text: String::new(),
            leading_text: String::new(),
            position: TextPosition::default(),
        }
    }

    pub fn local_name(&self) -> &str {
        &self.qname.local_name
    }

    pub fn namespace(&self) -> Option<&str> {
        self.qname.namespace()
    }

    /// Whether this is the XSD element `local`
    pub fn is_xsd(&self, local: &str) -> bool {
        self.namespace() == Some(XSD_NAMESPACE) && self.local_name() == local
    }

    /// Value of an unqualified attribute
    pub fn attribute(&self, local: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|a| a.name.namespace.is_none() && a.name.local_name == local)
            .map(|a| a.value.as_str())
    }

    /// Value of a namespace-qualified attribute
    pub fn attribute_ns(&self, namespace: &str, local: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|a| a.name.namespace() == Some(namespace) && a.name.local_name == local)
            .map(|a| a.value.as_str())
    }

    pub fn first_child_element(&self) -> Option<&Arc<SchemaElement>> {
        self.children.first()
    }

    /// Child elements in document order
    pub fn child_elements(&self) -> &[Arc<SchemaElement>] {
        &self.children
    }

    /// Sibling following the child at `index`
    pub fn next_sibling_element(&self, index: usize) -> Option<&Arc<SchemaElement>> {
        self.children.get(index + 1)
    }

    /// Name as written in the document
    pub fn raw_name(&self) -> String {
        match &self.prefix {
            Some(prefix) => format!("{}:{}", prefix, self.qname.local_name),
            None => self.qname.local_name.clone(),
        }
    }
}

/// A parsed schema document
#[derive(Debug, Clone)]
pub struct SchemaDocument {
    pub root: Arc<SchemaElement>,
    pub system_id: Option<String>,
}

impl SchemaDocument {
    /// Parse `text` with the chosen event source
    pub fn parse_str(
        text: &str,
        system_id: Option<&str>,
        source: EventSource,
        limits: &Limits,
    ) -> Result<Self> {
        let builder = SchemaDomBuilder::new();
        let builder = match source {
            EventSource::Pull => {
                let mut builder = builder;
                PullEventSource::new(text, system_id)
                    .with_limits(limits.clone())
                    .drive(&mut builder)?;
                builder
            }
            EventSource::Push => push::parse_push(text, system_id, limits, builder)?,
        };
        builder.finish()
    }

    pub fn parse_pull(text: &str, system_id: Option<&str>) -> Result<Self> {
        Self::parse_str(text, system_id, EventSource::Pull, &Limits::default())
    }

    pub fn parse_push(text: &str, system_id: Option<&str>) -> Result<Self> {
        Self::parse_str(text, system_id, EventSource::Push, &Limits::default())
    }
}

/// Builds a [`SchemaDocument`] from canonical events
#[derive(Debug, Default)]
pub struct SchemaDomBuilder {
    system_id: Option<String>,
    stack: Vec<SchemaElement>,
    root: Option<Arc<SchemaElement>>,
    in_cdata: bool,
    finished: bool,
}

impl SchemaDomBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// The finished document
    pub fn finish(self) -> Result<SchemaDocument> {
        match (self.root, self.finished) {
            (Some(root), true) => Ok(SchemaDocument {
                root,
                system_id: self.system_id,
            }),
            _ => Err(Error::Incomplete {
                system_id: self.system_id.unwrap_or_default(),
            }),
        }
    }

    fn append_text(&mut self, text: &str, significant: bool) {
        if let Some(current) = self.stack.last_mut() {
            current.text.push_str(text);
            if significant && current.children.is_empty() {
                current.leading_text.push_str(text);
            }
        }
    }
}

impl SchemaEventHandler for SchemaDomBuilder {
    fn start_document(&mut self, locator: &Locator, _namespaces: &NamespaceContext) -> Result<()> {
        self.system_id = locator.system_id.clone();
        self.stack.clear();
        self.root = None;
        self.finished = false;
        Ok(())
    }

    fn start_element(&mut self, element: &StartElement) -> Result<()> {
        if self.root.is_some() {
            return Err(Error::Xml("content after the root element".to_string()));
        }
        let mut node = SchemaElement::new(element.name.qname.clone());
        node.prefix = element.name.prefix.clone();
        node.position = element.position;
        node.namespace_decls = element.namespace_decls.clone();
        node.attributes = element
            .attributes
            .iter()
            .map(|a| ElementAttribute {
                name: a.name.qname.clone(),
                prefix: a.name.prefix.clone(),
                value: a.value.clone(),
            })
            .collect();
        self.stack.push(node);
        Ok(())
    }

    fn characters(&mut self, text: &str) -> Result<()> {
        let significant = self.in_cdata || !text.trim().is_empty();
        self.append_text(text, significant);
        Ok(())
    }

    fn ignorable_whitespace(&mut self, text: &str) -> Result<()> {
        self.append_text(text, false);
        Ok(())
    }

    fn end_element(&mut self, name: &ElementName) -> Result<()> {
        let node = self
            .stack
            .pop()
            .ok_or_else(|| Error::Xml(format!("unexpected end tag {}", name.raw())))?;
        if node.qname != name.qname {
            return Err(Error::Xml(format!(
                "end tag {} does not match start tag {}",
                name.raw(),
                node.raw_name()
            )));
        }
        let node = Arc::new(node);
        match self.stack.last_mut() {
            Some(parent) => parent.children.push(node),
            None => self.root = Some(node),
        }
        Ok(())
    }

    fn end_document(&mut self) -> Result<()> {
        if !self.stack.is_empty() {
            return Err(Error::Xml("document ended inside an element".to_string()));
        }
        self.finished = true;
        Ok(())
    }

    fn start_cdata(&mut self) -> Result<()> {
        self.in_cdata = true;
        Ok(())
    }

    fn end_cdata(&mut self) -> Result<()> {
        self.in_cdata = false;
        Ok(())
    }
}
