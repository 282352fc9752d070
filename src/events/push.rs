//! Push adapter for SAX-style event sources
//!
//! [`SaxHandler`] is the callback surface a push parser calls into.
//! [`SaxSchemaAdapter`] implements it and folds prefix-mapping callbacks
//! into the canonical [`StartElement`]. [`drive_sax`] walks a `roxmltree`
//! document and pushes SAX callbacks, so the push path can be used without
//! an external parser.

use roxmltree::{Document, Node, NodeType};

use super::{ElementName, EventAttribute, Locator, SchemaEventHandler, StartElement, TextPosition};
use crate::error::{Error, Result};
use crate::limits::Limits;
use crate::namespaces::{NamespaceBinding, NamespaceContext, QName};
use crate::XML_NAMESPACE;

/// Attribute as delivered by a push parser
#[derive(Debug, Clone, Copy)]
pub struct SaxAttribute<'a> {
    pub uri: Option<&'a str>,
    pub local_name: &'a str,
    /// Name as written, possibly prefixed
    pub qname: &'a str,
    pub value: &'a str,
}

/// SAX-style callbacks
///
/// Methods have no-op defaults so a handler only implements what it uses.
pub trait SaxHandler {
    fn set_document_locator(&mut self, _locator: &Locator) {}

    fn start_document(&mut self) -> Result<()> {
        Ok(())
    }

    fn end_document(&mut self) -> Result<()> {
        Ok(())
    }

    fn start_prefix_mapping(&mut self, _prefix: Option<&str>, _uri: &str) -> Result<()> {
        Ok(())
    }

    fn end_prefix_mapping(&mut self, _prefix: Option<&str>) -> Result<()> {
        Ok(())
    }

    fn start_element(
        &mut self,
        _uri: Option<&str>,
        _local_name: &str,
        _qname: &str,
        _attributes: &[SaxAttribute<'_>],
    ) -> Result<()> {
        Ok(())
    }

    fn end_element(&mut self, _uri: Option<&str>, _local_name: &str, _qname: &str) -> Result<()> {
        Ok(())
    }

    fn characters(&mut self, _data: &str) -> Result<()> {
        Ok(())
    }

    fn ignorable_whitespace(&mut self, _data: &str) -> Result<()> {
        Ok(())
    }

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

/// Converts SAX callbacks into canonical events for `H`
pub struct SaxSchemaAdapter<H> {
    handler: H,
    pending_decls: Vec<NamespaceBinding>,
    locator: Locator,
}

impl<H: SchemaEventHandler> SaxSchemaAdapter<H> {
    pub fn new(handler: H) -> Self {
        Self {
            handler,
            pending_decls: Vec::new(),
            locator: Locator::default(),
        }
    }

    pub fn handler(&self) -> &H {
        &self.handler
    }

    pub fn into_inner(self) -> H {
        self.handler
    }
}

fn split_raw(qname: &str) -> (Option<String>, &str) {
    match qname.split_once(':') {
        Some((prefix, local)) => (Some(prefix.to_string()), local),
        None => (None, qname),
    }
}

impl<H: SchemaEventHandler> SaxHandler for SaxSchemaAdapter<H> {
    fn set_document_locator(&mut self, locator: &Locator) {
        self.locator = locator.clone();
    }

    fn start_document(&mut self) -> Result<()> {
        let locator = self.locator.clone();
        self.handler
            .start_document(&locator, &NamespaceContext::new())
    }

    fn end_document(&mut self) -> Result<()> {
        self.handler.end_document()
    }

    fn start_prefix_mapping(&mut self, prefix: Option<&str>, uri: &str) -> Result<()> {
        self.pending_decls.push(NamespaceBinding::new(prefix, uri));
        Ok(())
    }

    fn start_element(
        &mut self,
        uri: Option<&str>,
        local_name: &str,
        qname: &str,
        attributes: &[SaxAttribute<'_>],
    ) -> Result<()> {
        let (prefix, _) = split_raw(qname);
        let attributes = attributes
            .iter()
            .filter(|a| a.qname != "xmlns" && !a.qname.starts_with("xmlns:"))
            .map(|a| EventAttribute {
                name: ElementName::new(
                    QName::new(a.uri.filter(|u| !u.is_empty()), a.local_name),
                    split_raw(a.qname).0,
                ),
                value: a.value.to_string(),
            })
            .collect();
        let start = StartElement {
            name: ElementName::new(QName::new(uri.filter(|u| !u.is_empty()), local_name), prefix),
            attributes,
            namespace_decls: std::mem::take(&mut self.pending_decls),
            position: self.locator.position,
        };
        self.handler.start_element(&start)
    }

    fn end_element(&mut self, uri: Option<&str>, local_name: &str, qname: &str) -> Result<()> {
        let (prefix, _) = split_raw(qname);
        self.handler.end_element(&ElementName::new(
            QName::new(uri.filter(|u| !u.is_empty()), local_name),
            prefix,
        ))
    }

    fn characters(&mut self, data: &str) -> Result<()> {
        self.handler.characters(data)
    }

    fn ignorable_whitespace(&mut self, data: &str) -> Result<()> {
        self.handler.ignorable_whitespace(data)
    }

    fn processing_instruction(&mut self, target: &str, data: Option<&str>) -> Result<()> {
        self.handler.processing_instruction(target, data)
    }

    fn start_cdata(&mut self) -> Result<()> {
        self.handler.start_cdata()
    }

    fn end_cdata(&mut self) -> Result<()> {
        self.handler.end_cdata()
    }
}

/// Namespace declarations made on `node` itself
fn own_declarations(node: Node<'_, '_>) -> Vec<NamespaceBinding> {
    let parent_namespaces: Vec<(Option<&str>, &str)> = node
        .parent_element()
        .map(|p| p.namespaces().map(|ns| (ns.name(), ns.uri())).collect())
        .unwrap_or_default();
    let mut declared: Vec<NamespaceBinding> = node
        .namespaces()
        .filter(|ns| ns.uri() != XML_NAMESPACE)
        .filter(|ns| !parent_namespaces.contains(&(ns.name(), ns.uri())))
        .map(|ns| NamespaceBinding::new(ns.name(), ns.uri()))
        .collect();
    let had_default = parent_namespaces.iter().any(|(p, _)| p.is_none());
    let has_default = node.namespaces().any(|ns| ns.name().is_none());
    if had_default && !has_default {
        declared.push(NamespaceBinding::new(None::<String>, ""));
    }
    declared
}

fn raw_name(node: Node<'_, '_>, namespace: Option<&str>, local: &str) -> String {
    match namespace.and_then(|ns| node.lookup_prefix(ns)) {
        Some(prefix) if !prefix.is_empty() => format!("{}:{}", prefix, local),
        _ => local.to_string(),
    }
}

struct Walker<'d, 'input> {
    doc: &'d Document<'input>,
    system_id: Option<String>,
    limits: &'d Limits,
}

impl<'d, 'input> Walker<'d, 'input> {
    fn locate(&self, node: Node<'_, '_>) -> Locator {
        let pos = self.doc.text_pos_at(node.range().start);
        Locator {
            system_id: self.system_id.clone(),
            position: TextPosition::new(pos.row, pos.col),
        }
    }

    /// Push `node` and its subtree; `depth` counts enclosing elements
    fn node<S: SaxHandler>(&self, node: Node<'_, '_>, depth: usize, sax: &mut S) -> Result<()> {
        match node.node_type() {
            NodeType::Element => self.element(node, depth + 1, sax),
            NodeType::Text if depth > 0 => {
                let data = node.text().unwrap_or_default();
                if data.trim().is_empty() {
                    sax.ignorable_whitespace(data)
                } else {
                    sax.characters(data)
                }
            }
            NodeType::PI => match node.pi() {
                Some(pi) => sax.processing_instruction(pi.target, pi.value),
                None => Ok(()),
            },
            _ => Ok(()),
        }
    }

    fn element<S: SaxHandler>(&self, node: Node<'_, '_>, depth: usize, sax: &mut S) -> Result<()> {
        self.limits.check_xml_depth(depth)?;
        let attrs = node.attributes();
        self.limits.check_attributes(attrs.len())?;

        let decls = own_declarations(node);
        for decl in &decls {
            sax.start_prefix_mapping(decl.prefix.as_deref(), &decl.uri)?;
        }
        let qnames: Vec<String> = attrs
            .clone()
            .map(|a| raw_name(node, a.namespace(), a.name()))
            .collect();
        let sax_attrs: Vec<SaxAttribute<'_>> = attrs
            .zip(qnames.iter())
            .map(|(a, qname)| SaxAttribute {
                uri: a.namespace(),
                local_name: a.name(),
                qname,
                value: a.value(),
            })
            .collect();
        let tag = node.tag_name();
        let qname = raw_name(node, tag.namespace(), tag.name());
        sax.set_document_locator(&self.locate(node));
        sax.start_element(tag.namespace(), tag.name(), &qname, &sax_attrs)?;

        for child in node.children() {
            self.node(child, depth, sax)?;
        }

        sax.end_element(tag.namespace(), tag.name(), &qname)?;
        for decl in decls.iter().rev() {
            sax.end_prefix_mapping(decl.prefix.as_deref())?;
        }
        Ok(())
    }
}

/// Parse `text` with `roxmltree` and push its events into `sax`
pub fn drive_sax<S: SaxHandler>(
    text: &str,
    system_id: Option<&str>,
    limits: &Limits,
    sax: &mut S,
) -> Result<()> {
    limits.check_xml_size(text.len())?;
    let doc = Document::parse(text)?;
    let walker = Walker {
        doc: &doc,
        system_id: system_id.map(str::to_string),
        limits,
    };

    sax.set_document_locator(&Locator {
        system_id: walker.system_id.clone(),
        position: TextPosition::new(1, 1),
    });
    sax.start_document()?;
    for child in doc.root().children() {
        walker.node(child, 0, sax)?;
    }
    sax.end_document()
}

/// Run `handler` over `text` through the push path and hand it back
pub fn parse_push<H: SchemaEventHandler>(
    text: &str,
    system_id: Option<&str>,
    limits: &Limits,
    handler: H,
) -> Result<H> {
    let mut adapter = SaxSchemaAdapter::new(handler);
    drive_sax(text, system_id, limits, &mut adapter)?;
    if !adapter.pending_decls.is_empty() {
        return Err(Error::Xml(
            "prefix mappings were not followed by an element".to_string(),
        ));
    }
    Ok(adapter.into_inner())
}
