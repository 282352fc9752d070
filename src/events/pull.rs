//! Pull adapter over `quick-xml`
//!
//! The reader is polled one event at a time and every event is forwarded
//! synchronously to a [`SchemaEventHandler`].

use quick_xml::events::{BytesStart, Event};
use quick_xml::name::{PrefixDeclaration, ResolveResult};
use quick_xml::NsReader;

use super::{
    split_pi, ElementName, EventAttribute, LineIndex, Locator, SchemaEventHandler, StartElement,
    TextPosition,
};
use crate::error::{Error, Result};
use crate::limits::Limits;
use crate::namespaces::{NamespaceBinding, NamespaceContext, QName};

/// Drives a handler from a `quick-xml` namespace-aware reader
pub struct PullEventSource<'a> {
    reader: NsReader<&'a [u8]>,
    text: &'a str,
    lines: LineIndex,
    system_id: Option<String>,
    limits: Limits,
}

impl<'a> PullEventSource<'a> {
    pub fn new(text: &'a str, system_id: Option<&str>) -> Self {
        let mut reader = NsReader::from_str(text);
        reader.trim_text(false);
        reader.expand_empty_elements(false);
        Self {
            reader,
            text,
            lines: LineIndex::new(text),
            system_id: system_id.map(str::to_string),
            limits: Limits::default(),
        }
    }

    pub fn with_limits(mut self, limits: Limits) -> Self {
        self.limits = limits;
        self
    }

    /// Read the whole document, forwarding each event to `handler`
    pub fn drive<H: SchemaEventHandler>(&mut self, handler: &mut H) -> Result<()> {
        self.limits.check_xml_size(self.text.len())?;
        let locator = Locator {
            system_id: self.system_id.clone(),
            position: TextPosition::new(1, 1),
        };
        handler.start_document(&locator, &NamespaceContext::new())?;

        let mut depth = 0usize;
        let mut seen_root = false;
        loop {
            let offset = self.reader.buffer_position();
            let (resolved, event) = self.reader.read_resolved_event()?;
            let namespace = owned_namespace(resolved)?;
            match event {
                Event::Start(e) => {
                    depth += 1;
                    self.limits.check_xml_depth(depth)?;
                    let start = self.start_element(namespace, &e, offset)?;
                    seen_root = true;
                    handler.start_element(&start)?;
                }
                Event::Empty(e) => {
                    self.limits.check_xml_depth(depth + 1)?;
                    let start = self.start_element(namespace, &e, offset)?;
                    seen_root = true;
                    handler.start_element(&start)?;
                    handler.end_element(&start.name)?;
                }
                Event::End(e) => {
                    depth = depth.saturating_sub(1);
                    let name = e.name();
                    let prefix = match name.prefix() {
                        Some(p) => Some(utf8(p.as_ref())?),
                        None => None,
                    };
                    let local = utf8(name.local_name().as_ref())?;
                    handler.end_element(&ElementName::new(QName::new(namespace, local), prefix))?;
                }
                Event::Text(e) => {
                    if depth == 0 {
                        continue;
                    }
                    let text = e.unescape()?;
                    if text.trim().is_empty() {
                        handler.ignorable_whitespace(&text)?;
                    } else {
                        handler.characters(&text)?;
                    }
                }
                Event::CData(e) => {
                    let text = utf8(&e)?;
                    handler.start_cdata()?;
                    handler.characters(&text)?;
                    handler.end_cdata()?;
                }
                Event::PI(e) => {
                    let content = utf8(&e)?;
                    let (target, data) = split_pi(&content);
                    handler.processing_instruction(target, data)?;
                }
                Event::Eof => break,
                Event::Decl(_) | Event::Comment(_) | Event::DocType(_) => {}
            }
        }

        if !seen_root {
            return Err(Error::Xml("document has no root element".to_string()));
        }
        if depth != 0 {
            return Err(Error::Xml(format!(
                "unexpected end of document, {} element(s) left open",
                depth
            )));
        }
        handler.end_document()
    }

    fn start_element(
        &self,
        namespace: Option<String>,
        start: &BytesStart<'_>,
        offset: usize,
    ) -> Result<StartElement> {
        let name = start.name();
        let prefix = match name.prefix() {
            Some(p) => Some(utf8(p.as_ref())?),
            None => None,
        };
        let local = utf8(name.local_name().as_ref())?;

        let mut attributes = Vec::new();
        let mut namespace_decls = Vec::new();
        for attr in start.attributes() {
            let attr = attr.map_err(|e| Error::Xml(format!("Failed to parse attribute: {}", e)))?;
            let value = attr.unescape_value()?.into_owned();
            match attr.key.as_namespace_binding() {
                Some(PrefixDeclaration::Default) => {
                    namespace_decls.push(NamespaceBinding::new(None::<String>, value));
                }
                Some(PrefixDeclaration::Named(p)) => {
                    namespace_decls.push(NamespaceBinding::new(Some(utf8(p)?), value));
                }
                None => {
                    let (resolved, attr_local) = self.reader.resolve_attribute(attr.key);
                    let attr_ns = owned_namespace(resolved)?;
                    let attr_prefix = match attr.key.prefix() {
                        Some(p) => Some(utf8(p.as_ref())?),
                        None => None,
                    };
                    attributes.push(EventAttribute {
                        name: ElementName::new(
                            QName::new(attr_ns, utf8(attr_local.as_ref())?),
                            attr_prefix,
                        ),
                        value,
                    });
                }
            }
        }
        self.limits.check_attributes(attributes.len())?;

        Ok(StartElement {
            name: ElementName::new(QName::new(namespace, local), prefix),
            attributes,
            namespace_decls,
            position: self.lines.position(self.text, offset),
        })
    }
}

fn owned_namespace(resolved: ResolveResult<'_>) -> Result<Option<String>> {
    match resolved {
        ResolveResult::Bound(ns) => Ok(Some(utf8(ns.as_ref())?)),
        ResolveResult::Unbound => Ok(None),
        ResolveResult::Unknown(prefix) => Err(Error::Namespace(format!(
            "Unknown prefix: {}",
            String::from_utf8_lossy(&prefix)
        ))),
    }
}

fn utf8(bytes: &[u8]) -> Result<String> {
    std::str::from_utf8(bytes)
        .map(str::to_string)
        .map_err(|e| Error::Xml(format!("Invalid UTF-8: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Recorder {
        events: Vec<String>,
    }

    impl SchemaEventHandler for Recorder {
        fn start_document(&mut self, _: &Locator, _: &NamespaceContext) -> Result<()> {
            self.events.push("start-doc".into());
            Ok(())
        }
        fn start_element(&mut self, element: &StartElement) -> Result<()> {
            self.events.push(format!(
                "start {} {}:{} decls={}",
                element.name.qname,
                element.position.line,
                element.position.column,
                element.namespace_decls.len()
            ));
            Ok(())
        }
        fn characters(&mut self, text: &str) -> Result<()> {
            self.events.push(format!("chars {}", text));
            Ok(())
        }
        fn end_element(&mut self, name: &ElementName) -> Result<()> {
            self.events.push(format!("end {}", name.qname));
            Ok(())
        }
        fn end_document(&mut self) -> Result<()> {
            self.events.push("end-doc".into());
            Ok(())
        }
        fn start_cdata(&mut self) -> Result<()> {
            self.events.push("cdata".into());
            Ok(())
        }
    }

    #[test]
    fn test_pull_events() {
        let xml = "<a xmlns='urn:a'>\n  <b x='1'/>t<![CDATA[c]]></a>";
        let mut recorder = Recorder::default();
        PullEventSource::new(xml, Some("a.xml"))
            .drive(&mut recorder)
            .unwrap();
        assert_eq!(
            recorder.events,
            vec![
                "start-doc",
                "start {urn:a}a 1:1 decls=1",
                "start {urn:a}b 2:3 decls=0",
                "end {urn:a}b",
                "chars t",
                "cdata",
                "chars c",
                "end {urn:a}a",
                "end-doc",
            ]
        );
    }

    #[test]
    fn test_unknown_prefix_is_fatal() {
        let mut recorder = Recorder::default();
        let result = PullEventSource::new("<p:a/>", None).drive(&mut recorder);
        assert!(matches!(result, Err(Error::Namespace(_))));
    }

    #[test]
    fn test_truncated_document_is_fatal() {
        let mut recorder = Recorder::default();
        assert!(PullEventSource::new("<a><b></b>", None).drive(&mut recorder).is_err());
        assert!(PullEventSource::new("", None).drive(&mut recorder).is_err());
    }
}
