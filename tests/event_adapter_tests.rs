//! The pull reader and the push callbacks must build the same grammars

use pretty_assertions::assert_eq;

use xmlschema_grammar::diagnostics;
use xmlschema_grammar::documents::{SchemaDocument, SchemaElement};
use xmlschema_grammar::{EventSource, MemoryResolver, SchemaLoader, TraversalOptions};

const SCHEMA: &str = r###"<?xml version="1.0" encoding="UTF-8"?>
<!-- a schema exercising most traversers -->
<xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema"
           xmlns:t="urn:t" targetNamespace="urn:t" elementFormDefault="qualified">
  <xs:annotation><xs:documentation>Top level</xs:documentation></xs:annotation>
  <xs:group name="g">
    <xs:sequence>
      <xs:element name="a" type="xs:string"/>
      <xs:choice minOccurs="0">
        <xs:element name="b"/>
        <xs:any namespace="##other" processContents="lax"/>
      </xs:choice>
    </xs:sequence>
  </xs:group>
  <xs:attributeGroup name="ag">
    <xs:attribute name="id" type="xs:ID" use="required"/>
    <xs:anyAttribute namespace="##local"/>
  </xs:attributeGroup>
  <xs:complexType name="ct">
    <xs:group ref="t:g"/>
    <xs:attributeGroup ref="t:ag"/>
  </xs:complexType>
  <xs:element name="root" type="t:ct">
    <xs:unique name="u"><xs:selector xpath="t:a"/><xs:field xpath="."/></xs:unique>
  </xs:element>
  <xs:element name="broken"><xs:bogus/></xs:element>
</xs:schema>"###;

fn build(source: EventSource) -> xmlschema_grammar::BuiltSchema {
    SchemaLoader::new(TraversalOptions::default().with_event_source(source))
        .with_resolver(MemoryResolver::new())
        .load_str(SCHEMA, "mem/adapters.xsd")
        .unwrap()
}

fn shape(element: &SchemaElement) -> String {
    let children: Vec<String> = element.child_elements().iter().map(|c| shape(c)).collect();
    let mut attributes: Vec<String> = element
        .attributes
        .iter()
        .map(|a| format!("{}={}", a.name, a.value))
        .collect();
    attributes.sort();
    format!("{}[{}]({})", element.qname, attributes.join(","), children.join(","))
}

#[test]
fn test_adapters_build_same_tree() {
    let pulled = SchemaDocument::parse_pull(SCHEMA, Some("mem/adapters.xsd")).unwrap();
    let pushed = SchemaDocument::parse_push(SCHEMA, Some("mem/adapters.xsd")).unwrap();
    assert_eq!(shape(&pulled.root), shape(&pushed.root));
}

#[test]
fn test_adapters_build_same_grammars() {
    let pulled = build(EventSource::Pull);
    let pushed = build(EventSource::Push);

    assert_eq!(pulled.summary(), pushed.summary());
    let keys = |schema: &xmlschema_grammar::BuiltSchema| {
        schema.diagnostics().iter().map(|d| d.key).collect::<Vec<_>>()
    };
    assert_eq!(keys(&pulled), keys(&pushed));
    assert_eq!(keys(&pulled), vec![diagnostics::keys::ELT_MUST_MATCH_1]);
}

#[test]
fn test_grammar_contents() {
    let schema = build(EventSource::Pull);
    let summary = schema.summary();
    let grammar = &summary.grammars[0];
    assert_eq!(grammar.target_namespace.as_deref(), Some("urn:t"));
    assert_eq!(grammar.elements, vec!["{urn:t}root", "{urn:t}broken"]);
    assert_eq!(grammar.complex_types, vec!["{urn:t}ct"]);
    assert_eq!(grammar.groups[0].particles, vec!["{urn:t}a", "(choice)"]);
    assert_eq!(grammar.attribute_groups[0].attributes, vec!["id"]);
    assert!(grammar.attribute_groups[0].wildcard);
    assert_eq!(grammar.identity_constraints[0].fields, 1);
    assert_eq!(grammar.annotations, 1);
}

#[test]
fn test_malformed_document_fails_with_either_adapter() {
    for source in [EventSource::Pull, EventSource::Push] {
        let result = SchemaLoader::new(TraversalOptions::default().with_event_source(source))
            .load_str("<xs:schema xmlns:xs=\"http://www.w3.org/2001/XMLSchema\">", "mem/x.xsd");
        assert!(result.is_err(), "{:?} accepted a truncated document", source);
    }
}
