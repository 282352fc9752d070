//! Integration tests for schema traversal
//!
//! Schemas are built from in-memory documents; referenced documents are
//! served by a `MemoryResolver` under the `mem/` prefix.

use pretty_assertions::assert_eq;

use xmlschema_grammar::components::{Compositor, Particle, Term};
use xmlschema_grammar::diagnostics::keys;
use xmlschema_grammar::namespaces::QName;
use xmlschema_grammar::traversers::{groups, traverse_all, traverse_sequence, ParticleContext, TraversalContext};
use xmlschema_grammar::{BuiltSchema, Error, Limits, MemoryResolver, SchemaLoader, TraversalOptions};

const XSD: &str = "http://www.w3.org/2001/XMLSchema";

fn schema_text(body: &str) -> String {
    format!(
        r#"<xs:schema xmlns:xs="{XSD}" xmlns:t="urn:t" targetNamespace="urn:t">{body}</xs:schema>"#
    )
}

fn load_with(body: &str, options: TraversalOptions, resolver: MemoryResolver) -> BuiltSchema {
    SchemaLoader::new(options)
        .with_resolver(resolver)
        .load_str(&schema_text(body), "mem/main.xsd")
        .unwrap()
}

fn load(body: &str) -> BuiltSchema {
    load_with(body, TraversalOptions::default(), MemoryResolver::new())
}

fn t(local: &str) -> QName {
    QName::namespaced("urn:t", local)
}

fn element_names(particles: &[Particle]) -> Vec<String> {
    particles
        .iter()
        .map(|p| match &p.term {
            Term::Element(element) => element.name().local_name.clone(),
            Term::Wildcard(_) => "*".to_string(),
            Term::ModelGroup(group) => format!("({})", group.compositor),
        })
        .collect()
}

fn group_particles(schema: &BuiltSchema, local: &str) -> Vec<String> {
    let grammar = schema.grammar(Some("urn:t")).unwrap();
    let group = grammar.groups.get(&t(local)).unwrap();
    element_names(&group.model_group.particles)
}

fn context_for(body: &str) -> TraversalContext {
    let mut ctx = TraversalContext::new(TraversalOptions::default());
    ctx.load_str(&schema_text(body), "mem/main.xsd").unwrap();
    ctx
}

// =============================================================================
// Compositors
// =============================================================================

#[test]
fn test_sequence_skips_invalid_child() {
    let mut ctx = context_for(
        r#"<xs:group name="g">
             <xs:sequence>
               <xs:element name="a"/>
               <xs:choice><xs:element name="b"/></xs:choice>
               <xs:foo/>
             </xs:sequence>
           </xs:group>"#,
    );
    let root = ctx.document(0).root.clone();
    let sequence = root.child_elements()[0].child_elements()[0].clone();

    let particle = traverse_sequence(&mut ctx, 0, &sequence, ParticleContext::NONE).unwrap();
    let group = particle.model_group().unwrap();
    assert_eq!(group.compositor, Compositor::Sequence);
    assert_eq!(element_names(&group.particles), vec!["a", "(choice)"]);
    assert_eq!(ctx.reporter().count_key(keys::ELT_MUST_MATCH_1), 1);
    assert!(ctx.accumulator().is_empty());
}

#[test]
fn test_all_rejects_choice_child() {
    let schema = load(
        r#"<xs:group name="g">
             <xs:all>
               <xs:element name="a"/>
               <xs:choice/>
             </xs:all>
           </xs:group>"#,
    );
    assert_eq!(schema.diagnostics_with_key(keys::ELT_MUST_MATCH_1).count(), 1);
    let grammar = schema.grammar(Some("urn:t")).unwrap();
    let group = grammar.groups.get(&t("g")).unwrap();
    assert_eq!(group.compositor(), Compositor::All);
    assert_eq!(group_particles(&schema, "g"), vec!["a"]);
}

#[test]
fn test_all_element_max_occurs_is_clamped() {
    let mut ctx = context_for(
        r#"<xs:group name="g">
             <xs:all><xs:element name="a" maxOccurs="2"/></xs:all>
           </xs:group>"#,
    );
    let root = ctx.document(0).root.clone();
    let all = root.child_elements()[0].child_elements()[0].clone();

    let particle = traverse_all(&mut ctx, 0, &all, ParticleContext::NONE).unwrap();
    let group = particle.model_group().unwrap();
    assert_eq!(group.particles[0].occurs.max, Some(1));
    assert_eq!(ctx.reporter().count_key(keys::COS_ALL_LIMITED_2), 1);
}

#[test]
fn test_all_group_reference_inside_sequence() {
    let schema = load(
        r#"<xs:group name="allg"><xs:all><xs:element name="x"/></xs:all></xs:group>
           <xs:group name="g">
             <xs:sequence>
               <xs:group ref="t:allg"/>
               <xs:element name="y"/>
             </xs:sequence>
           </xs:group>"#,
    );
    assert_eq!(schema.diagnostics_with_key(keys::COS_ALL_LIMITED_1_2).count(), 1);
    assert_eq!(group_particles(&schema, "g"), vec!["y"]);
}

#[test]
fn test_max_occurs_zero_particles_are_dropped() {
    let schema = load(
        r#"<xs:group name="g">
             <xs:choice>
               <xs:element name="a" minOccurs="0" maxOccurs="0"/>
               <xs:any maxOccurs="0" minOccurs="0"/>
               <xs:element name="b"/>
             </xs:choice>
           </xs:group>"#,
    );
    assert!(schema.is_valid(), "{:?}", schema.diagnostics());
    assert_eq!(group_particles(&schema, "g"), vec!["b"]);
}

#[test]
fn test_occurs_on_group_compositor_not_allowed() {
    let schema = load(
        r#"<xs:group name="g">
             <xs:sequence maxOccurs="3"><xs:element name="a"/></xs:sequence>
           </xs:group>"#,
    );
    assert_eq!(schema.diagnostics_with_key(keys::ATT_NOT_ALLOWED).count(), 1);
}

#[test]
fn test_empty_compositor_keeps_empty_sequence() {
    let schema = load(r#"<xs:group name="g"><xs:choice/></xs:group>"#);
    assert!(schema.is_valid());
    let grammar = schema.grammar(Some("urn:t")).unwrap();
    let group = grammar.groups.get(&t("g")).unwrap();
    assert!(group.model_group.particles.is_empty());
    assert_eq!(group.compositor(), Compositor::Choice);
}

#[test]
fn test_empty_all_group_reference_inside_sequence() {
    let schema = load(
        r#"<xs:group name="allg"><xs:all/></xs:group>
           <xs:group name="g">
             <xs:sequence>
               <xs:group ref="t:allg"/>
               <xs:element name="y"/>
             </xs:sequence>
           </xs:group>"#,
    );
    let grammar = schema.grammar(Some("urn:t")).unwrap();
    assert_eq!(grammar.groups.get(&t("allg")).unwrap().compositor(), Compositor::All);
    assert_eq!(schema.diagnostics_with_key(keys::COS_ALL_LIMITED_1_2).count(), 1);
    assert_eq!(group_particles(&schema, "g"), vec!["y"]);
}

#[test]
fn test_max_occurs_limit_spares_sole_sequence_particle() {
    let limits = Limits {
        max_occurs_limit: Some(100),
        ..Limits::default()
    };
    let options = TraversalOptions::default().with_limits(limits);
    let schema = load_with(
        r#"<xs:group name="g">
             <xs:sequence><xs:element name="a" maxOccurs="500"/></xs:sequence>
           </xs:group>
           <xs:group name="h">
             <xs:choice>
               <xs:element name="b" maxOccurs="500"/>
               <xs:any maxOccurs="unbounded"/>
             </xs:choice>
           </xs:group>"#,
        options,
        MemoryResolver::new(),
    );
    assert_eq!(schema.diagnostics_with_key(keys::MAX_OCCUR_LIMIT).count(), 1);

    let grammar = schema.grammar(Some("urn:t")).unwrap();
    let sole = &grammar.groups.get(&t("g")).unwrap().model_group.particles[0];
    assert_eq!(sole.occurs.max, Some(500));
    let choice = &grammar.groups.get(&t("h")).unwrap().model_group.particles;
    assert_eq!(choice[0].occurs.max, Some(100));
    assert_eq!(choice[1].occurs.max, None);
}

// =============================================================================
// Group references
// =============================================================================

#[test]
fn test_missing_group_reference() {
    let mut ctx = context_for(
        r#"<xs:group name="g">
             <xs:sequence><xs:group ref="t:missing"/></xs:sequence>
           </xs:group>"#,
    );
    let root = ctx.document(0).root.clone();
    let reference = root.child_elements()[0].child_elements()[0].child_elements()[0].clone();

    assert!(groups::traverse_local(&mut ctx, 0, &reference).is_none());
    assert_eq!(ctx.reporter().count_key(keys::SRC_RESOLVE), 1);
}

#[test]
fn test_forward_group_reference_traversed_on_demand() {
    let schema = load(
        r#"<xs:group name="first">
             <xs:sequence><xs:group ref="t:second"/></xs:sequence>
           </xs:group>
           <xs:group name="second">
             <xs:choice><xs:element name="a"/><xs:element name="b"/></xs:choice>
           </xs:group>"#,
    );
    assert!(schema.is_valid(), "{:?}", schema.diagnostics());
    assert_eq!(group_particles(&schema, "first"), vec!["(choice)"]);
}

#[test]
fn test_circular_group_reference() {
    let schema = load(
        r#"<xs:group name="a"><xs:sequence><xs:group ref="t:b"/></xs:sequence></xs:group>
           <xs:group name="b"><xs:sequence><xs:group ref="t:a"/></xs:sequence></xs:group>"#,
    );
    assert_eq!(schema.diagnostics_with_key(keys::MG_PROPS_CORRECT_2).count(), 1);
}

#[test]
fn test_reference_to_unimported_namespace() {
    let schema = load(
        r#"<xs:group name="g">
             <xs:sequence><xs:element ref="x:e" xmlns:x="urn:x"/></xs:sequence>
           </xs:group>"#,
    );
    assert_eq!(schema.diagnostics_with_key(keys::SRC_RESOLVE_4_2).count(), 1);
}

// =============================================================================
// Identity constraints
// =============================================================================

const KEYED_ELEMENT: &str = r#"
    <xs:element name="root">
      <xs:key name="k">
        <xs:selector xpath="item"/>
        <xs:field xpath="@a"/>
        <xs:field xpath="@b"/>
      </xs:key>
      KEYREF
    </xs:element>"#;

#[test]
fn test_keyref_field_count_mismatch() {
    let body = KEYED_ELEMENT.replace(
        "KEYREF",
        r#"<xs:keyref name="r" refer="t:k">
             <xs:selector xpath="item"/>
             <xs:field xpath="@c"/><xs:field xpath="@d"/><xs:field xpath="@e"/>
           </xs:keyref>"#,
    );
    let schema = load(&body);
    assert_eq!(schema.diagnostics_with_key(keys::C_PROPS_CORRECT_2).count(), 1);
    let grammar = schema.grammar(Some("urn:t")).unwrap();
    assert!(grammar.identity_constraints.contains(&t("k")));
    assert!(!grammar.identity_constraints.contains(&t("r")));
}

#[test]
fn test_keyref_registered_with_matching_fields() {
    let body = KEYED_ELEMENT.replace(
        "KEYREF",
        r#"<xs:keyref name="r" refer="t:k">
             <xs:selector xpath="item"/>
             <xs:field xpath="@c"/><xs:field xpath="@d"/>
           </xs:keyref>"#,
    );
    let schema = load(&body);
    assert!(schema.is_valid(), "{:?}", schema.diagnostics());
    let grammar = schema.grammar(Some("urn:t")).unwrap();
    let keyref = grammar.identity_constraints.get(&t("r")).unwrap();
    assert_eq!(keyref.refer.as_ref().unwrap().name, t("k"));
    assert_eq!(grammar.identity_constraints_of(&t("root")).count(), 2);
}

#[test]
fn test_keyref_to_key_declared_later() {
    let schema = load(
        r#"<xs:element name="a">
             <xs:keyref name="r" refer="t:k"><xs:selector xpath="x"/><xs:field xpath="@v"/></xs:keyref>
           </xs:element>
           <xs:element name="b">
             <xs:key name="k"><xs:selector xpath="y"/><xs:field xpath="@v"/></xs:key>
           </xs:element>"#,
    );
    assert!(schema.is_valid(), "{:?}", schema.diagnostics());
    let grammar = schema.grammar(Some("urn:t")).unwrap();
    assert!(grammar.identity_constraints.contains(&t("r")));
}

#[test]
fn test_keyref_must_refer_to_key_or_unique() {
    let schema = load(
        r#"<xs:element name="a">
             <xs:key name="k"><xs:selector xpath="x"/><xs:field xpath="@v"/></xs:key>
             <xs:keyref name="r1" refer="t:k"><xs:selector xpath="x"/><xs:field xpath="@v"/></xs:keyref>
             <xs:keyref name="r2" refer="t:r1"><xs:selector xpath="x"/><xs:field xpath="@v"/></xs:keyref>
           </xs:element>"#,
    );
    assert_eq!(schema.diagnostics_with_key(keys::SRC_RESOLVE).count(), 1);
}

#[test]
fn test_invalid_selector_xpath() {
    let schema = load(
        r#"<xs:element name="a">
             <xs:unique name="u"><xs:selector xpath="@attr"/><xs:field xpath="@v"/></xs:unique>
           </xs:element>"#,
    );
    assert_eq!(schema.diagnostics_with_key(keys::C_SELECTOR_XPATH).count(), 1);
}

// =============================================================================
// Duplicate declarations
// =============================================================================

const DUPLICATE_GROUPS: &str = r#"
    <xs:group name="g"><xs:sequence><xs:element name="first"/></xs:sequence></xs:group>
    <xs:group name="g"><xs:sequence><xs:element name="second"/></xs:sequence></xs:group>"#;

#[test]
fn test_duplicate_group_rejected() {
    let schema = load(DUPLICATE_GROUPS);
    assert_eq!(schema.diagnostics_with_key(keys::SCH_PROPS_CORRECT_2).count(), 1);
    assert_eq!(group_particles(&schema, "g"), vec!["first"]);
}

#[test]
fn test_duplicate_group_tolerated() {
    let options = TraversalOptions::default().with_tolerate_duplicates(true);
    let schema = load_with(DUPLICATE_GROUPS, options, MemoryResolver::new());
    // still an error within one document, but the later declaration wins
    assert_eq!(schema.diagnostics_with_key(keys::SCH_PROPS_CORRECT_2).count(), 1);
    assert_eq!(group_particles(&schema, "g"), vec!["second"]);
}

#[test]
fn test_duplicate_group_across_documents_tolerated() {
    let included = format!(
        r#"<xs:schema xmlns:xs="{XSD}" targetNamespace="urn:t">
             <xs:group name="g"><xs:sequence><xs:element name="second"/></xs:sequence></xs:group>
           </xs:schema>"#
    );
    let body = r#"<xs:group name="g"><xs:sequence><xs:element name="first"/></xs:sequence></xs:group>
                  <xs:include schemaLocation="inc.xsd"/>"#;

    let resolver = MemoryResolver::new().with_document("mem/inc.xsd", included.clone());
    let strict = load_with(body, TraversalOptions::default(), resolver);
    assert_eq!(strict.diagnostics_with_key(keys::SCH_PROPS_CORRECT_2).count(), 1);

    let resolver = MemoryResolver::new().with_document("mem/inc.xsd", included);
    let options = TraversalOptions::default().with_tolerate_duplicates(true);
    let tolerant = load_with(body, options, resolver);
    assert!(tolerant.is_valid(), "{:?}", tolerant.diagnostics());
    assert_eq!(group_particles(&tolerant, "g"), vec!["second"]);
}

#[test]
fn test_duplicate_ids_within_a_document() {
    let included = format!(
        r#"<xs:schema xmlns:xs="{XSD}" targetNamespace="urn:t" id="shared">
             <xs:group name="h" id="g1"><xs:sequence/></xs:group>
           </xs:schema>"#
    );
    let body = r#"<xs:include schemaLocation="inc.xsd" id="shared"/>
                  <xs:group name="g" id="g1"><xs:sequence/></xs:group>
                  <xs:group name="k" id="g1"><xs:sequence/></xs:group>"#;
    let resolver = MemoryResolver::new().with_document("mem/inc.xsd", included);
    let schema = load_with(body, TraversalOptions::default(), resolver);

    // the included document may reuse ids from the including one
    let duplicates: Vec<_> = schema.diagnostics_with_key(keys::ATT_INVALID_VALUE).collect();
    assert_eq!(duplicates.len(), 1, "{:?}", schema.diagnostics());
    assert_eq!(duplicates[0].args[1], "id");
    assert!(duplicates[0].system_id.as_deref().is_some_and(|s| s.ends_with("main.xsd")));
}

// =============================================================================
// Context bookkeeping
// =============================================================================

#[test]
fn test_namespace_scope_balanced_and_arrays_returned() {
    let mut ctx = context_for(
        r#"<xs:complexType name="ct"/>
           <xs:group name="g">
             <xs:sequence xmlns:u="urn:u">
               <xs:element name="a" xmlns:q="urn:t" type="q:ct"/>
               <xs:element name="b" type="u:missing"/>
               <xs:bogus/>
             </xs:sequence>
           </xs:group>"#,
    );
    let depth = ctx.document(0).scope_depth();
    ctx.traverse_globals();

    assert_eq!(ctx.document(0).scope_depth(), depth);
    assert_eq!(ctx.checker().outstanding(), 0);
    assert!(ctx.accumulator().is_empty());
    // the inner prefix resolved; only the unimported namespace and the bogus child fail
    assert_eq!(ctx.reporter().count_key(keys::SRC_RESOLVE), 1);
    assert_eq!(ctx.reporter().count_key(keys::ELT_MUST_MATCH_1), 1);
}

#[test]
fn test_root_must_be_schema() {
    let result = SchemaLoader::default().load_str("<notASchema/>", "mem/bad.xsd");
    assert!(matches!(result, Err(Error::NotSchema { .. })));
}

// =============================================================================
// include / import / redefine
// =============================================================================

#[test]
fn test_chameleon_include() {
    let included = format!(
        r#"<xs:schema xmlns:xs="{XSD}">
             <xs:group name="h"><xs:sequence><xs:element ref="e"/></xs:sequence></xs:group>
             <xs:element name="e"/>
           </xs:schema>"#
    );
    let resolver = MemoryResolver::new().with_document("mem/inc.xsd", included);
    let schema = load_with(
        r#"<xs:include schemaLocation="inc.xsd"/>
           <xs:group name="g"><xs:sequence><xs:group ref="t:h"/></xs:sequence></xs:group>"#,
        TraversalOptions::default(),
        resolver,
    );
    assert!(schema.is_valid(), "{:?}", schema.diagnostics());
    assert_eq!(schema.documents(), &["mem/main.xsd".to_string(), "mem/inc.xsd".to_string()]);
    let grammar = schema.grammar(Some("urn:t")).unwrap();
    assert!(grammar.elements.contains(&t("e")));
    assert_eq!(group_particles(&schema, "h"), vec!["e"]);
}

#[test]
fn test_include_with_other_namespace() {
    let included = format!(r#"<xs:schema xmlns:xs="{XSD}" targetNamespace="urn:other"/>"#);
    let resolver = MemoryResolver::new().with_document("mem/inc.xsd", included);
    let schema = load_with(
        r#"<xs:include schemaLocation="inc.xsd"/>"#,
        TraversalOptions::default(),
        resolver,
    );
    assert_eq!(schema.diagnostics_with_key(keys::SRC_INCLUDE_2_1).count(), 1);
    assert_eq!(schema.documents().len(), 1);
}

#[test]
fn test_missing_include_is_a_warning() {
    let schema = load(r#"<xs:include schemaLocation="absent.xsd"/>"#);
    assert!(schema.is_valid());
    assert_eq!(schema.diagnostics_with_key(keys::SCHEMA_REFERENCE_4).count(), 1);
}

#[test]
fn test_import_other_namespace() {
    let imported = format!(
        r#"<xs:schema xmlns:xs="{XSD}" targetNamespace="urn:o"><xs:element name="o"/></xs:schema>"#
    );
    let resolver = MemoryResolver::new().with_document("mem/other.xsd", imported);
    let schema = load_with(
        r#"<xs:import namespace="urn:o" schemaLocation="other.xsd"/>
           <xs:group name="g" xmlns:o="urn:o">
             <xs:sequence><xs:element ref="o:o"/></xs:sequence>
           </xs:group>"#,
        TraversalOptions::default(),
        resolver,
    );
    assert!(schema.is_valid(), "{:?}", schema.diagnostics());
    assert_eq!(schema.grammars().len(), 2);
    assert!(schema.grammar(Some("urn:o")).unwrap().elements.contains(&QName::namespaced("urn:o", "o")));
}

#[test]
fn test_import_own_namespace() {
    let schema = load(r#"<xs:import namespace="urn:t"/>"#);
    assert_eq!(schema.diagnostics_with_key(keys::SRC_IMPORT_1_1).count(), 1);
}

fn base_schema() -> String {
    format!(
        r#"<xs:schema xmlns:xs="{XSD}" targetNamespace="urn:t">
             <xs:group name="g"><xs:sequence><xs:element name="a"/></xs:sequence></xs:group>
           </xs:schema>"#
    )
}

#[test]
fn test_redefine_group_extending_itself() {
    let resolver = MemoryResolver::new().with_document("mem/base.xsd", base_schema());
    let schema = load_with(
        r#"<xs:redefine schemaLocation="base.xsd">
             <xs:group name="g">
               <xs:sequence><xs:group ref="t:g"/><xs:element name="b"/></xs:sequence>
             </xs:group>
           </xs:redefine>"#,
        TraversalOptions::default(),
        resolver,
    );
    assert!(schema.is_valid(), "{:?}", schema.diagnostics());
    assert_eq!(group_particles(&schema, "g"), vec!["(sequence)", "b"]);
    assert_eq!(group_particles(&schema, "g_redefined"), vec!["a"]);

    let records = schema.redefinitions();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].name, t("g"));
    assert_eq!(records[0].original, t("g_redefined"));
    assert!(!records[0].restriction);
}

#[test]
fn test_redefine_group_by_restriction() {
    let resolver = MemoryResolver::new().with_document("mem/base.xsd", base_schema());
    let schema = load_with(
        r#"<xs:redefine schemaLocation="base.xsd">
             <xs:group name="g"><xs:sequence><xs:element name="a"/></xs:sequence></xs:group>
           </xs:redefine>"#,
        TraversalOptions::default(),
        resolver,
    );
    let grammar = schema.grammar(Some("urn:t")).unwrap();
    let group = grammar.groups.get(&t("g")).unwrap();
    assert_eq!(group.restricts, Some(t("g_redefined")));
    assert!(schema.redefinitions()[0].restriction);
}

#[test]
fn test_redefine_group_failed_restriction() {
    let base = format!(
        r#"<xs:schema xmlns:xs="{XSD}" targetNamespace="urn:t">
             <xs:group name="g">
               <xs:sequence><xs:element name="a"/><xs:element name="b"/></xs:sequence>
             </xs:group>
           </xs:schema>"#
    );
    let resolver = MemoryResolver::new().with_document("mem/base.xsd", base);
    let schema = load_with(
        r#"<xs:redefine schemaLocation="base.xsd">
             <xs:group name="g">
               <xs:sequence>
                 <xs:sequence><xs:element name="a"/><xs:element name="x"/></xs:sequence>
                 <xs:element name="b"/>
               </xs:sequence>
             </xs:group>
           </xs:redefine>"#,
        TraversalOptions::default(),
        resolver,
    );
    assert_eq!(schema.diagnostics_with_key(keys::SRC_REDEFINE_6_2_2).count(), 1);
    assert!(schema.redefinitions()[0].restriction);
}

#[test]
fn test_redefine_with_two_self_references() {
    let resolver = MemoryResolver::new().with_document("mem/base.xsd", base_schema());
    let schema = load_with(
        r#"<xs:redefine schemaLocation="base.xsd">
             <xs:group name="g">
               <xs:sequence><xs:group ref="t:g"/><xs:group ref="t:g"/></xs:sequence>
             </xs:group>
           </xs:redefine>"#,
        TraversalOptions::default(),
        resolver,
    );
    assert_eq!(schema.diagnostics_with_key(keys::SRC_REDEFINE_6_1_1).count(), 1);
}

// =============================================================================
// Attribute groups and wildcards
// =============================================================================

fn attribute_names(schema: &BuiltSchema, local: &str) -> Vec<String> {
    let grammar = schema.grammar(Some("urn:t")).unwrap();
    let group = grammar.attribute_groups.get(&t(local)).unwrap();
    group.uses.keys().map(|name| name.local_name.clone()).collect()
}

#[test]
fn test_prohibited_attribute_uses_are_stripped() {
    let schema = load(
        r#"<xs:attributeGroup name="inner">
             <xs:attribute name="a"/>
             <xs:attribute name="b"/>
           </xs:attributeGroup>
           <xs:attributeGroup name="outer">
             <xs:attribute name="a" use="prohibited"/>
             <xs:attributeGroup ref="t:inner"/>
           </xs:attributeGroup>"#,
    );
    assert!(schema.is_valid(), "{:?}", schema.diagnostics());
    assert_eq!(attribute_names(&schema, "inner"), vec!["a", "b"]);
    assert_eq!(attribute_names(&schema, "outer"), vec!["b"]);
}

#[test]
fn test_attribute_group_reference_allows_only_annotation() {
    let schema = load(
        r#"<xs:attributeGroup name="ag"><xs:attribute name="a"/></xs:attributeGroup>
           <xs:attributeGroup name="outer">
             <xs:attributeGroup ref="t:ag">
               <xs:annotation/>
               <xs:attribute name="x"/>
             </xs:attributeGroup>
           </xs:attributeGroup>"#,
    );
    assert_eq!(schema.diagnostics_with_key(keys::ELT_MUST_MATCH_1).count(), 1);
    assert_eq!(attribute_names(&schema, "outer"), vec!["a"]);
}

fn attribute_base_schema() -> String {
    format!(
        r#"<xs:schema xmlns:xs="{XSD}" targetNamespace="urn:t">
             <xs:attributeGroup name="ag">
               <xs:attribute name="id" use="required"/>
               <xs:attribute name="lang"/>
             </xs:attributeGroup>
           </xs:schema>"#
    )
}

#[test]
fn test_redefine_attribute_group_by_restriction() {
    let resolver = MemoryResolver::new().with_document("mem/base.xsd", attribute_base_schema());
    let schema = load_with(
        r#"<xs:redefine schemaLocation="base.xsd">
             <xs:attributeGroup name="ag"><xs:attribute name="id" use="required"/></xs:attributeGroup>
           </xs:redefine>"#,
        TraversalOptions::default(),
        resolver,
    );
    assert!(schema.is_valid(), "{:?}", schema.diagnostics());
    assert_eq!(attribute_names(&schema, "ag"), vec!["id"]);
}

#[test]
fn test_redefine_attribute_group_failed_restriction() {
    let resolver = MemoryResolver::new().with_document("mem/base.xsd", attribute_base_schema());
    let schema = load_with(
        r#"<xs:redefine schemaLocation="base.xsd">
             <xs:attributeGroup name="ag">
               <xs:attribute name="id" use="required"/>
               <xs:attribute name="extra"/>
             </xs:attributeGroup>
           </xs:redefine>"#,
        TraversalOptions::default(),
        resolver,
    );
    assert_eq!(schema.diagnostics_with_key(keys::SRC_REDEFINE_7_2_2).count(), 1);
}

#[test]
fn test_wildcards_allow_only_annotation() {
    let schema = load(
        r#"<xs:group name="g">
             <xs:sequence>
               <xs:any><xs:annotation/><xs:element name="x"/></xs:any>
             </xs:sequence>
           </xs:group>
           <xs:attributeGroup name="ag">
             <xs:anyAttribute><xs:attribute name="y"/></xs:anyAttribute>
           </xs:attributeGroup>"#,
    );
    assert_eq!(schema.diagnostics_with_key(keys::ELT_MUST_MATCH_1).count(), 2);
    // the wildcards themselves are kept
    assert_eq!(group_particles(&schema, "g"), vec!["*"]);
    let grammar = schema.grammar(Some("urn:t")).unwrap();
    assert!(grammar.attribute_groups.get(&t("ag")).unwrap().wildcard.is_some());
}
