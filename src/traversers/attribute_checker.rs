//! Attribute checking for schema elements
//!
//! [`AttributeChecker::check_attributes`] validates the attributes of one
//! schema element against the rules for its tag and decodes them into an
//! [`AttrArray`] indexed by [`AttrIndex`]. Arrays come from a free list and
//! every acquired array must be handed back with
//! [`AttributeChecker::return_attr_array`]. Traversers copy what they need
//! into locals and return the array before descending into children.

use std::collections::HashMap;

use crate::components::{AttributeUseMode, NamespaceConstraint, Occurs, ProcessContents};
use crate::diagnostics::{keys, Diagnostic, ErrorReporter};
use crate::documents::{ElementAttribute, SchemaElement, TextPosition};
use crate::names::{collapse_whitespace, is_valid_ncname, is_valid_qname};
use crate::namespaces::QName;
use crate::XSD_NAMESPACE;

use super::document_info::{DocId, XsDocumentInfo};

/// Schema attributes understood by the checker
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AttrIndex {
    Abstract,
    AttributeFormDefault,
    Base,
    Block,
    BlockDefault,
    Default,
    ElementFormDefault,
    Final,
    FinalDefault,
    Fixed,
    Form,
    Id,
    MaxOccurs,
    MinOccurs,
    Mixed,
    Name,
    Namespace,
    Nillable,
    ProcessContents,
    Public,
    Ref,
    Refer,
    SchemaLocation,
    Source,
    SubstitutionGroup,
    System,
    TargetNamespace,
    Type,
    Use,
    Version,
    XPath,
}

const ATTR_COUNT: usize = AttrIndex::XPath as usize + 1;

impl AttrIndex {
    pub fn attr_name(&self) -> &'static str {
        match self {
            Self::Abstract => "abstract",
            Self::AttributeFormDefault => "attributeFormDefault",
            Self::Base => "base",
            Self::Block => "block",
            Self::BlockDefault => "blockDefault",
            Self::Default => "default",
            Self::ElementFormDefault => "elementFormDefault",
            Self::Final => "final",
            Self::FinalDefault => "finalDefault",
            Self::Fixed => "fixed",
            Self::Form => "form",
            Self::Id => "id",
            Self::MaxOccurs => "maxOccurs",
            Self::MinOccurs => "minOccurs",
            Self::Mixed => "mixed",
            Self::Name => "name",
            Self::Namespace => "namespace",
            Self::Nillable => "nillable",
            Self::ProcessContents => "processContents",
            Self::Public => "public",
            Self::Ref => "ref",
            Self::Refer => "refer",
            Self::SchemaLocation => "schemaLocation",
            Self::Source => "source",
            Self::SubstitutionGroup => "substitutionGroup",
            Self::System => "system",
            Self::TargetNamespace => "targetNamespace",
            Self::Type => "type",
            Self::Use => "use",
            Self::Version => "version",
            Self::XPath => "xpath",
        }
    }
}

/// Set of derivation methods from `block`/`final` style attributes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DerivationSet(u8);

impl DerivationSet {
    pub const EXTENSION: u8 = 1;
    pub const RESTRICTION: u8 = 2;
    pub const SUBSTITUTION: u8 = 4;
    pub const LIST: u8 = 8;
    pub const UNION: u8 = 16;

    pub fn empty() -> Self {
        Self(0)
    }

    pub fn contains(&self, flag: u8) -> bool {
        self.0 & flag != 0
    }

    pub fn bits(&self) -> u8 {
        self.0
    }

    fn parse(value: &str, allowed: u8) -> Option<Self> {
        let value = value.trim();
        if value == "#all" {
            return Some(Self(allowed));
        }
        let mut bits = 0;
        for token in value.split_ascii_whitespace() {
            let flag = match token {
                "extension" => Self::EXTENSION,
                "restriction" => Self::RESTRICTION,
                "substitution" => Self::SUBSTITUTION,
                "list" => Self::LIST,
                "union" => Self::UNION,
                _ => return None,
            };
            if allowed & flag == 0 {
                return None;
            }
            bits |= flag;
        }
        Some(Self(bits))
    }
}

/// Value of `form`, `elementFormDefault` and `attributeFormDefault`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Form {
    Qualified,
    Unqualified,
}

/// A decoded attribute value
#[derive(Debug, Clone, PartialEq)]
pub enum AttrValue {
    Str(String),
    QName(QName),
    Bool(bool),
    Count(u32),
    /// `None` is `unbounded`
    MaxOccurs(Option<u32>),
    Form(Form),
    Use(AttributeUseMode),
    ProcessContents(ProcessContents),
    Namespace(NamespaceConstraint),
    Derivation(DerivationSet),
}

/// Decoded attributes of one element
#[derive(Debug, Clone)]
pub struct AttrArray {
    values: Vec<Option<AttrValue>>,
    from_default: Vec<bool>,
    /// Attributes outside the schema namespace
    pub non_schema: Vec<ElementAttribute>,
}

impl AttrArray {
    fn new() -> Self {
        Self {
            values: vec![None; ATTR_COUNT],
            from_default: vec![false; ATTR_COUNT],
            non_schema: Vec::new(),
        }
    }

    fn clear(&mut self) {
        self.values.iter_mut().for_each(|v| *v = None);
        self.from_default.iter_mut().for_each(|d| *d = false);
        self.non_schema.clear();
    }

    fn set(&mut self, index: AttrIndex, value: AttrValue, from_default: bool) {
        self.values[index as usize] = Some(value);
        self.from_default[index as usize] = from_default;
    }

    pub fn get(&self, index: AttrIndex) -> Option<&AttrValue> {
        self.values[index as usize].as_ref()
    }

    /// Value was filled in from the attribute's default
    pub fn is_default(&self, index: AttrIndex) -> bool {
        self.from_default[index as usize]
    }

    pub fn str(&self, index: AttrIndex) -> Option<&str> {
        match self.get(index) {
            Some(AttrValue::Str(s)) => Some(s),
            _ => None,
        }
    }

    pub fn string(&self, index: AttrIndex) -> Option<String> {
        self.str(index).map(str::to_string)
    }

    pub fn qname(&self, index: AttrIndex) -> Option<QName> {
        match self.get(index) {
            Some(AttrValue::QName(q)) => Some(q.clone()),
            _ => None,
        }
    }

    pub fn bool(&self, index: AttrIndex) -> bool {
        matches!(self.get(index), Some(AttrValue::Bool(true)))
    }

    pub fn form(&self, index: AttrIndex) -> Option<Form> {
        match self.get(index) {
            Some(AttrValue::Form(f)) => Some(*f),
            _ => None,
        }
    }

    pub fn derivation(&self, index: AttrIndex) -> DerivationSet {
        match self.get(index) {
            Some(AttrValue::Derivation(d)) => *d,
            _ => DerivationSet::empty(),
        }
    }

    pub fn use_mode(&self) -> AttributeUseMode {
        match self.get(AttrIndex::Use) {
            Some(AttrValue::Use(u)) => *u,
            _ => AttributeUseMode::Optional,
        }
    }

    pub fn process_contents(&self) -> ProcessContents {
        match self.get(AttrIndex::ProcessContents) {
            Some(AttrValue::ProcessContents(p)) => *p,
            _ => ProcessContents::Strict,
        }
    }

    pub fn namespace_constraint(&self) -> NamespaceConstraint {
        match self.get(AttrIndex::Namespace) {
            Some(AttrValue::Namespace(n)) => n.clone(),
            _ => NamespaceConstraint::Any,
        }
    }

    /// minOccurs/maxOccurs, defaulting to `(1, 1)`
    pub fn occurs(&self) -> Occurs {
        let min = match self.get(AttrIndex::MinOccurs) {
            Some(AttrValue::Count(n)) => *n,
            _ => 1,
        };
        let max = match self.get(AttrIndex::MaxOccurs) {
            Some(AttrValue::MaxOccurs(m)) => *m,
            _ => Some(1),
        };
        Occurs::new(min, max)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Kind {
    Str,
    Token,
    Id,
    NcName,
    QName,
    Bool,
    Count,
    MaxOccurs,
    Form,
    Use,
    ProcessContents,
    NamespaceList,
    Uri,
    Derivation(u8),
    XPath,
}

#[derive(Debug, Clone, Copy)]
struct Rule {
    index: AttrIndex,
    kind: Kind,
    required: bool,
    default: Option<&'static str>,
}

const fn opt(index: AttrIndex, kind: Kind) -> Rule {
    Rule { index, kind, required: false, default: None }
}

const fn req(index: AttrIndex, kind: Kind) -> Rule {
    Rule { index, kind, required: true, default: None }
}

const fn def(index: AttrIndex, kind: Kind, default: &'static str) -> Rule {
    Rule { index, kind, required: false, default: Some(default) }
}

use AttrIndex as A;

const ID: Rule = opt(A::Id, Kind::Id);
const MIN: Rule = def(A::MinOccurs, Kind::Count, "1");
const MAX: Rule = def(A::MaxOccurs, Kind::MaxOccurs, "1");
const EXT_RES: u8 = DerivationSet::EXTENSION | DerivationSet::RESTRICTION;
const EXT_RES_SUB: u8 = EXT_RES | DerivationSet::SUBSTITUTION;
const ALL_DERIVATIONS: u8 = EXT_RES_SUB | DerivationSet::LIST | DerivationSet::UNION;

static GROUP_GLOBAL: &[Rule] = &[ID, req(A::Name, Kind::NcName)];
static GROUP_LOCAL: &[Rule] = &[ID, MAX, MIN, req(A::Ref, Kind::QName)];
static ATTRIBUTE_GROUP_GLOBAL: &[Rule] = &[ID, req(A::Name, Kind::NcName)];
static ATTRIBUTE_GROUP_LOCAL: &[Rule] = &[ID, req(A::Ref, Kind::QName)];
static COMPOSITOR: &[Rule] = &[ID, MAX, MIN];
static ANY: &[Rule] = &[
    ID,
    MAX,
    MIN,
    def(A::Namespace, Kind::NamespaceList, "##any"),
    def(A::ProcessContents, Kind::ProcessContents, "strict"),
];
static ANY_ATTRIBUTE: &[Rule] = &[
    ID,
    def(A::Namespace, Kind::NamespaceList, "##any"),
    def(A::ProcessContents, Kind::ProcessContents, "strict"),
];
static UNIQUE_OR_KEY: &[Rule] = &[ID, req(A::Name, Kind::NcName)];
static KEYREF: &[Rule] = &[ID, req(A::Name, Kind::NcName), req(A::Refer, Kind::QName)];
static SELECTOR_OR_FIELD: &[Rule] = &[ID, req(A::XPath, Kind::XPath)];
static ELEMENT_GLOBAL: &[Rule] = &[
    def(A::Abstract, Kind::Bool, "false"),
    opt(A::Block, Kind::Derivation(EXT_RES_SUB)),
    opt(A::Default, Kind::Str),
    opt(A::Final, Kind::Derivation(EXT_RES)),
    opt(A::Fixed, Kind::Str),
    ID,
    req(A::Name, Kind::NcName),
    def(A::Nillable, Kind::Bool, "false"),
    opt(A::SubstitutionGroup, Kind::QName),
    opt(A::Type, Kind::QName),
];
static ELEMENT_LOCAL: &[Rule] = &[
    opt(A::Block, Kind::Derivation(EXT_RES_SUB)),
    opt(A::Default, Kind::Str),
    opt(A::Fixed, Kind::Str),
    opt(A::Form, Kind::Form),
    ID,
    MAX,
    MIN,
    opt(A::Name, Kind::NcName),
    def(A::Nillable, Kind::Bool, "false"),
    opt(A::Ref, Kind::QName),
    opt(A::Type, Kind::QName),
];
static ATTRIBUTE_GLOBAL: &[Rule] = &[
    opt(A::Default, Kind::Str),
    opt(A::Fixed, Kind::Str),
    ID,
    req(A::Name, Kind::NcName),
    opt(A::Type, Kind::QName),
];
static ATTRIBUTE_LOCAL: &[Rule] = &[
    opt(A::Default, Kind::Str),
    opt(A::Fixed, Kind::Str),
    opt(A::Form, Kind::Form),
    ID,
    opt(A::Name, Kind::NcName),
    opt(A::Ref, Kind::QName),
    opt(A::Type, Kind::QName),
    def(A::Use, Kind::Use, "optional"),
];
static COMPLEX_TYPE_GLOBAL: &[Rule] = &[
    def(A::Abstract, Kind::Bool, "false"),
    opt(A::Block, Kind::Derivation(EXT_RES)),
    opt(A::Final, Kind::Derivation(EXT_RES)),
    ID,
    def(A::Mixed, Kind::Bool, "false"),
    req(A::Name, Kind::NcName),
];
static COMPLEX_TYPE_LOCAL: &[Rule] = &[ID, def(A::Mixed, Kind::Bool, "false")];
static SIMPLE_TYPE_GLOBAL: &[Rule] = &[
    opt(A::Final, Kind::Derivation(DerivationSet::RESTRICTION | DerivationSet::LIST | DerivationSet::UNION)),
    ID,
    req(A::Name, Kind::NcName),
];
static ID_ONLY: &[Rule] = &[ID];
static NOTATION: &[Rule] = &[
    ID,
    req(A::Name, Kind::NcName),
    opt(A::Public, Kind::Token),
    opt(A::System, Kind::Uri),
];
static COMPLEX_CONTENT: &[Rule] = &[ID, opt(A::Mixed, Kind::Bool)];
static DERIVATION: &[Rule] = &[req(A::Base, Kind::QName), ID];
static SCHEMA: &[Rule] = &[
    def(A::AttributeFormDefault, Kind::Form, "unqualified"),
    opt(A::BlockDefault, Kind::Derivation(EXT_RES_SUB)),
    def(A::ElementFormDefault, Kind::Form, "unqualified"),
    opt(A::FinalDefault, Kind::Derivation(ALL_DERIVATIONS)),
    ID,
    opt(A::TargetNamespace, Kind::Uri),
    opt(A::Version, Kind::Token),
];
static INCLUDE: &[Rule] = &[ID, req(A::SchemaLocation, Kind::Uri)];
static IMPORT: &[Rule] = &[ID, opt(A::Namespace, Kind::Uri), opt(A::SchemaLocation, Kind::Uri)];
static APPINFO_OR_DOCUMENTATION: &[Rule] = &[opt(A::Source, Kind::Uri)];

fn rules_for(local: &str, is_global: bool) -> Option<&'static [Rule]> {
    let rules = match (local, is_global) {
        ("group", true) => GROUP_GLOBAL,
        ("group", false) => GROUP_LOCAL,
        ("attributeGroup", true) => ATTRIBUTE_GROUP_GLOBAL,
        ("attributeGroup", false) => ATTRIBUTE_GROUP_LOCAL,
        ("all" | "choice" | "sequence", _) => COMPOSITOR,
        ("any", _) => ANY,
        ("anyAttribute", _) => ANY_ATTRIBUTE,
        ("unique" | "key", _) => UNIQUE_OR_KEY,
        ("keyref", _) => KEYREF,
        ("selector" | "field", _) => SELECTOR_OR_FIELD,
        ("element", true) => ELEMENT_GLOBAL,
        ("element", false) => ELEMENT_LOCAL,
        ("attribute", true) => ATTRIBUTE_GLOBAL,
        ("attribute", false) => ATTRIBUTE_LOCAL,
        ("complexType", true) => COMPLEX_TYPE_GLOBAL,
        ("complexType", false) => COMPLEX_TYPE_LOCAL,
        ("simpleType", true) => SIMPLE_TYPE_GLOBAL,
        ("simpleType" | "simpleContent" | "annotation", _) => ID_ONLY,
        ("notation", _) => NOTATION,
        ("complexContent", _) => COMPLEX_CONTENT,
        ("extension" | "restriction", _) => DERIVATION,
        ("schema", _) => SCHEMA,
        ("include" | "redefine", _) => INCLUDE,
        ("import", _) => IMPORT,
        ("appinfo" | "documentation", _) => APPINFO_OR_DOCUMENTATION,
        _ => return None,
    };
    Some(rules)
}

/// Label used in messages, e.g. `group (local)`
pub fn element_label(local: &str, is_global: bool) -> String {
    match local {
        "group" | "attributeGroup" | "element" | "attribute" | "complexType" | "simpleType" => {
            format!("{} ({})", local, if is_global { "global" } else { "local" })
        }
        _ => local.to_string(),
    }
}

/// Validates and decodes schema element attributes into pooled arrays
#[derive(Debug)]
pub struct AttributeChecker {
    pool: Vec<AttrArray>,
    max_pooled: usize,
    outstanding: usize,
    checked: usize,
    max_occurs_limit: Option<u32>,
    /// `id` values seen per document, with the element that declared each
    ids: HashMap<(DocId, String), TextPosition>,
}

impl AttributeChecker {
    pub fn new(max_pooled: usize) -> Self {
        Self {
            pool: Vec::new(),
            max_pooled,
            outstanding: 0,
            checked: 0,
            max_occurs_limit: None,
            ids: HashMap::new(),
        }
    }

    /// Cap finite maxOccurs values at `limit`
    pub fn with_max_occurs_limit(mut self, limit: Option<u32>) -> Self {
        self.max_occurs_limit = limit;
        self
    }

    /// Arrays handed out and not yet returned
    pub fn outstanding(&self) -> usize {
        self.outstanding
    }

    /// Total number of elements checked
    pub fn checked(&self) -> usize {
        self.checked
    }

    pub fn pooled(&self) -> usize {
        self.pool.len()
    }

    /// Check the attributes of `element`
    ///
    /// Returns `None` when the element is not a schema element this checker
    /// knows. Every `Some` must be given back with
    /// [`return_attr_array`](Self::return_attr_array).
    pub fn check_attributes(
        &mut self,
        element: &SchemaElement,
        is_global: bool,
        doc: &XsDocumentInfo,
        reporter: &mut ErrorReporter,
    ) -> Option<AttrArray> {
        self.check(element, is_global, false, doc, reporter)
    }

    /// Check a local `element` or `any` particle
    ///
    /// A particle that is the only child of a `sequence` is not subject to
    /// the maxOccurs limit.
    pub fn check_particle_attributes(
        &mut self,
        element: &SchemaElement,
        sole_in_sequence: bool,
        doc: &XsDocumentInfo,
        reporter: &mut ErrorReporter,
    ) -> Option<AttrArray> {
        self.check(element, false, sole_in_sequence, doc, reporter)
    }

    fn check(
        &mut self,
        element: &SchemaElement,
        is_global: bool,
        sole_in_sequence: bool,
        doc: &XsDocumentInfo,
        reporter: &mut ErrorReporter,
    ) -> Option<AttrArray> {
        if element.namespace() != Some(XSD_NAMESPACE) {
            return None;
        }
        let rules = rules_for(element.local_name(), is_global)?;
        let label = element_label(element.local_name(), is_global);
        let system_id = Some(doc.system_id.as_str());
        let mut report = |key: &'static str, args: Vec<String>| {
            reporter.report(Diagnostic::error(key, args).at(element, system_id));
        };

        let mut array = self.pool.pop().unwrap_or_else(AttrArray::new);
        self.outstanding += 1;
        self.checked += 1;

        for attribute in &element.attributes {
            match attribute.name.namespace() {
                None => {}
                Some(XSD_NAMESPACE) => {
                    report(keys::ATT_NOT_ALLOWED, vec![label.clone(), attribute.name.local_name.clone()]);
                    continue;
                }
                Some(_) => {
                    array.non_schema.push(attribute.clone());
                    continue;
                }
            }
            let name = attribute.name.local_name.as_str();
            let Some(rule) = rules.iter().find(|r| r.index.attr_name() == name) else {
                report(keys::ATT_NOT_ALLOWED, vec![label.clone(), name.to_string()]);
                continue;
            };
            let decoded = decode(rule.kind, &attribute.value, doc).and_then(|value| {
                if let (Kind::Id, AttrValue::Str(id)) = (rule.kind, &value) {
                    self.declare_id(doc.id, id, element.position)?;
                }
                Ok(value)
            });
            match decoded {
                Ok(value) => array.set(rule.index, value, false),
                Err(reason) => report(
                    keys::ATT_INVALID_VALUE,
                    vec![label.clone(), name.to_string(), attribute.value.clone(), reason],
                ),
            }
        }

        for rule in rules {
            if array.get(rule.index).is_some() {
                continue;
            }
            if rule.required {
                report(keys::ATT_MUST_APPEAR, vec![label.clone(), rule.index.attr_name().to_string()]);
            } else if let Some(default) = rule.default {
                if let Ok(value) = decode(rule.kind, default, doc) {
                    array.set(rule.index, value, true);
                }
            }
        }

        if rules.iter().any(|r| r.index == AttrIndex::MinOccurs) {
            let mut occurs = array.occurs();
            if let (Some(max), Some(limit)) = (occurs.max, self.max_occurs_limit) {
                let exempt = sole_in_sequence && matches!(element.local_name(), "element" | "any");
                if max > limit && !exempt {
                    report(keys::MAX_OCCUR_LIMIT, vec![limit.to_string()]);
                    array.set(AttrIndex::MaxOccurs, AttrValue::MaxOccurs(Some(limit)), false);
                    occurs.max = Some(limit);
                }
            }
            if let Some(max) = occurs.max {
                if occurs.min > max {
                    report(
                        keys::P_PROPS_CORRECT_2_1,
                        vec![label.clone(), occurs.min.to_string(), max.to_string()],
                    );
                    array.set(AttrIndex::MinOccurs, AttrValue::Count(max), false);
                }
            }
        }

        Some(array)
    }

    /// Record `id` for `doc`; an element checked again keeps its own id
    fn declare_id(&mut self, doc: DocId, id: &str, position: TextPosition) -> Result<(), String> {
        match self.ids.get(&(doc, id.to_string())) {
            Some(first) if *first != position => Err(format!(
                "cvc-id.2: id '{}' is already declared at {}:{}",
                id, first.line, first.column
            )),
            Some(_) => Ok(()),
            None => {
                self.ids.insert((doc, id.to_string()), position);
                Ok(())
            }
        }
    }

    /// Hand an array back to the pool
    pub fn return_attr_array(&mut self, mut array: AttrArray) {
        self.outstanding = self.outstanding.saturating_sub(1);
        if self.pool.len() < self.max_pooled {
            array.clear();
            self.pool.push(array);
        }
    }
}

fn decode(kind: Kind, raw: &str, doc: &XsDocumentInfo) -> Result<AttrValue, String> {
    let token = collapse_whitespace(raw);
    match kind {
        Kind::Str => Ok(AttrValue::Str(raw.to_string())),
        Kind::Token | Kind::Uri | Kind::XPath => Ok(AttrValue::Str(token)),
        Kind::Id | Kind::NcName => {
            if is_valid_ncname(&token) {
                Ok(AttrValue::Str(token))
            } else {
                Err("not a valid NCName".to_string())
            }
        }
        Kind::QName => {
            if !is_valid_qname(&token) {
                return Err("not a valid QName".to_string());
            }
            doc.resolve_qname(&token)
                .map(AttrValue::QName)
                .map_err(|prefix| format!("prefix '{}' is not bound", prefix))
        }
        Kind::Bool => match token.as_str() {
            "true" | "1" => Ok(AttrValue::Bool(true)),
            "false" | "0" => Ok(AttrValue::Bool(false)),
            _ => Err("not a boolean".to_string()),
        },
        Kind::Count => token
            .parse::<u32>()
            .map(AttrValue::Count)
            .map_err(|_| "not a non-negative integer".to_string()),
        Kind::MaxOccurs => {
            if token == "unbounded" {
                Ok(AttrValue::MaxOccurs(None))
            } else {
                token
                    .parse::<u32>()
                    .map(|n| AttrValue::MaxOccurs(Some(n)))
                    .map_err(|_| "not a non-negative integer or 'unbounded'".to_string())
            }
        }
        Kind::Form => match token.as_str() {
            "qualified" => Ok(AttrValue::Form(Form::Qualified)),
            "unqualified" => Ok(AttrValue::Form(Form::Unqualified)),
            _ => Err("must be 'qualified' or 'unqualified'".to_string()),
        },
        Kind::Use => AttributeUseMode::parse(&token)
            .map(AttrValue::Use)
            .ok_or_else(|| "must be 'optional', 'required' or 'prohibited'".to_string()),
        Kind::ProcessContents => ProcessContents::parse(&token)
            .map(AttrValue::ProcessContents)
            .ok_or_else(|| "must be 'strict', 'lax' or 'skip'".to_string()),
        Kind::NamespaceList => NamespaceConstraint::from_namespace_attr(&token, doc.target_namespace())
            .map(AttrValue::Namespace)
            .map_err(|bad| format!("'{}' is not a namespace or a special token", bad)),
        Kind::Derivation(allowed) => DerivationSet::parse(&token, allowed)
            .map(AttrValue::Derivation)
            .ok_or_else(|| "not a valid derivation set".to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::documents::SchemaDocument;

    fn checked(xml: &str) -> (Option<AttrArray>, ErrorReporter, AttributeChecker) {
        let doc = SchemaDocument::parse_pull(xml, Some("t.xsd")).unwrap();
        let mut checker = AttributeChecker::new(4);
        let mut reporter = ErrorReporter::new();
        let info = XsDocumentInfo::new(0, &doc, &mut checker, &mut reporter).unwrap();
        let child = doc.root.first_child_element().unwrap().clone();
        let array = checker.check_attributes(&child, false, &info, &mut reporter);
        (array, reporter, checker)
    }

    #[test]
    fn test_defaults_and_values() {
        let (array, reporter, _) = checked(
            r#"<xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema" targetNamespace="urn:t" xmlns:t="urn:t">
                 <xs:group ref="t:g" maxOccurs="unbounded"/>
               </xs:schema>"#,
        );
        let array = array.unwrap();
        assert!(reporter.is_empty());
        assert_eq!(array.qname(AttrIndex::Ref), Some(QName::namespaced("urn:t", "g")));
        assert_eq!(array.occurs(), Occurs::new(1, None));
        assert!(array.is_default(AttrIndex::MinOccurs));
        assert!(!array.is_default(AttrIndex::MaxOccurs));
    }

    #[test]
    fn test_reports_bad_attributes() {
        let (array, reporter, _) = checked(
            r#"<xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema" xmlns:o="urn:other">
                 <xs:any bogus="1" minOccurs="x" processContents="strict" o:note="kept"/>
               </xs:schema>"#,
        );
        let array = array.unwrap();
        assert_eq!(reporter.count_key(keys::ATT_NOT_ALLOWED), 1);
        assert_eq!(reporter.count_key(keys::ATT_INVALID_VALUE), 1);
        assert_eq!(array.non_schema.len(), 1);
        assert_eq!(array.occurs(), Occurs::once());
    }

    #[test]
    fn test_min_greater_than_max() {
        let (array, reporter, _) = checked(
            r#"<xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema">
                 <xs:sequence minOccurs="3" maxOccurs="2"/>
               </xs:schema>"#,
        );
        assert_eq!(reporter.count_key(keys::P_PROPS_CORRECT_2_1), 1);
        assert_eq!(array.unwrap().occurs(), Occurs::new(2, Some(2)));
    }

    #[test]
    fn test_missing_required_and_pool() {
        let (array, reporter, mut checker) = checked(
            r#"<xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema">
                 <xs:keyref name="k"/>
               </xs:schema>"#,
        );
        assert_eq!(reporter.count_key(keys::ATT_MUST_APPEAR), 1);
        // the schema root array is still held by the document info
        assert_eq!(checker.outstanding(), 2);
        checker.return_attr_array(array.unwrap());
        assert_eq!(checker.outstanding(), 1);
        assert_eq!(checker.pooled(), 1);
    }

    #[test]
    fn test_duplicate_ids_in_one_document() {
        let doc = SchemaDocument::parse_pull(
            r#"<xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema" id="s">
                 <xs:element name="a" id="e"/>
                 <xs:element name="b" id="e"/>
                 <xs:element name="c" id="s"/>
               </xs:schema>"#,
            Some("t.xsd"),
        )
        .unwrap();
        let mut checker = AttributeChecker::new(4);
        let mut reporter = ErrorReporter::new();
        let info = XsDocumentInfo::new(0, &doc, &mut checker, &mut reporter).unwrap();
        let children = doc.root.child_elements();
        for child in children {
            let array = checker.check_attributes(child, true, &info, &mut reporter).unwrap();
            checker.return_attr_array(array);
        }
        assert_eq!(reporter.count_key(keys::ATT_INVALID_VALUE), 2);
        assert!(reporter.diagnostics().iter().all(|d| d.args[3].starts_with("cvc-id.2")));

        // checking the same element again is not a redeclaration
        let array = checker.check_attributes(&children[0], true, &info, &mut reporter).unwrap();
        checker.return_attr_array(array);
        assert_eq!(reporter.count_key(keys::ATT_INVALID_VALUE), 2);
    }

    #[test]
    fn test_ids_are_scoped_to_their_document() {
        let xml = r#"<xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema" id="s"/>"#;
        let first = SchemaDocument::parse_pull(xml, Some("a.xsd")).unwrap();
        let second = SchemaDocument::parse_pull(xml, Some("b.xsd")).unwrap();
        let mut checker = AttributeChecker::new(4);
        let mut reporter = ErrorReporter::new();
        XsDocumentInfo::new(0, &first, &mut checker, &mut reporter).unwrap();
        XsDocumentInfo::new(1, &second, &mut checker, &mut reporter).unwrap();
        assert!(reporter.is_empty());
    }

    #[test]
    fn test_max_occurs_limit() {
        let doc = SchemaDocument::parse_pull(
            r#"<xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema">
                 <xs:choice minOccurs="15" maxOccurs="20"/>
                 <xs:sequence>
                   <xs:element name="a" maxOccurs="20"/>
                 </xs:sequence>
               </xs:schema>"#,
            Some("t.xsd"),
        )
        .unwrap();
        let mut checker = AttributeChecker::new(4).with_max_occurs_limit(Some(10));
        let mut reporter = ErrorReporter::new();
        let info = XsDocumentInfo::new(0, &doc, &mut checker, &mut reporter).unwrap();
        let choice = &doc.root.child_elements()[0];
        let sequence = &doc.root.child_elements()[1];
        let element = &sequence.child_elements()[0];

        let array = checker.check_attributes(choice, false, &info, &mut reporter).unwrap();
        assert_eq!(reporter.count_key(keys::MAX_OCCUR_LIMIT), 1);
        assert_eq!(reporter.count_key(keys::P_PROPS_CORRECT_2_1), 1);
        assert_eq!(array.occurs(), Occurs::new(10, Some(10)));
        checker.return_attr_array(array);

        let array = checker
            .check_particle_attributes(element, true, &info, &mut reporter)
            .unwrap();
        assert_eq!(array.occurs(), Occurs::new(1, Some(20)));
        checker.return_attr_array(array);
        assert_eq!(reporter.count_key(keys::MAX_OCCUR_LIMIT), 1);

        let array = checker
            .check_particle_attributes(element, false, &info, &mut reporter)
            .unwrap();
        assert_eq!(array.occurs(), Occurs::new(1, Some(10)));
        assert_eq!(reporter.count_key(keys::MAX_OCCUR_LIMIT), 2);
    }

    #[test]
    fn test_derivation_set() {
        let all = DerivationSet::parse("#all", EXT_RES);
        assert_eq!(all, Some(DerivationSet(EXT_RES)));
        assert!(DerivationSet::parse("extension list", EXT_RES).is_none());
        assert!(DerivationSet::parse("restriction", EXT_RES)
            .unwrap()
            .contains(DerivationSet::RESTRICTION));
    }
}
