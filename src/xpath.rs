//! Restricted XPath for identity constraints
//!
//! `selector` and `field` use a small subset of XPath:
//!
//! ```text
//! Selector ::= Path ( '|' Path )*
//! Path     ::= ('.//')? Step ( '/' Step )*
//! Step     ::= '.' | NameTest | 'child::' NameTest
//! NameTest ::= QName | '*' | NCName ':' '*'
//! ```
//!
//! A field path may additionally end in `@NameTest` or
//! `attribute::NameTest`. Prefixes are resolved when the expression is
//! parsed; unprefixed names are in no namespace.

use serde::Serialize;
use std::fmt;
use thiserror::Error;

use crate::namespaces::QName;

/// Node test of a step
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum NameTest {
    /// `*`
    Any,
    /// `prefix:*`
    Namespace(Option<String>),
    Name(QName),
}

/// One location step
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum Step {
    /// `.`
    SelfNode,
    Child(NameTest),
    Attribute(NameTest),
}

/// One alternative of a union
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LocationPath {
    /// Starts with `.//`
    pub descendant: bool,
    pub steps: Vec<Step>,
}

/// Selector or field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum XPathKind {
    Selector,
    Field,
}

/// A parsed identity-constraint expression
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IdentityXPath {
    pub expression: String,
    pub kind: XPathKind,
    pub paths: Vec<LocationPath>,
}

impl fmt::Display for IdentityXPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.expression)
    }
}

/// XPath syntax error
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum XPathError {
    #[error("empty expression")]
    Empty,
    #[error("unexpected '{found}' at offset {offset}")]
    Unexpected { found: char, offset: usize },
    #[error("unexpected end of expression")]
    UnexpectedEnd,
    #[error("prefix '{0}' is not bound")]
    UnboundPrefix(String),
    #[error("unsupported axis '{0}'")]
    UnsupportedAxis(String),
    #[error("attribute steps are not allowed in a selector")]
    AttributeInSelector,
    #[error("an attribute step must be the last step of a field")]
    AttributeNotLast,
}

/// Parse a `selector` expression
pub fn parse_selector<F>(expression: &str, resolve_prefix: F) -> Result<IdentityXPath, XPathError>
where
    F: Fn(&str) -> Option<String>,
{
    parse(expression, XPathKind::Selector, &resolve_prefix)
}

/// Parse a `field` expression
pub fn parse_field<F>(expression: &str, resolve_prefix: F) -> Result<IdentityXPath, XPathError>
where
    F: Fn(&str) -> Option<String>,
{
    parse(expression, XPathKind::Field, &resolve_prefix)
}

fn parse(
    expression: &str,
    kind: XPathKind,
    resolve_prefix: &dyn Fn(&str) -> Option<String>,
) -> Result<IdentityXPath, XPathError> {
    if expression.trim().is_empty() {
        return Err(XPathError::Empty);
    }
    let mut parser = Parser {
        chars: expression.char_indices().collect(),
        pos: 0,
        resolve_prefix,
    };
    let mut paths = vec![parser.path()?];
    loop {
        parser.skip_ws();
        match parser.peek() {
            None => break,
            Some('|') => {
                parser.pos += 1;
                paths.push(parser.path()?);
            }
            Some(c) => return Err(parser.unexpected(c)),
        }
    }

    for path in &paths {
        for (i, step) in path.steps.iter().enumerate() {
            if let Step::Attribute(_) = step {
                match kind {
                    XPathKind::Selector => return Err(XPathError::AttributeInSelector),
                    XPathKind::Field if i + 1 != path.steps.len() => {
                        return Err(XPathError::AttributeNotLast)
                    }
                    XPathKind::Field => {}
                }
            }
        }
    }

    Ok(IdentityXPath {
        expression: expression.to_string(),
        kind,
        paths,
    })
}

struct Parser<'r> {
    chars: Vec<(usize, char)>,
    pos: usize,
    resolve_prefix: &'r dyn Fn(&str) -> Option<String>,
}

impl Parser<'_> {
    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).map(|(_, c)| *c)
    }

    fn peek_at(&self, ahead: usize) -> Option<char> {
        self.chars.get(self.pos + ahead).map(|(_, c)| *c)
    }

    fn skip_ws(&mut self) {
        while matches!(self.peek(), Some(c) if c.is_ascii_whitespace()) {
            self.pos += 1;
        }
    }

    fn unexpected(&self, found: char) -> XPathError {
        XPathError::Unexpected {
            found,
            offset: self.chars.get(self.pos).map_or(0, |(i, _)| *i),
        }
    }

    /// Whether `.` at the cursor starts a `.//` prefix
    fn at_descendant_prefix(&self) -> bool {
        if self.peek() != Some('.') {
            return false;
        }
        let mut ahead = 1;
        while matches!(self.peek_at(ahead), Some(c) if c.is_ascii_whitespace()) {
            ahead += 1;
        }
        self.peek_at(ahead) == Some('/') && self.peek_at(ahead + 1) == Some('/')
    }

    fn path(&mut self) -> Result<LocationPath, XPathError> {
        self.skip_ws();
        let mut descendant = false;
        if self.at_descendant_prefix() {
            self.pos += 1;
            self.skip_ws();
            self.pos += 2;
            descendant = true;
        }
        let mut steps = vec![self.step()?];
        loop {
            self.skip_ws();
            if self.peek() != Some('/') {
                break;
            }
            self.pos += 1;
            self.skip_ws();
            if let Some('/') = self.peek() {
                return Err(self.unexpected('/'));
            }
            steps.push(self.step()?);
        }
        Ok(LocationPath { descendant, steps })
    }

    fn step(&mut self) -> Result<Step, XPathError> {
        self.skip_ws();
        match self.peek() {
            None => Err(XPathError::UnexpectedEnd),
            Some('.') => {
                self.pos += 1;
                Ok(Step::SelfNode)
            }
            Some('@') => {
                self.pos += 1;
                self.skip_ws();
                Ok(Step::Attribute(self.name_test()?))
            }
            Some('*') => Ok(Step::Child(self.name_test()?)),
            Some(c) if is_name_start(c) => {
                let start = self.pos;
                let name = self.ncname();
                self.skip_ws();
                if self.peek() == Some(':') && self.peek_at(1) == Some(':') {
                    self.pos += 2;
                    self.skip_ws();
                    return match name.as_str() {
                        "child" => Ok(Step::Child(self.name_test()?)),
                        "attribute" => Ok(Step::Attribute(self.name_test()?)),
                        _ => Err(XPathError::UnsupportedAxis(name)),
                    };
                }
                self.pos = start;
                Ok(Step::Child(self.name_test()?))
            }
            Some(c) => Err(self.unexpected(c)),
        }
    }

    fn name_test(&mut self) -> Result<NameTest, XPathError> {
        match self.peek() {
            None => Err(XPathError::UnexpectedEnd),
            Some('*') => {
                self.pos += 1;
                Ok(NameTest::Any)
            }
            Some(c) if is_name_start(c) => {
                let first = self.ncname();
                if self.peek() == Some(':') && self.peek_at(1) != Some(':') {
                    self.pos += 1;
                    let namespace = (self.resolve_prefix)(&first)
                        .ok_or_else(|| XPathError::UnboundPrefix(first.clone()))?;
                    if self.peek() == Some('*') {
                        self.pos += 1;
                        return Ok(NameTest::Namespace(Some(namespace)));
                    }
                    match self.peek() {
                        Some(c) if is_name_start(c) => {
                            let local = self.ncname();
                            Ok(NameTest::Name(QName::namespaced(namespace, local)))
                        }
                        Some(c) => Err(self.unexpected(c)),
                        None => Err(XPathError::UnexpectedEnd),
                    }
                } else {
                    Ok(NameTest::Name(QName::local(first)))
                }
            }
            Some(c) => Err(self.unexpected(c)),
        }
    }

    fn ncname(&mut self) -> String {
        let mut name = String::new();
        while let Some(c) = self.peek() {
            if is_name_char(c) {
                name.push(c);
                self.pos += 1;
            } else {
                break;
            }
        }
        name
    }
}

fn is_name_start(c: char) -> bool {
    c.is_alphabetic() || c == '_'
}

fn is_name_char(c: char) -> bool {
    c.is_alphanumeric() || matches!(c, '_' | '-' | '.' | '\u{B7}')
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn resolver(prefix: &str) -> Option<String> {
        (prefix == "t").then(|| "urn:t".to_string())
    }

    #[test]
    fn test_selector_paths() {
        let xpath = parse_selector(".//t:item | t:list/*", resolver).unwrap();
        assert_eq!(
            xpath.paths,
            vec![
                LocationPath {
                    descendant: true,
                    steps: vec![Step::Child(NameTest::Name(QName::namespaced("urn:t", "item")))],
                },
                LocationPath {
                    descendant: false,
                    steps: vec![
                        Step::Child(NameTest::Name(QName::namespaced("urn:t", "list"))),
                        Step::Child(NameTest::Any),
                    ],
                },
            ]
        );
    }

    #[test]
    fn test_field_attribute_forms() {
        let xpath = parse_field("@id", resolver).unwrap();
        assert_eq!(
            xpath.paths[0].steps,
            vec![Step::Attribute(NameTest::Name(QName::local("id")))]
        );
        let xpath = parse_field("child::a/attribute::t:*", resolver).unwrap();
        assert_eq!(
            xpath.paths[0].steps,
            vec![
                Step::Child(NameTest::Name(QName::local("a"))),
                Step::Attribute(NameTest::Namespace(Some("urn:t".into()))),
            ]
        );
        assert!(parse_field(".", resolver).is_ok());
    }

    #[test]
    fn test_errors() {
        assert_eq!(parse_selector("", resolver), Err(XPathError::Empty));
        assert_eq!(parse_selector("@id", resolver), Err(XPathError::AttributeInSelector));
        assert_eq!(parse_field("@id/a", resolver), Err(XPathError::AttributeNotLast));
        assert_eq!(
            parse_selector("x:a", resolver),
            Err(XPathError::UnboundPrefix("x".into()))
        );
        assert_eq!(
            parse_selector("parent::a", resolver),
            Err(XPathError::UnsupportedAxis("parent".into()))
        );
        assert!(matches!(
            parse_selector("a[1]", resolver),
            Err(XPathError::Unexpected { found: '[', .. })
        ));
        assert!(parse_selector("a//b", resolver).is_err());
        assert_eq!(parse_selector("a/", resolver), Err(XPathError::UnexpectedEnd));
    }
}
