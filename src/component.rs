//! Parser for the embedded component grammar:
//! `[{c:"Name", p:{...}, style:{...}, children:[...]}]`
//!
//! The grammar is JSON-like but relaxed: object keys may be bare
//! identifiers, and strings may use single or double quotes. Structural
//! closure of a span is decided by `syntax::scan_component`; this module
//! only extracts values.

use serde::Serialize;
use serde_json::{Map, Number, Value};
use thiserror::Error;

use crate::sanitize;
use crate::syntax::{self, ComponentScan};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ComponentData {
    pub name: String,
    /// Ordered key->value property bag (`p` field).
    pub props: Map<String, Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub style: Option<Map<String, Value>>,
    pub children: Vec<ComponentData>,
}

impl ComponentData {
    /// A copy with all URL-looking string properties sanitized, recursively
    /// through `style` and `children`.
    pub fn sanitized(self) -> Self {
        Self {
            name: self.name,
            props: sanitize::sanitize_prop_map(self.props),
            style: self.style.map(sanitize::sanitize_prop_map),
            children: self.children.into_iter().map(Self::sanitized).collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ComponentError {
    #[error("span does not start with the component marker")]
    NotComponent,
    #[error("unexpected end of component span")]
    UnexpectedEnd,
    #[error("unexpected character `{found}` at offset {at}")]
    Unexpected { found: char, at: usize },
    #[error("component object has no `c` name field")]
    MissingName,
}

/// Best-effort extraction from a possibly still-open span: the name plus
/// whatever complete props exist. Used for skeleton rendering while a
/// component streams in.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PartialComponent {
    pub name: Option<String>,
    pub props: Map<String, Value>,
}

/// Parse a structurally closed component span.
///
/// Parsing the same closed span twice yields structurally equal results.
pub fn parse_component(span: &str) -> Result<ComponentData, ComponentError> {
    if !span.starts_with(syntax::COMPONENT_OPEN) {
        return Err(ComponentError::NotComponent);
    }
    let mut parser = Parser::new(span);
    parser.expect(b'[')?;
    parser.skip_ws();
    parser.parse_component_object()
}

/// Extract whatever is available from a span, open or closed.
///
/// Props are sanitized before they reach any renderer-facing surface.
pub fn extract_component_data(span: &str) -> PartialComponent {
    let mut partial = match syntax::scan_component(span) {
        ComponentScan::Closed(n) => match parse_component(&span[..n]) {
            Ok(data) => PartialComponent {
                name: Some(data.name),
                props: data.props,
            },
            Err(_) => best_effort(span),
        },
        ComponentScan::Open => best_effort(span),
        ComponentScan::Malformed => return PartialComponent::default(),
    };
    partial.props = sanitize::sanitize_prop_map(partial.props);
    partial
}

fn best_effort(span: &str) -> PartialComponent {
    let mut parser = Parser::new(span);
    parser.skip_ws();
    if parser.peek() == Some(b'[') {
        parser.pos += 1;
    }
    parser.skip_ws();
    parser.parse_component_object_partial()
}

struct Parser<'a> {
    text: &'a str,
    pos: usize,
}

impl<'a> Parser<'a> {
    fn new(text: &'a str) -> Self {
        Self { text, pos: 0 }
    }

    fn bytes(&self) -> &'a [u8] {
        self.text.as_bytes()
    }

    fn peek(&self) -> Option<u8> {
        self.bytes().get(self.pos).copied()
    }

    fn skip_ws(&mut self) {
        while matches!(self.peek(), Some(b' ') | Some(b'\t') | Some(b'\n') | Some(b'\r')) {
            self.pos += 1;
        }
    }

    fn expect(&mut self, b: u8) -> Result<(), ComponentError> {
        match self.peek() {
            Some(found) if found == b => {
                self.pos += 1;
                Ok(())
            }
            Some(found) => Err(ComponentError::Unexpected {
                found: found as char,
                at: self.pos,
            }),
            None => Err(ComponentError::UnexpectedEnd),
        }
    }

    fn parse_component_object(&mut self) -> Result<ComponentData, ComponentError> {
        self.expect(b'{')?;
        let mut name: Option<String> = None;
        let mut props = Map::new();
        let mut style: Option<Map<String, Value>> = None;
        let mut children = Vec::new();

        loop {
            self.skip_ws();
            match self.peek() {
                None => return Err(ComponentError::UnexpectedEnd),
                Some(b'}') => {
                    self.pos += 1;
                    break;
                }
                Some(b',') => {
                    self.pos += 1;
                    continue;
                }
                _ => {}
            }
            let key = self.parse_key()?;
            self.skip_ws();
            self.expect(b':')?;
            self.skip_ws();
            match key.as_str() {
                "c" => name = Some(self.parse_string()?),
                "p" => {
                    if let Value::Object(map) = self.parse_value()? {
                        props = map;
                    }
                }
                "style" => {
                    if let Value::Object(map) = self.parse_value()? {
                        style = Some(map);
                    }
                }
                "children" => children = self.parse_children(),
                _ => {
                    // Unknown fields are tolerated and dropped.
                    self.parse_value()?;
                }
            }
        }

        let name = name.ok_or(ComponentError::MissingName)?;
        Ok(ComponentData {
            name,
            props,
            style,
            children,
        })
    }

    /// Children parse best-effort: an unclosed or malformed child is absent
    /// rather than failing the whole parse.
    fn parse_children(&mut self) -> Vec<ComponentData> {
        let mut out = Vec::new();
        if self.peek() != Some(b'[') {
            let _ = self.parse_value();
            return out;
        }
        self.pos += 1;
        loop {
            self.skip_ws();
            match self.peek() {
                None => break,
                Some(b']') => {
                    self.pos += 1;
                    break;
                }
                Some(b',') => {
                    self.pos += 1;
                    continue;
                }
                Some(b'{') => match self.parse_component_object() {
                    Ok(child) => out.push(child),
                    Err(_) => {
                        self.skip_to_array_end();
                        break;
                    }
                },
                Some(_) => {
                    if self.parse_value().is_err() {
                        self.skip_to_array_end();
                        break;
                    }
                }
            }
        }
        out
    }

    /// Advance past the `]` that closes the array we are currently inside,
    /// honoring string and escape semantics.
    fn skip_to_array_end(&mut self) {
        let bytes = self.bytes();
        let mut bracket_depth = 1i32;
        let mut brace_depth = 0i32;
        let mut in_string = false;
        let mut quote = 0u8;
        let mut escape = false;
        while self.pos < bytes.len() {
            let b = bytes[self.pos];
            self.pos += 1;
            if escape {
                escape = false;
                continue;
            }
            if in_string {
                if b == b'\\' {
                    escape = true;
                } else if b == quote {
                    in_string = false;
                }
                continue;
            }
            match b {
                b'"' | b'\'' => {
                    in_string = true;
                    quote = b;
                }
                b'[' => bracket_depth += 1,
                b']' => {
                    bracket_depth -= 1;
                    if bracket_depth == 0 && brace_depth <= 0 {
                        return;
                    }
                }
                b'{' => brace_depth += 1,
                b'}' => brace_depth -= 1,
                _ => {}
            }
        }
    }

    fn parse_component_object_partial(&mut self) -> PartialComponent {
        let mut out = PartialComponent::default();
        if self.peek() != Some(b'{') {
            return out;
        }
        self.pos += 1;
        loop {
            self.skip_ws();
            match self.peek() {
                None | Some(b'}') => break,
                Some(b',') => {
                    self.pos += 1;
                    continue;
                }
                _ => {}
            }
            let Ok(key) = self.parse_key() else { break };
            self.skip_ws();
            if self.peek() != Some(b':') {
                break;
            }
            self.pos += 1;
            self.skip_ws();
            match key.as_str() {
                "c" => match self.parse_string() {
                    Ok(name) => out.name = Some(name),
                    Err(_) => break,
                },
                "p" => match self.parse_value() {
                    Ok(Value::Object(map)) => out.props = map,
                    Ok(_) => {}
                    Err(_) => break,
                },
                _ => {
                    if self.parse_value().is_err() {
                        break;
                    }
                }
            }
        }
        out
    }

    fn parse_key(&mut self) -> Result<String, ComponentError> {
        match self.peek() {
            Some(b'"') | Some(b'\'') => self.parse_string(),
            Some(b) if b.is_ascii_alphanumeric() || b == b'_' || b == b'$' => {
                let start = self.pos;
                while self
                    .peek()
                    .is_some_and(|b| b.is_ascii_alphanumeric() || matches!(b, b'_' | b'$' | b'-'))
                {
                    self.pos += 1;
                }
                Ok(self.text[start..self.pos].to_string())
            }
            Some(found) => Err(ComponentError::Unexpected {
                found: found as char,
                at: self.pos,
            }),
            None => Err(ComponentError::UnexpectedEnd),
        }
    }

    fn parse_value(&mut self) -> Result<Value, ComponentError> {
        match self.peek() {
            Some(b'"') | Some(b'\'') => Ok(Value::String(self.parse_string()?)),
            Some(b'{') => Ok(Value::Object(self.parse_object()?)),
            Some(b'[') => Ok(Value::Array(self.parse_array()?)),
            Some(b't') => {
                self.expect_keyword("true")?;
                Ok(Value::Bool(true))
            }
            Some(b'f') => {
                self.expect_keyword("false")?;
                Ok(Value::Bool(false))
            }
            Some(b'n') => {
                self.expect_keyword("null")?;
                Ok(Value::Null)
            }
            Some(b) if b == b'-' || b.is_ascii_digit() => self.parse_number(),
            Some(found) => Err(ComponentError::Unexpected {
                found: found as char,
                at: self.pos,
            }),
            None => Err(ComponentError::UnexpectedEnd),
        }
    }

    fn expect_keyword(&mut self, keyword: &str) -> Result<(), ComponentError> {
        if self.text[self.pos..].starts_with(keyword) {
            self.pos += keyword.len();
            Ok(())
        } else {
            Err(ComponentError::Unexpected {
                found: self.peek().map(|b| b as char).unwrap_or('\0'),
                at: self.pos,
            })
        }
    }

    fn parse_object(&mut self) -> Result<Map<String, Value>, ComponentError> {
        self.expect(b'{')?;
        let mut map = Map::new();
        loop {
            self.skip_ws();
            match self.peek() {
                None => return Err(ComponentError::UnexpectedEnd),
                Some(b'}') => {
                    self.pos += 1;
                    return Ok(map);
                }
                Some(b',') => {
                    self.pos += 1;
                    continue;
                }
                _ => {}
            }
            let key = self.parse_key()?;
            self.skip_ws();
            self.expect(b':')?;
            self.skip_ws();
            let value = self.parse_value()?;
            map.insert(key, value);
        }
    }

    fn parse_array(&mut self) -> Result<Vec<Value>, ComponentError> {
        self.expect(b'[')?;
        let mut out = Vec::new();
        loop {
            self.skip_ws();
            match self.peek() {
                None => return Err(ComponentError::UnexpectedEnd),
                Some(b']') => {
                    self.pos += 1;
                    return Ok(out);
                }
                Some(b',') => {
                    self.pos += 1;
                    continue;
                }
                _ => {}
            }
            out.push(self.parse_value()?);
        }
    }

    fn parse_string(&mut self) -> Result<String, ComponentError> {
        let quote = match self.peek() {
            Some(b @ (b'"' | b'\'')) => b,
            Some(found) => {
                return Err(ComponentError::Unexpected {
                    found: found as char,
                    at: self.pos,
                });
            }
            None => return Err(ComponentError::UnexpectedEnd),
        };
        self.pos += 1;

        let bytes = self.bytes();
        let mut out = String::new();
        let mut seg_start = self.pos;
        while self.pos < bytes.len() {
            let b = bytes[self.pos];
            if b == quote {
                out.push_str(&self.text[seg_start..self.pos]);
                self.pos += 1;
                return Ok(out);
            }
            if b != b'\\' {
                self.pos += 1;
                continue;
            }
            out.push_str(&self.text[seg_start..self.pos]);
            self.pos += 1;
            let Some(esc) = bytes.get(self.pos).copied() else {
                return Err(ComponentError::UnexpectedEnd);
            };
            self.pos += 1;
            match esc {
                b'n' => out.push('\n'),
                b't' => out.push('\t'),
                b'r' => out.push('\r'),
                b'b' => out.push('\u{0008}'),
                b'f' => out.push('\u{000C}'),
                b'u' => {
                    let hex = self.text.get(self.pos..self.pos + 4);
                    let code = hex.and_then(|h| u32::from_str_radix(h, 16).ok());
                    match code {
                        Some(code) => {
                            self.pos += 4;
                            out.push(char::from_u32(code).unwrap_or('\u{FFFD}'));
                        }
                        None => out.push('u'),
                    }
                }
                other => out.push(other as char),
            }
            seg_start = self.pos;
        }
        Err(ComponentError::UnexpectedEnd)
    }

    fn parse_number(&mut self) -> Result<Value, ComponentError> {
        let start = self.pos;
        if self.peek() == Some(b'-') {
            self.pos += 1;
        }
        let mut is_float = false;
        while let Some(b) = self.peek() {
            match b {
                b'0'..=b'9' => self.pos += 1,
                b'.' | b'e' | b'E' | b'+' | b'-' => {
                    is_float = true;
                    self.pos += 1;
                }
                _ => break,
            }
        }
        let raw = &self.text[start..self.pos];
        if raw.is_empty() || raw == "-" {
            return Err(ComponentError::Unexpected {
                found: self.peek().map(|b| b as char).unwrap_or('\0'),
                at: self.pos,
            });
        }
        if !is_float {
            if let Ok(n) = raw.parse::<i64>() {
                return Ok(Value::Number(Number::from(n)));
            }
        }
        match raw.parse::<f64>() {
            Ok(f) => Ok(Value::Number(
                Number::from_f64(f).unwrap_or_else(|| Number::from(0)),
            )),
            Err(_) => Err(ComponentError::Unexpected {
                found: '\0',
                at: start,
            }),
        }
    }
}
