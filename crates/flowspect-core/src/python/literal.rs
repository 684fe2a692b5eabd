//! Python literal values.

use std::collections::BTreeMap;
use std::fmt::Write as _;

use serde::{Deserialize, Serialize};
use tree_sitter::Node;

use super::parser::{named_children, node_text, parse_tree};

/// A value that can be passed to or defaulted on a Python parameter.
///
/// Values come either from a manifest (TOML) or from the default expression
/// of a Python signature. Defaults that are not plain literals are kept
/// verbatim as [`PyValue::Expr`].
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(untagged)]
pub enum PyValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    List(Vec<PyValue>),
    Map(BTreeMap<String, PyValue>),
    None,
    /// Unevaluated Python expression.
    #[serde(skip_deserializing)]
    Expr(String),
}

impl PyValue {
    /// Parse a Python literal expression.
    ///
    /// Anything that is not a literal is returned as [`PyValue::Expr`].
    pub fn parse(text: &str) -> Self {
        let text = text.trim();
        let Ok(tree) = parse_tree(text) else {
            return Self::Expr(text.to_string());
        };
        let root = tree.root_node();
        let statements = named_children(root);
        match statements.as_slice() {
            [statement] if statement.kind() == "expression_statement" => {
                match named_children(*statement).as_slice() {
                    [expression] => Self::from_node(*expression, text),
                    _ => Self::Expr(text.to_string()),
                }
            }
            _ => Self::Expr(text.to_string()),
        }
    }

    /// Convert an expression node of `source`.
    pub(crate) fn from_node(node: Node<'_>, source: &str) -> Self {
        Self::literal(node, source).unwrap_or_else(|| Self::Expr(node_text(node, source).to_string()))
    }

    fn literal(node: Node<'_>, source: &str) -> Option<Self> {
        let text = node_text(node, source);
        match node.kind() {
            "none" => Some(Self::None),
            "true" => Some(Self::Bool(true)),
            "false" => Some(Self::Bool(false)),
            "integer" => parse_int(text).map(Self::Int),
            "float" => text.replace('_', "").parse().ok().map(Self::Float),
            "string" => string_value(node, text).map(Self::Str),
            "concatenated_string" => named_children(node)
                .into_iter()
                .map(|part| string_value(part, node_text(part, source)))
                .collect::<Option<Vec<_>>>()
                .map(|parts| Self::Str(parts.concat())),
            "parenthesized_expression" => match named_children(node).as_slice() {
                [inner] => Self::literal(*inner, source),
                _ => None,
            },
            "unary_operator" => {
                let operator = node.child_by_field_name("operator")?;
                let argument = Self::literal(node.child_by_field_name("argument")?, source)?;
                match (node_text(operator, source), argument) {
                    ("-", Self::Int(i)) => Some(Self::Int(-i)),
                    ("-", Self::Float(f)) => Some(Self::Float(-f)),
                    ("+", value @ (Self::Int(_) | Self::Float(_))) => Some(value),
                    _ => None,
                }
            }
            "list" | "tuple" => named_children(node)
                .into_iter()
                .filter(|item| item.kind() != "comment")
                .map(|item| Self::literal(item, source))
                .collect::<Option<Vec<_>>>()
                .map(Self::List),
            "dictionary" => {
                let mut map = BTreeMap::new();
                for entry in named_children(node) {
                    match entry.kind() {
                        "comment" => continue,
                        "pair" => {
                            let key = Self::literal(entry.child_by_field_name("key")?, source)?;
                            let value =
                                Self::literal(entry.child_by_field_name("value")?, source)?;
                            let key = match key {
                                Self::Str(k) => k,
                                other => other.py_repr(),
                            };
                            map.insert(key, value);
                        }
                        _ => return None,
                    }
                }
                Some(Self::Map(map))
            }
            _ => None,
        }
    }

    /// Whether the value is Python's `None`.
    pub fn is_none(&self) -> bool {
        matches!(self, Self::None)
    }

    /// The string payload, if this is a string.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(s) => Some(s),
            _ => None,
        }
    }

    /// Render as Python source (`repr`).
    pub fn py_repr(&self) -> String {
        match self {
            Self::None => "None".to_string(),
            Self::Bool(true) => "True".to_string(),
            Self::Bool(false) => "False".to_string(),
            Self::Int(i) => i.to_string(),
            Self::Float(f) => float_repr(*f),
            Self::Str(s) => quote(s),
            Self::List(items) => format!(
                "[{}]",
                items.iter().map(Self::py_repr).collect::<Vec<_>>().join(", ")
            ),
            Self::Map(map) => format!(
                "{{{}}}",
                map.iter()
                    .map(|(k, v)| format!("{}: {}", quote(k), v.py_repr()))
                    .collect::<Vec<_>>()
                    .join(", ")
            ),
            Self::Expr(text) => text.clone(),
        }
    }

    /// Render as a literal of a `nextflow.config` assignment.
    pub fn groovy_literal(&self) -> String {
        match self {
            Self::None => "'None'".to_string(),
            Self::Bool(b) => b.to_string(),
            Self::Int(i) => i.to_string(),
            Self::Float(f) => float_repr(*f),
            Self::Str(s) => quote(s),
            Self::List(items) => format!(
                "[{}]",
                items.iter().map(Self::groovy_literal).collect::<Vec<_>>().join(", ")
            ),
            Self::Map(map) => format!(
                "[{}]",
                map.iter()
                    .map(|(k, v)| format!("[{}, {}]", quote(k), v.groovy_literal()))
                    .collect::<Vec<_>>()
                    .join(", ")
            ),
            Self::Expr(text) => text.clone(),
        }
    }
}

impl std::fmt::Display for PyValue {
    /// Python `str()`: strings are shown unquoted.
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Str(s) => f.write_str(s),
            other => f.write_str(&other.py_repr()),
        }
    }
}

fn float_repr(f: f64) -> String {
    if f.is_nan() {
        "float('nan')".to_string()
    } else if f.is_infinite() {
        if f > 0.0 { "float('inf')" } else { "float('-inf')" }.to_string()
    } else if f.fract() == 0.0 && f.abs() < 1e16 {
        format!("{f:.1}")
    } else {
        f.to_string()
    }
}

/// Quote a string as a single-quoted Python literal.
fn quote(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('\'');
    for c in s.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\'' => out.push_str("\\'"),
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            '\r' => out.push_str("\\r"),
            c => out.push(c),
        }
    }
    out.push('\'');
    out
}

fn parse_int(text: &str) -> Option<i64> {
    let digits = text.replace('_', "");
    let lower = digits.to_ascii_lowercase();
    if let Some(hex) = lower.strip_prefix("0x") {
        i64::from_str_radix(hex, 16).ok()
    } else if let Some(oct) = lower.strip_prefix("0o") {
        i64::from_str_radix(oct, 8).ok()
    } else if let Some(bin) = lower.strip_prefix("0b") {
        i64::from_str_radix(bin, 2).ok()
    } else {
        digits.parse().ok()
    }
}

/// Value of a `string` node. Formatted strings with fields are not literals.
fn string_value(node: Node<'_>, text: &str) -> Option<String> {
    if node.kind() != "string" {
        return None;
    }
    let prefix_len = text.chars().take_while(|c| c.is_ascii_alphabetic()).count();
    let prefix = text[..prefix_len].to_ascii_lowercase();
    let body = &text[prefix_len..];
    let quote_len = if body.starts_with("\"\"\"") || body.starts_with("'''") { 3 } else { 1 };
    let inner = body.get(quote_len..body.len().checked_sub(quote_len)?)?;

    if prefix.contains('f') && inner.contains('{') {
        return None;
    }
    if prefix.contains('r') {
        return Some(inner.to_string());
    }
    Some(unescape(inner))
}

/// Resolve backslash escapes the way Python does; unknown escapes stay.
fn unescape(inner: &str) -> String {
    let mut out = String::with_capacity(inner.len());
    let mut chars = inner.chars().peekable();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('\n') => {}
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some('r') => out.push('\r'),
            Some('0') => out.push('\0'),
            Some('a') => out.push('\u{7}'),
            Some('b') => out.push('\u{8}'),
            Some('f') => out.push('\u{c}'),
            Some('v') => out.push('\u{b}'),
            Some(q @ ('\\' | '\'' | '"')) => out.push(q),
            Some(code @ ('x' | 'u' | 'U')) => {
                let width = match code {
                    'x' => 2,
                    'u' => 4,
                    _ => 8,
                };
                let hex: String = (0..width).filter_map(|_| chars.next_if(char::is_ascii_hexdigit)).collect();
                match u32::from_str_radix(&hex, 16).ok().and_then(char::from_u32) {
                    Some(decoded) if hex.len() == width => out.push(decoded),
                    _ => {
                        out.push('\\');
                        out.push(code);
                        out.push_str(&hex);
                    }
                }
            }
            Some(other) => {
                out.push('\\');
                out.push(other);
            }
            None => out.push('\\'),
        }
    }
    out
}

/// Write `items` as a Python list literal of strings.
pub(crate) fn py_str_list(items: &[String]) -> String {
    let mut out = String::from("[");
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            out.push_str(", ");
        }
        let _ = write!(out, "{}", quote(item));
    }
    out.push(']');
    out
}
