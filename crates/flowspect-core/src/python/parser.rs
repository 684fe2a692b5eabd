//! Python module introspection on a tree-sitter syntax tree.
//!
//! Extracts just enough structure from a Python module to expose one of its
//! functions on the command line: signatures, docstrings, imports and
//! module-level string constants such as `__version__`.

use std::collections::BTreeMap;
use std::ops::Range;
use std::path::{Path, PathBuf};

use tracing::warn;
use tree_sitter::{Node, Parser, Tree};

use super::literal::PyValue;
use super::types::{FunctionSignature, ParamKind, Parameter};
use crate::error::{Error, Result};

/// A parsed Python module.
#[derive(Debug, Clone)]
pub struct PythonModule {
    /// Path the module was read from (informational)
    path: PathBuf,
    /// Full module source
    source: String,
    /// Every `def` found, in source order, nested ones included
    functions: Vec<FunctionSignature>,
    /// Top-level import statements
    imports: Vec<String>,
    /// Top-level assignments of string literals, `__version__` among them
    constants: BTreeMap<String, String>,
}

impl PythonModule {
    /// Parse a module from disk.
    pub fn parse_file(path: &Path) -> Result<Self> {
        let source = std::fs::read_to_string(path)
            .map_err(|e| Error::Parse(format!("Failed to read file {}: {}", path.display(), e)))?;
        Self::parse_str(&source, path)
    }

    /// Parse module source text.
    pub fn parse_str(source: &str, path: &Path) -> Result<Self> {
        let tree = parse_tree(source)?;
        let root = tree.root_node();
        if root.has_error() {
            warn!("{} has syntax errors, reading what parses", path.display());
        }

        let mut imports = Vec::new();
        let mut constants = BTreeMap::new();
        for statement in named_children(root) {
            match statement.kind() {
                "import_statement" | "import_from_statement" | "future_import_statement" => {
                    imports.push(node_text(statement, source).to_string());
                }
                "expression_statement" => {
                    if let Some((name, value)) = string_assignment(statement, source) {
                        constants.insert(name, value);
                    }
                }
                _ => {}
            }
        }

        let functions = function_nodes(root)
            .into_iter()
            .map(|node| parse_function(node, source))
            .collect();

        Ok(Self {
            path: path.to_path_buf(),
            source: source.to_string(),
            functions,
            imports,
            constants,
        })
    }

    /// Find a function by name.
    ///
    /// Top-level definitions win over nested ones of the same name.
    pub fn function(&self, name: &str) -> Result<&FunctionSignature> {
        self.functions
            .iter()
            .filter(|f| f.name == name)
            .min_by_key(|f| f.indent)
            .ok_or_else(|| Error::FunctionNotFound {
                function: name.to_string(),
                path: self.path.clone(),
            })
    }

    /// Top-level functions other than `master` and `main`.
    pub fn helpers<'a>(&'a self, master: &'a str) -> impl Iterator<Item = &'a FunctionSignature> {
        self.functions
            .iter()
            .filter(move |f| f.indent == 0 && f.name != master && f.name != "main")
    }

    /// All functions, in source order.
    pub fn functions(&self) -> &[FunctionSignature] {
        &self.functions
    }

    /// Top-level import statements.
    pub fn imports(&self) -> &[String] {
        &self.imports
    }

    /// The module `__version__`, if declared.
    pub fn version(&self) -> Option<&str> {
        self.constant("__version__")
    }

    /// Value of a top-level `NAME = '...'` assignment; the last one wins.
    pub fn constant(&self, name: &str) -> Option<&str> {
        self.constants.get(name).map(String::as_str)
    }

    /// Full module source.
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Path the module was parsed from.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Parse Python source into a syntax tree.
pub(crate) fn parse_tree(source: &str) -> Result<Tree> {
    let mut parser = Parser::new();
    parser
        .set_language(&tree_sitter_python::LANGUAGE.into())
        .map_err(|e| Error::Parse(format!("Failed to load the Python grammar: {e}")))?;
    parser
        .parse(source, None)
        .ok_or_else(|| Error::Parse("Python parser produced no tree".to_string()))
}

pub(crate) fn named_children(node: Node<'_>) -> Vec<Node<'_>> {
    let mut cursor = node.walk();
    node.named_children(&mut cursor)
        .filter(|child| child.kind() != "comment")
        .collect()
}

pub(crate) fn node_text<'s>(node: Node<'_>, source: &'s str) -> &'s str {
    &source[node.byte_range()]
}

/// `NAME = '...'` at module level.
fn string_assignment(statement: Node<'_>, source: &str) -> Option<(String, String)> {
    let assignment = statement.named_child(0).filter(|n| n.kind() == "assignment")?;
    let left = assignment.child_by_field_name("left")?;
    if left.kind() != "identifier" {
        return None;
    }
    let right = assignment.child_by_field_name("right")?;
    let value = PyValue::from_node(right, source).as_str()?.to_string();
    Some((node_text(left, source).to_string(), value))
}

/// Every `function_definition` node, in source order.
fn function_nodes(root: Node<'_>) -> Vec<Node<'_>> {
    let mut found = Vec::new();
    let mut cursor = root.walk();
    'walk: loop {
        if cursor.node().kind() == "function_definition" {
            found.push(cursor.node());
        }
        if cursor.goto_first_child() {
            continue;
        }
        while !cursor.goto_next_sibling() {
            if !cursor.goto_parent() {
                break 'walk;
            }
        }
    }
    found
}

fn parse_function(node: Node<'_>, source: &str) -> FunctionSignature {
    let name = node
        .child_by_field_name("name")
        .map(|n| node_text(n, source).to_string())
        .unwrap_or_default();

    // Decorators belong to the function source.
    let outer = node
        .parent()
        .filter(|parent| parent.kind() == "decorated_definition")
        .unwrap_or(node);
    let indent = outer.start_position().column;
    let line_start = outer.start_byte() - indent;

    let items = node
        .child_by_field_name("parameters")
        .map(parameter_items)
        .unwrap_or_default();
    let mut params = parse_params(&items, source);

    let mut text = source[line_start..node.end_byte()].trim_end().to_string();
    if params.first().is_some_and(|p| p.name == "self") {
        params.remove(0);
        let removed = self_range(&items);
        text.replace_range(removed.start - line_start..removed.end - line_start, "");
    }

    let body = node.child_by_field_name("body");
    let docstring = body.and_then(|body| docstring(body, source));
    // Statements start after the docstring, or after the `:` closing the header.
    let body_start = match &docstring {
        Some((_, end)) => *end,
        None => header_end(node).unwrap_or_else(|| body.map_or(node.end_byte(), |b| b.start_byte())),
    };

    FunctionSignature {
        name,
        params,
        returns: node
            .child_by_field_name("return_type")
            .map(|n| node_text(n, source).to_string()),
        docstring: docstring.map(|(text, _)| text),
        source: dedent(&text),
        body: dedent(source[body_start.min(node.end_byte())..node.end_byte()].trim_end()),
        indent,
    }
}

/// End of the `:` token that closes a `def` header.
fn header_end(node: Node<'_>) -> Option<usize> {
    let mut cursor = node.walk();
    let colon = node.children(&mut cursor).find(|child| child.kind() == ":");
    colon.map(|c| c.end_byte())
}

/// Children of a `parameters` node without punctuation and comments.
fn parameter_items(parameters: Node<'_>) -> Vec<Node<'_>> {
    let mut cursor = parameters.walk();
    parameters
        .children(&mut cursor)
        .filter(|child| !matches!(child.kind(), "(" | ")" | "," | "comment"))
        .collect()
}

/// Bytes to cut so the leading `self` disappears from the signature.
fn self_range(items: &[Node<'_>]) -> Range<usize> {
    match items {
        [first, next, ..] => first.start_byte()..next.start_byte(),
        [first] => first.byte_range(),
        [] => 0..0,
    }
}

/// Parameters from the children of a `parameters` node.
fn parse_params(items: &[Node<'_>], source: &str) -> Vec<Parameter> {
    let mut params = Vec::new();
    let mut keyword_only = false;

    for item in items {
        let (target, annotation, default) = match item.kind() {
            "keyword_separator" | "*" => {
                keyword_only = true;
                continue;
            }
            "positional_separator" | "/" => continue,
            "typed_parameter" => (
                item.named_child(0),
                item.child_by_field_name("type"),
                None,
            ),
            "default_parameter" => (
                item.child_by_field_name("name"),
                None,
                item.child_by_field_name("value"),
            ),
            "typed_default_parameter" => (
                item.child_by_field_name("name"),
                item.child_by_field_name("type"),
                item.child_by_field_name("value"),
            ),
            _ => (Some(*item), None, None),
        };
        let Some(target) = target else {
            continue;
        };

        let (kind, name) = match target.kind() {
            "list_splat_pattern" => {
                keyword_only = true;
                (ParamKind::VarArgs, node_text(target, source).trim_start_matches('*'))
            }
            "dictionary_splat_pattern" => (
                ParamKind::VarKeywords,
                node_text(target, source).trim_start_matches('*'),
            ),
            "identifier" if keyword_only => (ParamKind::KeywordOnly, node_text(target, source)),
            "identifier" => (ParamKind::Positional, node_text(target, source)),
            _ => continue,
        };

        params.push(Parameter {
            name: name.trim().to_string(),
            kind,
            annotation: annotation.map(|n| node_text(n, source).to_string()),
            default: default.map(|n| PyValue::from_node(n, source)),
        });
    }

    params
}

/// Raw text of the string opening a function body, with the end of its
/// statement.
fn docstring(body: Node<'_>, source: &str) -> Option<(String, usize)> {
    let first = named_children(body).into_iter().next()?;
    if first.kind() != "expression_statement" {
        return None;
    }
    let string = first.named_child(0).filter(|n| n.kind() == "string")?;
    let text = node_text(string, source);
    let unprefixed = text.trim_start_matches(|c: char| c.is_ascii_alphabetic());
    let quote = if unprefixed.starts_with("\"\"\"") || unprefixed.starts_with("'''") { 3 } else { 1 };
    let doc = unprefixed.get(quote..unprefixed.len().checked_sub(quote)?)?;
    Some((doc.to_string(), first.end_byte()))
}

fn indentation(line: &str) -> usize {
    line.chars().take_while(|c| c.is_whitespace()).count()
}

/// Remove common leading whitespace from every line (`textwrap.dedent`).
pub fn dedent(text: &str) -> String {
    let margin = text
        .lines()
        .filter(|l| !l.trim().is_empty())
        .map(indentation)
        .min()
        .unwrap_or(0);

    text.lines()
        .map(|l| {
            if l.trim().is_empty() {
                ""
            } else {
                l.char_indices().nth(margin).map_or("", |(idx, _)| &l[idx..])
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}
