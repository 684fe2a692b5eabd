//! Types describing Python functions.

use super::literal::PyValue;

/// How a parameter binds in a Python signature.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamKind {
    /// Regular (or positional-only) parameter before any `*`.
    Positional,
    /// The `*args` collector.
    VarArgs,
    /// Parameter after `*` or `*args`.
    KeywordOnly,
    /// The `**kwargs` collector.
    VarKeywords,
}

/// A single parameter of a Python function.
#[derive(Debug, Clone, PartialEq)]
pub struct Parameter {
    /// Parameter name (without `*` markers)
    pub name: String,
    /// Binding kind
    pub kind: ParamKind,
    /// Annotation source text, if annotated
    pub annotation: Option<String>,
    /// Default value, if any
    pub default: Option<PyValue>,
}

impl Parameter {
    /// Whether the parameter is filled from the command line.
    ///
    /// `*args` and `**kwargs` are never exposed as arguments.
    pub fn is_exposed(&self) -> bool {
        matches!(self.kind, ParamKind::Positional | ParamKind::KeywordOnly)
    }
}

/// A parsed Python function.
#[derive(Debug, Clone, PartialEq)]
pub struct FunctionSignature {
    /// Function name
    pub name: String,
    /// Parameters in declaration order (`self` removed)
    pub params: Vec<Parameter>,
    /// Return annotation source text
    pub returns: Option<String>,
    /// Raw docstring contents
    pub docstring: Option<String>,
    /// Dedented source of the whole function, `self` removed
    pub source: String,
    /// Dedented statements after the docstring, comments included
    pub body: String,
    /// Indentation of the `def` line in the original file
    pub indent: usize,
}

impl FunctionSignature {
    /// Look up a parameter by name.
    pub fn param(&self, name: &str) -> Option<&Parameter> {
        self.params.iter().find(|p| p.name == name)
    }

    /// Parameters that become command line arguments, in declaration order.
    pub fn exposed_params(&self) -> impl Iterator<Item = &Parameter> {
        self.params.iter().filter(|p| p.is_exposed())
    }

    /// Defaults of keyword-only parameters.
    ///
    /// Positional defaults are deliberately not reported: only keyword-only
    /// parameters turn into optional command line flags.
    pub fn keyword_defaults(&self) -> impl Iterator<Item = (&str, &PyValue)> {
        self.params.iter().filter_map(|p| match (&p.kind, &p.default) {
            (ParamKind::KeywordOnly, Some(default)) => Some((p.name.as_str(), default)),
            _ => None,
        })
    }

    /// Name of the `*args` collector, if present.
    pub fn var_args(&self) -> Option<&str> {
        self.params
            .iter()
            .find(|p| p.kind == ParamKind::VarArgs)
            .map(|p| p.name.as_str())
    }

    /// Position of a parameter in the signature.
    pub fn position(&self, name: &str) -> Option<usize> {
        self.params.iter().position(|p| p.name == name)
    }
}
