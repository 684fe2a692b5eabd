//! Channel specifications.

use serde::Deserialize;

use crate::error::{Error, Result};

/// Name of a channel; outputs may fan out into several channels.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum ChannelName {
    One(String),
    Many(Vec<String>),
}

impl ChannelName {
    pub fn names(&self) -> Vec<&str> {
        match self {
            Self::One(name) => vec![name.as_str()],
            Self::Many(names) => names.iter().map(String::as_str).collect(),
        }
    }

    /// The name, if this is a single channel.
    pub fn single(&self) -> Option<&str> {
        match self {
            Self::One(name) => Some(name),
            Self::Many(_) => None,
        }
    }

    /// Output routing: ` into x` or ` into{a; b}`.
    pub fn route(&self) -> String {
        match self {
            Self::One(name) => format!(" into {name}"),
            Self::Many(names) => format!(" into{{{}}}", names.join("; ")),
        }
    }
}

impl std::fmt::Display for ChannelName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.names().join(", "))
    }
}

/// One side of a channel's variable mapping.
///
/// A single string holds one or several `", "` separated names; a list is a
/// tuple whose entries correspond by position to the other side.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum Names {
    One(String),
    Many(Vec<String>),
}

impl Names {
    pub fn is_tuple(&self) -> bool {
        matches!(self, Self::Many(_))
    }

    /// Individual names.
    pub fn resolve(&self) -> Vec<String> {
        match self {
            Self::One(text) if text.is_empty() => vec![String::new()],
            Self::One(text) => text.split(", ").map(str::to_string).collect(),
            Self::Many(names) => names.clone(),
        }
    }
}

/// Declaration of a named data channel and how its variables map to the
/// parameters of a process function.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ChannelSpec {
    pub name: ChannelName,
    /// Nextflow qualifier (`val`, `file`, `tuple`, `stdout`...); absent or
    /// `"None"` declares the channel without generating anything
    #[serde(default)]
    pub kind: Option<String>,
    /// Nextflow-side variable(s)
    #[serde(default)]
    pub nextflow: Option<Names>,
    /// Python-side parameter(s); `"None"` entries only occupy a position
    #[serde(default)]
    pub python: Option<Names>,
    /// Explicit `[nextflow, python]` pairs, instead of `nextflow`/`python`
    #[serde(default)]
    pub mapping: Option<Vec<[String; 2]>>,
    /// Operator chain appended to the channel declaration
    #[serde(default)]
    pub transform: Option<String>,
    /// Source the channel from the pipeline parameter of the same name
    #[serde(default)]
    pub from_params: bool,
}

/// A channel with its mapping resolved into positional correspondence.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedChannel {
    /// Declared variable text, splat markers removed
    pub declaration: String,
    /// Nextflow variables by position, splat markers removed
    pub variables: Vec<String>,
    /// Python parameter by position; `None` occupies a position only
    pub python: Vec<Option<String>>,
}

impl ChannelSpec {
    /// Build a simple `kind nextflow` channel mapped to one Python name.
    pub fn new(name: &str, kind: &str, nextflow: &str, python: Option<&str>) -> Self {
        Self {
            name: ChannelName::One(name.to_string()),
            kind: Some(kind.to_string()),
            nextflow: Some(Names::One(nextflow.to_string())),
            python: python.map(|p| Names::One(p.to_string())),
            mapping: None,
            transform: None,
            from_params: false,
        }
    }

    /// Whether the channel is declared for bookkeeping only.
    pub fn is_skipped(&self) -> bool {
        matches!(self.kind.as_deref(), None | Some("None"))
    }

    /// Python names the channel claims, lazy markers removed.
    pub fn python_names(&self) -> Vec<String> {
        self.resolve()
            .map(|resolved| resolved.python)
            .unwrap_or_default()
            .into_iter()
            .flatten()
            .map(|name| name.trim_start_matches('*').to_string())
            .collect()
    }

    /// Check the mapping and line up both sides.
    pub fn resolve(&self) -> Result<ResolvedChannel> {
        let invalid = |message: String| Error::InvalidChannel {
            channel: self.name.to_string(),
            message,
        };

        let (nextflow, python) = match &self.mapping {
            Some(pairs) => {
                if self.nextflow.is_some() || self.python.is_some() {
                    return Err(invalid(
                        "`mapping` cannot be combined with `nextflow` or `python`".to_string(),
                    ));
                }
                let (nf, py): (Vec<String>, Vec<String>) =
                    pairs.iter().map(|[n, p]| (n.clone(), p.clone())).unzip();
                (Names::Many(nf), Some(Names::Many(py)))
            }
            None => (
                self.nextflow.clone().unwrap_or(Names::One(String::new())),
                self.python.clone(),
            ),
        };

        let variables: Vec<String> = nextflow
            .resolve()
            .into_iter()
            .map(|v| v.strip_prefix('*').map(str::to_string).unwrap_or(v))
            .collect();
        let python: Vec<Option<String>> = python
            .as_ref()
            .map(Names::resolve)
            .unwrap_or_default()
            .into_iter()
            .map(|p| (p != "None" && !p.is_empty()).then_some(p))
            .collect();

        let tupled = nextflow.is_tuple() || self.python.as_ref().is_some_and(Names::is_tuple);
        if tupled && variables.len() != python.len() {
            return Err(invalid(format!(
                "{} Nextflow variable(s) but {} Python name(s)",
                variables.len(),
                python.len()
            )));
        }
        if python.len() > variables.len() {
            return Err(invalid(format!(
                "{} Python name(s) for only {} Nextflow variable(s)",
                python.len(),
                variables.len()
            )));
        }

        let declaration = match &nextflow {
            Names::One(text) => text.strip_prefix('*').unwrap_or(text).to_string(),
            Names::Many(_) => variables.join(", "),
        };

        Ok(ResolvedChannel {
            declaration,
            variables,
            python,
        })
    }
}

/// Shell reference to a Nextflow variable.
///
/// Quoted (or newline-led) variables are inline literals and get no `$`;
/// qualifiers like `val(x)` are unwrapped to `x`.
pub fn shell_reference(variable: &str) -> String {
    let variable = variable.strip_prefix('*').unwrap_or(variable);
    if variable.starts_with(['\'', '"', '\n']) {
        return variable.replace(['\'', '"'], "").trim().to_string();
    }

    let mut name = variable.trim();
    for qualifier in ["val(", "file(", "path(", "env("] {
        if let Some(inner) = name.strip_prefix(qualifier).and_then(|n| n.strip_suffix(')')) {
            name = inner.trim();
            break;
        }
    }
    format!("${name}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_route() {
        assert_eq!(ChannelName::One("a".to_string()).route(), " into a");
        assert_eq!(
            ChannelName::Many(vec!["a".to_string(), "b".to_string()]).route(),
            " into{a; b}"
        );
    }

    #[test]
    fn test_string_names_split() {
        let spec = ChannelSpec::new("pairs", "tuple", "*val(x), file(y)", Some("x"));
        let resolved = spec.resolve().unwrap();
        assert_eq!(resolved.declaration, "val(x), file(y)");
        assert_eq!(resolved.variables, vec!["val(x)", "file(y)"]);
        assert_eq!(resolved.python, vec![Some("x".to_string())]);
    }

    #[test]
    fn test_unequal_tuples_rejected() {
        let spec = ChannelSpec {
            nextflow: Some(Names::Many(vec!["a".to_string(), "b".to_string()])),
            python: Some(Names::Many(vec!["a".to_string()])),
            ..ChannelSpec::new("c", "tuple", "", None)
        };
        assert!(matches!(spec.resolve(), Err(Error::InvalidChannel { .. })));
    }

    #[test]
    fn test_mapping_collapses_into_tuples() {
        let spec = ChannelSpec {
            nextflow: None,
            mapping: Some(vec![
                ["sample".to_string(), "sampleName".to_string()],
                ["reads".to_string(), "None".to_string()],
            ]),
            ..ChannelSpec::new("c", "tuple", "", None)
        };
        let resolved = spec.resolve().unwrap();
        assert_eq!(resolved.declaration, "sample, reads");
        assert_eq!(resolved.python, vec![Some("sampleName".to_string()), None]);
    }

    #[test]
    fn test_shell_reference() {
        assert_eq!(shell_reference("greeting"), "$greeting");
        assert_eq!(shell_reference("'Hello'"), "Hello");
        assert_eq!(shell_reference("\"a b\""), "a b");
        assert_eq!(shell_reference("*file(x)"), "$x");
        assert_eq!(shell_reference("val(n)"), "$n");
    }

    #[test]
    fn test_skip_sentinel() {
        let mut spec = ChannelSpec::new("doc", "None", "x", Some("x"));
        assert!(spec.is_skipped());
        spec.kind = None;
        assert!(spec.is_skipped());
        assert_eq!(spec.python_names(), vec!["x"]);
    }
}
